//! Signals: named dispatch points owning a handler registry, a dependency
//! map, and an optional queue backend.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, RwLock, Weak};

use tracing::debug;
use ulid::Ulid;

use crate::domain::{CallArgs, Event, FireResult, HandlerEntry, HandlerFn, HandlerResult, ReceiverId};
use crate::error::SignalError;
use crate::firing::{FireOptions, FiringEngine};
use crate::queue::{Backend, Job, JobHandle};
use crate::registry::HandlerRegistry;
use crate::resolver::{PathPolicy, Resolver};

/// Process-wide signal directory. Entries are weak: once every clone of a
/// signal is dropped it is reclaimed, and the next lookup under that name
/// starts fresh.
static SIGNALS: LazyLock<Mutex<HashMap<String, Weak<SignalShared>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

struct SignalShared {
    name: String,
    registry: RwLock<HandlerRegistry>,
    backend: Mutex<Option<Arc<dyn Backend>>>,
}

/// A signal: the dispatch point callers register handlers on and fire.
///
/// Cheap to clone; clones share state. Two [`Signal::named`] lookups with
/// the same name yield the same underlying signal.
#[derive(Clone)]
pub struct Signal {
    shared: Arc<SignalShared>,
}

impl Signal {
    /// Look up or create the signal registered under `name`.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        let mut directory = SIGNALS.lock().unwrap();
        // Dead entries linger until swept; without this the directory grows
        // by one String + Weak per reclaimed signal, forever.
        directory.retain(|_, weak| weak.strong_count() > 0);
        if let Some(existing) = directory.get(&name).and_then(Weak::upgrade) {
            return Self { shared: existing };
        }
        debug!(%name, "creating signal");
        let shared = Arc::new(SignalShared {
            name: name.clone(),
            registry: RwLock::new(HandlerRegistry::new()),
            backend: Mutex::new(None),
        });
        directory.insert(name, Arc::downgrade(&shared));
        Self { shared }
    }

    /// A signal with a generated name. Never entered in the directory:
    /// nothing can look it up, so a directory slot would only be a leak.
    pub fn anonymous() -> Self {
        Self {
            shared: Arc::new(SignalShared {
                name: Ulid::new().to_string(),
                registry: RwLock::new(HandlerRegistry::new()),
                backend: Mutex::new(None),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Do two handles refer to the same underlying signal?
    pub fn same_as(&self, other: &Signal) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Register a handler entry (the explicit replacement for decorator
    /// wiring: the wiring layer builds entries, the signal just takes them).
    pub fn register(&self, entry: HandlerEntry) {
        self.shared.registry.write().unwrap().register(entry);
    }

    /// Convenience: untagged sync closure.
    pub fn on<F>(&self, f: F)
    where
        F: Fn(CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HandlerEntry::new(HandlerFn::from_sync(f)));
    }

    /// Convenience: sync closure registered for one event.
    pub fn on_event<F>(&self, event: impl Into<Event>, f: F)
    where
        F: Fn(CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(HandlerEntry::new(HandlerFn::from_sync(f)).for_event(event));
    }

    /// Drop every handler bound to `receiver`.
    pub fn unsubscribe(&self, receiver: ReceiverId) {
        self.shared.registry.write().unwrap().unsubscribe(receiver);
    }

    /// Fire synchronously on the calling thread.
    pub fn fire(&self, opts: FireOptions) -> Result<FireResult, SignalError> {
        FiringEngine::new(self.snapshot()).fire_sync(&opts)
    }

    /// Fire asynchronously: handlers fan out on the runtime.
    pub async fn fire_async(&self, opts: FireOptions) -> Result<FireResult, SignalError> {
        FiringEngine::new(self.snapshot()).fire_async(&opts).await
    }

    /// All resolved root-to-`event` paths.
    pub fn event_paths(&self, event: &str) -> Result<Vec<Vec<Event>>, SignalError> {
        let snapshot = self.snapshot();
        Resolver::new(snapshot.dependency_map()).resolve(event)
    }

    /// The single path the firing engine would walk under `policy`.
    pub fn event_path(
        &self,
        event: &str,
        policy: PathPolicy,
    ) -> Result<Option<Vec<Event>>, SignalError> {
        Ok(Resolver::choose(self.event_paths(event)?, policy))
    }

    /// Attach the queue backend used by [`Signal::enqueue`].
    pub fn set_backend(&self, backend: Arc<dyn Backend>) {
        *self.shared.backend.lock().unwrap() = Some(backend);
    }

    /// Deferred fire: wrap the flat selection as jobs, push them onto the
    /// backend, and return one handle per job immediately. No resolver or
    /// chaining is involved on this path.
    pub async fn enqueue(&self, opts: FireOptions) -> Result<Vec<JobHandle>, SignalError> {
        let backend = self
            .shared
            .backend
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| SignalError::BackendMissing(self.shared.name.clone()))?;

        let engine = FiringEngine::new(self.snapshot());
        let selected = engine.select(&opts.events, &opts.receivers);
        debug!(signal = %self.shared.name, jobs = selected.len(), "enqueueing selection");

        let mut handles = Vec::with_capacity(selected.len());
        for entry in selected {
            let handle = JobHandle::new();
            backend
                .put(Job {
                    handle: handle.clone(),
                    callable: entry.callable.clone(),
                    input: opts.args.clone(),
                })
                .await?;
            handles.push(handle);
        }
        Ok(handles)
    }

    fn snapshot(&self) -> HandlerRegistry {
        self.shared.registry.read().unwrap().snapshot()
    }
}

impl std::fmt::Debug for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal").field("name", &self.shared.name).finish()
    }
}
