//! Handler selection and the two-mode firing engine.
//!
//! The engine works on a registry snapshot taken when the fire starts.
//! Selection is shared by inline firing and the queue backend; path-driven
//! chaining only applies to the inline modes.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{CallArgs, Event, FireResult, HandlerEntry, HandlerFn, ReceiverId};
use crate::error::SignalError;
use crate::registry::HandlerRegistry;
use crate::resolver::{PathPolicy, Resolver};

/// Options for one fire operation.
///
/// With no events and no receivers the fire is a full broadcast. Receivers
/// restrict the selection to handlers bound to those instances; events both
/// filter handlers and, when declared dependencies exist, drive multi-step
/// path firing.
#[derive(Debug, Clone, Default)]
pub struct FireOptions {
    pub events: Vec<Event>,
    pub receivers: Vec<ReceiverId>,
    pub chain: bool,
    pub path_policy: PathPolicy,
    pub args: CallArgs,
}

impl FireOptions {
    /// Broadcast to every registered handler.
    pub fn broadcast() -> Self {
        Self::default()
    }

    pub fn event(event: impl Into<Event>) -> Self {
        Self::events([event])
    }

    pub fn events<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Event>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn for_receiver(self, receiver: ReceiverId) -> Self {
        self.for_receivers([receiver])
    }

    pub fn for_receivers(mut self, receivers: impl IntoIterator<Item = ReceiverId>) -> Self {
        self.receivers.extend(receivers);
        self
    }

    /// Feed each path step's results forward as the next step's positional
    /// arguments.
    pub fn chained(mut self) -> Self {
        self.chain = true;
        self
    }

    pub fn policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    pub fn with_args(mut self, args: CallArgs) -> Self {
        self.args = args;
        self
    }

    pub fn arg(mut self, value: serde_json::Value) -> Self {
        self.args.args.push(value);
        self
    }
}

/// Executes fire requests against one registry snapshot.
pub(crate) struct FiringEngine {
    snapshot: HandlerRegistry,
}

impl FiringEngine {
    pub fn new(snapshot: HandlerRegistry) -> Self {
        Self { snapshot }
    }

    /// Handlers matching the filter, in registration order.
    ///
    /// - Neither events nor receivers: every entry (full broadcast).
    /// - Otherwise the effective event filter is `events`, or "untagged"
    ///   when none are given; receivers additionally restrict to entries
    ///   bound to one of the given ids (unbound entries are skipped).
    pub fn select(&self, events: &[Event], receivers: &[ReceiverId]) -> Vec<HandlerEntry> {
        let entries = self.snapshot.entries();
        if events.is_empty() && receivers.is_empty() {
            return entries.to_vec();
        }

        let filter: Vec<Option<&str>> = if events.is_empty() {
            vec![None]
        } else {
            events.iter().map(|e| Some(e.as_str())).collect()
        };

        entries
            .iter()
            .filter(|entry| {
                filter.contains(&entry.event.as_deref())
                    && (receivers.is_empty()
                        || entry
                            .receiver
                            .is_some_and(|bound| receivers.contains(&bound)))
            })
            .cloned()
            .collect()
    }

    /// Synchronous fire: handlers run inline on the calling thread.
    pub fn fire_sync(&self, opts: &FireOptions) -> Result<FireResult, SignalError> {
        if opts.events.is_empty() {
            let selected = self.select(&[], &opts.receivers);
            return Ok(self.run_step_sync(&selected, &opts.args));
        }

        let resolver = Resolver::new(self.snapshot.dependency_map());
        let mut last = Vec::new();
        for event in &opts.events {
            let paths = resolver.resolve(event)?;
            let Some(path) = Resolver::choose(paths, opts.path_policy) else {
                continue;
            };
            let mut input = opts.args.clone();
            for step in &path {
                let selected = self.select(std::slice::from_ref(step), &opts.receivers);
                let results = self.run_step_sync(&selected, &input);
                if opts.chain {
                    input = CallArgs::from_step_results(&results);
                }
                last = results;
            }
        }
        Ok(last)
    }

    /// Asynchronous fire: each step fans handlers out as independent tasks
    /// and awaits them together before moving to the next step.
    pub async fn fire_async(&self, opts: &FireOptions) -> Result<FireResult, SignalError> {
        if opts.events.is_empty() {
            let selected = self.select(&[], &opts.receivers);
            return Ok(run_step_async(&selected, &opts.args).await);
        }

        let resolver = Resolver::new(self.snapshot.dependency_map());
        let mut last = Vec::new();
        for event in &opts.events {
            let paths = resolver.resolve(event)?;
            let Some(path) = Resolver::choose(paths, opts.path_policy) else {
                continue;
            };
            let mut input = opts.args.clone();
            for step in &path {
                let selected = self.select(std::slice::from_ref(step), &opts.receivers);
                let results = run_step_async(&selected, &input).await;
                if opts.chain {
                    input = CallArgs::from_step_results(&results);
                }
                last = results;
            }
        }
        Ok(last)
    }

    fn run_step_sync(&self, selected: &[HandlerEntry], input: &CallArgs) -> FireResult {
        selected
            .iter()
            .map(|entry| match &entry.callable {
                HandlerFn::Sync(handler) => match handler.call(input.clone()) {
                    Ok(value) => Some(value),
                    Err(err) => {
                        warn!(%err, event = ?entry.event, "handler failed, recording absent result");
                        None
                    }
                },
                HandlerFn::Async(_) => {
                    // An async callable cannot run inline; fire_async covers it.
                    warn!(event = ?entry.event, "async handler selected by synchronous fire, skipping");
                    None
                }
            })
            .collect()
    }
}

/// Fan out one step and collect results in selection order. Sync callables
/// go to the blocking pool so CPU-bound work does not stall the others.
async fn run_step_async(selected: &[HandlerEntry], input: &CallArgs) -> FireResult {
    let mut pending = Vec::with_capacity(selected.len());
    for entry in selected {
        let input = input.clone();
        let join = match &entry.callable {
            HandlerFn::Async(handler) => {
                let handler = Arc::clone(handler);
                tokio::spawn(async move { handler.call(input).await })
            }
            HandlerFn::Sync(handler) => {
                let handler = Arc::clone(handler);
                tokio::task::spawn_blocking(move || handler.call(input))
            }
        };
        pending.push((join, entry.event.clone()));
    }

    let mut results = Vec::with_capacity(pending.len());
    for (join, event) in pending {
        let slot = match join.await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(err)) => {
                warn!(%err, ?event, "handler failed, recording absent result");
                None
            }
            Err(err) => {
                warn!(%err, ?event, "handler task aborted");
                None
            }
        };
        results.push(slot);
    }
    results
}
