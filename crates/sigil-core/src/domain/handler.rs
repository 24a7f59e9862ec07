//! Handler callables and their registration metadata.

use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::Event;
use super::call::CallArgs;
use super::ids::ReceiverId;
use crate::error::HandlerError;

/// Outcome of one handler invocation.
pub type HandlerResult = Result<Value, HandlerError>;

/// A handler that runs inline on the calling thread.
///
/// Any `Fn(CallArgs) -> HandlerResult` closure qualifies via the blanket
/// impl below.
pub trait SyncHandler: Send + Sync {
    fn call(&self, input: CallArgs) -> HandlerResult;
}

impl<F> SyncHandler for F
where
    F: Fn(CallArgs) -> HandlerResult + Send + Sync,
{
    fn call(&self, input: CallArgs) -> HandlerResult {
        self(input)
    }
}

/// A handler scheduled on the async runtime.
#[async_trait]
pub trait AsyncHandler: Send + Sync {
    async fn call(&self, input: CallArgs) -> HandlerResult;
}

/// Adapter so plain async closures can be registered without writing a
/// trait impl.
struct AsyncFnHandler<F>(F);

#[async_trait]
impl<F, Fut> AsyncHandler for AsyncFnHandler<F>
where
    F: Fn(CallArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn call(&self, input: CallArgs) -> HandlerResult {
        (self.0)(input).await
    }
}

/// Type-erased callable reference.
///
/// Identity is `Arc` pointer identity: two `HandlerFn`s are the "same
/// callable" only when they share the same registered object, which is what
/// makes re-registration idempotent.
#[derive(Clone)]
pub enum HandlerFn {
    Sync(Arc<dyn SyncHandler>),
    Async(Arc<dyn AsyncHandler>),
}

impl HandlerFn {
    pub fn from_sync<F>(f: F) -> Self
    where
        F: Fn(CallArgs) -> HandlerResult + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(CallArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::Async(Arc::new(AsyncFnHandler(f)))
    }

    /// Do both sides refer to the same registered callable?
    pub fn same_callable(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Sync(a), Self::Sync(b)) => Arc::ptr_eq(a, b),
            (Self::Async(a), Self::Async(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for HandlerFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("HandlerFn::Sync(..)"),
            Self::Async(_) => f.write_str("HandlerFn::Async(..)"),
        }
    }
}

/// One registration: the callable, where it fires, its prerequisite events,
/// and (optionally) the receiver instance it is bound to.
///
/// Immutable once registered; the registry clones entries into snapshots,
/// which is cheap because the callable is an `Arc`.
#[derive(Debug, Clone)]
pub struct HandlerEntry {
    pub callable: HandlerFn,
    pub event: Option<Event>,
    pub depends_on: BTreeSet<Event>,
    pub receiver: Option<ReceiverId>,
}

impl HandlerEntry {
    pub fn new(callable: HandlerFn) -> Self {
        Self {
            callable,
            event: None,
            depends_on: BTreeSet::new(),
            receiver: None,
        }
    }

    pub fn for_event(mut self, event: impl Into<Event>) -> Self {
        self.event = Some(event.into());
        self
    }

    pub fn depends_on<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<Event>,
    {
        self.depends_on.extend(prerequisites.into_iter().map(Into::into));
        self
    }

    pub fn bound_to(mut self, receiver: ReceiverId) -> Self {
        self.receiver = Some(receiver);
        self
    }
}
