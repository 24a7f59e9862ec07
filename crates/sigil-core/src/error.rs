use thiserror::Error;

/// Error returned by a single handler invocation.
///
/// Always contained at the handler boundary: the firing engine logs it and
/// records an absent result in that handler's slot. It never aborts sibling
/// handlers or the fire operation.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}

/// Errors surfaced to callers of the signal API.
///
/// Per-handler and per-job failures are not here: those are contained as
/// absent results ([`HandlerError`]) or failure outcomes on the job handle.
#[derive(Debug, Error)]
pub enum SignalError {
    /// The prerequisite chain of `event` exceeded the resolver's depth
    /// bound, which only happens when the dependency graph cycles back on
    /// itself (including self-loops).
    #[error("dependency cycle while resolving '{event}': depth limit {limit} exceeded")]
    CyclicDependency { event: String, limit: usize },

    /// Deferred firing was requested but the signal has no queue backend.
    #[error("no queue backend configured for signal '{0}'")]
    BackendMissing(String),

    /// The queue backend rejected a job at enqueue time.
    #[error("queue backend rejected job: {0}")]
    Backend(String),
}
