//! sigil-core
//!
//! In-process signal dispatch: named signals accumulate handler
//! registrations keyed by an optional event tag, a resolver computes
//! dependency-ordered firing paths so downstream events transparently fire
//! their prerequisites first, and a queue backend decouples "fire" from
//! "execute" with bounded-concurrency execution and best-effort
//! cancellation through job handles.
//!
//! Module map:
//! - **domain**: identifiers, call payloads, handler descriptors
//! - **registry**: per-signal handler registrations + dependency map
//! - **resolver**: root-to-target event path enumeration and selection
//! - **firing**: handler selection and the sync/async firing engine
//! - **queue**: backend port, in-memory FIFO, consumer, job handles
//! - **signal**: the public `Signal` type and the process-wide directory

pub mod domain;
pub mod error;
pub mod firing;
pub mod queue;
pub mod registry;
pub mod resolver;
pub mod signal;

pub use domain::{
    CallArgs, Event, FireResult, HandlerEntry, HandlerFn, HandlerResult, JobId, ReceiverId,
};
pub use error::{HandlerError, SignalError};
pub use firing::FireOptions;
pub use queue::{
    Backend, Consumer, ConsumerHandle, InMemoryBackend, Job, JobHandle, JobOutcome, JobState,
};
pub use registry::HandlerRegistry;
pub use resolver::PathPolicy;
pub use signal::Signal;
