//! Core domain types: identifiers, call payloads, handler descriptors.

pub mod call;
pub mod handler;
pub mod ids;

pub use call::{CallArgs, FireResult};
pub use handler::{AsyncHandler, HandlerEntry, HandlerFn, HandlerResult, SyncHandler};
pub use ids::{Id, IdMarker, JobId, ReceiverId};

/// An event tag. Handlers registered without one are "untagged" and fire
/// when no explicit event filter is given.
pub type Event = String;
