//! Strongly-typed identifiers backed by ULID.
//!
//! ULIDs sort by creation time and can be generated without coordination,
//! which is all the dispatcher needs for job and receiver identity. A
//! phantom marker type keeps the ID kinds from being mixed up at compile
//! time while sharing one implementation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for ID kinds. Provides the `Display` prefix.
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// Generic identifier. `T` is a zero-sized marker, so `Id<T>` is exactly a
/// `Ulid` at runtime.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// A fresh, time-ordered identifier.
    pub fn generate() -> Self {
        Self::from_ulid(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

/// Marker for jobs queued through a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Job {}

impl IdMarker for Job {
    fn prefix() -> &'static str {
        "job-"
    }
}

/// Marker for receiver objects supplied by the wiring layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Receiver {}

impl IdMarker for Receiver {
    fn prefix() -> &'static str {
        "recv-"
    }
}

/// Identifier of a queued job (one deferred handler invocation).
pub type JobId = Id<Job>;

/// Identity of a receiver object, used to scope firing to specific
/// registered instances.
pub type ReceiverId = Id<Receiver>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_unique() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn display_uses_kind_prefix() {
        assert!(JobId::generate().to_string().starts_with("job-"));
        assert!(ReceiverId::generate().to_string().starts_with("recv-"));
    }

    #[test]
    fn ids_sort_by_creation_time() {
        let a = JobId::generate();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = JobId::generate();
        assert!(a < b);
    }
}
