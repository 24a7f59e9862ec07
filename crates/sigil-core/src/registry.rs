//! Handler registry: ordered registrations plus the event dependency map.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::domain::{Event, HandlerEntry, ReceiverId};

/// All handler registrations of one signal.
///
/// Design:
/// - Mutated by registration calls (mostly at startup), read via
///   [`HandlerRegistry::snapshot`] during firing. A snapshot is a cheap
///   clone because entries hold `Arc` callables, so a registration racing a
///   fire never affects the in-flight selection.
/// - Entries live in one `Vec` so full-broadcast firing preserves global
///   registration order.
#[derive(Debug, Default, Clone)]
pub struct HandlerRegistry {
    entries: Vec<HandlerEntry>,
    deps: HashMap<Event, BTreeSet<Event>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entry.
    ///
    /// Re-registering the same callable under the same event never produces
    /// a duplicate invocation, so wiring code can run registration paths
    /// repeatedly; any newly declared prerequisites still merge into the
    /// dependency map.
    pub fn register(&mut self, entry: HandlerEntry) {
        // Prerequisites merge before the duplicate check: a re-registration
        // that declares new dependencies still updates the graph even when
        // the entry itself is skipped.
        if let Some(event) = &entry.event
            && !entry.depends_on.is_empty()
        {
            self.deps
                .entry(event.clone())
                .or_default()
                .extend(entry.depends_on.iter().cloned());
        }
        let duplicate = self
            .entries
            .iter()
            .any(|existing| {
                existing.event == entry.event
                    && existing.callable.same_callable(&entry.callable)
            });
        if duplicate {
            debug!(event = ?entry.event, "handler already registered for this event, skipping");
            return;
        }
        self.entries.push(entry);
    }

    /// Drop every entry bound to `receiver`.
    pub fn unsubscribe(&mut self, receiver: ReceiverId) {
        self.entries.retain(|entry| entry.receiver != Some(receiver));
    }

    /// All entries in registration order.
    pub fn entries(&self) -> &[HandlerEntry] {
        &self.entries
    }

    /// `event -> prerequisite events`, accumulated across registrations.
    pub fn dependency_map(&self) -> &HashMap<Event, BTreeSet<Event>> {
        &self.deps
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Point-in-time copy used for one fire operation.
    pub fn snapshot(&self) -> Self {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HandlerFn;
    use serde_json::json;

    fn noop() -> HandlerFn {
        HandlerFn::from_sync(|_| Ok(json!(null)))
    }

    #[test]
    fn entries_keep_registration_order() {
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerEntry::new(noop()).for_event("b"));
        registry.register(HandlerEntry::new(noop()));
        registry.register(HandlerEntry::new(noop()).for_event("a"));

        let events: Vec<_> = registry
            .entries()
            .iter()
            .map(|e| e.event.as_deref())
            .collect();
        assert_eq!(events, vec![Some("b"), None, Some("a")]);
    }

    #[test]
    fn same_callable_same_event_registers_once() {
        let mut registry = HandlerRegistry::new();
        let callable = noop();
        registry.register(HandlerEntry::new(callable.clone()).for_event("x"));
        registry.register(HandlerEntry::new(callable.clone()).for_event("x"));
        assert_eq!(registry.len(), 1);

        // The same callable under a different event is a distinct entry.
        registry.register(HandlerEntry::new(callable).for_event("y"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn dependencies_accumulate_per_event() {
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerEntry::new(noop()).for_event("car").depends_on(["wheel"]));
        registry.register(HandlerEntry::new(noop()).for_event("car").depends_on(["engine"]));

        let deps = registry.dependency_map().get("car").unwrap();
        assert!(deps.contains("wheel"));
        assert!(deps.contains("engine"));
    }

    #[test]
    fn duplicate_registration_still_merges_new_prerequisites() {
        let mut registry = HandlerRegistry::new();
        let callable = noop();
        registry.register(
            HandlerEntry::new(callable.clone())
                .for_event("car")
                .depends_on(["wheel"]),
        );
        registry.register(
            HandlerEntry::new(callable)
                .for_event("car")
                .depends_on(["engine"]),
        );

        assert_eq!(registry.len(), 1);
        let deps = registry.dependency_map().get("car").unwrap();
        assert!(deps.contains("wheel"));
        assert!(deps.contains("engine"));
    }

    #[test]
    fn unsubscribe_drops_only_that_receiver() {
        let mut registry = HandlerRegistry::new();
        let r1 = ReceiverId::generate();
        let r2 = ReceiverId::generate();
        registry.register(HandlerEntry::new(noop()).bound_to(r1));
        registry.register(HandlerEntry::new(noop()).bound_to(r2));
        registry.register(HandlerEntry::new(noop()));

        registry.unsubscribe(r1);

        assert_eq!(registry.len(), 2);
        assert!(registry.entries().iter().all(|e| e.receiver != Some(r1)));
    }

    #[test]
    fn snapshot_is_isolated_from_later_registrations() {
        let mut registry = HandlerRegistry::new();
        registry.register(HandlerEntry::new(noop()));
        let snapshot = registry.snapshot();
        registry.register(HandlerEntry::new(noop()));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
