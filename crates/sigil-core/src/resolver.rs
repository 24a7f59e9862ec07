//! Dependency resolution: enumerating root-to-target event paths.
//!
//! An edge `target -> prerequisite` in the dependency map means the
//! prerequisite event must fire before the target. The resolver expands the
//! target depth-first; every branch walks its own copy of the accumulated
//! path, so sibling prerequisites never share mutable path state.

use std::collections::{BTreeSet, HashMap};

use crate::domain::Event;
use crate::error::SignalError;

/// Safety bound on prerequisite chain depth. Graphs are expected to be
/// shallow; a chain deeper than this is treated as a cycle rather than
/// recursing until the stack is exhausted.
pub const MAX_RESOLVE_DEPTH: usize = 64;

/// Which resolved path the firing engine walks when a target has several.
/// Ties go to the first path found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPolicy {
    #[default]
    Shortest,
    Longest,
}

/// Borrows a signal's dependency map for the duration of one fire.
pub struct Resolver<'a> {
    deps: &'a HashMap<Event, BTreeSet<Event>>,
}

impl<'a> Resolver<'a> {
    pub fn new(deps: &'a HashMap<Event, BTreeSet<Event>>) -> Self {
        Self { deps }
    }

    /// All root-to-target paths, each root-first and ending in `target`.
    ///
    /// "No registered prerequisites" is the base case, not an error: an
    /// event unknown to the dependency map yields the single path
    /// `[target]`, and firing it simply selects zero handlers.
    pub fn resolve(&self, target: &str) -> Result<Vec<Vec<Event>>, SignalError> {
        let mut results = Vec::new();
        self.expand(target, Vec::new(), &mut results)?;
        Ok(results)
    }

    fn expand(
        &self,
        event: &str,
        mut path: Vec<Event>,
        results: &mut Vec<Vec<Event>>,
    ) -> Result<(), SignalError> {
        if path.len() >= MAX_RESOLVE_DEPTH {
            return Err(SignalError::CyclicDependency {
                event: event.to_string(),
                limit: MAX_RESOLVE_DEPTH,
            });
        }
        path.push(event.to_string());

        match self.deps.get(event) {
            None => {
                path.reverse();
                results.push(path);
            }
            Some(prerequisites) if prerequisites.is_empty() => {
                path.reverse();
                results.push(path);
            }
            Some(prerequisites) => {
                for prerequisite in prerequisites {
                    self.expand(prerequisite, path.clone(), results)?;
                }
            }
        }
        Ok(())
    }

    /// Pick one path per policy; the first path found wins ties.
    pub fn choose(paths: Vec<Vec<Event>>, policy: PathPolicy) -> Option<Vec<Event>> {
        let mut best: Option<Vec<Event>> = None;
        for path in paths {
            let better = match &best {
                None => true,
                Some(current) => match policy {
                    PathPolicy::Shortest => path.len() < current.len(),
                    PathPolicy::Longest => path.len() > current.len(),
                },
            };
            if better {
                best = Some(path);
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn deps(edges: &[(&str, &[&str])]) -> HashMap<Event, BTreeSet<Event>> {
        edges
            .iter()
            .map(|(event, prerequisites)| {
                (
                    event.to_string(),
                    prerequisites.iter().map(|p| p.to_string()).collect(),
                )
            })
            .collect()
    }

    fn paths_of(map: &HashMap<Event, BTreeSet<Event>>, target: &str) -> Vec<Vec<Event>> {
        Resolver::new(map).resolve(target).unwrap()
    }

    #[test]
    fn event_without_prerequisites_is_its_own_path() {
        let map = deps(&[]);
        assert_eq!(paths_of(&map, "solo"), vec![vec!["solo".to_string()]]);
    }

    #[test]
    fn linear_chain_resolves_root_first() {
        let map = deps(&[("car", &["wheel"]), ("wheel", &["tire"])]);
        assert_eq!(
            paths_of(&map, "car"),
            vec![vec![
                "tire".to_string(),
                "wheel".to_string(),
                "car".to_string()
            ]]
        );
    }

    #[test]
    fn fan_out_yields_one_path_per_root() {
        let map = deps(&[("report", &["fetch", "parse"]), ("parse", &["fetch"])]);
        let mut paths = paths_of(&map, "report");
        paths.sort_by_key(|p| p.len());

        assert_eq!(paths.len(), 2);
        assert_eq!(paths[0], vec!["fetch", "report"]);
        assert_eq!(paths[1], vec!["fetch", "parse", "report"]);
        for path in &paths {
            assert_eq!(path.last().map(String::as_str), Some("report"));
        }
    }

    #[test]
    fn self_loop_is_rejected() {
        let map = deps(&[("a", &["a"])]);
        let err = Resolver::new(&map).resolve("a").unwrap_err();
        assert!(matches!(err, SignalError::CyclicDependency { .. }));
    }

    #[test]
    fn indirect_cycle_is_rejected() {
        let map = deps(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = Resolver::new(&map).resolve("a").unwrap_err();
        assert!(matches!(err, SignalError::CyclicDependency { .. }));
    }

    #[rstest]
    #[case(PathPolicy::Shortest, 2)]
    #[case(PathPolicy::Longest, 4)]
    fn policy_picks_by_length(#[case] policy: PathPolicy, #[case] expected_len: usize) {
        // "goal" has a direct root prerequisite and a longer chain.
        let map = deps(&[
            ("goal", &["quick", "slow"]),
            ("slow", &["slower"]),
            ("slower", &["slowest"]),
        ]);
        let paths = paths_of(&map, "goal");
        let chosen = Resolver::choose(paths, policy).unwrap();
        assert_eq!(chosen.len(), expected_len);
        assert_eq!(chosen.last().map(String::as_str), Some("goal"));
    }

    #[test]
    fn choose_on_empty_is_none() {
        assert_eq!(Resolver::choose(Vec::new(), PathPolicy::Shortest), None);
    }
}
