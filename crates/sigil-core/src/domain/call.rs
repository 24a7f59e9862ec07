//! Call payloads: what handlers receive and what a fire returns.

use serde_json::{Map, Value};

/// Arguments carried into every handler of a fire operation: positional
/// values plus named values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(args: impl IntoIterator<Item = Value>) -> Self {
        Self {
            args: args.into_iter().collect(),
            kwargs: Map::new(),
        }
    }

    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Chaining input for the next path step: every handler result of the
    /// previous step becomes one positional argument (failed handlers
    /// contribute `null`), and named arguments are cleared.
    pub(crate) fn from_step_results(results: &[Option<Value>]) -> Self {
        Self {
            args: results
                .iter()
                .map(|slot| slot.clone().unwrap_or(Value::Null))
                .collect(),
            kwargs: Map::new(),
        }
    }
}

/// Aggregate result of one fire: one slot per invoked handler, in selection
/// order. `None` marks a handler whose failure was isolated.
pub type FireResult = Vec<Option<Value>>;
