//! Graph state: named channels with merge semantics.

use serde_json::{Value, json};
use std::collections::HashMap;

/// Run state: channel name to JSON value.
pub type State = HashMap<String, Value>;

/// How updates to a channel are merged into the current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reducer {
    /// Replace the value.
    #[default]
    Overwrite,
    /// Push onto a list; array updates are spliced element-wise.
    Append,
    /// Numeric accumulation.
    Sum,
}

/// One state channel.
#[derive(Clone, Debug)]
pub struct Channel {
    pub name: String,
    pub reducer: Reducer,
    pub default: Option<Value>,
}

impl Channel {
    pub fn value(name: &str) -> Self {
        Self { name: name.to_string(), reducer: Reducer::Overwrite, default: None }
    }

    pub fn list(name: &str) -> Self {
        Self { name: name.to_string(), reducer: Reducer::Append, default: Some(json!([])) }
    }

    pub fn counter(name: &str) -> Self {
        Self { name: name.to_string(), reducer: Reducer::Sum, default: Some(json!(0)) }
    }
}

/// The set of channels a graph executes over.
///
/// Channels not declared here still work; they merge with overwrite
/// semantics and no default.
#[derive(Clone, Debug, Default)]
pub struct StateSchema {
    channels: HashMap<String, Channel>,
}

impl StateSchema {
    pub fn new(channels: impl IntoIterator<Item = Channel>) -> Self {
        Self { channels: channels.into_iter().map(|c| (c.name.clone(), c)).collect() }
    }

    /// All-overwrite schema from bare channel names.
    pub fn values(names: &[&str]) -> Self {
        Self::new(names.iter().map(|n| Channel::value(n)))
    }

    fn reducer(&self, channel: &str) -> Reducer {
        self.channels.get(channel).map(|c| c.reducer).unwrap_or_default()
    }

    /// Merge one update into state using the channel's reducer.
    pub fn apply(&self, state: &mut State, key: &str, update: Value) {
        let merged = match self.reducer(key) {
            Reducer::Overwrite => update,
            Reducer::Append => {
                let mut items = match state.remove(key) {
                    Some(Value::Array(items)) => items,
                    Some(other) => vec![other],
                    None => Vec::new(),
                };
                match update {
                    Value::Array(new_items) => items.extend(new_items),
                    other => items.push(other),
                }
                Value::Array(items)
            }
            Reducer::Sum => {
                let current = state.get(key).and_then(Value::as_f64).unwrap_or(0.0);
                let add = update.as_f64().unwrap_or(0.0);
                let total = current + add;
                // Keep integer counters integral.
                if total.fract() == 0.0 { json!(total as i64) } else { json!(total) }
            }
        };
        state.insert(key.to_string(), merged);
    }

    /// Fresh state seeded with every channel's default.
    pub fn initial_state(&self) -> State {
        self.channels
            .values()
            .filter_map(|c| c.default.clone().map(|d| (c.name.clone(), d)))
            .collect()
    }
}
