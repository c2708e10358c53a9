//! Output key order per nesting level.
//!
//! `serde_yaml::Mapping` keeps insertion order, so ordering a mapping here
//! fixes the order its keys are written in.

use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;

/// The kind of mapping being ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Workflow,
    Job,
    Step,
    /// Any other mapping: purely lexical.
    Other,
}

const WORKFLOW_KEYS: &[&str] = &[
    "name",
    "on",
    "permissions",
    "concurrency",
    "run-name",
    "env",
    "jobs",
];

const JOB_KEYS: &[&str] = &[
    "needs",
    "if",
    "runs-on",
    "permissions",
    "environment",
    "container",
    "concurrency",
    "timeout-minutes",
    "env",
    "outputs",
    "steps",
];

const STEP_KEYS: &[&str] = &["name", "id", "if", "uses", "with", "env", "run"];

impl Level {
    fn priority_keys(self) -> &'static [&'static str] {
        match self {
            Level::Workflow => WORKFLOW_KEYS,
            Level::Job => JOB_KEYS,
            Level::Step => STEP_KEYS,
            Level::Other => &[],
        }
    }
}

/// Build a mapping with the level's priority keys first, the rest lexical.
pub fn ordered(level: Level, entries: BTreeMap<String, Value>) -> Value {
    let priority = level.priority_keys();
    let mut entries: Vec<(String, Value)> = entries.into_iter().collect();
    // Stable: keys sharing a rank keep the map's lexical order.
    entries.sort_by_key(|(key, _)| {
        priority
            .iter()
            .position(|p| *p == key.as_str())
            .unwrap_or(priority.len())
    });
    Value::Mapping(
        entries
            .into_iter()
            .map(|(key, value)| (Value::String(key), value))
            .collect(),
    )
}

/// Copy of a user-written value with every nested mapping sorted by key.
pub fn lexical(value: &Value) -> Value {
    match value {
        Value::Sequence(items) => Value::Sequence(items.iter().map(lexical).collect()),
        Value::Mapping(mapping) => {
            let mut entries: Vec<(&Value, &Value)> = mapping.iter().collect();
            entries.sort_by_cached_key(|(key, _)| key_text(key));
            Value::Mapping(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), lexical(value)))
                    .collect::<Mapping>(),
            )
        }
        Value::Tagged(tagged) => lexical(&tagged.value),
        other => other.clone(),
    }
}

fn key_text(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys_of(value: &Value) -> Vec<String> {
        value
            .as_mapping()
            .map(|mapping| {
                mapping
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn entries(keys: &[&str]) -> BTreeMap<String, Value> {
        keys.iter()
            .map(|k| (k.to_string(), Value::from("x")))
            .collect()
    }

    #[test]
    fn step_keys_follow_priority_then_lexical() {
        let value = ordered(
            Level::Step,
            entries(&["shell", "run", "name", "env", "continue-on-error", "id"]),
        );
        assert_eq!(
            keys_of(&value),
            ["name", "id", "env", "run", "continue-on-error", "shell"]
        );
    }

    #[test]
    fn workflow_keys() {
        let value = ordered(
            Level::Workflow,
            entries(&["jobs", "on", "name", "permissions", "env"]),
        );
        assert_eq!(keys_of(&value), ["name", "on", "permissions", "env", "jobs"]);
    }

    #[test]
    fn other_level_is_lexical() {
        let value = ordered(Level::Other, entries(&["b", "a", "name"]));
        assert_eq!(keys_of(&value), ["a", "b", "name"]);
    }

    #[test]
    fn user_mappings_sort_recursively() {
        let value: Value = serde_yaml::from_str("b: 1\na:\n  - z: 1\n    y: 2\n").unwrap();
        let sorted = lexical(&value);
        assert_eq!(keys_of(&sorted), ["a", "b"]);
        assert_eq!(keys_of(&sorted["a"][0]), ["y", "z"]);
    }
}
