//! Deterministic YAML emission.
//!
//! The compiler builds a [`CompiledWorkflow`] and this module turns it into
//! a `serde_yaml::Value` whose mappings are already in output order: fixed
//! leading keys per level (see [`order`]), everything else lexical.
//! `serde_yaml` then writes it, quoting strings a reader would re-type and
//! using literal blocks for multi-line strings. The same model always
//! renders to the same bytes.

mod order;


pub use order::{Level, lexical, ordered};

use crate::error::{CompileError, Result};
use crate::permissions::Permissions;
use serde_yaml::Value;
use std::collections::BTreeMap;

/// Name written into the generated-file header.
pub const GENERATOR: &str = "awc";
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A complete generated workflow.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompiledWorkflow {
    pub name: String,
    pub on: Value,
    pub permissions: Option<Permissions>,
    pub concurrency: Option<Value>,
    pub run_name: Option<String>,
    pub env: BTreeMap<String, Value>,
    /// Jobs keyed by id; rendered in key order.
    pub jobs: BTreeMap<String, Job>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Job {
    pub name: Option<String>,
    pub needs: Vec<String>,
    pub condition: Option<String>,
    pub runs_on: Value,
    pub permissions: Permissions,
    pub environment: Option<Value>,
    pub container: Option<Value>,
    pub concurrency: Option<Value>,
    pub timeout_minutes: Option<u32>,
    pub env: BTreeMap<String, Value>,
    pub outputs: BTreeMap<String, String>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Step {
    pub name: Option<String>,
    pub id: Option<String>,
    pub condition: Option<String>,
    pub uses: Option<String>,
    pub with: BTreeMap<String, Value>,
    pub env: BTreeMap<String, Value>,
    pub run: Option<String>,
    /// Any other step keys (`shell`, `continue-on-error`, ...).
    pub extra: BTreeMap<String, Value>,
}

impl Step {
    /// A `run:` step.
    pub fn run(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            run: Some(script.into()),
            ..Self::default()
        }
    }

    /// A `uses:` step.
    pub fn uses(name: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            uses: Some(action.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn when(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Build a step from a user-written mapping.
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Mapping(mapping) = value else {
            return Err(CompileError::configuration(
                "each step must be a mapping with 'run' or 'uses'",
            ));
        };

        let mut step = Step::default();
        for (key, value) in mapping {
            let Some(key) = key.as_str() else {
                return Err(CompileError::configuration("step keys must be strings"));
            };
            match key {
                "name" => step.name = value_text(value),
                "id" => step.id = value_text(value),
                "if" => step.condition = value_text(value),
                "uses" => step.uses = value_text(value),
                "run" => step.run = value_text(value),
                "with" => step.with = string_keyed(value),
                "env" => step.env = string_keyed(value),
                other => {
                    step.extra.insert(other.to_string(), value.clone());
                }
            }
        }
        Ok(step)
    }

    fn to_value(&self) -> Value {
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        insert_opt(&mut entries, "name", &self.name);
        insert_opt(&mut entries, "id", &self.id);
        insert_opt(&mut entries, "if", &self.condition);
        insert_opt(&mut entries, "uses", &self.uses);
        insert_opt(&mut entries, "run", &self.run);
        insert_map(&mut entries, "with", &self.with);
        insert_map(&mut entries, "env", &self.env);
        for (key, value) in &self.extra {
            entries.insert(key.clone(), lexical(value));
        }
        ordered(Level::Step, entries)
    }
}

impl Job {
    fn to_value(&self) -> Value {
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        insert_opt(&mut entries, "name", &self.name);
        match self.needs.as_slice() {
            [] => {}
            [only] => {
                entries.insert("needs".to_string(), Value::from(only.as_str()));
            }
            many => {
                entries.insert(
                    "needs".to_string(),
                    Value::Sequence(many.iter().map(|n| Value::from(n.as_str())).collect()),
                );
            }
        }
        insert_opt(&mut entries, "if", &self.condition);
        entries.insert("runs-on".to_string(), lexical(&self.runs_on));
        entries.insert("permissions".to_string(), permissions_value(&self.permissions));
        insert_value(&mut entries, "environment", &self.environment);
        insert_value(&mut entries, "container", &self.container);
        insert_value(&mut entries, "concurrency", &self.concurrency);
        if let Some(minutes) = self.timeout_minutes {
            entries.insert("timeout-minutes".to_string(), Value::from(minutes));
        }
        insert_map(&mut entries, "env", &self.env);
        if !self.outputs.is_empty() {
            let outputs = self
                .outputs
                .iter()
                .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
                .collect();
            entries.insert("outputs".to_string(), ordered(Level::Other, outputs));
        }
        entries.insert(
            "steps".to_string(),
            Value::Sequence(self.steps.iter().map(Step::to_value).collect()),
        );
        ordered(Level::Job, entries)
    }
}

impl CompiledWorkflow {
    /// The workflow as a YAML value in output order.
    pub fn to_value(&self) -> Value {
        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        entries.insert("name".to_string(), Value::from(self.name.as_str()));
        entries.insert("on".to_string(), lexical(&self.on));
        if let Some(permissions) = &self.permissions {
            entries.insert("permissions".to_string(), permissions_value(permissions));
        }
        insert_value(&mut entries, "concurrency", &self.concurrency);
        insert_opt(&mut entries, "run-name", &self.run_name);
        insert_map(&mut entries, "env", &self.env);
        let jobs = self
            .jobs
            .iter()
            .map(|(id, job)| (id.clone(), job.to_value()))
            .collect();
        entries.insert("jobs".to_string(), ordered(Level::Other, jobs));
        ordered(Level::Workflow, entries)
    }
}

/// Generated-file header contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    /// Source document path as shown to readers.
    pub source: String,
    /// Imported fragments in merge order.
    pub imports: Vec<String>,
}

impl Header {
    pub fn render(&self) -> String {
        let mut out = format!(
            "# This file was automatically generated by {} {}. DO NOT EDIT.\n",
            GENERATOR, GENERATOR_VERSION
        );
        out.push_str("# To update this file, edit the source workflow and run `awc compile`.\n");
        out.push_str("#\n");
        out.push_str(&format!("# Source: {}\n", self.source));
        if !self.imports.is_empty() {
            out.push_str("#\n# Imports:\n");
            for import in &self.imports {
                out.push_str(&format!("#   - {}\n", import));
            }
        }
        out
    }
}

/// Render the header followed by the workflow YAML.
pub fn render_workflow(workflow: &CompiledWorkflow, header: &Header) -> serde_yaml::Result<String> {
    let mut out = header.render();
    out.push('\n');
    out.push_str(&serde_yaml::to_string(&workflow.to_value())?);
    Ok(out)
}

/// Value for a `permissions:` entry: the shorthand token or a scope map.
pub fn permissions_value(permissions: &Permissions) -> Value {
    if let Some(shorthand) = permissions.shorthand() {
        return Value::from(shorthand.as_str());
    }
    Value::Mapping(
        permissions
            .rendered_entries()
            .into_iter()
            .map(|(scope, level)| (Value::from(scope.as_str()), Value::from(level.as_str())))
            .collect(),
    )
}

fn insert_opt(entries: &mut BTreeMap<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        entries.insert(key.to_string(), Value::from(value.as_str()));
    }
}

fn insert_value(entries: &mut BTreeMap<String, Value>, key: &str, value: &Option<Value>) {
    if let Some(value) = value {
        entries.insert(key.to_string(), lexical(value));
    }
}

fn insert_map(entries: &mut BTreeMap<String, Value>, key: &str, map: &BTreeMap<String, Value>) {
    if map.is_empty() {
        return;
    }
    let values = map.iter().map(|(k, v)| (k.clone(), lexical(v))).collect();
    entries.insert(key.to_string(), ordered(Level::Other, values));
}

fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_keyed(value: &Value) -> BTreeMap<String, Value> {
    match value {
        Value::Mapping(mapping) => mapping
            .iter()
            .filter_map(|(k, v)| k.as_str().map(|k| (k.to_string(), v.clone())))
            .collect(),
        _ => BTreeMap::new(),
    }
}
