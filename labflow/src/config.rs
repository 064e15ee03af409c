//! The validated run configuration handed to a processing stage

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Stage parameters by name
pub type Parameters = BTreeMap<String, Value>;

/// A validated answer
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Path(PathBuf),
    List(Vec<String>),
    FloatList(Vec<f64>),
    Sets(Vec<Parameters>),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_path(self) -> Option<PathBuf> {
        match self {
            Value::Path(p) => Some(p),
            _ => None,
        }
    }

    /// Length of list-like values, used for cross-field checks
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(items.len()),
            Value::FloatList(items) => Some(items.len()),
            Value::Sets(sets) => Some(sets.len()),
            _ => None,
        }
    }

    /// Plain-text form used for history and for comparing selects
    pub fn to_answer(&self) -> String {
        match self {
            Value::Bool(true) => "yes".to_string(),
            Value::Bool(false) => "no".to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Text(s) => s.clone(),
            Value::Path(p) => p.display().to_string(),
            Value::List(items) => items.join(", "),
            Value::FloatList(items) => items
                .iter()
                .map(|f| f.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            Value::Sets(sets) => format!("{} set(s)", sets.len()),
        }
    }
}

/// Typed lookups into [`Parameters`], failing with the parameter name
pub trait ParameterExt {
    fn text(&self, name: &str) -> Result<&str>;
    fn list(&self, name: &str) -> Result<&[String]>;
    fn floats(&self, name: &str) -> Result<&[f64]>;
    fn float(&self, name: &str) -> Result<f64>;
    fn integer(&self, name: &str) -> Result<i64>;
    fn flag(&self, name: &str) -> Result<bool>;
    fn sets(&self, name: &str) -> Result<&[Parameters]>;
}

impl ParameterExt for Parameters {
    fn text(&self, name: &str) -> Result<&str> {
        match self.get(name) {
            Some(Value::Text(s)) => Ok(s),
            other => Err(mismatch(name, "text", other)),
        }
    }

    fn list(&self, name: &str) -> Result<&[String]> {
        match self.get(name) {
            Some(Value::List(items)) => Ok(items),
            other => Err(mismatch(name, "list", other)),
        }
    }

    fn floats(&self, name: &str) -> Result<&[f64]> {
        match self.get(name) {
            Some(Value::FloatList(items)) => Ok(items),
            other => Err(mismatch(name, "list of decimals", other)),
        }
    }

    fn float(&self, name: &str) -> Result<f64> {
        match self.get(name) {
            Some(Value::Float(f)) => Ok(*f),
            Some(Value::Integer(i)) => Ok(*i as f64),
            other => Err(mismatch(name, "decimal", other)),
        }
    }

    fn integer(&self, name: &str) -> Result<i64> {
        match self.get(name) {
            Some(Value::Integer(i)) => Ok(*i),
            other => Err(mismatch(name, "integer", other)),
        }
    }

    fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name) {
            Some(Value::Bool(b)) => Ok(*b),
            other => Err(mismatch(name, "yes/no", other)),
        }
    }

    fn sets(&self, name: &str) -> Result<&[Parameters]> {
        match self.get(name) {
            Some(Value::Sets(sets)) => Ok(sets),
            other => Err(mismatch(name, "sets", other)),
        }
    }
}

fn mismatch(name: &str, expected: &str, found: Option<&Value>) -> anyhow::Error {
    match found {
        None => anyhow!("parameter {} is missing", name),
        Some(value) => anyhow!(
            "parameter {} should be a {}, found {:?}",
            name,
            expected,
            value
        ),
    }
}

/// Validated configuration for one run
///
/// Built once by [`crate::collector::Collector::collect`] and then only
/// borrowed. Every invariant below holds when it is returned:
/// - `task_name` is not blank
/// - `sample_identifiers` is non-empty and has no duplicates
/// - each `input_paths` entry existed and was readable at validation time
/// - `output_directory` exists and accepted a probe write
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowConfig {
    /// Id of the stage this configuration was collected for
    pub workflow: String,
    pub task_name: String,
    pub sample_identifiers: Vec<String>,
    pub input_paths: BTreeMap<String, PathBuf>,
    pub output_directory: PathBuf,
    pub parameters: Parameters,
    pub collected_at: DateTime<Local>,
}

impl WorkflowConfig {
    pub fn input_path(&self, role: &str) -> Result<&Path> {
        self.input_paths
            .get(role)
            .map(PathBuf::as_path)
            .ok_or_else(|| anyhow!("input {} was not collected", role))
    }

    /// Path of a file named after the task inside the output directory
    pub fn output_file(&self, suffix: &str) -> PathBuf {
        self.output_directory
            .join(format!("{}{}", self.task_name, suffix))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
