//! Workflow Configuration Collector
//!
//! Drives the question sequence for one stage and returns a validated
//! [`WorkflowConfig`]. The order is fixed:
//!
//! 1. task name
//! 2. sample identifiers
//! 3. one input path per role the stage declares
//! 4. output directory
//! 5. stage parameters, in declaration order
//!
//! A rejected answer re-prompts the same field with the reason shown. Fatal
//! errors (closed input, an unusable output directory, too many rejections)
//! abort the whole collection.

use chrono::Local;
use labflow_sdk::{FieldSchema, FieldType};
use std::collections::{BTreeMap, HashSet};

use crate::config::{Parameters, Value, WorkflowConfig};
use crate::error::{CollectionError, FieldError};
use crate::history::History;
use crate::prompt::Prompter;
use crate::settings::Settings;
use crate::stage::ProcessingStage;
use crate::validate::{check_file_name, check_relations, validate};

pub const TASK_NAME: &str = "task_name";
pub const SAMPLE_IDENTIFIERS: &str = "sample_identifiers";
pub const OUTPUT_DIRECTORY: &str = "output_directory";

fn task_name_field() -> FieldSchema {
    FieldSchema::new(TASK_NAME, "Task name", FieldType::Text)
        .with_description("Labels the script and every exported file")
}

fn output_directory_field() -> FieldSchema {
    FieldSchema::new(OUTPUT_DIRECTORY, "Output directory", FieldType::OutputDir)
        .with_description("Created if it does not exist")
}

fn builtin(mut field: FieldSchema, name: &str) -> FieldSchema {
    field.name = name.to_string();
    field.required = true;
    field
}

/// Every top-level prompt for `stage`, in the order they are asked
pub fn prompt_plan<S: ProcessingStage + ?Sized>(stage: &S) -> Vec<FieldSchema> {
    let mut fields = vec![
        task_name_field(),
        builtin(stage.sample_field(), SAMPLE_IDENTIFIERS),
    ];
    fields.extend(stage.input_roles().into_iter().map(|role| {
        let name = role.name.clone();
        builtin(role, &name)
    }));
    fields.push(output_directory_field());
    fields.extend(stage.parameter_fields());
    fields
}

pub struct Collector<'a> {
    stage: &'a dyn ProcessingStage,
    prompter: &'a mut dyn Prompter,
    settings: &'a Settings,
    history: Option<&'a mut History>,
    workflow: String,
    /// (key, answer) pairs committed to history on success
    answers: Vec<(String, String)>,
    catalogs_shown: HashSet<String>,
}

impl<'a> Collector<'a> {
    pub fn new(
        stage: &'a dyn ProcessingStage,
        prompter: &'a mut dyn Prompter,
        settings: &'a Settings,
    ) -> Self {
        Self {
            stage,
            prompter,
            settings,
            history: None,
            workflow: stage.metadata().id,
            answers: Vec::new(),
            catalogs_shown: HashSet::new(),
        }
    }

    /// Offer previous answers as defaults and record the new ones
    pub fn with_history(mut self, history: &'a mut History) -> Self {
        self.history = Some(history);
        self
    }

    /// Run the whole question sequence once
    pub fn collect(mut self) -> Result<WorkflowConfig, CollectionError> {
        tracing::info!(workflow = %self.workflow, "collecting configuration");

        let task_name = self
            .ask_field(TASK_NAME, &task_name_field(), &[])?
            .and_then(Value::into_text)
            .ok_or_else(|| unanswered(TASK_NAME))?;

        let sample_field = builtin(self.stage.sample_field(), SAMPLE_IDENTIFIERS);
        let samples = self
            .ask_field(SAMPLE_IDENTIFIERS, &sample_field, &[])?
            .unwrap_or(Value::List(Vec::new()));
        let sample_identifiers = samples.as_list().map(<[String]>::to_vec).unwrap_or_default();

        let mut input_paths = BTreeMap::new();
        for role in self.stage.input_roles() {
            let role = builtin(role.clone(), &role.name);
            let key = format!("input_paths.{}", role.name);
            if let Some(path) = self.ask_field(&key, &role, &[])?.and_then(Value::into_path) {
                input_paths.insert(role.name.clone(), path);
            }
        }

        let output_directory = self
            .ask_field(OUTPUT_DIRECTORY, &output_directory_field(), &[])?
            .and_then(Value::into_path)
            .ok_or_else(|| unanswered(OUTPUT_DIRECTORY))?;

        let mut builtins = Parameters::new();
        builtins.insert(SAMPLE_IDENTIFIERS.to_string(), samples);
        let fields = self.stage.parameter_fields();
        let parameters = self.collect_group("parameters", &fields, &[&builtins])?;

        self.commit_history();

        Ok(WorkflowConfig {
            workflow: self.workflow,
            task_name,
            sample_identifiers,
            input_paths,
            output_directory,
            parameters,
            collected_at: Local::now(),
        })
    }

    /// Ask every field of a group; nested groups see the answers given so far
    fn collect_group(
        &mut self,
        prefix: &str,
        fields: &[FieldSchema],
        outer: &[&Parameters],
    ) -> Result<Parameters, CollectionError> {
        let mut params = Parameters::new();

        for field in fields {
            let key = format!("{}.{}", prefix, field.name);
            let value = {
                let mut scopes: Vec<&Parameters> = vec![&params];
                scopes.extend_from_slice(outer);
                match &field.field_type {
                    FieldType::Repeated { fields: group } => {
                        Some(self.collect_sets(&key, field, group, &scopes)?)
                    }
                    _ => self.ask_field(&key, field, &scopes)?,
                }
            };
            if let Some(value) = value {
                params.insert(field.name.clone(), value);
            }
        }

        Ok(params)
    }

    /// At least one set, then "add another?" until the answer is no
    fn collect_sets(
        &mut self,
        key: &str,
        field: &FieldSchema,
        group: &[FieldSchema],
        scopes: &[&Parameters],
    ) -> Result<Value, CollectionError> {
        let mut sets = Vec::new();

        loop {
            let index = sets.len();
            self.prompter
                .notify(&format!("\n--- {} #{} ---", field.label, index + 1))?;
            let set = self.collect_group(&format!("{}.{}", key, index), group, scopes)?;
            sets.push(set);

            let next = format!("{}.{}", key, index + 1);
            let prompt = format!("Add another entry to {}?", field.label.to_lowercase());
            match self.prompter.confirm(&next, &prompt)? {
                Some(true) => continue,
                Some(false) => break,
                None => {
                    return Err(CollectionError::InputClosed {
                        field: field.label.clone(),
                    })
                }
            }
        }

        tracing::debug!(field = %key, sets = sets.len(), "collected repeated group");
        Ok(Value::Sets(sets))
    }

    /// Prompt until the field validates; `None` for a skipped optional field
    fn ask_field(
        &mut self,
        key: &str,
        field: &FieldSchema,
        scopes: &[&Parameters],
    ) -> Result<Option<Value>, CollectionError> {
        // Task names are always typed fresh
        let default = field.default.clone().or_else(|| {
            if key == TASK_NAME {
                return None;
            }
            self.history
                .as_deref()
                .and_then(|h| h.latest(&self.workflow, key))
                .map(str::to_string)
        });
        let prompt = prompt_text(field, default.as_deref());

        if let FieldType::MultiSelect { options } = &field.field_type {
            if self.catalogs_shown.insert(field.name.clone()) {
                self.prompter.notify(&format!("Available {}:", field.label.to_lowercase()))?;
                for option in options {
                    self.prompter.notify(&format!("  • {}", option))?;
                }
            }
        }

        let mut attempts = 0;
        loop {
            let raw = self
                .prompter
                .ask(key, &prompt)?
                .ok_or_else(|| CollectionError::InputClosed {
                    field: field.label.clone(),
                })?;

            let raw = if raw.trim().is_empty() {
                match &default {
                    Some(default) => default.clone(),
                    None if !field.required => {
                        tracing::debug!(field = %key, "optional field skipped");
                        return Ok(None);
                    }
                    None => raw,
                }
            } else {
                raw
            };

            let checked = validate(field, &raw).and_then(|value| {
                check_relations(field, &value, scopes)?;
                if key == TASK_NAME {
                    check_file_name(field, &value.to_answer())?;
                }
                Ok::<_, FieldError>(value)
            });

            match checked {
                Ok(value) => {
                    tracing::debug!(field = %key, answer = %value.to_answer(), "accepted");
                    if !matches!(value, Value::Sets(_)) {
                        self.answers.push((key.to_string(), value.to_answer()));
                    }
                    return Ok(Some(value));
                }
                Err(FieldError::Fatal(e)) => {
                    tracing::error!(field = %key, error = %e, "collection aborted");
                    return Err(e);
                }
                Err(FieldError::Invalid(e)) => {
                    attempts += 1;
                    tracing::warn!(field = %key, reason = %e, attempts, "answer rejected");
                    self.prompter.notify(&format!("  ✗ {}", e))?;
                    if self.settings.max_attempts > 0 && attempts >= self.settings.max_attempts {
                        return Err(CollectionError::TooManyAttempts {
                            field: field.label.clone(),
                            attempts,
                        });
                    }
                }
            }
        }
    }

    fn commit_history(&mut self) {
        let limit = self.settings.history_limit;
        if let Some(history) = self.history.as_deref_mut() {
            for (key, answer) in &self.answers {
                history.record(&self.workflow, key, answer, limit);
            }
        }
    }
}

fn unanswered(field: &str) -> CollectionError {
    CollectionError::Unanswered {
        field: field.to_string(),
    }
}

/// `Label [HINT] (description) [default: x]`
fn prompt_text(field: &FieldSchema, default: Option<&str>) -> String {
    let mut prompt = format!("{} {}", field.label, field.field_type.hint());
    if !field.description.is_empty() {
        prompt.push_str(&format!(" ({})", field.description));
    }
    if let Some(default) = default {
        prompt.push_str(&format!(" [default: {}]", default));
    }
    prompt
}
