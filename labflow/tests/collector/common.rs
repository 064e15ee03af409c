//! Common test utilities for collector tests

use anyhow::Result;
use labflow::collector::Collector;
use labflow::config::WorkflowConfig;
use labflow::credentials::CredentialProvider;
use labflow::error::CollectionError;
use labflow::history::History;
use labflow::prompt::ConsolePrompter;
use labflow::settings::Settings;
use labflow::stage::{ProcessingStage, RunReport};
use labflow_sdk::{FieldSchema, FieldType, WorkflowMetadata};
use std::io::Cursor;
use std::path::{Path, PathBuf};

pub type TestPrompter = ConsolePrompter<Cursor<Vec<u8>>, Vec<u8>>;

/// Console prompter fed with one answer per line
pub fn console(answers: &[&str]) -> TestPrompter {
    let mut input = answers.join("\n");
    input.push('\n');
    ConsolePrompter::new(Cursor::new(input.into_bytes()), Vec::new())
}

/// Run one collection; returns the result and everything printed
pub fn collect(
    stage: &dyn ProcessingStage,
    answers: &[&str],
    settings: &Settings,
    history: Option<&mut History>,
) -> (Result<WorkflowConfig, CollectionError>, String) {
    let mut prompter = console(answers);
    let result = {
        let mut collector = Collector::new(stage, &mut prompter, settings);
        if let Some(history) = history {
            collector = collector.with_history(history);
        }
        collector.collect()
    };
    let transcript = String::from_utf8(prompter.into_output()).unwrap();
    (result, transcript)
}

/// Create a file with content inside `dir`
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

pub fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Minimal stage: one input file and two parameters
pub struct AssayStage;

impl ProcessingStage for AssayStage {
    fn metadata(&self) -> WorkflowMetadata {
        WorkflowMetadata {
            id: "assay".to_string(),
            name: "Assay".to_string(),
            description: "Protein isolation assay".to_string(),
        }
    }

    fn sample_field(&self) -> FieldSchema {
        FieldSchema::new(
            "samples",
            "Sample identifiers",
            FieldType::Identifiers { max_digits: None },
        )
    }

    fn input_roles(&self) -> Vec<FieldSchema> {
        vec![FieldSchema::new(
            "plate_map",
            "Plate map",
            FieldType::InputPath { directory: false },
        )]
    }

    fn parameter_fields(&self) -> Vec<FieldSchema> {
        vec![
            FieldSchema::new(
                "replicates",
                "Replicates",
                FieldType::Number {
                    min: Some(1),
                    max: Some(10),
                },
            )
            .with_default("3"),
            FieldSchema::new("note", "Note", FieldType::Text).optional(),
        ]
    }

    fn run(
        &self,
        config: &WorkflowConfig,
        _credentials: &dyn CredentialProvider,
    ) -> Result<RunReport> {
        let path = config.output_file(".yaml");
        std::fs::write(&path, config.to_yaml()?)?;
        Ok(RunReport {
            files: vec![(path, "Configuration".to_string())],
            ..RunReport::default()
        })
    }
}
