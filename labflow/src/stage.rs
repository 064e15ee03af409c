//! Downstream processing stages
//!
//! A stage declares what the collector must ask for and consumes the
//! resulting [`WorkflowConfig`].

use anyhow::Result;
use labflow_sdk::{FieldSchema, FullWorkflowMetadata, WorkflowMetadata};
use std::path::PathBuf;

use crate::collector;
use crate::config::WorkflowConfig;
use crate::credentials::CredentialProvider;

/// What a stage produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// (path, description) of every file written
    pub files: Vec<(PathBuf, String)>,
    /// Number of commands emitted (comments and blank lines excluded)
    pub commands: usize,
    /// Referenced data files that were not found in the input directory
    pub missing_inputs: Vec<String>,
    /// Full text of the generated script
    pub script: String,
}

pub trait ProcessingStage {
    fn metadata(&self) -> WorkflowMetadata;

    /// Schema for the sample identifier list (label, numeric-code rule)
    fn sample_field(&self) -> FieldSchema;

    /// One input path field per role, named after the role
    fn input_roles(&self) -> Vec<FieldSchema>;

    /// Stage parameters in prompt order
    fn parameter_fields(&self) -> Vec<FieldSchema>;

    /// Resources that need a credential before [`ProcessingStage::run`]
    fn protected_resources(&self) -> Vec<String> {
        Vec::new()
    }

    fn run(
        &self,
        config: &WorkflowConfig,
        credentials: &dyn CredentialProvider,
    ) -> Result<RunReport>;

    /// Every prompt the collector will issue, in order
    fn full_metadata(&self) -> FullWorkflowMetadata {
        FullWorkflowMetadata {
            metadata: self.metadata(),
            fields: collector::prompt_plan(self),
        }
    }
}
