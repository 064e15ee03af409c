// Re-export the derive macro
pub use labflow_macros::WorkflowDefinition;

use serde::{Deserialize, Serialize};

/// Workflow metadata (id, name, description)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Complete workflow metadata with fields (for JSON export)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FullWorkflowMetadata {
    #[serde(flatten)]
    pub metadata: WorkflowMetadata,
    pub fields: Vec<FieldSchema>,
}

impl FullWorkflowMetadata {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Field schema definition
///
/// One schema drives one prompt. `name` is the key the answer is stored under,
/// `label` is what the user sees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    pub field_type: FieldType,
    pub label: String,
    pub description: String,
    pub cli_arg: String,
    pub required: bool,
    pub default: Option<String>,
}

impl FieldSchema {
    /// Build a required field outside of a derived struct
    pub fn new(name: &str, label: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            label: label.to_string(),
            description: String::new(),
            cli_arg: format!("--{}", name.replace('_', "-")),
            required: true,
            default: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Field type enum
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        min: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        max: Option<i64>,
    },
    Float,
    Bool,
    /// Ordered list of unique tokens
    Identifiers {
        /// Restrict tokens to numeric codes of at most this many digits
        #[serde(skip_serializing_if = "Option::is_none")]
        max_digits: Option<usize>,
    },
    FloatList {
        /// Name of a list whose length this one must match (or be exactly 1)
        #[serde(skip_serializing_if = "Option::is_none")]
        len_matches: Option<String>,
    },
    Select {
        options: Vec<String>,
        /// Name of a sibling select whose value this one must differ from
        #[serde(skip_serializing_if = "Option::is_none")]
        distinct_from: Option<String>,
    },
    MultiSelect {
        options: Vec<String>,
    },
    InputPath {
        directory: bool,
    },
    OutputDir,
    /// A group of fields asked repeatedly until the user stops
    Repeated {
        fields: Vec<FieldSchema>,
    },
}

impl FieldType {
    /// Short tag shown in front of a prompt, e.g. `[NUMBER 1-10]`
    pub fn hint(&self) -> String {
        match self {
            FieldType::Text => "[TEXT]".to_string(),
            FieldType::Number { min: Some(min), max: Some(max) } => {
                format!("[NUMBER {}-{}]", min, max)
            }
            FieldType::Number { .. } => "[NUMBER]".to_string(),
            FieldType::Float => "[DECIMAL]".to_string(),
            FieldType::Bool => "[YES/NO]".to_string(),
            FieldType::Identifiers { .. } => "[LIST]".to_string(),
            FieldType::FloatList { .. } => "[DECIMALS]".to_string(),
            FieldType::Select { options, .. } => format!("[{}]", options.join("/")),
            FieldType::MultiSelect { .. } => "[CHOICES]".to_string(),
            FieldType::InputPath { directory: true } => "[DIRECTORY]".to_string(),
            FieldType::InputPath { directory: false } => "[FILE PATH]".to_string(),
            FieldType::OutputDir => "[OUTPUT DIR]".to_string(),
            FieldType::Repeated { .. } => "[SETS]".to_string(),
        }
    }
}

/// Trait that workflows must implement (auto-implemented by derive macro)
pub trait WorkflowDefinition {
    fn metadata() -> WorkflowMetadata;
    fn fields() -> Vec<FieldSchema>;

    fn full_metadata() -> FullWorkflowMetadata
    where
        Self: Sized,
    {
        FullWorkflowMetadata {
            metadata: Self::metadata(),
            fields: Self::fields(),
        }
    }
}

// ============================================================================
// Console Logging Macros
// ============================================================================
// Colored console output for the interactive session. Structured logs go
// through `tracing` on stderr; these stay on stdout next to the prompts.
// ============================================================================

/// Logs the start of a collection or generation step with a header and description.
///
/// # Example
/// ```
/// use labflow_sdk::log_step_start_console;
/// log_step_start_console!(1, "Collect", "Gather task metadata");
/// ```
///
/// Outputs:
/// ```text
/// ═══ STEP 1: Collect ═══
/// Gather task metadata
/// ```
#[macro_export]
macro_rules! log_step_start_console {
    ($step:expr, $title:expr, $description:expr) => {
        println!("\x1b[1;36m═══ STEP {}: {} ═══\x1b[0m", $step, $title);
        println!("\x1b[36m{}\x1b[0m", $description);
    };
}

/// Logs the completion of a step.
///
/// # Example
/// ```
/// use labflow_sdk::log_step_complete_console;
/// log_step_complete_console!(1);
/// ```
///
/// Outputs:
/// ```text
/// ✓ Step 1 complete
/// ```
#[macro_export]
macro_rules! log_step_complete_console {
    ($step:expr) => {
        println!("\x1b[32m✓ Step {} complete\x1b[0m", $step);
    };
}

/// Logs the number of items found.
///
/// # Example
/// ```
/// use labflow_sdk::log_found;
/// log_found!(3, "workflows");
/// ```
///
/// Outputs:
/// ```text
/// Found 3 workflows
/// ```
#[macro_export]
macro_rules! log_found {
    ($count:expr, $item_type:expr) => {
        println!("\x1b[36mFound {} {}\x1b[0m", $count, $item_type);
    };
}

/// Logs a file written by a workflow.
///
/// # Example
/// ```
/// use labflow_sdk::log_file_written;
/// log_file_written!("/tmp/out/run.tcl", "Tcl script");
/// ```
///
/// Outputs:
/// ```text
///   ✓ Tcl script: /tmp/out/run.tcl
/// ```
#[macro_export]
macro_rules! log_file_written {
    ($path:expr, $description:expr) => {
        println!("\x1b[32m  ✓ {}: {}\x1b[0m", $description, $path);
    };
}

/// Logs a summary line for a finished run.
///
/// # Example
/// ```
/// use labflow_sdk::log_summary;
/// log_summary!(412, 2);
/// ```
///
/// Outputs:
/// ```text
/// Total: 412 commands, 2 files
/// ```
#[macro_export]
macro_rules! log_summary {
    ($commands:expr, $files:expr) => {
        println!("\x1b[1mTotal: {} commands, {} files\x1b[0m", $commands, $files);
    };
}
