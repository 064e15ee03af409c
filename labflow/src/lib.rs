// Command line arguments
pub mod cli;

// Question sequence and run configuration
pub mod collector;
pub mod config;
pub mod prompt;
pub mod validate;

// Errors, settings and answer history
pub mod error;
pub mod history;
pub mod settings;

// Protected resource credentials
pub mod credentials;

// Processing stages
pub mod registry;
pub mod stage;
pub mod tcl;

pub use collector::Collector;
pub use config::{Parameters, Value, WorkflowConfig};
pub use error::{AuthError, CollectionError, FieldError, ValidationError};
pub use stage::{ProcessingStage, RunReport};
