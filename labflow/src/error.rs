//! Error taxonomy for collection and credential lookup
//!
//! [`ValidationError`] is recoverable and scoped to one field: the collector
//! shows it and asks the same field again. [`CollectionError`] ends the run.

use std::path::PathBuf;
use thiserror::Error;

/// A rejected answer. The message is shown to the user verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("duplicate identifier \"{value}\"")]
    Duplicate { value: String },

    #[error("{field} needs at least one entry")]
    EmptyList { field: String },

    #[error("{} does not exist", .path.display())]
    NotFound { path: PathBuf },

    #[error("{} is not readable: {reason}", .path.display())]
    NotReadable { path: PathBuf, reason: String },

    #[error("{} is not a {expected}", .path.display())]
    WrongKind { path: PathBuf, expected: &'static str },

    #[error("\"{value}\" is not a valid {expected}")]
    InvalidNumber { value: String, expected: &'static str },

    #[error("{value} is outside the allowed range {min}..={max}")]
    OutOfRange { value: i64, min: i64, max: i64 },

    #[error("\"{value}\" is not yes or no")]
    InvalidBool { value: String },

    #[error("\"{value}\" is not one of: {}{}", .options.join(", "), suggestion_suffix(.suggestion))]
    UnknownOption {
        value: String,
        options: Vec<String>,
        suggestion: Option<String>,
    },

    #[error("\"{value}\" is not a numeric code of at most {max_digits} digits")]
    InvalidCode { value: String, max_digits: usize },

    #[error("{field} cannot be the same as {other} ({value})")]
    SameAs {
        field: String,
        other: String,
        value: String,
    },

    #[error("{field} must be a plain file name, not \"{value}\"")]
    NotAFileName { field: String, value: String },

    #[error("{field} is answered set by set, not as a single value")]
    Grouped { field: String },

    #[error("{field} needs 1 or {expected} values, got {actual}")]
    LengthMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean \"{}\"?)", s),
        None => String::new(),
    }
}

/// Fatal collection failure. The run aborts and nothing is kept.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("output directory {} exists but is not a directory", .path.display())]
    OutputNotDirectory { path: PathBuf },

    #[error("output directory {} is not writable: {source}", .path.display())]
    OutputNotWritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input closed while waiting for {field}")]
    InputClosed { field: String },

    #[error("giving up on {field} after {attempts} rejected answers")]
    TooManyAttempts { field: String, attempts: u32 },

    #[error("could not load answers file {}: {reason}", .path.display())]
    Answers { path: PathBuf, reason: String },

    #[error("no answer for required field {field}")]
    Unanswered { field: String },

    #[error("terminal I/O failed")]
    Io(#[from] std::io::Error),
}

/// A protected resource could not be accessed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AuthError {
    #[error("no credential configured for {resource} (set {variable})")]
    Missing { resource: String, variable: String },

    #[error("access to {resource} denied: {reason}")]
    Denied { resource: String, reason: String },
}

/// Outcome of validating one answer: ask again, or stop.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Fatal(#[from] CollectionError),
}
