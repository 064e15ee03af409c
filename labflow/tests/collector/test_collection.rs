//! Tests for the collection dialogue
//!
//! Prompt order, per-field validation, re-prompting and fatal errors

use super::common::*;
use labflow::collector::prompt_plan;
use labflow::config::Value;
use labflow::error::CollectionError;
use labflow::settings::Settings;
use std::path::PathBuf;

// ============================================================================
// Successful collection
// ============================================================================

#[test]
fn test_protein_isolation_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", "well,sample\nA1,S1\n"));
    let out = path_str(&dir.path().join("out"));

    let (result, _) = collect(
        &AssayStage,
        &["protein_isolation_2025_07_20", "S1,S2", input.as_str(), out.as_str(), "", ""],
        &Settings::default(),
        None,
    );
    let config = result.unwrap();

    assert_eq!(config.workflow, "assay");
    assert_eq!(config.task_name, "protein_isolation_2025_07_20");
    assert_eq!(config.sample_identifiers, vec!["S1", "S2"]);
    assert_eq!(config.input_paths["plate_map"], PathBuf::from(&input));
    assert_eq!(config.output_directory, PathBuf::from(&out));
    assert!(dir.path().join("out").is_dir());

    // Default applied, optional field skipped
    assert_eq!(config.parameters["replicates"], Value::Integer(3));
    assert!(!config.parameters.contains_key("note"));
}

#[test]
fn test_prompts_follow_fixed_order() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(dir.path());

    let (result, transcript) = collect(
        &AssayStage,
        &["run", "S1", input.as_str(), out.as_str(), "4", "first pass"],
        &Settings::default(),
        None,
    );
    let config = result.unwrap();
    assert_eq!(config.parameters["note"], Value::Text("first pass".into()));

    let labels = [
        "Task name",
        "Sample identifiers",
        "Plate map",
        "Output directory",
        "Replicates",
        "Note",
    ];
    let positions: Vec<usize> = labels
        .iter()
        .map(|label| transcript.find(label).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", transcript);
}

#[test]
fn test_prompt_plan_lists_builtins_first() {
    let names: Vec<String> = prompt_plan(&AssayStage).into_iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        ["task_name", "sample_identifiers", "plate_map", "output_directory", "replicates", "note"]
    );
}

// ============================================================================
// Re-prompting
// ============================================================================

#[test]
fn test_duplicate_identifiers_are_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(dir.path());

    let (result, transcript) = collect(
        &AssayStage,
        &["run", "S1,S1", "S1,S2", input.as_str(), out.as_str(), "", ""],
        &Settings::default(),
        None,
    );

    assert_eq!(result.unwrap().sample_identifiers, vec!["S1", "S2"]);
    assert!(transcript.contains("duplicate identifier \"S1\""));
    assert_eq!(transcript.matches("Sample identifiers").count(), 2);
}

#[test]
fn test_blank_task_name_is_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(dir.path());

    let (result, transcript) = collect(
        &AssayStage,
        &["   ", "run", "S1", input.as_str(), out.as_str(), "", ""],
        &Settings::default(),
        None,
    );

    assert_eq!(result.unwrap().task_name, "run");
    assert!(transcript.contains("Task name must not be empty"));
}

#[test]
fn test_task_name_cannot_leave_output_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(&dir.path().join("out"));

    let (result, transcript) = collect(
        &AssayStage,
        &["../escaped", "a/b", "run", "S1", input.as_str(), out.as_str(), "", ""],
        &Settings::default(),
        None,
    );

    let config = result.unwrap();
    assert_eq!(config.task_name, "run");
    assert!(transcript.contains("Task name must be a plain file name, not \"../escaped\""));
    assert!(transcript.contains("not \"a/b\""));
    assert_eq!(
        config.output_file(".yaml"),
        dir.path().join("out").join("run.yaml")
    );
}

#[test]
fn test_missing_and_wrong_kind_inputs_are_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let missing = path_str(&dir.path().join("missing.csv"));
    let a_directory = path_str(dir.path());

    let (result, transcript) = collect(
        &AssayStage,
        &[
            "run",
            "S1",
            missing.as_str(),
            a_directory.as_str(),
            input.as_str(),
            a_directory.as_str(),
            "",
            "",
        ],
        &Settings::default(),
        None,
    );

    assert_eq!(result.unwrap().input_paths["plate_map"], PathBuf::from(&input));
    assert!(transcript.contains("missing.csv does not exist"));
    assert!(transcript.contains("is not a file"));
}

#[test]
fn test_out_of_range_number_is_reprompted() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(dir.path());

    let (result, transcript) = collect(
        &AssayStage,
        &["run", "S1", input.as_str(), out.as_str(), "11", "two", "7", ""],
        &Settings::default(),
        None,
    );

    assert_eq!(result.unwrap().parameters["replicates"], Value::Integer(7));
    assert!(transcript.contains("11 is outside the allowed range 1..=10"));
    assert!(transcript.contains("\"two\" is not a valid whole number"));
}

// ============================================================================
// Fatal errors
// ============================================================================

#[test]
fn test_output_path_over_a_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));

    let (result, _) = collect(
        &AssayStage,
        &["run", "S1", input.as_str(), input.as_str(), "", ""],
        &Settings::default(),
        None,
    );

    assert!(matches!(result, Err(CollectionError::OutputNotDirectory { .. })));
}

#[cfg(target_os = "linux")]
#[test]
fn test_uncreatable_output_directory_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));

    // procfs refuses new entries, even for root
    let (result, _) = collect(
        &AssayStage,
        &["run", "S1", input.as_str(), "/proc/labflow_out/out", "", ""],
        &Settings::default(),
        None,
    );

    match result {
        Err(CollectionError::OutputNotWritable { path, .. }) => {
            assert_eq!(path, PathBuf::from("/proc/labflow_out/out"))
        }
        other => panic!("expected OutputNotWritable, got {:?}", other),
    }
}

#[test]
fn test_closed_input_aborts() {
    let (result, _) = collect(&AssayStage, &["run"], &Settings::default(), None);
    assert!(matches!(
        result,
        Err(CollectionError::InputClosed { field }) if field == "Sample identifiers"
    ));
}

#[test]
fn test_attempts_are_capped() {
    let settings = Settings {
        max_attempts: 2,
        ..Settings::default()
    };
    let (result, _) = collect(&AssayStage, &["", " ", "run"], &settings, None);
    assert!(matches!(
        result,
        Err(CollectionError::TooManyAttempts { attempts: 2, .. })
    ));
}
