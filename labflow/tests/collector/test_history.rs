//! Tests for answer history and preset answers

use super::common::*;
use labflow::collector::Collector;
use labflow::config::Value;
use labflow::history::History;
use labflow::prompt::PresetPrompter;
use labflow::settings::Settings;

#[test]
fn test_history_supplies_defaults_and_records_answers() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(dir.path());

    let mut history = History::default();
    history.record("assay", "task_name", "yesterday", 10);
    history.record("assay", "parameters.note", "reuse me", 10);

    let (result, transcript) = collect(
        &AssayStage,
        &["", "today", "S1", input.as_str(), out.as_str(), "5", ""],
        &Settings::default(),
        Some(&mut history),
    );
    let config = result.unwrap();

    // An empty task name is rejected even with one on record
    assert_eq!(config.task_name, "today");
    assert!(transcript.contains("Task name must not be empty"));
    assert_eq!(transcript.matches("Task name").count(), 3);
    assert!(!transcript.contains("[default: yesterday]"));

    assert_eq!(config.parameters["note"], Value::Text("reuse me".into()));
    assert!(transcript.contains("[default: reuse me]"));
    assert_eq!(history.latest("assay", "task_name"), Some("today"));

    assert_eq!(history.latest("assay", "sample_identifiers"), Some("S1"));
    assert_eq!(history.latest("assay", "parameters.replicates"), Some("5"));
    assert_eq!(history.latest("assay", "input_paths.plate_map"), Some(input.as_str()));
}

#[test]
fn test_failed_collection_leaves_history_untouched() {
    let mut history = History::default();
    let (result, _) = collect(
        &AssayStage,
        &["new task", "S1"],
        &Settings::default(),
        Some(&mut history),
    );

    assert!(result.is_err());
    assert_eq!(history, History::default());
}

#[test]
fn test_preset_answers_fall_back_to_console() {
    let dir = tempfile::tempdir().unwrap();
    let input = path_str(&write_file(dir.path(), "in.csv", ""));
    let out = path_str(&dir.path().join("results"));

    // Duplicate samples in the file are rejected, the console supplies the fix
    let yaml = format!(
        "task_name: protein_isolation_2025_07_20
sample_identifiers: [S1, S1]
input_paths:
  plate_map: {}
output_directory: {}
parameters:
  replicates: 2
  note: batch A
",
        input, out
    );
    let mut preset = PresetPrompter::from_yaml(&yaml, console(&["S1, S2"])).unwrap();

    let settings = Settings::default();
    let config = Collector::new(&AssayStage, &mut preset, &settings)
        .collect()
        .unwrap();

    assert_eq!(config.task_name, "protein_isolation_2025_07_20");
    assert_eq!(config.sample_identifiers, vec!["S1", "S2"]);
    assert_eq!(config.parameters["replicates"], Value::Integer(2));
    assert_eq!(config.parameters["note"], Value::Text("batch A".into()));
    assert!(preset.unused_keys().is_empty());
}
