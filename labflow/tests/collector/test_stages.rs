//! Tests for collecting and running the built-in stages

use super::common::*;
use labflow::collector::Collector;
use labflow::credentials::StaticCredentials;
use labflow::prompt::PresetPrompter;
use labflow::registry::find_stage;
use labflow::settings::Settings;
use labflow::stage::ProcessingStage;
use labflow::tcl::cut_sets::CutSetSweep;

#[test]
fn test_cut_sets_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let tdr = dir.path().join("tdr");
    std::fs::create_dir(&tdr).unwrap();
    write_file(&tdr, "2e-3_eDensity_0000_des.tdr", "");
    let tdr_dir = path_str(&tdr);
    let out = path_str(&dir.path().join("out"));

    let (result, transcript) = collect(
        &CutSetSweep,
        &[
            "scan",
            "00, 5",
            tdr_dir.as_str(),
            out.as_str(),
            "2e-3",
            // cut set 1
            "z",
            "0.5",
            "z",
            "x",
            "1, 2, 3",
            "1.5",
            "eDensty",
            "eDensity",
            "no",
            // y-axis scale
            "",
        ],
        &Settings::default(),
        None,
    );
    let config = result.unwrap();

    assert!(transcript.contains("Cutline axis cannot be the same as cutplane axis (z)"));
    assert!(transcript.contains("Cutline positions needs 1 or 2 values, got 3"));
    assert!(transcript.contains("\"eDensty\" is not one of"));
    assert!(transcript.contains("Available quantities:"));

    let report = CutSetSweep
        .run(&config, &StaticCredentials::default())
        .unwrap();

    assert_eq!(report.missing_inputs, vec!["2e-3_eDensity_0005_des.tdr"]);
    assert_eq!(report.files.len(), 2);
    for (path, _) in &report.files {
        assert!(path.exists(), "{} was not written", path.display());
    }

    let script = std::fs::read_to_string(dir.path().join("out").join("scan.tcl")).unwrap();
    assert_eq!(script, report.script);
    assert!(script.starts_with("################################################\n"));
    assert!(script.contains("# --- Set 1, Parameter: eDensity ---"));
    assert!(script.contains(&format!(
        "load_file {}/2e-3_eDensity_0005_des.tdr -fod",
        tdr_dir
    )));
    assert!(script.contains("create_cutplane -plot Plot_2e-3_eDensity_0000_des -type z -at 0.5"));
    assert!(script.contains("create_cutline -plot Plot_C1(2e-3_eDensity_0005_des) -type x -at 1.5"));
    assert!(script.contains(
        "create_curve -axisX Y -axisY eDensity -dataset {C1(C1(2e-3_eDensity_0005_des))} -plot Plot_C1(C1(2e-3_eDensity_0000_des))"
    ));
    assert!(script.contains("-axis y -type log"));
    assert!(script.contains("scan_set1_param1_eDensity.csv -format csv"));

    let manifest = std::fs::read_to_string(dir.path().join("out").join("manifest.yaml")).unwrap();
    assert!(manifest.contains("task_name: scan"));
    assert!(manifest.contains("workflow: cut_sets"));
}

#[test]
fn test_tdr_sweep_from_answers_file() {
    let dir = tempfile::tempdir().unwrap();
    let tdr_dir = path_str(dir.path());
    let out = path_str(&dir.path().join("out"));

    let yaml = format!(
        r#"
task_name: sweep
sample_identifiers: [n1257_I4.6]
input_paths:
  tdr_dir: {tdr_dir}
output_directory: {out}
parameters:
  current_value: "1e-3"
  tdr_codes: ["01", "02"]
  include_last_tdr: true
  cut_sets:
    - cutplane_axis: z
      cutplane_position: 0.5
      cutline_axis: x
      cutline_positions: [1.25, 2.5]
      quantities: [eDensity]
  y_axis_scale: linear
"#
    );

    let stage = find_stage("tdr_sweep").unwrap();
    let mut preset = PresetPrompter::from_yaml(&yaml, console(&[])).unwrap();
    let settings = Settings::default();
    let config = Collector::new(stage.as_ref(), &mut preset, &settings)
        .collect()
        .unwrap();
    assert!(preset.unused_keys().is_empty(), "{:?}", preset.unused_keys());

    let report = stage.run(&config, &StaticCredentials::default()).unwrap();
    assert_eq!(report.missing_inputs.len(), 3);

    let script = report.script;
    assert!(script.contains("load_file "));
    assert!(script.contains("1e-3_eDensity_n1257_des.tdr -fod"));
    // Third dataset wraps around to the first cutline position
    assert!(script.contains("create_cutline -plot Plot_C1(1e-3_eDensity_n1257_des) -type x -at 1.25"));
    assert!(script.contains("# Curve_3"));
    assert!(script.contains("-axis y -type linear"));
    assert!(script.contains("sweep_set1_param_eDensity.csv"));
}

#[test]
fn test_every_stage_describes_its_prompts() {
    for id in ["tdr_sweep", "plt_transient", "cut_sets"] {
        let stage = find_stage(id).unwrap();
        let metadata = stage.full_metadata();
        assert_eq!(metadata.metadata.id, id);
        assert_eq!(metadata.fields[0].name, "task_name");
        assert_eq!(metadata.fields[1].name, "sample_identifiers");
        assert!(metadata.to_json().unwrap().contains("\"output_directory\""));
    }
}
