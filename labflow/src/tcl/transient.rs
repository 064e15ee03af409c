//! `plt_transient`: transient curves from `.plt` files
//!
//! All runs share `Plot_1`: drain voltage on the left axis, dashed `Tmax`
//! curves on the right axis.

use anyhow::{anyhow, Result};
use labflow_sdk::{FieldSchema, FieldType, WorkflowDefinition, WorkflowMetadata};

use super::{missing_inputs, quoted, write_outputs, Layout, Script};
use crate::collector::SAMPLE_IDENTIFIERS;
use crate::config::{ParameterExt, WorkflowConfig};
use crate::credentials::CredentialProvider;
use crate::stage::{ProcessingStage, RunReport};

/// Role name of the directory holding `.plt` files
pub const PLT_DIR: &str = "plt_dir";

/// Colors of the `Tmax` curves, reused in order
const TMAX_COLORS: [&str; 6] = ["#ff0000", "#00ff00", "#0000ff", "#ff8000", "#800080", "#008080"];

const PLOT: &str = "Plot_1";

#[derive(Debug, Clone, PartialEq, WorkflowDefinition)]
#[workflow(
    id = "plt_transient",
    name = "PLT transient",
    description = "Different nodes with PLT files, styled and exported"
)]
pub struct TransientParams {
    #[field(label = "PLT file prefix", description = "e.g. DeMOS")]
    pub plt_prefix: String,

    #[field(label = "Plot title")]
    pub plot_title: String,

    #[field(label = "X-axis title", default = "Time (in ns)")]
    pub x_axis_title: String,

    #[field(label = "Y-axis title", description = "e.g. Drain Outervoltage (in mV)")]
    pub y_axis_title: String,

    #[field(label = "Y2-axis title", description = "e.g. Max Lattice Temperature (in K)")]
    pub y2_axis_title: String,

    #[field(label = "Legend X position", description = "e.g. 0.0728291")]
    pub legend_x: f64,

    #[field(label = "Legend Y position", description = "e.g. 0.923963")]
    pub legend_y: f64,

    #[field(label = "Line width", type = "number", min = "1", max = "10", default = "2")]
    pub line_width: i64,
}

impl TransientParams {
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let params = &config.parameters;
        Ok(Self {
            plt_prefix: params.text("plt_prefix")?.to_string(),
            plot_title: params.text("plot_title")?.to_string(),
            x_axis_title: params.text("x_axis_title")?.to_string(),
            y_axis_title: params.text("y_axis_title")?.to_string(),
            y2_axis_title: params.text("y2_axis_title")?.to_string(),
            legend_x: params.float("legend_x")?,
            legend_y: params.float("legend_y")?,
            line_width: params.integer("line_width")?,
        })
    }

    fn dataset(&self, run: &str) -> String {
        format!("{}_{}_des", self.plt_prefix, run)
    }

    pub fn data_files(&self, runs: &[String]) -> Vec<String> {
        runs.iter().map(|run| format!("{}.plt", self.dataset(run))).collect()
    }
}

/// `4.5_n1250` -> `4.5`
fn version(run: &str) -> &str {
    run.split('_').next().unwrap_or(run)
}

fn curve_prop(script: &mut Script, curve: usize, prop: &str) {
    script.line(format!("set_curve_prop {{Curve_{}}} -plot {} {}", curve, PLOT, prop));
    script.line("# 0");
}

pub fn generate(params: &TransientParams, runs: &[String], layout: &Layout) -> Result<Script> {
    let (first, rest) = runs
        .split_first()
        .ok_or_else(|| anyhow!("at least one run is needed"))?;
    let n = runs.len();
    let mut script = Script::new();
    script.banner("");

    let first_dataset = params.dataset(first);
    script.line(format!("load_file {}", layout.data_file(&format!("{}.plt", first_dataset))));
    script.line("create_plot -1d");
    script.line(format!("select_plots {{{}}}", PLOT));
    script.line(format!("# {}", PLOT));
    script.line("");
    script.line(format!("# {}", PLOT));
    script.line("");
    script.line(format!("# {}", first_dataset));

    for run in rest {
        let dataset = params.dataset(run);
        script.line(format!("load_file {}", layout.data_file(&format!("{}.plt", dataset))));
        script.line(format!("# {}", dataset));
    }

    let datasets: Vec<String> = runs.iter().map(|r| params.dataset(r)).collect();
    let datasets = datasets.join(" ");
    let curve_names = |range: std::ops::RangeInclusive<usize>| {
        range.map(|i| format!("Curve_{}", i)).collect::<Vec<_>>()
    };

    script.line(format!(
        "create_curve -axisX time -axisY {{drain OuterVoltage}} -dataset {{{}}} -plot {}",
        datasets, PLOT
    ));
    script.line(format!("# {}", curve_names(1..=n).join(" ")));
    script.line(format!(
        "create_curve -axisX time -axisY2 Tmax -dataset {{{}}} -plot {}",
        datasets, PLOT
    ));
    script.line(format!("# {}", curve_names(n + 1..=2 * n).join(" ")));

    let width = format!("-line_width {}", params.line_width);
    for i in 0..n {
        let curve = n + 1 + i;
        curve_prop(&mut script, curve, "-line_style dash");
        curve_prop(&mut script, curve, &width);
        curve_prop(&mut script, curve, &format!("-color {}", TMAX_COLORS[i % TMAX_COLORS.len()]));
        curve_prop(&mut script, curve, "-hide_legend");
    }
    for curve in 1..=n {
        curve_prop(&mut script, curve, &width);
    }

    for (axis, title) in [
        ("y2", &params.y2_axis_title),
        ("x", &params.x_axis_title),
        ("y", &params.y_axis_title),
    ] {
        script.line(format!(
            "set_axis_prop -plot {} -axis {} -title {}",
            PLOT,
            axis,
            quoted(title)
        ));
        script.line("# 0");
    }

    script.line(format!("set_plot_prop -plot {{{}}} -title {}", PLOT, quoted(&params.plot_title)));
    script.line("# 0");
    script.line(format!("set_plot_prop -plot {{{}}} -frame_width 2", PLOT));
    script.line("# 0");

    script.line(format!(
        "set_legend_prop -plot {} -position {{{} {}}}",
        PLOT, params.legend_x, params.legend_y
    ));
    script.line("# 0");

    script.line(format!("export_view {{{}}} -format png", layout.export(".png")));
    script.line("# 0");
    script.line(format!("move_plot -plot {} -position {{0 0}}", PLOT));
    script.line("# 0");

    for (i, run) in runs.iter().enumerate() {
        let label = quoted(&format!("drain OuterVoltage_{}", version(run)));
        curve_prop(&mut script, i + 1, &format!("-label {}", label));
    }

    let csv = layout.export(".csv");
    script.line(format!(
        "export_curves {{{}}} -plot {} -filename {} -format csv",
        curve_names(1..=2 * n).join(" "),
        PLOT,
        csv
    ));
    script.line(format!("# {}", csv));

    Ok(script)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PltTransient;

impl ProcessingStage for PltTransient {
    fn metadata(&self) -> WorkflowMetadata {
        TransientParams::metadata()
    }

    fn sample_field(&self) -> FieldSchema {
        FieldSchema::new(
            SAMPLE_IDENTIFIERS,
            "Runs",
            FieldType::Identifiers { max_digits: None },
        )
        .with_description("<version>_<node>, e.g. 4.5_n1250")
    }

    fn input_roles(&self) -> Vec<FieldSchema> {
        vec![
            FieldSchema::new(PLT_DIR, "PLT directory", FieldType::InputPath { directory: true })
                .with_description("Directory containing the *_des.plt files"),
        ]
    }

    fn parameter_fields(&self) -> Vec<FieldSchema> {
        TransientParams::fields()
    }

    fn run(
        &self,
        config: &WorkflowConfig,
        _credentials: &dyn CredentialProvider,
    ) -> Result<RunReport> {
        let params = TransientParams::from_config(config)?;
        let plt_dir = config.input_path(PLT_DIR)?;
        let layout = Layout::new(plt_dir, &config.output_directory, &config.task_name);

        let script = generate(&params, &config.sample_identifiers, &layout)?;
        let missing = missing_inputs(plt_dir, &params.data_files(&config.sample_identifiers));
        write_outputs(config, &script, missing)
    }
}
