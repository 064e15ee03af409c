//! Sentaurus Visual Console (Tcl) script generation
//!
//! Three stages share the building blocks in this module:
//! - [`sweep::TdrSweep`]: one unified 1D plot per cut set and quantity
//! - [`transient::PltTransient`]: time-series curves from `.plt` files
//! - [`cut_sets::CutSetSweep`]: one self-contained block per cut set and quantity

pub mod cut_sets;
pub mod sweep;
pub mod transient;

use anyhow::{anyhow, Context, Result};
use labflow_sdk::{FieldSchema, FieldType, WorkflowDefinition};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::{ParameterExt, Parameters, WorkflowConfig};
use crate::stage::RunReport;

/// Field quantities Sentaurus can plot along a cutline
pub const QUANTITIES: &[&str] = &[
    "ConductionBandEnergy",
    "ConductionCurrentDensity",
    "DopingConcentration",
    "EffectiveIntrinsicDensity",
    "ElectricField",
    "ElectrostaticPotential",
    "EquilibriumPotential",
    "Impactionization",
    "IntrinsicDensity",
    "LatticeTemperature",
    "QuasiFermiPotential",
    "SpaceCharge",
    "ValenceBandEnergy",
    "eAlphaAvalanche",
    "eCurrentDensity",
    "eDensity",
    "eMobility",
    "eQuasiFermiPotential",
    "hAlphaAvalanche",
    "hCurrentDensity",
    "hDensity",
    "hMobility",
    "hQuasiFermiPotential",
];

const BANNER: [&str; 3] = [
    "################################################",
    "# Sentaurus Visual Console - Tcl version 8.6.6 #",
    "################################################",
];

/// x range of every cutline plot
const X_RANGE: &str = "{-0.9 9.0}";

/// Role name of the directory holding `.tdr` files
pub const TDR_DIR: &str = "tdr_dir";

pub fn tdr_dir_role() -> FieldSchema {
    FieldSchema::new(TDR_DIR, "TDR directory", FieldType::InputPath { directory: true })
        .with_description("Directory containing the *_des.tdr files")
}

/// Expand a 1-2 digit entry to the 4-digit TDR code (`"2"` -> `"0002"`)
pub fn tdr_code(entry: &str) -> String {
    format!("00{:0>2}", entry)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// The axis that is neither `cutplane` nor `cutline`, upper-cased
    pub fn remaining(cutplane: Axis, cutline: Axis) -> Option<&'static str> {
        Self::ALL
            .into_iter()
            .find(|a| *a != cutplane && *a != cutline)
            .filter(|_| cutplane != cutline)
            .map(|a| match a {
                Axis::X => "X",
                Axis::Y => "Y",
                Axis::Z => "Z",
            })
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        })
    }
}

impl FromStr for Axis {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x" => Ok(Axis::X),
            "y" => Ok(Axis::Y),
            "z" => Ok(Axis::Z),
            other => Err(anyhow!("\"{}\" is not an axis", other)),
        }
    }
}

/// One cutplane, the cutline through it, and the quantities to plot
#[derive(Debug, Clone, PartialEq, WorkflowDefinition)]
pub struct CutSet {
    #[field(label = "Cutplane axis", type = "select", options = "x,y,z")]
    pub cutplane_axis: Axis,

    #[field(label = "Cutplane position", type = "float")]
    pub cutplane_position: f64,

    #[field(
        label = "Cutline axis",
        type = "select",
        options = "x,y,z",
        distinct_from = "cutplane_axis"
    )]
    pub cutline_axis: Axis,

    #[field(
        label = "Cutline positions",
        type = "float_list",
        len_matches = "tdr_codes",
        description = "One per TDR, or a single value for all"
    )]
    pub cutline_positions: Vec<f64>,

    #[field(label = "Quantities", type = "multi_select", catalog = "crate::tcl::QUANTITIES")]
    pub quantities: Vec<String>,
}

impl CutSet {
    pub fn from_params(params: &Parameters) -> Result<Self> {
        let cut = Self {
            cutplane_axis: params.text("cutplane_axis")?.parse()?,
            cutplane_position: params.float("cutplane_position")?,
            cutline_axis: params.text("cutline_axis")?.parse()?,
            cutline_positions: params.floats("cutline_positions")?.to_vec(),
            quantities: params.list("quantities")?.to_vec(),
        };
        if cut.cutline_positions.is_empty() {
            return Err(anyhow!("cut set has no cutline positions"));
        }
        Ok(cut)
    }

    pub fn all_from(params: &Parameters, name: &str) -> Result<Vec<Self>> {
        params
            .sets(name)?
            .iter()
            .enumerate()
            .map(|(i, set)| Self::from_params(set).with_context(|| format!("cut set {}", i + 1)))
            .collect()
    }

    /// 1D x-axis for this set
    pub fn axis_x(&self) -> Result<&'static str> {
        Axis::remaining(self.cutplane_axis, self.cutline_axis).ok_or_else(|| {
            anyhow!(
                "cutplane and cutline cannot both be on the {} axis",
                self.cutplane_axis
            )
        })
    }

    /// Cutline position for the `index`-th dataset; positions cycle
    pub fn cutline_position(&self, index: usize) -> f64 {
        self.cutline_positions[index % self.cutline_positions.len()]
    }
}

/// `CutSet` fields with the cutline position count tied to `list`
pub fn cut_set_fields(list: &str) -> Vec<FieldSchema> {
    CutSet::fields()
        .into_iter()
        .map(|mut field| {
            if let FieldType::FloatList { len_matches } = &mut field.field_type {
                *len_matches = Some(list.to_string());
            }
            field
        })
        .collect()
}

/// Where data is read from and exports are written to
#[derive(Debug, Clone)]
pub struct Layout {
    data_dir: String,
    output_dir: PathBuf,
    task_name: String,
}

impl Layout {
    /// Relative paths are resolved against the working directory so the
    /// script works wherever Sentaurus is started.
    pub fn new(data_dir: &Path, output_dir: &Path, task_name: &str) -> Self {
        let mut data_dir = absolute(data_dir).display().to_string();
        if !data_dir.ends_with('/') {
            data_dir.push('/');
        }
        Self {
            data_dir,
            output_dir: absolute(output_dir),
            task_name: task_name.to_string(),
        }
    }

    pub fn data_file(&self, name: &str) -> String {
        format!("{}{}", self.data_dir, name)
    }

    /// Export path `<output dir>/<task><suffix>`
    pub fn export(&self, suffix: &str) -> String {
        self.output_dir
            .join(format!("{}{}", self.task_name, suffix))
            .display()
            .to_string()
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Tcl double-quoted string with substitutions escaped
pub fn quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        if matches!(c, '"' | '\\' | '$' | '[' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// A Sentaurus Visual Console script under construction
#[derive(Debug, Clone, Default)]
pub struct Script {
    lines: Vec<String>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn banner(&mut self, subtitle: &str) {
        for line in BANNER {
            self.line(line);
        }
        self.line(format!("# {}", subtitle));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Commands only; comments and blank lines don't count
    pub fn commands(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .count()
    }

    pub fn render(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }

    /// Select a plot and echo its name
    pub fn select(&mut self, plots: &str) {
        self.line(format!("select_plots {{{}}}", plots));
        self.line(format!("# {}", plots));
    }

    /// Load `<base>_des.tdr` into its own 2D plot
    pub fn load_tdr(&mut self, layout: &Layout, base: &str) {
        let dataset = format!("{}_des", base);
        let plot = format!("Plot_{}", dataset);
        self.line(format!("load_file {} -fod", layout.data_file(&format!("{}.tdr", dataset))));
        self.line(format!("create_plot -dataset {}", dataset));
        self.line(format!("select_plots {{{}}}", plot));
        self.line(format!("# {}", plot));
        self.line("");
        self.line(format!("# {}", plot));
        self.line("");
        self.line(format!("# {}", dataset));
    }

    /// Link the 2D plots of every base, first base selected first
    pub fn link_plots(&mut self, bases: &[String]) {
        let plots: Vec<String> = bases.iter().map(|b| format!("Plot_{}_des", b)).collect();
        let all = plots.join(" ");
        if let Some(first) = plots.first() {
            self.select(first);
        }
        self.select(&all);
        self.line(format!("link_plots {{{}}}", all));
        self.line("# 1");
    }

    /// Show `quantity` with bands on the plot of `base`
    pub fn show_field(&mut self, quantity: &str, base: &str) {
        self.line(format!(
            "set_field_prop {} -plot Plot_{}_des -geom {}_des -show_bands",
            quantity, base, base
        ));
        self.line("# 0");
    }

    /// Cutplane `C<n>` through the plot of `base`
    pub fn cutplane(&mut self, base: &str, n: usize, axis: Axis, position: f64) {
        let plot = format!("Plot_{}_des", base);
        self.select(&plot);
        self.line(format!("create_cutplane -plot {} -type {} -at {}", plot, axis, position));
        self.line(format!("# C{}({}_des)", n, base));
    }

    pub fn cutplane_plot(&mut self, base: &str, n: usize) {
        let dataset = format!("C{}({}_des)", n, base);
        let plot = format!("Plot_{}", dataset);
        self.line(format!("create_plot -dataset {} -ref_plot Plot_{}_des", dataset, base));
        self.line(format!("select_plots {{{}}}", plot));
        self.line(format!("# {}", plot));
        self.line("");
        self.line(format!("# {}", plot));
    }

    /// Cutline through cutplane `C<n>` of `base`
    pub fn cutline(&mut self, base: &str, n: usize, axis: Axis, position: f64) {
        let plot = format!("Plot_C{}({}_des)", n, base);
        self.select(&plot);
        self.line(format!("create_cutline -plot {} -type {} -at {}", plot, axis, position));
        self.line(format!("# C1(C{}({}_des))", n, base));
    }

    /// New 1D plot from `dataset`, named `plot`
    pub fn plot_1d(&mut self, dataset: &str, plot: &str) {
        self.line(format!("create_plot -dataset {} -1d", dataset));
        self.line(format!("select_plots {{{}}}", plot));
        self.line(format!("# {}", plot));
        self.line("");
        self.line(format!("# {}", plot));
    }

    pub fn curve(
        &mut self,
        axis_x: &str,
        quantity: &str,
        dataset: &str,
        plot: &str,
        number: usize,
        scale: &str,
    ) {
        self.line(format!(
            "create_curve -axisX {} -axisY {} -dataset {{{}}} -plot {}",
            axis_x, quantity, dataset, plot
        ));
        self.line(format!("# Curve_{}", number));
        self.line(format!("set_axis_prop -plot {} -axis y -type {}", plot, scale));
        self.line(format!("set_axis_prop -plot {} -axis x -range {}", plot, X_RANGE));
        self.line("# 0");
    }

    pub fn export_curves(&mut self, plot: &str, curves: &[String], path: &str) {
        self.select(plot);
        self.line(format!(
            "export_curves {{{}}} -plot {} -filename {} -format csv",
            curves.join(" "),
            plot,
            path
        ));
        self.line(format!("# {}", path));
    }
}

/// Names in `files` that are missing from `dir`, each logged as a warning
pub fn missing_inputs(dir: &Path, files: &[String]) -> Vec<String> {
    files
        .iter()
        .filter(|name| !dir.join(name).exists())
        .inspect(|name| {
            tracing::warn!(dir = %dir.display(), file = %name, "referenced data file not found")
        })
        .cloned()
        .collect()
}

/// Write `<task>.tcl` and `manifest.yaml` into the output directory
pub fn write_outputs(
    config: &WorkflowConfig,
    script: &Script,
    missing_inputs: Vec<String>,
) -> Result<RunReport> {
    let script_path = config.output_file(".tcl");
    let text = script.render();
    std::fs::write(&script_path, &text)
        .with_context(|| format!("Failed to write script: {}", script_path.display()))?;
    tracing::info!(path = %script_path.display(), commands = script.commands(), "wrote script");

    let manifest_path = config.output_directory.join("manifest.yaml");
    std::fs::write(&manifest_path, config.to_yaml()?)
        .with_context(|| format!("Failed to write manifest: {}", manifest_path.display()))?;

    Ok(RunReport {
        files: vec![
            (script_path, "Sentaurus Visual Console script".to_string()),
            (manifest_path, "Run configuration".to_string()),
        ],
        commands: script.commands(),
        missing_inputs,
        script: text,
    })
}
