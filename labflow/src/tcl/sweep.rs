//! `tdr_sweep`: many nodes, user-chosen TDR snapshots
//!
//! Each (cut set, quantity) pair gets one unified 1D plot holding a curve per
//! dataset. Curves are numbered across the whole script.

use anyhow::{Context, Result};
use labflow_sdk::{FieldSchema, FieldType, WorkflowDefinition, WorkflowMetadata};

use super::{
    cut_set_fields, missing_inputs, tdr_code, tdr_dir_role, write_outputs, CutSet, Layout, Script,
    TDR_DIR,
};
use crate::config::{ParameterExt, WorkflowConfig};
use crate::credentials::CredentialProvider;
use crate::stage::{ProcessingStage, RunReport};

#[derive(Debug, Clone, PartialEq, WorkflowDefinition)]
#[workflow(
    id = "tdr_sweep",
    name = "TDR sweep",
    description = "Many nodes with user-selected TDRs and an optional last TDR"
)]
pub struct SweepParams {
    #[field(
        label = "Current value",
        description = "Leading part of every TDR file name, e.g. 1e-3"
    )]
    pub current_value: String,

    #[field(
        label = "TDR codes",
        type = "identifiers",
        max_digits = "2",
        description = "Last 2 digits of each TDR code, e.g. 02 for 0002"
    )]
    pub tdr_codes: Vec<String>,

    #[field(
        label = "Include last TDR",
        description = "Also load the dataset named after the node prefix, e.g. n1257",
        default = "no"
    )]
    pub include_last_tdr: bool,

    #[field(label = "Cut sets", type = "repeated")]
    pub cut_sets: Vec<CutSet>,

    #[field(label = "Y-axis scale", type = "select", options = "log,linear", default = "log")]
    pub y_axis_scale: String,
}

impl SweepParams {
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let params = &config.parameters;
        Ok(Self {
            current_value: params.text("current_value")?.to_string(),
            tdr_codes: params.list("tdr_codes")?.to_vec(),
            include_last_tdr: params.flag("include_last_tdr")?,
            cut_sets: CutSet::all_from(params, "cut_sets")?,
            y_axis_scale: params.text("y_axis_scale")?.to_string(),
        })
    }

    /// Dataset bases for one quantity: one per TDR code, then the optional
    /// last TDR named after the first node's prefix (`n1257_I4.6` -> `n1257`)
    pub fn file_bases(&self, quantity: &str, nodes: &[String]) -> Vec<String> {
        let mut bases: Vec<String> = self
            .tdr_codes
            .iter()
            .map(|code| format!("{}_{}_{}", self.current_value, quantity, tdr_code(code)))
            .collect();

        if self.include_last_tdr {
            if let Some(prefix) = nodes.first().and_then(|n| n.split('_').next()) {
                bases.push(format!("{}_{}_{}", self.current_value, quantity, prefix));
            }
        }
        bases
    }

    pub fn data_files(&self, nodes: &[String]) -> Vec<String> {
        self.cut_sets
            .iter()
            .flat_map(|cut| cut.quantities.iter())
            .flat_map(|q| self.file_bases(q, nodes))
            .map(|base| format!("{}_des.tdr", base))
            .collect()
    }
}

pub fn generate(params: &SweepParams, nodes: &[String], layout: &Layout) -> Result<Script> {
    let mut script = Script::new();
    script.banner("");

    let mut curve_counter = 1;

    for (set_index, cut) in params.cut_sets.iter().enumerate() {
        let set = set_index + 1;
        let axis_x = cut.axis_x().with_context(|| format!("cut set {}", set))?;

        for (param_index, quantity) in cut.quantities.iter().enumerate() {
            let bases = params.file_bases(quantity, nodes);
            let (Some(first), Some(last)) = (bases.first(), bases.last()) else {
                continue;
            };

            for base in &bases {
                script.load_tdr(layout, base);
            }
            script.link_plots(&bases);
            script.show_field(quantity, last);

            for base in &bases {
                script.cutplane(base, set, cut.cutplane_axis, cut.cutplane_position);
            }
            for base in &bases {
                script.cutplane_plot(base, set);
            }
            for (i, base) in bases.iter().enumerate() {
                script.cutline(base, set, cut.cutline_axis, cut.cutline_position(i));
            }

            let plot = format!("Plot_C1(C{}({}_des))_S{}P{}", set, first, set, param_index);
            script.plot_1d(&format!("C1(C{}({}_des))", set, first), &plot);

            let mut curves = Vec::with_capacity(bases.len());
            for base in &bases {
                let dataset = format!("C1(C{}({}_des))", set, base);
                script.curve(
                    axis_x,
                    quantity,
                    &dataset,
                    &plot,
                    curve_counter,
                    &params.y_axis_scale,
                );
                curves.push(format!("Curve_{}", curve_counter));
                curve_counter += 1;
            }

            let csv = layout.export(&format!("_set{}_param_{}.csv", set, quantity));
            script.export_curves(&plot, &curves, &csv);
        }
    }

    Ok(script)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TdrSweep;

impl ProcessingStage for TdrSweep {
    fn metadata(&self) -> WorkflowMetadata {
        SweepParams::metadata()
    }

    fn sample_field(&self) -> FieldSchema {
        FieldSchema::new(
            "sample_identifiers",
            "Node names",
            FieldType::Identifiers { max_digits: None },
        )
        .with_description("e.g. n1257_I4.6")
    }

    fn input_roles(&self) -> Vec<FieldSchema> {
        vec![tdr_dir_role()]
    }

    fn parameter_fields(&self) -> Vec<FieldSchema> {
        SweepParams::fields()
            .into_iter()
            .map(|mut field| {
                if let FieldType::Repeated { fields } = &mut field.field_type {
                    *fields = cut_set_fields("tdr_codes");
                }
                field
            })
            .collect()
    }

    fn run(
        &self,
        config: &WorkflowConfig,
        _credentials: &dyn CredentialProvider,
    ) -> Result<RunReport> {
        let params = SweepParams::from_config(config)?;
        let tdr_dir = config.input_path(TDR_DIR)?;
        let layout = Layout::new(tdr_dir, &config.output_directory, &config.task_name);

        let script = generate(&params, &config.sample_identifiers, &layout)?;
        let missing = missing_inputs(tdr_dir, &params.data_files(&config.sample_identifiers));
        write_outputs(config, &script, missing)
    }
}
