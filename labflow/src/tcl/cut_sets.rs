//! `cut_sets`: several cut sets over one list of TDR codes
//!
//! Every (cut set, quantity) pair is a self-contained block with its own
//! banner. Cutplanes are numbered by a counter running over all blocks,
//! curves restart at 1 in each block.

use anyhow::{Context, Result};
use labflow_sdk::{FieldSchema, FieldType, WorkflowDefinition, WorkflowMetadata};

use super::{
    cut_set_fields, missing_inputs, tdr_code, tdr_dir_role, write_outputs, CutSet, Layout, Script,
    TDR_DIR,
};
use crate::collector::SAMPLE_IDENTIFIERS;
use crate::config::{ParameterExt, WorkflowConfig};
use crate::credentials::CredentialProvider;
use crate::stage::{ProcessingStage, RunReport};

#[derive(Debug, Clone, PartialEq, WorkflowDefinition)]
#[workflow(
    id = "cut_sets",
    name = "Cut sets",
    description = "Multiple cutplane/cutline/quantity sets over the same TDRs"
)]
pub struct CutSetParams {
    #[field(
        label = "Current value",
        description = "Leading part of every TDR file name, e.g. 1e-3"
    )]
    pub current_value: String,

    #[field(label = "Cut sets", type = "repeated")]
    pub cut_sets: Vec<CutSet>,

    #[field(label = "Y-axis scale", type = "select", options = "log,linear", default = "log")]
    pub y_axis_scale: String,
}

impl CutSetParams {
    pub fn from_config(config: &WorkflowConfig) -> Result<Self> {
        let params = &config.parameters;
        Ok(Self {
            current_value: params.text("current_value")?.to_string(),
            cut_sets: CutSet::all_from(params, "cut_sets")?,
            y_axis_scale: params.text("y_axis_scale")?.to_string(),
        })
    }

    fn file_bases(&self, quantity: &str, codes: &[String]) -> Vec<String> {
        codes
            .iter()
            .map(|code| format!("{}_{}_{}", self.current_value, quantity, tdr_code(code)))
            .collect()
    }

    pub fn data_files(&self, codes: &[String]) -> Vec<String> {
        self.cut_sets
            .iter()
            .flat_map(|cut| cut.quantities.iter())
            .flat_map(|q| self.file_bases(q, codes))
            .map(|base| format!("{}_des.tdr", base))
            .collect()
    }
}

pub fn generate(params: &CutSetParams, codes: &[String], layout: &Layout) -> Result<Script> {
    let mut script = Script::new();
    let mut block = 0;

    for (set_index, cut) in params.cut_sets.iter().enumerate() {
        let set = set_index + 1;
        let axis_x = cut.axis_x().with_context(|| format!("cut set {}", set))?;

        for (param_index, quantity) in cut.quantities.iter().enumerate() {
            let bases = params.file_bases(quantity, codes);
            let (Some(first), Some(last)) = (bases.first(), bases.last()) else {
                continue;
            };
            block += 1;

            script.banner(&format!("--- Set {}, Parameter: {} ---", set, quantity));

            for base in &bases {
                script.load_tdr(layout, base);
            }
            script.link_plots(&bases);
            script.show_field(quantity, last);

            for base in &bases {
                script.cutplane(base, block, cut.cutplane_axis, cut.cutplane_position);
            }
            for base in &bases {
                script.cutplane_plot(base, block);
            }
            for (i, base) in bases.iter().enumerate() {
                script.cutline(base, block, cut.cutline_axis, cut.cutline_position(i));
            }

            let dataset = format!("C1(C{}({}_des))", block, first);
            let plot = format!("Plot_{}", dataset);
            script.plot_1d(&dataset, &plot);

            let mut curves = Vec::with_capacity(bases.len());
            for (i, base) in bases.iter().enumerate() {
                let dataset = format!("C1(C{}({}_des))", block, base);
                script.curve(axis_x, quantity, &dataset, &plot, i + 1, &params.y_axis_scale);
                curves.push(format!("Curve_{}", i + 1));
            }

            let suffix = format!("_set{}_param{}_{}.csv", set, param_index + 1, quantity);
            let csv = layout.export(&suffix);
            script.export_curves(&plot, &curves, &csv);
        }
    }

    Ok(script)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CutSetSweep;

impl ProcessingStage for CutSetSweep {
    fn metadata(&self) -> WorkflowMetadata {
        CutSetParams::metadata()
    }

    fn sample_field(&self) -> FieldSchema {
        FieldSchema::new(
            SAMPLE_IDENTIFIERS,
            "TDR codes",
            FieldType::Identifiers { max_digits: Some(2) },
        )
        .with_description("Last 2 digits of each TDR code, e.g. 00 for 0000")
    }

    fn input_roles(&self) -> Vec<FieldSchema> {
        vec![tdr_dir_role()]
    }

    fn parameter_fields(&self) -> Vec<FieldSchema> {
        CutSetParams::fields()
            .into_iter()
            .map(|mut field| {
                if let FieldType::Repeated { fields } = &mut field.field_type {
                    *fields = cut_set_fields(SAMPLE_IDENTIFIERS);
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
        let params = CutSetParams::from_config(config)?;
        let tdr_dir = config.input_path(TDR_DIR)?;
        let layout = Layout::new(tdr_dir, &config.output_directory, &config.task_name);

        let script = generate(&params, &config.sample_identifiers, &layout)?;
        let missing = missing_inputs(tdr_dir, &params.data_files(&config.sample_identifiers));
        write_outputs(config, &script, missing)
    }
}
