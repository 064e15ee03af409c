//! Built-in processing stages, looked up by id

use labflow_sdk::{FieldSchema, FieldType};

use crate::config::Value;
use crate::error::{CollectionError, FieldError};
use crate::prompt::Prompter;
use crate::stage::ProcessingStage;
use crate::tcl::{cut_sets::CutSetSweep, sweep::TdrSweep, transient::PltTransient};
use crate::validate::validate;

/// All stages, in menu order
pub fn builtin_stages() -> Vec<Box<dyn ProcessingStage>> {
    vec![
        Box::new(TdrSweep),
        Box::new(PltTransient),
        Box::new(CutSetSweep),
    ]
}

pub fn find_stage(id: &str) -> Option<Box<dyn ProcessingStage>> {
    builtin_stages()
        .into_iter()
        .find(|stage| stage.metadata().id == id)
}

/// Show the numbered menu and ask until a stage is picked by number or id
pub fn choose_stage(
    prompter: &mut dyn Prompter,
    max_attempts: u32,
) -> Result<Box<dyn ProcessingStage>, CollectionError> {
    let mut stages = builtin_stages();
    let ids: Vec<String> = stages.iter().map(|s| s.metadata().id).collect();
    let field = FieldSchema::new(
        "workflow",
        "Workflow",
        FieldType::Select {
            options: ids.clone(),
            distinct_from: None,
        },
    );

    prompter.notify("Available workflows:")?;
    for (i, stage) in stages.iter().enumerate() {
        let meta = stage.metadata();
        prompter.notify(&format!("{}. {} ({}): {}", i + 1, meta.name, meta.id, meta.description))?;
    }

    let mut attempts = 0;
    loop {
        let raw = prompter
            .ask("workflow", &format!("Select workflow (1-{} or id)", stages.len()))?
            .ok_or_else(|| CollectionError::InputClosed {
                field: field.label.clone(),
            })?;

        let by_number = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| (1..=stages.len()).contains(n));
        let index = match by_number {
            Some(n) => Ok(n - 1),
            None => validate(&field, &raw).map(|value| match value {
                Value::Text(id) => ids.iter().position(|i| *i == id).unwrap_or(0),
                _ => 0,
            }),
        };

        match index {
            Ok(index) => return Ok(stages.swap_remove(index)),
            Err(FieldError::Fatal(e)) => return Err(e),
            Err(FieldError::Invalid(e)) => {
                attempts += 1;
                tracing::warn!(reason = %e, attempts, "workflow selection rejected");
                prompter.notify(&format!("  ✗ {}", e))?;
                if max_attempts > 0 && attempts >= max_attempts {
                    return Err(CollectionError::TooManyAttempts {
                        field: field.label.clone(),
                        attempts,
                    });
                }
            }
        }
    }
}
