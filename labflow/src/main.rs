use anyhow::{anyhow, Context, Result};
use clap::Parser;
use labflow::cli::{Cli, Command, RunArgs};
use labflow::collector::Collector;
use labflow::credentials::{resolve_all, EnvCredentials, StaticCredentials};
use labflow::history::{history_file_path, History};
use labflow::prompt::{ConsolePrompter, PresetPrompter, Prompter};
use labflow::registry;
use labflow::settings::Settings;
use labflow_sdk::{
    log_file_written, log_found, log_step_complete_console, log_step_start_console, log_summary,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::List => list(),
        Command::Describe { workflow } => describe(&workflow),
        Command::Run(args) => run(&args),
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn list() -> Result<()> {
    let stages = registry::builtin_stages();
    log_found!(stages.len(), "workflows");
    for stage in &stages {
        let meta = stage.metadata();
        println!("  {:<14} {}", meta.id, meta.description);
    }
    Ok(())
}

fn describe(id: &str) -> Result<()> {
    let stage = registry::find_stage(id)
        .ok_or_else(|| anyhow!("Unknown workflow: {} (see `labflow list`)", id))?;
    println!("{}", stage.full_metadata().to_json()?);
    Ok(())
}

fn run(args: &RunArgs) -> Result<()> {
    let settings = Settings::load(args.settings.as_deref())?;
    let use_history = settings.history && !args.no_history;
    let mut history = use_history.then(|| History::load(&history_file_path()));

    let console = ConsolePrompter::stdio();
    match &args.answers {
        Some(path) => {
            let mut preset = PresetPrompter::from_file(path, console)?;
            let result = session(&mut preset, args, &settings, history.as_mut());
            for key in preset.unused_keys() {
                tracing::warn!(%key, "answers file entry was never asked for");
            }
            result
        }
        None => {
            let mut console = console;
            session(&mut console, args, &settings, history.as_mut())
        }
    }
}

fn session(
    prompter: &mut dyn Prompter,
    args: &RunArgs,
    settings: &Settings,
    mut history: Option<&mut History>,
) -> Result<()> {
    loop {
        let stage = match &args.workflow {
            Some(id) => registry::find_stage(id)
                .ok_or_else(|| anyhow!("Unknown workflow: {} (see `labflow list`)", id))?,
            None => registry::choose_stage(prompter, settings.max_attempts)?,
        };
        let meta = stage.metadata();

        log_step_start_console!(1, "Collect configuration", meta.name);
        let mut collector = Collector::new(stage.as_ref(), &mut *prompter, settings);
        if let Some(history) = history.as_deref_mut() {
            collector = collector.with_history(history);
        }
        let config = collector
            .collect()
            .with_context(|| format!("Collection for {} failed", meta.id))?;
        log_step_complete_console!(1);

        if let Some(history) = history.as_deref() {
            if let Err(e) = history.save(&history_file_path()) {
                tracing::warn!(error = %e, "could not save history");
            }
        }

        let mut resources = stage.protected_resources();
        resources.extend(settings.protected_resources.iter().cloned());
        let credentials = StaticCredentials::from(resolve_all(&EnvCredentials, &resources)?);

        log_step_start_console!(2, "Generate script", meta.description);
        let report = stage
            .run(&config, &credentials)
            .with_context(|| format!("Workflow {} failed", meta.id))?;
        for (path, description) in &report.files {
            log_file_written!(path.display(), description);
        }
        if !report.missing_inputs.is_empty() {
            println!(
                "⚠ {} referenced data file(s) not found in the input directory",
                report.missing_inputs.len()
            );
        }
        log_step_complete_console!(2);
        log_summary!(report.commands, report.files.len());

        if args.print {
            println!("\n{}", "=".repeat(80));
            print!("{}", report.script);
            println!("{}", "=".repeat(80));
        }

        if args.once {
            return Ok(());
        }
        match prompter.confirm("again", "Run another workflow?")? {
            Some(true) => continue,
            _ => return Ok(()),
        }
    }
}
