//! Command line arguments

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Collects and validates run configuration, then generates Sentaurus
/// Visual Console scripts
#[derive(Parser, Debug)]
#[command(name = "labflow", version, about)]
pub struct Cli {
    /// More log output on stderr (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect a configuration and run a workflow
    Run(RunArgs),
    /// List available workflows
    List,
    /// Print a workflow's metadata and prompts as JSON
    Describe {
        /// Workflow id, see `labflow list`
        workflow: String,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Workflow id; asked interactively when omitted
    #[arg(short, long)]
    pub workflow: Option<String>,

    /// YAML file with preset answers, shaped like the saved manifest
    #[arg(short, long)]
    pub answers: Option<PathBuf>,

    /// Settings file (default: <config dir>/labflow/settings.yaml)
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Also print the generated script to stdout
    #[arg(long)]
    pub print: bool,

    /// Neither read nor write answer history
    #[arg(long)]
    pub no_history: bool,

    /// Stop after one workflow instead of offering another
    #[arg(long)]
    pub once: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_flags() {
        let cli = Cli::parse_from([
            "labflow", "-vv", "run", "--workflow", "cut_sets", "--answers", "a.yaml", "--once",
        ]);
        assert_eq!(cli.verbose, 2);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.workflow.as_deref(), Some("cut_sets"));
        assert_eq!(args.answers, Some(PathBuf::from("a.yaml")));
        assert!(args.once);
        assert!(!args.no_history);
    }

    #[test]
    fn describe_takes_an_id() {
        let cli = Cli::parse_from(["labflow", "describe", "tdr_sweep"]);
        assert!(matches!(cli.command, Command::Describe { workflow } if workflow == "tdr_sweep"));
    }
}
