use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// goalplan: turn a free-text goal into a validated task plan.
///
/// The plan (tasks, durations, deadlines, dependencies) is produced by an
/// LLM under a JSON schema constraint and validated before it is printed.
#[derive(Debug, Parser)]
#[command(name = "goalplan", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a plan for a goal and print it as JSON.
    Plan(PlanArgs),

    /// Print the prompt that would be sent to the model.
    Prompt(PromptArgs),

    /// Print the structured-output schema sent to the model.
    Schema(SchemaArgs),
}

/// Arguments for the `plan` subcommand.
///
/// Model settings can also come from env vars (`GOALPLAN_*`) or a TOML
/// config file. Precedence: CLI > env > file. The API key is read from
/// `GOALPLAN_API_KEY` / `GEMINI_API_KEY` or the config file only.
#[derive(Debug, Clone, clap::Args)]
pub struct PlanArgs {
    /// Goal text, e.g. "Launch a product in 2 weeks".
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub goal: Option<String>,

    /// Path to a JSON request body of the form {"goal_text": "..."}.
    #[arg(long)]
    pub input: Option<PathBuf>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Model name (default: "gemini-2.5-flash").
    #[arg(long)]
    pub model: Option<String>,

    /// API base URL (default: the public Gemini v1beta endpoint).
    #[arg(long)]
    pub base_url: Option<String>,

    /// Sampling temperature (default: 0.4).
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Timeout for the model call in seconds (default: 120).
    #[arg(long)]
    pub timeout_sec: Option<u64>,

    /// Log level filter (default: "info"). Supports tracing directives
    /// (e.g. "debug", "goalplan=trace,warn"). Overridden by GOALPLAN_LOG env var.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to a log file. When set, structured JSON logs are appended here
    /// in addition to the human-readable stderr output.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Write the response body to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `prompt` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct PromptArgs {
    /// Goal text to embed in the prompt.
    #[arg(long)]
    pub goal: String,

    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Write the prompt to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the `schema` subcommand.
#[derive(Debug, Clone, clap::Args)]
pub struct SchemaArgs {
    /// Write the schema to this file instead of stdout.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn plan_subcommand_parses_goal() {
        let cli = Cli::try_parse_from(["goalplan", "plan", "--goal", "Plan a 3-day offsite"])
            .expect("should parse valid args");

        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.goal.as_deref(), Some("Plan a 3-day offsite"));
                assert_eq!(args.input, None);
            }
            other => unreachable!("test uses plan subcommand, got {other:?}"),
        }
    }

    #[test]
    fn plan_subcommand_parses_all_optional_flags() {
        let cli = Cli::try_parse_from([
            "goalplan",
            "plan",
            "--input",
            "req.json",
            "--config",
            "goalplan.toml",
            "--model",
            "gemini-2.5-pro",
            "--base-url",
            "http://localhost:9/v1beta",
            "--temperature",
            "0.1",
            "--timeout-sec",
            "15",
            "--log-level",
            "debug",
            "--log-file",
            "gp.log",
            "--output",
            "plan.json",
        ])
        .expect("should parse all flags");

        match cli.command {
            Commands::Plan(args) => {
                assert_eq!(args.goal, None);
                assert_eq!(args.input, Some(PathBuf::from("req.json")));
                assert_eq!(args.config, Some(PathBuf::from("goalplan.toml")));
                assert_eq!(args.model.as_deref(), Some("gemini-2.5-pro"));
                assert_eq!(args.base_url.as_deref(), Some("http://localhost:9/v1beta"));
                assert_eq!(args.temperature, Some(0.1));
                assert_eq!(args.timeout_sec, Some(15));
                assert_eq!(args.log_level.as_deref(), Some("debug"));
                assert_eq!(args.log_file, Some(PathBuf::from("gp.log")));
                assert_eq!(args.output, Some(PathBuf::from("plan.json")));
            }
            other => unreachable!("test uses plan subcommand, got {other:?}"),
        }
    }

    #[test]
    fn plan_requires_goal_or_input() {
        let err = Cli::try_parse_from(["goalplan", "plan"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn goal_and_input_conflict() {
        let err = Cli::try_parse_from([
            "goalplan", "plan", "--goal", "x", "--input", "req.json",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn prompt_subcommand_parses_date() {
        let cli = Cli::try_parse_from([
            "goalplan", "prompt", "--goal", "Learn Rust", "--date", "2026-10-19",
        ])
        .unwrap();

        match cli.command {
            Commands::Prompt(args) => {
                assert_eq!(args.goal, "Learn Rust");
                assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 10, 19));
            }
            other => unreachable!("test uses prompt subcommand, got {other:?}"),
        }
    }

    #[test]
    fn prompt_subcommand_rejects_bad_date() {
        let err = Cli::try_parse_from([
            "goalplan", "prompt", "--goal", "Learn Rust", "--date", "19/10/2026",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn missing_subcommand_is_error() {
        let err = Cli::try_parse_from(["goalplan"]).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }
}
