use std::fs;
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, bail};
use chrono::Local;
use clap::Parser;
use serde_json::json;
use tracing::{error, info};

use goalplan::cli::{Cli, Commands, PlanArgs, PromptArgs, SchemaArgs};
use goalplan::config::{self, PlannerConfig};
use goalplan::error::PlanError;
use goalplan::handler::{self, PlanResponse};
use goalplan::{logging, prompt, schema};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli, config::process_env) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Run one subcommand and return the process exit code.
///
/// `env_fn` is the environment lookup used for configuration.
fn run(cli: Cli, env_fn: fn(&str) -> Option<String>) -> anyhow::Result<u8> {
    match cli.command {
        Commands::Plan(args) => plan(args, env_fn),
        Commands::Prompt(args) => print_prompt(args),
        Commands::Schema(args) => print_schema(args),
    }
}

fn plan(args: PlanArgs, env_fn: fn(&str) -> Option<String>) -> anyhow::Result<u8> {
    let config = match PlannerConfig::load_with_env(args.config.as_deref(), &args, env_fn) {
        Ok(config) => config,
        Err(e) => {
            logging::init(args.log_level.as_deref(), args.log_file.as_deref())?;
            error!(err = %e, "configuration could not be loaded");
            let response = PlanResponse::from_error(&PlanError::from(e));
            return finish(&response, args.output.as_deref());
        }
    };

    logging::init(config.log_level.as_deref(), config.log_file.as_deref())?;
    info!(config = ?config, "config loaded");

    let body = request_body(&args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let response = runtime.block_on(handler::handle_plan_request(&config, &body));

    finish(&response, args.output.as_deref())
}

/// The request body: built from `--goal`, or read verbatim from `--input`.
fn request_body(args: &PlanArgs) -> anyhow::Result<String> {
    match (&args.goal, &args.input) {
        (Some(goal), _) => Ok(json!({ "goal_text": goal }).to_string()),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("failed to read request file {}", path.display())),
        (None, None) => bail!("either --goal or --input is required"),
    }
}

fn finish(response: &PlanResponse, output: Option<&Path>) -> anyhow::Result<u8> {
    let rendered = serde_json::to_string_pretty(&response.body)?;
    write_output(output, &rendered)?;
    info!(
        status = response.status,
        exit_code = response.exit_code(),
        "done"
    );
    Ok(response.exit_code())
}

fn print_prompt(args: PromptArgs) -> anyhow::Result<u8> {
    let today = args.date.unwrap_or_else(|| Local::now().date_naive());
    let rendered = prompt::build_plan_prompt(&args.goal, today);
    write_output(args.output.as_deref(), &rendered)?;
    Ok(0)
}

fn print_schema(args: SchemaArgs) -> anyhow::Result<u8> {
    let rendered = serde_json::to_string_pretty(schema::plan_response_schema())?;
    write_output(args.output.as_deref(), &rendered)?;
    Ok(0)
}

fn write_output(output: Option<&Path>, contents: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create directory {}", dir.display()))?;
            }
            fs::write(path, format!("{contents}\n"))
                .with_context(|| format!("failed to write {}", path.display()))
        }
        None => {
            println!("{contents}");
            Ok(())
        }
    }
}
