use std::fs::{self, File, OpenOptions};
use std::path::Path;
use std::sync::{Mutex, Once};

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_DIRECTIVE: &str = "info";
const FILTER_ENV_VAR: &str = "GOALPLAN_LOG";

static INIT: Once = Once::new();

/// Install the process-wide tracing subscriber. Later calls are no-ops.
///
/// Human-readable events go to stderr, filtered by `GOALPLAN_LOG` if set,
/// else `log_level`, else `info`. With `log_file`, every event is also
/// appended to that file as one JSON object per line, unfiltered, so a
/// failed plan's raw model output is kept even when stderr is quiet.
///
/// stdout is left alone: it carries the plan.
pub fn init(log_level: Option<&str>, log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut outcome = Ok(());
    INIT.call_once(|| outcome = install(log_level, log_file));
    outcome
}

fn install(log_level: Option<&str>, log_file: Option<&Path>) -> anyhow::Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_filter(stderr_filter(log_level));

    let json_layer = match log_file {
        Some(path) => {
            let file = open_append(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .json(),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .context("failed to initialize logging")
}

fn stderr_filter(log_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_env(FILTER_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(log_level.unwrap_or(DEFAULT_DIRECTIVE)))
}

fn open_append(path: &Path) -> anyhow::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))
}
