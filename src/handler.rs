//! Request handler: `{"goal_text": "..."}` in, status code and JSON body out.
//!
//! Success returns the plan with status 200. A rejected request gets 422.
//! Core failures map by kind to 503 or 500 with a `{"detail": "..."}` body.

use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::config::PlannerConfig;
use crate::error::{ErrorKind, InvalidGoal, PlanError};
use crate::generator::PlanGenerator;
use crate::model::GoalInput;

const STATUS_OK: u16 = 200;
const STATUS_UNPROCESSABLE: u16 = 422;

/// Exit code for a request rejected before reaching the model (EX_USAGE).
const EXIT_INVALID_INPUT: u8 = 64;

/// Inbound request body.
#[derive(Debug, Deserialize)]
pub struct GoalRequest {
    pub goal_text: String,
}

/// How a request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Planned,
    Rejected,
    Failed(ErrorKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlanResponse {
    pub status: u16,
    pub body: Value,
    pub outcome: Outcome,
}

impl PlanResponse {
    fn rejected(err: &InvalidGoal) -> Self {
        Self {
            status: STATUS_UNPROCESSABLE,
            body: json!({ "detail": err.to_string() }),
            outcome: Outcome::Rejected,
        }
    }

    /// Response for a failed request, classified by error kind.
    pub fn from_error(err: &PlanError) -> Self {
        let kind = err.kind();
        Self {
            status: kind.status_code(),
            body: json!({ "detail": format!("{}: {err}", kind.detail_prefix()) }),
            outcome: Outcome::Failed(kind),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Planned
    }

    /// Process exit code for the CLI.
    pub fn exit_code(&self) -> u8 {
        match self.outcome {
            Outcome::Planned => 0,
            Outcome::Rejected => EXIT_INVALID_INPUT,
            Outcome::Failed(kind) => kind.exit_code(),
        }
    }
}

/// Parse and validate a request body.
pub fn parse_request(body: &str) -> Result<GoalInput, InvalidGoal> {
    let request: GoalRequest =
        serde_json::from_str(body).map_err(|e| InvalidGoal::Malformed(e.to_string()))?;
    GoalInput::new(request.goal_text)
}

/// Handle one request, acquiring the model capability from `config`.
///
/// Acquisition happens per request, after the body is accepted, so a
/// missing credential is reported for that request as a configuration
/// failure.
pub async fn handle_plan_request(config: &PlannerConfig, body: &str) -> PlanResponse {
    let goal = match parse_request(body) {
        Ok(goal) => goal,
        Err(e) => return reject(&e),
    };
    let generator = match PlanGenerator::from_config(config) {
        Ok(generator) => generator,
        Err(e) => {
            warn!(err = %e, "model acquisition failed");
            return fail(&e);
        }
    };
    run(&generator, &goal).await
}

/// Handle one request with an already acquired generator.
pub async fn respond(generator: &PlanGenerator, body: &str) -> PlanResponse {
    match parse_request(body) {
        Ok(goal) => run(generator, &goal).await,
        Err(e) => reject(&e),
    }
}

async fn run(generator: &PlanGenerator, goal: &GoalInput) -> PlanResponse {
    let plan = match generator.generate(goal).await {
        Ok(plan) => plan,
        Err(e) => return fail(&e),
    };
    match serde_json::to_value(&plan) {
        Ok(body) => {
            info!(status = STATUS_OK, task_count = plan.tasks.len(), "plan request served");
            PlanResponse {
                status: STATUS_OK,
                body,
                outcome: Outcome::Planned,
            }
        }
        Err(e) => {
            error!(err = %e, "failed to encode plan");
            fail(&PlanError::unexpected(format!("failed to encode plan: {e}")))
        }
    }
}

fn reject(err: &InvalidGoal) -> PlanResponse {
    let response = PlanResponse::rejected(err);
    warn!(status = response.status, err = %err, "plan request rejected");
    response
}

/// The cause was already logged where it happened.
fn fail(err: &PlanError) -> PlanResponse {
    let response = PlanResponse::from_error(err);
    error!(status = response.status, kind = ?err.kind(), "plan request failed");
    response
}
