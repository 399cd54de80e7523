//! Plan data model and the decoder that turns model output into a [`Plan`].
//!
//! Validation is structural only: presence and type of every field, a
//! strict `YYYY-MM-DD` deadline, a non-empty task list and non-empty task
//! descriptions. Cross-task consistency (dependency cycles, dangling
//! `dependency_ids`, deadline chronology) is deliberately left unchecked.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::error::Category;

use crate::error::{InvalidGoal, PlanError};

/// Compiled once; the pattern is a valid literal so init cannot fail at runtime.
static DATE_RE: OnceLock<Regex> = OnceLock::new();

fn date_re() -> &'static Regex {
    DATE_RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid literal regex"))
}

/// The user's goal, validated non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalInput {
    goal_text: String,
}

impl GoalInput {
    /// Rejects empty and whitespace-only text. The text itself is kept as given.
    pub fn new(goal_text: impl Into<String>) -> Result<Self, InvalidGoal> {
        let goal_text = goal_text.into();
        if goal_text.trim().is_empty() {
            return Err(InvalidGoal::Empty);
        }
        Ok(GoalInput { goal_text })
    }

    pub fn goal_text(&self) -> &str {
        &self.goal_text
    }
}

/// One planned unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Task {
    /// A unique integer ID for the task.
    pub task_id: i64,
    /// A clear, actionable description of the task.
    pub description: String,
    /// The estimated time in whole days to complete the task.
    pub estimated_duration_days: u32,
    /// The calculated deadline for this task (YYYY-MM-DD) based on the goal timeline and dependencies.
    #[serde(deserialize_with = "deserialize_deadline")]
    #[schemars(with = "NaiveDate")]
    pub suggested_deadline: NaiveDate,
    /// The task_ids that must be completed before this task can start. Empty if none.
    pub dependency_ids: Vec<i64>,
}

/// A goal broken down into tasks, timelines and dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// The original goal text provided by the user.
    pub goal: String,
    /// The estimated minimum number of calendar days needed to complete the goal.
    pub total_duration_days: u32,
    /// The detailed breakdown of tasks, in execution order.
    #[schemars(length(min = 1))]
    pub tasks: Vec<Task>,
}

impl Plan {
    /// Checks the invariants serde cannot express.
    fn validate(&self) -> Result<(), String> {
        if self.tasks.is_empty() {
            return Err("plan contains no tasks".to_owned());
        }
        if let Some(task) = self.tasks.iter().find(|t| t.description.trim().is_empty()) {
            return Err(format!("task {} has an empty description", task.task_id));
        }
        Ok(())
    }
}

/// Decode model output into a [`Plan`].
///
/// Non-JSON text and JSON that fails the schema are both reported as
/// [`PlanError::Generation`] carrying the raw text; the detail message says
/// which of the two it was. No repair is attempted (a fenced code block is
/// rejected like any other non-JSON text).
pub fn decode_plan(text: &str) -> Result<Plan, PlanError> {
    let plan: Plan = serde_json::from_str(text).map_err(|e| {
        let detail = match e.classify() {
            Category::Data => format!("response does not match the plan schema: {e}"),
            Category::Syntax | Category::Eof | Category::Io => {
                format!("response is not valid JSON: {e}")
            }
        };
        PlanError::generation(detail, Some(text))
    })?;

    plan.validate()
        .map_err(|detail| PlanError::generation(detail, Some(text)))?;

    Ok(plan)
}

fn deserialize_deadline<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw = String::deserialize(deserializer)?;
    if !date_re().is_match(&raw) {
        return Err(D::Error::custom(format!(
            "suggested_deadline {raw:?} is not in YYYY-MM-DD form"
        )));
    }
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|e| {
        D::Error::custom(format!(
            "suggested_deadline {raw:?} is not a calendar date: {e}"
        ))
    })
}
