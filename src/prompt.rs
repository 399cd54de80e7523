//! Prompt construction for plan generation.
//!
//! The prompt sent to the model is built here and nowhere else, so there is
//! exactly one place to review the instructions that reach the model.
//!
//! # Injection risk
//!
//! The goal text is user input. It is fenced between `---GOAL---` lines so
//! the model can tell the payload from the instruction envelope. A goal that
//! contains the delimiter line itself may still confuse the model; the
//! structured-output schema bounds what such a goal can achieve.

use chrono::NaiveDate;

/// Delimiter used to fence the goal text inside the prompt.
const GOAL_DELIMITER: &str = "---GOAL---";

/// Fixed planning rules. Must not contain format placeholders: the variable
/// fields are appended by [`build_plan_prompt`].
const PLANNING_RULES: &str = "You are an expert project manager. Break the user's goal down into a series of detailed, actionable tasks.

Rules:
1. Strict JSON output: respond ONLY with a single JSON object that conforms to the provided TaskPlan schema. Do not include conversational text, explanations, or markdown code fences.
2. Tasks: produce a sequential, logically ordered task list. For a complex goal, produce at least 5 and at most about 10 tasks.
3. Timeline logic: each task's estimated_duration_days, together with the tasks it depends on, must be consistent with its suggested_deadline. Compute every deadline relative to the CURRENT DATE below.
4. Dependencies: express dependencies as dependency_ids referencing other tasks' task_id (e.g. task 3 depends on task 2). The first task usually has no dependencies.
5. Dates: emit every date in YYYY-MM-DD format.";

/// Render the plan-generation prompt for `goal_text` as of `today`.
///
/// Pure: the same inputs always give the same string. The goal text is
/// inserted exactly once, verbatim; the date is rendered as `YYYY-MM-DD`.
pub fn build_plan_prompt(goal_text: &str, today: NaiveDate) -> String {
    let current_date = today.format("%Y-%m-%d");
    format!(
        "{PLANNING_RULES}\n\n\
         CURRENT DATE (Today): {current_date}\n\n\
         GOAL TEXT:\n\
         {GOAL_DELIMITER}\n\
         {goal_text}\n\
         {GOAL_DELIMITER}"
    )
}
