//! Plan generation: one complete request/response cycle against the model.
//!
//! Phases: capability acquisition ([`PlanGenerator::from_config`]), prompt
//! construction, one schema-constrained model call bounded by a timeout,
//! then decode and validate. A failure in any phase is returned at once,
//! already classified; nothing is retried or repaired.
//!
//! Debug logs never include the full prompt (`<prompt len=N>`). The raw
//! model output is logged when it fails validation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDate};
use tracing::{debug, info, warn};

use crate::config::PlannerConfig;
use crate::error::PlanError;
use crate::gemini::GeminiClient;
use crate::llm::{LlmError, PlanModel, StructuredRequest};
use crate::model::{self, GoalInput, Plan};
use crate::prompt;
use crate::schema;

/// Per-call knobs, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationSettings {
    pub temperature: f32,
    pub request_timeout: Duration,
}

impl GenerationSettings {
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            temperature: config.temperature,
            request_timeout: config.request_timeout(),
        }
    }
}

/// Generates validated plans. Holds no per-request state, so one instance
/// can serve concurrent requests.
#[derive(Clone)]
pub struct PlanGenerator {
    model: Arc<dyn PlanModel>,
    settings: GenerationSettings,
}

impl PlanGenerator {
    pub fn new(model: Arc<dyn PlanModel>, settings: GenerationSettings) -> Self {
        Self { model, settings }
    }

    /// Acquire the model capability from explicit configuration.
    ///
    /// Invalid settings or a missing credential fail here as
    /// [`PlanError::Config`], before any network call can be made.
    pub fn from_config(config: &PlannerConfig) -> Result<Self, PlanError> {
        config.validate()?;
        let client = GeminiClient::from_config(config)?;
        Ok(Self::new(Arc::new(client), GenerationSettings::from_config(config)))
    }

    pub fn settings(&self) -> GenerationSettings {
        self.settings
    }

    /// Generate a plan for `goal`, with deadlines relative to today's local date.
    pub async fn generate(&self, goal: &GoalInput) -> Result<Plan, PlanError> {
        self.generate_for_date(goal, Local::now().date_naive()).await
    }

    /// Generate a plan for `goal`, with deadlines relative to `today`.
    pub async fn generate_for_date(
        &self,
        goal: &GoalInput,
        today: NaiveDate,
    ) -> Result<Plan, PlanError> {
        let request = StructuredRequest {
            prompt: prompt::build_plan_prompt(goal.goal_text(), today),
            schema: schema::plan_response_schema().clone(),
            temperature: self.settings.temperature,
        };

        info!(
            model = self.model.model_name(),
            %today,
            temperature = self.settings.temperature,
            timeout_sec = self.settings.request_timeout.as_secs(),
            "requesting plan"
        );
        debug!(prompt = %format!("<prompt len={}>", request.prompt.len()), "plan prompt");

        let start = Instant::now();
        let text = self.call_model(&request).await.inspect_err(|e| {
            warn!(kind = ?e.kind(), err = %e, "model call failed");
        })?;

        info!(
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            "model responded"
        );

        match model::decode_plan(&text) {
            Ok(plan) => {
                info!(
                    task_count = plan.tasks.len(),
                    total_duration_days = plan.total_duration_days,
                    "plan validated"
                );
                Ok(plan)
            }
            Err(e) => {
                warn!(
                    err = %e,
                    response_len = text.len(),
                    raw_response = %text,
                    "model output failed validation"
                );
                Err(e)
            }
        }
    }

    async fn call_model(&self, request: &StructuredRequest) -> Result<String, PlanError> {
        let deadline = self.settings.request_timeout;
        match tokio::time::timeout(deadline, self.model.generate_json(request)).await {
            Ok(result) => result.map_err(PlanError::from),
            Err(_elapsed) => Err(LlmError::Timeout(deadline).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::llm::mock::{MockPlanModel, MockReply};
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            temperature: 0.4,
            request_timeout: Duration::from_secs(5),
        }
    }

    fn generator_with(model: Arc<MockPlanModel>) -> PlanGenerator {
        PlanGenerator::new(model, settings())
    }

    fn offsite_response() -> String {
        let tasks: Vec<_> = (1..=6)
            .map(|id| {
                let deps: Vec<i64> = if id == 1 { vec![] } else { vec![id - 1] };
                json!({
                    "task_id": id,
                    "description": format!("Offsite step {id}"),
                    "estimated_duration_days": 1,
                    "suggested_deadline": format!("2026-10-{:02}", 19 + (id + 1) / 2),
                    "dependency_ids": deps,
                })
            })
            .collect();
        json!({"goal": "Plan a 3-day offsite", "total_duration_days": 3, "tasks": tasks})
            .to_string()
    }

    #[tokio::test]
    async fn well_formed_response_yields_validated_plan() {
        let model = Arc::new(MockPlanModel::text(offsite_response()));
        let generator = generator_with(model.clone());
        let goal = GoalInput::new("Plan a 3-day offsite").unwrap();

        let plan = generator.generate_for_date(&goal, today()).await.unwrap();

        assert_eq!(plan.goal, "Plan a 3-day offsite");
        assert_eq!(plan.total_duration_days, 3);
        assert_eq!(plan.tasks.len(), 6);
        assert!(
            plan.tasks
                .iter()
                .all(|t| t.dependency_ids.iter().all(|d| *d <= t.task_id))
        );
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn request_carries_prompt_schema_and_temperature() {
        let model = Arc::new(MockPlanModel::text(offsite_response()));
        let generator = generator_with(model.clone());
        let goal = GoalInput::new("Plan a 3-day offsite").unwrap();

        generator.generate_for_date(&goal, today()).await.unwrap();

        let request = model.last_request().expect("model was called");
        assert!(request.prompt.contains("CURRENT DATE (Today): 2026-10-19"));
        assert_eq!(request.prompt.matches("Plan a 3-day offsite").count(), 1);
        assert_eq!(request.schema, *schema::plan_response_schema());
        assert!((request.temperature - 0.4).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn refusal_text_is_generation_error() {
        let model = Arc::new(MockPlanModel::text("Sorry, I can't help with that."));
        let generator = generator_with(model);
        let goal = GoalInput::new("Plan a 3-day offsite").unwrap();

        let err = generator.generate_for_date(&goal, today()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
        assert_eq!(err.raw_response(), Some("Sorry, I can't help with that."));
    }

    #[tokio::test]
    async fn empty_task_list_is_generation_error() {
        let model = Arc::new(MockPlanModel::text(
            r#"{"goal": "x", "total_duration_days": 5, "tasks": []}"#,
        ));
        let generator = generator_with(model);
        let goal = GoalInput::new("x").unwrap();

        let err = generator.generate_for_date(&goal, today()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generation);
    }

    #[tokio::test]
    async fn capability_errors_are_classified_not_retried() {
        let cases = [
            (MockReply::Status(401, "API key not valid".into()), ErrorKind::Configuration),
            (MockReply::Status(429, "quota".into()), ErrorKind::Generation),
            (MockReply::Status(500, "internal".into()), ErrorKind::Generation),
            (MockReply::Empty("prompt blocked: SAFETY".into()), ErrorKind::Generation),
        ];
        for (reply, expected) in cases {
            let model = Arc::new(MockPlanModel::new(reply.clone()));
            let generator = generator_with(model.clone());
            let goal = GoalInput::new("Plan a 3-day offsite").unwrap();

            let err = generator.generate_for_date(&goal, today()).await.unwrap_err();
            assert_eq!(err.kind(), expected, "{reply:?}: {err}");
            assert_eq!(model.call_count(), 1, "{reply:?} must not be retried");
        }
    }

    #[tokio::test]
    async fn slow_model_times_out_as_configuration_error() {
        let model = Arc::new(MockPlanModel::new(MockReply::Stall(
            Duration::from_secs(10),
            offsite_response(),
        )));
        let generator = PlanGenerator::new(
            model,
            GenerationSettings {
                temperature: 0.4,
                request_timeout: Duration::from_millis(50),
            },
        );
        let goal = GoalInput::new("Plan a 3-day offsite").unwrap();

        let err = generator.generate_for_date(&goal, today()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }

    #[tokio::test]
    async fn concurrent_requests_are_independent() {
        let model = Arc::new(MockPlanModel::text(offsite_response()));
        let generator = generator_with(model.clone());

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let generator = generator.clone();
                tokio::spawn(async move {
                    let goal = GoalInput::new(format!("goal {i}")).unwrap();
                    generator.generate_for_date(&goal, today()).await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(model.call_count(), 4);
    }

    #[test]
    fn missing_credential_fails_acquisition() {
        let config = PlannerConfig::default();
        let err = PlanGenerator::from_config(&config)
            .err()
            .expect("acquisition must fail without a key");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("GEMINI_API_KEY"), "got: {err}");
    }

    #[test]
    fn invalid_settings_fail_acquisition() {
        let config = PlannerConfig {
            api_key: Some("k".to_owned()),
            temperature: 3.0,
            ..PlannerConfig::default()
        };
        let err = PlanGenerator::from_config(&config)
            .err()
            .expect("acquisition must fail on bad temperature");
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn acquisition_copies_settings_from_config() {
        let config = PlannerConfig {
            api_key: Some("k".to_owned()),
            temperature: 0.1,
            request_timeout_sec: 9,
            ..PlannerConfig::default()
        };
        let generator = PlanGenerator::from_config(&config).unwrap();
        assert_eq!(
            generator.settings(),
            GenerationSettings {
                temperature: 0.1,
                request_timeout: Duration::from_secs(9),
            }
        );
    }
}
