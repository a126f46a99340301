//! Turns a free-form to-do list into a [`Schedule`].
//!
//! The generator never runs during a countdown; `tasktimer plan` calls it
//! once and writes the result as a schedule file.
//!
//! # Examples
//!
//! ```rust,no_run
//! use tasktimer_core::generator::{ChatCompletionsGenerator, PlanRequest, ScheduleGenerator};
//!
//! # async fn example() -> Result<(), tasktimer_core::error::GeneratorError> {
//! let generator = ChatCompletionsGenerator::new(
//!     reqwest::Client::new(),
//!     "https://api.openai.com/v1",
//!     "gpt-4o",
//!     "sk-...",
//! )?;
//! let request = PlanRequest::new("- finish report, due tomorrow", chrono::Local::now().naive_local());
//! let schedule = generator.generate(&request).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{NaiveDateTime, NaiveTime};
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::error::GeneratorError;
use crate::schedule::Schedule;

/// What the generator is asked to plan.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub todo_text: String,
    /// Local date and time the plan starts from.
    pub now: NaiveDateTime,
    pub workday_end: Option<NaiveTime>,
}

impl PlanRequest {
    pub fn new(todo_text: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            todo_text: todo_text.into(),
            now,
            workday_end: None,
        }
    }

    pub fn with_workday_end(mut self, end: Option<NaiveTime>) -> Self {
        self.workday_end = end;
        self
    }
}

#[async_trait]
pub trait ScheduleGenerator: Send + Sync {
    async fn generate(&self, request: &PlanRequest) -> Result<Schedule, GeneratorError>;
}

/// Build the system prompt for `request`.
pub fn build_system_prompt(request: &PlanRequest) -> String {
    let date = request.now.format("%Y-%m-%d");
    let time = request.now.format("%H:%M");

    let mut prompt = indoc::formatdoc! {"
        You are an expert scheduling assistant. Convert the user's unstructured to-do list into a structured JSON timeline.

        Current context:
        - Today's date: {date}
        - Current time: {time}

        Instructions:
    ", date = date, time = time};

    let mut rules = Vec::new();
    match request.workday_end {
        Some(end) => {
            let end = end.format("%H:%M");
            rules.push(format!(
                "The workday ends at {end}. Schedule work blocks and breaks from {time} until {end}, never later."
            ));
        }
        None => rules.push(format!(
            "Schedule the rest of the day starting from the current time ({time})."
        )),
    }
    rules.push(
        "Prioritize tasks that must be done today: closer deadlines come first (\"due tomorrow\" before \"due next week\"), as do explicit requests such as \"do this today\"."
            .into(),
    );
    rules.push(
        "Use focused blocks of 60-90 minutes for demanding tasks and shorter blocks for minor ones. Place 15 minute breaks between tasks and at least one longer break."
            .into(),
    );
    rules.push(
        "Make each task_name descriptive and mention its deadline when it has one.".into(),
    );
    rules.push(
        "Output a single valid JSON object and nothing else: no prose, markdown or comments."
            .into(),
    );
    for (i, rule) in rules.iter().enumerate() {
        prompt.push_str(&format!("{}. {rule}\n", i + 1));
    }

    prompt.push_str(
        "\nJSON schema:\n\
         {\"schedule_date\": \"YYYY-MM-DD\", \"tasks\": [{\"task_name\": \"...\", \"start_time\": \"HH:MM\", \"end_time\": \"HH:MM\", \"duration_minutes\": 60}]}\n",
    );
    prompt
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator backed by an OpenAI-compatible `chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: String,
}

impl ChatCompletionsGenerator {
    /// # Errors
    ///
    /// Returns `Url` when `base_url` is not a valid URL.
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, GeneratorError> {
        // `join` replaces the last segment unless the base ends in '/'.
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        Ok(Self {
            client,
            endpoint: base.join("chat/completions")?,
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    /// Read the API key from `env_var`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` when the variable is unset or empty.
    pub fn from_env(
        client: reqwest::Client,
        base_url: &str,
        model: impl Into<String>,
        env_var: &str,
    ) -> Result<Self, GeneratorError> {
        let api_key = std::env::var(env_var)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeneratorError::MissingApiKey {
                env_var: env_var.to_string(),
            })?;
        Self::new(client, base_url, model, api_key)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn request_body(&self, request: &PlanRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": build_system_prompt(request) },
                { "role": "user", "content": request.todo_text },
            ],
        })
    }
}

#[async_trait]
impl ScheduleGenerator for ChatCompletionsGenerator {
    async fn generate(&self, request: &PlanRequest) -> Result<Schedule, GeneratorError> {
        debug!(endpoint = %self.endpoint, model = %self.model, "requesting schedule");
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&self.request_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GeneratorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(GeneratorError::EmptyResponse)?;

        let schedule: Schedule =
            serde_json::from_str(&content).map_err(GeneratorError::InvalidSchedule)?;
        info!(tasks = schedule.len(), "schedule generated");
        Ok(schedule)
    }
}
