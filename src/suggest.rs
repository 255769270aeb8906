// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! KPI suggestions from an OpenAI-compatible chat endpoint
//!
//! Sends the diagram's task names and parses the reply as a KPI table that
//! can be committed next to the diagram.

use crate::config::SuggestConfig;
use crate::error::DashboardError;
use crate::kpi::KpiTable;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// Columns requested from the model
pub const SUGGESTED_COLUMNS: &str = "kpi_key, current_value, target_value, last_updated";

/// OpenAI chat completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI chat completion response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

/// Client for KPI suggestions
pub struct KpiSuggester {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
}

impl KpiSuggester {
    /// Create a suggester from the `[suggest]` settings
    pub fn from_config(cfg: &SuggestConfig, timeout: Duration) -> Result<Self, DashboardError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: cfg.api_base.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone().filter(|k| !k.is_empty()),
            model: cfg.model.clone(),
            temperature: cfg.temperature,
        })
    }

    /// Build the request URL.
    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Ask the model for KPI rows covering `tasks`
    pub async fn suggest(&self, tasks: &[String]) -> Result<KpiTable, DashboardError> {
        if tasks.is_empty() {
            return Err(DashboardError::Parse("no named tasks found in diagram".to_string()));
        }

        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user".to_string(), content: build_prompt(tasks) }],
            temperature: self.temperature,
        };

        let url = self.chat_completions_url();
        info!(model = %self.model, tasks = tasks.len(), "Requesting KPI suggestions");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DashboardError::from_status(status, &url));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| DashboardError::Parse(format!("suggestion response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DashboardError::Parse("suggestion response has no content".to_string()))?;

        debug!(chars = content.len(), "Received suggestion");
        KpiTable::parse(strip_code_fence(&content).as_bytes())
    }
}

/// Prompt asking for CSV rows covering the given task names
#[must_use]
pub fn build_prompt(tasks: &[String]) -> String {
    let task_list = serde_json::to_string(tasks).unwrap_or_else(|_| tasks.join(", "));
    format!(
        "You are a BPM KPI designer. Given this process's task names, propose 6-12 KPI rows \
         as CSV with a header row and columns: {SUGGESTED_COLUMNS}. Use snake_case for \
         kpi_key, guess current_value if unknown, choose a reasonable target_value and write \
         last_updated as YYYY-MM-DD. Only output CSV, no commentary.\n\nTasks:\n{task_list}\n"
    )
}

/// Remove a surrounding Markdown code fence, if present
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "csv") on the opening line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_tasks() {
        let prompt = build_prompt(&["Screen candidates".into(), "Make offer".into()]);
        assert!(prompt.contains(r#"["Screen candidates","Make offer"]"#));
        assert!(prompt.contains(SUGGESTED_COLUMNS));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```csv\nkpi_key\na\n```"), "kpi_key\na");
        assert_eq!(strip_code_fence("```\nkpi_key\n```\n"), "kpi_key");
        assert_eq!(strip_code_fence("  kpi_key\na\n"), "kpi_key\na");
    }

    #[test]
    fn test_url_and_key() {
        let cfg = SuggestConfig {
            api_base: "http://localhost:11434/v1/".into(),
            api_key: Some(String::new()),
            ..SuggestConfig::default()
        };
        let s = KpiSuggester::from_config(&cfg, Duration::from_secs(5)).unwrap();
        assert_eq!(s.chat_completions_url(), "http://localhost:11434/v1/chat/completions");
        assert!(s.api_key.is_none());
    }

    #[tokio::test]
    async fn test_no_tasks_is_error() {
        let s = KpiSuggester::from_config(&SuggestConfig::default(), Duration::from_secs(5)).unwrap();
        assert!(matches!(s.suggest(&[]).await, Err(DashboardError::Parse(_))));
    }
}
