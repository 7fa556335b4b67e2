//! Optional LLM-backed column mapping suggestions via OpenRouter's
//! chat-completions API. Callers treat any failure here as non-fatal and
//! fall back to the heuristic matcher in `proposal`.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::models::CANONICAL_FIELDS;

const BASE_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OpenRouterClient {
	client: reqwest::Client,
	api_key: String,
	model: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
	choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
	message: ChatMessage,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
	role: String,
	content: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionBody {
	#[serde(default)]
	mappings: HashMap<String, String>,
	#[serde(default)]
	confidence_scores: HashMap<String, f64>,
}

impl OpenRouterClient {
	pub fn new(api_key: String, model: String) -> Self {
		Self {
			client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build().unwrap_or_default(),
			api_key,
			model,
		}
	}

	/// Ask the configured model to map `file_headers` onto the canonical
	/// field set. Returns `(column_mappings, confidence_scores)` filtered to
	/// entries the model proposed; callers still apply their own minimum
	/// confidence threshold.
	pub async fn suggest_mappings(
		&self,
		file_headers: &[String],
		metadata: &HashMap<&str, &str>,
	) -> Result<(HashMap<String, String>, HashMap<String, f64>), LlmError> {
		let prompt = build_prompt(file_headers, metadata);

		info!(header_count = file_headers.len(), model = %self.model, "requesting AI mapping suggestions");

		let response = self
			.client
			.post(BASE_URL)
			.bearer_auth(&self.api_key)
			.header("HTTP-Referer", "https://github.com/bordereaux")
			.header("X-Title", "Bordereaux Template Mapper")
			.json(&json!({
				"model": self.model,
				"messages": [
					{
						"role": "system",
						"content": "You are a helpful assistant that maps insurance bordereaux file columns to standardized field names. Always respond with valid JSON only."
					},
					{ "role": "user", "content": prompt }
				],
				"temperature": 0.3,
				"max_tokens": 2000,
			}))
			.send()
			.await?;

		let response = response.error_for_status()?;
		let body: ChatResponse = response.json().await?;
		let content = body
			.choices
			.first()
			.map(|c| c.message.content.trim())
			.ok_or(LlmError::EmptyResponse)?;

		let stripped = strip_code_fence(content);
		let parsed: SuggestionBody = serde_json::from_str(stripped)?;

		info!(mapped_count = parsed.mappings.len(), "AI suggestions received");
		Ok((parsed.mappings, parsed.confidence_scores))
	}
}

fn strip_code_fence(content: &str) -> &str {
	let content = content.strip_prefix("```json").unwrap_or(content);
	let content = content.strip_prefix("```").unwrap_or(content);
	content.strip_suffix("```").unwrap_or(content).trim()
}

fn build_prompt(file_headers: &[String], metadata: &HashMap<&str, &str>) -> String {
	let fields = CANONICAL_FIELDS.join(", ");
	let headers = file_headers.iter().map(|h| format!("- {h}")).collect::<Vec<_>>().join("\n");
	let context: String = metadata.iter().map(|(k, v)| format!("{k}: {v}\n")).collect();

	format!(
		"You are an expert at mapping insurance bordereaux file columns to standardized field names.\n\n\
		{context}The file has the following columns:\n{headers}\n\n\
		Available canonical fields: {fields}\n\n\
		Map each column to the best-fitting canonical field. Only include columns with a clear match.\n\
		Return ONLY a JSON object: {{\"mappings\": {{\"column\": \"field\"}}, \"confidence_scores\": {{\"column\": 0.0}}}}"
	)
}

/// Retry an LLM suggestion call, logging and swallowing any failure so the
/// caller can fall back to heuristic matching without surfacing the error.
pub async fn try_suggest(
	client: &OpenRouterClient,
	file_headers: &[String],
	metadata: &HashMap<&str, &str>,
) -> Option<(HashMap<String, String>, HashMap<String, f64>)> {
	match client.suggest_mappings(file_headers, metadata).await {
		Ok(result) => Some(result),
		Err(err) => {
			warn!(%err, "AI suggestion failed, falling back to heuristic matching");
			None
		}
	}
}

#[derive(Debug, Error)]
pub enum LlmError {
	#[error("request error: {0}")]
	Request(#[from] reqwest::Error),
	#[error("AI response was not valid JSON: {0}")]
	InvalidJson(#[from] serde_json::Error),
	#[error("AI response contained no choices")]
	EmptyResponse,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn strips_markdown_code_fence() {
		let raw = "```json\n{\"mappings\": {}}\n```";
		assert_eq!(strip_code_fence(raw), "{\"mappings\": {}}");
	}

	#[test]
	fn prompt_includes_every_header_and_field() {
		let headers = vec!["Policy Number".to_string()];
		let prompt = build_prompt(&headers, &HashMap::new());
		assert!(prompt.contains("Policy Number"));
		assert!(prompt.contains("policy_number"));
	}
}
