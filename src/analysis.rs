//! LLM analysis of a single email via an OpenAI-compatible chat endpoint.
//!
//! One chat-completion request per email, JSON-mode response format, and
//! deliberately defensive output handling: models wrap JSON in markdown
//! fences or drift from the schema, so parsing degrades to a neutral
//! default instead of failing the caller.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::AnalysisError;
use crate::record::EmailRecord;

const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const DEFAULT_MODEL: &str = "compound-beta";

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that analyzes emails and returns ONLY valid JSON with no additional text.";

const RESPONSE_SCHEMA: &str = r#"IMPORTANT: You must respond ONLY with a valid JSON object using the following structure, with no additional text before or after:
{
  "summary": "string",
  "keyInsights": [{"text": "string", "confidence": number}],
  "sentiment": {"score": number, "label": "Negative" | "Neutral" | "Positive"},
  "entities": [{"name": "string", "type": "string", "confidence": number}],
  "actionItems": [{"text": "string", "priority": "Low" | "Medium" | "High"}],
  "topicClassification": ["string"]
}"#;

// ── Configuration ───────────────────────────────────────────────────

/// Analysis provider configuration, built from environment variables.
#[derive(Clone)]
pub struct AnalysisConfig {
    pub api_key: SecretString,
    pub model: String,
    pub endpoint: String,
}

impl AnalysisConfig {
    /// Build config from environment variables.
    /// Returns `None` if `ANALYSIS_API_KEY` is not set (analysis disabled).
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANALYSIS_API_KEY").ok()?;
        let model = std::env::var("ANALYSIS_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let endpoint =
            std::env::var("ANALYSIS_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
        Some(Self {
            api_key: SecretString::from(api_key),
            model,
            endpoint,
        })
    }
}

// ── Result schema ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeyInsight {
    pub text: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SentimentLabel {
    Negative,
    Neutral,
    Positive,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sentiment {
    /// -1 (very negative) to 1 (very positive).
    pub score: f32,
    pub label: SentimentLabel,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self {
            score: 0.0,
            label: SentimentLabel::Neutral,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityMention {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    pub text: String,
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

/// Structured analysis of one email. Every field independently falls back
/// to its default when missing from the provider response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResult {
    pub summary: String,
    pub key_insights: Vec<KeyInsight>,
    pub sentiment: Sentiment,
    pub entities: Vec<EntityMention>,
    pub action_items: Vec<ActionItem>,
    pub topic_classification: Vec<String>,
}

impl Default for AnalysisResult {
    /// The neutral fallback returned when the provider's output cannot be
    /// parsed.
    fn default() -> Self {
        Self {
            summary: "Unable to analyze email content.".to_string(),
            key_insights: vec![KeyInsight {
                text: "Analysis failed".to_string(),
                confidence: 0.0,
            }],
            sentiment: Sentiment::default(),
            entities: Vec::new(),
            action_items: Vec::new(),
            topic_classification: vec!["Unknown".to_string()],
        }
    }
}

// ── Client ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Client for the chat-completion analysis endpoint.
pub struct AnalysisClient {
    config: AnalysisConfig,
    client: reqwest::Client,
}

impl AnalysisClient {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Analyze one email. Transport and provider failures are errors;
    /// unparseable model output is not — it degrades to the neutral
    /// default.
    pub async fn analyze(&self, email: &EmailRecord) -> Result<AnalysisResult, AnalysisError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": build_prompt(email)},
            ],
            "temperature": 0.3,
            "max_tokens": 1024,
            "response_format": {"type": "json_object"},
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AnalysisError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(AnalysisError::RequestFailed(format!("{status}: {detail}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AnalysisError::InvalidResponse("no choices in response".into()))?;

        Ok(parse_analysis(&content))
    }
}

/// The fixed analysis prompt for one email.
fn build_prompt(email: &EmailRecord) -> String {
    format!(
        "Analyze the following email:\n\n\
         From: {}\n\
         Subject: {}\n\
         Preview: {}\n\n\
         Provide the following analysis:\n\
         1. A brief summary of the email content\n\
         2. Key insights from the email\n\
         3. Sentiment analysis (score from -1 to 1 and label)\n\
         4. Entities mentioned in the email\n\
         5. Action items that need to be addressed\n\
         6. Topic classification\n\n\
         {}",
        email.from, email.subject, email.preview, RESPONSE_SCHEMA
    )
}

/// Parse the model's content into an [`AnalysisResult`], stripping
/// markdown code fences and falling back to the neutral default.
pub fn parse_analysis(content: &str) -> AnalysisResult {
    let payload = strip_code_fence(content);
    match serde_json::from_str(payload) {
        Ok(result) => result,
        Err(e) => {
            warn!(error = %e, "unparseable analysis payload; using default");
            AnalysisResult::default()
        }
    }
}

/// Extract the payload from ```` ```json ... ``` ```` or
/// ```` ``` ... ``` ```` wrapping, if any.
fn strip_code_fence(content: &str) -> &str {
    for marker in ["```json", "```"] {
        if let Some(start) = content.find(marker) {
            let inner = &content[start + marker.len()..];
            if let Some(end) = inner.find("```") {
                return inner[..end].trim();
            }
        }
    }
    content.trim()
}
