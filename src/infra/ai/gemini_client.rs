// =============================================================================
// GEMINI CLIENT - Call transcript summarization
// =============================================================================
//
// Implements the `Summarizer` port against Google's Gemini API
// (https://ai.google.dev/gemini-api/docs).
//
// - Authentication: API key is passed as a query parameter (`?key=API_KEY`).
// - Request: one user `contents[]` entry whose single part is the summary
//   prompt followed by the transcript.
// - Response: text is at `candidates[0].content.parts[0].text`; the JSON object
//   inside it is cut out and parsed into a `CallSummary`.
//
// **Environment Variables:**
// - `GEMINI_API_KEY` - API key from https://aistudio.google.com/apikey
// - `GEMINI_MODEL` - model name, `gemini-2.5-flash-lite` by default

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::core::summaries::{extract_summary, summary_prompt, CallSummary, SummaryError, Summarizer};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash-lite";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// =============================================================================
// GEMINI API DATA STRUCTURES
// =============================================================================
//
// See: https://ai.google.dev/api/generate-content

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

/// The request body sent to the Gemini generateContent endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Content,

    /// Why the model stopped generating (e.g., "STOP", "SAFETY").
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

/// Error response from the Gemini API.
#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
    #[allow(dead_code)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiErrorDetail,
}

// =============================================================================
// GEMINI CLIENT IMPLEMENTATION
// =============================================================================

/// Summarizes call transcripts with a Gemini model.
///
/// # Example
/// ```ignore
/// let client = GeminiClient::new(std::env::var("GEMINI_API_KEY")?, "gemini-2.5-flash-lite");
/// let summary = client.summarize(&transcript).await?;
/// ```
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}:generateContent", API_BASE, self.model)
    }

    fn build_request(transcript: &str) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(summary_prompt(transcript)),
                }],
            }],
        }
    }

    /// Pull the first candidate's first text part out of a response body.
    fn response_text(body: &str) -> Result<String, SummaryError> {
        let response: GenerateContentResponse = serde_json::from_str(body).map_err(|e| {
            SummaryError::InvalidResponse(format!("unexpected response shape: {e}; body: {body}"))
        })?;

        let candidate = response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .ok_or_else(|| {
                SummaryError::InvalidResponse(
                    "no candidates in Gemini response - the model may have been blocked by safety filters"
                        .to_string(),
                )
            })?;

        candidate
            .content
            .parts
            .first()
            .and_then(|p| p.text.clone())
            .ok_or_else(|| {
                SummaryError::InvalidResponse(format!(
                    "first candidate has no text (finish reason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, transcript: &str) -> Result<CallSummary, SummaryError> {
        let request = Self::build_request(transcript);

        // Log request for debugging (be careful not to log the API key!)
        tracing::debug!(
            model = %self.model,
            transcript_chars = transcript.len(),
            "Gemini summarization request"
        );

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| SummaryError::Api(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SummaryError::Api(e.to_string()))?;

        if !status.is_success() {
            // Try to parse as Gemini error response for better error messages
            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&body) {
                return Err(SummaryError::Api(format!(
                    "Gemini API error ({}): {}",
                    status, error_response.error.message
                )));
            }
            return Err(SummaryError::Api(format!(
                "Gemini API error: {} - {}",
                status, body
            )));
        }

        let text = Self::response_text(&body)?;
        tracing::debug!(chars = text.len(), "Gemini response received");

        extract_summary(&text).map_err(|e| {
            SummaryError::InvalidResponse(format!("{e}; response text: {text}"))
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_prompt_and_transcript_in_one_part() {
        let request = GeminiClient::build_request("alice:\nhello");
        let json = serde_json::to_value(&request).unwrap();

        let parts = json["contents"][0]["parts"].as_array().unwrap();
        assert_eq!(parts.len(), 1);
        let text = parts[0]["text"].as_str().unwrap();
        assert!(text.starts_with("Analyze the following call transcript"));
        assert!(text.ends_with("\n\nTranscript:\nalice:\nhello"));
        assert_eq!(json["contents"][0]["role"], "user");
    }

    #[test]
    fn endpoint_includes_model() {
        let client = GeminiClient::new("key", DEFAULT_GEMINI_MODEL);
        assert_eq!(
            client.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn response_text_reads_first_part() {
        let body = r#"{
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "```json\n{\"action_items\": []}\n```"}, {"text": "ignored"}]},
                "finishReason": "STOP"
            }]
        }"#;

        let text = GeminiClient::response_text(body).unwrap();
        assert!(text.starts_with("```json"));
        assert_eq!(extract_summary(&text).unwrap(), CallSummary::default());
    }

    #[test]
    fn blocked_response_is_reported() {
        let err = GeminiClient::response_text(r#"{"promptFeedback": {}}"#).unwrap_err();
        assert!(matches!(err, SummaryError::InvalidResponse(_)));

        let err = GeminiClient::response_text(
            r#"{"candidates": [{"content": {"parts": []}, "finishReason": "SAFETY"}]}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
