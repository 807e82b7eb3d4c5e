use super::{SummaryError, SummaryGateway};
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::runtime::Runtime;

/// Blocking client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::Client,
    runtime: Runtime,
    api_key: String,
    model: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Result<Self, SummaryError> {
        let runtime = Runtime::new().map_err(|err| SummaryError::Runtime(err.to_string()))?;
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| SummaryError::Backend(err.to_string()))?;
        Ok(Self {
            http,
            runtime,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SummaryGateway for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, SummaryError> {
        let request = GenerateRequest::new(prompt);
        let url = self.url();

        let body = self.runtime.block_on(async {
            let response = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&request)
                .send()
                .await
                .map_err(|err| SummaryError::Backend(err.to_string()))?;

            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|err| SummaryError::Backend(err.to_string()))?;
            if !status.is_success() {
                return Err(SummaryError::Status {
                    status: status.as_u16(),
                    body: text,
                });
            }
            Ok(text)
        })?;

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|err| SummaryError::Backend(err.to_string()))?;
        parsed.text().ok_or(SummaryError::EmptyResponse)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, concatenated.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_wraps_prompt_in_single_part() {
        let body = serde_json::to_value(GenerateRequest::new("hola")).expect("serialize");
        assert_eq!(
            body,
            serde_json::json!({ "contents": [{ "parts": [{ "text": "hola" }] }] })
        );
    }

    #[test]
    fn response_text_joins_parts_of_first_candidate() {
        let raw = r#"{
            "candidates": [
                { "content": { "parts": [{ "text": "Resumen " }, { "text": "del día." }] } },
                { "content": { "parts": [{ "text": "ignorado" }] } }
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).expect("parse");
        assert_eq!(parsed.text().as_deref(), Some("Resumen del día."));
    }

    #[test]
    fn blocked_or_empty_responses_have_no_text() {
        let blocked: GenerateResponse =
            serde_json::from_str(r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#)
                .expect("parse");
        assert_eq!(blocked.text(), None);

        let empty: GenerateResponse =
            serde_json::from_str(r#"{ "candidates": [{ "finishReason": "STOP" }] }"#)
                .expect("parse");
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn url_targets_model_and_debug_hides_key() {
        let client = GeminiClient::new("secret-key", "gemini-2.5-flash", "http://localhost:1/v1beta/")
            .expect("client");
        assert_eq!(
            client.url(),
            "http://localhost:1/v1beta/models/gemini-2.5-flash:generateContent"
        );
        assert!(!format!("{client:?}").contains("secret-key"));
    }

    #[test]
    fn unreachable_endpoint_is_a_backend_error() {
        let client = GeminiClient::new("key", "model", "http://127.0.0.1:9").expect("client");
        assert!(matches!(
            client.generate("hola"),
            Err(SummaryError::Backend(_))
        ));
    }
}
