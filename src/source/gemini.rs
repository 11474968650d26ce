//! Gemini-backed caption generation.
//!
//! Sends the description inside a fixed Roman-Urdu scriptwriting prompt and
//! asks for `application/json` output constrained by a response schema.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::CaptionSource;
use crate::caption::{validate_captions, Caption};
use crate::error::{CaptionError, SourceError};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

const SYSTEM_INSTRUCTION: &str = "You are an expert scriptwriter specializing in creating short, \
engaging video scripts in Roman Urdu. Your task is to generate a plausible, timestamped script \
based on a user's video description. The script should be creative yet strictly adhere to the \
provided context.";

const EXAMPLE_FORMAT: &str = r#"[{"start": 0.5, "end": 3.0, "words": [{"text": "Assalam", "start": 0.5, "end": 1.1}, {"text": "o", "start": 1.1, "end": 1.3}, {"text": "Alaikum,", "start": 1.3, "end": 2.0}] }]"#;

/// Caption generator backed by the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiSource {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiSource {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SourceError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SourceError::MissingApiKey);
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("rucap/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API host, e.g. for a proxy or a local test server.
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

/// Prompt sent as the user turn.
#[must_use]
pub fn prompt(description: &str) -> String {
    format!(
        "Video Description: \"{description}\". Generate a complete, sequential, and timestamped \
script in Roman Urdu based *only* on this description. The output must be a JSON array of caption \
objects. Each caption object must have overall \"start\" and \"end\" times, and a \"words\" array. \
Each element in the \"words\" array must be an object with its own \"text\", \"start\", and \"end\" \
time, representing a single word. Word timings must be sequential and fall within the parent \
caption's time range. Keep caption phrases to a maximum of 10 words. Example format: {EXAMPLE_FORMAT}"
    )
}

/// JSON schema the model output must follow.
#[must_use]
pub fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "start": {
                    "type": "NUMBER",
                    "description": "The start time of the entire caption phrase in seconds."
                },
                "end": {
                    "type": "NUMBER",
                    "description": "The end time of the entire caption phrase in seconds."
                },
                "words": {
                    "type": "ARRAY",
                    "description": "An array of word objects with individual timings.",
                    "items": {
                        "type": "OBJECT",
                        "properties": {
                            "text": {
                                "type": "STRING",
                                "description": "A single word of the caption text in Roman Urdu."
                            },
                            "start": {
                                "type": "NUMBER",
                                "description": "The start time of the word in seconds."
                            },
                            "end": {
                                "type": "NUMBER",
                                "description": "The end time of the word in seconds."
                            }
                        },
                        "required": ["text", "start", "end"]
                    }
                }
            },
            "required": ["start", "end", "words"]
        }
    })
}

/// Full `generateContent` request body.
#[must_use]
pub fn request_body(description: &str) -> Value {
    json!({
        "systemInstruction": {
            "parts": [{ "text": SYSTEM_INSTRUCTION }]
        },
        "contents": [{
            "role": "user",
            "parts": [{ "text": prompt(description) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Concatenated text parts of the first candidate.
fn response_text(response: &Value) -> Result<String, SourceError> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .ok_or(SourceError::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(SourceError::EmptyResponse);
    }
    Ok(text)
}

#[async_trait]
impl CaptionSource for GeminiSource {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, description: &str) -> Result<Vec<Caption>, SourceError> {
        debug!(model = %self.model, "requesting caption script");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request_body(description))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "caption generation request failed");
            return Err(SourceError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: Value = response.json().await?;
        let text = response_text(&api_response)?;
        let script: Value =
            serde_json::from_str(&text).map_err(|e| CaptionError::Syntax(e.to_string()))?;
        let captions = validate_captions(&script)?;

        info!(
            model = %self.model,
            count = captions.len(),
            "caption script generated"
        );
        Ok(captions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash:generateContent";

    fn candidate(text: &str) -> Value {
        json!({
            "candidates": [{ "content": { "parts": [{ "text": text }], "role": "model" } }]
        })
    }

    /// Mock server answering exactly one generate call with `response`.
    async fn gemini_server(key: &str, response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", key))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            GeminiSource::new("  "),
            Err(SourceError::MissingApiKey)
        ));
    }

    #[test]
    fn endpoint_includes_model() {
        let source = GeminiSource::new("k")
            .unwrap()
            .with_api_base("http://localhost:9/")
            .with_model("gemini-test");
        assert_eq!(
            source.endpoint(),
            "http://localhost:9/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn request_body_carries_prompt_and_schema() {
        let body = request_body("Biryani banane ka tareeqa");
        let prompt = body["contents"][0]["parts"][0]["text"].as_str().unwrap();
        assert!(prompt.starts_with("Video Description: \"Biryani banane ka tareeqa\"."));
        assert!(prompt.contains("maximum of 10 words"));
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["responseSchema"]["items"]["required"],
            json!(["start", "end", "words"])
        );
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Roman Urdu"));
    }

    #[test]
    fn response_text_joins_parts() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "[" }, { "text": "]" }] } }]
        });
        assert_eq!(response_text(&response).unwrap(), "[]");
    }

    #[test]
    fn missing_candidates_is_empty_response() {
        assert!(matches!(
            response_text(&json!({ "candidates": [] })),
            Err(SourceError::EmptyResponse)
        ));
        assert!(matches!(
            response_text(&json!({ "promptFeedback": { "blockReason": "SAFETY" } })),
            Err(SourceError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn generate_posts_and_validates() {
        let script = r#"[{"start": 0.5, "end": 3.0, "words": [{"text": "Assalam", "start": 0.5, "end": 1.1}, {"text": "o", "start": 1.1, "end": 1.3}]}]"#;
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(GENERATE_PATH))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(json!({
                "generationConfig": { "responseMimeType": "application/json" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(script)))
            .expect(1)
            .mount(&server)
            .await;

        let source = GeminiSource::new("secret").unwrap().with_api_base(server.uri());
        let captions = source.generate("greeting").await.unwrap();
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].words[1].text, "o");
    }

    #[tokio::test]
    async fn generate_surfaces_api_errors() {
        let response = ResponseTemplate::new(403).set_body_json(json!({ "error": "denied" }));
        let server = gemini_server("bad", response).await;

        let source = GeminiSource::new("bad").unwrap().with_api_base(server.uri());
        let err = source.generate("x").await.unwrap_err();
        assert!(matches!(err, SourceError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn generate_rejects_malformed_script() {
        let script = r#"[{"start": 0, "end": 1, "words": [{"text": "a", "end": 1}]}]"#;
        let response = ResponseTemplate::new(200).set_body_json(candidate(script));
        let server = gemini_server("k", response).await;

        let source = GeminiSource::new("k").unwrap().with_api_base(server.uri());
        let err = source.generate("x").await.unwrap_err();
        assert!(err
            .to_string()
            .contains("Invalid caption format received from API"));
    }
}
