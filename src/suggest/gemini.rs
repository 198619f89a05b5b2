use async_trait::async_trait;
use log::info;
use serde::{ Deserialize, Serialize };

use super::{ ReplyBackend, ReplyError };

/// Fixed model for suggestion generation; not a tunable of the service.
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<GoogleCandidate>,
}

#[derive(Deserialize)]
struct GoogleCandidate {
    content: GoogleContent,
}

#[derive(Deserialize)]
struct GoogleContent {
    #[serde(default)]
    parts: Vec<GooglePart>,
}

#[derive(Deserialize)]
struct GooglePart {
    text: String,
}

pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn response_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "replies": {
                    "type": "ARRAY",
                    "items": { "type": "STRING" },
                    "description": "An array of three short smart reply suggestions."
                }
            }
        })
    }
}

#[async_trait]
impl ReplyBackend for GeminiBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ReplyError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            GEMINI_MODEL,
            self.api_key
        );
        info!("GeminiBackend::complete() → model={}", GEMINI_MODEL);

        let payload = GenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: Self::response_schema(),
            },
        };

        let resp = self.client
            .post(&url)
            .json(&payload)
            .send().await?
            .error_for_status()?;
        let body: GenerateResponse = resp.json().await?;

        body.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or(ReplyError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_with_camel_case_config() {
        let payload = GenerateRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: "hi".into() }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".into(),
                response_schema: GeminiBackend::response_schema(),
            },
        };
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(json["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(
            json["generationConfig"]["responseSchema"]["properties"]["replies"]["type"],
            "ARRAY"
        );
    }

    #[test]
    fn response_parsing_reads_first_candidate() {
        let body = r#"{
            "candidates": [
                { "content": { "parts": [ { "text": "{\"replies\":[\"ok\"]}" } ] } }
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.candidates[0].content.parts[0].text, "{\"replies\":[\"ok\"]}");
    }

    #[test]
    fn response_without_candidates_parses_as_empty() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.candidates.is_empty());
    }
}
