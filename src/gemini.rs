//! Minimal client for the Gemini generateContent REST endpoint.
//!
//! The response is treated as unreliable free text; JSON extraction and
//! parsing happen in the analysis stage.

use anyhow::{anyhow, Context, Result};
use serde_json::{json, Value};

use crate::analyze::{GenerationConfig, TextGenerator};

const GEMINI_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiClient {
    client: reqwest::blocking::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            api_key,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            GEMINI_MODEL, self.api_key
        )
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str, config: Option<&GenerationConfig>) -> Result<String> {
        let mut payload = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });
        if let Some(config) = config {
            payload["generationConfig"] = json!({
                "temperature": config.temperature,
                "topP": config.top_p,
                "topK": config.top_k,
            });
        }

        let response = self
            .client
            .post(self.endpoint())
            .json(&payload)
            .send()
            .context("Gemini request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("Gemini returned {}: {}", status, body));
        }

        let body: Value = response.json().context("Gemini response is not JSON")?;
        let text = body
            .get("candidates")
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("content"))
            .and_then(|v| v.get("parts"))
            .and_then(|v| v.get(0))
            .and_then(|v| v.get("text"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Gemini response carries no candidate text"))?;
        Ok(text.to_string())
    }
}
