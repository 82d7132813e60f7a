use crate::workflow::config::InterpretationConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content
            .parts
            .into_iter()
            .next()?
            .text
    }
}

/// Single-shot client for the remote text-generation endpoint. No retry, no cache.
#[derive(Clone)]
pub struct InterpretationClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl InterpretationClient {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            api_key,
        }
    }

    pub fn from_config(config: &InterpretationConfig) -> Self {
        Self::new(config.endpoint.clone(), config.api_key())
    }

    /// Sends `prompt` and returns the first candidate's text verbatim.
    pub async fn interpret(&self, prompt: &str) -> anyhow::Result<String> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };
        let mut request = self.http.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("sending interpretation request to {}", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("interpretation endpoint answered {}", status);
        }
        let payload: GenerateResponse = response
            .json()
            .await
            .context("decoding interpretation response")?;
        payload
            .first_text()
            .context("interpretation response carried no candidate text")
    }
}
