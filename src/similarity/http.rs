//! OpenAI-compatible `/embeddings` client.
use super::{Embedder, Embedding};
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::{Duration, Instant};

pub struct HttpEmbedder {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    pub fn new(endpoint: &str, model: &str, api_key: Option<String>, timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        Self {
            agent,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl Embedder for HttpEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let start = Instant::now();
        let mut request = self.agent.post(&self.endpoint);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }
        let mut response = request
            .send_json(serde_json::json!({
                "model": self.model,
                "input": text,
            }))
            .with_context(|| format!("POST {}", self.endpoint))?;
        let parsed: EmbeddingResponse = response
            .body_mut()
            .read_json()
            .context("decode embedding response")?;

        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis(),
            text_bytes = text.len(),
            model = %self.model,
            "embedding request complete"
        );

        parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| anyhow!("no embedding in response from {}", self.endpoint))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
