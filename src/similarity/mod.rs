//! Text similarity over sentence embeddings.
//!
//! `SimilarityScorer` wraps one `Embedder` backend and scores two short
//! fragments by the cosine of their embeddings. Embeddings are cached per
//! text since the greedy matcher compares the same available-action strings
//! against many candidates.
//!
//! Backend failures are returned to the caller. A matcher that needs a score
//! cannot proceed without one, so nothing here degrades to a default value.
mod command;
mod http;
mod lexical;

pub use command::CommandEmbedder;
pub use http::HttpEmbedder;
pub use lexical::LexicalEmbedder;

use crate::config::{EmbedderConfig, EvalConfig};
use anyhow::{anyhow, Context, Result};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

pub type Embedding = Vec<f32>;

/// A sentence/phrase embedding backend.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Embedding>;

    /// Model identifier for logs.
    fn model_name(&self) -> &str;
}

const DEFAULT_MAX_CACHE: usize = 10_000;

pub struct SimilarityScorer {
    embedder: Box<dyn Embedder>,
    cache: RefCell<HashMap<String, Rc<Embedding>>>,
    max_cache_size: usize,
}

impl SimilarityScorer {
    pub fn new(embedder: Box<dyn Embedder>) -> Self {
        Self::with_max_cache(embedder, DEFAULT_MAX_CACHE)
    }

    pub fn with_max_cache(embedder: Box<dyn Embedder>, max_cache_size: usize) -> Self {
        Self {
            embedder,
            cache: RefCell::new(HashMap::new()),
            max_cache_size,
        }
    }

    /// Scorer backed by the offline lexical embedder.
    pub fn lexical() -> Self {
        Self::new(Box::new(LexicalEmbedder::default()))
    }

    pub fn model_name(&self) -> &str {
        self.embedder.model_name()
    }

    /// Cosine similarity of the two texts' embeddings; higher is more similar.
    pub fn similarity(&self, text1: &str, text2: &str) -> Result<f32> {
        let first = self.embedding(text1)?;
        let second = self.embedding(text2)?;
        if first.len() != second.len() {
            return Err(anyhow!(
                "embedding dimension mismatch from {}: {} vs {}",
                self.model_name(),
                first.len(),
                second.len()
            ));
        }
        Ok(cosine_similarity(&first, &second))
    }

    fn embedding(&self, text: &str) -> Result<Rc<Embedding>> {
        if let Some(hit) = self.cache.borrow().get(text) {
            return Ok(Rc::clone(hit));
        }
        let embedding = Rc::new(
            self.embedder
                .embed(text)
                .with_context(|| format!("embed {text:?} with {}", self.model_name()))?,
        );
        let mut cache = self.cache.borrow_mut();
        if cache.len() < self.max_cache_size {
            cache.insert(text.to_string(), Rc::clone(&embedding));
        }
        Ok(embedding)
    }
}

/// Cosine of the angle between `a` and `b`; zero when either has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Scorer over the configured backend and cache bound.
pub fn build_scorer(config: &EvalConfig) -> Result<SimilarityScorer> {
    let embedder = build_embedder(&config.embedder)?;
    tracing::debug!(
        model = embedder.model_name(),
        cache_size = config.cache_size,
        "embedding backend ready"
    );
    Ok(SimilarityScorer::with_max_cache(embedder, config.cache_size))
}

/// Build the configured embedding backend.
pub fn build_embedder(config: &EmbedderConfig) -> Result<Box<dyn Embedder>> {
    match config {
        EmbedderConfig::Lexical { dimension } => Ok(Box::new(LexicalEmbedder::new(*dimension))),
        EmbedderConfig::Http {
            endpoint,
            model,
            api_key_env,
            timeout_secs,
        } => {
            let api_key = match api_key_env {
                Some(var) => Some(
                    std::env::var(var)
                        .with_context(|| format!("read embedding API key from ${var}"))?,
                ),
                None => None,
            };
            Ok(Box::new(HttpEmbedder::new(
                endpoint,
                model,
                api_key,
                Duration::from_secs(*timeout_secs),
            )))
        }
        EmbedderConfig::Command { command } => Ok(Box::new(CommandEmbedder::new(command)?)),
    }
}
