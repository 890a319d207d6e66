//! Deterministic offline embedding from hashed lexical features.
//!
//! Each word token and each character trigram of the `#word#`-padded token
//! is hashed (FNV-1a) into a fixed number of buckets. Cosine over these
//! vectors rewards shared words and shared word fragments, which is enough to
//! line up `put down c` with `put-down c` without a learned model.
use super::{Embedder, Embedding};
use anyhow::Result;

pub const DEFAULT_DIMENSION: usize = 256;

const WORD_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct LexicalEmbedder {
    dimension: usize,
}

impl Default for LexicalEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl LexicalEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a(feature.as_bytes()) % self.dimension as u64) as usize
    }
}

impl Embedder for LexicalEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let mut vector = vec![0.0; self.dimension];
        for word in tokens(text) {
            vector[self.bucket(&format!("w:{word}"))] += WORD_WEIGHT;
            let padded: Vec<char> = format!("#{word}#").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                vector[self.bucket(&format!("t:{trigram}"))] += TRIGRAM_WEIGHT;
            }
        }
        Ok(vector)
    }

    fn model_name(&self) -> &str {
        "lexical-trigram"
    }
}

/// Lower-cased alphanumeric runs; `put-down`, `put_down`, and `put down` all
/// yield `put`, `down`.
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
