//! Embedding backend that shells out to a local command.
//!
//! The command receives the text on stdin and must print a JSON array of
//! numbers on stdout. This keeps heavyweight models (for example a
//! sentence-transformers script) out of process and provider-agnostic.
use super::{Embedder, Embedding};
use anyhow::{anyhow, Context, Result};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

pub struct CommandEmbedder {
    argv: Vec<String>,
    label: String,
}

impl CommandEmbedder {
    pub fn new(command: &str) -> Result<Self> {
        let argv =
            shell_words::split(command).with_context(|| format!("parse embed command: {command}"))?;
        if argv.is_empty() {
            return Err(anyhow!("embed command is empty"));
        }
        Ok(Self {
            label: argv[0].clone(),
            argv,
        })
    }
}

impl Embedder for CommandEmbedder {
    fn embed(&self, text: &str) -> Result<Embedding> {
        let start = Instant::now();
        let mut child = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn embed command: {}", self.argv[0]))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .context("write text to embed stdin")?;
        }

        let output = child.wait_with_output().context("wait for embed command")?;
        tracing::debug!(
            elapsed_ms = start.elapsed().as_millis(),
            text_bytes = text.len(),
            response_bytes = output.stdout.len(),
            "embed command complete"
        );

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "embed command failed with status {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        serde_json::from_slice(&output.stdout).context("parse embed command output as JSON array")
    }

    fn model_name(&self) -> &str {
        &self.label
    }
}
