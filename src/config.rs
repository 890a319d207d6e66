//! Evaluation configuration.
//!
//! A single JSON file selects the matcher and the embedding backend. The file
//! is optional: when none is found the offline defaults apply, so a fresh
//! checkout can match and evaluate plans without network access.
use crate::matcher::MatcherKind;
use crate::similarity::LexicalEmbedder;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_ENV: &str = "PEVAL_CONFIG";
pub const EMBED_COMMAND_ENV: &str = "PEVAL_EMBED_COMMAND";
const CONFIG_DIR_NAME: &str = "plan-eval";
const CONFIG_FILE_NAME: &str = "config.json";

fn default_dimension() -> usize {
    LexicalEmbedder::default().dimension()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_cache_size() -> usize {
    10_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EvalConfig {
    pub schema_version: u32,
    pub matcher: MatcherKind,
    pub embedder: EmbedderConfig,
    /// Upper bound on cached embeddings per scorer.
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "backend", rename_all = "snake_case", deny_unknown_fields)]
pub enum EmbedderConfig {
    /// Hashed word and trigram features; deterministic and offline.
    Lexical {
        #[serde(default = "default_dimension")]
        dimension: usize,
    },
    /// OpenAI-compatible `/embeddings` endpoint.
    Http {
        endpoint: String,
        model: String,
        /// Environment variable holding the bearer token.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        api_key_env: Option<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
    },
    /// Local program reading text on stdin and printing a JSON vector.
    Command { command: String },
}

/// Backend choice from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EmbedderChoice {
    Lexical,
    Http,
    Command,
}

/// Where the active config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Flag(PathBuf),
    Env(PathBuf),
    UserDir(PathBuf),
    Defaults,
}

pub fn default_config() -> EvalConfig {
    EvalConfig {
        schema_version: CONFIG_SCHEMA_VERSION,
        matcher: MatcherKind::GreedyAction,
        embedder: EmbedderConfig::Lexical {
            dimension: default_dimension(),
        },
        cache_size: default_cache_size(),
    }
}

/// Pretty JSON of the defaults, suitable as a starting config file.
pub fn config_stub() -> String {
    serde_json::to_string_pretty(&default_config()).expect("serialize config stub")
}

pub fn load_config(path: &Path) -> Result<EvalConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: EvalConfig = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse config JSON {}", path.display()))?;
    Ok(config)
}

/// Resolve the active config: explicit path, then `$PEVAL_CONFIG`, then the
/// user config dir, then defaults. `$PEVAL_EMBED_COMMAND` replaces the
/// embedder of whichever config wins.
pub fn resolve_config(explicit: Option<&Path>) -> Result<(EvalConfig, ConfigSource)> {
    let env_path = std::env::var_os(CONFIG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from);
    let user_path = dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .filter(|path| path.is_file());
    let embed_command = std::env::var(EMBED_COMMAND_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty());
    resolve_config_from(explicit, env_path, user_path, embed_command)
}

fn resolve_config_from(
    explicit: Option<&Path>,
    env_path: Option<PathBuf>,
    user_path: Option<PathBuf>,
    embed_command: Option<String>,
) -> Result<(EvalConfig, ConfigSource)> {
    let source = match (explicit, env_path, user_path) {
        (Some(path), _, _) => ConfigSource::Flag(path.to_path_buf()),
        (None, Some(path), _) => ConfigSource::Env(path),
        (None, None, Some(path)) => ConfigSource::UserDir(path),
        (None, None, None) => ConfigSource::Defaults,
    };
    let mut config = match &source {
        ConfigSource::Flag(path) | ConfigSource::Env(path) | ConfigSource::UserDir(path) => {
            load_config(path)?
        }
        ConfigSource::Defaults => default_config(),
    };
    if let Some(command) = embed_command {
        tracing::debug!(env = EMBED_COMMAND_ENV, "embedder overridden from environment");
        config.embedder = EmbedderConfig::Command { command };
    }
    Ok((config, source))
}

/// Switch the embedder backend from the command line. Settings are kept
/// when the config already uses that backend.
pub fn apply_embedder_choice(config: &mut EvalConfig, choice: EmbedderChoice) -> Result<()> {
    config.embedder = match (choice, &config.embedder) {
        (EmbedderChoice::Lexical, EmbedderConfig::Lexical { .. })
        | (EmbedderChoice::Http, EmbedderConfig::Http { .. })
        | (EmbedderChoice::Command, EmbedderConfig::Command { .. }) => return Ok(()),
        (EmbedderChoice::Lexical, _) => EmbedderConfig::Lexical {
            dimension: default_dimension(),
        },
        (EmbedderChoice::Command, _) => {
            return Err(anyhow!(
                "--embedder command needs a command in the config or ${EMBED_COMMAND_ENV}"
            ))
        }
        (EmbedderChoice::Http, _) => {
            return Err(anyhow!(
                "--embedder http needs endpoint and model in the config file"
            ))
        }
    };
    Ok(())
}

pub fn validate_config(config: &EvalConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    match &config.embedder {
        EmbedderConfig::Lexical { dimension } => {
            if *dimension == 0 {
                return Err(anyhow!("lexical dimension must be positive"));
            }
        }
        EmbedderConfig::Http {
            endpoint,
            model,
            timeout_secs,
            ..
        } => {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(anyhow!(
                    "embedder endpoint must be an http(s) URL (got {endpoint:?})"
                ));
            }
            if model.trim().is_empty() {
                return Err(anyhow!("embedder model must be non-empty"));
            }
            if *timeout_secs == 0 {
                return Err(anyhow!("embedder timeout_secs must be positive"));
            }
        }
        EmbedderConfig::Command { command } => {
            let argv = shell_words::split(command)
                .with_context(|| format!("parse embed command: {command}"))?;
            let program = argv
                .first()
                .ok_or_else(|| anyhow!("embed command is empty"))?;
            which::which(program)
                .with_context(|| format!("embed command {program:?} not found on PATH"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
