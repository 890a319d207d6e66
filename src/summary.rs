//! Per-directory tallies of `*.results.json` records.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const RESULTS_SUFFIX: &str = ".results.json";
pub const SUMMARY_FILE_NAME: &str = "results_summary.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResultsSummary {
    pub total: usize,
    pub valid: usize,
    pub successful: usize,
    pub safe: usize,
}

/// Result flags as read back from disk. Missing flags count as false, and
/// fields written by other tools are ignored.
#[derive(Debug, Deserialize)]
struct RecordFlags {
    #[serde(default)]
    valid: bool,
    #[serde(default)]
    successful: Option<bool>,
    #[serde(default)]
    safe: Option<bool>,
}

fn is_results_file(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(RESULTS_SUFFIX))
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("read dir {}", dir.display()))?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("list {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}

/// Tally the result records directly inside `dir` and write
/// `results_summary.json` next to them.
pub fn summarize_dir(dir: &Path) -> Result<ResultsSummary> {
    let mut summary = ResultsSummary::default();
    for path in sorted_entries(dir)? {
        if !is_results_file(&path) {
            continue;
        }
        let bytes = fs::read(&path).with_context(|| format!("read {}", path.display()))?;
        let flags: RecordFlags = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse result record {}", path.display()))?;
        summary.total += 1;
        summary.valid += usize::from(flags.valid);
        summary.successful += usize::from(flags.successful.unwrap_or(false));
        summary.safe += usize::from(flags.safe.unwrap_or(false));
    }

    let out = dir.join(SUMMARY_FILE_NAME);
    let text = serde_json::to_string_pretty(&summary).context("serialize results summary")?;
    fs::write(&out, text.as_bytes()).with_context(|| format!("write {}", out.display()))?;
    tracing::info!(dir = %dir.display(), total = summary.total, "results summary written");
    Ok(summary)
}

/// Summarize every directory under `root` (inclusive) that holds at least
/// one result record. Returns the summarized directories in walk order.
pub fn find_and_summarize(root: &Path) -> Result<Vec<(PathBuf, ResultsSummary)>> {
    let mut summaries = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let entries = sorted_entries(&dir)?;
        if entries.iter().any(|path| is_results_file(path)) {
            let summary = summarize_dir(&dir)?;
            summaries.push((dir.clone(), summary));
        }
        pending.extend(entries.into_iter().filter(|path| path.is_dir()).rev());
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(path, contents.as_bytes()).expect("write file");
    }

    #[test]
    fn tallies_flags_per_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("t1.results.json"),
            r#"{"valid": true, "successful": true, "safe": false}"#,
        );
        write(&dir.path().join("t2.results.json"), r#"{"valid": false}"#);
        write(
            &dir.path().join("t3.results.json"),
            r#"{"valid": true, "successful": false, "safe": true}"#,
        );
        write(&dir.path().join("t1.pddl.closest"), "(noop)");

        let summary = summarize_dir(dir.path()).unwrap();
        assert_eq!(
            summary,
            ResultsSummary {
                total: 3,
                valid: 2,
                successful: 1,
                safe: 1,
            }
        );
        let written: ResultsSummary = serde_json::from_str(
            &fs::read_to_string(dir.path().join(SUMMARY_FILE_NAME)).unwrap(),
        )
        .unwrap();
        assert_eq!(written, summary);
    }

    #[test]
    fn walks_nested_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(
            &dir.path().join("gpt/evaluation/a.results.json"),
            r#"{"valid": true, "successful": true, "safe": true}"#,
        );
        write(
            &dir.path().join("llama/evaluation/b.results.json"),
            r#"{"valid": false}"#,
        );
        write(&dir.path().join("llama/notes.txt"), "x");

        let summaries = find_and_summarize(dir.path()).unwrap();
        let dirs: Vec<PathBuf> = summaries.iter().map(|(dir, _)| dir.clone()).collect();
        assert_eq!(
            dirs,
            vec![
                dir.path().join("gpt/evaluation"),
                dir.path().join("llama/evaluation"),
            ]
        );
        assert!(!dir.path().join("llama").join(SUMMARY_FILE_NAME).exists());
    }

    #[test]
    fn malformed_record_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(&dir.path().join("bad.results.json"), "{not json");
        assert!(summarize_dir(dir.path()).is_err());
    }
}
