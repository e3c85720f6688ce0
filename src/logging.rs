use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

const LOG_DIR: &str = ".texttools";
const LOG_FILE: &str = "change_log.jsonl";
const MAX_ENTRIES: usize = 500;

/// One applied change. Appended as a JSON line; the log keeps only the
/// most recent entries so it never grows without bound.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    pub timestamp: String,
    pub command: String,
    pub path: PathBuf,
    pub detail: String,
}

pub fn record_change(command: &str, path: &Path, detail: &str) -> Result<()> {
    let log_path = ensure_log_file()?;
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".into());
    let entry = ChangeLogEntry {
        timestamp,
        command: command.to_string(),
        path: path.to_path_buf(),
        detail: detail.to_string(),
    };
    let json = serde_json::to_string(&entry)?;
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
        .with_context(|| format!("opening {log_path:?}"))?;
    writeln!(file, "{json}")?;
    truncate_log(&log_path)?;
    Ok(())
}

/// The most recent `limit` entries, oldest first. An absent log file is
/// an empty history, not an error.
pub fn read_tail(limit: usize) -> Result<Vec<ChangeLogEntry>> {
    let log_path = PathBuf::from(LOG_DIR).join(LOG_FILE);
    if !log_path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(&log_path).with_context(|| format!("reading {log_path:?}"))?;
    let reader = BufReader::new(file);
    let lines: Vec<String> = reader.lines().collect::<Result<_, _>>()?;
    let start = lines.len().saturating_sub(limit);
    let mut entries = Vec::with_capacity(lines.len() - start);
    for line in &lines[start..] {
        if line.trim().is_empty() {
            continue;
        }
        let entry: ChangeLogEntry =
            serde_json::from_str(line).with_context(|| format!("malformed log line: {line}"))?;
        entries.push(entry);
    }
    Ok(entries)
}

fn ensure_log_file() -> Result<PathBuf> {
    let dir = PathBuf::from(LOG_DIR);
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("creating {dir:?}"))?;
    }
    Ok(dir.join(LOG_FILE))
}

fn truncate_log(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .open(path)
        .with_context(|| format!("reading {path:?}"))?;
    let reader = BufReader::new(file);
    let lines: Vec<_> = reader.lines().collect::<Result<_, _>>()?;
    if lines.len() <= MAX_ENTRIES {
        return Ok(());
    }
    let keep = &lines[lines.len() - MAX_ENTRIES..];
    fs::write(path, keep.join("\n") + "\n")?;
    Ok(())
}
