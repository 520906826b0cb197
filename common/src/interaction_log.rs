use crate::error::Result;
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "demo-log.jsonl";

// Asia/Jakarta, no daylight saving
const JAKARTA_OFFSET_SECS: i32 = 7 * 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    SqlQueryGeneration,
    TableSelector,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogMessage {
    pub role: String,
    pub content: String,
}

impl LogMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    #[serde(rename = "type")]
    pub kind: InteractionType,
    pub messages: Vec<LogMessage>,
    pub final_result: String,
    pub current_date: String,
}

/// format a date the way the interaction log records it, e.g. `05 March 2024`
pub fn format_current_date(now: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(JAKARTA_OFFSET_SECS) {
        Some(jakarta) => now.with_timezone(&jakarta).format("%d %B %Y").to_string(),
        None => now.format("%d %B %Y").to_string(),
    }
}

/// append-only jsonl sink for tool interactions
#[derive(Debug, Clone)]
pub struct InteractionLog {
    path: PathBuf,
}

impl InteractionLog {
    pub fn new(log_dir: &Path) -> Self {
        Self {
            path: log_dir.join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// write a record; failures are logged and swallowed
    pub fn record(&self, kind: InteractionType, messages: Vec<LogMessage>, final_result: &str) {
        let record = InteractionRecord {
            kind,
            messages,
            final_result: final_result.to_string(),
            current_date: format_current_date(Utc::now()),
        };

        match self.append(&record) {
            Ok(()) => tracing::debug!("logged interaction to {}", self.path.display()),
            Err(e) => tracing::warn!("failed to write interaction log {}: {}", self.path.display(), e),
        }
    }

    fn append(&self, record: &InteractionRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
