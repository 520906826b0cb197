use crate::error::{AskDbError, Result};
use crate::rerank::DEFAULT_TOP_N;
use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_CLIENT: &str = "demo";
const DATA_DIR: &str = "data";
const LOG_DIR: &str = "log";
const SAMPLE_DB: &str = "sample.db";

/// where the service reads metadata and the database, and where it logs interactions
#[derive(Debug, Clone)]
pub struct Settings {
    pub client: String,
    pub connection_string: String,
    pub metadata_dir: PathBuf,
    pub log_dir: PathBuf,
    pub top_n: usize,
}

/// database location parsed from a connection string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    Memory,
    File(PathBuf),
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

impl Settings {
    /// resolve settings for a project root from the environment
    pub fn load(root: &Path) -> Result<Self> {
        let client = non_empty_var("CLIENT").unwrap_or_else(|| DEFAULT_CLIENT.to_string());

        let connection_string = non_empty_var("CONNECTION_STRING")
            .or_else(|| non_empty_var("CONNECTION_STRING_LEGACY"))
            .unwrap_or_else(|| default_connection_string(root));

        let top_n = match non_empty_var("ASKDB_TOP_N") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                AskDbError::Config(format!("ASKDB_TOP_N must be a positive integer, got {:?}: {}", raw, e))
            })?,
            None => DEFAULT_TOP_N,
        };

        Self::new(root, client, connection_string, top_n)
    }

    /// build settings with explicit values, creating the log directory
    pub fn new(root: &Path, client: String, connection_string: String, top_n: usize) -> Result<Self> {
        let metadata_dir = root.join(DATA_DIR);
        let log_dir = root.join(LOG_DIR);
        std::fs::create_dir_all(&log_dir)?;

        Ok(Self {
            client,
            connection_string,
            metadata_dir,
            log_dir,
            top_n,
        })
    }

    pub fn sqlite_target(&self) -> Result<SqliteTarget> {
        parse_connection_string(&self.connection_string)
    }
}

pub fn default_connection_string(root: &Path) -> String {
    create_sqlite_connection_string(&root.join(DATA_DIR).join(SAMPLE_DB))
}

pub fn create_sqlite_connection_string(db_path: &Path) -> String {
    format!("sqlite:///{}", db_path.display())
}

/// accept `sqlite:///path`, `sqlite://path` and the in-memory forms
pub fn parse_connection_string(connection: &str) -> Result<SqliteTarget> {
    let rest = connection
        .strip_prefix("sqlite:")
        .ok_or_else(|| {
            AskDbError::Config(format!("unsupported connection string: {}", connection))
        })?;

    if rest == ":memory:" || rest == "//:memory:" || rest == "///:memory:" {
        return Ok(SqliteTarget::Memory);
    }

    // sqlite:////abs/path keeps its leading slash, sqlite:///rel/path is relative
    let path = rest
        .strip_prefix("///")
        .or_else(|| rest.strip_prefix("//"))
        .ok_or_else(|| {
            AskDbError::Config(format!("malformed sqlite connection string: {}", connection))
        })?;

    if path.is_empty() {
        return Err(AskDbError::Config(format!(
            "sqlite connection string has no path: {}",
            connection
        )));
    }

    Ok(SqliteTarget::File(PathBuf::from(path)))
}
