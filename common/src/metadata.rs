use crate::error::{AskDbError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// one column of a described table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub column_name: String,
    #[serde(default = "default_data_type")]
    pub data_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "example_as_text", skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

/// a table the agent may query, as described by the metadata store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTable {
    pub table_name: String,
    #[serde(default)]
    pub table_description: String,
    #[serde(default)]
    pub use_case: String,
    #[serde(default)]
    pub table_metadata: Vec<ColumnMeta>,
}

fn default_data_type() -> String {
    "TEXT".to_string()
}

fn example_as_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// per-client table catalog stored as `metadata-<client>.json`
#[derive(Debug, Clone)]
pub struct MetadataStore {
    metadata_dir: PathBuf,
    client: String,
}

impl MetadataStore {
    pub fn new(metadata_dir: impl Into<PathBuf>, client: impl Into<String>) -> Self {
        Self {
            metadata_dir: metadata_dir.into(),
            client: client.into(),
        }
    }

    pub fn path(&self) -> PathBuf {
        metadata_path(&self.metadata_dir, &self.client)
    }

    /// load and validate every table descriptor for the client
    pub fn load(&self) -> Result<Vec<CandidateTable>> {
        let path = self.path();
        if !path.exists() {
            return Err(AskDbError::MetadataNotFound(path));
        }

        let text = std::fs::read_to_string(&path)?;
        let tables = parse_metadata(&text)?;

        tracing::debug!(
            client = %self.client,
            tables = tables.len(),
            "loaded metadata from {}",
            path.display()
        );

        Ok(tables)
    }
}

pub fn metadata_path(metadata_dir: &Path, client: &str) -> PathBuf {
    metadata_dir.join(format!("metadata-{}.json", client))
}

/// parse a metadata document, rejecting duplicate or empty table names
pub fn parse_metadata(text: &str) -> Result<Vec<CandidateTable>> {
    let tables: Vec<CandidateTable> = serde_json::from_str(text)
        .map_err(|e| AskDbError::InvalidMetadata(e.to_string()))?;

    let mut seen = HashSet::new();
    for table in &tables {
        if table.table_name.trim().is_empty() {
            return Err(AskDbError::InvalidMetadata(
                "table_name must not be empty".to_string(),
            ));
        }
        if !seen.insert(table.table_name.as_str()) {
            return Err(AskDbError::InvalidMetadata(format!(
                "duplicate table_name: {}",
                table.table_name
            )));
        }
    }

    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_metadata_defaults() {
        let text = json!([
            {"table_name": "wells"},
            {
                "table_name": "production",
                "table_description": "yearly output",
                "use_case": "totals",
                "table_metadata": [
                    {"column_name": "year", "data_type": "INTEGER", "description": "year", "example": 2021},
                    {"column_name": "well_name"}
                ]
            }
        ])
        .to_string();

        let tables = parse_metadata(&text).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].table_description, "");
        assert!(tables[0].table_metadata.is_empty());

        let columns = &tables[1].table_metadata;
        assert_eq!(columns[0].example.as_deref(), Some("2021"));
        assert_eq!(columns[1].data_type, "TEXT");
        assert_eq!(columns[1].description, "");
        assert_eq!(columns[1].example, None);
    }

    #[test]
    fn test_parse_metadata_rejects_duplicates() {
        let text = json!([{"table_name": "wells"}, {"table_name": "wells"}]).to_string();
        let err = parse_metadata(&text).unwrap_err();
        assert!(matches!(err, AskDbError::InvalidMetadata(_)));
    }

    #[test]
    fn test_parse_metadata_rejects_missing_name() {
        let text = json!([{"table_description": "no name"}]).to_string();
        assert!(matches!(
            parse_metadata(&text),
            Err(AskDbError::InvalidMetadata(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path(), "nobody");
        match store.load() {
            Err(AskDbError::MetadataNotFound(path)) => {
                assert!(path.ends_with("metadata-nobody.json"));
            }
            other => panic!("expected MetadataNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::new(dir.path(), "demo");
        std::fs::write(store.path(), r#"[{"table_name": "operators"}]"#).unwrap();
        let tables = store.load().unwrap();
        assert_eq!(tables[0].table_name, "operators");
    }
}
