//! The three agent-facing tools: rank tables, outline a table schema, run sql.
//!
//! Each tool takes and returns plain text so it can sit behind any tool-calling
//! transport. The only shared state is the database handle, opened on first use.

use crate::agent::normalizer::enforce_ilike;
use crate::agent::parser::parse_sql_query;
use crate::config::Settings;
use crate::db::{Database, SqliteDatabase};
use crate::error::{AskDbError, Result};
use crate::interaction_log::{InteractionLog, InteractionType, LogMessage};
use crate::metadata::{CandidateTable, ColumnMeta, MetadataStore};
use crate::rerank::SimpleReranker;
use once_cell::sync::OnceCell;
use std::sync::Arc;

pub const RANK_TABLES_TOOL: &str = "rank_metadata_tables";
pub const OUTLINE_SCHEMA_TOOL: &str = "outline_table_schema";
pub const RUN_SQL_TOOL: &str = "run_demo_sql";

/// name, description and argument of a tool as advertised to the calling agent
#[derive(Debug, Clone, Copy)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub argument: &'static str,
}

pub const TOOL_SPECS: [ToolSpec; 3] = [
    ToolSpec {
        name: RANK_TABLES_TOOL,
        description: "Identify and rank database tables that relate to the user question. \
                      Always call this tool before querying table schemas or executing SQL.",
        argument: "query",
    },
    ToolSpec {
        name: OUTLINE_SCHEMA_TOOL,
        description: "Return a DDL-style description of a table using metadata and live PRAGMA data. \
                      Use this after selecting a table to understand its columns before generating SQL.",
        argument: "table_name",
    },
    ToolSpec {
        name: RUN_SQL_TOOL,
        description: "Execute SQL statements against the demo database. \
                      The tool parses <sql> blocks, normalises simple equality filters, and returns the JSON result.",
        argument: "sql_query",
    },
];

type Connector = Box<dyn Fn() -> Result<Arc<dyn Database>> + Send + Sync>;

/// context shared by every tool invocation
pub struct SqlAgent {
    metadata: MetadataStore,
    reranker: SimpleReranker,
    log: InteractionLog,
    connector: Connector,
    db: OnceCell<Arc<dyn Database>>,
}

impl SqlAgent {
    /// agent backed by the sqlite database named in `settings`
    pub fn new(settings: &Settings) -> Result<Self> {
        let target = settings.sqlite_target()?;
        let connection_string = settings.connection_string.clone();

        Ok(Self::with_connector(settings, move || {
            tracing::debug!("initialising sqlite connection to {}", connection_string);
            let db: Arc<dyn Database> = Arc::new(SqliteDatabase::open(&target)?);
            Ok(db)
        }))
    }

    /// agent with a custom database factory, called at most once
    pub fn with_connector<F>(settings: &Settings, connector: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn Database>> + Send + Sync + 'static,
    {
        Self {
            metadata: MetadataStore::new(&settings.metadata_dir, &settings.client),
            reranker: SimpleReranker::new(settings.top_n),
            log: InteractionLog::new(&settings.log_dir),
            connector: Box::new(connector),
            db: OnceCell::new(),
        }
    }

    /// the shared database handle, opening it on first use
    pub fn database(&self) -> Result<&Arc<dyn Database>> {
        self.db.get_or_try_init(|| (self.connector)())
    }

    /// rank every table in the client's metadata against `query`
    #[tracing::instrument(skip(self))]
    pub fn rank_metadata_tables(&self, query: &str) -> Result<String> {
        let tables = self.metadata.load()?;
        let ranked = self.reranker.rerank_tables(query, tables);

        let formatted = ranked
            .iter()
            .map(format_table_entry)
            .collect::<Vec<_>>()
            .join("\n---\n");

        tracing::info!("Ranked tables:\n{}", formatted);

        let ranked_names = ranked
            .iter()
            .map(|table| table.table_name.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        self.log.record(
            InteractionType::TableSelector,
            vec![LogMessage::user(query), LogMessage::assistant(ranked_names.clone())],
            &ranked_names,
        );

        Ok(formatted)
    }

    /// ddl-style outline of one table; an unknown table is reported as text
    #[tracing::instrument(skip(self))]
    pub fn outline_table_schema(&self, table_name: &str) -> Result<String> {
        match self.describe_table(table_name) {
            Err(AskDbError::TableNotFound(name)) => {
                tracing::warn!("table {} requested but not in metadata", name);
                Ok(AskDbError::TableNotFound(name).to_string())
            }
            other => other,
        }
    }

    fn describe_table(&self, table_name: &str) -> Result<String> {
        let tables = self.metadata.load()?;
        let table = tables
            .into_iter()
            .find(|table| table.table_name == table_name)
            .ok_or_else(|| AskDbError::TableNotFound(table_name.to_string()))?;

        let columns = if table.table_metadata.is_empty() {
            self.database()?.table_columns(table_name)?
        } else {
            table.table_metadata
        };

        let ddl = format_ddl(table_name, &columns);
        tracing::info!("DDL for {}:\n{}", table_name, ddl);
        Ok(ddl)
    }

    /// extract, normalise and execute sql from model output; errors come back as text
    #[tracing::instrument(skip(self, sql_query), fields(input_len = sql_query.len()))]
    pub fn run_demo_sql(&self, sql_query: &str) -> String {
        let result = match self.execute_model_sql(sql_query) {
            Ok(rows) => {
                tracing::info!("SQL execution result: {}", rows);
                rows
            }
            Err(e) => {
                tracing::error!("Error executing SQL: {}", e);
                format!("Error executing SQL query: {}", e)
            }
        };

        self.log.record(
            InteractionType::SqlQueryGeneration,
            vec![LogMessage::user(sql_query)],
            &result,
        );

        result
    }

    fn execute_model_sql(&self, sql_query: &str) -> Result<String> {
        let parsed = parse_sql_query(sql_query);
        tracing::info!("Parsed SQL:\n{}", parsed);

        let normalized = enforce_ilike(&parsed);
        tracing::info!("Normalised SQL:\n{}", normalized);

        self.database()?.execute(&normalized, true)
    }

    /// dispatch a tool by name with its single text argument
    pub fn call_tool(&self, name: &str, argument: &str) -> Result<String> {
        match name {
            RANK_TABLES_TOOL => self.rank_metadata_tables(argument),
            OUTLINE_SCHEMA_TOOL => self.outline_table_schema(argument),
            RUN_SQL_TOOL => Ok(self.run_demo_sql(argument)),
            other => Err(AskDbError::Protocol(format!("unknown tool: {}", other))),
        }
    }
}

fn format_table_entry(table: &CandidateTable) -> String {
    format!(
        "- Table Name: {}\n- Table Description: {}\n- Example Use Case: {}",
        table.table_name,
        table.table_description.trim(),
        table.use_case.trim()
    )
}

fn format_column_line(column: &ColumnMeta) -> String {
    let mut line = format!(
        "    {} {} -- {}",
        column.column_name.trim(),
        column.data_type,
        column.description.trim()
    );
    if let Some(example) = column.example.as_deref().filter(|e| !e.is_empty()) {
        line.push_str(&format!(" Example: {}.", example));
    }
    line
}

pub fn format_ddl(table_name: &str, columns: &[ColumnMeta]) -> String {
    let body = columns
        .iter()
        .map(format_column_line)
        .collect::<Vec<_>>()
        .join("\n");
    format!("CREATE TABLE {} (\n{}\n)", table_name, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeDatabase;

    impl Database for FakeDatabase {
        fn execute(&self, sql: &str, _include_column_names: bool) -> Result<String> {
            Ok(format!("ran: {}", sql))
        }

        fn table_columns(&self, _table_name: &str) -> Result<Vec<ColumnMeta>> {
            Ok(vec![ColumnMeta {
                column_name: "id".to_string(),
                data_type: "INTEGER".to_string(),
                description: String::new(),
                example: None,
            }])
        }
    }

    fn settings(dir: &std::path::Path) -> Settings {
        Settings::new(dir, "demo".to_string(), "sqlite::memory:".to_string(), 5).unwrap()
    }

    #[test]
    fn test_format_column_line_with_example() {
        let column = ColumnMeta {
            column_name: " year ".to_string(),
            data_type: "INTEGER".to_string(),
            description: "Reporting year. ".to_string(),
            example: Some("2021".to_string()),
        };
        assert_eq!(format_column_line(&column), "    year INTEGER -- Reporting year. Example: 2021.");
    }

    #[test]
    fn test_format_ddl_without_examples() {
        let columns = vec![
            ColumnMeta {
                column_name: "a".to_string(),
                data_type: "TEXT".to_string(),
                description: String::new(),
                example: Some(String::new()),
            },
            ColumnMeta {
                column_name: "b".to_string(),
                data_type: "REAL".to_string(),
                description: "ratio".to_string(),
                example: None,
            },
        ];
        assert_eq!(
            format_ddl("t", &columns),
            "CREATE TABLE t (\n    a TEXT -- \n    b REAL -- ratio\n)"
        );
    }

    #[test]
    fn test_database_initialised_once() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let agent = SqlAgent::with_connector(&settings(dir.path()), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let db: Arc<dyn Database> = Arc::new(FakeDatabase);
            Ok(db)
        });

        agent.run_demo_sql("SELECT 1");
        agent.run_demo_sql("SELECT 2");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_run_demo_sql_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let agent = SqlAgent::with_connector(&settings(dir.path()), || {
            let db: Arc<dyn Database> = Arc::new(FakeDatabase);
            Ok(db)
        });

        let out = agent.run_demo_sql("<sql>SELECT ROUND(depth, 1) FROM wells WHERE status = 'Shut-in'</sql>");
        assert_eq!(
            out,
            "ran: SELECT ROUND(depth::numeric, 1) FROM wells WHERE REPLACE(REPLACE(status, ' ', '_'), '-', '_') ILIKE '%Shut_in%'"
        );
    }

    #[test]
    fn test_run_demo_sql_connection_failure_is_text() {
        let dir = tempfile::tempdir().unwrap();
        let agent = SqlAgent::with_connector(&settings(dir.path()), || {
            Err(AskDbError::Config("no database".to_string()))
        });

        let out = agent.run_demo_sql("SELECT 1");
        assert_eq!(out, "Error executing SQL query: configuration error: no database");
    }

    #[test]
    fn test_missing_metadata_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let agent = SqlAgent::with_connector(&settings(dir.path()), || {
            let db: Arc<dyn Database> = Arc::new(FakeDatabase);
            Ok(db)
        });

        assert!(matches!(
            agent.rank_metadata_tables("anything"),
            Err(AskDbError::MetadataNotFound(_))
        ));
        assert!(matches!(
            agent.outline_table_schema("wells"),
            Err(AskDbError::MetadataNotFound(_))
        ));
    }

    #[test]
    fn test_call_tool_unknown_name() {
        let dir = tempfile::tempdir().unwrap();
        let agent = SqlAgent::with_connector(&settings(dir.path()), || {
            let db: Arc<dyn Database> = Arc::new(FakeDatabase);
            Ok(db)
        });
        assert!(matches!(agent.call_tool("drop_everything", ""), Err(AskDbError::Protocol(_))));
    }
}
