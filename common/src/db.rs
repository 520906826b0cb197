use crate::agent::normalizer::{convert_row, json_safe};
use crate::config::SqliteTarget;
use crate::error::{AskDbError, Result};
use crate::metadata::ColumnMeta;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;

static ILIKE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bILIKE\b").unwrap()
});

static NUMERIC_CAST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\w\.]+)::numeric\b").unwrap()
});

/// live database capability used by the tools
pub trait Database: Send + Sync {
    /// run one statement and render the rows as json text
    fn execute(&self, sql: &str, include_column_names: bool) -> Result<String>;

    /// declared columns of a table from the database's own catalog
    fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnMeta>>;
}

pub struct SqliteDatabase {
    conn: Mutex<Connection>,
}

impl SqliteDatabase {
    pub fn open(target: &SqliteTarget) -> Result<Self> {
        let conn = match target {
            SqliteTarget::Memory => Connection::open_in_memory()?,
            SqliteTarget::File(path) => {
                tracing::debug!("opening sqlite database at {}", path.display());
                Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_WRITE
                        | OpenFlags::SQLITE_OPEN_URI
                        | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )?
            }
        };
        Ok(Self::from_connection(conn))
    }

    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// run a batch of statements, used to seed data
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.lock().execute_batch(sql)?;
        Ok(())
    }
}

/// rewrite the postgres-flavoured output of the query pipeline into sqlite syntax
///
/// sqlite's LIKE is already case-insensitive for ascii, and `::` casts do not exist.
pub fn adapt_for_sqlite(sql: &str) -> String {
    let sql = ILIKE_REGEX.replace_all(sql, "LIKE");
    NUMERIC_CAST_REGEX
        .replace_all(&sql, "CAST($1 AS NUMERIC)")
        .into_owned()
}

impl Database for SqliteDatabase {
    #[tracing::instrument(skip(self, sql), fields(sql_len = sql.len()))]
    fn execute(&self, sql: &str, include_column_names: bool) -> Result<String> {
        let sql = adapt_for_sqlite(sql);
        let conn = self.conn.lock();

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| AskDbError::SqlExecution(e.to_string()))?;

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let column_count = columns.len();

        let mut rows = stmt
            .query([])
            .map_err(|e| AskDbError::SqlExecution(e.to_string()))?;

        let mut rendered = Vec::new();
        while let Some(row) = rows
            .next()
            .map_err(|e| AskDbError::SqlExecution(e.to_string()))?
        {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(json_safe(row.get_ref(index)?));
            }

            rendered.push(if include_column_names {
                Value::Object(convert_row(&columns, values))
            } else {
                Value::Array(values)
            });
        }

        tracing::debug!(rows = rendered.len(), "statement executed");
        Ok(serde_json::to_string(&rendered)?)
    }

    fn table_columns(&self, table_name: &str) -> Result<Vec<ColumnMeta>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT name, type FROM pragma_table_info(?1)")?;

        let columns = stmt
            .query_map([table_name], |row| {
                let data_type: String = row.get(1)?;
                Ok(ColumnMeta {
                    column_name: row.get(0)?,
                    data_type: if data_type.is_empty() {
                        "TEXT".to_string()
                    } else {
                        data_type
                    },
                    description: String::new(),
                    example: None,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(columns)
    }
}
