use anyhow::Result;
use clap::{Parser, Subcommand};
use common::config::Settings;
use common::sample::{create_sample_db, write_sample_metadata};
use common::SqlAgent;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "askdb")]
#[command(about = "text-to-sql tools for language model agents", long_about = None)]
pub struct Cli {
    /// Project root holding data/ and log/
    #[arg(long, global = true, env = "ASKDB_ROOT", default_value = ".")]
    root: PathBuf,

    /// Client whose metadata-<client>.json is used
    #[arg(long, global = true, env = "CLIENT")]
    client: Option<String>,

    /// Database connection string (sqlite:///path)
    #[arg(long, global = true, env = "CONNECTION_STRING")]
    connection_string: Option<String>,

    /// Number of tables the reranker keeps
    #[arg(long, global = true, env = "ASKDB_TOP_N")]
    top_n: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sample database and metadata
    Seed,

    /// Rank metadata tables against a question
    Rank {
        /// Natural-language question
        query: String,
    },

    /// Outline the schema of one table
    Describe {
        /// Table name as listed in the metadata
        table_name: String,
    },

    /// Extract, normalise and execute sql from model output
    RunSql {
        /// Model output containing a <sql> block or a bare statement
        sql_query: String,
    },

    /// Serve the tools as json-rpc over stdin/stdout
    Serve,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let settings = self.settings()?;

        match self.command {
            Commands::Seed => seed(&settings),
            Commands::Rank { query } => {
                let agent = SqlAgent::new(&settings)?;
                println!("{}", agent.rank_metadata_tables(&query)?);
                Ok(())
            }
            Commands::Describe { table_name } => {
                let agent = SqlAgent::new(&settings)?;
                println!("{}", agent.outline_table_schema(&table_name)?);
                Ok(())
            }
            Commands::RunSql { sql_query } => {
                let agent = SqlAgent::new(&settings)?;
                println!("{}", agent.run_demo_sql(&sql_query));
                Ok(())
            }
            Commands::Serve => {
                let agent = Arc::new(SqlAgent::new(&settings)?);
                crate::server::serve_stdio(agent).await
            }
        }
    }

    /// flags win over the environment, which wins over defaults
    fn settings(&self) -> Result<Settings> {
        let base = Settings::load(&self.root)?;
        let settings = Settings::new(
            &self.root,
            self.client.clone().unwrap_or(base.client),
            self.connection_string
                .clone()
                .unwrap_or(base.connection_string),
            self.top_n.unwrap_or(base.top_n),
        )?;

        if settings.top_n == 0 {
            tracing::warn!("top_n is 0, ranking falls back to metadata order");
        }
        tracing::debug!(
            client = %settings.client,
            top_n = settings.top_n,
            "settings resolved"
        );
        Ok(settings)
    }
}

fn seed(settings: &Settings) -> Result<()> {
    let db_path = settings.metadata_dir.join("sample.db");
    create_sample_db(&db_path)?;
    let metadata_path = write_sample_metadata(&settings.metadata_dir, &settings.client)?;

    println!("sample database: {}", db_path.display());
    println!("sample metadata: {}", metadata_path.display());
    Ok(())
}
