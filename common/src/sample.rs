//! Self-contained oil and gas dataset for trying the tools without external infrastructure.

use crate::error::Result;
use crate::metadata::{metadata_path, CandidateTable, ColumnMeta};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

const SCHEMA: &str = "
DROP TABLE IF EXISTS production;
DROP TABLE IF EXISTS wells;
DROP TABLE IF EXISTS operators;

CREATE TABLE wells (
    well_name TEXT PRIMARY KEY,
    location TEXT NOT NULL,
    operator TEXT NOT NULL,
    basin TEXT NOT NULL,
    status TEXT NOT NULL,
    spud_date DATE NOT NULL,
    total_depth_ft INTEGER NOT NULL
);

CREATE TABLE production (
    well_name TEXT NOT NULL,
    year INTEGER NOT NULL,
    oil_bbl INTEGER,
    gas_mcf INTEGER,
    FOREIGN KEY (well_name) REFERENCES wells (well_name)
);

CREATE TABLE operators (
    operator TEXT PRIMARY KEY,
    headquarters TEXT NOT NULL,
    founded_year INTEGER,
    capabilities TEXT
);
";

const WELLS: [(&str, &str, &str, &str, &str, &str, i64); 4] = [
    ("Andalas-1", "Aceh, Indonesia", "Nusantara Energy", "Sumatra Basin", "Producing", "2017-05-12", 8400),
    ("Merah Putih-2", "East Kalimantan, Indonesia", "Garuda Oil", "Kutei Basin", "Drilling", "2021-09-30", 10250),
    ("Cendrawasih-Deep", "West Papua, Indonesia", "Papua Exploration", "Bintuni Basin", "Appraisal", "2019-03-20", 12100),
    ("Rajawali-Alpha", "Java Sea, Indonesia", "Samudra Offshore", "North West Java Basin", "Shut-in", "2015-11-02", 9750),
];

const PRODUCTION: [(&str, i64, i64, i64); 4] = [
    ("Andalas-1", 2021, 1_250_000, 780_000),
    ("Andalas-1", 2022, 1_180_000, 730_000),
    ("Merah Putih-2", 2022, 540_000, 260_000),
    ("Cendrawasih-Deep", 2020, 780_000, 410_000),
];

const OPERATORS: [(&str, &str, i64, &str); 4] = [
    ("Nusantara Energy", "Indonesia", 1998, "Upstream and midstream operations"),
    ("Garuda Oil", "Indonesia", 2005, "Offshore development projects"),
    ("Papua Exploration", "Indonesia", 2012, "Frontier exploration"),
    ("Samudra Offshore", "Singapore", 2001, "Offshore drilling services"),
];

/// drop and recreate the sample tables at `db_path`
pub fn create_sample_db(db_path: &Path) -> Result<()> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut conn = Connection::open(db_path)?;
    seed(&mut conn)?;

    tracing::info!("sample database created at {}", db_path.display());
    Ok(())
}

/// load the sample schema and rows into an open connection
pub fn seed(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let tx = conn.transaction()?;
    {
        let mut insert = tx.prepare("INSERT INTO wells VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)")?;
        for (name, location, operator, basin, status, spud_date, depth) in WELLS {
            insert.execute(params![name, location, operator, basin, status, spud_date, depth])?;
        }

        let mut insert = tx.prepare("INSERT INTO production VALUES (?1, ?2, ?3, ?4)")?;
        for (name, year, oil, gas) in PRODUCTION {
            insert.execute(params![name, year, oil, gas])?;
        }

        let mut insert = tx.prepare("INSERT INTO operators VALUES (?1, ?2, ?3, ?4)")?;
        for (operator, headquarters, founded, capabilities) in OPERATORS {
            insert.execute(params![operator, headquarters, founded, capabilities])?;
        }
    }
    tx.commit()?;

    Ok(())
}

fn column(name: &str, data_type: &str, description: &str, example: Option<&str>) -> ColumnMeta {
    ColumnMeta {
        column_name: name.to_string(),
        data_type: data_type.to_string(),
        description: description.to_string(),
        example: example.map(str::to_string),
    }
}

/// table catalog matching the sample database
///
/// `wells` and `operators` carry no column metadata so their schema comes from the database.
pub fn sample_metadata() -> Vec<CandidateTable> {
    vec![
        CandidateTable {
            table_name: "wells".to_string(),
            table_description: "Well header records: one row per oil and gas well with location, \
                                operator, basin, status, spud date and total depth."
                .to_string(),
            use_case: "Find wells by basin, operator or status.".to_string(),
            table_metadata: Vec::new(),
        },
        CandidateTable {
            table_name: "production".to_string(),
            table_description: "Annual oil and gas production volumes reported by well.".to_string(),
            use_case: "Total or compare oil and gas output per well and year.".to_string(),
            table_metadata: vec![
                column("well_name", "TEXT", "Well the volumes were reported for.", Some("Andalas-1")),
                column("year", "INTEGER", "Reporting year.", Some("2021")),
                column("oil_bbl", "INTEGER", "Oil produced in barrels.", Some("1250000")),
                column("gas_mcf", "INTEGER", "Gas produced in thousand cubic feet.", None),
            ],
        },
        CandidateTable {
            table_name: "operators".to_string(),
            table_description: "Registry of operating companies with headquarters, founding year \
                                and capabilities."
                .to_string(),
            use_case: "Look up who operates a well and where they are based.".to_string(),
            table_metadata: Vec::new(),
        },
    ]
}

/// write `metadata-<client>.json` for the sample database and return its path
pub fn write_sample_metadata(metadata_dir: &Path, client: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(metadata_dir)?;
    let path = metadata_path(metadata_dir, client);
    std::fs::write(&path, serde_json::to_string_pretty(&sample_metadata())?)?;

    tracing::info!("sample metadata written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::MetadataStore;

    #[test]
    fn test_seed_row_counts() {
        let mut conn = Connection::open_in_memory().unwrap();
        seed(&mut conn).unwrap();

        for (table, expected) in [("wells", 4), ("production", 4), ("operators", 4)] {
            let count: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
                .unwrap();
            assert_eq!(count, expected, "row count for {}", table);
        }
    }

    #[test]
    fn test_seed_is_repeatable() {
        let mut conn = Connection::open_in_memory().unwrap();
        seed(&mut conn).unwrap();
        seed(&mut conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM wells", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 4);
    }

    #[test]
    fn test_sample_metadata_round_trips_through_store() {
        let dir = tempfile::tempdir().unwrap();
        write_sample_metadata(dir.path(), "demo").unwrap();
        let tables = MetadataStore::new(dir.path(), "demo").load().unwrap();
        assert_eq!(tables, sample_metadata());
    }
}
