use super::matcher::SequenceMatcher;
use crate::metadata::CandidateTable;
use std::collections::HashMap;

pub const DEFAULT_TOP_N: usize = 5;

/// a candidate table with its relevance score for one ranking call
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTable {
    pub table: CandidateTable,
    pub score: f64,
}

/// approximate reranking by lexical similarity of the query and table descriptions
#[derive(Debug, Clone)]
pub struct SimpleReranker {
    pub top_n: usize,
}

impl Default for SimpleReranker {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_N)
    }
}

impl SimpleReranker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    /// score every table, keep the `top_n` best; ties keep their input order
    pub fn compress(&self, tables: &[CandidateTable], query: &str) -> Vec<ScoredTable> {
        if tables.is_empty() {
            return Vec::new();
        }

        let query = query.to_lowercase();
        let mut scored: Vec<ScoredTable> = tables
            .iter()
            .map(|table| {
                let description = table.table_description.to_lowercase();
                ScoredTable {
                    table: table.clone(),
                    score: SequenceMatcher::new(&query, &description).ratio(),
                }
            })
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_n);
        scored
    }

    /// rank `tables` and return all of them, ranked ones first
    pub fn rerank_tables(&self, query: &str, tables: Vec<CandidateTable>) -> Vec<CandidateTable> {
        let ranked = self.compress(&tables, query);

        tracing::debug!(
            "Ranked table order: {}",
            ranked
                .iter()
                .map(|scored| format!("{} ({:.3})", scored.table.table_name, scored.score))
                .collect::<Vec<_>>()
                .join(", ")
        );

        reorder_by_rank(tables, &ranked)
    }
}

/// order the full list by position in `ranked`; unranked tables follow in their original order
pub fn reorder_by_rank(mut tables: Vec<CandidateTable>, ranked: &[ScoredTable]) -> Vec<CandidateTable> {
    let order: HashMap<&str, usize> = ranked
        .iter()
        .enumerate()
        .map(|(index, scored)| (scored.table.table_name.as_str(), index))
        .collect();

    tables.sort_by_key(|table| {
        order
            .get(table.table_name.as_str())
            .copied()
            .unwrap_or(order.len())
    });
    tables
}
