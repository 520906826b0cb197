pub mod matcher;
pub mod reranker;

pub use matcher::SequenceMatcher;
pub use reranker::{reorder_by_rank, ScoredTable, SimpleReranker, DEFAULT_TOP_N};
