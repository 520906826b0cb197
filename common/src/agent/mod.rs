pub mod parser;
pub mod normalizer;

pub use parser::{parse_list, parse_sql_query, parse_think_block, parse_xml_to_markdown};
pub use normalizer::{convert_row, enforce_ilike, json_safe};
