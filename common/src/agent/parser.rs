use crate::error::{AskDbError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SQL_BLOCK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<sql>\s*(?:```sql\s*)?(.*?)(?:\s*```)?\s*</sql>").unwrap()
});

// expression may not contain parentheses or commas, so nested calls are skipped
static ROUND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)ROUND\s*\(\s*([^(),]+)\s*,\s*(\d+)\s*\)").unwrap()
});

static THINK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<think>(.*?)</think>").unwrap()
});

static THINK_CLOSE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</think>\s*").unwrap()
});

static LIST_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\[[^\]]+\])").unwrap()
});

static OPEN_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<(\w+)>").unwrap()
});

const NUMERIC_CAST: &str = "::numeric";

/// extract a single sql statement from model output and repair it for postgres-style dialects
///
/// the first `<sql>` envelope wins; without one the whole text is treated as the statement.
/// never fails: unrecognised input passes through trimmed.
pub fn parse_sql_query(response: &str) -> String {
    let sql = SQL_BLOCK_REGEX
        .captures(response)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim())
        .unwrap_or_else(|| response.trim());

    // models often emit escapes as two literal characters
    let sql = sql.replace("\\n", "\n").replace("\\t", "\t");

    cast_round_arguments(&sql)
}

/// append a `::numeric` cast to the first argument of every `ROUND(expr, n)` call
pub fn cast_round_arguments(sql: &str) -> String {
    ROUND_REGEX
        .replace_all(sql, |caps: &Captures| {
            let expression = caps[1].trim();
            let precision = caps[2].trim();
            if expression.ends_with(NUMERIC_CAST) {
                format!("ROUND({}, {})", expression, precision)
            } else {
                format!("ROUND({}{}, {})", expression, NUMERIC_CAST, precision)
            }
        })
        .into_owned()
}

/// split a reasoning model response into its `<think>` block and the content after it
///
/// when `section` is given, `<section>` and `</section>` tags are removed from the content.
pub fn parse_think_block(response: &str, section: Option<&str>) -> Result<(String, String)> {
    let think = THINK_REGEX
        .captures(response)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| {
            AskDbError::MalformedModelOutput(
                "Invalid response format, please retry...".to_string(),
            )
        })?;

    let think_block = think.as_str().trim().to_string();

    let mut content = THINK_CLOSE_REGEX
        .splitn(response, 2)
        .last()
        .unwrap_or_default()
        .to_string();

    if let Some(section) = section {
        content = content
            .replace(&format!("<{}>", section), "")
            .replace(&format!("</{}>", section), "");
    }

    Ok((think_block, content.trim().to_string()))
}

/// parse the first bracketed list of strings in a response
///
/// accepts json arrays and single-quoted lists; anything else yields an empty list.
pub fn parse_list(response: &str) -> Vec<String> {
    let Some(captures) = LIST_REGEX.captures(response) else {
        return Vec::new();
    };
    let raw = &captures[1];

    if let Ok(items) = serde_json::from_str::<Vec<String>>(raw) {
        return items;
    }

    // single-quoted lists are common in model output
    let requoted = raw.replace('\'', "\"");
    match serde_json::from_str::<Vec<String>>(&requoted) {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!("failed to parse list from model output: {}", e);
            Vec::new()
        }
    }
}

/// render every `<tag>content</tag>` section as a markdown heading block
pub fn parse_xml_to_markdown(text: &str) -> String {
    let mut sections = Vec::new();
    let mut cursor = 0;

    while let Some(open) = OPEN_TAG_REGEX.captures_at(text, cursor) {
        let whole = open.get(0).map(|m| m.range()).unwrap_or(cursor..text.len());
        let tag = &open[1];
        let close = format!("</{}>", tag);

        match text[whole.end..].find(&close) {
            Some(offset) => {
                let content = &text[whole.end..whole.end + offset];
                sections.push(format!("#### {}\n{}\n", tag.to_uppercase(), content.trim()));
                cursor = whole.end + offset + close.len();
            }
            None => cursor = whole.end,
        }
    }

    sections.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sql_query_tagged_block() {
        let input = "here you go\n<sql>\nSELECT * FROM wells;\n</sql>\nthanks";
        assert_eq!(parse_sql_query(input), "SELECT * FROM wells;");
    }

    #[test]
    fn test_parse_sql_query_tagged_block_with_fence() {
        let input = "<sql>```sql\nSELECT well_name FROM wells\n```</sql>";
        assert_eq!(parse_sql_query(input), "SELECT well_name FROM wells");
    }

    #[test]
    fn test_parse_sql_query_first_block_wins() {
        let input = "<sql>SELECT 1</sql> and <sql>SELECT 2</sql>";
        assert_eq!(parse_sql_query(input), "SELECT 1");
    }

    #[test]
    fn test_parse_sql_query_untagged_fallback() {
        let input = "  SELECT * FROM operators  \n";
        assert_eq!(parse_sql_query(input), "SELECT * FROM operators");
    }

    #[test]
    fn test_parse_sql_query_converts_literal_escapes() {
        let input = r"<sql>SELECT *\nFROM wells\tWHERE 1 = 1</sql>";
        assert_eq!(parse_sql_query(input), "SELECT *\nFROM wells\tWHERE 1 = 1");
    }

    #[test]
    fn test_parse_sql_query_empty_input() {
        assert_eq!(parse_sql_query(""), "");
    }

    #[test]
    fn test_round_gets_numeric_cast() {
        assert_eq!(
            parse_sql_query("SELECT ROUND(x, 2) FROM t"),
            "SELECT ROUND(x::numeric, 2) FROM t"
        );
    }

    #[test]
    fn test_round_already_cast_is_unchanged() {
        let sql = "SELECT ROUND(x::numeric, 2) FROM t";
        assert_eq!(parse_sql_query(sql), sql);
    }

    #[test]
    fn test_round_is_case_insensitive_and_trims() {
        assert_eq!(
            cast_round_arguments("select round( avg_oil , 1 ) from t"),
            "select ROUND(avg_oil::numeric, 1) from t"
        );
    }

    #[test]
    fn test_round_with_nested_call_is_left_alone() {
        let sql = "SELECT ROUND(AVG(oil_bbl), 2) FROM production";
        assert_eq!(cast_round_arguments(sql), sql);
    }

    #[test]
    fn test_parse_think_block() {
        let response = "<think>pick wells</think>\n<answer>wells</answer>";
        let (think, content) = parse_think_block(response, Some("answer")).unwrap();
        assert_eq!(think, "pick wells");
        assert_eq!(content, "wells");
    }

    #[test]
    fn test_parse_think_block_missing_fails() {
        assert!(parse_think_block("no reasoning here", None).is_err());
    }

    #[test]
    fn test_parse_list_json_and_single_quoted() {
        assert_eq!(parse_list(r#"tables: ["wells", "production"]"#), vec!["wells", "production"]);
        assert_eq!(parse_list("tables: ['operators']"), vec!["operators"]);
    }

    #[test]
    fn test_parse_list_no_match() {
        assert!(parse_list("nothing to see").is_empty());
        assert!(parse_list("[1, 2").is_empty());
    }

    #[test]
    fn test_parse_xml_to_markdown() {
        let text = "<reason> because </reason>\n<sql>SELECT 1</sql><open>";
        assert_eq!(
            parse_xml_to_markdown(text),
            "#### REASON\nbecause\n\n#### SQL\nSELECT 1\n"
        );
    }
}
