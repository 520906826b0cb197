use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};

// lexical only: a quoted literal that itself looks like `a = 'b'` is rewritten too
static EQUALS_LITERAL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([\w\.]+)\s*=\s*'([^']+)'").unwrap()
});

static SEPARATOR_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[ -]").unwrap()
});

/// rewrite `column = 'value'` filters into whitespace and hyphen tolerant ILIKE matches
///
/// `status = 'Shut-in'` becomes
/// `REPLACE(REPLACE(status, ' ', '_'), '-', '_') ILIKE '%Shut_in%'`.
/// numeric and unquoted comparisons are left untouched.
pub fn enforce_ilike(sql_query: &str) -> String {
    EQUALS_LITERAL_REGEX
        .replace_all(sql_query, |caps: &Captures| {
            format!(
                "REPLACE(REPLACE({}, ' ', '_'), '-', '_') ILIKE '%{}%'",
                &caps[1],
                normalize_literal(&caps[2])
            )
        })
        .into_owned()
}

fn normalize_literal(token: &str) -> String {
    SEPARATOR_REGEX.replace_all(token, "_").trim().to_string()
}

/// convert a sqlite cell into a json value
pub fn json_safe(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(hex::encode(bytes)),
    }
}

/// zip column names with row values into a json object
pub fn convert_row(columns: &[String], values: Vec<Value>) -> Map<String, Value> {
    columns.iter().cloned().zip(values).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enforce_ilike_hyphenated_literal() {
        assert_eq!(
            enforce_ilike("SELECT * FROM wells WHERE status = 'Shut-in'"),
            "SELECT * FROM wells WHERE REPLACE(REPLACE(status, ' ', '_'), '-', '_') ILIKE '%Shut_in%'"
        );
    }

    #[test]
    fn test_enforce_ilike_qualified_identifier_and_spaces() {
        assert_eq!(
            enforce_ilike("WHERE w.operator='Garuda Oil'"),
            "WHERE REPLACE(REPLACE(w.operator, ' ', '_'), '-', '_') ILIKE '%Garuda_Oil%'"
        );
    }

    #[test]
    fn test_enforce_ilike_runs_of_separators() {
        assert_eq!(
            enforce_ilike("basin = 'North West - Java'"),
            "REPLACE(REPLACE(basin, ' ', '_'), '-', '_') ILIKE '%North_West___Java%'"
        );
    }

    #[test]
    fn test_enforce_ilike_rewrites_every_filter() {
        let sql = "WHERE status = 'Producing' AND basin = 'Kutei Basin'";
        let rewritten = enforce_ilike(sql);
        assert_eq!(rewritten.matches("ILIKE").count(), 2);
        assert!(rewritten.contains("'%Kutei_Basin%'"));
    }

    #[test]
    fn test_enforce_ilike_leaves_numeric_comparisons() {
        let sql = "SELECT * FROM production WHERE year = 2022 AND oil_bbl = total";
        assert_eq!(enforce_ilike(sql), sql);
    }

    #[test]
    fn test_enforce_ilike_leaves_empty_literal() {
        let sql = "WHERE status = ''";
        assert_eq!(enforce_ilike(sql), sql);
    }

    #[test]
    fn test_json_safe_values() {
        assert_eq!(json_safe(ValueRef::Null), Value::Null);
        assert_eq!(json_safe(ValueRef::Integer(8400)), json!(8400));
        assert_eq!(json_safe(ValueRef::Real(1.5)), json!(1.5));
        assert_eq!(json_safe(ValueRef::Real(f64::NAN)), Value::Null);
        assert_eq!(json_safe(ValueRef::Text(b"Andalas-1")), json!("Andalas-1"));
        assert_eq!(json_safe(ValueRef::Blob(&[0xde, 0xad])), json!("dead"));
    }

    #[test]
    fn test_convert_row() {
        let columns = vec!["well_name".to_string(), "year".to_string()];
        let row = convert_row(&columns, vec![json!("Andalas-1"), json!(2021)]);
        assert_eq!(Value::Object(row), json!({"well_name": "Andalas-1", "year": 2021}));
    }
}
