//! MySQL to JSON value mappings.
//!
//! Result rows leave the process as JSON, so every native MySQL value has to be
//! turned into something the protocol can carry without losing information.
//!
//! # Architecture
//!
//! Conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column type name reported by the server
//! 2. A per-category decoder extracts the value, falling back to the server's
//!    own text rendering (and finally the raw bytes) when the typed decode fails
//!
//! The formatting rules themselves are plain functions so they can be tested
//! without a server.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;
use std::collections::HashSet;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Column, Decode, MySql, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for MySQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Date,
    DateTime,
    Time,
    Binary,
    Json,
    Text,
}

/// Classify a MySQL type name (e.g. `BIGINT UNSIGNED`, `VARBINARY`) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_lowercase();

    // Decimal first, "numeric" would otherwise never match anything below
    if lower.contains("decimal") || lower.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    if lower.contains("int") || lower == "year" || lower == "bit" {
        return TypeCategory::Integer;
    }

    if lower.contains("float") || lower.contains("double") || lower == "real" {
        return TypeCategory::Float;
    }

    if lower == "json" {
        return TypeCategory::Json;
    }

    // DATETIME must be checked before DATE and TIME
    if lower.contains("datetime") || lower.contains("timestamp") {
        return TypeCategory::DateTime;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" {
        return TypeCategory::Time;
    }

    if lower.contains("blob") || lower.contains("binary") || lower == "geometry" {
        return TypeCategory::Binary;
    }

    // varchar, char, text, enum, set, ...
    TypeCategory::Text
}

// =============================================================================
// Raw Text Support
// =============================================================================

/// The server's own rendering of a value.
///
/// Accepts any column type. Used for DECIMAL (to keep it exact) and as the
/// fallback when a typed decode rejects a value, such as a TIME outside the
/// 24-hour range.
#[derive(Debug)]
pub struct RawText(pub String);

impl Type<MySql> for RawText {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<MySql>>::type_info()
    }

    fn compatible(_ty: &MySqlTypeInfo) -> bool {
        true
    }
}

impl<'r> Decode<'r, MySql> for RawText {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<MySql>>::decode(value)?;
        Ok(RawText(s.to_string()))
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// `YYYY-MM-DD`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// ISO-8601 `YYYY-MM-DDTHH:MM:SS`, with fractional seconds only when present.
pub fn format_datetime(datetime: NaiveDateTime) -> String {
    datetime.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

/// `HH:MM:SS`, with fractional seconds only when present.
pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S%.f").to_string()
}

/// Finite floats become numbers; NaN and infinities cannot be JSON numbers.
pub fn float_to_json(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

/// Binary data as UTF-8 text when it is valid, base64 otherwise.
pub fn binary_to_json(bytes: &[u8]) -> JsonValue {
    match std::str::from_utf8(bytes) {
        Ok(s) => JsonValue::String(s.to_string()),
        Err(_) => JsonValue::String(STANDARD.encode(bytes)),
    }
}

/// Integer rendered as text by the server (YEAR, BIT, text protocol fallbacks).
pub fn integer_text_to_json(text: &str) -> JsonValue {
    let trimmed = text.trim();
    if let Ok(v) = trimmed.parse::<i64>() {
        return JsonValue::Number(v.into());
    }
    if let Ok(v) = trimmed.parse::<u64>() {
        return JsonValue::Number(v.into());
    }
    JsonValue::String(text.to_string())
}

// =============================================================================
// Row to JSON
// =============================================================================

/// Conversion of result rows into protocol-safe JSON.
pub trait RowToJson {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue>;
    fn column_names(&self) -> Vec<String>;
}

/// Row keys for a result set's column names.
///
/// A repeated name (`SELECT a.id, b.id ...`) gets a `_2`, `_3`, ... suffix so
/// every value keeps its own key.
pub fn unique_column_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    names
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let mut key = name.to_string();
            let mut suffix = 2;
            while !seen.insert(key.clone()) {
                key = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            if suffix > 2 {
                tracing::debug!(column = %name, key = %key, "Renamed duplicate column");
            }
            key
        })
        .collect()
}

impl RowToJson for MySqlRow {
    fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.column_names()
            .into_iter()
            .zip(self.columns())
            .enumerate()
            .map(|(idx, (key, col))| {
                let category = categorize_type(col.type_info().name());
                (key, decode_column(self, idx, category))
            })
            .collect()
    }

    fn column_names(&self) -> Vec<String> {
        let names: Vec<&str> = self.columns().iter().map(|c| c.name()).collect();
        unique_column_names(&names)
    }
}

fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> JsonValue {
    match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return JsonValue::Null,
        Ok(_) => {}
        Err(e) => {
            tracing::error!(column = idx, error = %e, "Failed to read column");
            return JsonValue::Null;
        }
    }

    let typed = match category {
        TypeCategory::Integer => decode_integer(row, idx),
        TypeCategory::Float => decode_float(row, idx),
        TypeCategory::Decimal => decode_raw_text(row, idx),
        TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(JsonValue::Bool),
        TypeCategory::Date => row
            .try_get::<NaiveDate, _>(idx)
            .ok()
            .map(|d| JsonValue::String(format_date(d))),
        TypeCategory::DateTime => row
            .try_get::<NaiveDateTime, _>(idx)
            .ok()
            .map(|dt| JsonValue::String(format_datetime(dt))),
        TypeCategory::Time => row
            .try_get::<NaiveTime, _>(idx)
            .ok()
            .map(|t| JsonValue::String(format_time(t))),
        TypeCategory::Binary => decode_bytes(row, idx),
        TypeCategory::Json => row.try_get::<JsonValue, _>(idx).ok(),
        TypeCategory::Text => row.try_get::<String, _>(idx).ok().map(JsonValue::String),
    };

    typed
        .or_else(|| decode_raw_text(row, idx))
        .or_else(|| decode_bytes(row, idx))
        .unwrap_or_else(|| {
            tracing::warn!(column = idx, ?category, "Unable to decode column value");
            JsonValue::Null
        })
}

fn decode_integer(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<i64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    if let Ok(v) = row.try_get::<u64, _>(idx) {
        return Some(JsonValue::Number(v.into()));
    }
    row.try_get::<RawText, _>(idx)
        .ok()
        .map(|v| integer_text_to_json(&v.0))
}

fn decode_float(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    if let Ok(v) = row.try_get::<f64, _>(idx) {
        return Some(float_to_json(v));
    }
    row.try_get::<f32, _>(idx)
        .ok()
        .map(|v| float_to_json(f64::from(v)))
}

fn decode_raw_text(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<RawText, _>(idx)
        .ok()
        .map(|v| JsonValue::String(v.0))
}

fn decode_bytes(row: &MySqlRow, idx: usize) -> Option<JsonValue> {
    row.try_get::<Vec<u8>, _>(idx)
        .ok()
        .map(|v| binary_to_json(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_column_names_keeps_every_column() {
        assert_eq!(
            unique_column_names(&["id", "name", "id", "id"]),
            vec!["id", "name", "id_2", "id_3"]
        );
        // A suffix never reuses a name already in the select list
        assert_eq!(
            unique_column_names(&["id", "id_2", "id"]),
            vec!["id", "id_2", "id_3"]
        );
        assert_eq!(unique_column_names(&["a", "b"]), vec!["a", "b"]);
    }

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(categorize_type("INT"), TypeCategory::Integer);
        assert_eq!(categorize_type("BIGINT UNSIGNED"), TypeCategory::Integer);
        assert_eq!(categorize_type("TINYINT"), TypeCategory::Integer);
        assert_eq!(categorize_type("YEAR"), TypeCategory::Integer);
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("DATETIME"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::DateTime);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_type_other() {
        assert_eq!(categorize_type("DECIMAL"), TypeCategory::Decimal);
        assert_eq!(categorize_type("BOOLEAN"), TypeCategory::Boolean);
        assert_eq!(categorize_type("DOUBLE"), TypeCategory::Float);
        assert_eq!(categorize_type("JSON"), TypeCategory::Json);
        assert_eq!(categorize_type("VARBINARY"), TypeCategory::Binary);
        assert_eq!(categorize_type("MEDIUMBLOB"), TypeCategory::Binary);
        assert_eq!(categorize_type("VARCHAR"), TypeCategory::Text);
        assert_eq!(categorize_type("ENUM"), TypeCategory::Text);
    }

    #[test]
    fn test_format_temporal_values() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(format_date(date), "2024-01-02");

        let dt = date.and_hms_opt(3, 4, 5).unwrap();
        assert_eq!(format_datetime(dt), "2024-01-02T03:04:05");

        let dt = date.and_hms_milli_opt(3, 4, 5, 500).unwrap();
        assert_eq!(format_datetime(dt), "2024-01-02T03:04:05.500");

        let time = NaiveTime::from_hms_opt(23, 59, 1).unwrap();
        assert_eq!(format_time(time), "23:59:01");
    }

    #[test]
    fn test_float_to_json() {
        assert_eq!(float_to_json(1.5), serde_json::json!(1.5));
        assert_eq!(float_to_json(f64::NAN), JsonValue::String("NaN".to_string()));
        assert_eq!(
            float_to_json(f64::INFINITY),
            JsonValue::String("inf".to_string())
        );
    }

    #[test]
    fn test_integer_text_to_json() {
        assert_eq!(integer_text_to_json("2024"), serde_json::json!(2024));
        assert_eq!(integer_text_to_json("-7"), serde_json::json!(-7));
        assert_eq!(
            integer_text_to_json("18446744073709551615"),
            serde_json::json!(u64::MAX)
        );
        assert_eq!(
            integer_text_to_json("abc"),
            JsonValue::String("abc".to_string())
        );
    }

    #[test]
    fn test_binary_to_json_with_valid_utf8() {
        assert_eq!(
            binary_to_json(b"hello world"),
            JsonValue::String("hello world".to_string())
        );
        assert_eq!(binary_to_json(&[]), JsonValue::String(String::new()));
    }

    #[test]
    fn test_binary_to_json_with_invalid_utf8() {
        let bytes: &[u8] = &[0xFF, 0xFE, 0x00, 0x01];
        assert_eq!(
            binary_to_json(bytes),
            JsonValue::String("//4AAQ==".to_string())
        );
    }
}
