use std::collections::HashMap;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde_json::{Map as JsonMap, Value as JsonValue};
use tracing::Level;

use crate::types::SqlParam;

/// A row from a query result.
///
/// Column names are shared across all rows of a result set.
#[derive(Debug, Clone)]
pub struct Row {
    /// The column names for this row
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, positionally aligned with `column_names`
    pub values: Vec<SqlParam>,
    // Cache for column lookups to avoid repeated string comparisons
    #[doc(hidden)]
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl Row {
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, values: Vec<SqlParam>) -> Self {
        let cache = Arc::new(
            column_names
                .iter()
                .enumerate()
                .map(|(i, name)| (name.clone(), i))
                .collect::<HashMap<_, _>>(),
        );

        Self {
            column_names,
            values,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        self.column_names.iter().position(|col| col == column_name)
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&SqlParam> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&SqlParam> {
        self.values.get(index)
    }

    /// Project the row to a JSON object.
    ///
    /// NULL columns are omitted from the object (rather than serialized as
    /// JSON null) when `options.null_to_absent` is set.
    #[must_use]
    pub fn to_json(&self, options: &QueryOptions) -> JsonMap<String, JsonValue> {
        let mut map = JsonMap::with_capacity(self.values.len());
        for (name, value) in self.column_names.iter().zip(&self.values) {
            if options.null_to_absent && value.is_null() {
                continue;
            }
            map.insert(name.clone(), param_to_json(value));
        }
        map
    }
}

fn param_to_json(value: &SqlParam) -> JsonValue {
    match value {
        SqlParam::Int(i) => JsonValue::from(*i),
        SqlParam::Float(f) => JsonValue::from(*f),
        SqlParam::Text(s) => JsonValue::from(s.clone()),
        SqlParam::Bool(b) => JsonValue::from(*b),
        SqlParam::Timestamp(dt) => JsonValue::from(dt.format("%F %T%.f").to_string()),
        SqlParam::Null => JsonValue::Null,
        SqlParam::Json(j) => j.clone(),
        SqlParam::Blob(bytes) => JsonValue::from(String::from_utf8_lossy(bytes).into_owned()),
        SqlParam::List(values) => JsonValue::from(
            values.iter().map(param_to_json).collect::<Vec<_>>(),
        ),
    }
}

/// How a binary column is rendered to text during post-processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobEncoding {
    /// Decode the bytes as UTF-8, replacing invalid sequences
    Utf8Lossy,
    /// Standard base64
    Base64,
    /// Lowercase hex
    Hex,
}

impl BlobEncoding {
    fn render(self, bytes: &[u8]) -> String {
        match self {
            BlobEncoding::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned(),
            BlobEncoding::Base64 => BASE64.encode(bytes),
            BlobEncoding::Hex => {
                let mut out = String::with_capacity(bytes.len() * 2);
                for byte in bytes {
                    out.push_str(&format!("{byte:02x}"));
                }
                out
            }
        }
    }
}

/// Per-call behavior knobs for the query helpers.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Default blob-to-text encoding applied to every binary column
    pub encoding: Option<BlobEncoding>,
    /// Per-column encoding overrides, keyed by column name
    pub specific: HashMap<String, BlobEncoding>,
    /// Omit NULL columns from `Row::to_json` instead of emitting JSON null
    pub null_to_absent: bool,
    /// Per-call severity override for SQL dispatch logging (default DEBUG)
    pub log_level: Option<Level>,
}

impl QueryOptions {
    fn encoding_for(&self, column: &str) -> Option<BlobEncoding> {
        self.specific.get(column).copied().or(self.encoding)
    }
}

/// Render binary columns to text per the configured encodings.
///
/// Runs after shape validation, before rows are handed back to the caller.
pub(crate) fn apply_blob_encoding(rows: &mut [Row], options: &QueryOptions) {
    if options.encoding.is_none() && options.specific.is_empty() {
        return;
    }
    for row in rows {
        let names = Arc::clone(&row.column_names);
        for (name, value) in names.iter().zip(row.values.iter_mut()) {
            if let SqlParam::Blob(bytes) = value
                && let Some(encoding) = options.encoding_for(name)
            {
                *value = SqlParam::Text(encoding.render(bytes));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_row(bytes: Vec<u8>) -> Row {
        Row::new(
            Arc::new(vec!["payload".to_string(), "label".to_string()]),
            vec![SqlParam::Blob(bytes), SqlParam::Text("x".into())],
        )
    }

    #[test]
    fn default_options_leave_blobs_alone() {
        let mut rows = vec![blob_row(vec![1, 2, 3])];
        apply_blob_encoding(&mut rows, &QueryOptions::default());
        assert!(matches!(rows[0].values[0], SqlParam::Blob(_)));
    }

    #[test]
    fn hex_encoding_renders_blob_columns() {
        let mut rows = vec![blob_row(vec![0xde, 0xad])];
        let options = QueryOptions {
            encoding: Some(BlobEncoding::Hex),
            ..QueryOptions::default()
        };
        apply_blob_encoding(&mut rows, &options);
        assert_eq!(rows[0].values[0].as_text(), Some("dead"));
    }

    #[test]
    fn specific_override_wins_over_default() {
        let mut rows = vec![blob_row(b"hi".to_vec())];
        let mut specific = HashMap::new();
        specific.insert("payload".to_string(), BlobEncoding::Base64);
        let options = QueryOptions {
            encoding: Some(BlobEncoding::Hex),
            specific,
            ..QueryOptions::default()
        };
        apply_blob_encoding(&mut rows, &options);
        assert_eq!(rows[0].values[0].as_text(), Some("aGk="));
    }

    #[test]
    fn null_to_absent_drops_columns_from_json() {
        let row = Row::new(
            Arc::new(vec!["a".to_string(), "b".to_string()]),
            vec![SqlParam::Null, SqlParam::Int(7)],
        );
        let options = QueryOptions {
            null_to_absent: true,
            ..QueryOptions::default()
        };
        let json = row.to_json(&options);
        assert!(!json.contains_key("a"));
        assert_eq!(json.get("b"), Some(&serde_json::json!(7)));

        let json = row.to_json(&QueryOptions::default());
        assert_eq!(json.get("a"), Some(&JsonValue::Null));
    }
}
