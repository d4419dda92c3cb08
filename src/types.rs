use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// Values that can be bound to a statement or read back from a row.
///
/// `List` only appears as a statement-builder argument (it expands to an
/// `IN (...)` placeholder group); drivers reject it as a bound parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    Json(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
    /// Ordered sequence of values (array argument for `IN (...)` expansion)
    List(Vec<SqlParam>),
}

impl SqlParam {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlParam::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlParam::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlParam::Bool(value) => Some(*value),
            SqlParam::Int(0) => Some(false),
            SqlParam::Int(1) => Some(true),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlParam::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let SqlParam::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            SqlParam::Timestamp(value) => Some(*value),
            SqlParam::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    /// Whether the statement builder treats this bare value as an omitted
    /// optional clause (no placeholder, no argument). Mirrors the falsy rules
    /// of the template this layer descends from; a legitimate `0`, `""` or
    /// `false` bound through the builder is dropped the same way.
    #[must_use]
    pub fn is_falsy(&self) -> bool {
        match self {
            SqlParam::Null | SqlParam::Bool(false) | SqlParam::Int(0) => true,
            SqlParam::Float(f) => *f == 0.0,
            SqlParam::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Textual coercion used by the statement builder, which stores every
    /// collected argument display-ready rather than as its native type.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self {
            SqlParam::Int(i) => i.to_string(),
            SqlParam::Float(f) => f.to_string(),
            SqlParam::Text(s) => s.clone(),
            SqlParam::Bool(b) => b.to_string(),
            SqlParam::Timestamp(dt) => dt.format("%F %T%.f").to_string(),
            SqlParam::Null => "null".to_string(),
            SqlParam::Json(j) => j.to_string(),
            SqlParam::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            SqlParam::List(values) => values
                .iter()
                .map(SqlParam::display_text)
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<f64> for SqlParam {
    fn from(value: f64) -> Self {
        SqlParam::Float(value)
    }
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        SqlParam::Timestamp(value)
    }
}

impl From<JsonValue> for SqlParam {
    fn from(value: JsonValue) -> Self {
        SqlParam::Json(value)
    }
}

impl From<Vec<u8>> for SqlParam {
    fn from(value: Vec<u8>) -> Self {
        SqlParam::Blob(value)
    }
}

impl From<Vec<SqlParam>> for SqlParam {
    fn from(value: Vec<SqlParam>) -> Self {
        SqlParam::List(value)
    }
}

impl<T> From<Option<T>> for SqlParam
where
    T: Into<SqlParam>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(SqlParam::Null, Into::into)
    }
}
