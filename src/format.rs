//! Display-oriented SQL rendering for diagnostics.
//!
//! The interpolated form is only ever logged; the parameterized statement is
//! what reaches the driver.

use crate::types::SqlParam;

/// Interpolate arguments into `?` placeholders for log readability.
///
/// Placeholders beyond the argument list are left as-is.
#[must_use]
pub fn format_sql(sql: &str, args: &[SqlParam]) -> String {
    let mut out = String::with_capacity(sql.len() + args.len() * 8);
    let mut next = args.iter();
    for ch in sql.chars() {
        if ch == '?' {
            match next.next() {
                Some(arg) => out.push_str(&quote_literal(arg)),
                None => out.push('?'),
            }
        } else {
            out.push(ch);
        }
    }
    out
}

fn quote_literal(arg: &SqlParam) -> String {
    match arg {
        SqlParam::Null => "NULL".to_string(),
        SqlParam::Int(i) => i.to_string(),
        SqlParam::Float(f) => f.to_string(),
        SqlParam::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlParam::Blob(bytes) => format!("<{} bytes>", bytes.len()),
        other => format!("'{}'", other.display_text().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_in_order() {
        let rendered = format_sql(
            "SELECT * FROM t WHERE a = ? AND b = ?",
            &[SqlParam::Int(1), SqlParam::Text("x".into())],
        );
        assert_eq!(rendered, "SELECT * FROM t WHERE a = 1 AND b = 'x'");
    }

    #[test]
    fn escapes_embedded_quotes() {
        let rendered = format_sql("VALUES (?)", &[SqlParam::Text("it's".into())]);
        assert_eq!(rendered, "VALUES ('it''s')");
    }

    #[test]
    fn surplus_placeholders_survive() {
        assert_eq!(format_sql("a = ? AND b = ?", &[SqlParam::Int(9)]), "a = 9 AND b = ?");
    }
}
