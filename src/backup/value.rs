//! Literal encoding for row values.

use crate::catalog::RowValue;

/// Render a value as a SQL literal
///
/// Text is single-quoted with embedded quotes doubled, binary becomes an unquoted
/// `0x` prefixed uppercase hex string. NULL, numbers and booleans are written bare,
/// except the non-finite floats which only parse as string literals.
pub fn encode_value(value: &RowValue) -> String {
    match value {
        RowValue::Null => "NULL".to_string(),
        RowValue::Text(text) => quote_text(text),
        RowValue::Binary(bytes) => format!("0x{}", hex::encode_upper(bytes)),
        RowValue::Scalar(raw) if is_non_finite(raw) => quote_text(raw),
        RowValue::Scalar(raw) => raw.clone(),
    }
}

fn is_non_finite(raw: &str) -> bool {
    matches!(raw, "NaN" | "Infinity" | "-Infinity")
}

pub fn quote_text(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Comma separated, parenthesized value list
pub fn encode_row(values: &[RowValue]) -> String {
    let encoded: Vec<String> = values.iter().map(encode_value).collect();
    format!("({})", encoded.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unquote_text(literal: &str) -> Option<String> {
        let inner = literal.strip_prefix('\'')?.strip_suffix('\'')?;
        Some(inner.replace("''", "'"))
    }

    #[test]
    fn test_text_quotes_are_doubled() {
        let literal = encode_value(&RowValue::Text("O'Brien".to_string()));
        assert_eq!(literal, "'O''Brien'");
        assert_eq!(unquote_text(&literal).as_deref(), Some("O'Brien"));
    }

    #[test]
    fn test_text_round_trips() {
        for original in ["", "'", "''", "it's 'quoted'", "no quotes", "line\nbreak", "ünïcödé's"] {
            let literal = encode_value(&RowValue::Text(original.to_string()));
            assert_eq!(unquote_text(&literal).as_deref(), Some(original));
        }
    }

    #[test]
    fn test_binary_is_uppercase_hex() {
        assert_eq!(encode_value(&RowValue::Binary(vec![0x00, 0xFF, 0x0A])), "0x00FF0A");
        assert_eq!(encode_value(&RowValue::Binary(vec![])), "0x");
    }

    #[test]
    fn test_null_is_bare() {
        assert_eq!(encode_value(&RowValue::Null), "NULL");
    }

    #[test]
    fn test_scalar_is_unquoted() {
        assert_eq!(encode_value(&RowValue::Scalar("42".to_string())), "42");
        assert_eq!(encode_value(&RowValue::Scalar("0.99".to_string())), "0.99");
        assert_eq!(encode_value(&RowValue::Scalar("true".to_string())), "true");
    }

    #[test]
    fn test_non_finite_numbers_are_quoted() {
        assert_eq!(encode_value(&RowValue::Scalar("NaN".to_string())), "'NaN'");
        assert_eq!(encode_value(&RowValue::Scalar("-Infinity".to_string())), "'-Infinity'");
    }

    #[test]
    fn test_date_and_uuid_columns_are_quoted() {
        use crate::catalog::{ColumnDescriptor, ValueKind};

        for (type_name, raw) in [
            ("date", "2024-01-15"),
            ("uuid", "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"),
        ] {
            let column = ColumnDescriptor::new("c", type_name);
            assert_eq!(column.kind, ValueKind::Text);
            let literal = encode_value(&RowValue::Text(raw.to_string()));
            assert_eq!(literal, format!("'{raw}'"));
        }
    }

    #[test]
    fn test_encode_row() {
        let row = vec![
            RowValue::Scalar("1".to_string()),
            RowValue::Text("Ann".to_string()),
            RowValue::Null,
            RowValue::Binary(vec![0xCA, 0xFE]),
        ];
        assert_eq!(encode_row(&row), "(1, 'Ann', NULL, 0xCAFE)");
    }
}
