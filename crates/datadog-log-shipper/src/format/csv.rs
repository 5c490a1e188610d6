// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Record, RecordFormatter};
use crate::error::Error;
use serde_json::Value;

/// Delimited rows over a fixed, ordered column list.
///
/// Columns missing from a record are written empty. Fields containing a
/// comma, a double quote, CR or LF are quoted, with quotes doubled.
#[derive(Debug, Clone)]
pub struct CsvFormatter {
    columns: Vec<String>,
}

impl CsvFormatter {
    pub fn new(columns: Vec<String>) -> Result<Self, Error> {
        if columns.is_empty() {
            return Err(Error::InvalidConfig(
                "CSV format requires at least one column name".to_string(),
            ));
        }
        Ok(Self { columns })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl RecordFormatter for CsvFormatter {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut row = String::new();
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                row.push(',');
            }
            match record.get(column) {
                None | Some(Value::Null) => {}
                Some(Value::String(s)) => push_field(&mut row, s),
                Some(other) => push_field(&mut row, &other.to_string()),
            }
        }
        row.push('\n');
        Ok(row.into_bytes())
    }

    fn format_name(&self) -> &'static str {
        "csv"
    }
}

fn push_field(row: &mut String, field: &str) {
    if field.contains([',', '"', '\r', '\n']) {
        row.push('"');
        row.push_str(&field.replace('"', "\"\""));
        row.push('"');
    } else {
        row.push_str(field);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn formatter() -> CsvFormatter {
        CsvFormatter::new(vec![
            "time".to_string(),
            "message".to_string(),
            "status".to_string(),
        ])
        .unwrap()
    }

    #[test]
    fn test_column_order_and_missing_fields() {
        let record = json!({"status": 500, "message": "boom", "ignored": true});
        let bytes = formatter().encode(record.as_object().unwrap()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), ",boom,500\n");
    }

    #[test]
    fn test_quoting() {
        let record = json!({"time": 1, "message": "said \"hi\", left", "status": null});
        let bytes = formatter().encode(record.as_object().unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            "1,\"said \"\"hi\"\", left\",\n"
        );
    }

    #[test]
    fn test_nested_values_rendered_as_json() {
        let record = json!({"message": {"k": "v"}});
        let bytes = formatter().encode(record.as_object().unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            ",\"{\"\"k\"\":\"\"v\"\"}\",\n"
        );
    }

    #[test]
    fn test_empty_columns_rejected() {
        assert!(matches!(
            CsvFormatter::new(vec![]),
            Err(Error::InvalidConfig(_))
        ));
    }
}
