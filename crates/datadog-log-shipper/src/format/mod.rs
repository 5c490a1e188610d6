// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Record encoders.
//!
//! A formatter turns one structured [`Record`] into the bytes appended to a
//! chunk. Encoded records are concatenated as-is, so every format here is
//! self-delimiting: one JSON object per line, one CSV row per line, or a
//! stream of MessagePack maps.

mod csv;
mod jsonl;
mod msgpack;

pub use self::csv::CsvFormatter;
pub use self::jsonl::JsonlFormatter;
pub use self::msgpack::MessagePackFormatter;

use crate::error::Error;
use serde::Deserialize;
use std::str::FromStr;
use std::sync::Arc;

/// A structured log record.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub trait RecordFormatter: Send + Sync {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error>;

    /// Short name used for the default object key suffix, e.g. `jsonl`.
    fn format_name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatType {
    #[serde(rename = "msgpack")]
    MessagePack,
    #[default]
    Jsonl,
    Csv,
}

impl FormatType {
    /// Instantiates the formatter. `csv_columns` is only read for [`FormatType::Csv`].
    pub fn build(self, csv_columns: &[String]) -> Result<Arc<dyn RecordFormatter>, Error> {
        Ok(match self {
            FormatType::MessagePack => Arc::new(MessagePackFormatter),
            FormatType::Jsonl => Arc::new(JsonlFormatter),
            FormatType::Csv => Arc::new(CsvFormatter::new(csv_columns.to_vec())?),
        })
    }
}

impl FromStr for FormatType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "msgpack" | "messagepack" | "message_pack" => Ok(FormatType::MessagePack),
            "jsonl" | "json_lines" => Ok(FormatType::Jsonl),
            "csv" => Ok(FormatType::Csv),
            other => Err(Error::InvalidConfig(format!("Unexpected format type: {other}"))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_format_type_from_str() {
        assert_eq!("msgpack".parse::<FormatType>().unwrap(), FormatType::MessagePack);
        assert_eq!(" JSONL ".parse::<FormatType>().unwrap(), FormatType::Jsonl);
        assert_eq!("csv".parse::<FormatType>().unwrap(), FormatType::Csv);
        assert!("parquet".parse::<FormatType>().is_err());
    }

    #[test]
    fn test_build_names() {
        let columns = vec!["message".to_string()];
        for (format_type, name) in [
            (FormatType::MessagePack, "msgpack"),
            (FormatType::Jsonl, "jsonl"),
            (FormatType::Csv, "csv"),
        ] {
            let formatter = format_type.build(&columns).unwrap();
            assert_eq!(formatter.format_name(), name);
        }
    }

    #[test]
    fn test_build_csv_requires_columns() {
        assert!(FormatType::Csv.build(&[]).is_err());
        assert!(FormatType::Jsonl.build(&[]).is_ok());
    }
}
