// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Record, RecordFormatter};
use crate::error::Error;

/// One JSON object per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonlFormatter;

impl RecordFormatter for JsonlFormatter {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error> {
        let mut bytes = serde_json::to_vec(record).map_err(|e| Error::Format(e.to_string()))?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    fn format_name(&self) -> &'static str {
        "jsonl"
    }
}
