// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Record, RecordFormatter};
use crate::error::Error;

/// MessagePack maps with named fields, written back to back.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackFormatter;

impl RecordFormatter for MessagePackFormatter {
    fn encode(&self, record: &Record) -> Result<Vec<u8>, Error> {
        rmp_serde::to_vec_named(record).map_err(|e| Error::Format(e.to_string()))
    }

    fn format_name(&self) -> &'static str {
        "msgpack"
    }
}
