// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log line formatting for the shipper's own diagnostics.
//!
//! Lines look like:
//!
//! ```text
//! DD_LOG_SHIPPER | LEVEL | [span_name{span_fields}:] message {event_fields}
//! ```
//!
//! so they can be told apart from the application's logs, which may well be
//! what is being shipped.

use crate::error::Error;
use std::fmt;
use tracing_core::{Event, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields,
};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

const PREFIX: &str = "DD_LOG_SHIPPER";

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "{PREFIX} | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;

                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Builds the filter used by [`init`]: `log_level` for everything, with the
/// HTTP stack silenced.
pub fn env_filter(log_level: &str) -> Result<EnvFilter, Error> {
    EnvFilter::try_new(format!("h2=off,hyper=off,rustls=off,{log_level}"))
        .map_err(|e| Error::InvalidConfig(format!("invalid log level {log_level:?}: {e}")))
}

/// Installs a global subscriber writing with [`Formatter`].
///
/// Fails if the level does not parse or a global subscriber is already set.
pub fn init(log_level: &str) -> Result<(), Error> {
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(env_filter(log_level)?)
        .event_format(Formatter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::InvalidConfig(format!("unable to install logger: {e}")))?;

    tracing::debug!("SHIPPER | Logging subsystem enabled");
    Ok(())
}
