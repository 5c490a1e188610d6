// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::Transport;
use crate::config::DestinationConfig;
use crate::error::{Error, TransportError};
use crate::ingester::Compression;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_ENCODING, CONTENT_TYPE};
use std::time::Duration;
use tracing::error;

/// Uploads each payload with `PUT {endpoint}/{key}`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    headers: HeaderMap,
    credentials: Option<(String, String)>,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(destination: &DestinationConfig, compression: Compression) -> Result<Self, Error> {
        let endpoint = destination.endpoint.trim_end_matches('/').to_string();
        if endpoint.is_empty() {
            return Err(Error::InvalidConfig(
                "destination endpoint cannot be empty".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        );
        if let Some(encoding) = compression.content_encoding() {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static(encoding));
        }
        if let Some(region) = &destination.region {
            let value = HeaderValue::from_str(region)
                .map_err(|e| Error::InvalidConfig(format!("invalid region {region:?}: {e}")))?;
            headers.insert("x-region", value);
        }

        let credentials = match (
            &destination.access_key_id,
            &destination.secret_access_key,
        ) {
            (Some(id), Some(secret)) => Some((id.clone(), secret.clone())),
            (None, None) => None,
            _ => {
                return Err(Error::InvalidConfig(
                    "access_key_id and secret_access_key must be set together".to_string(),
                ))
            }
        };

        Ok(HttpTransport {
            client: get_client(destination),
            endpoint,
            headers,
            credentials,
            timeout: destination.request_timeout,
        })
    }

    fn url(&self, key: &str) -> String {
        format!("{}/{}", self.endpoint, key.trim_start_matches('/'))
    }
}

/// Builds the client, falling back to a direct connection when the proxy
/// setting cannot be used.
fn get_client(destination: &DestinationConfig) -> reqwest::Client {
    let builder = reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(270))
        .tcp_keepalive(Duration::from_secs(120));

    let builder = match &destination.https_proxy {
        Some(proxy) => match reqwest::Proxy::https(proxy) {
            Ok(proxy) => builder.proxy(proxy),
            Err(e) => {
                error!(
                    "SHIPPER | Unable to parse proxy configuration: {}, falling back to direct connection",
                    e
                );
                builder
            }
        },
        None => builder,
    };

    match builder.build() {
        Ok(client) => client,
        Err(e) => {
            error!(
                "SHIPPER | Failed to build HTTP client: {}, using reqwest defaults",
                e
            );
            reqwest::Client::new()
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, key: &str, payload: &[u8]) -> Result<(), TransportError> {
        let mut request = self
            .client
            .put(self.url(key))
            .timeout(self.timeout)
            .headers(self.headers.clone())
            .body(payload.to_vec());
        if let Some((id, secret)) = &self.credentials {
            request = request.basic_auth(id, Some(secret));
        }

        match request.send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(());
                }
                let body = resp.text().await.unwrap_or_default();
                Err(TransportError::from_status(status.as_u16(), body))
            }
            Err(e) if e.is_timeout() => Err(TransportError::Timeout(self.timeout)),
            Err(e) => Err(TransportError::Network(e.to_string())),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
