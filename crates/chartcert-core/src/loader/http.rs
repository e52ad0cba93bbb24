//! HTTP transport: status mapping and bounded body reads.
//!
//! This is the ONLY place for status code handling. loader/mod.rs never
//! interprets status codes.

use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;
use url::Url;

use crate::config::CertifierConfig;
use crate::error::{CertifyError, CertifyResult};

const USER_AGENT_VALUE: &str = concat!("chartcert/", env!("CARGO_PKG_VERSION"));

/// HTTP backend for fetching chart archives.
#[derive(Debug, Clone)]
pub(crate) struct HttpFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl HttpFetcher {
    pub(crate) fn new(config: &CertifierConfig) -> CertifyResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(default_headers)
            .build()
            .map_err(|e| CertifyError::Load {
                uri: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            max_bytes: config.max_chart_bytes,
        })
    }

    /// GET the archive at `url`; 404 => not found, other non-2xx => load error.
    ///
    /// The response is owned by this future, so dropping it (cancellation)
    /// releases the connection.
    pub(crate) async fn fetch(&self, uri: &str, url: &Url) -> CertifyResult<Vec<u8>> {
        debug!(url = %url, "fetching chart archive");

        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(uri, e))?;

        let status = response.status();
        match status.as_u16() {
            200..=299 => {}
            404 => {
                return Err(CertifyError::ChartNotFound {
                    uri: uri.to_string(),
                })
            }
            code => return Err(CertifyError::load(uri, format!("HTTP {}", code))),
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(uri));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| transport_error(uri, e))?
        {
            if (body.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(self.too_large(uri));
            }
            body.extend_from_slice(&chunk);
        }

        debug!(url = %url, bytes = body.len(), "chart archive downloaded");
        Ok(body)
    }

    fn too_large(&self, uri: &str) -> CertifyError {
        CertifyError::load(
            uri,
            format!("chart archive exceeds {} bytes", self.max_bytes),
        )
    }
}

fn transport_error(uri: &str, err: reqwest::Error) -> CertifyError {
    if err.is_timeout() {
        CertifyError::load(uri, "request timed out")
    } else {
        CertifyError::load(uri, err)
    }
}
