// MIT License

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE, REFERER};
use tracing::{debug, trace};

use crate::config::ModuleConfig;
use crate::error::{ParadoxError, Result};

/// One blocking-style GET against the IP module.
///
/// `referer` is the *path* of the previous request; implementations expand
/// it to a full URL. `pre_delay` is slept before the request is issued
/// (the module's wait page requires a fixed inter-poll gap).
///
/// Success is strictly HTTP 200; anything else, including transport-level
/// failures, surfaces as `TransportFailure`.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn get(&self, path: &str, referer: Option<&str>, pre_delay: Duration)
    -> Result<String>;
}

/// `reqwest`-backed transport for the module's embedded HTTP server.
///
/// The server is lwIP-era plain HTTP: no TLS, no redirects worth
/// following, and it chokes on compressed responses, so every request
/// pins `Accept-Encoding: identity`. Connections are reused by the
/// underlying pool across requests within a session.
pub struct HttpTransport {
    client: reqwest::Client,
    hostname: String,
}

impl HttpTransport {
    pub fn new(config: &ModuleConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ParadoxError::TransportFailure {
                details: format!("client build failed: {e}"),
            })?;
        Ok(Self {
            client,
            hostname: config.hostname.clone(),
        })
    }

    fn url_for(&self, path: &str) -> String {
        format!("http://{}/{}", self.hostname, path)
    }
}

impl Transport for HttpTransport {
    async fn get(
        &self,
        path: &str,
        referer: Option<&str>,
        pre_delay: Duration,
    ) -> Result<String> {
        if !pre_delay.is_zero() {
            tokio::time::sleep(pre_delay).await;
        }

        let url = self.url_for(path);
        debug!("GET {}", url);

        let mut request = self
            .client
            .get(&url)
            .header(ACCEPT_ENCODING, "identity")
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5");
        if let Some(prev) = referer {
            request = request.header(REFERER, self.url_for(prev));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ParadoxError::TransportFailure {
                details: format!("GET {path}: {e}"),
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ParadoxError::TransportFailure {
                details: format!("GET {path}: unexpected status {status}"),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| ParadoxError::TransportFailure {
                details: format!("GET {path}: body read failed: {e}"),
            })?;
        trace!("GET {} -> {} bytes", path, body.len());
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_construction() {
        let config = ModuleConfig::builder().hostname("192.168.1.123").build();
        let transport = HttpTransport::new(&config).unwrap();
        assert_eq!(
            transport.url_for("login_page.html"),
            "http://192.168.1.123/login_page.html"
        );
    }
}
