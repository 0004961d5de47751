use std::time::Duration;

use reqwest::Url;
use scan_relay_common::config::HttpConfig;
use scan_relay_common::payload::DecodedPayload;
use tracing::{info, warn};

/// Result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportOutcome {
    Delivered { status: u16 },
    Failed { reason: String },
}

/// Delivers a payload to the remote collector. One attempt, no retry.
#[allow(async_fn_in_trait)]
pub trait Reporter {
    async fn report(&self, payload: &DecodedPayload) -> ReportOutcome;
}

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("invalid destination URL '{0}': {1}")]
    InvalidUrl(String, String),
    #[error("unsupported URL scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

/// POSTs `id=<payload>` as a form body to a fixed destination.
#[derive(Debug, Clone)]
pub struct HttpReporter {
    client: reqwest::Client,
    destination: Url,
}

impl HttpReporter {
    pub fn new(config: &HttpConfig) -> Result<Self, ReporterError> {
        let destination = Url::parse(&config.destination)
            .map_err(|e| ReporterError::InvalidUrl(config.destination.clone(), e.to_string()))?;
        match destination.scheme() {
            "http" | "https" => {}
            other => return Err(ReporterError::UnsupportedScheme(other.to_string())),
        }

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(ReporterError::Client)?;

        Ok(Self {
            client,
            destination,
        })
    }

    pub fn destination(&self) -> &Url {
        &self.destination
    }
}

impl Reporter for HttpReporter {
    async fn report(&self, payload: &DecodedPayload) -> ReportOutcome {
        // Form encoding: space becomes `+`, `~` becomes `%7E` and `*` stays literal,
        // where curl_easy_escape would give `%20`, `~` and `%2A`.
        let result = self
            .client
            .post(self.destination.clone())
            .form(&[("id", payload.as_str())])
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                info!(payload = %payload, status = %resp.status(), "HTTP OK");
                ReportOutcome::Delivered {
                    status: resp.status().as_u16(),
                }
            }
            Ok(resp) => {
                warn!(payload = %payload, status = %resp.status(), "collector rejected payload");
                ReportOutcome::Failed {
                    reason: format!("HTTP status {}", resp.status().as_u16()),
                }
            }
            Err(e) => {
                warn!(payload = %payload, error = %e, "HTTP error");
                ReportOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}
