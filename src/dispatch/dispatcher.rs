use crate::config::AnalyticsConfig;
use crate::event::{Environment, EventPayload};
use anyhow::{bail, Context, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Production collection endpoint.
const COLLECT_ENDPOINT: &str = "https://www.google-analytics.com/mp/collect";

/// Validation endpoint used in debug builds; responses describe why an
/// event would be rejected instead of silently accepting it.
const DEBUG_ENDPOINT: &str = "https://www.google-analytics.com/debug/mp/collect";

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Sends event payloads to the collection endpoint.
///
/// One JSON POST per event, no retry, no backoff. The measurement id and
/// shared secret travel in the query string.
pub struct Dispatcher {
    client: Client,
    endpoint: String,
    measurement_id: String,
    api_secret: String,
    debug_mode: bool,
}

impl Dispatcher {
    pub fn new(
        config: &AnalyticsConfig,
        environment: &Environment,
        debug_mode: bool,
    ) -> Result<Self> {
        let endpoint = config.endpoint.clone().unwrap_or_else(|| {
            if debug_mode {
                DEBUG_ENDPOINT.to_string()
            } else {
                COLLECT_ENDPOINT.to_string()
            }
        });

        // A browser-like User-Agent lets the collector parse OS and device
        // family; Accept-Language feeds its locale demographics.
        let user_agent = format!(
            "Mozilla/5.0 (compatible) Scribe/{}",
            environment.app_version
        );

        let mut builder = Client::builder().user_agent(user_agent).timeout(SEND_TIMEOUT);

        if let Ok(value) = reqwest::header::HeaderValue::from_str(&environment.language) {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(reqwest::header::ACCEPT_LANGUAGE, value);
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .context("Failed to build analytics HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            measurement_id: config.measurement_id.clone(),
            api_secret: config.api_secret.clone(),
            debug_mode,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one payload. Transport failures and non-2xx statuses come back
    /// as errors for the worker to log and drop.
    pub async fn send(&self, payload: &EventPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("measurement_id", self.measurement_id.as_str()),
                ("api_secret", self.api_secret.as_str()),
            ])
            .json(payload)
            .send()
            .await
            .context("Failed to reach collection endpoint")?;

        let status = response.status();

        // The debug endpoint returns a validation report worth logging
        if self.debug_mode {
            match response.text().await {
                Ok(body) => debug!("Collector responded {}: {}", status, body),
                Err(e) => debug!("Collector responded {}; body unreadable: {}", status, e),
            }
        }

        if !status.is_success() {
            bail!("Collection endpoint returned {}", status);
        }

        Ok(())
    }
}
