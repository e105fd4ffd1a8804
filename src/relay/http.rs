//! Relay owned by a remote relay service, reached over HTTP
//!
//! The remote side exposes `POST /relay/blink`, `POST /relay/off` and
//! `GET /health`, and owns the auto-off timer itself.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use super::{RelayActuator, RelayError, RelayHealth};

#[derive(Debug, Serialize)]
struct BlinkRequest {
    duration_ms: u64,
}

#[derive(Debug, Clone)]
pub struct HttpRelay {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRelay {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post(&self, path: &str, body: Option<&BlinkRequest>) -> Result<(), RelayError> {
        let url = self.url(path);
        debug!("POST {}", url);

        let mut request = self.client.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(RelayError::Http(format!("{} returned {}: {}", url, status, text)));
        }
        Ok(())
    }
}

#[async_trait]
impl RelayActuator for HttpRelay {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn activate(&self, duration_ms: u64) -> Result<(), RelayError> {
        self.post("/relay/blink", Some(&BlinkRequest { duration_ms })).await?;
        info!("Relay service activated for {}ms", duration_ms);
        Ok(())
    }

    async fn deactivate(&self) -> Result<(), RelayError> {
        self.post("/relay/off", None).await
    }

    async fn health(&self) -> RelayHealth {
        let url = self.url("/health");
        match self.client.get(&url).send().await {
            Ok(response) if response.status().is_success() => {
                let detail = response.text().await.unwrap_or_default();
                RelayHealth::ok(self.name(), detail)
            }
            Ok(response) => RelayHealth::failed(self.name(), format!("{} returned {}", url, response.status())),
            Err(e) => RelayHealth::failed(self.name(), e.to_string()),
        }
    }
}
