//! HTTP liveness probe for the local node.

use anyhow::{Context, bail};
use async_trait::async_trait;
use promptc_runtime::HealthProbe;
use std::time::Duration;

/// `GET {base}{path}`; any 2xx counts as alive.
pub struct HttpProbe {
    target: String,
    url: String,
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(
        base_url: &str,
        liveness_path: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            target: base
                .trim_start_matches("http://")
                .trim_start_matches("https://")
                .to_string(),
            url: format!("{}{}", base, liveness_path),
            client: crate::http::client(timeout)?,
        })
    }
}

#[async_trait]
impl HealthProbe for HttpProbe {
    fn target(&self) -> String {
        self.target.clone()
    }

    async fn probe(&self) -> anyhow::Result<()> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("node unreachable at {}", self.target))?;

        let status = response.status();
        if !status.is_success() {
            bail!("node answered {} at {}", status.as_u16(), self.url);
        }
        Ok(())
    }
}
