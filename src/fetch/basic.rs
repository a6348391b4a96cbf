use std::time::Duration;

use async_trait::async_trait;

use super::client::HttpClient;
use crate::error::Result;

/// Plain `reqwest`-backed client with bounded request and connect timeouts.
/// The timeout is the only cancellation mechanism in the collector.
#[derive(Debug)]
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self(client))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
