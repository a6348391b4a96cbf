use async_trait::async_trait;
use reqwest::{Request, Response};

/// Execution seam for outbound HTTP, so the collector can be driven by a
/// canned client in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
