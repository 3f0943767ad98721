use domain::{AnalysisRequest, AnalysisResponse, AnalysisTransport, SyncError};
use reqwest::Client;
use shared::types::Result;
use shared::utils::truncate_for_log;
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;

/// HTTP transport to the analysis service: one JSON POST per turn.
#[derive(Clone)]
pub struct AnalysisClient {
    client: Arc<Client>,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(config: &Config) -> Result<Self> {
        // No request timeout: a turn lasts as long as the transport allows.
        let client = Client::builder()
            .user_agent(concat!("newslens/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client: Arc::new(client),
            endpoint: config.endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: AnalysisRequest) -> std::result::Result<AnalysisResponse, SyncError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            history_len = request.history.len(),
            bootstrap = request.is_bootstrap(),
            "sending analysis request"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| SyncError::TransportFailure(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::TransportFailure(e.to_string()))?;
        if !status.is_success() {
            tracing::debug!(%status, body = %truncate_for_log(&text, 200), "service returned an error status");
            return Err(SyncError::TransportFailure(format!("HTTP {}", status.as_u16())));
        }
        AnalysisResponse::from_body(&text)
    }
}

impl AnalysisTransport for AnalysisClient {
    fn send(
        &self,
        request: AnalysisRequest,
    ) -> impl Future<Output = std::result::Result<AnalysisResponse, SyncError>> + Send {
        self.post(request)
    }
}
