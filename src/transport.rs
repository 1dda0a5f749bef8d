use crate::error::{AnalysisError, Result};
use crate::orchestrator::{AnalysisFailure, AnalysisRequest, AnalysisResponse};
use crate::routes::{ANALYZE_PATH, COMPANIES_PATH};
use crate::scope::CompanyListing;
use crate::session::{AnalysisOutcome, AnalysisTransport};
use async_trait::async_trait;
use log::{error, warn};
use reqwest::Client;
use std::time::Duration;

fn transport_error(err: reqwest::Error) -> AnalysisError {
    AnalysisError::Transport(err.to_string())
}

/// Talks to a running analysis service over HTTP.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| AnalysisError::Configuration(format!("HTTP client setup failed: {}", e)))?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn post_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisOutcome> {
        let url = format!("{}{}", self.base_url, ANALYZE_PATH);
        let res = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if status.is_success() {
            let answer: AnalysisResponse = serde_json::from_str(&body).map_err(|e| {
                AnalysisError::Transport(format!("Malformed analysis response: {}", e))
            })?;
            return Ok(Ok(answer));
        }

        // Failure envelopes carry a displayable `response`; anything else is a transport problem.
        match serde_json::from_str::<AnalysisFailure>(&body) {
            Ok(failure) => Ok(Err(failure)),
            Err(_) => Err(AnalysisError::Transport(format!(
                "Unexpected response (status {}): {}",
                status, body
            ))),
        }
    }

    /// Companies the user may see, in name order, with the one to start on.
    pub async fn company_listing(&self, user_id: &str) -> Result<CompanyListing> {
        let url = format!("{}{}", self.base_url, COMPANIES_PATH);
        let res = self
            .client
            .get(&url)
            .query(&[("userId", user_id)])
            .send()
            .await
            .map_err(transport_error)?;
        let status = res.status();
        let body = res.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<AnalysisFailure>(&body)
                .map(|f| f.error)
                .unwrap_or(body);
            return Err(AnalysisError::Transport(format!(
                "Company listing failed (status {}): {}",
                status, message
            )));
        }

        serde_json::from_str(&body)
            .map_err(|e| AnalysisError::Transport(format!("Malformed company listing: {}", e)))
    }
}

#[async_trait]
impl AnalysisTransport for HttpTransport {
    async fn analyze(&self, request: &AnalysisRequest) -> AnalysisOutcome {
        match self.post_analysis(request).await {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(failure)) => {
                warn!("Analysis service returned an error: {}", failure.error);
                Err(failure)
            }
            Err(err) => {
                error!("Analysis request did not complete: {}", err);
                Err(AnalysisFailure::from_error(&err))
            }
        }
    }
}
