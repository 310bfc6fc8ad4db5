//! Reporting service HTTP client
//!
//! Thin `reqwest` wrapper: builds the authenticated envelope, POSTs it, and
//! hands status + body to the classifiers in `dto`.

use super::batch::Dataset;
use super::dto::{
    classify_options_response, parse_dataset_body, ApiFilters, Envelope, OptionsOutcome,
    OptionsRequest,
};
use super::error::{ReportingError, ReportingResult};
use super::ReportingApi;
use crate::config::ApiConfig;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Path of the option-list endpoint
const OPTIONS_ENDPOINT: &str = "UsersChoice";

/// Reporting service client
pub struct ReportingClient {
    client: Client,
    config: ApiConfig,
}

impl ReportingClient {
    /// Create a client with the given configuration
    pub fn new(config: ApiConfig) -> ReportingResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// POST `data` in the authenticated envelope; returns status and body
    async fn post<T: Serialize + Send + Sync>(&self, path: &str, data: T) -> ReportingResult<(u16, String)> {
        let envelope = Envelope {
            user_name: &self.config.username,
            password: &self.config.password,
            data,
        };

        let response = self
            .client
            .post(self.url(path))
            .json(&envelope)
            .send()
            .await
            .map_err(ReportingError::from_transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(ReportingError::from_transport)?;
        Ok((status, body))
    }
}

#[async_trait]
impl ReportingApi for ReportingClient {
    async fn fetch_options(&self, request: &OptionsRequest) -> ReportingResult<OptionsOutcome> {
        let payload = request.payload(&self.config.user_id);
        tracing::debug!(filter = %request.target, payload = ?payload, "Requesting filter options");

        let (status, body) = self.post(OPTIONS_ENDPOINT, payload).await?;
        classify_options_response(request.target, status, &body)
    }

    async fn fetch_dataset(&self, dataset: Dataset, filters: &ApiFilters) -> ReportingResult<Vec<Value>> {
        let (status, body) = self.post(dataset.endpoint(), filters.payload()).await?;

        if !(200..300).contains(&status) {
            return Err(ReportingError::ApiError {
                status,
                message: body,
            });
        }

        parse_dataset_body(&body)
    }
}
