//! HTTP client for the lead REST API.

use super::LeadBackend;
use crate::aggregate::PipelineStatistics;
use crate::config::BackendConfig;
use crate::error::{PipelineError, Result};
use crate::reorder::StageUpdate;
use crate::stage::StageId;
use crate::store::PipelineBoard;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use tracing::{debug, instrument, warn};
use url::Url;

/// Extract a human-readable message from a JSON error body.
///
/// Tries `detail`, then `message`, then `error`, then falls back to the raw body.
fn extract_error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(msg) = json.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }
    body.to_string()
}

#[derive(Debug, Serialize)]
struct StagePatch {
    sales_stage: StageId,
    pipeline_position: u32,
}

/// [`LeadBackend`] talking JSON over HTTP.
///
/// Endpoints, relative to the configured base URL:
/// - `GET leads/pipeline`
/// - `GET leads/pipeline/statistics`
/// - `PATCH leads/{id}/stage`
pub struct HttpLeadBackend {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpLeadBackend {
    /// Build a client from backend configuration
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        // Url::join replaces the last segment unless the base ends with '/'.
        let mut base = config.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        Ok(Self {
            client,
            base_url: Url::parse(&base)?,
            api_token: config.api_token.clone(),
        })
    }

    /// The base URL every endpoint is resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(path)?;
        let builder = self.client.request(method, url);
        Ok(match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    /// Split a response into success or (status, message)
    async fn check_response(response: Response) -> std::result::Result<Response, (u16, String)> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body);
        let message = if message.is_empty() {
            status.to_string()
        } else {
            message
        };
        Err((status.as_u16(), message))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path)?.send().await?;
        let response = Self::check_response(response)
            .await
            .map_err(|(status, message)| PipelineError::Backend { status, message })?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl LeadBackend for HttpLeadBackend {
    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn fetch_board(&self) -> Result<PipelineBoard> {
        let board: PipelineBoard = self.get_json("leads/pipeline").await?;
        debug!(leads = board.len(), "fetched pipeline board");
        Ok(board)
    }

    #[instrument(skip(self), fields(base = %self.base_url))]
    async fn fetch_statistics(&self) -> Result<PipelineStatistics> {
        self.get_json("leads/pipeline/statistics").await
    }

    #[instrument(skip(self), fields(lead = %update.lead_id, stage = %update.new_stage, position = update.new_position))]
    async fn update_lead_stage(&self, update: &StageUpdate) -> Result<()> {
        let path = format!(
            "leads/{}/stage",
            urlencoding::encode(update.lead_id.as_str())
        );
        let body = StagePatch {
            sales_stage: update.new_stage,
            pipeline_position: update.new_position,
        };

        let response = self
            .request(Method::PATCH, &path)?
            .json(&body)
            .send()
            .await
            .map_err(|e| PipelineError::remote(&update.lead_id, e.to_string()))?;

        match Self::check_response(response).await {
            Ok(_) => {
                debug!("stage update accepted");
                Ok(())
            }
            Err((status, message)) => {
                warn!(status, %message, "stage update rejected");
                Err(PipelineError::remote(
                    &update.lead_id,
                    format!("{status}: {message}"),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_error_message() {
        assert_eq!(extract_error_message(r#"{"detail": "Not allowed"}"#), "Not allowed");
        assert_eq!(extract_error_message(r#"{"message": "Gone"}"#), "Gone");
        assert_eq!(extract_error_message("plain text"), "plain text");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = BackendConfig {
            base_url: "https://shop.example.com/api".into(),
            ..BackendConfig::default()
        };
        let backend = HttpLeadBackend::new(&config).unwrap();
        assert_eq!(backend.base_url().as_str(), "https://shop.example.com/api/");
        assert_eq!(
            backend.base_url().join("leads/pipeline").unwrap().as_str(),
            "https://shop.example.com/api/leads/pipeline"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = BackendConfig {
            base_url: "::not a url::".into(),
            ..BackendConfig::default()
        };
        assert!(matches!(
            HttpLeadBackend::new(&config),
            Err(PipelineError::Url(_))
        ));
    }
}
