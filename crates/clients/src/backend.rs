use anyhow::{Context, Result};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;
use wayfind_core::{BackendHealth, BackendResponse, PipelineError};

use crate::config::ClientConfig;

pub const MAX_RESULTS_LIMIT: usize = 10;

/// Custom backend that turns free text into ranked, scored routes.
pub trait RoutePipeline: Send + Sync {
    async fn generate(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<BackendResponse, PipelineError>;

    async fn health(&self) -> Result<BackendHealth, PipelineError>;
}

#[derive(Debug, Serialize)]
struct GenerateRoutesRequest<'a> {
    user_prompt: &'a str,
    max_results: usize,
}

#[derive(Debug, Clone)]
pub struct HttpRoutePipeline {
    client: Client,
    base_url: Url,
}

impl HttpRoutePipeline {
    pub fn new(client: Client, mut base_url: Url) -> Self {
        // `Url::join` replaces the last segment unless the path ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self { client, base_url }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.backend_url)
            .with_context(|| format!("invalid backend url {}", config.backend_url))?;
        Ok(Self::new(config.backend_http_client()?, base_url))
    }

    fn endpoint(&self, path: &str) -> Result<Url, PipelineError> {
        self.base_url
            .join(path)
            .map_err(|err| PipelineError::Transport(format!("invalid backend endpoint: {err}")))
    }
}

impl RoutePipeline for HttpRoutePipeline {
    #[instrument(skip(self, text), fields(request_id = %Uuid::new_v4()))]
    async fn generate(
        &self,
        text: &str,
        max_results: usize,
    ) -> Result<BackendResponse, PipelineError> {
        let request = GenerateRoutesRequest {
            user_prompt: text,
            max_results: max_results.clamp(1, MAX_RESULTS_LIMIT),
        };

        let response = self
            .client
            .post(self.endpoint("generate-routes")?)
            .json(&request)
            .send()
            .await
            .map_err(pipeline_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "backend rejected route generation");
            return Err(PipelineError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: BackendResponse = response
            .json()
            .await
            .map_err(|err| PipelineError::Malformed(err.to_string()))?;

        info!(
            routes = body.routes.len(),
            waypoints_found = body.metadata.waypoints_found,
            total_generated = body.metadata.total_generated,
            processing_time_seconds = body.processing_time_seconds,
            "backend routes received"
        );
        classify_response(body)
    }

    async fn health(&self) -> Result<BackendHealth, PipelineError> {
        let response = self
            .client
            .get(self.endpoint("health")?)
            .send()
            .await
            .map_err(pipeline_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Status {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        response
            .json()
            .await
            .map_err(|err| PipelineError::Malformed(err.to_string()))
    }
}

fn pipeline_transport_error(err: reqwest::Error) -> PipelineError {
    if err.is_timeout() {
        PipelineError::Timeout
    } else {
        PipelineError::Transport(err.to_string())
    }
}

/// An empty result is an error; why it is empty decides which one.
pub fn classify_response(body: BackendResponse) -> Result<BackendResponse, PipelineError> {
    if !body.routes.is_empty() {
        return Ok(body);
    }
    if body.metadata.waypoints_found == 0 {
        Err(PipelineError::NoWaypoints)
    } else {
        Err(PipelineError::NoRoutes)
    }
}
