use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::debug;

use super::catalog::{FunctionId, SectorId};
use super::resolver::{FunctionSource, SourceError};
use crate::config::BackendConfig;

/// `FunctionSource` backed by the compliance REST API.
#[derive(Debug, Clone)]
pub struct HttpFunctionSource {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    request_timeout: Duration,
}

impl HttpFunctionSource {
    pub fn new(config: &BackendConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| SourceError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str) -> Result<Value, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "GET");

        let mut request = self.client.get(&url);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| self.transport(err))?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| self.transport(err))
    }

    fn transport(&self, err: reqwest::Error) -> SourceError {
        if err.is_timeout() {
            SourceError::Timeout(self.request_timeout)
        } else {
            SourceError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl FunctionSource for HttpFunctionSource {
    async fn functions_by_sector(&self, sector: SectorId) -> Result<Value, SourceError> {
        self.get_json(&format!("/funcoes/setor/{sector}")).await
    }

    async fn function_by_id(&self, function: FunctionId) -> Result<Value, SourceError> {
        self.get_json(&format!("/funcoes/{function}")).await
    }
}
