// SPDX-License-Identifier: MIT

//! HTTP client against the Coordinator's control-plane API.
//! `swarmctl` is a thin client: every subcommand maps to one call here.

use sw_core::NodeId;
use sw_wire::{
    ControlAction, ControlRequest, ControlResponse, ErrorBody, HealthResponse, HistoryResponse,
    NodesResponse, QueueRequest, QueueResponse, StatusResponse,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach coordinator at {0}: {1}")]
    Unreachable(String, reqwest::Error),
    #[error("coordinator returned {status}: {message}")]
    Http { status: u16, message: String },
    #[error("malformed response from coordinator: {0}")]
    Decode(reqwest::Error),
}

pub struct SwarmClient {
    base_url: String,
    http: reqwest::Client,
}

impl SwarmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into().trim_end_matches('/').to_string(), http: reqwest::Client::new() }
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(url.clone(), e))?;
        Self::decode(response).await
    }

    async fn post<B: serde::Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Unreachable(url.clone(), e))?;
        Self::decode(response).await
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(ClientError::Http { status: status.as_u16(), message });
        }
        response.json::<T>().await.map_err(ClientError::Decode)
    }

    pub async fn health(&self) -> Result<HealthResponse, ClientError> {
        self.get("/api/v1/health", &[]).await
    }

    pub async fn status(&self) -> Result<StatusResponse, ClientError> {
        self.get("/api/v1/status", &[]).await
    }

    pub async fn fleet(&self, all: bool) -> Result<NodesResponse, ClientError> {
        self.get("/api/v1/nodes", &[("all", all.to_string())]).await
    }

    pub async fn history(&self, limit: Option<usize>, session: Option<String>) -> Result<HistoryResponse, ClientError> {
        let mut query = Vec::new();
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        if let Some(session) = session {
            query.push(("session", session));
        }
        self.get("/api/v1/history", &query).await
    }

    pub async fn queue_add(&self, packages: Vec<String>) -> Result<QueueResponse, ClientError> {
        self.post("/api/v1/queue", &QueueRequest { packages, portage_timestamp: None }).await
    }

    pub async fn control(&self, action: ControlAction, drone_id: Option<NodeId>) -> Result<ControlResponse, ClientError> {
        self.post("/api/v1/control", &ControlRequest { action, drone_id }).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_trims_trailing_slash_from_base_url() {
        let client = SwarmClient::new("http://127.0.0.1:8100/");
        assert_eq!(client.base_url, "http://127.0.0.1:8100");
    }

    #[test]
    fn new_leaves_bare_base_url_untouched() {
        let client = SwarmClient::new("http://127.0.0.1:8100");
        assert_eq!(client.base_url, "http://127.0.0.1:8100");
    }
}
