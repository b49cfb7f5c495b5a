//! Clients for the three external services an analysis depends on.
//!
//! The session controller only sees the traits below; `BackendClient` (fetch and
//! summary) and `ClassifierClient` are the reqwest implementations.
use async_trait::async_trait;
use reqwest::{Client, Request};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{Post, SentimentVerdict};

pub mod backend;
pub mod classifier;
pub mod model;

pub use backend::BackendClient;
pub use classifier::ClassifierClient;
pub use model::{FetchQuery, SummaryRequest};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: u16,
        detail: Option<String>,
    },
    #[error("failed to reach {endpoint}: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("could not build {endpoint} request: {reason}")]
    InvalidRequest {
        endpoint: &'static str,
        reason: String,
    },
}

impl GatewayError {
    /// Server-supplied `error` text, when the service sent one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

#[async_trait]
pub trait FetchGateway: Send + Sync {
    async fn fetch_posts(&self, query: &FetchQuery) -> Result<Vec<Post>, GatewayError>;
}

#[async_trait]
pub trait ClassifierGateway: Send + Sync {
    async fn classify(&self, texts: &[String]) -> Result<SentimentVerdict, GatewayError>;
}

#[async_trait]
pub trait SummarizerGateway: Send + Sync {
    async fn summarize(&self, request: &SummaryRequest<'_>) -> Result<String, GatewayError>;
}

pub(crate) fn http_client(user_agent: &str) -> Result<Client, GatewayError> {
    Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|err| GatewayError::InvalidRequest {
            endpoint: "client",
            reason: err.to_string(),
        })
}

/// Execute `request` and decode a JSON body, mapping non-2xx responses to
/// `GatewayError::Status` with the body's `error` field as detail.
pub(crate) async fn execute_json<T: DeserializeOwned>(
    http: &Client,
    request: Request,
    endpoint: &'static str,
) -> Result<T, GatewayError> {
    debug!(url = %request.url(), method = %request.method(), "sending gateway request");
    let res = http
        .execute(request)
        .await
        .map_err(|source| GatewayError::Transport { endpoint, source })?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        let detail = error_detail(&body);
        warn!(endpoint, %status, ?detail, "gateway returned an error status");
        return Err(GatewayError::Status {
            endpoint,
            status: status.as_u16(),
            detail,
        });
    }

    let body = res.text().await.map_err(|err| GatewayError::Decode {
        endpoint,
        reason: err.to_string(),
    })?;
    serde_json::from_str(&body).map_err(|err| GatewayError::Decode {
        endpoint,
        reason: err.to_string(),
    })
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<model::ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .filter(|e| !e.trim().is_empty())
}
