use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;

use super::backend::{join, with_trailing_slash};
use super::model::{PredictRequest, PredictResponse};
use super::{execute_json, http_client, ClassifierGateway, GatewayError};
use crate::model::SentimentVerdict;

const PREDICT_ENDPOINT: &str = "predict";

/// Client for the sentiment-classification service.
#[derive(Clone)]
pub struct ClassifierClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for ClassifierClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassifierClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ClassifierClient {
    pub fn new(base_url: Url, user_agent: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(user_agent)?,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn build_request(&self, texts: &[String]) -> Result<reqwest::Request, GatewayError> {
        let endpoint = join(&self.base_url, PREDICT_ENDPOINT)?;
        self.http
            .post(endpoint)
            .json(&PredictRequest { texts })
            .build()
            .map_err(|err| GatewayError::InvalidRequest {
                endpoint: PREDICT_ENDPOINT,
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl ClassifierGateway for ClassifierClient {
    async fn classify(&self, texts: &[String]) -> Result<SentimentVerdict, GatewayError> {
        let request = self.build_request(texts)?;
        let verdict: PredictResponse = execute_json(&self.http, request, PREDICT_ENDPOINT).await?;
        Ok(verdict)
    }
}
