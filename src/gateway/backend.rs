use async_trait::async_trait;
use reqwest::{Client, Url};
use std::fmt;

use super::model::{flatten_posts, FetchQuery, FetchResponse, SummaryRequest, SummaryResponse};
use super::{execute_json, http_client, FetchGateway, GatewayError, SummarizerGateway};
use crate::model::Post;

const FETCH_ENDPOINT: &str = "fetch";
const SUMMARY_ENDPOINT: &str = "generateSummary";

/// Client for the post-fetching and summary backend.
#[derive(Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl BackendClient {
    pub fn new(base_url: Url, user_agent: &str) -> Result<Self, GatewayError> {
        Ok(Self {
            http: http_client(user_agent)?,
            base_url: with_trailing_slash(base_url),
        })
    }

    pub fn build_fetch_request(&self, query: &FetchQuery) -> Result<reqwest::Request, GatewayError> {
        let endpoint = join(&self.base_url, FETCH_ENDPOINT)?;
        let limit = query.limit.to_string();
        self.http
            .get(endpoint)
            .query(&[
                ("keyword", query.keyword.as_str()),
                ("limit", limit.as_str()),
                ("filter", query.filter.as_str()),
            ])
            .build()
            .map_err(|err| GatewayError::InvalidRequest {
                endpoint: FETCH_ENDPOINT,
                reason: err.to_string(),
            })
    }

    pub fn build_summary_request(
        &self,
        request: &SummaryRequest<'_>,
    ) -> Result<reqwest::Request, GatewayError> {
        let endpoint = join(&self.base_url, SUMMARY_ENDPOINT)?;
        self.http
            .post(endpoint)
            .json(request)
            .build()
            .map_err(|err| GatewayError::InvalidRequest {
                endpoint: SUMMARY_ENDPOINT,
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl FetchGateway for BackendClient {
    async fn fetch_posts(&self, query: &FetchQuery) -> Result<Vec<Post>, GatewayError> {
        let request = self.build_fetch_request(query)?;
        let payload: FetchResponse = execute_json(&self.http, request, FETCH_ENDPOINT).await?;
        flatten_posts(payload.posts).map_err(|err| GatewayError::Decode {
            endpoint: FETCH_ENDPOINT,
            reason: err.to_string(),
        })
    }
}

#[async_trait]
impl SummarizerGateway for BackendClient {
    async fn summarize(&self, request: &SummaryRequest<'_>) -> Result<String, GatewayError> {
        let http_request = self.build_summary_request(request)?;
        let payload: SummaryResponse =
            execute_json(&self.http, http_request, SUMMARY_ENDPOINT).await?;
        Ok(payload.summary)
    }
}

pub(crate) fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

pub(crate) fn join(base: &Url, endpoint: &'static str) -> Result<Url, GatewayError> {
    base.join(endpoint)
        .map_err(|err| GatewayError::InvalidRequest {
            endpoint,
            reason: err.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{SentimentVerdict, TimeFilter};

    fn client(base: &str) -> BackendClient {
        BackendClient::new(Url::parse(base).unwrap(), "sentiscope-test").unwrap()
    }

    #[test]
    fn fetch_request_carries_query_parameters() {
        let client = client("http://localhost:5000");
        let request = client
            .build_fetch_request(&FetchQuery {
                keyword: "rust lang".into(),
                limit: 100,
                filter: TimeFilter::Week,
            })
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/fetch");
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("keyword".to_string(), "rust lang".to_string()),
                ("limit".to_string(), "100".to_string()),
                ("filter".to_string(), "week".to_string()),
            ]
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let client = client("https://example.test/api");
        let verdict = SentimentVerdict {
            label: "Positive".into(),
            positive_percentage: 60.0,
            negative_percentage: 40.0,
        };
        let request = client
            .build_summary_request(&SummaryRequest {
                keyword: "rust",
                sentiment: &verdict,
                posts: &[],
            })
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/api/generateSummary");
        assert_eq!(
            request
                .headers()
                .get("content-type")
                .and_then(|h| h.to_str().ok())
                .unwrap(),
            "application/json"
        );
    }
}
