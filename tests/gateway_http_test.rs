use reqwest::Url;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use sentiscope::gateway::{
    BackendClient, ClassifierClient, ClassifierGateway, FetchGateway, FetchQuery, GatewayError,
    SummarizerGateway, SummaryRequest,
};
use sentiscope::model::{SentimentVerdict, TimeFilter};

fn backend(server: &MockServer) -> BackendClient {
    BackendClient::new(Url::parse(&server.uri()).unwrap(), "sentiscope-test").unwrap()
}

fn classifier(server: &MockServer) -> ClassifierClient {
    ClassifierClient::new(Url::parse(&server.uri()).unwrap(), "sentiscope-test").unwrap()
}

#[tokio::test]
async fn fetch_flattens_communities_in_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fetch"))
        .and(query_param("keyword", "rust"))
        .and(query_param("limit", "100"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": {
                "rust": [
                    { "title": "a", "text": "body", "score": 12, "author": "ferris" },
                    { "title": "b" }
                ],
                "programming": [{ "title": "c", "upvote_ratio": 0.5 }],
                "broken": "not a list"
            },
            "keyword": "rust"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let posts = backend(&server)
        .fetch_posts(&FetchQuery {
            keyword: "rust".into(),
            limit: 100,
            filter: TimeFilter::All,
        })
        .await
        .unwrap();

    let titles: Vec<(&str, &str)> = posts
        .iter()
        .map(|p| (p.subreddit.as_str(), p.title.as_str()))
        .collect();
    assert_eq!(titles, vec![("rust", "a"), ("rust", "b"), ("programming", "c")]);
    assert_eq!(posts[0].score, 12);
    assert_eq!(posts[0].author, "ferris");
    assert_eq!(posts[2].upvote_ratio, 0.5);
}

#[tokio::test]
async fn fetch_error_carries_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fetch"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({ "error": "Reddit API unavailable" })),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .fetch_posts(&FetchQuery {
            keyword: "rust".into(),
            limit: 50,
            filter: TimeFilter::Day,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Status { status: 500, .. }));
    assert_eq!(err.detail(), Some("Reddit API unavailable"));
}

#[tokio::test]
async fn error_status_without_json_body_has_no_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = classifier(&server)
        .classify(&["text".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.detail(), None);
}

#[tokio::test]
async fn classify_posts_texts_and_decodes_verdict() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .and(body_json(json!({ "texts": ["love it", "hate it"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sentiment": "Neutral",
            "positive_percentage": 50.0,
            "negative_percentage": 50.0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let verdict = classifier(&server)
        .classify(&["love it".to_string(), "hate it".to_string()])
        .await
        .unwrap();
    assert_eq!(
        verdict,
        SentimentVerdict {
            label: "Neutral".into(),
            positive_percentage: 50.0,
            negative_percentage: 50.0,
        }
    );
}

#[tokio::test]
async fn malformed_verdict_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "label": "Positive" })))
        .mount(&server)
        .await;

    let err = classifier(&server)
        .classify(&["x".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, GatewayError::Decode { .. }));
}

#[tokio::test]
async fn summary_posts_keyword_sentiment_and_posts() {
    let server = MockServer::start().await;
    let verdict = SentimentVerdict {
        label: "Positive".into(),
        positive_percentage: 72.5,
        negative_percentage: 27.5,
    };
    Mock::given(method("POST"))
        .and(path("/generateSummary"))
        .and(body_json(json!({
            "keyword": "rust",
            "sentiment": {
                "sentiment": "Positive",
                "positive_percentage": 72.5,
                "negative_percentage": 27.5
            },
            "posts": []
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "summary": "## Overview\n- fine" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = backend(&server)
        .summarize(&SummaryRequest {
            keyword: "rust",
            sentiment: &verdict,
            posts: &[],
        })
        .await
        .unwrap();
    assert_eq!(summary, "## Overview\n- fine");
}
