use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::{Post, SentimentVerdict, TimeFilter};

/// Parameters of a `GET /fetch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchQuery {
    pub keyword: String,
    pub limit: u32,
    pub filter: TimeFilter,
}

/// `{ posts: { <community>: [RawPost, ..] } }`; other fields are ignored.
#[derive(Deserialize, Debug, Default)]
pub struct FetchResponse {
    #[serde(default)]
    pub posts: Map<String, Value>,
}

#[derive(Serialize, Debug)]
pub struct PredictRequest<'a> {
    pub texts: &'a [String],
}

pub type PredictResponse = SentimentVerdict;

#[derive(Serialize, Debug)]
pub struct SummaryRequest<'a> {
    pub keyword: &'a str,
    pub sentiment: &'a SentimentVerdict,
    pub posts: &'a [Post],
}

#[derive(Deserialize, Debug)]
pub struct SummaryResponse {
    pub summary: String,
}

/// Error body shape shared by the backend and the classifier.
#[derive(Deserialize, Debug)]
pub struct ErrorBody {
    pub error: Option<String>,
}

/// Flatten the per-community map into one list, in server order, tagging each
/// post with the key it was grouped under. Entries that are not arrays are skipped.
pub fn flatten_posts(posts: Map<String, Value>) -> Result<Vec<Post>, serde_json::Error> {
    let mut out = Vec::new();
    for (community, entries) in posts {
        let Value::Array(items) = entries else {
            continue;
        };
        for item in items {
            let mut post: Post = serde_json::from_value(item)?;
            post.subreddit = community.clone();
            out.push(post);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_tags_posts_with_their_community() {
        let resp: FetchResponse = serde_json::from_value(json!({
            "keyword": "rust",
            "posts": {
                "rust": [{"title": "a", "subreddit": "ignored"}, {"title": "b"}],
                "programming": [{"title": "c", "score": 4}],
                "broken": "not-a-list"
            }
        }))
        .unwrap();
        let posts = flatten_posts(resp.posts).unwrap();
        let tagged: Vec<(&str, &str)> = posts
            .iter()
            .map(|p| (p.subreddit.as_str(), p.title.as_str()))
            .collect();
        assert_eq!(
            tagged,
            vec![("rust", "a"), ("rust", "b"), ("programming", "c")]
        );
        assert_eq!(posts[2].score, 4);
    }

    #[test]
    fn missing_posts_field_is_empty() {
        let resp: FetchResponse = serde_json::from_str("{}").unwrap();
        assert!(flatten_posts(resp.posts).unwrap().is_empty());
    }
}
