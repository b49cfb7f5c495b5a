use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One fetched post. `subreddit` is attached client-side from the community
/// key the post was grouped under.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Post {
    pub title: String,
    pub text: String,
    pub score: i64,
    pub num_comments: i64,
    pub url: String,
    pub author: String,
    pub created_utc: f64,
    pub is_video: bool,
    pub upvote_ratio: f64,
    pub subreddit: String,
}

impl Post {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created_utc as i64, 0).single()
    }

    /// Text used when classifying posts of a recency-filtered search: the body,
    /// or the title when the body is blank.
    pub fn classification_text(&self) -> Option<&str> {
        [self.text.as_str(), self.title.as_str()]
            .into_iter()
            .find(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SentimentVerdict {
    #[serde(rename = "sentiment")]
    pub label: String,
    pub positive_percentage: f64,
    pub negative_percentage: f64,
}

/// Colour bucket for the positive-share gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gauge {
    Good,
    Mid,
    Bad,
}

impl Gauge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gauge::Good => "good",
            Gauge::Mid => "mid",
            Gauge::Bad => "bad",
        }
    }
}

impl SentimentVerdict {
    pub fn gauge(&self) -> Gauge {
        if self.positive_percentage > 70.0 {
            Gauge::Good
        } else if self.positive_percentage >= 50.0 {
            Gauge::Mid
        } else {
            Gauge::Bad
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    #[default]
    All,
    Day,
    Week,
    Month,
    Year,
}

impl TimeFilter {
    pub const ALL: [TimeFilter; 5] = [
        TimeFilter::All,
        TimeFilter::Day,
        TimeFilter::Week,
        TimeFilter::Month,
        TimeFilter::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFilter::All => "all",
            TimeFilter::Day => "day",
            TimeFilter::Week => "week",
            TimeFilter::Month => "month",
            TimeFilter::Year => "year",
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, TimeFilter::All)
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeFilter::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown time filter '{s}' (expected all|day|week|month|year)"))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Sentiment,
    Posts,
    Summary,
    Visualization,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Sentiment => "sentiment",
            Tab::Posts => "posts",
            Tab::Summary => "summary",
            Tab::Visualization => "visualization",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sentiment" => Ok(Tab::Sentiment),
            "posts" => Ok(Tab::Posts),
            "summary" => Ok(Tab::Summary),
            "visualization" | "viz" => Ok(Tab::Visualization),
            other => Err(format!("unknown tab '{other}'")),
        }
    }
}

/// Who is running the session. Guests get a bounded number of searches and
/// no summary or word cloud; authenticated users are tracked in the profile store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Guest,
    Authenticated { user_id: String },
}

impl Mode {
    pub fn is_guest(&self) -> bool {
        matches!(self, Mode::Guest)
    }

    pub fn user_id(&self) -> Option<&str> {
        match self {
            Mode::Guest => None,
            Mode::Authenticated { user_id } => Some(user_id),
        }
    }
}
