//! Errors surfaced by the analysis session. `Display` is the user-facing text.
use crate::model::Tab;
use std::fmt;
use thiserror::Error;

/// Which gateway call a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayCall {
    Fetch,
    Classify,
    Summarize,
}

impl fmt::Display for GatewayCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GatewayCall::Fetch => "fetch",
            GatewayCall::Classify => "classify",
            GatewayCall::Summarize => "summarize",
        })
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error("Please enter a keyword to analyze")]
    Validation,
    #[error("Guest users are limited to {limit} searches. Please sign up for unlimited access.")]
    QuotaExceeded { limit: u32 },
    #[error("An analysis is already in progress")]
    Busy,
    #[error("{message}")]
    Gateway { call: GatewayCall, message: String },
    #[error("{0}")]
    NoContent(&'static str),
    #[error("The {0} tab is not available in guest mode")]
    TabUnavailable(Tab),
}
