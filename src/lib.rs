//! Keyword sentiment analysis client.
//!
//! A [`session::SessionController`] fetches posts for a keyword, classifies
//! their sentiment, requests a summary in the background and derives the
//! histogram, word cloud and page views from the result.

pub mod config;
pub mod error;
pub mod gateway;
pub mod markdown;
pub mod model;
pub mod profile;
pub mod report;
pub mod session;
pub mod views;
