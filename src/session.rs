//! Analysis session controller.
//!
//! One controller owns the state of one keyword-analysis run at a time and
//! derives every view from it. Every submission bumps an epoch stored in the
//! state; background results (the summary) are applied only while their epoch is
//! still current.
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::{AnalysisError, GatewayCall};
use crate::gateway::{
    ClassifierGateway, FetchGateway, FetchQuery, GatewayError, SummarizerGateway, SummaryRequest,
};
use crate::model::{Mode, Post, SentimentVerdict, Tab, TimeFilter};
use crate::profile::ProfileStore;
use crate::views::{self, Page, SourceCount, WordCloudOptions, WordCount};

const FETCH_FAILED: &str = "Failed to fetch Reddit posts";
const FETCH_FILTERED_FAILED: &str = "Failed to fetch filtered Reddit posts";
const PREDICT_FAILED: &str = "Model prediction failed";
const GUEST_PREDICT_FAILED: &str = "Sentiment analysis failed";
const NO_POST_TEXT: &str = "No valid text found in posts for analysis";
const NO_GUEST_TEXT: &str = "No valid posts found for sentiment analysis";

/// The external services a session talks to.
#[derive(Clone)]
pub struct Gateways {
    pub fetch: Arc<dyn FetchGateway>,
    pub classifier: Arc<dyn ClassifierGateway>,
    pub summarizer: Arc<dyn SummarizerGateway>,
    /// Only used in authenticated mode.
    pub profiles: Option<Arc<dyn ProfileStore>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub page_size: usize,
    pub fetch_limit: u32,
    pub guest_search_limit: u32,
    pub guest_classify_texts: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            page_size: 10,
            fetch_limit: 100,
            guest_search_limit: 3,
            guest_classify_texts: 20,
        }
    }
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Results or a new page are ready; bring the results region into view.
    RevealResults { epoch: u64 },
    SummaryReady { epoch: u64 },
    SummaryFailed { epoch: u64 },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub query: String,
    pub time_filter: TimeFilter,
    pub posts: Arc<Vec<Post>>,
    pub verdict: Option<SentimentVerdict>,
    pub summary: Option<String>,
    pub loading: bool,
    pub summary_loading: bool,
    pub error: Option<String>,
    pub active_tab: Tab,
    pub page: usize,
    /// Generation of the submission the results belong to.
    pub epoch: u64,
    /// Submissions that completed successfully in this session.
    pub completed: u32,
}

impl SessionState {
    fn new() -> Self {
        Self {
            page: 1,
            ..Default::default()
        }
    }

    /// Clear every result field for a new submission and return its epoch.
    fn begin(&mut self, query: &str, filter: TimeFilter) -> u64 {
        self.epoch += 1;
        self.query = query.to_string();
        self.time_filter = filter;
        self.posts = Arc::new(Vec::new());
        self.verdict = None;
        self.summary = None;
        self.summary_loading = false;
        self.error = None;
        self.loading = true;
        self.page = 1;
        self.active_tab = Tab::Sentiment;
        self.epoch
    }

    pub fn has_results(&self) -> bool {
        self.verdict.is_some() || !self.posts.is_empty() || self.summary.is_some()
    }
}

/// Views recomputed once per submission.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedViews {
    pub histogram: Vec<SourceCount>,
    /// `None` in guest mode.
    pub word_cloud: Option<Vec<WordCount>>,
}

/// A page of posts, owned so it can outlive the state lock.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub number: usize,
    pub total_pages: usize,
    pub offset: usize,
    pub posts: Vec<Post>,
}

impl From<Page<'_>> for PostPage {
    fn from(page: Page<'_>) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages,
            offset: page.offset,
            posts: page.items.to_vec(),
        }
    }
}

struct Shared {
    gateways: Gateways,
    mode: Mode,
    options: SessionOptions,
    state: Mutex<SessionState>,
    /// Views keyed by the post collection they were computed from.
    views: Mutex<Option<(Arc<Vec<Post>>, Arc<DerivedViews>)>>,
    background: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Clone)]
pub struct SessionController {
    shared: Arc<Shared>,
}

impl SessionController {
    pub fn new(gateways: Gateways, mode: Mode, options: SessionOptions) -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            shared: Arc::new(Shared {
                gateways,
                mode,
                options,
                state: Mutex::new(SessionState::new()),
                views: Mutex::new(None),
                background: Mutex::new(Vec::new()),
                events,
            }),
        }
    }

    pub fn mode(&self) -> &Mode {
        &self.shared.mode
    }

    pub fn options(&self) -> &SessionOptions {
        &self.shared.options
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.shared.events.subscribe()
    }

    pub async fn snapshot(&self) -> SessionState {
        self.shared.state.lock().await.clone()
    }

    /// Remaining searches for a guest; `None` when authenticated.
    pub async fn remaining_searches(&self) -> Option<u32> {
        if !self.shared.mode.is_guest() {
            return None;
        }
        let completed = self.shared.state.lock().await.completed;
        Some(self.shared.options.guest_search_limit.saturating_sub(completed))
    }

    /// Run one analysis: reset the session, call the fetch and classifier
    /// gateways, store posts and verdict together, then start the summary and
    /// usage tracking in the background.
    #[instrument(skip(self))]
    pub async fn submit_analysis(
        &self,
        query: &str,
        filter: TimeFilter,
    ) -> Result<(), AnalysisError> {
        let query = query.trim();
        let epoch = {
            let mut state = self.shared.state.lock().await;
            if state.loading {
                return Err(AnalysisError::Busy);
            }
            let limit = self.shared.options.guest_search_limit;
            if self.shared.mode.is_guest() && state.completed >= limit {
                let err = AnalysisError::QuotaExceeded { limit };
                state.error = Some(err.to_string());
                return Err(err);
            }
            if query.is_empty() {
                let err = AnalysisError::Validation;
                state.error = Some(err.to_string());
                return Err(err);
            }
            state.begin(query, filter)
        };
        info!(epoch, query, %filter, "analysis started");

        let mut guard = LoadingGuard {
            shared: Arc::clone(&self.shared),
            epoch,
            armed: true,
        };
        let outcome = self.run_gateways(query, filter).await;

        let (posts, verdict) = {
            let mut state = self.shared.state.lock().await;
            guard.armed = false;
            state.loading = false;
            match outcome {
                Err(err) => {
                    warn!(epoch, error = %err, "analysis failed");
                    state.error = Some(err.to_string());
                    return Err(err);
                }
                Ok((posts, verdict)) => {
                    let posts = Arc::new(posts);
                    state.posts = Arc::clone(&posts);
                    state.verdict = Some(verdict.clone());
                    state.completed += 1;
                    state.summary_loading = !self.shared.mode.is_guest();
                    info!(epoch, posts = posts.len(), sentiment = %verdict.label, "analysis complete");
                    (posts, verdict)
                }
            }
        };

        self.emit(SessionEvent::RevealResults { epoch });
        if !self.shared.mode.is_guest() {
            self.spawn_summary(epoch, query.to_string(), verdict, posts)
                .await;
            self.spawn_tracking(query.to_string()).await;
        }
        Ok(())
    }

    async fn run_gateways(
        &self,
        query: &str,
        filter: TimeFilter,
    ) -> Result<(Vec<Post>, SentimentVerdict), AnalysisError> {
        let gw = &self.shared.gateways;
        let fetch = FetchQuery {
            keyword: query.to_string(),
            limit: self.shared.options.fetch_limit,
            filter,
        };

        if self.shared.mode.is_guest() {
            let posts = gw
                .fetch
                .fetch_posts(&fetch)
                .await
                .map_err(|err| gateway_failure(GatewayCall::Fetch, err, FETCH_FAILED))?;
            let texts = guest_texts(&posts, self.shared.options.guest_classify_texts);
            if texts.is_empty() {
                return Err(AnalysisError::NoContent(NO_GUEST_TEXT));
            }
            let verdict = self.classify(&texts, GUEST_PREDICT_FAILED).await?;
            return Ok((posts, verdict));
        }

        if filter.is_unrestricted() {
            // The bare keyword is classified here, not the fetched posts.
            let verdict = self.classify(&[query.to_string()], PREDICT_FAILED).await?;
            let posts = gw
                .fetch
                .fetch_posts(&fetch)
                .await
                .map_err(|err| gateway_failure(GatewayCall::Fetch, err, FETCH_FAILED))?;
            Ok((posts, verdict))
        } else {
            let posts = gw
                .fetch
                .fetch_posts(&fetch)
                .await
                .map_err(|err| gateway_failure(GatewayCall::Fetch, err, FETCH_FILTERED_FAILED))?;
            let texts: Vec<String> = posts
                .iter()
                .filter_map(Post::classification_text)
                .map(str::to_string)
                .collect();
            if texts.is_empty() {
                return Err(AnalysisError::NoContent(NO_POST_TEXT));
            }
            let verdict = self.classify(&texts, PREDICT_FAILED).await?;
            Ok((posts, verdict))
        }
    }

    async fn classify(
        &self,
        texts: &[String],
        fallback: &str,
    ) -> Result<SentimentVerdict, AnalysisError> {
        self.shared
            .gateways
            .classifier
            .classify(texts)
            .await
            .map_err(|err| gateway_failure(GatewayCall::Classify, err, fallback))
    }

    async fn spawn_summary(
        &self,
        epoch: u64,
        keyword: String,
        verdict: SentimentVerdict,
        posts: Arc<Vec<Post>>,
    ) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let request = SummaryRequest {
                keyword: &keyword,
                sentiment: &verdict,
                posts: &posts,
            };
            let outcome = shared.gateways.summarizer.summarize(&request).await;

            let mut state = shared.state.lock().await;
            if state.epoch != epoch {
                debug!(epoch, current = state.epoch, "discarding stale summary");
                return;
            }
            state.summary_loading = false;
            let event = match outcome {
                Ok(summary) => {
                    state.summary = Some(summary);
                    SessionEvent::SummaryReady { epoch }
                }
                Err(err) => {
                    warn!(epoch, error = %err, "summary generation failed");
                    SessionEvent::SummaryFailed { epoch }
                }
            };
            drop(state);
            let _ = shared.events.send(event);
        });
        self.track(handle).await;
    }

    async fn spawn_tracking(&self, query: String) {
        let (Some(store), Some(user_id)) = (
            self.shared.gateways.profiles.clone(),
            self.shared.mode.user_id().map(str::to_string),
        ) else {
            return;
        };
        let handle = tokio::spawn(async move {
            if let Err(err) = store.record_analysis(&user_id, &query).await {
                warn!(?err, user_id = %user_id, "failed to record analysis");
            }
        });
        self.track(handle).await;
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let mut background = self.shared.background.lock().await;
        background.retain(|h| !h.is_finished());
        background.push(handle);
    }

    /// Wait for every background task started so far.
    pub async fn settle(&self) {
        let handles = std::mem::take(&mut *self.shared.background.lock().await);
        for res in join_all(handles).await {
            if let Err(err) = res {
                warn!(?err, "background task failed");
            }
        }
    }

    pub async fn select_tab(&self, tab: Tab) -> Result<(), AnalysisError> {
        if tab == Tab::Summary && self.shared.mode.is_guest() {
            return Err(AnalysisError::TabUnavailable(tab));
        }
        self.shared.state.lock().await.active_tab = tab;
        Ok(())
    }

    /// Move to page `n`, clamped into range. Returns the page actually selected.
    pub async fn set_page(&self, n: usize) -> usize {
        let (page, epoch) = {
            let mut state = self.shared.state.lock().await;
            state.page = views::clamp_page(n, state.posts.len(), self.shared.options.page_size);
            (state.page, state.epoch)
        };
        self.emit(SessionEvent::RevealResults { epoch });
        page
    }

    pub async fn current_page(&self) -> PostPage {
        let state = self.shared.state.lock().await;
        views::paginate(&state.posts, state.page, self.shared.options.page_size).into()
    }

    /// Histogram and word cloud for the current posts, computed once per
    /// post collection.
    pub async fn derived_views(&self) -> Arc<DerivedViews> {
        let posts = Arc::clone(&self.shared.state.lock().await.posts);
        let mut cache = self.shared.views.lock().await;
        if let Some((cached_posts, cached)) = cache.as_ref() {
            if Arc::ptr_eq(cached_posts, &posts) {
                return Arc::clone(cached);
            }
        }
        let computed = Arc::new(DerivedViews {
            histogram: views::histogram_by_source(&posts),
            word_cloud: (!self.shared.mode.is_guest())
                .then(|| views::word_frequencies(&posts, WordCloudOptions::default())),
        });
        *cache = Some((posts, Arc::clone(&computed)));
        computed
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.shared.events.send(event);
    }
}

/// Clears `loading` if a submission is dropped before its gateway calls finish.
struct LoadingGuard {
    shared: Arc<Shared>,
    epoch: u64,
    armed: bool,
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let epoch = self.epoch;
        if let Ok(mut state) = self.shared.state.try_lock() {
            release_loading(&mut state, epoch);
            return;
        }
        let shared = Arc::clone(&self.shared);
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                release_loading(&mut *shared.state.lock().await, epoch);
            });
        }
    }
}

fn release_loading(state: &mut SessionState, epoch: u64) {
    if state.epoch == epoch && state.loading {
        debug!(epoch, "submission cancelled");
        state.loading = false;
    }
}

fn gateway_failure(call: GatewayCall, err: GatewayError, fallback: &str) -> AnalysisError {
    warn!(%call, error = %err, "gateway call failed");
    AnalysisError::Gateway {
        call,
        message: err.detail().unwrap_or(fallback).to_string(),
    }
}

/// `"{title} {text}"` per post, blanks dropped, capped at `cap`.
fn guest_texts(posts: &[Post], cap: usize) -> Vec<String> {
    posts
        .iter()
        .map(|p| format!("{} {}", p.title, p.text).trim().to_string())
        .filter(|t| !t.is_empty())
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_resets_results_and_bumps_epoch() {
        let mut state = SessionState::new();
        state.verdict = Some(SentimentVerdict {
            label: "Positive".into(),
            positive_percentage: 80.0,
            negative_percentage: 20.0,
        });
        state.summary = Some("old".into());
        state.error = Some("old error".into());
        state.page = 3;
        state.active_tab = Tab::Posts;

        let epoch = state.begin("rust", TimeFilter::Week);
        assert_eq!(epoch, 1);
        assert!(state.loading);
        assert!(!state.has_results());
        assert_eq!(state.error, None);
        assert_eq!(state.page, 1);
        assert_eq!(state.active_tab, Tab::Sentiment);
        assert_eq!(state.time_filter, TimeFilter::Week);
        assert_eq!(state.begin("go", TimeFilter::All), 2);
    }

    #[test]
    fn guest_texts_join_title_and_body() {
        let posts: Vec<Post> = (0..30)
            .map(|i| Post {
                title: if i == 0 { String::new() } else { format!("t{i}") },
                text: if i % 2 == 0 { String::new() } else { "body".into() },
                ..Default::default()
            })
            .collect();
        let texts = guest_texts(&posts, 20);
        assert_eq!(texts.len(), 20);
        assert_eq!(texts[0], "t1 body");
        assert_eq!(texts[1], "t2");
    }
}
