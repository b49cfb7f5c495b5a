//! Plain-text rendering of a session for the terminal front-end.
use std::fmt::Write;

use crate::markdown;
use crate::model::{Post, Tab};
use crate::profile::Profile;
use crate::session::{DerivedViews, PostPage, SessionState};

const SNIPPET_CHARS: usize = 300;

pub fn render(state: &SessionState, page: &PostPage, views: &DerivedViews) -> String {
    let mut out = String::new();
    if let Some(error) = &state.error {
        let _ = writeln!(out, "error: {error}");
    }
    if !state.has_results() {
        return out;
    }
    let _ = writeln!(
        out,
        "[{}] query \"{}\" ({}), {} posts",
        state.active_tab,
        state.query,
        state.time_filter,
        state.posts.len()
    );
    match state.active_tab {
        Tab::Sentiment => render_sentiment(&mut out, state),
        Tab::Posts => render_posts(&mut out, page),
        Tab::Summary => render_summary(&mut out, state),
        Tab::Visualization => render_visualization(&mut out, state, views),
    }
    out
}

fn render_sentiment(out: &mut String, state: &SessionState) {
    if let Some(v) = &state.verdict {
        let _ = writeln!(out, "Overall sentiment: {}", v.label);
        let _ = writeln!(out, "Positive: {}%", v.positive_percentage);
        let _ = writeln!(out, "Negative: {}%", v.negative_percentage);
    }
}

fn render_posts(out: &mut String, page: &PostPage) {
    for (i, post) in page.posts.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {}", page.offset + i + 1, post.title);
        let _ = writeln!(out, "     {}", post_meta(post));
        if !post.text.is_empty() {
            let _ = writeln!(out, "     {}", snippet(&post.text, SNIPPET_CHARS));
        }
        let _ = writeln!(out, "     {}", post.url);
    }
    if page.total_pages > 1 {
        let _ = writeln!(out, "Page {} of {}", page.number, page.total_pages);
    }
}

fn render_summary(out: &mut String, state: &SessionState) {
    match (&state.summary, state.summary_loading) {
        (Some(summary), _) => {
            let _ = writeln!(out, "{}", markdown::to_plain(summary));
        }
        (None, true) => out.push_str("Generating summary...\n"),
        (None, false) => out.push_str("No summary available.\n"),
    }
}

fn render_visualization(out: &mut String, state: &SessionState, views: &DerivedViews) {
    if let Some(v) = &state.verdict {
        let _ = writeln!(
            out,
            "Positive share: {:.1}% ({})",
            v.positive_percentage,
            v.gauge().as_str()
        );
    }
    out.push_str("Top subreddits:\n");
    let width = views.histogram.first().map_or(0, |h| h.count);
    for bar in &views.histogram {
        let len = if width == 0 { 0 } else { bar.count * 30 / width };
        let _ = writeln!(
            out,
            "  r/{:<20} {:>4} {}",
            bar.source,
            bar.count,
            "#".repeat(len.max(1))
        );
    }
    if let Some(words) = &views.word_cloud {
        let cloud: Vec<String> = words.iter().map(|w| format!("{}({})", w.word, w.count)).collect();
        let _ = writeln!(out, "Frequent words: {}", cloud.join(" "));
    }
}

fn post_meta(post: &Post) -> String {
    let when = post
        .created_at()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let mut meta = format!(
        "r/{} - u/{} - {} - score {} - {} comments - {:.0}% upvoted",
        post.subreddit,
        post.author,
        when,
        post.score,
        post.num_comments,
        post.upvote_ratio * 100.0
    );
    if post.is_video {
        meta.push_str(" - video");
    }
    meta
}

fn snippet(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

pub fn render_usage(profile: &Profile, show: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "user:     {}", profile.user_id);
    let _ = writeln!(out, "name:     {}", profile.name.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "email:    {}", profile.email.as_deref().unwrap_or("-"));
    let _ = writeln!(out, "plan:     {}", profile.plan);
    let _ = writeln!(out, "visits:   {}", profile.visits);
    let _ = writeln!(out, "analyses: {}", profile.sentiments);
    let recent = profile.recent_page(show);
    if recent.is_empty() {
        out.push_str("no recent searches\n");
    } else {
        let _ = writeln!(out, "recent searches ({} of {}):", recent.len(), profile.recent.len());
        for query in recent {
            let _ = writeln!(out, "  {query}");
        }
    }
    out
}
