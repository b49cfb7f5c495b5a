//! Pure views derived from the current post collection.
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::model::Post;

pub const HISTOGRAM_TOP: usize = 10;

/// Bar colours, assigned by rank.
pub const PALETTE: [&str; 10] = [
    "#6366f1", "#8b5cf6", "#06b6d4", "#10b981", "#f59e0b", "#ef4444", "#ec4899", "#14b8a6",
    "#f97316", "#84cc16",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCount {
    pub source: String,
    pub count: usize,
    pub color: &'static str,
}

/// Posts per source community, most frequent first, top ten. Equal counts keep
/// the order in which each community was first seen.
pub fn histogram_by_source(posts: &[Post]) -> Vec<SourceCount> {
    let mut order: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        let source = post.subreddit.as_str();
        match index.get(source) {
            Some(&i) => order[i].1 += 1,
            None => {
                index.insert(source, order.len());
                order.push((source, 1));
            }
        }
    }
    // sort_by is stable
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
        .into_iter()
        .take(HISTOGRAM_TOP)
        .enumerate()
        .map(|(rank, (source, count))| SourceCount {
            source: source.to_string(),
            count,
            color: PALETTE[rank % PALETTE.len()],
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordCloudOptions {
    pub min_len: usize,
    /// Tokens must occur at least this many times.
    pub min_count: usize,
    pub max_words: usize,
}

impl Default for WordCloudOptions {
    fn default() -> Self {
        Self {
            min_len: 3,
            min_count: 2,
            max_words: 50,
        }
    }
}

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("static regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
        "one", "our", "out", "day", "get", "has", "him", "his", "how", "its", "may", "new", "now",
        "old", "see", "two", "who", "did", "she", "use", "way", "why", "let", "put", "say", "too",
        "off", "own", "yet", "also", "been", "from", "have", "here", "into", "just", "like",
        "more", "most", "much", "must", "only", "over", "said", "same", "some", "such", "than",
        "that", "them", "then", "they", "this", "very", "were", "what", "when", "will", "with",
        "your", "about", "after", "again", "being", "could", "does", "doing", "down", "each",
        "even", "every", "first", "going", "good", "know", "make", "many", "might", "need",
        "never", "other", "really", "should", "still", "their", "there", "these", "thing",
        "things", "think", "those", "through", "want", "well", "where", "which", "while",
        "would", "because", "before", "between", "both", "during", "further", "having",
        "itself", "myself", "once", "ours", "ourselves", "same", "themselves", "theirs", "under",
        "until", "upon", "yours", "yourself", "dont", "didnt", "doesnt", "isnt", "wasnt", "cant",
        "wont", "im", "ive", "youre", "thats", "theres", "lot", "got", "anyone", "someone",
        "something", "anything", "everyone", "people", "time", "year", "years", "back", "post",
        "https", "http", "www", "com", "amp", "etc", "though", "actually", "pretty", "sure",
        "maybe", "probably", "around", "another", "made", "take", "come", "look", "seems",
    ]
    .into_iter()
    .collect()
});

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Word frequencies over `title + text` of every post. Sorted by count
/// descending, then alphabetically.
pub fn word_frequencies(posts: &[Post], opts: WordCloudOptions) -> Vec<WordCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for post in posts {
        let text = format!("{} {}", post.title, post.text).to_lowercase();
        for token in TOKEN.find_iter(&text).map(|m| m.as_str()) {
            if token.len() < opts.min_len || is_stop_word(token) {
                continue;
            }
            *counts.entry(token.to_string()).or_default() += 1;
        }
    }

    let mut words: Vec<WordCount> = counts
        .into_iter()
        .filter(|(_, count)| *count >= opts.min_count)
        .map(|(word, count)| WordCount { word, count })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.word.cmp(&b.word)));
    words.truncate(opts.max_words);
    words
}

pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    len.div_ceil(page_size)
}

/// Clamp a 1-based page number into `[1, total_pages]` (1 when there are no posts).
pub fn clamp_page(page: usize, len: usize, page_size: usize) -> usize {
    page.clamp(1, total_pages(len, page_size).max(1))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub number: usize,
    pub total_pages: usize,
    /// Zero-based index of the first item in the full collection.
    pub offset: usize,
    pub items: &'a [Post],
}

/// Posts `[(page-1)*size, page*size)` after clamping `page`.
pub fn paginate(posts: &[Post], page: usize, page_size: usize) -> Page<'_> {
    let number = clamp_page(page, posts.len(), page_size);
    let offset = ((number - 1) * page_size).min(posts.len());
    let end = (offset + page_size).min(posts.len());
    Page {
        number,
        total_pages: total_pages(posts.len(), page_size),
        offset,
        items: &posts[offset..end],
    }
}
