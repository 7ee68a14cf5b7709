// Core data structures for the reply engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::utils::normalize_handle;

/// Structural kind of a post, as detected on the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PostKind {
    #[default]
    Original,
    Reply,
    Repost,
    Quote,
}

impl PostKind {
    pub fn is_original(&self) -> bool {
        matches!(self, Self::Original)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Reply => "reply",
            Self::Repost => "repost",
            Self::Quote => "quote",
        }
    }
}

/// A discovered post eligible for a reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,  // Platform-unique post id
    pub url: String, // Canonical status URL
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub kind: PostKind,
}

impl Candidate {
    pub fn new(
        id: impl Into<String>,
        url: impl Into<String>,
        author: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            author: author.into(),
            text: text.into(),
            kind: PostKind::Original,
        }
    }

    pub fn with_kind(mut self, kind: PostKind) -> Self {
        self.kind = kind;
        self
    }

    /// Lower-cased author handle used for comparisons
    pub fn author_key(&self) -> String {
        normalize_handle(&self.author)
    }

    /// Case-insensitive author comparison
    pub fn is_authored_by(&self, handle: &str) -> bool {
        !handle.trim().is_empty() && self.author_key() == normalize_handle(handle)
    }

    /// Case-insensitive search of the post text; a blank query matches anything
    pub fn mentions(&self, query: &str) -> bool {
        let query = query.trim();
        query.is_empty() || self.text.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Target source a scheduling iteration draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Global,
    Creator,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Creator => "creator",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable counters for one run, owned by the scheduler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub replies_done: usize,
    pub global_done: usize,
    pub creators_done: usize,
    /// Index of the next creator in the shuffled list
    pub creator_cursor: usize,
    pub targets_since_long_pause: u32,
    pub next_long_pause_threshold: u32,
    /// Consecutive global discoveries that yielded nothing usable
    pub empty_global_batches: u32,
}

impl RunState {
    pub fn new(first_long_pause_threshold: u32) -> Self {
        Self {
            next_long_pause_threshold: first_long_pause_threshold,
            ..Default::default()
        }
    }

    /// Count one confirmed reply against its source
    pub fn record_reply(&mut self, source: Source) {
        self.replies_done += 1;
        match source {
            Source::Global => self.global_done += 1,
            Source::Creator => self.creators_done += 1,
        }
    }
}

/// Snapshot handed to progress reporters after every iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub replies_done: usize,
    pub total_budget: usize,
    pub global_done: usize,
    pub creators_done: usize,
    pub elapsed: Duration,
}

impl Progress {
    pub fn from_state(state: &RunState, total_budget: usize, elapsed: Duration) -> Self {
        Self {
            replies_done: state.replies_done,
            total_budget,
            global_done: state.global_done,
            creators_done: state.creators_done,
            elapsed,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Replies: {}/{} | Elapsed: {} | Global:{}/Creators:{}",
            self.replies_done,
            self.total_budget,
            crate::utils::format_elapsed(self.elapsed),
            self.global_done,
            self.creators_done
        )
    }
}

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every reply in the budget was posted
    BudgetReached,
    /// No source had remaining quota or targets
    SourcesExhausted,
}

/// Outcome of a complete run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_budget: usize,
    pub replies_done: usize,
    pub global_done: usize,
    pub creators_done: usize,
    pub targets_processed: u64,
    pub long_pauses: u32,
    pub termination: Termination,
}

impl RunSummary {
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_comparison_is_case_insensitive() {
        let cand = Candidate::new("1", "https://x.com/Alice/status/1", "Alice", "hello there");
        assert!(cand.is_authored_by("alice"));
        assert!(cand.is_authored_by("@ALICE"));
        assert!(!cand.is_authored_by("bob"));
        assert!(!cand.is_authored_by(""));
    }

    #[test]
    fn test_mentions_is_case_insensitive_substring() {
        let cand = Candidate::new("1", "u", "a", "Shipping a new RustLang crate today");
        assert!(cand.mentions("rustlang"));
        assert!(cand.mentions("  new rust "));
        assert!(cand.mentions(""));
        assert!(!cand.mentions("golang"));
    }

    #[test]
    fn test_record_reply_updates_source_counter() {
        let mut state = RunState::new(12);
        state.record_reply(Source::Global);
        state.record_reply(Source::Creator);
        state.record_reply(Source::Creator);
        assert_eq!(state.replies_done, 3);
        assert_eq!(state.global_done, 1);
        assert_eq!(state.creators_done, 2);
        assert_eq!(state.next_long_pause_threshold, 12);
    }

    #[test]
    fn test_progress_display() {
        let mut state = RunState::default();
        state.record_reply(Source::Global);
        let progress = Progress::from_state(&state, 10, Duration::from_secs(61));
        assert_eq!(
            progress.to_string(),
            "Replies: 1/10 | Elapsed: 00:01:01 | Global:1/Creators:0"
        );
    }

    #[test]
    fn test_post_kind_default_is_original() {
        assert!(PostKind::default().is_original());
        assert!(!PostKind::Quote.is_original());
    }
}
