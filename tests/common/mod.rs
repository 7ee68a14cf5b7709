//! Common test utilities

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use replybot::browser::{Browser, UiResult};
use replybot::config::ContentConfig;
use replybot::content::ContentGenerator;
use replybot::engagement::EngagementPolicy;
use replybot::error::UiError;
use replybot::llm::{CompletionProvider, CompletionRequest, ProviderPool};
use replybot::models::{Candidate, Progress};
use replybot::pacing::{IncidentalAction, PacingEngine, PacingPolicy};
use replybot::scheduler::{ProgressReporter, Quota, SchedulerSettings, TargetScheduler};
use replybot::storage::DedupLedger;
use replybot::utils::error::ProviderError;

/// Candidate with a canonical URL and text that passes the quality heuristics
pub fn candidate(id: &str, author: &str) -> Candidate {
    Candidate::new(
        id,
        format!("https://x.com/{author}/status/{id}"),
        author,
        format!("Spent the weekend rewriting our job queue in Rust, post {id}"),
    )
}

/// Scripted stand-in for the browser
///
/// Discovery returns exactly what was scripted, ignoring exclusions, so
/// the scheduler's own filtering is what the tests observe.
#[derive(Debug, Default)]
pub struct FakeBrowser {
    /// Popped one per `discover_global` call; an empty queue yields no posts
    pub global_batches: VecDeque<Vec<Candidate>>,
    /// Latest post per lower-cased handle
    pub creator_posts: HashMap<String, Candidate>,
    /// Ids that turn out not to be original on the detail view
    pub not_original_on_detail: HashSet<String>,
    /// Ids whose composer cannot be opened
    pub composer_fails_for: HashSet<String>,
    /// Number of upcoming `submit_text` calls that fail
    pub submit_failures: usize,
    pub like_fails: bool,

    pub global_requests: Vec<usize>,
    pub creator_requests: Vec<String>,
    pub composing: Option<String>,
    pub submit_attempts: usize,
    /// Ids replied to, in posting order
    pub replied: Vec<String>,
    pub replies_text: Vec<String>,
    pub liked: Vec<String>,
    pub followed: Vec<String>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_global_batch(mut self, batch: Vec<Candidate>) -> Self {
        self.global_batches.push_back(batch);
        self
    }

    pub fn with_creator_post(mut self, post: Candidate) -> Self {
        self.creator_posts.insert(post.author.to_lowercase(), post);
        self
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn discover_global(
        &mut self,
        _query: &str,
        max_count: usize,
        _excluded: &HashSet<String>,
    ) -> UiResult<Vec<Candidate>> {
        self.global_requests.push(max_count);
        Ok(self.global_batches.pop_front().unwrap_or_default())
    }

    async fn discover_for_author(
        &mut self,
        handle: &str,
        _query: &str,
        _excluded: &HashSet<String>,
    ) -> UiResult<Option<Candidate>> {
        self.creator_requests.push(handle.to_string());
        Ok(self.creator_posts.get(&handle.to_lowercase()).cloned())
    }

    async fn verify_original(&mut self, candidate: &Candidate) -> UiResult<bool> {
        Ok(!self.not_original_on_detail.contains(&candidate.id))
    }

    async fn open_composer(&mut self, candidate: &Candidate) -> UiResult<()> {
        if self.composer_fails_for.contains(&candidate.id) {
            return Err(UiError::ElementNotFound("reply button".into()));
        }
        self.composing = Some(candidate.id.clone());
        Ok(())
    }

    async fn submit_text(&mut self, text: &str) -> UiResult<()> {
        self.submit_attempts += 1;
        if self.submit_failures > 0 {
            self.submit_failures -= 1;
            return Err(UiError::ClickIntercepted("post button".into()));
        }
        let id = self
            .composing
            .take()
            .ok_or_else(|| UiError::ElementNotFound("composer".into()))?;
        self.replied.push(id);
        self.replies_text.push(text.to_string());
        Ok(())
    }

    async fn like(&mut self, candidate: &Candidate) -> UiResult<()> {
        if self.like_fails {
            return Err(UiError::StaleElement("like button".into()));
        }
        self.liked.push(candidate.id.clone());
        Ok(())
    }

    async fn follow(&mut self, handle: &str) -> UiResult<()> {
        self.followed.push(handle.to_string());
        Ok(())
    }

    async fn browse_incidental(
        &mut self,
        _action: IncidentalAction,
        _candidate: &Candidate,
    ) -> UiResult<()> {
        Ok(())
    }
}

/// Provider that always fails
pub struct FailingProvider {
    pub name: String,
    pub calls: Arc<Mutex<usize>>,
}

impl FailingProvider {
    pub fn boxed(name: &str, calls: &Arc<Mutex<usize>>) -> Box<dyn CompletionProvider> {
        Box::new(Self {
            name: name.to_string(),
            calls: Arc::clone(calls),
        })
    }
}

#[async_trait]
impl CompletionProvider for FailingProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, _request: &CompletionRequest) -> Result<String, ProviderError> {
        *self.calls.lock().unwrap() += 1;
        Err(ProviderError::Api {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

/// Collects every progress snapshot
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub snapshots: Arc<Mutex<Vec<Progress>>>,
}

impl ProgressReporter for RecordingReporter {
    fn report(&mut self, progress: &Progress) {
        self.snapshots.lock().unwrap().push(progress.clone());
    }
}

/// Random gates closed and long pauses off
pub fn quiet_policy() -> PacingPolicy {
    PacingPolicy {
        long_pause_enabled: false,
        ..PacingPolicy::deterministic()
    }
}

pub fn fallback_generator() -> ContentGenerator {
    ContentGenerator::new(ProviderPool::default(), &ContentConfig::default(), "rust", 40)
}

pub fn open_ledger(path: &Path) -> DedupLedger {
    DedupLedger::open(path).unwrap()
}

/// Scheduler over a fake browser with quiet pacing and no engagement
pub fn scheduler(
    browser: FakeBrowser,
    ledger: DedupLedger,
    quota: Quota,
    creators: &[&str],
    own_handle: &str,
    policy: PacingPolicy,
) -> TargetScheduler<FakeBrowser> {
    TargetScheduler::new(
        browser,
        ledger,
        fallback_generator(),
        PacingEngine::new(policy),
        quota,
        creators.iter().map(|c| c.to_string()).collect(),
        SchedulerSettings {
            search_query: "rust".to_string(),
            own_handle: own_handle.to_string(),
            max_empty_global_batches: 3,
        },
    )
    .with_engagement(EngagementPolicy::disabled())
}
