//! Target scheduler: the run loop
//!
//! Each iteration walks the same pipeline:
//!
//! ```text
//! SELECT_SOURCE -> ACQUIRE_CANDIDATE -> FILTER -> VERIFY_DETAIL -> COMPOSE
//!     -> GENERATE -> POST_DECISION -> ENGAGE -> COOLDOWN
//! ```
//!
//! Any failure inside a single candidate's pipeline aborts only that
//! candidate, and an iteration that acquires nothing is aborted the same
//! way; cooldown and long-pause accounting run after every iteration. The only error
//! that leaves [`TargetScheduler::run`] is a ledger write failure.

use chrono::Utc;
use rand::seq::SliceRandom;
use std::collections::{HashSet, VecDeque};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::browser::Browser;
use crate::content::ContentGenerator;
use crate::engagement::EngagementPolicy;
use crate::error::Result;
use crate::models::{Candidate, Progress, RunState, RunSummary, Source, Termination};
use crate::pacing::PacingEngine;
use crate::storage::DedupLedger;
use crate::utils::normalize_handle;
use crate::utils::retry::RetryConfig;

use super::Quota;

/// Receives a progress snapshot after every iteration
pub trait ProgressReporter: Send {
    fn report(&mut self, progress: &Progress);
}

/// Logs progress at info level
#[derive(Debug, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn report(&mut self, progress: &Progress) {
        info!("{progress}");
    }
}

/// Run-level targeting settings
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub search_query: String,
    pub own_handle: String,
    pub max_empty_global_batches: u32,
}

/// Result of pushing one candidate through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Replied,
    Skipped(&'static str),
    Failed(&'static str),
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Replied => "replied",
            Self::Skipped(reason) | Self::Failed(reason) => reason,
        }
    }
}

/// Drives one run over a [`Browser`]
pub struct TargetScheduler<B: Browser> {
    browser: B,
    ledger: DedupLedger,
    generator: ContentGenerator,
    pacing: PacingEngine,
    engagement: EngagementPolicy,
    quota: Quota,
    creators: Vec<String>,
    settings: SchedulerSettings,
    submit_retry: RetryConfig,
    /// Accepted global candidates not yet processed
    pending_global: VecDeque<Candidate>,
    /// Ids already pushed through the pipeline this run
    attempted: HashSet<String>,
    reporter: Box<dyn ProgressReporter>,
    run_id: String,
}

impl<B: Browser> TargetScheduler<B> {
    /// The creator list is shuffled once here and never again
    pub fn new(
        browser: B,
        ledger: DedupLedger,
        generator: ContentGenerator,
        pacing: PacingEngine,
        quota: Quota,
        mut creators: Vec<String>,
        mut settings: SchedulerSettings,
    ) -> Self {
        creators.shuffle(&mut rand::thread_rng());
        settings.own_handle = normalize_handle(&settings.own_handle);

        Self {
            browser,
            ledger,
            generator,
            pacing,
            engagement: EngagementPolicy::default(),
            quota,
            creators,
            settings,
            submit_retry: RetryConfig::single_retry(),
            pending_global: VecDeque::new(),
            attempted: HashSet::new(),
            reporter: Box::new(LogReporter),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn with_engagement(mut self, engagement: EngagementPolicy) -> Self {
        self.engagement = engagement;
        self
    }

    pub fn with_reporter(mut self, reporter: Box<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn quota(&self) -> Quota {
        self.quota
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    pub fn browser(&self) -> &B {
        &self.browser
    }

    pub fn browser_mut(&mut self) -> &mut B {
        &mut self.browser
    }

    /// Run until the budget is spent or no source can supply a target
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started = Instant::now();
        let started_at = Utc::now();
        let total = self.quota.total();
        let mut state = RunState::new(self.pacing.draw_long_pause_threshold());
        let mut targets_processed: u64 = 0;
        let mut long_pauses: u32 = 0;

        info!(
            run_id = %self.run_id,
            total,
            global_quota = self.quota.global,
            creator_quota = self.quota.creator,
            creators = self.creators.len(),
            ledger_size = self.ledger.len(),
            "Starting run"
        );

        let termination = loop {
            if state.replies_done >= total {
                break Termination::BudgetReached;
            }

            let available = self.available_sources(&state);
            let Some(&source) = available.choose(&mut rand::thread_rng()) else {
                break Termination::SourcesExhausted;
            };

            let candidate = match source {
                Source::Global => self.acquire_global(&mut state).await,
                Source::Creator => self.acquire_from_creator(&mut state).await,
            };

            match candidate {
                Some(candidate) => {
                    targets_processed += 1;
                    let outcome = self.process_candidate(&candidate, source, &mut state).await?;
                    debug!(
                        tweet_id = %candidate.id,
                        source = %source,
                        outcome = outcome.as_str(),
                        "Target finished"
                    );
                }
                None => debug!(source = %source, "No target acquired"),
            }

            // Misses pace exactly like processed targets
            if self.pacing.maybe_long_pause(&mut state).await.is_some() {
                long_pauses += 1;
            }
            if state.replies_done < total {
                self.pacing.cooldown().await;
            }
            self.report(&state, total, started);
        };

        let summary = RunSummary {
            run_id: self.run_id.clone(),
            started_at,
            finished_at: Utc::now(),
            total_budget: total,
            replies_done: state.replies_done,
            global_done: state.global_done,
            creators_done: state.creators_done,
            targets_processed,
            long_pauses,
            termination,
        };

        info!(
            run_id = %summary.run_id,
            replies = summary.replies_done,
            global = summary.global_done,
            creators = summary.creators_done,
            termination = ?summary.termination,
            "Run finished"
        );

        Ok(summary)
    }

    /// Sources with remaining quota and targets, recomputed every iteration
    pub fn available_sources(&self, state: &RunState) -> Vec<Source> {
        let mut sources = Vec::with_capacity(2);
        if state.global_done < self.quota.global
            && state.empty_global_batches < self.settings.max_empty_global_batches
        {
            sources.push(Source::Global);
        }
        if state.creators_done < self.quota.creator && state.creator_cursor < self.creators.len() {
            sources.push(Source::Creator);
        }
        sources
    }

    /// Re-filter a discovered global batch and cap it at `limit`
    ///
    /// Drops processed or already-attempted ids, the operator's own posts,
    /// non-original posts, posts whose text lacks the search query and
    /// authorless entries, and keeps one candidate per author.
    pub fn filter_global_batch(&self, batch: Vec<Candidate>, limit: usize) -> Vec<Candidate> {
        let mut authors = HashSet::new();
        batch
            .into_iter()
            .filter(|c| !self.ledger.contains(&c.id) && !self.attempted.contains(&c.id))
            .filter(|c| !c.author.trim().is_empty() && !self.is_own(c))
            .filter(|c| c.kind.is_original() && c.mentions(&self.settings.search_query))
            .filter(|c| authors.insert(c.author_key()))
            .take(limit)
            .collect()
    }

    fn is_own(&self, candidate: &Candidate) -> bool {
        candidate.is_authored_by(&self.settings.own_handle)
    }

    fn excluded_ids(&self) -> HashSet<String> {
        self.ledger
            .ids()
            .iter()
            .chain(self.attempted.iter())
            .cloned()
            .collect()
    }

    fn report(&mut self, state: &RunState, total: usize, started: Instant) {
        let progress = Progress::from_state(state, total, started.elapsed());
        self.reporter.report(&progress);
    }

    // ========================================================================
    // ACQUIRE_CANDIDATE
    // ========================================================================

    async fn acquire_global(&mut self, state: &mut RunState) -> Option<Candidate> {
        if self.pending_global.is_empty() {
            let remaining = self.quota.global.saturating_sub(state.global_done);
            let excluded = self.excluded_ids();

            let batch = match self
                .browser
                .discover_global(&self.settings.search_query, remaining, &excluded)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(error = %e, "Global discovery failed");
                    Vec::new()
                }
            };

            let discovered = batch.len();
            let accepted = self.filter_global_batch(batch, remaining);
            if accepted.is_empty() {
                state.empty_global_batches += 1;
                warn!(
                    discovered,
                    empty_batches = state.empty_global_batches,
                    limit = self.settings.max_empty_global_batches,
                    "No usable global candidates"
                );
                return None;
            }

            state.empty_global_batches = 0;
            info!(discovered, accepted = accepted.len(), "Global batch ready");
            self.pending_global.extend(accepted);
        }

        self.pending_global.pop_front()
    }

    async fn acquire_from_creator(&mut self, state: &mut RunState) -> Option<Candidate> {
        let handle = self.creators.get(state.creator_cursor)?.clone();
        state.creator_cursor += 1;

        if !self.settings.own_handle.is_empty() && normalize_handle(&handle) == self.settings.own_handle
        {
            debug!(handle = %handle, "Skipping own handle in creator list");
            return None;
        }

        let excluded = self.excluded_ids();
        match self
            .browser
            .discover_for_author(&handle, &self.settings.search_query, &excluded)
            .await
        {
            Ok(Some(candidate)) => Some(candidate),
            Ok(None) => {
                info!(handle = %handle, "No eligible post from creator");
                None
            }
            Err(e) => {
                warn!(handle = %handle, error = %e, "Creator discovery failed");
                None
            }
        }
    }

    // ========================================================================
    // FILTER .. ENGAGE
    // ========================================================================

    fn filter_reason(&self, candidate: &Candidate) -> Option<&'static str> {
        if self.ledger.contains(&candidate.id) {
            return Some("already_processed");
        }
        if self.is_own(candidate) {
            return Some("own_post");
        }
        if !candidate.kind.is_original() {
            return Some("not_original");
        }
        if !candidate.mentions(&self.settings.search_query) {
            return Some("off_topic");
        }
        if let Some(reason) = self.pacing.quality_skip_reason(&candidate.text) {
            return Some(reason.as_str());
        }
        if self.pacing.should_skip_candidate(&candidate.text) {
            return Some("random_skip");
        }
        None
    }

    async fn process_candidate(
        &mut self,
        candidate: &Candidate,
        source: Source,
        state: &mut RunState,
    ) -> Result<Outcome> {
        self.attempted.insert(candidate.id.clone());

        if let Some(reason) = self.filter_reason(candidate) {
            debug!(tweet_id = %candidate.id, reason, "Candidate filtered");
            return Ok(Outcome::Skipped(reason));
        }

        match self.browser.verify_original(candidate).await {
            Ok(true) => {}
            Ok(false) => return Ok(Outcome::Skipped("not_original_on_detail")),
            Err(e) => {
                warn!(tweet_id = %candidate.id, error = %e, "Detail view check failed");
                return Ok(Outcome::Failed("verify_failed"));
            }
        }

        tokio::time::sleep(self.pacing.reading_delay(&candidate.text)).await;
        self.pacing.maybe_idle().await;
        if let Some(action) = self.pacing.incidental_action() {
            if let Err(e) = self.browser.browse_incidental(action, candidate).await {
                debug!(error = %e, "Incidental browsing failed");
            }
        }

        if let Err(e) = self.browser.open_composer(candidate).await {
            warn!(tweet_id = %candidate.id, error = %e, "Could not open reply composer");
            return Ok(Outcome::Failed("compose_failed"));
        }

        let reply = self.generator.generate(&candidate.text).await;
        if self.pacing.should_skip_reply() {
            info!(tweet_id = %candidate.id, "Decided not to post this reply");
            return Ok(Outcome::Skipped("reply_skipped"));
        }

        if !self.submit_with_retry(&reply).await {
            warn!(tweet_id = %candidate.id, "Reply could not be posted");
            return Ok(Outcome::Failed("post_failed"));
        }

        state.record_reply(source);
        self.ledger.record(&candidate.id)?;
        info!(
            tweet_id = %candidate.id,
            handle = %candidate.author,
            source = %source,
            replies = state.replies_done,
            "Replied"
        );

        self.engage(candidate).await;
        self.pacing.reply_cooldown().await;
        Ok(Outcome::Replied)
    }

    /// Submit once, then retry after the configured backoff
    async fn submit_with_retry(&mut self, reply: &str) -> bool {
        let mut attempt = 0;
        loop {
            match self.browser.submit_text(reply).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(attempt, error = %e, "Reply submission failed");
                    if attempt >= self.submit_retry.max_retries {
                        return false;
                    }
                }
            }
            attempt += 1;
            tokio::time::sleep(self.submit_retry.calculate_delay(attempt)).await;
        }
    }

    async fn engage(&mut self, candidate: &Candidate) {
        if self.engagement.like_decision() {
            match self.browser.like(candidate).await {
                Ok(()) => info!(tweet_id = %candidate.id, "Liked post"),
                Err(e) => warn!(tweet_id = %candidate.id, error = %e, "Like failed"),
            }
        }

        if self.engagement.follow_decision() {
            match self.browser.follow(&candidate.author).await {
                Ok(()) => info!(handle = %candidate.author, "Followed author"),
                Err(e) => warn!(handle = %candidate.author, error = %e, "Follow failed"),
            }
        }
    }
}
