//! Human-like pacing: delays, skip decisions and rest breaks
//!
//! Every decision here is an independent draw from the thread-local RNG.
//! The only state carried between calls is the long-pause counter and
//! threshold, which live in [`RunState`] and are passed in explicitly.
//!
//! All waits are plain `tokio::time::sleep` calls; nothing else runs while
//! the scheduler is paused.

use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, info};

use crate::models::RunState;

/// Base delays used around UI actions, in seconds
pub const WAIT_SHORT: f64 = 0.5;
pub const WAIT_MED: f64 = 1.0;
pub const WAIT_LONG: f64 = 1.7;
pub const JITTER_SPREAD: f64 = 0.45;

/// Lower bound for any jittered delay, in seconds
const MIN_DELAY_SECS: f64 = 0.1;

/// Probabilities, ranges and thresholds that shape pacing
#[derive(Debug, Clone)]
pub struct PacingPolicy {
    /// Chance of skipping any candidate regardless of content
    pub candidate_skip_probability: f64,

    /// Chance of abandoning an already-composed reply
    pub reply_skip_probability: f64,

    /// Chance of a short idle break
    pub idle_probability: f64,

    /// Idle break length range, in seconds
    pub idle_secs: (f64, f64),

    /// Assumed reading speed, in words per minute
    pub reading_wpm: f64,

    /// Relative jitter applied to reading time (0.3 = ±30%)
    pub reading_jitter: f64,

    /// Floor for reading time, in seconds
    pub min_reading_secs: f64,

    /// Whether long pauses are inserted at all
    pub long_pause_enabled: bool,

    /// Targets between long pauses, drawn inclusively
    pub long_pause_every: (u32, u32),

    /// Long pause length range, in seconds
    pub long_pause_secs: (f64, f64),

    /// Pause between consecutive targets, in seconds
    pub cooldown_secs: (f64, f64),

    /// Extra pause after a successful reply, in seconds
    pub reply_cooldown_secs: (f64, f64),

    /// Chance of incidental browsing before composing
    pub browse_probability: f64,

    /// Minimum trimmed length for a post to be worth replying to
    pub min_text_chars: usize,

    /// More `#` characters than this marks hashtag spam
    pub max_hashtags: usize,
}

impl Default for PacingPolicy {
    fn default() -> Self {
        Self {
            candidate_skip_probability: 0.15,
            reply_skip_probability: 0.08,
            idle_probability: 0.10,
            idle_secs: (10.0, 30.0),
            reading_wpm: 220.0,
            reading_jitter: 0.3,
            min_reading_secs: 1.0,
            long_pause_enabled: true,
            long_pause_every: (10, 15),
            long_pause_secs: (120.0, 300.0),
            cooldown_secs: (5.0, 15.0),
            reply_cooldown_secs: (6.0, 14.0),
            browse_probability: 0.20,
            min_text_chars: 10,
            max_hashtags: 3,
        }
    }
}

impl PacingPolicy {
    /// Policy with every random gate closed, leaving only the
    /// deterministic content heuristics active
    pub fn deterministic() -> Self {
        Self {
            candidate_skip_probability: 0.0,
            reply_skip_probability: 0.0,
            idle_probability: 0.0,
            browse_probability: 0.0,
            ..Self::default()
        }
    }
}

/// Content heuristic that rejected a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    TooShort,
    HashtagSpam,
    ContainsLink,
    PunctuationOnly,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::HashtagSpam => "hashtag_spam",
            Self::ContainsLink => "contains_link",
            Self::PunctuationOnly => "punctuation_only",
        }
    }
}

/// Incidental browsing performed before composing a reply
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncidentalAction {
    VisitProfile,
    ClickHashtag,
    Scroll,
    /// Linger on the page without interacting
    Linger(Duration),
}

/// Produces delays and skip decisions from a [`PacingPolicy`]
#[derive(Debug, Clone, Default)]
pub struct PacingEngine {
    policy: PacingPolicy,
}

impl PacingEngine {
    pub fn new(policy: PacingPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PacingPolicy {
        &self.policy
    }

    /// `max(0.1, base + uniform(-spread, spread))` seconds
    pub fn jittered_delay(&self, base: f64, spread: f64) -> Duration {
        let spread = spread.abs();
        let secs = base + uniform(-spread, spread);
        Duration::from_secs_f64(secs.max(MIN_DELAY_SECS))
    }

    /// Sleep for a jittered delay
    pub async fn pause(&self, base: f64, spread: f64) {
        tokio::time::sleep(self.jittered_delay(base, spread)).await;
    }

    /// Random skip or any failed quality heuristic
    pub fn should_skip_candidate(&self, text: &str) -> bool {
        if chance(self.policy.candidate_skip_probability) {
            debug!("Randomly skipping candidate");
            return true;
        }
        self.quality_skip_reason(text).is_some()
    }

    /// Deterministic quality heuristics, evaluated in order
    pub fn quality_skip_reason(&self, text: &str) -> Option<SkipReason> {
        let trimmed = text.trim();
        if trimmed.chars().count() < self.policy.min_text_chars {
            return Some(SkipReason::TooShort);
        }
        if text.matches('#').count() > self.policy.max_hashtags {
            return Some(SkipReason::HashtagSpam);
        }
        if text.to_lowercase().contains("http") {
            return Some(SkipReason::ContainsLink);
        }
        if trimmed
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace())
        {
            return Some(SkipReason::PunctuationOnly);
        }
        None
    }

    /// Last-second hesitation after a reply is composed
    pub fn should_skip_reply(&self) -> bool {
        chance(self.policy.reply_skip_probability)
    }

    /// Time a person would take to read `text`
    pub fn reading_delay(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as f64;
        let base = words / self.policy.reading_wpm * 60.0;
        let jitter = self.policy.reading_jitter.abs();
        let secs = uniform(base * (1.0 - jitter), base * (1.0 + jitter));
        Duration::from_secs_f64(secs.max(self.policy.min_reading_secs))
    }

    /// Occasionally take a short break; returns the break taken
    pub async fn maybe_idle(&self) -> Option<Duration> {
        if !chance(self.policy.idle_probability) {
            return None;
        }
        let (lo, hi) = self.policy.idle_secs;
        let idle = Duration::from_secs_f64(uniform(lo, hi).max(0.0));
        info!(secs = %format!("{:.1}", idle.as_secs_f64()), "Taking a short break");
        tokio::time::sleep(idle).await;
        Some(idle)
    }

    /// Draw the number of targets before the next long pause
    pub fn draw_long_pause_threshold(&self) -> u32 {
        let (lo, hi) = self.policy.long_pause_every;
        let (lo, hi) = (lo.min(hi).max(1), hi.max(lo).max(1));
        rand::thread_rng().gen_range(lo..=hi)
    }

    /// Count one processed target and take a long pause once the threshold is reached
    ///
    /// On a pause the counter resets to zero and a new threshold is drawn.
    pub async fn maybe_long_pause(&self, state: &mut RunState) -> Option<Duration> {
        if !self.policy.long_pause_enabled {
            return None;
        }

        state.targets_since_long_pause += 1;
        if state.targets_since_long_pause < state.next_long_pause_threshold {
            return None;
        }

        let (lo, hi) = self.policy.long_pause_secs;
        let pause = Duration::from_secs_f64(uniform(lo, hi).max(0.0));
        info!(
            minutes = pause.as_secs() / 60,
            seconds = pause.as_secs() % 60,
            after_targets = state.targets_since_long_pause,
            "Taking a long break"
        );
        tokio::time::sleep(pause).await;

        state.targets_since_long_pause = 0;
        state.next_long_pause_threshold = self.draw_long_pause_threshold();
        info!(
            next_after = state.next_long_pause_threshold,
            "Next long break scheduled"
        );
        Some(pause)
    }

    /// Short pause between targets
    pub async fn cooldown(&self) -> Duration {
        let (lo, hi) = self.policy.cooldown_secs;
        let wait = Duration::from_secs_f64(uniform(lo, hi).max(0.0));
        debug!(secs = %format!("{:.1}", wait.as_secs_f64()), "Cooling down before next target");
        tokio::time::sleep(wait).await;
        wait
    }

    /// Extra pause after a posted reply
    pub async fn reply_cooldown(&self) -> Duration {
        let (lo, hi) = self.policy.reply_cooldown_secs;
        let wait = Duration::from_secs_f64(uniform(lo, hi).max(0.0));
        tokio::time::sleep(wait).await;
        wait
    }

    /// Maybe pick an incidental browsing action
    pub fn incidental_action(&self) -> Option<IncidentalAction> {
        if !chance(self.policy.browse_probability) {
            return None;
        }

        const KINDS: [u8; 4] = [0, 1, 2, 3];
        let kind = *KINDS.choose(&mut rand::thread_rng())?;
        match kind {
            0 if chance(0.30) => Some(IncidentalAction::VisitProfile),
            1 if chance(0.25) => Some(IncidentalAction::ClickHashtag),
            2 => Some(IncidentalAction::Scroll),
            3 => Some(IncidentalAction::Linger(Duration::from_secs_f64(uniform(
                1.5, 4.0,
            )))),
            _ => None,
        }
    }
}

/// Uniform draw over `[lo, hi]`; degenerate ranges return `lo`
pub(crate) fn uniform(lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        lo
    } else {
        rand::thread_rng().gen_range(lo..=hi)
    }
}

/// Bernoulli draw with the probability clamped into `[0, 1]`
pub(crate) fn chance(probability: f64) -> bool {
    let p = if probability.is_nan() {
        0.0
    } else {
        probability.clamp(0.0, 1.0)
    };
    rand::thread_rng().gen_bool(p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> PacingEngine {
        PacingEngine::new(PacingPolicy::deterministic())
    }

    #[test]
    fn test_jittered_delay_bounds() {
        let engine = engine();
        for _ in 0..200 {
            let d = engine.jittered_delay(1.0, 0.45).as_secs_f64();
            assert!((0.55..=1.45).contains(&d), "delay {d} out of range");
        }
    }

    #[test]
    fn test_jittered_delay_floor() {
        let engine = engine();
        for _ in 0..100 {
            assert!(engine.jittered_delay(0.0, 0.05) >= Duration::from_secs_f64(0.1));
        }
    }

    #[test]
    fn test_quality_heuristics() {
        let engine = engine();
        assert_eq!(engine.quality_skip_reason("short"), Some(SkipReason::TooShort));
        assert_eq!(
            engine.quality_skip_reason("lots of tags #a #b #c #d here"),
            Some(SkipReason::HashtagSpam)
        );
        assert_eq!(
            engine.quality_skip_reason("read this https://example.com now"),
            Some(SkipReason::ContainsLink)
        );
        assert_eq!(
            engine.quality_skip_reason("!!!???...!!!"),
            Some(SkipReason::PunctuationOnly)
        );
        assert_eq!(
            engine.quality_skip_reason("a perfectly normal post about rust"),
            None
        );
    }

    #[test]
    fn test_heuristics_short_circuit_in_order() {
        let engine = engine();
        // Too short wins over the link check
        assert_eq!(engine.quality_skip_reason("http://a"), Some(SkipReason::TooShort));
    }

    #[test]
    fn test_should_skip_candidate_is_deterministic_for_bad_content() {
        let engine = PacingEngine::default();
        for _ in 0..50 {
            assert!(engine.should_skip_candidate("tiny"));
            assert!(engine.should_skip_candidate("#one #two #three #four tags"));
            assert!(engine.should_skip_candidate("see HTTPS://example.com for more"));
            assert!(engine.should_skip_candidate("?!?!?!?!?!?!"));
        }
    }

    #[test]
    fn test_gates_closed_never_skip() {
        let engine = engine();
        for _ in 0..100 {
            assert!(!engine.should_skip_candidate("a perfectly normal post about rust"));
            assert!(!engine.should_skip_reply());
        }
    }

    #[test]
    fn test_reading_delay_floor_and_scale() {
        let engine = engine();
        assert!(engine.reading_delay("") >= Duration::from_secs(1));

        // 220 words is one minute of reading, ±30%
        let text = vec!["word"; 220].join(" ");
        let secs = engine.reading_delay(&text).as_secs_f64();
        assert!((42.0..=78.0).contains(&secs), "reading {secs}");
    }

    #[test]
    fn test_threshold_within_range() {
        let engine = PacingEngine::default();
        for _ in 0..100 {
            let t = engine.draw_long_pause_threshold();
            assert!((10..=15).contains(&t));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_pause_fires_at_fixed_threshold() {
        let policy = PacingPolicy {
            long_pause_every: (10, 10),
            ..PacingPolicy::deterministic()
        };
        let engine = PacingEngine::new(policy);
        let mut state = RunState::new(engine.draw_long_pause_threshold());

        let mut fired = 0;
        for i in 1..=10 {
            if let Some(pause) = engine.maybe_long_pause(&mut state).await {
                fired += 1;
                assert_eq!(i, 10);
                assert!(pause >= Duration::from_secs(120));
                assert!(pause <= Duration::from_secs(300));
            }
        }
        assert_eq!(fired, 1);
        assert_eq!(state.targets_since_long_pause, 0);
        assert_eq!(state.next_long_pause_threshold, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_pause_disabled() {
        let policy = PacingPolicy {
            long_pause_enabled: false,
            long_pause_every: (1, 1),
            ..PacingPolicy::deterministic()
        };
        let engine = PacingEngine::new(policy);
        let mut state = RunState::new(1);
        assert!(engine.maybe_long_pause(&mut state).await.is_none());
        assert_eq!(state.targets_since_long_pause, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_maybe_idle_respects_probability() {
        let never = engine();
        assert!(never.maybe_idle().await.is_none());

        let always = PacingEngine::new(PacingPolicy {
            idle_probability: 1.0,
            ..PacingPolicy::deterministic()
        });
        let idle = always.maybe_idle().await.unwrap();
        assert!(idle >= Duration::from_secs(10) && idle <= Duration::from_secs(30));
    }

    #[test]
    fn test_no_incidental_action_when_closed() {
        let engine = engine();
        for _ in 0..50 {
            assert!(engine.incidental_action().is_none());
        }
    }

    #[test]
    fn test_chance_clamps() {
        assert!(chance(1.5));
        assert!(!chance(-1.0));
        assert!(!chance(f64::NAN));
    }
}
