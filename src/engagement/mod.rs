//! Secondary actions after a confirmed reply
//!
//! Like and follow are independent Bernoulli draws. The probabilities are
//! fixed policy values, not configuration.

use crate::pacing::chance;

/// Probability of liking a post after replying to it
pub const LIKE_PROBABILITY: f64 = 0.30;

/// Probability of following the author after replying
pub const FOLLOW_PROBABILITY: f64 = 0.02;

/// Like/follow decision policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngagementPolicy {
    pub like_probability: f64,
    pub follow_probability: f64,
}

impl Default for EngagementPolicy {
    fn default() -> Self {
        Self {
            like_probability: LIKE_PROBABILITY,
            follow_probability: FOLLOW_PROBABILITY,
        }
    }
}

impl EngagementPolicy {
    /// Never like or follow
    pub fn disabled() -> Self {
        Self {
            like_probability: 0.0,
            follow_probability: 0.0,
        }
    }

    pub fn like_decision(&self) -> bool {
        chance(self.like_probability)
    }

    pub fn follow_decision(&self) -> bool {
        chance(self.follow_probability)
    }
}
