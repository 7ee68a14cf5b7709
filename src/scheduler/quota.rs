//! Reply budget split between the global feed and the creator list

use serde::{Deserialize, Serialize};

use crate::models::Source;

/// Per-source reply quotas for one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quota {
    pub global: usize,
    pub creator: usize,
}

impl Quota {
    /// Split `total` by `mix_percent` (clamped into 0..=100)
    ///
    /// `global = round(mix_percent / 100 * total)` using round-half-to-even on
    /// the exact rational value; `creator` takes the remainder.
    pub fn plan(total: usize, mix_percent: i64) -> Self {
        let percent = mix_percent.clamp(0, 100) as u128;
        let scaled = percent * total as u128;
        let mut global = scaled / 100;
        let remainder = scaled % 100;
        if remainder > 50 || (remainder == 50 && global % 2 == 1) {
            global += 1;
        }

        let global = global as usize;
        Self {
            global,
            creator: total - global,
        }
    }

    /// Whole budget to the creator list, used when mix mode is off
    pub fn creators_only(total: usize) -> Self {
        Self {
            global: 0,
            creator: total,
        }
    }

    pub fn total(&self) -> usize {
        self.global + self.creator
    }

    pub fn for_source(&self, source: Source) -> usize {
        match source {
            Source::Global => self.global,
            Source::Creator => self.creator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_sixty_percent_of_ten() {
        assert_eq!(
            Quota::plan(10, 60),
            Quota {
                global: 6,
                creator: 4
            }
        );
    }

    #[test]
    fn test_percent_is_clamped() {
        assert_eq!(Quota::plan(10, 150).global, 10);
        assert_eq!(Quota::plan(10, -20).global, 0);
        assert_eq!(Quota::plan(10, -20).creator, 10);
    }

    #[test]
    fn test_zero_total() {
        assert_eq!(Quota::plan(0, 60).total(), 0);
    }

    #[test]
    fn test_ties_round_to_even() {
        // 2.5 -> 2, 3.5 -> 4
        assert_eq!(Quota::plan(5, 50).global, 2);
        assert_eq!(Quota::plan(7, 50).global, 4);
    }

    #[test]
    fn test_creators_only() {
        let quota = Quota::creators_only(30);
        assert_eq!(quota.for_source(Source::Global), 0);
        assert_eq!(quota.for_source(Source::Creator), 30);
    }

    proptest! {
        #[test]
        fn prop_plan_partitions_total(total in 0usize..=1000, percent in 0i64..=100) {
            let quota = Quota::plan(total, percent);
            prop_assert_eq!(quota.global + quota.creator, total);

            let exact = percent as f64 / 100.0 * total as f64;
            prop_assert!((quota.global as f64 - exact).abs() <= 0.5 + 1e-9);
        }

        #[test]
        fn prop_plan_matches_rounding_off_ties(total in 0usize..=1000, percent in 0i64..=100) {
            let scaled = percent as usize * total;
            prop_assume!(scaled % 100 != 50);
            let expected = (percent as f64 / 100.0 * total as f64).round() as usize;
            prop_assert_eq!(Quota::plan(total, percent).global, expected);
        }
    }
}
