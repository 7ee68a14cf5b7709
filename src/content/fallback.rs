//! Canned replies used when no completion provider succeeds

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Coarse tone of a post, used to pick a fallback pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackCategory {
    Question,
    Positive,
    Negative,
    General,
}

impl FallbackCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Question => "question",
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::General => "general",
        }
    }
}

const QUESTION_MARKERS: &[&str] = &["?", "what do you think", "how do you", "anyone tried"];
const POSITIVE_MARKERS: &[&str] = &["awesome", "great", "love", "amazing", "cool", "nice"];
const NEGATIVE_MARKERS: &[&str] = &["hate", "terrible", "bad", "worst", "annoying"];

/// Classify post text by keyword, checked in question, positive, negative order
pub fn classify(text: &str) -> FallbackCategory {
    let lower = text.to_lowercase();
    let has_any = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if has_any(QUESTION_MARKERS) {
        FallbackCategory::Question
    } else if has_any(POSITIVE_MARKERS) {
        FallbackCategory::Positive
    } else if has_any(NEGATIVE_MARKERS) {
        FallbackCategory::Negative
    } else {
        FallbackCategory::General
    }
}

pub const DEFAULT_QUESTION_REPLY: &str = "Good question\ncurious what others think too";
pub const DEFAULT_POSITIVE_REPLY: &str = "Love this\nreally great to see";
pub const DEFAULT_NEGATIVE_REPLY: &str = "Fair point\nthat does sound frustrating";
pub const DEFAULT_GENERAL_REPLY: &str = "Interesting take\nthanks for sharing";

/// Fallback reply pools keyed by category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackPools {
    #[serde(default)]
    pub questions: Vec<String>,
    #[serde(default)]
    pub positive: Vec<String>,
    #[serde(default)]
    pub negative: Vec<String>,
    #[serde(default)]
    pub general: Vec<String>,
}

impl FallbackPools {
    /// Fill every empty pool with its built-in default
    pub fn with_defaults(mut self) -> Self {
        for (pool, default) in [
            (&mut self.questions, DEFAULT_QUESTION_REPLY),
            (&mut self.positive, DEFAULT_POSITIVE_REPLY),
            (&mut self.negative, DEFAULT_NEGATIVE_REPLY),
            (&mut self.general, DEFAULT_GENERAL_REPLY),
        ] {
            pool.retain(|s| !s.trim().is_empty());
            if pool.is_empty() {
                pool.push(default.to_string());
            }
        }
        self
    }

    pub fn pool(&self, category: FallbackCategory) -> &[String] {
        match category {
            FallbackCategory::Question => &self.questions,
            FallbackCategory::Positive => &self.positive,
            FallbackCategory::Negative => &self.negative,
            FallbackCategory::General => &self.general,
        }
    }

    /// Uniform pick from the category's pool
    ///
    /// An empty pool yields the category default so callers always get text.
    pub fn pick(&self, category: FallbackCategory) -> &str {
        self.pool(category)
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(match category {
                FallbackCategory::Question => DEFAULT_QUESTION_REPLY,
                FallbackCategory::Positive => DEFAULT_POSITIVE_REPLY,
                FallbackCategory::Negative => DEFAULT_NEGATIVE_REPLY,
                FallbackCategory::General => DEFAULT_GENERAL_REPLY,
            })
    }
}
