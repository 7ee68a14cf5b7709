//! replybot - paced reply automation for X
//!
//! Discovers recent original posts for a search query, from the live feed and
//! from a list of creators, and replies to a bounded number of them with
//! short generated replies at a human-looking pace.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`scheduler`] - Quota planning and the run loop
//! - [`storage`] - Append-only ledger of processed posts
//! - [`pacing`] - Delays, skip decisions and rest breaks
//! - [`content`] - Reply generation, fallbacks and sanitization
//! - [`llm`] - Completion providers
//! - [`engagement`] - Like/follow decisions
//! - [`browser`] - Browsing collaborator and the WebDriver adapter
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use replybot::browser::XBrowser;
//! use replybot::config::{load_creators, Config};
//! use replybot::content::ContentGenerator;
//! use replybot::llm::ProviderPool;
//! use replybot::pacing::PacingEngine;
//! use replybot::scheduler::{SchedulerSettings, TargetScheduler};
//! use replybot::storage::DedupLedger;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref())?;
//!     let pacing = PacingEngine::new(config.pacing_policy());
//!     let mut browser = XBrowser::new(&config.browser, pacing.clone())?;
//!     browser.start().await?;
//!
//!     let generator = ContentGenerator::new(
//!         ProviderPool::from_config(&config.llm)?,
//!         &config.content,
//!         config.run.search_query.clone(),
//!         config.llm.max_tokens,
//!     );
//!     let mut scheduler = TargetScheduler::new(
//!         browser,
//!         DedupLedger::open(&config.storage.processed_log)?,
//!         generator,
//!         pacing,
//!         config.quota(),
//!         load_creators(&config.storage.creators_file)?,
//!         SchedulerSettings {
//!             search_query: config.run.search_query.clone(),
//!             own_handle: config.run.own_handle.clone(),
//!             max_empty_global_batches: config.run.max_empty_global_batches,
//!         },
//!     );
//!     let summary = scheduler.run().await?;
//!     println!("{} replies", summary.replies_done);
//!     Ok(())
//! }
//! ```

pub mod browser;
pub mod config;
pub mod content;
pub mod engagement;
pub mod error;
pub mod llm;
pub mod models;
pub mod pacing;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::browser::{Browser, XBrowser};
    pub use crate::config::Config;
    pub use crate::content::ContentGenerator;
    pub use crate::error::{Error, ErrorCategory, ReplyErrorTrait, Result};
    pub use crate::llm::{CompletionProvider, ProviderPool};
    pub use crate::models::{Candidate, PostKind, RunSummary, Source, Termination};
    pub use crate::pacing::{PacingEngine, PacingPolicy};
    pub use crate::scheduler::{Quota, TargetScheduler};
    pub use crate::storage::DedupLedger;
}

// Direct re-exports for convenience
pub use models::{Candidate, RunSummary, Termination};
