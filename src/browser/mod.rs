//! Browsing collaborator used by the scheduler
//!
//! The scheduler only sees the [`Browser`] trait. The production
//! implementation is [`x::XBrowser`], which drives a real browser through the
//! W3C WebDriver protocol ([`webdriver::WebDriverClient`]). Tests substitute a
//! scripted fake.
//!
//! Every method fails with [`UiError`], which the scheduler treats as
//! transient: the current candidate is dropped and the run continues.

pub mod webdriver;
pub mod x;

use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::Candidate;
use crate::pacing::IncidentalAction;
use crate::utils::error::UiError;

pub use webdriver::{ElementRef, Locator, WebDriverClient};
pub use x::XBrowser;

pub type UiResult<T> = std::result::Result<T, UiError>;

/// Discovery and interaction capabilities the scheduler depends on
#[async_trait]
pub trait Browser: Send {
    /// Up to `max_count` candidates from the live search feed
    ///
    /// At most one candidate per author; ids in `excluded` are skipped.
    async fn discover_global(
        &mut self,
        query: &str,
        max_count: usize,
        excluded: &HashSet<String>,
    ) -> UiResult<Vec<Candidate>>;

    /// Latest original post by `handle` matching `query`, skipping `excluded`
    async fn discover_for_author(
        &mut self,
        handle: &str,
        query: &str,
        excluded: &HashSet<String>,
    ) -> UiResult<Option<Candidate>>;

    /// Re-check originality on the post's detail view
    async fn verify_original(&mut self, candidate: &Candidate) -> UiResult<bool>;

    /// Open the reply composer for the candidate
    async fn open_composer(&mut self, candidate: &Candidate) -> UiResult<()>;

    /// Type `text` into the open composer and submit it
    async fn submit_text(&mut self, text: &str) -> UiResult<()>;

    async fn like(&mut self, candidate: &Candidate) -> UiResult<()>;

    async fn follow(&mut self, handle: &str) -> UiResult<()>;

    /// Perform an incidental browsing action around `candidate`
    async fn browse_incidental(
        &mut self,
        action: IncidentalAction,
        candidate: &Candidate,
    ) -> UiResult<()>;
}
