//! X (Twitter) site adapter
//!
//! Implements [`Browser`] on top of [`WebDriverClient`]: search-feed
//! discovery, originality checks, the reply composer, likes, follows and a
//! little incidental browsing. Session bootstrap restores an exported cookie
//! jar so no credentials are ever typed.
//!
//! # Originality signals
//!
//! A post is treated as non-original when any of these hold:
//! - a visible `socialContext` banner (repost)
//! - the article text contains "Replying to" (reply)
//! - a card wrapper or a nested article (quote)

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::BrowserConfig;
use crate::error::Result;
use crate::models::{Candidate, PostKind};
use crate::pacing::{chance, uniform, IncidentalAction, PacingEngine, JITTER_SPREAD, WAIT_LONG, WAIT_MED, WAIT_SHORT};
use crate::utils::error::UiError;

use super::webdriver::{ElementRef, Locator, WebDriverClient};
use super::{Browser, UiResult};

// ============================================================================
// Selectors
// ============================================================================

const ARTICLE: &str = r#"article[role="article"]"#;
const STATUS_LINK: &str = r#".//a[contains(@href, "/status/") and .//time]"#;
const POST_TEXT: &str = r#"div[data-testid="tweetText"]"#;
const AUTHOR_LINK: &str = r#"div[data-testid="User-Name"] a[href^="/"][role="link"]"#;
const SOCIAL_CONTEXT: &str = r#"[data-testid="socialContext"]"#;
const QUOTE_SIGNALS: &str = r#"div[data-testid="card.wrapper"], article article"#;
const REPLY_BUTTON: &str = r#"[data-testid="reply"]"#;
const DIALOG_TEXTAREA: &str = r#"div[role="dialog"] div[data-testid="tweetTextarea_0"]"#;
const TEXTAREA: &str = r#"div[data-testid="tweetTextarea_0"]"#;
const POST_BUTTON: &str = r#"[data-testid="tweetButton"]"#;
const LIKE_BUTTON: &str = r#"[data-testid="like"]"#;
const FOLLOW_BUTTON: &str = r#"button[data-testid*="follow"]"#;
const HASHTAG_LINK: &str = r#"a[href*="/hashtag/"]"#;
const LOGGED_IN_MARKER: &str = r#"[data-testid="SideNav_AccountSwitcher_Button"]"#;

/// Appended to every search so only original posts come back
const SEARCH_FILTERS: &str = "-filter:replies -filter:retweets -filter:quotes";

const GLOBAL_SCROLL_ATTEMPTS: usize = 12;
const CREATOR_SCROLL_ATTEMPTS: usize = 6;

/// Fraction of the viewport scrolled per step
const SCROLL_FRACTION: (f64, f64) = (0.55, 0.65);

// Typing cadence
const TYPE_DELAY_SECS: (f64, f64) = (0.02, 0.08);
const TYPO_PROBABILITY: f64 = 0.03;
const PUNCTUATION_PAUSE_PROBABILITY: f64 = 0.15;
const PUNCTUATION_PAUSE_SECS: (f64, f64) = (0.2, 0.8);

/// WebDriver key code for backspace
const BACKSPACE: &str = "\u{E003}";

/// Live search URL for `query`, optionally restricted to one author
pub fn search_url(site_url: &str, query: &str, author: Option<&str>) -> UiResult<Url> {
    let q = match author {
        Some(handle) => format!("from:{handle} {query} {SEARCH_FILTERS}"),
        None => format!("{query} {SEARCH_FILTERS}"),
    };

    Url::parse_with_params(
        &format!("{}/search", site_url.trim_end_matches('/')),
        &[("q", q.as_str()), ("src", "typed_query"), ("f", "live")],
    )
    .map_err(|e| UiError::Navigation(e.to_string()))
}

/// Split a status link into `(handle, status_id)`
///
/// Accepts both relative (`/user/status/123`) and absolute links; query
/// strings and trailing path segments such as `/photo/1` are ignored.
pub fn parse_status_href(href: &str) -> Option<(String, String)> {
    let path = href
        .split_once("://")
        .map(|(_, rest)| rest.split_once('/').map(|(_, p)| p).unwrap_or(""))
        .unwrap_or(href);
    let path = path.split(['?', '#']).next().unwrap_or("");

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let pos = segments.iter().position(|s| *s == "status")?;
    let handle = segments.get(pos.checked_sub(1)?)?;
    let id = segments.get(pos + 1)?;

    if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((handle.to_string(), id.to_string()))
}

/// [`Browser`] implementation for x.com
pub struct XBrowser {
    driver: WebDriverClient,
    config: BrowserConfig,
    pacing: PacingEngine,
}

impl XBrowser {
    pub fn new(config: &BrowserConfig, pacing: PacingEngine) -> UiResult<Self> {
        let timeout = Duration::from_secs(config.page_load_timeout_secs.saturating_add(30));
        let driver = WebDriverClient::new(&config.webdriver_url, timeout)?;

        Ok(Self {
            driver,
            config: config.clone(),
            pacing,
        })
    }

    fn site(&self) -> &str {
        self.config.site_url.trim_end_matches('/')
    }

    fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.config.page_load_timeout_secs)
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Start a Chrome session
    pub async fn start(&mut self) -> UiResult<()> {
        let mut args = vec![
            format!("--user-agent={}", self.config.user_agent),
            "--window-size=1280,900".to_string(),
        ];
        if self.config.headless {
            args.push("--headless=new".to_string());
        }

        let capabilities = json!({
            "browserName": "chrome",
            "goog:chromeOptions": { "args": args },
        });

        let session = self.driver.start_session(capabilities).await?;
        self.driver.set_page_load_timeout(self.page_timeout()).await?;
        info!(session_id = %session, headless = self.config.headless, "Browser session started");
        Ok(())
    }

    /// Load the cookie jar and confirm the account is logged in
    pub async fn restore_session(&mut self, cookie_file: &Path) -> Result<bool> {
        self.driver.goto(self.site()).await?;
        self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;

        if cookie_file.exists() {
            let raw = std::fs::read_to_string(cookie_file)?;
            let cookies: Vec<Value> = serde_json::from_str(&raw)?;
            let mut loaded = 0usize;

            for cookie in cookies {
                if self.add_cookie(cookie).await {
                    loaded += 1;
                }
            }
            info!(loaded, path = %cookie_file.display(), "Cookies restored");

            self.driver.refresh().await?;
            self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;
        } else {
            warn!(path = %cookie_file.display(), "Cookie file not found, continuing without it");
        }

        self.ensure_logged_in().await.map_err(Into::into)
    }

    /// Add one exported cookie, retrying without a leading `.` on the domain
    async fn add_cookie(&self, mut cookie: Value) -> bool {
        let Some(obj) = cookie.as_object_mut() else {
            return false;
        };
        obj.remove("sameSite");

        if self.driver.add_cookie(cookie.clone()).await.is_ok() {
            return true;
        }

        let stripped = cookie
            .get("domain")
            .and_then(Value::as_str)
            .and_then(|d| d.strip_prefix('.'))
            .map(String::from);

        if let Some(domain) = stripped {
            cookie["domain"] = Value::String(domain);
            if self.driver.add_cookie(cookie).await.is_ok() {
                return true;
            }
        }

        debug!("Skipped a cookie the driver rejected");
        false
    }

    pub async fn ensure_logged_in(&self) -> UiResult<bool> {
        match self
            .driver
            .wait_for(&Locator::css(LOGGED_IN_MARKER), self.page_timeout())
            .await
        {
            Ok(_) => Ok(true),
            Err(UiError::Timeout(_)) => {
                warn!("Account switcher not found, session does not look logged in");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Write the current cookie jar back to `path`
    pub async fn save_cookies(&self, path: &Path) -> Result<()> {
        let cookies = self.driver.cookies().await?;
        std::fs::write(path, serde_json::to_string_pretty(&cookies)?)?;
        info!(count = cookies.len(), path = %path.display(), "Cookies saved");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> UiResult<()> {
        self.driver.end_session().await
    }

    // ========================================================================
    // Page helpers
    // ========================================================================

    async fn scroll(&self) -> UiResult<()> {
        let fraction = uniform(SCROLL_FRACTION.0, SCROLL_FRACTION.1);
        let script = format!("window.scrollBy(0, Math.floor(window.innerHeight * {fraction:.3}));");
        self.driver.execute(&script, &[]).await?;
        self.pacing.pause(WAIT_MED, JITTER_SPREAD).await;
        Ok(())
    }

    async fn read_article(&self, article: &ElementRef) -> UiResult<Option<Candidate>> {
        let link = self
            .driver
            .find_in(article, &Locator::xpath(STATUS_LINK))
            .await?;
        let Some(href) = self.driver.attribute(&link, "href").await? else {
            return Ok(None);
        };
        let Some((link_handle, id)) = parse_status_href(&href) else {
            return Ok(None);
        };

        let author = match self.driver.find_in(article, &Locator::css(AUTHOR_LINK)).await {
            Ok(el) => self
                .driver
                .attribute(&el, "href")
                .await?
                .map(|h| h.trim_matches('/').to_string())
                .filter(|h| !h.is_empty() && !h.contains('/'))
                .unwrap_or(link_handle),
            Err(UiError::ElementNotFound(_)) => link_handle,
            Err(e) => return Err(e),
        };

        let text = match self.driver.find_in(article, &Locator::css(POST_TEXT)).await {
            Ok(el) => self.driver.text(&el).await?,
            Err(UiError::ElementNotFound(_)) => String::new(),
            Err(e) => return Err(e),
        };

        let kind = self.detect_kind(article).await?;
        let url = format!("{}/{author}/status/{id}", self.site());
        Ok(Some(Candidate::new(id, url, author, text).with_kind(kind)))
    }

    async fn detect_kind(&self, article: &ElementRef) -> UiResult<PostKind> {
        for banner in self
            .driver
            .find_all_in(article, &Locator::css(SOCIAL_CONTEXT))
            .await?
        {
            if self.driver.is_displayed(&banner).await.unwrap_or(false) {
                return Ok(PostKind::Repost);
            }
        }

        if self.driver.text(article).await?.contains("Replying to") {
            return Ok(PostKind::Reply);
        }

        if !self
            .driver
            .find_all_in(article, &Locator::css(QUOTE_SIGNALS))
            .await?
            .is_empty()
        {
            return Ok(PostKind::Quote);
        }

        Ok(PostKind::Original)
    }

    /// Articles on the current page parsed into candidates; broken ones are skipped
    async fn visible_candidates(&self) -> UiResult<Vec<Candidate>> {
        let articles = self.driver.find_all(&Locator::css(ARTICLE)).await?;
        let mut candidates = Vec::with_capacity(articles.len());

        for article in &articles {
            match self.read_article(article).await {
                Ok(Some(candidate)) => candidates.push(candidate),
                Ok(None) => {}
                Err(e) => debug!(error = %e, "Skipping unreadable article"),
            }
        }
        Ok(candidates)
    }

    async fn detail_article(&self, candidate: &Candidate) -> UiResult<ElementRef> {
        let xpath = format!(r#"//article[.//a[contains(@href,"/status/{}")]]"#, candidate.id);
        self.driver
            .wait_for(&Locator::xpath(xpath), self.page_timeout())
            .await
    }

    async fn find_textarea(&self) -> UiResult<ElementRef> {
        match self.driver.find(&Locator::css(DIALOG_TEXTAREA)).await {
            Ok(el) => Ok(el),
            Err(UiError::ElementNotFound(_)) => {
                self.driver
                    .wait_for(&Locator::css(TEXTAREA), self.page_timeout())
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Type character by character with occasional corrected typos
    async fn type_like_human(&self, element: &ElementRef, text: &str) -> UiResult<()> {
        for ch in text.chars() {
            if ch.is_alphabetic() && chance(TYPO_PROBABILITY) {
                let typo = rand::thread_rng().gen_range(b'a'..=b'z') as char;
                self.driver.send_keys(element, &typo.to_string()).await?;
                sleep_secs(uniform(TYPE_DELAY_SECS.0, TYPE_DELAY_SECS.1)).await;
                self.driver.send_keys(element, BACKSPACE).await?;
            }

            self.driver.send_keys(element, &ch.to_string()).await?;
            sleep_secs(uniform(TYPE_DELAY_SECS.0, TYPE_DELAY_SECS.1)).await;

            if matches!(ch, '.' | '!' | '?' | ' ') && chance(PUNCTUATION_PAUSE_PROBABILITY) {
                sleep_secs(uniform(PUNCTUATION_PAUSE_SECS.0, PUNCTUATION_PAUSE_SECS.1)).await;
            }
        }
        Ok(())
    }
}

async fn sleep_secs(secs: f64) {
    tokio::time::sleep(Duration::from_secs_f64(secs.max(0.0))).await;
}

#[async_trait]
impl Browser for XBrowser {
    async fn discover_global(
        &mut self,
        query: &str,
        max_count: usize,
        excluded: &HashSet<String>,
    ) -> UiResult<Vec<Candidate>> {
        let url = search_url(self.site(), query, None)?;
        self.driver.goto(url.as_str()).await?;
        self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;

        let mut found: Vec<Candidate> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut seen_authors: HashSet<String> = HashSet::new();

        for attempt in 0..GLOBAL_SCROLL_ATTEMPTS {
            for candidate in self.visible_candidates().await? {
                if found.len() >= max_count {
                    break;
                }
                if excluded.contains(&candidate.id)
                    || !candidate.kind.is_original()
                    || !candidate.mentions(query)
                    || !seen_ids.insert(candidate.id.clone())
                    || !seen_authors.insert(candidate.author_key())
                {
                    continue;
                }
                found.push(candidate);
            }

            debug!(attempt, collected = found.len(), max_count, "Global discovery pass");
            if found.len() >= max_count {
                break;
            }
            self.scroll().await?;
        }

        Ok(found)
    }

    async fn discover_for_author(
        &mut self,
        handle: &str,
        query: &str,
        excluded: &HashSet<String>,
    ) -> UiResult<Option<Candidate>> {
        let url = search_url(self.site(), query, Some(handle))?;
        self.driver.goto(url.as_str()).await?;
        self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;

        for attempt in 0..CREATOR_SCROLL_ATTEMPTS {
            let hit = self.visible_candidates().await?.into_iter().find(|c| {
                c.is_authored_by(handle)
                    && c.kind.is_original()
                    && c.mentions(query)
                    && !excluded.contains(&c.id)
            });
            if hit.is_some() {
                return Ok(hit);
            }

            debug!(handle, attempt, "No eligible post yet, scrolling");
            self.scroll().await?;
        }

        Ok(None)
    }

    async fn verify_original(&mut self, candidate: &Candidate) -> UiResult<bool> {
        self.driver.goto(&candidate.url).await?;
        self.pacing.pause(WAIT_MED, JITTER_SPREAD).await;

        let article = self.detail_article(candidate).await?;
        let kind = self.detect_kind(&article).await?;
        if !kind.is_original() {
            debug!(tweet_id = %candidate.id, kind = kind.as_str(), "Detail view is not an original post");
        }
        Ok(kind.is_original())
    }

    async fn open_composer(&mut self, candidate: &Candidate) -> UiResult<()> {
        let article = self.detail_article(candidate).await?;
        let button = self.driver.find_in(&article, &Locator::css(REPLY_BUTTON)).await?;
        self.driver.click(&button).await?;
        self.pacing.pause(WAIT_MED, JITTER_SPREAD).await;

        self.find_textarea().await?;
        Ok(())
    }

    async fn submit_text(&mut self, text: &str) -> UiResult<()> {
        let textarea = self.find_textarea().await?;
        self.driver.click(&textarea).await?;
        self.pacing.pause(WAIT_SHORT, JITTER_SPREAD).await;

        self.type_like_human(&textarea, text).await?;
        self.pacing.pause(WAIT_MED, JITTER_SPREAD).await;

        let button = self
            .driver
            .wait_for(&Locator::css(POST_BUTTON), self.page_timeout())
            .await?;
        self.driver.click(&button).await?;
        self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;
        Ok(())
    }

    async fn like(&mut self, candidate: &Candidate) -> UiResult<()> {
        let article = self.detail_article(candidate).await?;
        let button = self.driver.find_in(&article, &Locator::css(LIKE_BUTTON)).await?;
        self.driver.click(&button).await?;
        self.pacing.pause(WAIT_SHORT, JITTER_SPREAD).await;
        Ok(())
    }

    async fn follow(&mut self, handle: &str) -> UiResult<()> {
        let profile = format!("{}/{handle}", self.site());
        self.driver.goto(&profile).await?;
        self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;

        let button = self
            .driver
            .wait_for(&Locator::css(FOLLOW_BUTTON), self.page_timeout())
            .await?;
        let testid = self
            .driver
            .attribute(&button, "data-testid")
            .await?
            .unwrap_or_default();

        if testid.to_lowercase().contains("unfollow") {
            debug!(handle, "Already following");
            return Ok(());
        }

        self.driver.click(&button).await?;
        self.pacing.pause(WAIT_MED, JITTER_SPREAD).await;
        Ok(())
    }

    async fn browse_incidental(
        &mut self,
        action: IncidentalAction,
        candidate: &Candidate,
    ) -> UiResult<()> {
        match action {
            IncidentalAction::VisitProfile => {
                let profile = format!("{}/{}", self.site(), candidate.author);
                self.driver.goto(&profile).await?;
                self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;
                self.scroll().await?;
                self.driver.back().await?;
            }
            IncidentalAction::ClickHashtag => {
                let links = self.driver.find_all(&Locator::css(HASHTAG_LINK)).await?;
                let Some(link) = links.choose(&mut rand::thread_rng()).cloned() else {
                    return Ok(());
                };
                self.driver.click(&link).await?;
                self.pacing.pause(WAIT_LONG, JITTER_SPREAD).await;
                self.driver.back().await?;
            }
            IncidentalAction::Scroll => {
                self.scroll().await?;
            }
            IncidentalAction::Linger(duration) => {
                tokio::time::sleep(duration).await;
            }
        }
        self.pacing.pause(WAIT_SHORT, JITTER_SPREAD).await;
        Ok(())
    }
}
