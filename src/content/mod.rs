//! Reply content generation
//!
//! # Generation flow
//!
//! 1. Pick a prompt template and a system prompt at random.
//! 2. Ask each provider in [`ProviderPool`] order until one succeeds.
//! 3. If none does (or none is configured), pick a canned reply for the
//!    post's [`FallbackCategory`].
//! 4. Run the text through [`sanitize_reply`].
//!
//! [`ContentGenerator::generate`] never fails.

pub mod fallback;
pub mod sanitize;

use handlebars::Handlebars;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::ContentConfig;
use crate::llm::{CompletionRequest, ProviderPool};
use crate::utils::error::ProviderError;
use crate::utils::truncate_chars;

pub use fallback::{classify, FallbackCategory, FallbackPools};
pub use sanitize::{sanitize_reply, DEFAULT_REPLY, MAX_WORDS};

/// Built-in user prompt template
pub const DEFAULT_PROMPT_TEMPLATE: &str = "You are writing one short reply to a post about {{search_query}}.\n\
Rules:\n\
- Maximum 15 words.\n\
- Sound casual and human, like a real person scrolling.\n\
- Add a small insight or a light question.\n\
- No hashtags, links or emojis.\n\
Post: \"{{tweet_text}}\"\n\
Reply:";

/// Built-in system prompt
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a thoughtful developer who replies to posts briefly and casually.";

/// Prepended to every system prompt
pub const FORMAT_INSTRUCTION: &str = "Always reply in exactly two lines: first line is your insight, \
second line is a signature-style attribution. Leave one blank line between.";

/// Appended to every user prompt
pub const STYLE_SUFFIX: &str = "Avoid links, hashtags, emojis, or fancy punctuation.";

/// Post text beyond this many characters is not sent to providers
pub const MAX_PROMPT_TEXT_CHARS: usize = 600;

/// Completion temperature band
const TEMPERATURE_RANGE: (f32, f32) = (0.7, 0.9);

/// Produces sanitized reply text for a post
pub struct ContentGenerator {
    providers: ProviderPool,
    templates: Vec<String>,
    system_prompts: Vec<String>,
    fallbacks: FallbackPools,
    search_query: String,
    max_tokens: u32,
    renderer: Handlebars<'static>,
}

impl ContentGenerator {
    pub fn new(
        providers: ProviderPool,
        content: &ContentConfig,
        search_query: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let content = content.clone().with_defaults();

        let mut renderer = Handlebars::new();
        renderer.register_escape_fn(handlebars::no_escape);

        Self {
            providers,
            fallbacks: content.fallback_pools(),
            templates: content.prompt_templates,
            system_prompts: content.system_prompts,
            search_query: search_query.into(),
            max_tokens,
            renderer,
        }
    }

    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Reply text for `text`, from a provider or the fallback pools
    pub async fn generate(&self, text: &str) -> String {
        if self.providers.is_empty() {
            debug!("No providers configured, using fallback reply");
            return self.fallback_reply(text);
        }

        let request = self.build_request(text);
        match self.providers.complete_first(&request).await {
            Ok(completion) => {
                debug!(provider = %completion.provider, "Reply generated");
                sanitize_reply(&completion.text)
            }
            Err(e) => {
                warn!(error = %e, "All completion providers failed, using fallback reply");
                self.fallback_reply(text)
            }
        }
    }

    /// Sanitized canned reply for the post's category
    pub fn fallback_reply(&self, text: &str) -> String {
        let category = classify(text);
        debug!(category = category.as_str(), "Fallback category");
        sanitize_reply(self.fallbacks.pick(category))
    }

    fn build_request(&self, text: &str) -> CompletionRequest {
        let mut rng = rand::thread_rng();
        let template = self
            .templates
            .choose(&mut rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_PROMPT_TEMPLATE);
        let system = self
            .system_prompts
            .choose(&mut rng)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let temperature = rng.gen_range(TEMPERATURE_RANGE.0..=TEMPERATURE_RANGE.1);

        let user = match self.render_prompt(template, text) {
            Ok(prompt) => prompt,
            Err(e) => {
                warn!(error = %e, "Prompt template failed to render, using built-in template");
                self.render_prompt(DEFAULT_PROMPT_TEMPLATE, text)
                    .unwrap_or_else(|_| format!("Post: \"{text}\"\nReply:"))
            }
        };

        CompletionRequest {
            system_prompt: format!("{FORMAT_INSTRUCTION} {system}"),
            user_prompt: format!("{user} {STYLE_SUFFIX}"),
            max_tokens: self.max_tokens,
            temperature,
            stop: vec!["\n".to_string()],
        }
    }

    fn render_prompt(&self, template: &str, text: &str) -> Result<String, ProviderError> {
        let data = json!({
            "search_query": self.search_query,
            "tweet_text": truncate_chars(text, MAX_PROMPT_TEXT_CHARS),
        });
        self.renderer
            .render_template(template, &data)
            .map_err(|e| ProviderError::Template(e.to_string()))
    }
}
