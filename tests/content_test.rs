//! Tests for reply generation under provider failure

mod common;

use std::sync::{Arc, Mutex};

use common::FailingProvider;
use replybot::config::ContentConfig;
use replybot::content::{classify, sanitize_reply, ContentGenerator, FallbackCategory, MAX_WORDS};
use replybot::llm::ProviderPool;

fn content_with_pools() -> ContentConfig {
    ContentConfig {
        fallback_questions: vec!["Good question honestly, I keep wondering the same".to_string()],
        fallback_positive: vec!["This is great work, congrats on shipping".to_string()],
        fallback_negative: vec!["Rough one, hope the next release goes smoother".to_string()],
        fallback_general: vec!["Interesting take, bookmarking this one".to_string()],
        ..ContentConfig::default()
    }
}

#[tokio::test]
async fn test_all_providers_failing_uses_category_fallback() {
    let calls = Arc::new(Mutex::new(0));
    let pool = ProviderPool::new(vec![
        FailingProvider::boxed("a", &calls),
        FailingProvider::boxed("b", &calls),
        FailingProvider::boxed("c", &calls),
    ]);
    let generator = ContentGenerator::new(pool, &content_with_pools(), "rust", 40);

    let text = "Anyone tried the new borrow checker diagnostics?";
    assert_eq!(classify(text), FallbackCategory::Question);

    let reply = generator.generate(text).await;
    assert_eq!(
        reply,
        sanitize_reply("Good question honestly, I keep wondering the same")
    );
    assert_eq!(*calls.lock().unwrap(), 3);
}

#[tokio::test]
async fn test_each_category_reaches_its_pool() {
    let generator = ContentGenerator::new(ProviderPool::default(), &content_with_pools(), "rust", 40);

    let cases = [
        ("love the new release", "This is great work, congrats on shipping"),
        ("the worst build times ever", "Rough one, hope the next release goes smoother"),
        ("released version two today", "Interesting take, bookmarking this one"),
    ];
    for (post, pool_entry) in cases {
        assert_eq!(generator.generate(post).await, sanitize_reply(pool_entry));
    }
}

#[tokio::test]
async fn test_zero_providers_still_produce_valid_reply() {
    let generator =
        ContentGenerator::new(ProviderPool::default(), &ContentConfig::default(), "rust", 40);
    assert_eq!(generator.provider_count(), 0);

    let reply = generator.generate("hi").await;
    let lines: Vec<&str> = reply.split("\n\n").collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.iter().all(|l| !l.trim().is_empty() && !l.contains('\n')));
    assert!(reply.chars().next().unwrap().is_uppercase());
    assert!(reply.split_whitespace().count() <= MAX_WORDS);
}
