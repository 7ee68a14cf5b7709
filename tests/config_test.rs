//! Tests for config module

use serial_test::serial;
use std::path::Path;

use replybot::config::{load_creators, Config};

fn clear_env() {
    for key in [
        "REPLYBOT_MAX_REPLIES",
        "REPLYBOT_MIX_GLOBAL_PERCENT",
        "REPLYBOT_SEARCH_QUERY",
        "REPLYBOT_OWN_HANDLE",
        "REPLYBOT_WEBDRIVER_URL",
        "REPLYBOT_LOG_LEVEL",
        "REPLYBOT_LOG_FORMAT",
        "LLM_API_KEYS",
    ] {
        std::env::remove_var(key);
    }
}

#[test]
fn test_config_file_exists() {
    let config_path = Path::new("config.toml");
    assert!(
        config_path.exists(),
        "config.toml should exist in project root"
    );
}

#[test]
fn test_shipped_config_parses_and_validates() {
    let config = Config::from_file(Path::new("config.toml")).expect("config.toml should parse");
    config.validate().expect("config.toml should be valid");

    assert!(config.run.max_replies > 0);
    assert!(!config.content.prompt_templates.is_empty());
    assert!(config
        .content
        .prompt_templates
        .iter()
        .all(|t| t.contains("{{tweet_text}}")));
}

#[test]
fn test_shipped_creators_file_loads() {
    let creators = load_creators(Path::new("creators.txt")).unwrap();
    assert!(!creators.is_empty());
    assert!(creators.iter().all(|c| !c.starts_with('@') && !c.trim().is_empty()));
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    std::env::set_var("REPLYBOT_MAX_REPLIES", "7");
    std::env::set_var("REPLYBOT_MIX_GLOBAL_PERCENT", "25");
    std::env::set_var("REPLYBOT_SEARCH_QUERY", "tokio");
    std::env::set_var("LLM_API_KEYS", "key-a, key-b,,");

    let mut config = Config::default();
    config.apply_env();
    clear_env();

    assert_eq!(config.run.max_replies, 7);
    assert_eq!(config.run.mix_global_percent, 25);
    assert_eq!(config.run.search_query, "tokio");
    assert_eq!(config.llm.api_keys, vec!["key-a".to_string(), "key-b".to_string()]);
}

#[test]
#[serial]
fn test_unparsable_env_values_are_ignored() {
    clear_env();
    std::env::set_var("REPLYBOT_MAX_REPLIES", "lots");

    let config = Config::from_env().unwrap();
    clear_env();

    assert_eq!(config.run.max_replies, Config::default().run.max_replies);
}

#[test]
#[serial]
fn test_load_rejects_invalid_env_percent() {
    clear_env();
    std::env::set_var("REPLYBOT_MIX_GLOBAL_PERCENT", "140");

    let dir = tempfile::tempdir().unwrap();
    let result = Config::load(&dir.path().join("missing.toml"));
    clear_env();

    assert!(result.is_err());
}

#[test]
#[serial]
fn test_load_missing_file_uses_defaults() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&dir.path().join("missing.toml")).unwrap();

    assert_eq!(config.run.max_replies, 30);
    assert_eq!(config.quota().total(), 30);
}
