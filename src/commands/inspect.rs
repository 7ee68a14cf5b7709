use anyhow::{Context, Result};

use replybot::config::{load_creators, Config};
use replybot::llm::ProviderPool;
use replybot::scheduler::Quota;
use replybot::storage::DedupLedger;

pub fn plan(total: usize, percent: i64) {
    let quota = Quota::plan(total, percent);
    println!("Budget split for {total} replies at {percent}% global");
    println!("================================");
    println!("  Global feed: {}", quota.global);
    println!("  Creators:    {}", quota.creator);
}

pub fn check(config: &Config) -> Result<()> {
    let providers = ProviderPool::from_config(&config.llm)?;
    let creators = load_creators(&config.storage.creators_file)?;
    let ledger = DedupLedger::open(&config.storage.processed_log)
        .context("Failed to load processed-post ledger")?;
    let quota = config.quota();

    println!("Configuration OK");
    println!("================================");
    println!("  Search query:   {}", config.run.search_query);
    println!(
        "  Own handle:     {}",
        if config.run.own_handle.is_empty() {
            "(not set)"
        } else {
            config.run.own_handle.as_str()
        }
    );
    println!(
        "  Budget:         {} (global {}, creators {}, mix {})",
        quota.total(),
        quota.global,
        quota.creator,
        if config.run.mix_enabled { "on" } else { "off" }
    );
    println!("  Long pauses:    {}", config.run.enable_long_pause);
    println!(
        "  Providers:      {} ({})",
        providers.len(),
        config.llm.model
    );
    println!("  Creators:       {}", creators.len());
    println!("  Ledger entries: {}", ledger.len());
    println!("  WebDriver:      {}", config.browser.webdriver_url);
    println!(
        "  Cookie file:    {} ({})",
        config.browser.cookie_file.display(),
        if config.browser.cookie_file.exists() {
            "found"
        } else {
            "missing"
        }
    );

    if providers.is_empty() {
        println!();
        println!("No API keys configured: every reply will come from the fallback pools.");
    }
    if quota.creator > 0 && creators.is_empty() {
        println!();
        println!("Creator quota is {} but the creator list is empty.", quota.creator);
    }

    Ok(())
}

pub fn ledger(config: &Config, list: bool) -> Result<()> {
    let ledger = DedupLedger::open(&config.storage.processed_log)
        .context("Failed to load processed-post ledger")?;

    println!("Ledger: {}", ledger.path().display());
    println!("================================");
    println!("  Processed posts: {}", ledger.len());

    if list {
        let mut ids: Vec<&String> = ledger.ids().iter().collect();
        ids.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        for id in ids {
            println!("  {id}");
        }
    }

    Ok(())
}
