use anyhow::{Context, Result};
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use replybot::browser::XBrowser;
use replybot::config::{load_creators, Config};
use replybot::content::ContentGenerator;
use replybot::error::ReplyErrorTrait;
use replybot::llm::ProviderPool;
use replybot::models::RunSummary;
use replybot::pacing::PacingEngine;
use replybot::scheduler::{SchedulerSettings, TargetScheduler};
use replybot::storage::DedupLedger;
use replybot::utils::format_elapsed;

pub async fn run(mut config: Config, max_replies: Option<usize>, creators_only: bool) -> Result<()> {
    if let Some(max_replies) = max_replies {
        config.run.max_replies = max_replies;
        config.validate()?;
    }
    if creators_only {
        config.run.mix_enabled = false;
    }

    let run_id = Uuid::new_v4().to_string();
    let span = tracing::info_span!("run", run_id = %run_id);

    execute(config, run_id).instrument(span).await
}

async fn execute(config: Config, run_id: String) -> Result<()> {
    let ledger = DedupLedger::open(&config.storage.processed_log)
        .context("Failed to load processed-post ledger")?;
    let creators = load_creators(&config.storage.creators_file)?;
    let providers = ProviderPool::from_config(&config.llm)?;
    let generator = ContentGenerator::new(
        providers,
        &config.content,
        config.run.search_query.clone(),
        config.llm.max_tokens,
    );
    let pacing = PacingEngine::new(config.pacing_policy());

    let mut browser = XBrowser::new(&config.browser, pacing.clone())?;
    browser
        .start()
        .await
        .context("Failed to start browser session")?;

    match browser.restore_session(&config.browser.cookie_file).await {
        Ok(true) => info!("Logged in"),
        Ok(false) => {
            shutdown(&mut browser, None).await;
            anyhow::bail!(
                "Not logged in; export fresh cookies to {}",
                config.browser.cookie_file.display()
            );
        }
        Err(e) => {
            shutdown(&mut browser, None).await;
            return Err(e).context("Failed to restore browser session");
        }
    }

    let mut scheduler = TargetScheduler::new(
        browser,
        ledger,
        generator,
        pacing,
        config.quota(),
        creators,
        SchedulerSettings {
            search_query: config.run.search_query.clone(),
            own_handle: config.run.own_handle.clone(),
            max_empty_global_batches: config.run.max_empty_global_batches,
        },
    )
    .with_run_id(run_id);

    let outcome = tokio::select! {
        result = scheduler.run() => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    shutdown(scheduler.browser_mut(), Some(&config)).await;

    match outcome {
        Some(Ok(summary)) => {
            print_summary(&summary);
            Ok(())
        }
        Some(Err(e)) => {
            error!(
                category = e.category().as_str(),
                recoverable = e.is_recoverable(),
                error = %e,
                "Run aborted"
            );
            Err(e.into())
        }
        None => {
            warn!("Interrupted, stopping run");
            Ok(())
        }
    }
}

/// Save cookies (when a config is given) and close the session; failures are logged
async fn shutdown(browser: &mut XBrowser, config: Option<&Config>) {
    if let Some(config) = config {
        if let Err(e) = browser.save_cookies(&config.browser.cookie_file).await {
            warn!(error = %e, "Failed to save cookies");
        }
    }
    if let Err(e) = browser.shutdown().await {
        warn!(error = %e, "Failed to close browser session");
    }
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!("Run {} finished", summary.run_id);
    println!("================================");
    println!(
        "  Replies:     {}/{}",
        summary.replies_done, summary.total_budget
    );
    println!("  Global:      {}", summary.global_done);
    println!("  Creators:    {}", summary.creators_done);
    println!("  Targets:     {}", summary.targets_processed);
    println!("  Long pauses: {}", summary.long_pauses);
    println!("  Elapsed:     {}", format_elapsed(summary.elapsed()));
    println!("  Stopped:     {:?}", summary.termination);
}
