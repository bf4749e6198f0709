use anyhow::{bail, Result};
use clap::Parser;
use playscrape_common::observability::{init_logging, LogConfig};
use playscrape_config::{CrawlConfig, PlayscrapeConfig, PlayscrapeConfigLoader, SettleConfig};
use playscrape_drivers::{PlayDriver, STOREFRONT_ORIGIN};
use playscrape_reviews::{Orchestrator, ScrollPolicy, SettleStrategy};
use std::time::Duration;
use tracing::{error, info, Instrument};
use uuid::Uuid;
use validate::AppIdValidator;

mod cli;
mod export;
mod validate;

const DEFAULT_CONFIG_FILE: &str = "playscrape.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // 1) Load config (env wins over file, flags win over both)
    let loader = match &cli.config {
        Some(path) => PlayscrapeConfigLoader::new().with_file(path),
        None => PlayscrapeConfigLoader::new().with_optional_file(DEFAULT_CONFIG_FILE),
    };
    let mut cfg: PlayscrapeConfig = loader.load()?;
    cli.apply(&mut cfg)?;

    let logs = init_logging(LogConfig {
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.emit_stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
        ..LogConfig::default()
    })?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    info!(parent: &span, log_file = %logs.path().display(), "run.start");
    let outcome = run(cfg).instrument(span).await;
    drop(logs);
    outcome
}

async fn run(cfg: PlayscrapeConfig) -> Result<()> {
    if let Err(err) = cfg.validate() {
        error!(target: "config", error = %err, "config.invalid");
        return Err(err.into());
    }
    let targets = cfg.app_targets()?;
    let policy = scroll_policy(&cfg.crawl)?;

    if cfg.validation.enabled {
        let validator = AppIdValidator::new(
            STOREFRONT_ORIGIN,
            Duration::from_secs(cfg.validation.timeout_secs),
        )?;
        if let Err(err) = validator.check_all(&targets).await {
            error!(target: "validate", error = %err, "validate.failed");
            return Err(err.into());
        }
    }

    let driver = PlayDriver::launch(
        &cfg.driver_location()?,
        cfg.driver.port,
        cfg.driver.startup_timeout(),
        cfg.driver.navigation_delay(),
    )
    .await?;
    let orchestrator =
        Orchestrator::new(driver, policy).with_page_source(cfg.output.save_page_source);

    let out_dir = cfg.output.dir.clone();
    let mut export_failures = 0usize;
    let result = orchestrator
        .crawl_each(&targets, |crawl| {
            match export::write_app(&out_dir, crawl) {
                Ok(path) => info!(
                    target: "export",
                    app_id = %crawl.target,
                    path = %path.display(),
                    reviews = crawl.reviews.len(),
                    partial = crawl.is_partial(),
                    "export.written"
                ),
                Err(err) => {
                    export_failures += 1;
                    error!(target: "export", app_id = %crawl.target, error = %err, "export.failed");
                }
            }
            match export::write_page_source(&out_dir, crawl) {
                Ok(Some(path)) => info!(
                    target: "export",
                    app_id = %crawl.target,
                    path = %path.display(),
                    "export.source_written"
                ),
                Ok(None) => {}
                Err(err) => {
                    export_failures += 1;
                    error!(target: "export", app_id = %crawl.target, error = %err, "export.source_failed");
                }
            }
        })
        .await;

    if let Err(err) = orchestrator.into_opener().shutdown().await {
        error!(target: "drivers", error = %err, "webdriver.stop_failed");
    }

    info!(
        apps = result.len(),
        reviews = result.total_reviews(),
        out_dir = %out_dir.display(),
        "run.done"
    );
    if export_failures > 0 {
        bail!("{export_failures} app(s) could not be written to {}", out_dir.display());
    }
    Ok(())
}

fn scroll_policy(crawl: &CrawlConfig) -> Result<ScrollPolicy> {
    let settle = match crawl.settle {
        SettleConfig::Fixed { delay_ms } => SettleStrategy::Fixed(Duration::from_millis(delay_ms)),
        SettleConfig::Poll {
            interval_ms,
            timeout_ms,
        } => SettleStrategy::PollUntilStable {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_millis(timeout_ms),
        },
    };
    Ok(ScrollPolicy::new(crawl.max_scrolls)?
        .with_stall_limit(crawl.stall_limit)
        .with_settle(settle)
        .with_expand_truncated(crawl.expand_truncated))
}
