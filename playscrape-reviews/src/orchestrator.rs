//! Sequential per-app crawl driver.
//!
//! One session is open at a time: each app's session is closed before the
//! next one opens, and one app's failure never aborts the batch.
use crate::navigator::{Navigator, SessionOpener};
use crate::record::ReviewRecord;
use crate::scroll::{ScrollPolicy, ScrollSession, StopReason};
use playscrape_common::AppTarget;
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Result of crawling one app. Complete or partial, it is always reported.
#[derive(Debug, Clone)]
pub struct AppCrawl {
    pub target: AppTarget,
    pub title: Option<String>,
    pub reviews: Vec<ReviewRecord>,
    pub scrolls_performed: u32,
    pub skipped: usize,
    pub stop: StopReason,
    /// Page HTML captured after the loop, when archiving is on.
    pub page_source: Option<String>,
}

impl AppCrawl {
    fn failed_to_open(target: AppTarget, stop: StopReason) -> Self {
        Self {
            target,
            title: None,
            reviews: Vec::new(),
            scrolls_performed: 0,
            skipped: 0,
            stop,
            page_source: None,
        }
    }

    /// True when a session failure cut the crawl short.
    pub fn is_partial(&self) -> bool {
        self.stop.failure().is_some()
    }
}

/// Per-app results in input order.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    entries: Vec<AppCrawl>,
}

impl CrawlResult {
    pub fn entries(&self) -> &[AppCrawl] {
        &self.entries
    }

    pub fn get(&self, target: &AppTarget) -> Option<&AppCrawl> {
        self.entries.iter().find(|e| &e.target == target)
    }

    pub fn reviews_for(&self, target: &AppTarget) -> Option<&[ReviewRecord]> {
        self.get(target).map(|e| e.reviews.as_slice())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_reviews(&self) -> usize {
        self.entries.iter().map(|e| e.reviews.len()).sum()
    }

    pub fn into_entries(self) -> Vec<AppCrawl> {
        self.entries
    }
}

pub struct Orchestrator<O: SessionOpener> {
    opener: O,
    policy: ScrollPolicy,
    capture_source: bool,
}

impl<O: SessionOpener> Orchestrator<O> {
    pub fn new(opener: O, policy: ScrollPolicy) -> Self {
        Self {
            opener,
            policy,
            capture_source: false,
        }
    }

    /// Capture each page's HTML before its session closes.
    pub fn with_page_source(mut self, capture: bool) -> Self {
        self.capture_source = capture;
        self
    }

    pub fn opener(&self) -> &O {
        &self.opener
    }

    /// Hand the opener back, e.g. to shut down the process behind it.
    pub fn into_opener(self) -> O {
        self.opener
    }

    /// Crawl every target in order.
    pub async fn crawl(&self, targets: &[AppTarget]) -> CrawlResult {
        self.crawl_each(targets, |_| {}).await
    }

    /// Crawl every target in order, handing each finished app to `on_app`
    /// before the next session opens.
    pub async fn crawl_each<F>(&self, targets: &[AppTarget], mut on_app: F) -> CrawlResult
    where
        F: FnMut(&AppCrawl),
    {
        let mut result = CrawlResult::default();
        for (index, target) in targets.iter().enumerate() {
            let span = tracing::info_span!("crawl.app", app_id = %target, index);
            let crawl = self.crawl_one(target).instrument(span).await;
            on_app(&crawl);
            result.entries.push(crawl);
        }
        info!(
            target: "crawl",
            apps = result.len(),
            reviews = result.total_reviews(),
            "crawl.batch.done"
        );
        result
    }

    /// Open a session for `target`, run one loop, and close the session.
    pub async fn crawl_one(&self, target: &AppTarget) -> AppCrawl {
        let started = Instant::now();
        info!(target: "crawl", app_id = %target, "crawl.app.start");

        let mut session = match self.opener.open(target).await {
            Ok(session) => session,
            Err(failure) => {
                warn!(target: "crawl", app_id = %target, error = %failure, "crawl.app.open_failed");
                return AppCrawl::failed_to_open(target.clone(), StopReason::SessionFailure(failure));
            }
        };

        let title = match session.title().await {
            Ok(title) => title,
            Err(err) => {
                warn!(target: "crawl", app_id = %target, error = %err, "page title unavailable");
                None
            }
        };

        let outcome = ScrollSession::new(&mut session, self.policy).run().await;

        let page_source = if self.capture_source {
            match session.page_source().await {
                Ok(source) => source,
                Err(err) => {
                    warn!(target: "crawl", app_id = %target, error = %err, "crawl.app.source_failed");
                    None
                }
            }
        } else {
            None
        };

        if let Err(err) = session.close().await {
            warn!(target: "crawl", app_id = %target, error = %err, "crawl.app.close_failed");
        }

        info!(
            target: "crawl",
            app_id = %target,
            reviews = outcome.reviews.len(),
            scrolls = outcome.scrolls_performed,
            stop = %outcome.stop,
            elapsed_secs = started.elapsed().as_secs_f64(),
            "crawl.app.done"
        );
        if matches!(outcome.stop, StopReason::ScrollBudgetExhausted) {
            info!(
                target: "crawl",
                app_id = %target,
                "scroll budget used up; raise max-scrolls to find more reviews"
            );
        }

        AppCrawl {
            target: target.clone(),
            title,
            reviews: outcome.reviews,
            scrolls_performed: outcome.scrolls_performed,
            skipped: outcome.skipped,
            stop: outcome.stop,
            page_source,
        }
    }
}
