//! The scroll-extract-merge loop for one app.
//!
//! Each pass reads the rendered review list, parses every element, and merges
//! the records into the session's [`ReviewStore`]. Between passes the loop
//! scrolls to the bottom of the page and settles. The page gives no signal
//! for "new content finished rendering" (element ids are generated per load),
//! so settling is either a fixed delay or a bounded poll until two
//! consecutive reads agree.
//!
//! A read always follows the last scroll, so content revealed by the final
//! permitted scroll is still harvested; no more than `max_scrolls` scrolls are
//! ever issued.
use crate::navigator::Navigator;
use crate::parser::parse_review;
use crate::record::{RawReviewElement, ReviewRecord};
use crate::store::{MergeOutcome, ReviewStore};
use playscrape_common::{ConfigurationError, SessionFailure};
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_MAX_SCROLLS: u32 = 10;
pub const DEFAULT_STALL_LIMIT: u32 = 2;
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// How the loop waits for the page after each scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleStrategy {
    /// Sleep for a fixed delay. Too long wastes time, too short misses a slow render.
    Fixed(Duration),
    /// Re-read every `interval` until two consecutive reads are equal or
    /// `timeout` worth of intervals has elapsed.
    PollUntilStable { interval: Duration, timeout: Duration },
}

impl Default for SettleStrategy {
    fn default() -> Self {
        SettleStrategy::Fixed(DEFAULT_SETTLE_DELAY)
    }
}

/// Knobs for one loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollPolicy {
    max_scrolls: u32,
    stall_limit: Option<u32>,
    settle: SettleStrategy,
    expand_truncated: bool,
}

impl Default for ScrollPolicy {
    fn default() -> Self {
        Self {
            max_scrolls: DEFAULT_MAX_SCROLLS,
            stall_limit: Some(DEFAULT_STALL_LIMIT),
            settle: SettleStrategy::default(),
            expand_truncated: true,
        }
    }
}

impl ScrollPolicy {
    pub fn new(max_scrolls: u32) -> Result<Self, ConfigurationError> {
        if max_scrolls == 0 {
            return Err(ConfigurationError::ZeroMaxScrolls);
        }
        Ok(Self {
            max_scrolls,
            ..Self::default()
        })
    }

    /// Stop early once more than `limit` consecutive passes add nothing.
    /// `None` disables early stopping.
    pub fn with_stall_limit(mut self, limit: Option<u32>) -> Self {
        self.stall_limit = limit;
        self
    }

    pub fn with_settle(mut self, settle: SettleStrategy) -> Self {
        self.settle = settle;
        self
    }

    pub fn with_expand_truncated(mut self, expand: bool) -> Self {
        self.expand_truncated = expand;
        self
    }

    pub fn max_scrolls(&self) -> u32 {
        self.max_scrolls
    }

    pub fn stall_limit(&self) -> Option<u32> {
        self.stall_limit
    }

    pub fn settle(&self) -> SettleStrategy {
        self.settle
    }
}

/// Why a loop run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    ScrollBudgetExhausted,
    Stalled,
    SessionFailure(SessionFailure),
}

impl StopReason {
    pub fn failure(&self) -> Option<&SessionFailure> {
        match self {
            StopReason::SessionFailure(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::ScrollBudgetExhausted => f.write_str("scroll budget exhausted"),
            StopReason::Stalled => f.write_str("page stopped yielding new reviews"),
            StopReason::SessionFailure(failure) => write!(f, "{failure}"),
        }
    }
}

/// Counts for a single read-parse-merge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

/// Final state of a loop run. `reviews` is in discovery order and may be
/// partial when `stop` is a session failure.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub reviews: Vec<ReviewRecord>,
    pub scrolls_performed: u32,
    pub passes: u32,
    pub skipped: usize,
    pub stop: StopReason,
}

/// Transient state for one app's crawl. Never shared across apps.
pub struct ScrollSession<'n, N: Navigator + ?Sized> {
    navigator: &'n mut N,
    policy: ScrollPolicy,
    collected: ReviewStore,
    scrolls_performed: u32,
    stall_count: u32,
    passes: u32,
    skipped: usize,
    snapshot: Option<Vec<RawReviewElement>>,
}

impl<'n, N: Navigator + ?Sized> ScrollSession<'n, N> {
    pub fn new(navigator: &'n mut N, policy: ScrollPolicy) -> Self {
        Self {
            navigator,
            policy,
            collected: ReviewStore::new(),
            scrolls_performed: 0,
            stall_count: 0,
            passes: 0,
            skipped: 0,
            snapshot: None,
        }
    }

    /// Drive the loop to completion. Navigator failures end the run but keep
    /// everything merged so far.
    pub async fn run(mut self) -> LoopOutcome {
        let stop = match self.drive().await {
            Ok(stop) => stop,
            Err(failure) => {
                warn!(
                    target: "scroll",
                    error = %failure,
                    scrolls = self.scrolls_performed,
                    collected = self.collected.len(),
                    "session failed; keeping partial result"
                );
                StopReason::SessionFailure(failure)
            }
        };
        debug!(
            target: "scroll",
            %stop,
            scrolls = self.scrolls_performed,
            passes = self.passes,
            collected = self.collected.len(),
            skipped = self.skipped,
            "scroll.loop.done"
        );
        LoopOutcome {
            reviews: self.collected.into_records(),
            scrolls_performed: self.scrolls_performed,
            passes: self.passes,
            skipped: self.skipped,
            stop,
        }
    }

    async fn drive(&mut self) -> Result<StopReason, SessionFailure> {
        loop {
            let report = self.pass().await?;
            if report.inserted == 0 {
                self.stall_count += 1;
            } else {
                self.stall_count = 0;
            }
            debug!(
                target: "scroll",
                pass = self.passes,
                inserted = report.inserted,
                duplicates = report.duplicates,
                skipped = report.skipped,
                stall_count = self.stall_count,
                total = self.collected.len(),
                "scroll.pass"
            );

            if self.scrolls_performed >= self.policy.max_scrolls {
                return Ok(StopReason::ScrollBudgetExhausted);
            }
            if let Some(limit) = self.policy.stall_limit {
                if self.stall_count > limit {
                    return Ok(StopReason::Stalled);
                }
            }

            self.navigator.scroll_to_bottom().await?;
            self.scrolls_performed += 1;
            self.settle().await?;
        }
    }

    async fn pass(&mut self) -> Result<PassReport, SessionFailure> {
        if self.policy.expand_truncated {
            let expanded = self.navigator.expand_truncated_reviews().await?;
            if expanded > 0 {
                // Expanded text changes the elements; the snapshot is stale.
                self.snapshot = None;
            }
        }
        let elements = match self.snapshot.take() {
            Some(snapshot) => snapshot,
            None => self.navigator.read_visible_review_elements().await?,
        };
        self.passes += 1;

        let mut report = PassReport::default();
        for (index, raw) in elements.iter().enumerate() {
            match parse_review(raw) {
                Ok(record) => match self.collected.merge(record) {
                    MergeOutcome::Inserted => report.inserted += 1,
                    MergeOutcome::Duplicate => report.duplicates += 1,
                },
                Err(err) => {
                    report.skipped += 1;
                    debug!(target: "scroll.parse", index, error = %err, "skipping review element");
                }
            }
        }
        self.skipped += report.skipped;
        Ok(report)
    }

    async fn settle(&mut self) -> Result<(), SessionFailure> {
        match self.policy.settle {
            SettleStrategy::Fixed(delay) => {
                self.navigator.wait(delay).await;
            }
            SettleStrategy::PollUntilStable { interval, timeout } => {
                let max_polls = max_polls(interval, timeout);
                let mut previous: Option<Vec<RawReviewElement>> = None;
                for poll in 1..=max_polls {
                    self.navigator.wait(interval).await;
                    let current = self.navigator.read_visible_review_elements().await?;
                    let stable = previous.as_ref() == Some(&current);
                    if stable || poll == max_polls {
                        debug!(target: "scroll.settle", poll, stable, "settled");
                        self.snapshot = Some(current);
                        break;
                    }
                    previous = Some(current);
                }
            }
        }
        Ok(())
    }
}

fn max_polls(interval: Duration, timeout: Duration) -> u32 {
    if interval.is_zero() {
        return 2;
    }
    let polls = timeout.as_millis().div_ceil(interval.as_millis().max(1));
    u32::try_from(polls).unwrap_or(u32::MAX).max(2)
}

/// Run one loop to completion on `navigator`.
pub async fn run_scroll_loop<N: Navigator + ?Sized>(
    navigator: &mut N,
    policy: ScrollPolicy,
) -> LoopOutcome {
    ScrollSession::new(navigator, policy).run().await
}
