//! Capability seam between the crawl logic and a live browser.
//!
//! The loop only ever talks to a [`Navigator`]; the fantoccini-backed
//! implementation lives in `playscrape-drivers`, tests use scripted ones.
use crate::record::RawReviewElement;
use async_trait::async_trait;
use playscrape_common::{AppTarget, SessionFailure};
use std::time::Duration;

/// One open page pointed at an app's storefront detail page.
#[async_trait]
pub trait Navigator: Send {
    /// Trigger loading of further content.
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionFailure>;

    /// Snapshot the review elements currently rendered, in DOM order.
    async fn read_visible_review_elements(
        &mut self,
    ) -> Result<Vec<RawReviewElement>, SessionFailure>;

    /// Blocking settle delay; not cancellable mid-wait.
    async fn wait(&mut self, duration: Duration);

    /// Expand collapsed review text ("Full Review", "Show More").
    /// Returns the number of controls activated.
    async fn expand_truncated_reviews(&mut self) -> Result<usize, SessionFailure> {
        Ok(0)
    }

    /// Page title, if the page exposes one.
    async fn title(&mut self) -> Result<Option<String>, SessionFailure> {
        Ok(None)
    }

    /// Rendered HTML of the page, kept so a crawl can be re-parsed offline.
    async fn page_source(&mut self) -> Result<Option<String>, SessionFailure> {
        Ok(None)
    }

    /// Release the session. Must be called before the next app's session opens.
    async fn close(&mut self) -> Result<(), SessionFailure>;
}

/// Opens one navigation session per app.
#[async_trait]
pub trait SessionOpener: Send + Sync {
    type Session: Navigator;

    async fn open(&self, target: &AppTarget) -> Result<Self::Session, SessionFailure>;
}
