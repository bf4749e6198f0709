use crate::storefront::scripts::{ScrapedReview, StorefrontScripts};
use crate::storefront::url::storefront_title;
use async_trait::async_trait;
use fantoccini::Client;
use playscrape_common::{SessionFailure, SessionOp};
use playscrape_reviews::{Navigator, RawReviewElement};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Pause after expansion clicks so the expanded text renders before the read.
const EXPAND_SETTLE: Duration = Duration::from_secs(1);
/// Pause after opening the all-reviews dialog.
const DIALOG_SETTLE: Duration = Duration::from_secs(2);

/// One WebDriver session pointed at an app's detail page.
pub struct StorefrontPage {
    pub(crate) client: Client,
    closed: bool,
}

impl StorefrontPage {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            closed: false,
        }
    }

    /// Navigate to `url`, give the page `settle` to render, then make sure the
    /// review list is showing.
    pub async fn goto(&mut self, url: &Url, settle: Duration) -> Result<(), SessionFailure> {
        self.client
            .goto(url.as_str())
            .await
            .map_err(|e| SessionFailure::new(SessionOp::Navigate, e))?;
        tokio::time::sleep(settle).await;

        let opened: bool = self
            .run_script(StorefrontScripts::open_all_reviews(), SessionOp::Navigate)
            .await?;
        if opened {
            debug!(target: "drivers", url = %url, "storefront.dialog.opened");
            tokio::time::sleep(DIALOG_SETTLE).await;
        }
        Ok(())
    }

    async fn run_script<T: DeserializeOwned>(
        &self,
        script: &str,
        op: SessionOp,
    ) -> Result<T, SessionFailure> {
        let value = self
            .client
            .execute(script, vec![])
            .await
            .map_err(|e| SessionFailure::new(op, e))?;
        serde_json::from_value(value)
            .map_err(|e| SessionFailure::new(op, format!("unexpected script result: {e}")))
    }
}

#[async_trait]
impl Navigator for StorefrontPage {
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionFailure> {
        let moved: bool = self
            .run_script(StorefrontScripts::scroll_to_bottom(), SessionOp::Scroll)
            .await?;
        debug!(target: "drivers", moved, "storefront.scroll");
        Ok(())
    }

    async fn read_visible_review_elements(
        &mut self,
    ) -> Result<Vec<RawReviewElement>, SessionFailure> {
        let scraped: Vec<ScrapedReview> = self
            .run_script(StorefrontScripts::read_reviews(), SessionOp::Read)
            .await?;
        debug!(target: "drivers", elements = scraped.len(), "storefront.read");
        Ok(scraped.into_iter().map(RawReviewElement::from).collect())
    }

    async fn wait(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn expand_truncated_reviews(&mut self) -> Result<usize, SessionFailure> {
        let clicked: usize = self
            .run_script(StorefrontScripts::expand_truncated(), SessionOp::Expand)
            .await?;
        if clicked > 0 {
            debug!(target: "drivers", clicked, "storefront.expand");
            tokio::time::sleep(EXPAND_SETTLE).await;
        }
        Ok(clicked)
    }

    async fn title(&mut self) -> Result<Option<String>, SessionFailure> {
        let raw = self
            .client
            .title()
            .await
            .map_err(|e| SessionFailure::new(SessionOp::Title, e))?;
        Ok(storefront_title(&raw))
    }

    async fn page_source(&mut self) -> Result<Option<String>, SessionFailure> {
        let html = self
            .client
            .source()
            .await
            .map_err(|e| SessionFailure::new(SessionOp::Source, e))?;
        Ok(Some(html))
    }

    async fn close(&mut self) -> Result<(), SessionFailure> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.client
            .clone()
            .close()
            .await
            .map_err(|e| SessionFailure::new(SessionOp::Close, e))
    }
}
