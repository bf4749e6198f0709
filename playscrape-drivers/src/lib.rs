//! Browser layer for the review crawler.
//!
//! Everything that touches a live Chrome lives here; the crawl logic in
//! `playscrape-reviews` only sees the [`Navigator`](playscrape_reviews::Navigator)
//! and [`SessionOpener`](playscrape_reviews::SessionOpener) traits.
//!
//! - [`storefront::driver::ChromeDriverService`]: spawns and owns the chromedriver process
//! - [`storefront::driver::PlayDriver`]: opens one WebDriver session per app
//! - [`storefront::page::StorefrontPage`]: DOM operations against the review list
//! - [`storefront::url`]: storefront addresses and title cleanup
pub mod storefront;

pub use storefront::driver::{ChromeDriverService, PlayDriver};
pub use storefront::page::StorefrontPage;
pub use storefront::url::{storefront_title, storefront_url, STOREFRONT_ORIGIN};
