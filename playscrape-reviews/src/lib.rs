//! Review extraction core: parse, deduplicate, scroll, orchestrate.
//!
//! - [`parser`]: raw rendered element → [`ReviewRecord`]
//! - [`store`]: content-keyed dedup with first-seen order
//! - [`scroll`]: the scroll-extract-merge loop and its termination rules
//! - [`orchestrator`]: one session per app, sequentially
//! - [`navigator`]: the browser capability the loop consumes
pub mod navigator;
pub mod orchestrator;
pub mod parser;
pub mod record;
pub mod scroll;
pub mod store;

pub use navigator::{Navigator, SessionOpener};
pub use orchestrator::{AppCrawl, CrawlResult, Orchestrator};
pub use parser::parse_review;
pub use record::{IdentityKey, Rating, RawReviewElement, ReviewRecord, ReviewTimestamp};
pub use scroll::{
    run_scroll_loop, LoopOutcome, ScrollPolicy, ScrollSession, SettleStrategy, StopReason,
};
pub use store::{MergeOutcome, ReviewStore};
