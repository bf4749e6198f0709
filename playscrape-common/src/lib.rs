//! Common types and utilities shared across playscrape crates.
//!
//! This crate defines the crawl unit identifier, the error kinds shared by the
//! loop, the driver, and the binary, and the observability helpers. It is
//! intentionally lightweight so that every crate can depend on it without
//! introducing heavy transitive costs.
//!
//! # Overview
//!
//! - [`AppTarget`]: one storefront app id to crawl
//! - [`MalformedRecordError`], [`SessionFailure`], [`ConfigurationError`]: the
//!   three failure kinds, each with its own recovery policy
//! - [`PlayscrapeError`] and [`Result`]: umbrella error for the outer layers
//! - [`observability`]: centralised tracing/logging initialisation
//!
//! # Examples
//!
//! ```rust
//! use playscrape_common::{AppTarget, ConfigurationError};
//!
//! let target = AppTarget::new(" com.nhs.online.nhsonline ").unwrap();
//! assert_eq!(target.as_str(), "com.nhs.online.nhsonline");
//! assert_eq!(AppTarget::new("  "), Err(ConfigurationError::BlankAppId));
//! assert!(AppTarget::new("../escaped").is_err());
//! ```
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub mod observability;

/// One crawl unit: a package-style app identifier.
///
/// Immutable once constructed; the orchestrator keys results by it and the
/// exporter names files after it, so only package-name characters are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AppTarget(String);

impl AppTarget {
    /// Build a target from a raw id, trimming surrounding whitespace.
    pub fn new(raw: impl AsRef<str>) -> std::result::Result<Self, ConfigurationError> {
        let id = raw.as_ref().trim();
        if id.is_empty() {
            return Err(ConfigurationError::BlankAppId);
        }
        let package_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !package_chars || id.starts_with('.') {
            return Err(ConfigurationError::MalformedAppId(id.to_string()));
        }
        Ok(Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AppTarget {
    type Error = ConfigurationError;

    fn try_from(raw: String) -> std::result::Result<Self, Self::Error> {
        Self::new(raw)
    }
}

impl From<AppTarget> for String {
    fn from(target: AppTarget) -> Self {
        target.0
    }
}

impl fmt::Display for AppTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single rendered review element could not be turned into a record.
///
/// Recovered locally: the element is skipped and the pass continues.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("review element has no author")]
    MissingAuthor,

    #[error("review element has no review text")]
    MissingBody,
}

/// Which navigator primitive failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOp {
    Open,
    Navigate,
    Expand,
    Read,
    Scroll,
    Wait,
    Title,
    Source,
    Close,
}

impl fmt::Display for SessionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionOp::Open => "open",
            SessionOp::Navigate => "navigate",
            SessionOp::Expand => "expand",
            SessionOp::Read => "read",
            SessionOp::Scroll => "scroll",
            SessionOp::Wait => "wait",
            SessionOp::Title => "title",
            SessionOp::Source => "source",
            SessionOp::Close => "close",
        };
        f.write_str(name)
    }
}

/// A navigation or scroll primitive failed (timeout, disconnect, driver crash).
///
/// Never retried mid-loop: it ends the current app's crawl, keeping whatever
/// was collected so far.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("session failure during {op}: {message}")]
pub struct SessionFailure {
    pub op: SessionOp,
    pub message: String,
}

impl SessionFailure {
    pub fn new(op: SessionOp, message: impl fmt::Display) -> Self {
        Self {
            op,
            message: message.to_string(),
        }
    }
}

/// Invalid or missing required input. Fatal, reported before any session opens.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("no app ids provided")]
    NoAppIds,

    #[error("app id list contains a blank entry")]
    BlankAppId,

    #[error("app id {0:?} may only contain letters, digits, '_' and '.'")]
    MalformedAppId(String),

    #[error("max_scrolls must be a positive integer")]
    ZeroMaxScrolls,

    #[error("driver location is required")]
    MissingDriverLocation,

    #[error("driver binary not found at {}", .0.display())]
    DriverNotFound(PathBuf),

    #[error("app id {app_id} failed validation: {reason}")]
    InvalidAppId { app_id: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Umbrella error for the outer layers (driver setup, export, binary).
#[derive(thiserror::Error, Debug)]
pub enum PlayscrapeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Filesystem failure while persisting results.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Convenient alias for results that use [`PlayscrapeError`].
pub type Result<T> = std::result::Result<T, PlayscrapeError>;
