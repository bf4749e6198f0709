//! Pre-flight check that every app id has a storefront page.
use playscrape_common::{AppTarget, ConfigurationError};
use playscrape_drivers::storefront::url::DETAILS_PATH;
use playscrape_http::{Listing, ListingRequest, StorefrontClient};
use std::time::Duration;
use tracing::{debug, info};

pub struct AppIdValidator {
    client: StorefrontClient,
}

impl AppIdValidator {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        let client = StorefrontClient::new(base, DETAILS_PATH)
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))?
            .with_timeout(timeout);
        Ok(Self { client })
    }

    /// A non-200 answer, or no answer at all, rejects the id.
    pub async fn check(&self, target: &AppTarget) -> Result<(), ConfigurationError> {
        let listing = self
            .client
            .listing(ListingRequest::new(target.as_str()))
            .await
            .map_err(|e| ConfigurationError::InvalidAppId {
                app_id: target.to_string(),
                reason: e.to_string(),
            })?;
        debug!(target: "validate", app_id = %target, ?listing, "validate.app_id");
        match listing {
            Listing::Live => Ok(()),
            Listing::Unavailable(status) => Err(ConfigurationError::InvalidAppId {
                app_id: target.to_string(),
                reason: format!("storefront answered {status}"),
            }),
        }
    }

    /// Check every target, stopping at the first rejected id.
    pub async fn check_all(&self, targets: &[AppTarget]) -> Result<(), ConfigurationError> {
        for target in targets {
            self.check(target).await?;
        }
        info!(target: "validate", apps = targets.len(), "validate.done");
        Ok(())
    }
}
