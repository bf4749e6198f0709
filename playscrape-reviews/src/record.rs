//! Review data as it arrives from the page and as it leaves the crawler.
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Leaf texts that belong to the review widget chrome rather than the review.
const UI_CHROME: &[&str] = &[
    "Full Review",
    "Show More",
    "Show less",
    "Did you find this helpful?",
    "Was this review helpful?",
    "Yes",
    "No",
    "more_vert",
    "Flag inappropriate",
    "Show review history",
];

/// One rendered review element, as exposed by the navigator.
///
/// Every sub-field is optional; the parser decides what is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReviewElement {
    #[serde(default)]
    pub author: Option<String>,
    /// Accessible label of the star widget, e.g. `Rated 4 stars out of five stars`.
    #[serde(default)]
    pub rating_label: Option<String>,
    /// Number of filled star sub-elements, when the page renders them.
    #[serde(default)]
    pub filled_stars: Option<u32>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    /// e.g. `1,234 people found this review helpful`.
    #[serde(default)]
    pub helpful_text: Option<String>,
}

impl RawReviewElement {
    /// Assign sub-fields from the ordered leaf texts of a review container.
    ///
    /// The storefront renders reviewer, date, then the review text, optionally
    /// followed by a developer reply whose header ends in a date. Widget chrome
    /// and the helpful-vote line are pulled out first.
    pub fn from_leaf_texts<I, S>(
        rating_label: Option<String>,
        filled_stars: Option<u32>,
        leaves: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut helpful_text = None;
        let mut parts: Vec<String> = Vec::new();
        for leaf in leaves {
            let text = leaf.as_ref().trim();
            if text.is_empty() || UI_CHROME.contains(&text) {
                continue;
            }
            if text.contains("found this review helpful") {
                helpful_text.get_or_insert_with(|| text.to_string());
                continue;
            }
            parts.push(text.to_string());
        }

        // Developer reply: "<developer>", "<reply date>" trailing the review.
        if parts.len() > 3
            && parts
                .last()
                .is_some_and(|p| crate::parser::parse_review_date(p).is_some())
        {
            parts.truncate(parts.len() - 2);
        }

        let mut parts = parts.into_iter();
        let author = parts.next();
        let timestamp = parts.next();
        let body = parts.last();

        Self {
            author,
            rating_label,
            filled_stars,
            body,
            timestamp,
            helpful_text,
        }
    }
}

/// Star rating on the storefront's 1..=5 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Clamp any count into the valid range. Zero means nothing was filled in,
    /// which is not a rating.
    pub fn clamped(stars: u32) -> Option<Self> {
        if stars == 0 {
            return None;
        }
        let stars = stars.min(u32::from(Self::MAX)) as u8;
        Some(Self(stars.max(Self::MIN)))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

/// Review date as displayed, plus the calendar date when it parses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewTimestamp {
    pub raw: String,
    pub date: Option<NaiveDate>,
}

/// Content-derived identity of a review; the page assigns none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Hash author, text, raw timestamp and rating.
    ///
    /// Fields are length-prefixed so that shifting characters between
    /// adjacent fields cannot produce the same key.
    pub fn derive(
        author: &str,
        body: &str,
        timestamp: Option<&str>,
        rating: Option<Rating>,
    ) -> Self {
        let mut hasher = blake3::Hasher::new();
        for field in [author, body, timestamp.unwrap_or("")] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
        hasher.update(&[rating.map(Rating::stars).unwrap_or(0)]);
        Self(hex::encode(hasher.finalize().as_bytes()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One user review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub identity_key: IdentityKey,
    pub author: String,
    pub rating: Option<Rating>,
    pub timestamp: Option<ReviewTimestamp>,
    pub body: String,
    pub helpful_count: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_clamps_into_range() {
        assert_eq!(Rating::clamped(0), None);
        assert_eq!(Rating::clamped(3).map(Rating::stars), Some(3));
        assert_eq!(Rating::clamped(9).map(Rating::stars), Some(5));
    }

    #[test]
    fn identity_key_is_field_boundary_sensitive() {
        let a = IdentityKey::derive("ab", "c", None, None);
        let b = IdentityKey::derive("a", "bc", None, None);
        assert_ne!(a, b);
        assert_eq!(a, IdentityKey::derive("ab", "c", None, None));
    }

    #[test]
    fn identity_key_includes_rating() {
        let four = IdentityKey::derive("Ann", "ok", Some("May 1, 2024"), Rating::clamped(4));
        let five = IdentityKey::derive("Ann", "ok", Some("May 1, 2024"), Rating::clamped(5));
        assert_ne!(four, five);
    }

    #[test]
    fn leaf_texts_follow_reviewer_date_text_layout() {
        let raw = RawReviewElement::from_leaf_texts(
            Some("Rated 2 stars out of five stars".into()),
            None,
            [
                "Jo Bloggs",
                "August 23, 2021",
                "Keeps logging me out.",
                "12 people found this review helpful",
                "Did you find this helpful?",
                "Yes",
                "No",
            ],
        );
        assert_eq!(raw.author.as_deref(), Some("Jo Bloggs"));
        assert_eq!(raw.timestamp.as_deref(), Some("August 23, 2021"));
        assert_eq!(raw.body.as_deref(), Some("Keeps logging me out."));
        assert_eq!(
            raw.helpful_text.as_deref(),
            Some("12 people found this review helpful")
        );
    }

    #[test]
    fn developer_reply_header_is_dropped() {
        let raw = RawReviewElement::from_leaf_texts(
            None,
            Some(4),
            [
                "Sam",
                "June 1, 1997",
                "Works well now.",
                "Example Developer Ltd",
                "June 3, 1997",
            ],
        );
        assert_eq!(raw.author.as_deref(), Some("Sam"));
        assert_eq!(raw.body.as_deref(), Some("Works well now."));
    }

    #[test]
    fn reviewer_and_date_only_has_no_body() {
        let raw = RawReviewElement::from_leaf_texts(None, None, ["Sam", "June 1, 1997"]);
        assert_eq!(raw.author.as_deref(), Some("Sam"));
        assert_eq!(raw.body, None);
    }
}
