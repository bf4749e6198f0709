//! Raw element → [`ReviewRecord`]. Pure; no I/O.
use crate::record::{IdentityKey, Rating, RawReviewElement, ReviewRecord, ReviewTimestamp};
use chrono::NaiveDate;
use playscrape_common::MalformedRecordError;
use regex::Regex;
use std::sync::OnceLock;

/// Date format the storefront uses for English locales, e.g. `August 23, 2021`.
pub const REVIEW_DATE_FORMAT: &str = "%B %d, %Y";

fn rating_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)rated\s+(\d+)\s+stars?\s+out\s+of\s+(?:five|5)\s+stars?")
            .expect("static regex")
    })
}

fn first_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d[\d,]*").expect("static regex"))
}

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Parse a displayed review date. `None` when it does not match the format.
///
/// chrono's `%B` also accepts abbreviations when parsing; the storefront always
/// spells the month out, so anything shorter is rejected up front.
pub fn parse_review_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    let month = text.split_whitespace().next()?;
    if !MONTHS.iter().any(|m| m.eq_ignore_ascii_case(month)) {
        return None;
    }
    NaiveDate::parse_from_str(text, REVIEW_DATE_FORMAT).ok()
}

/// Collapse runs of whitespace and trim; `None` if nothing is left.
fn normalized(text: Option<&str>) -> Option<String> {
    let text = text?.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

fn parse_rating(raw: &RawReviewElement) -> Option<Rating> {
    if let Some(stars) = raw.filled_stars {
        if let Some(rating) = Rating::clamped(stars) {
            return Some(rating);
        }
    }
    let label = raw.rating_label.as_deref()?;
    let stars: u32 = rating_label_re().captures(label)?.get(1)?.as_str().parse().ok()?;
    Rating::clamped(stars)
}

fn parse_helpful_count(text: Option<&str>) -> Option<u64> {
    let digits = first_number_re().find(text?)?.as_str().replace(',', "");
    digits.parse().ok()
}

/// Turn one rendered element into a record.
///
/// Author and review text are required. A missing or unreadable rating is
/// recorded as unknown rather than discarding otherwise valid review text.
pub fn parse_review(raw: &RawReviewElement) -> Result<ReviewRecord, MalformedRecordError> {
    let author = normalized(raw.author.as_deref()).ok_or(MalformedRecordError::MissingAuthor)?;
    let body = normalized(raw.body.as_deref()).ok_or(MalformedRecordError::MissingBody)?;
    let rating = parse_rating(raw);
    let timestamp = normalized(raw.timestamp.as_deref()).map(|raw| ReviewTimestamp {
        date: parse_review_date(&raw),
        raw,
    });
    let helpful_count = parse_helpful_count(raw.helpful_text.as_deref());

    let identity_key = IdentityKey::derive(
        &author,
        &body,
        timestamp.as_ref().map(|t| t.raw.as_str()),
        rating,
    );

    Ok(ReviewRecord {
        identity_key,
        author,
        rating,
        timestamp,
        body,
        helpful_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(author: &str, body: &str) -> RawReviewElement {
        RawReviewElement {
            author: Some(author.into()),
            body: Some(body.into()),
            ..Default::default()
        }
    }

    #[test]
    fn date_format_table() {
        let cases = [
            ("August 23, 2021", true),
            ("January 21, 1341", true),
            ("June 1, 1997", true),
            ("foo bar, baz", false),
            ("Nov 23, 1234", false),
            ("January 21, abcd", false),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_review_date(text).is_some(), expected, "{text}");
        }
    }

    #[test]
    fn missing_author_is_malformed() {
        let raw = RawReviewElement {
            body: Some("great".into()),
            ..Default::default()
        };
        assert_eq!(parse_review(&raw), Err(MalformedRecordError::MissingAuthor));
    }

    #[test]
    fn blank_body_is_malformed() {
        assert_eq!(
            parse_review(&element("Ann", "  \n ")),
            Err(MalformedRecordError::MissingBody)
        );
    }

    #[test]
    fn rating_from_label() {
        let raw = RawReviewElement {
            rating_label: Some("Rated 4 stars out of five stars".into()),
            ..element("Ann", "fine")
        };
        assert_eq!(parse_review(&raw).unwrap().rating.map(Rating::stars), Some(4));
    }

    #[test]
    fn filled_stars_take_precedence_and_clamp() {
        let raw = RawReviewElement {
            filled_stars: Some(7),
            rating_label: Some("Rated 2 stars out of five stars".into()),
            ..element("Ann", "fine")
        };
        assert_eq!(parse_review(&raw).unwrap().rating.map(Rating::stars), Some(5));
    }

    #[test]
    fn unreadable_rating_is_unknown_not_fatal() {
        let raw = RawReviewElement {
            rating_label: Some("Average rating".into()),
            filled_stars: Some(0),
            ..element("Ann", "fine")
        };
        let record = parse_review(&raw).unwrap();
        assert_eq!(record.rating, None);
        assert_eq!(record.body, "fine");
    }

    #[test]
    fn helpful_count_with_thousands_separator() {
        let raw = RawReviewElement {
            helpful_text: Some("1,234 people found this review helpful".into()),
            ..element("Ann", "fine")
        };
        assert_eq!(parse_review(&raw).unwrap().helpful_count, Some(1234));
    }

    #[test]
    fn raw_timestamp_kept_when_unparsable() {
        let raw = RawReviewElement {
            timestamp: Some(" 3 days ago ".into()),
            ..element("Ann", "fine")
        };
        let ts = parse_review(&raw).unwrap().timestamp.unwrap();
        assert_eq!(ts.raw, "3 days ago");
        assert_eq!(ts.date, None);
    }

    #[test]
    fn whitespace_differences_do_not_change_identity() {
        let a = parse_review(&element("Ann  Lee", "good\napp")).unwrap();
        let b = parse_review(&element(" Ann Lee", "good app ")).unwrap();
        assert_eq!(a.identity_key, b.identity_key);
    }
}
