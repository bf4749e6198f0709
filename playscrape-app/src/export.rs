//! Per-app output: the review JSON and, optionally, the page HTML.
use playscrape_common::{PlayscrapeError, SessionFailure};
use playscrape_reviews::{AppCrawl, ReviewRecord, StopReason};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct AppExport<'a> {
    title: Option<&'a str>,
    reviews: &'a [ReviewRecord],
    scrolls_performed: u32,
    stop_reason: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<&'a SessionFailure>,
}

fn stop_tag(stop: &StopReason) -> &'static str {
    match stop {
        StopReason::ScrollBudgetExhausted => "scroll_budget_exhausted",
        StopReason::Stalled => "stalled",
        StopReason::SessionFailure(_) => "session_failure",
    }
}

/// Write `crawl` to `<dir>/<app_id>.json`, creating `dir` if needed.
pub fn write_app(dir: &Path, crawl: &AppCrawl) -> Result<PathBuf, PlayscrapeError> {
    fs::create_dir_all(dir)?;
    let export = AppExport {
        title: crawl.title.as_deref(),
        reviews: &crawl.reviews,
        scrolls_performed: crawl.scrolls_performed,
        stop_reason: stop_tag(&crawl.stop),
        failure: crawl.stop.failure(),
    };
    let body = serde_json::to_vec_pretty(&export)?;

    replace_file(dir, &format!("{}.json", crawl.target), &body)
}

/// Write the captured page HTML to `<dir>/<app_id>-source.html`.
/// Returns `None` when nothing was captured for this app.
pub fn write_page_source(dir: &Path, crawl: &AppCrawl) -> Result<Option<PathBuf>, PlayscrapeError> {
    let Some(html) = &crawl.page_source else {
        return Ok(None);
    };
    fs::create_dir_all(dir)?;
    replace_file(dir, &format!("{}-source.html", crawl.target), html.as_bytes()).map(Some)
}

// Temp file plus rename so a crash never leaves half a document.
fn replace_file(dir: &Path, name: &str, body: &[u8]) -> Result<PathBuf, PlayscrapeError> {
    let path = dir.join(name);
    let tmp = dir.join(format!(".{name}.tmp"));
    fs::write(&tmp, body)?;
    fs::rename(&tmp, &path)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use playscrape_common::{AppTarget, SessionOp};
    use playscrape_reviews::{parse_review, RawReviewElement};
    use serde_json::Value;
    use tempfile::TempDir;

    fn record(author: &str, body: &str) -> ReviewRecord {
        parse_review(&RawReviewElement {
            author: Some(author.into()),
            body: Some(body.into()),
            rating_label: Some("Rated 5 stars out of five stars".into()),
            timestamp: Some("August 23, 2021".into()),
            ..Default::default()
        })
        .unwrap()
    }

    fn crawl(stop: StopReason) -> AppCrawl {
        AppCrawl {
            target: AppTarget::new("com.example.app").unwrap(),
            title: Some("Example".into()),
            reviews: vec![record("Ada", "Great"), record("Bob", "Meh")],
            scrolls_performed: 3,
            skipped: 0,
            stop,
            page_source: None,
        }
    }

    fn read(path: &Path) -> Value {
        serde_json::from_slice(&fs::read(path).unwrap()).unwrap()
    }

    #[test]
    fn writes_one_file_per_app() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("data");

        let path = write_app(&dir, &crawl(StopReason::ScrollBudgetExhausted)).unwrap();

        assert_eq!(path, dir.join("com.example.app.json"));
        let doc = read(&path);
        assert_eq!(doc["title"], "Example");
        assert_eq!(doc["scrolls_performed"], 3);
        assert_eq!(doc["stop_reason"], "scroll_budget_exhausted");
        assert!(doc.get("failure").is_none());
        let reviews = doc["reviews"].as_array().unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[0]["author"], "Ada");
        assert_eq!(reviews[1]["body"], "Meh");
    }

    #[test]
    fn partial_results_carry_the_failure() {
        let tmp = TempDir::new().unwrap();
        let stop = StopReason::SessionFailure(SessionFailure::new(SessionOp::Scroll, "gone"));

        let path = write_app(tmp.path(), &crawl(stop)).unwrap();

        let doc = read(&path);
        assert_eq!(doc["stop_reason"], "session_failure");
        assert_eq!(doc["failure"]["op"], "scroll");
        assert_eq!(doc["failure"]["message"], "gone");
        assert_eq!(doc["reviews"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn rewrites_replace_previous_output() {
        let tmp = TempDir::new().unwrap();
        write_app(tmp.path(), &crawl(StopReason::Stalled)).unwrap();

        let mut empty = crawl(StopReason::Stalled);
        empty.reviews.clear();
        empty.title = None;
        let path = write_app(tmp.path(), &empty).unwrap();

        let doc = read(&path);
        assert!(doc["title"].is_null());
        assert!(doc["reviews"].as_array().unwrap().is_empty());
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn page_source_lands_next_to_the_reviews() {
        let tmp = TempDir::new().unwrap();
        let mut app = crawl(StopReason::Stalled);

        assert_eq!(write_page_source(tmp.path(), &app).unwrap(), None);

        app.page_source = Some("<html><body>reviews</body></html>".into());
        let path = write_page_source(tmp.path(), &app).unwrap().unwrap();

        assert_eq!(path, tmp.path().join("com.example.app-source.html"));
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "<html><body>reviews</body></html>"
        );
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }
}
