#![allow(dead_code)]

use async_trait::async_trait;
use playscrape_common::{AppTarget, SessionFailure, SessionOp};
use playscrape_reviews::{Navigator, RawReviewElement, SessionOpener};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn review(author: &str, body: &str) -> RawReviewElement {
    RawReviewElement {
        author: Some(author.to_string()),
        rating_label: Some("Rated 4 stars out of five stars".to_string()),
        body: Some(body.to_string()),
        timestamp: Some("August 23, 2021".to_string()),
        ..Default::default()
    }
}

pub fn malformed() -> RawReviewElement {
    RawReviewElement {
        author: None,
        body: Some("orphaned text".to_string()),
        ..Default::default()
    }
}

/// Navigator that replays a fixed sequence of page reads.
///
/// Once the script runs out, the last successful snapshot is returned again,
/// like a page that has stopped loading.
#[derive(Default)]
pub struct ScriptedNavigator {
    reads: VecDeque<Result<Vec<RawReviewElement>, SessionFailure>>,
    expands: VecDeque<Result<usize, SessionFailure>>,
    last: Vec<RawReviewElement>,
    fail_on_scroll: Option<u32>,
    pub read_count: u32,
    pub scroll_count: u32,
    pub waits: Vec<Duration>,
    pub expand_count: u32,
    pub closed: bool,
    title: Option<String>,
    source: Option<Result<String, SessionFailure>>,
    events: Option<Arc<Mutex<Vec<String>>>>,
    name: String,
}

impl ScriptedNavigator {
    pub fn new(reads: Vec<Vec<RawReviewElement>>) -> Self {
        Self {
            reads: reads.into_iter().map(Ok).collect(),
            ..Default::default()
        }
    }

    pub fn with_results(reads: Vec<Result<Vec<RawReviewElement>, SessionFailure>>) -> Self {
        Self {
            reads: reads.into_iter().collect(),
            ..Default::default()
        }
    }

    /// The `n`-th scroll (1-based) fails.
    pub fn failing_scroll(mut self, n: u32) -> Self {
        self.fail_on_scroll = Some(n);
        self
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Results of successive expansion calls; `Ok(0)` once exhausted.
    pub fn expanding(mut self, expands: Vec<Result<usize, SessionFailure>>) -> Self {
        self.expands = expands.into();
        self
    }

    pub fn with_source(mut self, source: Result<String, SessionFailure>) -> Self {
        self.source = Some(source);
        self
    }

    fn log(&self, event: &str) {
        if let Some(events) = &self.events {
            events.lock().unwrap().push(format!("{event} {}", self.name));
        }
    }
}

#[async_trait]
impl Navigator for ScriptedNavigator {
    async fn scroll_to_bottom(&mut self) -> Result<(), SessionFailure> {
        self.scroll_count += 1;
        if self.fail_on_scroll == Some(self.scroll_count) {
            return Err(SessionFailure::new(SessionOp::Scroll, "chromedriver disconnected"));
        }
        Ok(())
    }

    async fn read_visible_review_elements(
        &mut self,
    ) -> Result<Vec<RawReviewElement>, SessionFailure> {
        self.read_count += 1;
        match self.reads.pop_front() {
            Some(Ok(snapshot)) => {
                self.last = snapshot.clone();
                Ok(snapshot)
            }
            Some(Err(failure)) => Err(failure),
            None => Ok(self.last.clone()),
        }
    }

    async fn wait(&mut self, duration: Duration) {
        self.waits.push(duration);
    }

    async fn expand_truncated_reviews(&mut self) -> Result<usize, SessionFailure> {
        self.expand_count += 1;
        self.expands.pop_front().unwrap_or(Ok(0))
    }

    async fn page_source(&mut self) -> Result<Option<String>, SessionFailure> {
        self.log("source");
        self.source.clone().transpose()
    }

    async fn title(&mut self) -> Result<Option<String>, SessionFailure> {
        Ok(self.title.clone())
    }

    async fn close(&mut self) -> Result<(), SessionFailure> {
        self.closed = true;
        self.log("close");
        Ok(())
    }
}

/// Hands out pre-built navigators per app id and records open/close order.
#[derive(Default)]
pub struct ScriptedOpener {
    sessions: Mutex<HashMap<String, ScriptedNavigator>>,
    pub events: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_app(self, app_id: &str, mut navigator: ScriptedNavigator) -> Self {
        navigator.events = Some(self.events.clone());
        navigator.name = app_id.to_string();
        self.sessions
            .lock()
            .unwrap()
            .insert(app_id.to_string(), navigator);
        self
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionOpener for ScriptedOpener {
    type Session = ScriptedNavigator;

    async fn open(&self, target: &AppTarget) -> Result<ScriptedNavigator, SessionFailure> {
        self.events
            .lock()
            .unwrap()
            .push(format!("open {target}"));
        self.sessions
            .lock()
            .unwrap()
            .remove(target.as_str())
            .ok_or_else(|| SessionFailure::new(SessionOp::Open, "navigation timed out"))
    }
}

pub fn targets(ids: &[&str]) -> Vec<AppTarget> {
    ids.iter().map(|id| AppTarget::new(id).unwrap()).collect()
}
