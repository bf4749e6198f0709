//! In-page scripts executed through WebDriver, and the payloads they return.
use playscrape_reviews::RawReviewElement;
use serde::Deserialize;

/// Script sources. The class selectors in `read_reviews` track current
/// storefront markup; when they drift, leaf texts still carry the review.
pub struct StorefrontScripts;

impl StorefrontScripts {
    /// Returns an array of review payloads in DOM order.
    ///
    /// Rating widgets are found by their accessible label; the review
    /// container is the nearest `data-review-id` header's parent, or the
    /// sixth ancestor when no header is present.
    pub fn read_reviews() -> &'static str {
        r#"
        const RATED = /Rated\s+\d+\s+stars?\s+out\s+of\s+(five|5)\s+stars?/i;
        const DEPTH = 6;
        const climb = (node) => {
            const header = node.closest('header[data-review-id]');
            if (header && header.parentElement) return header.parentElement;
            let el = node;
            for (let i = 0; i < DEPTH && el.parentElement; i++) el = el.parentElement;
            return el;
        };
        const textOf = (root, sel) => {
            const n = root.querySelector(sel);
            const t = n ? (n.textContent || '').trim() : '';
            return t.length ? t : null;
        };
        const seen = new Set();
        const out = [];
        for (const star of document.querySelectorAll('[aria-label]')) {
            const label = star.getAttribute('aria-label') || '';
            if (!RATED.test(label)) continue;
            const container = climb(star);
            if (!container || seen.has(container)) continue;
            seen.add(container);
            const leaves = Array.from(container.querySelectorAll('*'))
                .filter((n) => n.children.length === 0)
                .map((n) => (n.textContent || '').trim())
                .filter((t) => t.length > 0);
            const filled = star.querySelectorAll('.Z1Dz7b').length;
            out.push({
                author: textOf(container, '.X5PpBb'),
                ratingLabel: label,
                filledStars: filled > 0 ? filled : null,
                body: textOf(container, '.h3YV2d'),
                timestamp: textOf(container, '.bp9Aid'),
                helpful: textOf(container, '.AJTPZc'),
                leaves: leaves,
            });
        }
        return out;
        "#
    }

    /// Scrolls the review dialog when one is open, otherwise the window.
    /// Returns whether the scroll position moved.
    pub fn scroll_to_bottom() -> &'static str {
        r#"
        const dialog = document.querySelector('div[role="dialog"]');
        let target = null;
        if (dialog) {
            target = Array.from(dialog.querySelectorAll('*')).find((el) =>
                el.scrollHeight > el.clientHeight + 10 &&
                /(auto|scroll)/.test(getComputedStyle(el).overflowY));
        }
        if (target) {
            const before = target.scrollTop;
            target.scrollTop = target.scrollHeight;
            return target.scrollTop !== before;
        }
        const root = document.scrollingElement || document.documentElement;
        const before = root.scrollTop;
        window.scrollTo(0, root.scrollHeight);
        return root.scrollTop !== before;
        "#
    }

    /// Clicks every "Full Review" / "Show More" control not clicked before.
    /// Returns the number of clicks that went through.
    pub fn expand_truncated() -> &'static str {
        r#"
        const LABELS = ['Full Review', 'Show More', 'Show more'];
        let clicked = 0;
        for (const el of document.querySelectorAll('button, span, div[role="button"]')) {
            if (el.dataset.playscrapeExpanded) continue;
            if (el.tagName !== 'BUTTON' && el.children.length > 0) continue;
            if (!LABELS.includes((el.textContent || '').trim())) continue;
            try {
                el.click();
                el.dataset.playscrapeExpanded = '1';
                clicked++;
            } catch (e) {}
        }
        return clicked;
        "#
    }

    /// Opens the all-reviews dialog when the page shows a "See all reviews"
    /// control. Returns whether it was clicked.
    pub fn open_all_reviews() -> &'static str {
        r#"
        for (const el of document.querySelectorAll('button, span, div[role="button"]')) {
            if ((el.textContent || '').trim() !== 'See all reviews') continue;
            const target = el.closest('button') || el;
            target.click();
            return true;
        }
        return false;
        "#
    }
}

/// What [`StorefrontScripts::read_reviews`] returns per review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapedReview {
    pub author: Option<String>,
    pub rating_label: Option<String>,
    pub filled_stars: Option<u32>,
    pub body: Option<String>,
    pub timestamp: Option<String>,
    pub helpful: Option<String>,
    pub leaves: Vec<String>,
}

impl From<ScrapedReview> for RawReviewElement {
    /// Named sub-fields win when both author and body were found; otherwise
    /// the container's leaf texts are assigned positionally.
    fn from(scraped: ScrapedReview) -> Self {
        if scraped.author.is_some() && scraped.body.is_some() {
            return RawReviewElement {
                author: scraped.author,
                rating_label: scraped.rating_label,
                filled_stars: scraped.filled_stars,
                body: scraped.body,
                timestamp: scraped.timestamp,
                helpful_text: scraped.helpful,
            };
        }
        let mut raw = RawReviewElement::from_leaf_texts(
            scraped.rating_label,
            scraped.filled_stars,
            &scraped.leaves,
        );
        if raw.helpful_text.is_none() {
            raw.helpful_text = scraped.helpful;
        }
        raw
    }
}
