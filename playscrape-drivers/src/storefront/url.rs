use playscrape_common::AppTarget;
use url::Url;

pub const STOREFRONT_ORIGIN: &str = "https://play.google.com";
pub const DETAILS_PATH: &str = "store/apps/details";

const TITLE_SUFFIX: &str = " - Apps on Google Play";

/// Detail page for `target` with the full review list requested, in English
/// so dates and labels parse.
pub fn storefront_url(target: &AppTarget) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(STOREFRONT_ORIGIN)?.join(DETAILS_PATH)?;
    url.query_pairs_mut()
        .append_pair("id", target.as_str())
        .append_pair("showAllReviews", "true")
        .append_pair("hl", "en");
    Ok(url)
}

/// Page title with the storefront suffix removed. Blank titles become `None`.
pub fn storefront_title(raw: &str) -> Option<String> {
    let raw = raw.trim_end();
    let title = raw.strip_suffix(TITLE_SUFFIX).unwrap_or(raw).trim();
    (!title.is_empty()).then(|| title.to_string())
}
