//! Shared helpers for resolution strategies: page fetching, URL shaping and
//! finishing requests without reading their bodies.

use std::sync::LazyLock;

use regex::Regex;
use reqwest::header::{ACCEPT, REFERER};
use reqwest::{Client, Response};
use scraper::Selector;
use tracing::debug;
use url::Url;

use super::{ResolveError, ResolvedUrl};

const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Compiles a regex at static init; panics on invalid pattern.
pub fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

/// Parses a CSS selector at static init; panics on invalid selector.
pub fn compile_static_selector(selector: &str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid static selector '{selector}': {e}"))
}

static SCHEME_RE: LazyLock<Regex> = LazyLock::new(|| compile_static_regex(r"^(?i)https?://"));

/// Parses a share URL, accepting only absolute `http`/`https` URLs.
///
/// # Errors
///
/// Returns [`ResolveError::Parse`] for anything else.
pub fn parse_share_url(input: &str) -> Result<Url, ResolveError> {
    let trimmed = input.trim();
    if !SCHEME_RE.is_match(trimmed) {
        return Err(ResolveError::parse(
            input,
            "not an absolute http(s) URL",
        ));
    }
    Url::parse(trimmed).map_err(|e| ResolveError::parse(input, format!("invalid URL: {e}")))
}

/// Returns `scheme://host[:port]` for the page.
#[must_use]
pub fn page_origin(url: &Url) -> String {
    url.origin().ascii_serialization()
}

/// Resolves a form `action` attribute against the share page.
///
/// Absolute http(s) actions are used as-is, `/path` actions are prefixed with
/// the page origin, and anything else (missing, empty, relative) submits back
/// to the share URL itself.
#[must_use]
pub fn resolve_form_action(action: Option<&str>, share_url: &Url) -> Url {
    let Some(action) = action.map(str::trim).filter(|a| !a.is_empty()) else {
        return share_url.clone();
    };

    if SCHEME_RE.is_match(action)
        && let Ok(absolute) = Url::parse(action)
    {
        return absolute;
    }

    if let Some(rest) = action.strip_prefix("//") {
        if let Ok(network_path) = Url::parse(&format!("{}://{rest}", share_url.scheme())) {
            return network_path;
        }
    } else if action.starts_with('/')
        && let Ok(rooted) = Url::parse(&format!("{}{action}", page_origin(share_url)))
    {
        return rooted;
    }

    share_url.clone()
}

/// Fetches the share page and returns its HTML.
///
/// # Errors
///
/// Returns [`ResolveError::Network`] on transport failure and
/// [`ResolveError::PageLoad`] on a non-success status.
pub async fn fetch_share_page(client: &Client, share_url: &Url) -> Result<String, ResolveError> {
    let response = client
        .get(share_url.as_str())
        .header(ACCEPT, HTML_ACCEPT)
        .send()
        .await
        .map_err(|e| ResolveError::transport(share_url.as_str(), &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ResolveError::page_load(share_url.as_str(), status.as_u16()));
    }

    response
        .text()
        .await
        .map_err(|e| ResolveError::transport(share_url.as_str(), &e))
}

/// Adds the share page as `Referer` to a request builder.
#[must_use]
pub fn with_referer(builder: reqwest::RequestBuilder, share_url: &Url) -> reqwest::RequestBuilder {
    builder.header(REFERER, share_url.as_str())
}

/// Turns the final response of a resolution request into a [`ResolvedUrl`].
///
/// The body is never read: the response is dropped, which closes the
/// connection instead of downloading the file.
///
/// # Errors
///
/// Returns [`ResolveError::ResolutionRequest`] on a non-success status.
pub fn finish_resolution(
    response: Response,
    request_url: &Url,
    strategy: &str,
) -> Result<ResolvedUrl, ResolveError> {
    let status = response.status();
    let final_url = response.url().to_string();
    drop(response);

    if !status.is_success() {
        return Err(ResolveError::resolution_request(
            request_url.as_str(),
            format!("HTTP {}", status.as_u16()),
        ));
    }

    debug!(strategy, final_url = %final_url, status = status.as_u16(), "resolution request finished");
    Ok(ResolvedUrl::new(final_url, status.as_u16(), strategy))
}
