//! User-Agent strings for share-host traffic.
//!
//! Share hosts serve their bootstrap script only to browser-looking clients,
//! so resolution requests present a desktop Chrome identity by default.

/// Desktop Chrome user agent used for page fetches and resolution requests.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Default User-Agent for resolver requests.
#[must_use]
pub(crate) fn default_browser_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_browser_user_agent_looks_like_chrome() {
        let ua = default_browser_user_agent();
        assert!(ua.starts_with("Mozilla/5.0"), "UA must look like a browser: {ua}");
        assert!(ua.contains("Chrome/"), "UA must identify as Chrome: {ua}");
    }
}
