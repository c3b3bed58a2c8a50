//! Bootstrap-token strategy.
//!
//! Share pages embed their download bootstrap in an inline script:
//!
//! ```text
//! const token = "abc123";
//! const fileId = 42;
//! const downloadHosts = [{"id": 7, "name": "eu-1"}];
//! ```
//!
//! [`BootstrapData::decode`] pulls those three values out and validates them,
//! then the strategy asks `{origin}/api/share/download` for the file, following
//! redirects to the direct URL.

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::utils::{
    compile_static_regex, fetch_share_page, finish_resolution, page_origin, with_referer,
};
use super::{ResolveError, ResolveStrategy, ResolvedUrl};

/// Path of the download-resolution endpoint, relative to the page origin.
pub const DEFAULT_DOWNLOAD_PATH: &str = "/api/share/download";

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"\btoken\s*=\s*["']([^"']+)["']"#));
static FILE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"\bfileId\s*=\s*["']?(\d+)"#));
static HOSTS_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\bdownloadHosts\s*=\s*"));

/// Identifier of a download host; pages use both numbers and strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HostId {
    /// Numeric id, kept in its JSON spelling.
    Number(serde_json::Number),
    /// String id.
    Text(String),
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One candidate download host. Fields other than `id` are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct DownloadHost {
    /// Host identifier passed back as `hostId`.
    pub id: HostId,
}

/// Values embedded in a share page's bootstrap script.
#[derive(Debug, Clone)]
pub struct BootstrapData {
    /// Opaque access token.
    pub token: String,
    /// Numeric file identifier.
    pub file_id: u64,
    /// Candidate download hosts; never empty once decoded.
    pub hosts: Vec<DownloadHost>,
}

impl BootstrapData {
    /// Decodes and validates the bootstrap values in `html`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::Parse`] naming the first missing value
    /// - [`ResolveError::MalformedHosts`] if the hosts array is not valid JSON,
    ///   has entries without an `id`, or is empty
    pub fn decode(html: &str, page_url: &str) -> Result<Self, ResolveError> {
        let token = capture(&TOKEN_RE, html)
            .ok_or_else(|| ResolveError::parse(page_url, "bootstrap token not found"))?;

        let file_id = capture(&FILE_ID_RE, html)
            .ok_or_else(|| ResolveError::parse(page_url, "bootstrap fileId not found"))?
            .parse::<u64>()
            .map_err(|_| ResolveError::parse(page_url, "bootstrap fileId is out of range"))?;

        let hosts_start = HOSTS_RE
            .find(html)
            .map(|m| m.end())
            .ok_or_else(|| ResolveError::parse(page_url, "bootstrap downloadHosts not found"))?;

        let hosts_literal = array_literal(&html[hosts_start..]).ok_or_else(|| {
            ResolveError::malformed_hosts(page_url, "downloadHosts is not a JSON array literal")
        })?;

        let hosts: Vec<DownloadHost> = serde_json::from_str(hosts_literal)
            .map_err(|e| ResolveError::malformed_hosts(page_url, format!("invalid JSON: {e}")))?;

        if hosts.is_empty() {
            return Err(ResolveError::malformed_hosts(
                page_url,
                "no download hosts available",
            ));
        }

        Ok(Self {
            token,
            file_id,
            hosts,
        })
    }

    /// Returns the host used for resolution: always the first one listed.
    #[must_use]
    pub fn preferred_host(&self) -> Option<&DownloadHost> {
        self.hosts.first()
    }
}

fn capture(regex: &Regex, html: &str) -> Option<String> {
    regex
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns the balanced `[...]` literal at the start of `text`.
///
/// Brackets inside JSON strings are ignored. Returns `None` when `text` does
/// not start with `[` or the array never closes.
fn array_literal(text: &str) -> Option<&str> {
    let text = text.trim_start();
    if !text.starts_with('[') {
        return None;
    }

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (index, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[..=index]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolves share pages through their embedded bootstrap token.
pub struct BootstrapTokenResolver {
    client: Client,
    download_path: String,
}

impl BootstrapTokenResolver {
    /// Creates the strategy with the standard download endpoint path.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self::with_download_path(client, DEFAULT_DOWNLOAD_PATH)
    }

    /// Creates the strategy with a custom endpoint path.
    #[must_use]
    pub fn with_download_path(client: Client, download_path: impl Into<String>) -> Self {
        Self {
            client,
            download_path: download_path.into(),
        }
    }

    /// Builds the download-resolution URL; `host` is omitted for the fallback request.
    fn download_url(
        &self,
        share_url: &Url,
        data: &BootstrapData,
        host: Option<&HostId>,
    ) -> Result<Url, ResolveError> {
        let base = format!("{}{}", page_origin(share_url), self.download_path);
        let mut url = Url::parse(&base).map_err(|e| {
            ResolveError::parse(share_url.as_str(), format!("bad download endpoint: {e}"))
        })?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("token", &data.token)
                .append_pair("fileId", &data.file_id.to_string());
            if let Some(host) = host {
                query.append_pair("hostId", &host.to_string());
            }
        }
        Ok(url)
    }

    async fn request(&self, request_url: &Url, share_url: &Url) -> Result<ResolvedUrl, ResolveError> {
        let response = with_referer(self.client.get(request_url.as_str()), share_url)
            .send()
            .await
            .map_err(|e| ResolveError::transport(request_url.as_str(), &e))?;
        finish_resolution(response, request_url, self.name())
    }
}

impl fmt::Debug for BootstrapTokenResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapTokenResolver")
            .field("download_path", &self.download_path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ResolveStrategy for BootstrapTokenResolver {
    fn name(&self) -> &'static str {
        "bootstrap_token"
    }

    #[instrument(skip(self), fields(strategy = "bootstrap_token", share_url = %share_url))]
    async fn resolve(&self, share_url: &Url) -> Result<ResolvedUrl, ResolveError> {
        let html = fetch_share_page(&self.client, share_url).await?;
        let data = BootstrapData::decode(&html, share_url.as_str())?;
        let host = data.preferred_host().map(|h| h.id.clone());

        let with_host = self.download_url(share_url, &data, host.as_ref())?;
        match self.request(&with_host, share_url).await {
            Ok(resolved) => Ok(resolved),
            Err(error) => {
                debug!(error = %error.reason(), "request with hostId failed; retrying with default host");
                let without_host = self.download_url(share_url, &data, None)?;
                self.request(&without_host, share_url).await
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PAGE: &str = "https://share.example/s/abc";

    #[test]
    fn test_decode_inline_script_values() {
        let html = r#"<script>
            const token = "abc123";
            const fileId = 42;
            const downloadHosts = [{"id": 7, "name": "eu"}, {"id": 9}];
        </script>"#;
        let data = BootstrapData::decode(html, PAGE).unwrap();
        assert_eq!(data.token, "abc123");
        assert_eq!(data.file_id, 42);
        assert_eq!(data.hosts.len(), 2);
        assert_eq!(data.preferred_host().unwrap().id.to_string(), "7");
    }

    #[test]
    fn test_decode_compact_assignments() {
        let html = r#"token="abc123"; fileId=42; downloadHosts=[{"id":"h-1"}]"#;
        let data = BootstrapData::decode(html, PAGE).unwrap();
        assert_eq!(data.preferred_host().unwrap().id, HostId::Text("h-1".into()));
    }

    #[test]
    fn test_decode_multiline_hosts_with_brackets_in_strings() {
        let html = "const token = 't';\nconst fileId = 1;\nconst downloadHosts = [\n  {\"id\": 3, \"label\": \"[fast]\"}\n];";
        let data = BootstrapData::decode(html, PAGE).unwrap();
        assert_eq!(data.hosts.len(), 1);
    }

    #[test]
    fn test_decode_missing_token_is_parse_error() {
        let html = r#"const fileId = 42; const downloadHosts = [{"id":7}];"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::Parse { ref reason, .. } if reason.contains("token")));
    }

    #[test]
    fn test_decode_missing_file_id_is_parse_error() {
        let html = r#"const token = "a"; const downloadHosts = [{"id":7}];"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::Parse { ref reason, .. } if reason.contains("fileId")));
    }

    #[test]
    fn test_decode_missing_hosts_is_parse_error() {
        let html = r#"const token = "a"; const fileId = 1;"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(
            matches!(err, ResolveError::Parse { ref reason, .. } if reason.contains("downloadHosts"))
        );
    }

    #[test]
    fn test_decode_empty_hosts_is_malformed() {
        let html = r#"const token = "a"; const fileId = 1; const downloadHosts = [];"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedHosts { .. }));
    }

    #[test]
    fn test_decode_invalid_json_hosts_is_malformed() {
        let html = r"const token = 'a'; const fileId = 1; const downloadHosts = [{id: 7}];";
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedHosts { .. }));
    }

    #[test]
    fn test_decode_hosts_without_id_is_malformed() {
        let html = r#"const token = 'a'; const fileId = 1; const downloadHosts = [{"name":"x"}];"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedHosts { .. }));
    }

    #[test]
    fn test_decode_non_array_hosts_is_malformed() {
        let html = r#"const token = 'a'; const fileId = 1; const downloadHosts = null;"#;
        let err = BootstrapData::decode(html, PAGE).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedHosts { .. }));
    }

    #[test]
    fn test_token_regex_ignores_prefixed_names() {
        let html = r#"const csrf_token = "nope"; const token = "yes"; const fileId = 1; const downloadHosts = [{"id":1}];"#;
        let data = BootstrapData::decode(html, PAGE).unwrap();
        assert_eq!(data.token, "yes");
    }

    #[test]
    fn test_download_url_encodes_query() {
        let resolver = BootstrapTokenResolver::new(Client::new());
        let share = Url::parse("https://share.example:2083/s/abc").unwrap();
        let data = BootstrapData {
            token: "a b&c".into(),
            file_id: 42,
            hosts: vec![],
        };
        let host = HostId::Number(serde_json::Number::from(7));
        let url = resolver.download_url(&share, &data, Some(&host)).unwrap();
        assert_eq!(
            url.as_str(),
            "https://share.example:2083/api/share/download?token=a+b%26c&fileId=42&hostId=7"
        );

        let fallback = resolver.download_url(&share, &data, None).unwrap();
        assert!(!fallback.as_str().contains("hostId"));
    }
}
