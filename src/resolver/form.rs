//! Form-submission strategy.
//!
//! Some share pages skip the bootstrap script and serve a plain HTML form
//! instead. The strategy picks the download form, replays its inputs and
//! follows the submission's redirects to the file.

use std::sync::LazyLock;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, instrument};
use url::Url;
use url::form_urlencoded;

use super::utils::{
    compile_static_selector, fetch_share_page, finish_resolution, resolve_form_action,
    with_referer,
};
use super::{ResolveError, ResolveStrategy, ResolvedUrl};

static FORM_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("form"));
static INPUT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| compile_static_selector("input[name]"));

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A form lifted out of a share page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadForm {
    /// Raw `action` attribute, if any.
    pub action: Option<String>,
    /// Submission method; POST unless the form declares otherwise.
    pub method: Method,
    /// Named inputs in document order.
    pub fields: Vec<(String, String)>,
}

impl DownloadForm {
    /// Finds the download form in `html`.
    ///
    /// Prefers a form whose id or markup mentions "download"; otherwise takes
    /// the first form. Returns `None` if the page has no form.
    #[must_use]
    pub fn extract(html: &str) -> Option<Self> {
        let document = Html::parse_document(html);
        let forms: Vec<ElementRef<'_>> = document.select(&FORM_SELECTOR).collect();

        let chosen = forms
            .iter()
            .find(|form| mentions_download(form))
            .or_else(|| forms.first())?;

        let fields = chosen
            .select(&INPUT_SELECTOR)
            .filter_map(|input| {
                let name = input.value().attr("name")?;
                let value = input.value().attr("value").unwrap_or_default();
                Some((name.to_string(), value.to_string()))
            })
            .collect();

        // Anything but an explicit GET (including "dialog") submits as POST.
        let method = match chosen.value().attr("method").map(str::trim) {
            Some(m) if m.eq_ignore_ascii_case("get") => Method::GET,
            _ => Method::POST,
        };

        Some(Self {
            action: chosen.value().attr("action").map(str::to_string),
            method,
            fields,
        })
    }

    /// Encodes the fields as an `application/x-www-form-urlencoded` body.
    #[must_use]
    pub fn encoded_fields(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.fields.iter())
            .finish()
    }
}

fn mentions_download(form: &ElementRef<'_>) -> bool {
    let id_matches = form
        .value()
        .id()
        .is_some_and(|id| id.to_ascii_lowercase().contains("download"));
    id_matches || form.html().to_ascii_lowercase().contains("download")
}

/// Resolves share pages by submitting their download form.
#[derive(Debug)]
pub struct FormSubmitResolver {
    client: Client,
}

impl FormSubmitResolver {
    /// Creates the strategy.
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResolveStrategy for FormSubmitResolver {
    fn name(&self) -> &'static str {
        "form_submit"
    }

    #[instrument(skip(self), fields(strategy = "form_submit", share_url = %share_url))]
    async fn resolve(&self, share_url: &Url) -> Result<ResolvedUrl, ResolveError> {
        let html = fetch_share_page(&self.client, share_url).await?;
        let form = DownloadForm::extract(&html)
            .ok_or_else(|| ResolveError::parse(share_url.as_str(), "no form found on share page"))?;

        let mut action = resolve_form_action(form.action.as_deref(), share_url);
        debug!(
            action = %action,
            method = %form.method,
            field_count = form.fields.len(),
            "submitting share page form"
        );

        let request = if form.method == Method::GET {
            action
                .query_pairs_mut()
                .extend_pairs(form.fields.iter());
            self.client.get(action.as_str())
        } else {
            self.client
                .request(form.method.clone(), action.as_str())
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(form.encoded_fields())
        };

        let response = with_referer(request, share_url)
            .send()
            .await
            .map_err(|e| ResolveError::transport(action.as_str(), &e))?;
        finish_resolution(response, &action, self.name())
    }
}
