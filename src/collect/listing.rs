//! Fetching and parsing of the HTML "network/dependents" listing.

use crate::Result;
use core::time::Duration;
use ohno::{IntoAppError, bail};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

const USER_AGENT: &str = "dependagraph";

/// Any opening anchor tag.
static ANCHOR_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<a\s[^>]*>").expect("invalid regex"));

/// The `href` attribute of a tag.
static HREF_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"(?i)\shref\s*=\s*"([^"]*)""#).expect("invalid regex"));

/// The button group inside the pagination container.
static PAGINATION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)class="[^"]*\bpaginate-container\b[^"]*"[^>]*>.*?class="[^"]*\bBtnGroup\b[^"]*"[^>]*>(.*?)</div>"#)
        .expect("invalid regex")
});

/// Opening tags of the direct controls of a button group.
static CONTROL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)<(a|button)\b([^>]*)>").expect("invalid regex"));

/// One page of a dependents listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Repository references found on the page, as `org/name` paths.
    pub references: Vec<String>,

    /// The page to load next, absent on the last page.
    pub next_page: Option<Url>,
}

/// Loads one listing page.
pub trait PageFetcher: Send + Sync {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<ListingPage>> + Send;
}

/// Loads listing pages over HTTP.
#[derive(Debug, Clone)]
pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .into_app_err("building the HTTP client for dependents listings")?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<ListingPage> {
        let resp = self
            .client
            .get(url.as_str())
            .send()
            .await
            .into_app_err_with(|| format!("loading dependents listing '{url}'"))?;

        let status = resp.status();
        if !status.is_success() {
            bail!("loading dependents listing '{url}' returned HTTP {status}");
        }

        let body = resp
            .text()
            .await
            .into_app_err_with(|| format!("reading dependents listing '{url}'"))?;

        parse_listing(&body, url)
    }
}

/// Extract dependent repositories and the next-page link from a listing page.
///
/// Dependents are the anchors marked with `data-hovercard-type="repository"`. The next page is
/// the last control of the pagination button group; when that control is a disabled button or
/// an anchor without a link, this is the last page.
pub fn parse_listing(html: &str, page_url: &Url) -> Result<ListingPage> {
    let references = ANCHOR_REGEX
        .find_iter(html)
        .map(|m| m.as_str())
        .filter(|tag| tag.contains(r#"data-hovercard-type="repository""#))
        .filter_map(href_of)
        .map(|href| href.trim_start_matches('/').to_string())
        .filter(|href| !href.is_empty())
        .collect();

    let next_page = match next_page_href(html) {
        Some(href) => Some(
            page_url
                .join(&href)
                .into_app_err_with(|| format!("malformed next-page link '{href}' on '{page_url}'"))?,
        ),
        None => None,
    };

    Ok(ListingPage { references, next_page })
}

fn href_of(tag: &str) -> Option<String> {
    HREF_REGEX.captures(tag).map(|c| c[1].replace("&amp;", "&"))
}

fn next_page_href(html: &str) -> Option<String> {
    let group = PAGINATION_REGEX.captures(html)?;
    let last = CONTROL_REGEX.captures_iter(&group[1]).last()?;

    if !last[1].eq_ignore_ascii_case("a") {
        return None;
    }

    href_of(&last[0]).filter(|href| !href.is_empty())
}
