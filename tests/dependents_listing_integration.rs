//! Integration tests for the dependents listing, served by wiremock

use core::time::Duration;
use dependagraph::collect::{DependentsCollector, HttpPageFetcher, PageFetcher, ProviderResult, RateLimiter, RetryPolicy};
use tick::Clock;
use dependagraph::identity::RepositoryIdentity;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/offset64/eos/network/dependents";

fn listing_page(repositories: &[&str], next: Option<&str>) -> String {
    let rows: String = repositories
        .iter()
        .map(|r| {
            let owner = r.split('/').next().unwrap();
            format!(
                r#"<div class="Box-row d-flex flex-items-center" data-test-id="dg-repo-pkg-dependent">
                     <img class="avatar mr-2" src="https://avatars.githubusercontent.com/u/1?s=40&amp;v=4" width="20" height="20" alt="@{owner}">
                     <span class="f5 color-fg-muted">
                       <a data-hovercard-type="user" data-hovercard-url="/users/{owner}/hovercard" href="/{owner}">{owner}</a> /
                       <a class="text-bold" data-hovercard-type="repository" data-hovercard-url="/{r}/hovercard" href="/{r}">{r}</a>
                     </span>
                   </div>"#
            )
        })
        .collect();

    let next = next.map_or_else(
        || r#"<button class="btn BtnGroup-item" disabled="disabled">Next</button>"#.to_string(),
        |n| format!(r#"<a rel="nofollow" class="btn BtnGroup-item" href="{n}">Next</a>"#),
    );

    format!(
        r#"<!DOCTYPE html><html><body><div id="dependents">
             <div class="Box">{rows}</div>
             <div class="paginate-container">
               <div class="BtnGroup" data-test-selector="pagination"><button class="btn BtnGroup-item" disabled="disabled">Previous</button>{next}</div>
             </div>
           </div></body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

fn collector(server: &MockServer) -> DependentsCollector<HttpPageFetcher> {
    DependentsCollector::new(
        HttpPageFetcher::new(Duration::from_secs(5)).unwrap(),
        RateLimiter::new("dependents", 120, Duration::from_secs(60), Clock::new_tokio()),
        RetryPolicy::none(),
        Url::parse(&server.uri()).unwrap(),
    )
}

fn sorted_keys(result: &ProviderResult<std::collections::HashSet<RepositoryIdentity>>) -> Vec<String> {
    let mut keys: Vec<String> = result.as_ref().unwrap().iter().map(|i| i.key().to_string()).collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_fetcher_parses_served_page() {
    let server = MockServer::start().await;
    let next = format!("{}{LISTING_PATH}?dependents_after=Mg", server.uri());

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(listing_page(&["alice/one", "bob/two"], Some(&next))))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
    let page = fetcher
        .fetch(&Url::parse(&format!("{}{LISTING_PATH}", server.uri())).unwrap())
        .await
        .unwrap();

    assert_eq!(page.references, vec!["alice/one".to_string(), "bob/two".to_string()]);
    assert_eq!(page.next_page.unwrap().as_str(), next);
}

#[tokio::test]
async fn test_fetcher_rejects_error_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let fetcher = HttpPageFetcher::new(Duration::from_secs(5)).unwrap();
    let result = fetcher.fetch(&Url::parse(&format!("{}{LISTING_PATH}", server.uri())).unwrap()).await;

    let _ = result.unwrap_err();
}

#[tokio::test]
async fn test_collector_walks_all_pages() {
    let server = MockServer::start().await;
    let page_2 = format!("{}{LISTING_PATH}?dependents_after=Mg", server.uri());
    let page_3 = format!("{}{LISTING_PATH}?dependents_after=NA", server.uri());

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("dependents_after", "Mg"))
        .respond_with(html(listing_page(&["carol/three", "alice/one"], Some(&page_3))))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("dependents_after", "NA"))
        .respond_with(html(listing_page(&["dave/four"], None)))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(listing_page(&["alice/one", "bob/two"], Some(&page_2))))
        .expect(1)
        .mount(&server)
        .await;

    let collector = collector(&server);
    let result = collector.collect(&RepositoryIdentity::from_full_name("offset64/eos")).await;

    assert_eq!(sorted_keys(&result), vec!["alice/one", "bob/two", "carol/three", "dave/four"]);
    assert_eq!(collector.limiter().admitted_in_window(), 3);
}

#[tokio::test]
async fn test_collector_keeps_partial_result() {
    let server = MockServer::start().await;
    let page_2 = format!("{}{LISTING_PATH}?dependents_after=Mg", server.uri());

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("dependents_after", "Mg"))
        .respond_with(ResponseTemplate::new(500))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(html(listing_page(&["alice/one", "bob/two"], Some(&page_2))))
        .mount(&server)
        .await;

    let result = collector(&server)
        .collect(&RepositoryIdentity::from_full_name("offset64/eos"))
        .await;

    assert_eq!(sorted_keys(&result), vec!["alice/one", "bob/two"]);
}

#[tokio::test]
async fn test_collector_fails_on_first_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let result = collector(&server)
        .collect(&RepositoryIdentity::from_full_name("offset64/eos"))
        .await;

    assert!(result.is_error());
}
