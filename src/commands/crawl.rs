use crate::commands::{Common, CommonArgs};
use clap::Args;
use dependagraph::Result;
use dependagraph::collect::{DependencyCollector, DependentsCollector, GitHubManifestClient, HttpPageFetcher, RateLimiter, RetryPolicy};
use dependagraph::crawler::{CrawlMode, Crawler};
use dependagraph::identity::RepositoryIdentity;
use ohno::bail;
use tick::Clock;

const LOG_TARGET: &str = "     crawl";

#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// Repository to crawl, as org/name
    #[arg(value_name = "ORG/NAME", value_parser = RepositoryIdentity::parse_target, required_unless_present_any = ["stats", "init_config"])]
    pub target: Option<RepositoryIdentity>,

    /// Keep crawling untargeted repositories from the stored graph until none are left
    #[arg(long)]
    pub coalesce: bool,

    /// GitHub personal access token for the GraphQL API
    #[arg(long, value_name = "TOKEN", env = "GITHUB_API_SECRET", hide_env_values = true)]
    pub github_token: Option<String>,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn process_crawl(args: &CrawlArgs) -> Result<()> {
    let Some(target) = &args.target else {
        bail!("no repository given, expected org/name");
    };

    let Some(token) = args.github_token.as_deref().filter(|t| !t.trim().is_empty()) else {
        bail!("no GitHub token given, use --github-token or set GITHUB_API_SECRET");
    };

    let Common { config, store } = Common::new(&args.common)?;

    let clock = Clock::new_tokio();
    let retry = RetryPolicy::new(config.retry_attempts, config.retry_base_delay(), config.request_timeout());

    let dependents = DependentsCollector::new(
        HttpPageFetcher::new(config.request_timeout())?,
        RateLimiter::new("dependents", config.dependents_page_limit, config.dependents_window(), clock.clone()),
        retry,
        config.web_base()?,
    );

    let dependencies = DependencyCollector::new(
        GitHubManifestClient::new(token, &config.api_base_url)?,
        RateLimiter::new("dependencies", config.dependency_query_limit, config.dependency_window(), clock),
        retry,
    );

    let mode = if args.coalesce { CrawlMode::Coalescing } else { CrawlMode::Seeded };
    let mut crawler = Crawler::new(dependents, dependencies, store).with_max_targets(config.max_targets);

    let summary = crawler.run(target.clone(), mode).await?;
    let stats = crawler.store().stats()?;
    log::info!(target: LOG_TARGET, "The graph now holds {stats}");

    println!("{summary}");
    Ok(())
}
