//! Grows a directed graph of repository dependencies by crawling GitHub.
//!
//! # Overview
//!
//! Given a repository, `dependagraph` collects the repositories it depends on (from the
//! dependency manifests GitHub has indexed for it) and the repositories that depend on it (from
//! its "Used by" listing), and merges both into a `SQLite` graph database. In coalesce mode it
//! then keeps picking repositories from the stored graph that have not been crawled yet, so the
//! graph grows outward from the starting point until nothing is left to explore.
//!
//! # Quick Start
//!
//! ```bash
//! export GITHUB_API_SECRET=ghp_...
//! export DEPENDAGRAPH_DATABASE=graph.db
//!
//! # Crawl a single repository
//! dependagraph offset64/eos
//!
//! # Keep crawling until the frontier is exhausted
//! dependagraph offset64/eos --coalesce
//! ```
//!
//! Crawling the same repository again is harmless: nodes and edges are merged, never duplicated.
//!
//! # Graph Statistics
//!
//! ```bash
//! dependagraph --stats
//! ```
//!
//! prints how many nodes and edges are stored, how many nodes have been crawled, and how many
//! are still waiting in the frontier.
//!
//! # Configuration
//!
//! Rate limits, retries, timeouts and the frontier exclusions are read from `dependagraph.toml`
//! in the current directory when present, or from the file given with `--config`. Generate a
//! commented file holding the defaults with:
//!
//! ```bash
//! dependagraph --init-config dependagraph.toml
//! ```
//!
//! # Logging
//!
//! Use `--log-level` (`none`, `error`, `warn`, `info`, `debug`, `trace`) to control diagnostic
//! output. `RUST_LOG` overrides it.

use camino::Utf8PathBuf;
use clap::Parser;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use dependagraph::Result;

mod commands;

use crate::commands::{CrawlArgs, init_config, process_crawl, show_stats};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "dependagraph", version, about)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    crawl: CrawlArgs,

    /// Print the size of the stored graph and exit
    #[arg(long, conflicts_with_all = ["target", "coalesce", "init_config"])]
    stats: bool,

    /// Write a default configuration file and exit
    #[arg(long, value_name = "PATH", conflicts_with_all = ["target", "coalesce"])]
    init_config: Option<Utf8PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(output) = &cli.init_config {
        return init_config(output);
    }

    if cli.stats {
        return show_stats(&cli.crawl.common);
    }

    process_crawl(&cli.crawl).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_target_and_coalesce() {
        let cli = Cli::try_parse_from(["dependagraph", "Offset64/EOS", "--coalesce"]).unwrap();
        assert_eq!(cli.crawl.target.unwrap().full_name(), "Offset64/EOS");
        assert!(cli.crawl.coalesce);
        assert!(!cli.stats);
    }

    #[test]
    fn test_malformed_target_is_rejected() {
        let _ = Cli::try_parse_from(["dependagraph", "offset64"]).unwrap_err();
        let _ = Cli::try_parse_from(["dependagraph", "offset64/eos/extra"]).unwrap_err();
        let _ = Cli::try_parse_from(["dependagraph", "/eos"]).unwrap_err();
    }

    #[test]
    fn test_target_is_required_for_a_crawl() {
        let _ = Cli::try_parse_from(["dependagraph", "--coalesce"]).unwrap_err();
    }

    #[test]
    fn test_stats_without_target() {
        let cli = Cli::try_parse_from(["dependagraph", "--stats", "--database", "graph.db"]).unwrap();
        assert!(cli.stats);
        assert!(cli.crawl.target.is_none());
    }

    #[test]
    fn test_init_config_conflicts_with_target() {
        let _ = Cli::try_parse_from(["dependagraph", "offset64/eos", "--init-config", "out.toml"]).unwrap_err();
    }
}
