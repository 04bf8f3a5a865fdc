mod common;
mod crawl;
mod init;
mod stats;

pub use common::{Common, CommonArgs};
pub use crawl::{CrawlArgs, process_crawl};
pub use init::init_config;
pub use stats::show_stats;
