//! Setup shared by the commands.

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use dependagraph::Result;
use dependagraph::config::Config;
use dependagraph::graph::{FrontierFilter, GraphStore, SqliteBackend};
use ohno::{IntoAppError, bail};

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// No logging output
    None,
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Info, warning, and error messages
    Info,
    /// Debug and above messages
    Debug,
    /// All messages including trace
    Trace,
}

/// Arguments shared by every command
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path of the graph database, created if absent
    #[arg(long, value_name = "PATH", env = "DEPENDAGRAPH_DATABASE")]
    pub database: Option<Utf8PathBuf>,

    /// Path to configuration file [default: dependagraph.toml, if present]
    #[arg(long, short = 'c', value_name = "PATH")]
    pub config: Option<Utf8PathBuf>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    pub log_level: LogLevel,
}

/// Loaded configuration plus the opened graph
#[derive(Debug)]
pub struct Common {
    pub config: Config,
    pub store: GraphStore<SqliteBackend>,
}

impl Common {
    /// Initialize logging, load the configuration and open the graph database
    ///
    /// The database location is checked before anything is opened.
    pub fn new(args: &CommonArgs) -> Result<Self> {
        init_logging(args.log_level);

        let Some(database) = &args.database else {
            bail!("no graph database given, use --database or set DEPENDAGRAPH_DATABASE");
        };

        let config = load_config(args.config.as_deref())?;
        let store = open_store(database, &config)?;

        Ok(Self { config, store })
    }
}

/// Load the configuration, refusing one with validation warnings
fn load_config(config_path: Option<&Utf8Path>) -> Result<Config> {
    let current_dir = std::env::current_dir().into_app_err("determining the current directory")?;
    let current_dir = Utf8PathBuf::from_path_buf(current_dir)
        .map_err(|p| ohno::app_err!("current directory '{}' is not valid UTF-8", p.display()))?;

    let (config, warnings) = Config::load(&current_dir, config_path)?;

    if !warnings.is_empty() {
        eprintln!("\n⚠️  Configuration validation warnings:");
        for warning in &warnings {
            eprintln!("   {warning}");
        }
        eprintln!();

        bail!("invalid configuration");
    }

    Ok(config)
}

fn open_store(database: &Utf8Path, config: &Config) -> Result<GraphStore<SqliteBackend>> {
    let backend = SqliteBackend::open(database)?;
    Ok(GraphStore::new(backend, FrontierFilter::new(config.frontier_exclusions.iter().cloned())))
}

/// Initialize logger based on log level
///
/// `RUST_LOG` takes precedence over the level given on the command line.
fn init_logging(log_level: LogLevel) {
    let level = match log_level {
        LogLevel::None => return,
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };

    let env = env_logger::Env::default().filter_or("RUST_LOG", level);

    env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .format_module_path(false)
        .format_target(matches!(log_level, LogLevel::Debug | LogLevel::Trace))
        .init();
}
