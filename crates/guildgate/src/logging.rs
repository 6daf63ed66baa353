//! Tracing initialisation.

use guildgate_config::LoggingSection;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const VERBOSE_FILTER: &str =
    "guildgate=debug,guildgate_bridge=debug,guildgate_config=debug,tower_http=debug,info";

/// Console layer on stderr (text or JSON) plus an optional daily-rolling JSON file.
///
/// Both layers share one filter: `verbose` wins, then `RUST_LOG`, then the
/// configured level. The returned guard must live as long as the process to
/// flush the file.
pub fn init(config: &LoggingSection, verbose: bool) -> Option<WorkerGuard> {
    let directives = filter_directives(config, verbose, std::env::var("RUST_LOG").ok());

    let console = if config.json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new(&directives))
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(EnvFilter::new(&directives))
            .boxed()
    };

    let (file, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "guildgate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new(&directives));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry().with(console).with(file).init();
    guard
}

fn filter_directives(config: &LoggingSection, verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return VERBOSE_FILTER.to_string();
    }
    rust_log
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.level.clone())
}
