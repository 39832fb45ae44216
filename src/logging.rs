use std::fs;
use std::path::Path;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Crate filter directive for a `-v` count
pub fn verbosity_directive(verbose: u8) -> &'static str {
    match verbose {
        0 => "exo_mercat=warn",
        1 => "exo_mercat=info",
        2 => "exo_mercat=debug",
        _ => "exo_mercat=trace",
    }
}

/// Console plus daily-rolling JSON file logging under `logs_dir`.
pub fn init_logging(logs_dir: &Path, verbose: u8) {
    let _ = fs::create_dir_all(logs_dir);

    let file_appender = tracing_appender::rolling::daily(logs_dir, "exo_mercat.log");
    let (non_blocking_writer, _guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = verbosity_directive(verbose).parse() {
        filter = filter.add_directive(directive);
    }

    // try_init so tests and repeated runs in one process don't panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .try_init();

    // Keep the writer alive for the whole process so buffered lines are flushed
    std::mem::forget(_guard);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(verbosity_directive(0), "exo_mercat=warn");
        assert_eq!(verbosity_directive(2), "exo_mercat=debug");
        assert_eq!(verbosity_directive(9), "exo_mercat=trace");
    }
}
