use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Map the `-v` count to a filter, unless `RUST_LOG` is set
fn filter_for(verbose_level: u8) -> tracing_subscriber::EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        return tracing_subscriber::EnvFilter::from_default_env();
    }
    tracing_subscriber::EnvFilter::new(filter_directives(verbose_level))
}

fn filter_directives(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,codemax=info,llm=info",
        1 => "info,codemax=debug,llm=debug",
        _ => "debug,codemax=trace,llm=trace",
    }
}

/// Install the global subscriber. Logs go to stderr, or to `log_file` when
/// given, so stdout only carries the streamed transcript.
pub fn setup_logging(verbose_level: u8, log_file: Option<PathBuf>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!(
                    "Warning: Could not open log file {:?} ({}), falling back to stderr",
                    path, e
                );
                None
            }
        }
    });

    match file {
        Some(file) => {
            subscriber
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            subscriber.with_writer(io::stderr).init();
        }
    }
}
