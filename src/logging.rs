use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Log to stderr, used in one-shot mode
pub fn setup_logging(verbose_level: u8) {
    setup_logging_with_file(verbose_level, None);
}

pub fn setup_logging_for_terminal_ui(verbose_level: u8) {
    // For the REPL, log to a file so log lines don't interleave with the chat
    let log_file_path = log_file_path();

    if let Some(parent) = log_file_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    setup_logging_with_file(verbose_level, Some(log_file_path));
}

pub fn log_file_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("itinerary-chat")
        .join("chat.log")
}

fn filter_for(verbose_level: u8) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(filter_directives(verbose_level))
    }
}

fn filter_directives(verbose_level: u8) -> &'static str {
    match verbose_level {
        0 => "warn,itinerary_chat=info",
        1 => "info,itinerary_chat=debug",
        _ => "debug,itinerary_chat=trace",
    }
}

fn setup_logging_with_file(verbose_level: u8, log_file: Option<PathBuf>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose_level))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_level(true);

    let file = log_file.and_then(|path| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                eprintln!(
                    "Warning: Could not open log file {:?} ({}), falling back to stderr",
                    path, e
                );
            })
            .ok()
    });

    let result = match file {
        Some(file) => subscriber
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
        None => subscriber.with_writer(std::io::stderr).try_init(),
    };

    if let Err(e) = result {
        eprintln!("Warning: Could not initialize logging: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_mapping() {
        assert_eq!(filter_directives(0), "warn,itinerary_chat=info");
        assert_eq!(filter_directives(1), "info,itinerary_chat=debug");
        assert_eq!(filter_directives(2), "debug,itinerary_chat=trace");
        assert_eq!(filter_directives(7), "debug,itinerary_chat=trace");
    }

    #[test]
    fn test_log_file_location() {
        let path = log_file_path();
        assert!(path.ends_with("itinerary-chat/chat.log"));
    }
}
