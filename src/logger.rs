use chrono::Local;
use fern::Dispatch;
use log::LevelFilter;
use std::sync::{Arc, Mutex};

/// In-memory copy of everything logged during one CPI invocation.
///
/// The director expects the log of a call inside the response envelope,
/// so every record is mirrored here in addition to stderr.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<String>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push_str(line);
            lines.push('\n');
        }
    }

    pub fn contents(&self) -> String {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}

/// Initializes the global logger.
///
/// Log level is controlled by the `RUST_LOG` environment variable and
/// defaults to `info`. Records go to stderr (stdout carries the response
/// document) and into the returned [`LogBuffer`].
pub fn init() -> LogBuffer {
    let buffer = LogBuffer::new();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let log_level_filter = log_level.parse::<LevelFilter>().unwrap_or(LevelFilter::Info);

    let base_config = Dispatch::new()
        .level(log_level_filter)
        .level_for("reqwest", LevelFilter::Warn)
        .level_for("hyper", LevelFilter::Warn)
        .level_for("mio", LevelFilter::Warn);

    let console_config = Dispatch::new()
        .format(|out, message, record| {
            let colors = fern::colors::ColoredLevelConfig::new()
                .error(fern::colors::Color::Red)
                .warn(fern::colors::Color::Yellow)
                .info(fern::colors::Color::Green)
                .debug(fern::colors::Color::Blue)
                .trace(fern::colors::Color::BrightBlack);

            out.finish(format_args!(
                "[{} {} {}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                record.target(),
                message
            ))
        })
        .chain(std::io::stderr());

    let sink = buffer.clone();
    let buffer_config = Dispatch::new().chain(fern::Output::call(move |record| {
        sink.push(&format!("[{} {} {}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), record.level(), record.target(), record.args()));
    }));

    base_config.chain(console_config).chain(buffer_config).apply().unwrap_or_else(|e| {
        eprintln!("Failed to apply logger configuration: {}", e);
    });

    buffer
}
