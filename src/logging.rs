use log::{LevelFilter, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Mutex, OnceLock};

pub const MAX_LOG_LINES: usize = 200;

/// In-memory logger. The terminal is in raw mode on the alternate screen
/// while the form runs, so records are kept for the status line instead of
/// being written out.
pub struct RingLogger {
    level: LevelFilter,
    lines: Mutex<VecDeque<String>>,
}

impl RingLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            lines: Mutex::new(VecDeque::with_capacity(MAX_LOG_LINES)),
        }
    }

    pub fn push(&self, line: String) {
        let Ok(mut lines) = self.lines.lock() else {
            return;
        };
        if lines.len() >= MAX_LOG_LINES {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.iter().skip(lines.len().saturating_sub(n)).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.push(format!("{:<5} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<RingLogger> = OnceLock::new();

/// Install the ring logger as the global `log` backend. Later calls keep the
/// first logger and only adjust the max level.
pub fn init(level: LevelFilter) {
    let logger = LOGGER.get_or_init(|| RingLogger::new(level));
    if log::set_logger(logger).is_ok() {
        log::set_max_level(level);
    }
}

pub fn tail(n: usize) -> Vec<String> {
    LOGGER.get().map(|l| l.tail(n)).unwrap_or_default()
}

/// `DYNFORM_LOG` value to a level filter; unknown strings fall back to info.
pub fn parse_level(s: Option<&str>) -> LevelFilter {
    s.and_then(|v| v.trim().parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    #[test]
    fn ring_drops_oldest_lines() {
        let logger = RingLogger::new(LevelFilter::Debug);
        for i in 0..MAX_LOG_LINES + 5 {
            logger.push(format!("line {i}"));
        }
        let all = logger.tail(usize::MAX);
        assert_eq!(all.len(), MAX_LOG_LINES);
        assert_eq!(all[0], "line 5");
        assert_eq!(
            logger.tail(1),
            vec![format!("line {}", MAX_LOG_LINES + 4)]
        );
    }

    #[test]
    fn records_below_level_are_dropped() {
        let logger = RingLogger::new(LevelFilter::Warn);
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("noise"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("dangling field"))
                .build(),
        );
        assert_eq!(logger.tail(10), vec!["WARN  dangling field".to_string()]);
    }

    #[test]
    fn level_parsing() {
        assert_eq!(parse_level(Some("debug")), LevelFilter::Debug);
        assert_eq!(parse_level(Some("OFF")), LevelFilter::Off);
        assert_eq!(parse_level(Some("loud")), LevelFilter::Info);
        assert_eq!(parse_level(None), LevelFilter::Info);
    }
}
