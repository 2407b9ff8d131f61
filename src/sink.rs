//! Caller-facing log stream.
//!
//! Every extraction operation receives a `&mut dyn LogSink` and appends human-readable lines to
//! it as work progresses. The binary forwards them to the `log` facade; embedding callers and
//! tests usually collect them with [`MemorySink`].

use log::Level;

/// Append-only receiver of leveled log lines.
pub trait LogSink {
    fn append(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.append(Level::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.append(Level::Warn, message);
    }

    fn error(&mut self, message: &str) {
        self.append(Level::Error, message);
    }
}

/// Keeps every line in memory, in arrival order.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    lines: Vec<(Level, String)>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[(Level, String)] {
        &self.lines
    }

    /// Messages logged at exactly `level`
    pub fn messages(&self, level: Level) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|(line_level, _)| *line_level == level)
            .map(|(_, message)| message.as_str())
            .collect()
    }
}

impl LogSink for MemorySink {
    fn append(&mut self, level: Level, message: &str) {
        self.lines.push((level, message.to_owned()));
    }
}

/// Forwards lines to whatever logger the application installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct FacadeSink;

impl LogSink for FacadeSink {
    fn append(&mut self, level: Level, message: &str) {
        log::log!(target: "rusty_extract", level, "{}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.info("one");
        sink.warn("two");
        sink.error("three");
        sink.warn("four");

        assert_eq!(sink.lines().len(), 4);
        assert_eq!(sink.lines()[0], (Level::Info, "one".to_owned()));
        assert_eq!(sink.messages(Level::Warn), vec!["two", "four"]);
        assert_eq!(sink.messages(Level::Error), vec!["three"]);
    }

    #[test]
    fn facade_sink_accepts_lines() {
        let mut sink = FacadeSink;
        sink.info("forwarded");
        sink.append(Level::Debug, "forwarded too");
    }
}
