use crate::parser::entry::{LogEntry, LogLevel};
use std::io::Write;

#[derive(Debug)]
pub struct Logger {
    use_colors: bool,
    min_level: LogLevel,
}

impl Logger {
    pub fn new() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
            min_level: LogLevel::Info,
        }
    }

    pub fn with_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = min_level;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    pub fn log(&self, level: LogLevel, message: &str) {
        if !self.enabled(level) {
            return;
        }

        if self.use_colors {
            println!("{}{}\x1b[0m", color_for(level), message);
        } else {
            println!("{}", message);
        }
    }

    pub fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.log(LogLevel::Warning, &format!("WARNING: {}", message));
    }

    pub fn error(&self, message: &str) {
        self.log(LogLevel::Error, &format!("ERROR: {}", message));
    }

    /// Stage banner, e.g. `=== Building Filesystem ===`.
    pub fn section(&self, title: &str) {
        if !self.enabled(LogLevel::Info) {
            return;
        }

        println!();
        if self.use_colors {
            println!("\x1b[1;36m=== {} ===\x1b[0m", title);
        } else {
            println!("=== {} ===", title);
        }
    }

    pub fn log_entry(&self, entry: &LogEntry) {
        if !self.enabled(entry.level) {
            return;
        }

        println!("{}", self.format_entry(entry));
        let _ = std::io::stdout().flush();
    }

    /// `[12:00:01] ERROR cc: expected ';' (src/main.cpp:4)`
    pub fn format_entry(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        let (dim, color, cyan, reset) = if self.use_colors {
            ("\x1b[90m", color_for(entry.level), "\x1b[36m", "\x1b[0m")
        } else {
            ("", "", "", "")
        };

        let mut line = format!("{}[{}]{} {}", dim, timestamp, reset, color);
        if entry.level >= LogLevel::Warning {
            line.push_str(entry.level.label());
            line.push(' ');
        }
        if let Some(tag) = entry.source.tag() {
            line.push_str(tag);
            line.push_str(": ");
        }
        line.push_str(&entry.message);
        line.push_str(reset);

        if let Some(location) = &entry.location {
            line.push_str(&format!(" {}({}){}", cyan, location, reset));
        }

        line
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

fn color_for(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Debug => "\x1b[90m",
        LogLevel::Info => "\x1b[37m",
        LogLevel::Warning => "\x1b[33m",
        LogLevel::Error => "\x1b[31m",
        LogLevel::Fatal => "\x1b[31;1m",
    }
}
