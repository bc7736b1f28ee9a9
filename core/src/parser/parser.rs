use super::entry::{LogEntry, LogLevel, LogSource, SourceLocation};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static GCC_DIAGNOSTIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^:\s][^:]*):(\d+):(\d+): (fatal error|error|warning|note): (.+)$")
        .expect("valid diagnostic regex")
});
static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;]*[A-Za-z]").expect("valid ansi regex"));

/// Whole-line rules tried in order after compiler diagnostics.
static LINE_RULES: Lazy<Vec<(Regex, LogLevel, LogSource)>> = Lazy::new(|| {
    [
        (
            r"undefined reference to|multiple definition of|region `[^']+' overflowed",
            LogLevel::Error,
            LogSource::Linker,
        ),
        (
            r"^\*\*\* \[.+\] Error \d+|\[FAILED\]|^Error: ",
            LogLevel::Error,
            LogSource::PlatformIo,
        ),
        (r"\[SUCCESS\]", LogLevel::Info, LogSource::PlatformIo),
        (r"^npm (ERR!|error)", LogLevel::Error, LogSource::Bundler),
        (r"^npm (WARN|warn)", LogLevel::Warning, LogSource::Bundler),
    ]
    .into_iter()
    .map(|(pattern, level, source)| {
        (
            Regex::new(pattern).expect("valid tool output regex"),
            level,
            source,
        )
    })
    .collect()
});

/// Classifies lines printed by PlatformIO, the cross compiler and npm.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolOutputParser;

impl ToolOutputParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line: &str) -> LogEntry {
        let stripped = strip_ansi(line);

        if let Some(caps) = GCC_DIAGNOSTIC.captures(&stripped) {
            return diagnostic_entry(&caps);
        }

        let (level, source) = LINE_RULES
            .iter()
            .find(|(regex, _, _)| regex.is_match(&stripped))
            .map(|(_, level, source)| (*level, *source))
            .unwrap_or((LogLevel::Info, LogSource::Tool));

        LogEntry::new(level, source, stripped)
    }
}

fn diagnostic_entry(caps: &Captures<'_>) -> LogEntry {
    let capture = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or_default();

    let level = match capture(4) {
        "fatal error" | "error" => LogLevel::Error,
        "warning" => LogLevel::Warning,
        _ => LogLevel::Debug,
    };

    LogEntry::new(level, LogSource::Compiler, capture(5)).at(SourceLocation {
        file: capture(1).to_string(),
        line: capture(2).parse().ok(),
        column: capture(3).parse().ok(),
    })
}

pub fn strip_ansi(s: &str) -> String {
    ANSI_ESCAPE.replace_all(s, "").to_string()
}
