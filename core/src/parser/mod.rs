pub mod entry;
pub mod parser;

pub use entry::{LogEntry, LogLevel, LogSource, SourceLocation};
pub use parser::ToolOutputParser;
