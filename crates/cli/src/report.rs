//! Console status lines.
//!
//! Status output is for the operator and is always printed, independent of
//! the `tracing` diagnostics configured with `RUST_LOG`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

/// Kind of status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Info,
    Warning,
    Error,
}

impl Status {
    /// Symbol that prefixes the line.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Success => "✅",
            Self::Info => "ℹ️",
            Self::Warning => "⚠️",
            Self::Error => "❌",
        }
    }
}

/// Format a status line.
#[must_use]
pub fn line(status: Status, message: &str) -> String {
    format!("{} {message}", status.symbol())
}

/// Print a status line; errors go to stderr.
pub fn print(status: Status, message: &str) {
    if status == Status::Error {
        eprintln!("{}", line(status, message));
    } else {
        println!("{}", line(status, message));
    }
}

/// Print a plain progress line without a symbol.
pub fn progress(message: &str) {
    println!("{message}");
}

pub fn success(message: &str) {
    print(Status::Success, message);
}

pub fn info(message: &str) {
    print(Status::Info, message);
}

pub fn warning(message: &str) {
    print(Status::Warning, message);
}

pub fn error(message: &str) {
    print(Status::Error, message);
}
