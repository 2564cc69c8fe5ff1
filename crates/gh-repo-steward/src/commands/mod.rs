//! CLI command implementations

pub mod bulk;
pub mod cache;
pub mod read;
pub mod sessions;

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::{self, BufRead, Write};

pub use bulk::BulkCommand;
pub use cache::CacheArgs;
pub use read::ReadCommand;
pub use sessions::SessionsArgs;

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{}", json);
    Ok(())
}

/// Where progress and plan lines go
///
/// With `--json` stdout carries only the JSON document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusStream {
    Stdout,
    Stderr,
}

impl StatusStream {
    pub fn for_output(json: bool) -> Self {
        if json {
            StatusStream::Stderr
        } else {
            StatusStream::Stdout
        }
    }

    pub fn line(self, line: &str) {
        match self {
            StatusStream::Stdout => println!("{}", line),
            StatusStream::Stderr => eprintln!("{}", line),
        }
    }
}

/// Ask a yes/no question on stdin; anything but y/yes declines
pub fn confirm(question: &str) -> Result<bool> {
    eprint!("{} [y/N] ", question);
    io::stderr().flush()?;

    let mut answer = String::new();
    io::stdin()
        .lock()
        .read_line(&mut answer)
        .context("Failed to read answer")?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Shorten `text` to `max` characters, marking the cut
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}
