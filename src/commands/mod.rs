//! Command grammar.
//!
//! Pure parsing of a message's text into a recognized command, or `None`
//! for anything that is not a command. Matching is literal prefix
//! matching in a fixed order; unknown `/` texts are silently ignored.

use std::path::{Path, PathBuf};

/// A command derived from a message's text. Transient, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Send the fixed help text.
    Help,
    /// Send the chat's invite link.
    Invite,
    /// Re-broadcast `text` with the triggering message's own attachment.
    Pin { text: String, file: Option<PathBuf> },
    /// Send the bundled editor template captioned with `title`.
    Editor { title: String },
}

/// Parse message text (plus its optional attachment) into a command.
///
/// The command prefix must be the very first character: text with
/// leading whitespace is not a command. First match wins: `/help`,
/// `/invite`, `/pin`, `/editor`. Arguments are the remainder after the
/// command token with at most one separating whitespace character
/// stripped, so `/pin` alone yields an empty argument instead of
/// panicking on a short slice.
pub fn parse(text: &str, file: Option<&Path>) -> Option<Command> {
    if !text.starts_with('/') {
        return None;
    }
    let trimmed = text.trim();

    if trimmed.starts_with("/help") {
        Some(Command::Help)
    } else if trimmed.starts_with("/invite") {
        Some(Command::Invite)
    } else if let Some(rest) = text.strip_prefix("/pin") {
        Some(Command::Pin {
            text: strip_separator(rest).to_string(),
            file: file.map(Path::to_path_buf),
        })
    } else if let Some(rest) = text.strip_prefix("/editor") {
        Some(Command::Editor {
            title: strip_separator(rest).to_string(),
        })
    } else {
        // Unknown command, treated as plain non-command text.
        None
    }
}

/// Strip at most one whitespace character separating the command token
/// from its argument.
fn strip_separator(rest: &str) -> &str {
    let mut chars = rest.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => rest,
    }
}
