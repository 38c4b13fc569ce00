//! PFCL directive parser.
//!
//! Leading tokens of the form `/name` open a directive; `key=value` tokens that
//! follow bind to the most recent directive. The first token that is neither ends
//! scanning, and the rest of the input (trimmed, spacing preserved) becomes the
//! free-text remainder. Malformed argument tokens such as `=x`, `key=`, or `k!y=v`
//! are treated as the start of the remainder rather than rejected.

use demon_primitives::Command;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Result of splitting raw text into directives and free text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedInput {
    commands: Vec<Command>,
    remainder: String,
}

impl ParsedInput {
    /// Directives in the order they appeared.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Free text following the directives.
    #[must_use]
    pub fn remainder(&self) -> &str {
        &self.remainder
    }

    /// Splits into owned parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<Command>, String) {
        (self.commands, self.remainder)
    }
}

/// Stateless parser for inline directives.
#[derive(Clone, Copy, Debug, Default)]
pub struct DirectiveParser;

impl DirectiveParser {
    /// Creates a parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses `text` into directives and remainder.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParsedInput {
        let mut commands: Vec<Command> = Vec::new();
        let mut rest_start = text.len();

        for (offset, token) in split_tokens(text) {
            if let Ok(command) = Command::new(token) {
                commands.push(command);
                continue;
            }

            if let (Some(current), Some((key, value))) = (commands.last_mut(), split_argument(token))
            {
                current.insert_arg(key, value);
                continue;
            }

            rest_start = offset;
            break;
        }

        let remainder = text[rest_start..].trim().to_owned();
        trace!(directives = commands.len(), "parsed pfcl input");
        ParsedInput {
            commands,
            remainder,
        }
    }
}

/// Convenience wrapper around [`DirectiveParser::parse`].
#[must_use]
pub fn parse(text: &str) -> (Vec<Command>, String) {
    DirectiveParser::new().parse(text).into_parts()
}

fn split_tokens(text: &str) -> Vec<(usize, &str)> {
    let mut tokens = Vec::new();
    let mut start = None;
    for (idx, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if let Some(begin) = start.take() {
                tokens.push((begin, &text[begin..idx]));
            }
        } else if start.is_none() {
            start = Some(idx);
        }
    }
    if let Some(begin) = start {
        tokens.push((begin, &text[begin..]));
    }
    tokens
}

fn split_argument(token: &str) -> Option<(&str, &str)> {
    let (key, value) = token.split_once('=')?;
    let mut chars = key.chars();
    let head_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if head_ok && tail_ok && !value.is_empty() {
        Some((key, value))
    } else {
        None
    }
}
