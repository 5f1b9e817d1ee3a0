//! Tokenization of raw command lines.
//!
//! A line is split on runs of space, tab and newline characters into owned
//! tokens. Quote characters are not interpreted; they are ordinary token
//! characters. An empty (or all-whitespace) line yields an empty token
//! sequence, which the caller treats as "no command" rather than an error.

use std::fmt;

/// Upper bound on the number of tokens a single line may produce.
pub const MAX_TOKENS: usize = 10;

/// Errors that can occur while tokenizing a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexError {
    /// The line produced more than [`MAX_TOKENS`] tokens. No partial token
    /// sequence is returned for such a line.
    TooManyTokens,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::TooManyTokens => {
                write!(f, "too many arguments (limit is {MAX_TOKENS} per line)")
            }
        }
    }
}

/// Split a raw line into whitespace-delimited tokens.
///
/// Consecutive separators collapse, so no token is ever empty. Token length
/// is unbounded.
pub fn tokenize(line: &str) -> Result<Vec<String>, LexError> {
    let mut tokens = Vec::new();
    for word in line.split([' ', '\t', '\n']) {
        if word.is_empty() {
            continue;
        }
        if tokens.len() == MAX_TOKENS {
            return Err(LexError::TooManyTokens);
        }
        tokens.push(word.to_string());
    }
    Ok(tokens)
}
