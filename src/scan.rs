//! Scanner interface
//!
//! This crate does not match regexes against text itself. Tokenizing a line with a
//! resolved grammar is delegated to a [`ScannerBackend`] supplied by the caller: it
//! compiles a [`ResolvedGrammar`] into a [`LineTokenizer`], which turns one line plus
//! the state left by the previous line into tokens and the next state.
//!
//! Offsets are character offsets into the line. Scopes are ordered root to leaf.

use crate::grammar::{GrammarKind, ResolvedGrammar};
use thiserror::Error;

/// A classified span of one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub start_index: usize,
    pub end_index: usize,
    /// Scope path, root first
    pub scopes: Vec<String>,
}

impl Token {
    pub fn new<I, S>(start_index: usize, end_index: usize, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Token {
            start_index,
            end_index,
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the span fits a line of `line_len` characters and has at least one scope.
    pub fn validate(&self, line_len: usize) -> Result<(), ScanError> {
        if self.start_index > self.end_index || self.end_index > line_len {
            return Err(ScanError::InvalidToken {
                start: self.start_index,
                end: self.end_index,
                reason: format!("span out of bounds for a line of {line_len} characters"),
            });
        }
        if self.scopes.is_empty() {
            return Err(ScanError::InvalidToken {
                start: self.start_index,
                end: self.end_index,
                reason: "token has no scopes".to_string(),
            });
        }
        Ok(())
    }
}

/// Tokens of one line plus the state to carry into the next line
#[derive(Debug, Clone, PartialEq)]
pub struct LineTokens<S> {
    pub tokens: Vec<Token>,
    pub state: S,
}

/// Tokenizes lines of text with one compiled grammar
pub trait LineTokenizer: Send + Sync {
    /// Opaque continuation carried between lines
    type State: Clone + Send;

    /// State at the start of an independent text sequence
    fn start_state(&self) -> Self::State;

    /// Tokenize `line` given the state left by the previous line.
    fn tokenize_line(
        &self,
        state: &Self::State,
        line: &str,
    ) -> Result<LineTokens<Self::State>, ScanError>;
}

/// Compiles resolved grammars into tokenizers
pub trait ScannerBackend: Send + Sync {
    type Tokenizer: LineTokenizer + 'static;

    fn compile(
        &self,
        kind: GrammarKind,
        grammar: &ResolvedGrammar,
    ) -> Result<Self::Tokenizer, ScanError>;
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("failed to compile {kind} grammar: {reason}")]
    Compile { kind: GrammarKind, reason: String },

    #[error("tokenizer failed: {0}")]
    Tokenizer(String),

    #[error("invalid token {start}..{end}: {reason}")]
    InvalidToken {
        start: usize,
        end: usize,
        reason: String,
    },

    /// Any of the above, tied to the (zero-based) line it happened on
    #[error("line {line}: {source}")]
    AtLine {
        line: usize,
        #[source]
        source: Box<ScanError>,
    },
}

impl ScanError {
    pub(crate) fn at_line(self, line: usize) -> ScanError {
        ScanError::AtLine {
            line,
            source: Box::new(self),
        }
    }
}
