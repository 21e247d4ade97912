//! Errors raised while loading, resolving and writing grammars

use std::path::PathBuf;
use thiserror::Error;

/// Error that can occur while turning a grammar document into a resolved grammar
#[derive(Debug, Error)]
pub enum GrammarError {
    /// The document could not be deserialized, or its shape cannot hold a grammar
    #[error("malformed grammar document {origin}: {reason}")]
    Malformed { origin: String, reason: String },

    /// A variable name could not be turned into a placeholder matcher
    #[error("invalid variable '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    /// The resolved grammar could not be encoded in the requested output format
    #[error("failed to serialize grammar: {0}")]
    Serialize(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GrammarError {
    pub(crate) fn malformed(origin: impl Into<String>, reason: impl ToString) -> Self {
        GrammarError::Malformed {
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GrammarError::Io {
            path: path.into(),
            source,
        }
    }
}
