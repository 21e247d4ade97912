//! Errors raised while generating and checking baselines

use crate::grammar::{GrammarError, GrammarKind};
use crate::scan::ScanError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BaselineError {
    /// No stored expectation exists for a generated report
    #[error("new generated baseline, not yet approved: {file}")]
    MissingBaseline { file: String },

    /// The generated report differs from the stored expectation
    #[error("expected baselines to match: {file}")]
    BaselineMismatch { file: String },

    /// The grammar a document needs failed to load earlier
    #[error("{kind} grammar is unavailable: {reason}")]
    GrammarUnavailable { kind: GrammarKind, reason: String },

    #[error(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A case task panicked or was cancelled
    #[error("baseline task failed: {0}")]
    Task(String),
}

impl BaselineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BaselineError::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a comparison failure rather than a processing failure
    pub fn is_comparison_failure(&self) -> bool {
        matches!(
            self,
            BaselineError::MissingBaseline { .. } | BaselineError::BaselineMismatch { .. }
        )
    }
}
