//! The two grammar kinds shipped by this crate
//!
//! Both languages share lexical patterns but own disjoint scope namespaces: every
//! scope emitted by the source grammar ends in `.4gl`, every scope emitted by the form
//! grammar ends in `.per`. The suffix check is case-insensitive.

use crate::scan::Token;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which grammar a document, sample or output belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GrammarKind {
    /// The procedural 4GL language (`source.4gl`)
    Source,
    /// The PER form definition language (`source.per`)
    Form,
}

impl GrammarKind {
    pub const ALL: [GrammarKind; 2] = [GrammarKind::Source, GrammarKind::Form];

    /// Root scope name of the grammar
    pub fn scope_name(self) -> &'static str {
        match self {
            GrammarKind::Source => "source.4gl",
            GrammarKind::Form => "source.per",
        }
    }

    /// Canonical (upper-case) suffix every owned scope must end with
    pub fn scope_suffix(self) -> &'static str {
        match self {
            GrammarKind::Source => ".4GL",
            GrammarKind::Form => ".PER",
        }
    }

    /// Folder name used for sample cases and baselines
    pub fn folder(self) -> &'static str {
        match self {
            GrammarKind::Source => "source",
            GrammarKind::Form => "form",
        }
    }

    /// The other grammar kind
    pub fn complement(self) -> GrammarKind {
        match self {
            GrammarKind::Source => GrammarKind::Form,
            GrammarKind::Form => GrammarKind::Source,
        }
    }

    /// Pick the grammar a sample file is written in.
    ///
    /// Files with a `.per` extension are forms, everything else is 4GL source.
    pub fn for_file(path: &Path) -> GrammarKind {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("per") => GrammarKind::Form,
            _ => GrammarKind::Source,
        }
    }

    /// Whether `scope` belongs to this grammar's namespace
    pub fn owns_scope(self, scope: &str) -> bool {
        scope.to_uppercase().ends_with(self.scope_suffix())
    }

    /// Whether every scope of `token` belongs to this grammar's namespace
    pub fn owns_token(self, token: &Token) -> bool {
        token.scopes.iter().all(|scope| self.owns_scope(scope))
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.folder())
    }
}

impl FromStr for GrammarKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "source" | "4gl" => Ok(GrammarKind::Source),
            "form" | "per" => Ok(GrammarKind::Form),
            other => Err(format!("unknown grammar kind '{other}' (expected source or form)")),
        }
    }
}
