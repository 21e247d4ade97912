//! Grammar preparation
//!
//! Grammars are authored as YAML documents with a `variables` table of shared regex
//! fragments. This module turns them into self-contained grammars:
//!
//! ```text
//! YAML text ──▶ RawGrammar ──(variable hook)──▶ VariableResolver ──▶ ResolvedGrammar ──▶ plist / JSON
//! ```
//!
//! - [rule]: typed rule tree and traversal
//! - [document]: raw and resolved grammar documents, output encoding
//! - [variables]: placeholder resolution
//! - [loader]: YAML loading with a variable hook
//! - [build]: writing both grammars to their configured paths

pub mod build;
pub mod document;
pub mod error;
pub mod kind;
pub mod loader;
pub mod rule;
pub mod variables;

pub use build::{build_grammar, build_grammars, write_grammar, BuildOutcome, BuiltGrammar};
pub use document::{GrammarBody, OutputFormat, RawGrammar, ResolvedGrammar, VariableTable};
pub use error::GrammarError;
pub use kind::GrammarKind;
pub use loader::{apply_overrides, GrammarLoader, VariableHook};
pub use rule::{PatternField, Rule, RuleKind, RulePath};
pub use variables::{unresolved_placeholders, UnresolvedPlaceholder, VariableResolver};
