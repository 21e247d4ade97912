//! Baseline engine
//!
//! Sample documents are tokenized with the grammar their file kind selects and
//! rendered as a plain-text trace. The complementary grammar tokenizes the same text;
//! when it tokenizes any line differently, or leaks scopes outside its namespace, its
//! trace is appended as well. Reports are compared verbatim with approved baselines.
//!
//! - [trace]: state-threaded tokenization and rendering
//! - [diff]: secondary grammar cross-check
//! - [report]: grammar selection and report text
//! - [registry]: compiled grammars shared by every report
//! - [suite]: case discovery and baseline comparison

pub mod diff;
pub mod error;
pub mod registry;
pub mod report;
pub mod suite;
pub mod trace;

pub use diff::{compare, compare_traces, tokens_match, DivergenceVerdict, LineDivergence};
pub use error::BaselineError;
pub use registry::{GrammarRegistry, LoadedGrammar};
pub use report::{
    generate_report, split_lines, wants_only_own_grammar, BaselineReport, GrammarSection,
    GrammarSelection,
};
pub use suite::{
    assert_matches_baseline, baseline_file_name, check_case, BaselineLayout, BaselineSuite,
    CaseOutcome, SuiteSummary,
};
pub use trace::{render_token, Trace, TraceEngine, TraceReport, TracedLine, INCORRECT_SCOPE_EXTENSION};
