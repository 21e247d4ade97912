//! Baseline report text for one sample document

use super::diff::{compare, DivergenceVerdict};
use super::error::BaselineError;
use super::registry::GrammarRegistry;
use super::trace::{TraceEngine, TraceReport};
use crate::grammar::GrammarKind;
use crate::scan::LineTokenizer;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::Path;

const RULE: &str = "-----------------------------------";

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n|\r|\n").unwrap());
static ONLY_OWN_GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)//\s*@onlyOwnGrammar").unwrap());

/// Split on any line terminator. A trailing terminator yields a final empty line.
pub fn split_lines(text: &str) -> Vec<&str> {
    LINE_BREAK.split(text).collect()
}

/// Whether the first line opts out of cross-checking with the other grammar
pub fn wants_only_own_grammar(lines: &[&str]) -> bool {
    lines
        .first()
        .is_some_and(|first| ONLY_OWN_GRAMMAR.is_match(first))
}

/// Which grammars trace a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrammarSelection {
    pub main: GrammarKind,
    /// Complementary grammar, unless the document opted out
    pub other: Option<GrammarKind>,
}

impl GrammarSelection {
    pub fn for_document(path: &Path, lines: &[&str]) -> Self {
        let main = GrammarKind::for_file(path);
        let other = (!wants_only_own_grammar(lines)).then(|| main.complement());
        GrammarSelection { main, other }
    }
}

/// A traced grammar section of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarSection {
    pub file_name: String,
    pub trace: TraceReport,
}

impl fmt::Display for GrammarSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grammar: {}\n{RULE}\n{}", self.file_name, self.trace)
    }
}

/// Full baseline report of one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineReport {
    pub lines: Vec<String>,
    pub main: GrammarSection,
    pub secondary: Option<GrammarSection>,
    pub verdict: DivergenceVerdict,
}

impl fmt::Display for BaselineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "original file\n{RULE}\n{}\n{RULE}\n\n", self.lines.join("\n"))?;
        write!(f, "{}", self.main)?;
        if let Some(secondary) = &self.secondary {
            write!(f, "\n\n\n{secondary}")?;
        }
        Ok(())
    }
}

/// Trace `text` with the grammar its path selects and cross-check it with the other.
pub fn generate_report<T: LineTokenizer + 'static>(
    registry: &GrammarRegistry<T>,
    path: &Path,
    text: &str,
) -> Result<BaselineReport, BaselineError> {
    let lines = split_lines(text);
    let selection = GrammarSelection::for_document(path, &lines);

    let main = registry.get(selection.main)?;
    let trace = TraceEngine::run(main, &lines)?;

    let mut verdict = DivergenceVerdict::default();
    let mut secondary = None;
    if let Some(kind) = selection.other {
        let other = registry.get(kind)?;
        verdict = compare(&trace, other)?;
        secondary = verdict.secondary.clone().map(|trace| GrammarSection {
            file_name: other.file_name.clone(),
            trace,
        });
    }

    Ok(BaselineReport {
        lines: lines.iter().map(|line| line.to_string()).collect(),
        main: GrammarSection {
            file_name: main.file_name.clone(),
            trace: trace.render(),
        },
        secondary,
        verdict,
    })
}
