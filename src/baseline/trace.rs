//! Line-by-line tokenization traces
//!
//! A [`TraceEngine`] owns the scanner state of one text sequence. Each call to
//! [`TraceEngine::tokenize_line`] feeds the state left by the previous line back into
//! the tokenizer, so multi-line constructs (block comments, strings) carry over.
//!
//! Rendering is byte-exact because stored baselines are compared verbatim:
//!
//! ```text
//! >x := 1
//!  ^
//!  source.4gl variable.other.4gl
//!   ^^^^
//!   source.4gl
//! ```

use super::registry::LoadedGrammar;
use crate::grammar::GrammarKind;
use crate::scan::{LineTokenizer, ScanError, Token};
use std::fmt;

/// Appended to a scope line when a token carries a scope the grammar does not own
pub const INCORRECT_SCOPE_EXTENSION: &str = "INCORRECT_SCOPE_EXTENSION";

/// One source line with the tokens produced for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracedLine {
    pub text: String,
    pub tokens: Vec<Token>,
}

/// Tokens for every line of a text, produced by one grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trace {
    pub kind: GrammarKind,
    pub lines: Vec<TracedLine>,
}

impl Trace {
    /// Render every line, annotating tokens `self.kind` does not own.
    pub fn render(&self) -> TraceReport {
        let mut report = TraceReport::default();
        for line in &self.lines {
            report.push_line(self.kind, line);
        }
        report
    }
}

/// Rendered trace lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceReport {
    pub lines: Vec<String>,
}

impl TraceReport {
    fn push_line(&mut self, kind: GrammarKind, line: &TracedLine) {
        self.lines.push(format!(">{}", line.text));
        for token in &line.tokens {
            let (marker, scopes) = render_token(kind, token);
            self.lines.push(marker);
            self.lines.push(scopes);
        }
    }
}

impl fmt::Display for TraceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

/// Marker line and scope line for one token.
///
/// The marker is offset by one column to line up with the `>` prefix of the echoed
/// source line; the scope line uses the same indent.
pub fn render_token(kind: GrammarKind, token: &Token) -> (String, String) {
    let indent = " ".repeat(token.start_index + 1);
    let marker = format!("{indent}{}", "^".repeat(token.len()));
    let mut scopes = format!("{indent}{}", token.scopes.join(" "));
    if !kind.owns_token(token) {
        scopes.push(' ');
        scopes.push_str(INCORRECT_SCOPE_EXTENSION);
    }
    (marker, scopes)
}

/// Tokenizes one text sequence with one grammar, carrying state across lines
pub struct TraceEngine<'g, T: LineTokenizer> {
    grammar: &'g LoadedGrammar<T>,
    state: T::State,
    line: usize,
}

impl<'g, T: LineTokenizer> TraceEngine<'g, T> {
    pub fn new(grammar: &'g LoadedGrammar<T>) -> Self {
        TraceEngine {
            state: grammar.tokenizer.start_state(),
            grammar,
            line: 0,
        }
    }

    pub fn kind(&self) -> GrammarKind {
        self.grammar.kind
    }

    /// Tokenize the next line and advance the carried state.
    ///
    /// Tokens outside the line or without scopes are rejected; the state is not
    /// advanced on error.
    pub fn tokenize_line(&mut self, line: &str) -> Result<Vec<Token>, ScanError> {
        let index = self.line;
        let produced = self
            .grammar
            .tokenizer
            .tokenize_line(&self.state, line)
            .map_err(|err| err.at_line(index))?;

        let line_len = line.chars().count();
        for token in &produced.tokens {
            token.validate(line_len).map_err(|err| err.at_line(index))?;
        }

        self.state = produced.state;
        self.line += 1;
        Ok(produced.tokens)
    }

    /// Trace `lines` from a fresh start state.
    pub fn run<S: AsRef<str>>(grammar: &'g LoadedGrammar<T>, lines: &[S]) -> Result<Trace, ScanError> {
        let mut engine = TraceEngine::new(grammar);
        let mut traced = Vec::with_capacity(lines.len());
        for line in lines {
            let text = line.as_ref();
            let tokens = engine.tokenize_line(text)?;
            traced.push(TracedLine {
                text: text.to_string(),
                tokens,
            });
        }
        tracing::debug!(kind = %grammar.kind, lines = traced.len(), "traced text");
        Ok(Trace {
            kind: grammar.kind,
            lines: traced,
        })
    }
}
