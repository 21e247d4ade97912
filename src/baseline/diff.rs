//! Cross-checking a text against the complementary grammar
//!
//! The secondary grammar tokenizes the same lines with its own state. A line diverges
//! when its tokens differ structurally from the primary trace, or when the secondary
//! grammar emits a scope outside its own namespace. Only a diverging text gets the
//! secondary trace in its report.

use super::registry::LoadedGrammar;
use super::trace::{Trace, TraceEngine, TraceReport};
use crate::scan::{LineTokenizer, ScanError, Token};

/// Same count and pairwise equal spans and scope sequences
pub fn tokens_match(left: &[Token], right: &[Token]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| a == b)
}

/// Why a line diverged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDivergence {
    /// Zero-based line index
    pub line: usize,
    /// The two grammars tokenized the line differently
    pub structural: bool,
    /// Secondary scopes outside the secondary grammar's namespace
    pub unowned_scopes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DivergenceVerdict {
    pub lines: Vec<LineDivergence>,
    /// Rendered secondary trace, present only when some line diverged
    pub secondary: Option<TraceReport>,
}

impl DivergenceVerdict {
    pub fn diverged(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Tokenize the primary trace's lines with `secondary` and compare.
pub fn compare<T: LineTokenizer>(
    primary: &Trace,
    secondary: &LoadedGrammar<T>,
) -> Result<DivergenceVerdict, ScanError> {
    let lines: Vec<&str> = primary.lines.iter().map(|line| line.text.as_str()).collect();
    let other = TraceEngine::run(secondary, &lines)?;
    Ok(compare_traces(primary, &other))
}

/// Compare two traces over the same lines.
pub fn compare_traces(primary: &Trace, secondary: &Trace) -> DivergenceVerdict {
    let kind = secondary.kind;
    let lines: Vec<LineDivergence> = primary
        .lines
        .iter()
        .zip(&secondary.lines)
        .enumerate()
        .filter_map(|(index, (ours, theirs))| {
            let structural = !tokens_match(&ours.tokens, &theirs.tokens);
            let unowned_scopes: Vec<String> = theirs
                .tokens
                .iter()
                .flat_map(|token| &token.scopes)
                .filter(|scope| !kind.owns_scope(scope))
                .cloned()
                .collect();
            (structural || !unowned_scopes.is_empty()).then_some(LineDivergence {
                line: index,
                structural,
                unowned_scopes,
            })
        })
        .collect();

    if lines.is_empty() {
        return DivergenceVerdict::default();
    }
    tracing::debug!(kind = %kind, diverging = lines.len(), "secondary grammar diverged");
    DivergenceVerdict {
        secondary: Some(secondary.render()),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::trace::TracedLine;
    use crate::grammar::GrammarKind;

    fn trace(kind: GrammarKind, lines: Vec<(&str, Vec<Token>)>) -> Trace {
        Trace {
            kind,
            lines: lines
                .into_iter()
                .map(|(text, tokens)| TracedLine {
                    text: text.to_string(),
                    tokens,
                })
                .collect(),
        }
    }

    #[test]
    fn test_token_comparison_is_order_and_length_sensitive() {
        let a = Token::new(0, 2, ["source.4gl", "keyword.4gl"]);
        let b = Token::new(0, 2, ["keyword.4gl", "source.4gl"]);
        assert!(tokens_match(&[a.clone()], &[a.clone()]));
        assert!(!tokens_match(&[a.clone()], &[b]));
        assert!(!tokens_match(&[a.clone()], &[a.clone(), a]));
        assert!(tokens_match(&[], &[]));
    }

    #[test]
    fn test_identical_owned_traces_do_not_diverge() {
        let primary = trace(GrammarKind::Source, vec![("x", vec![Token::new(0, 1, ["source.4gl"])])]);
        let secondary = trace(GrammarKind::Form, vec![("x", vec![Token::new(0, 1, ["source.per"])])]);
        // Different scopes are a structural difference.
        assert!(compare_traces(&primary, &secondary).diverged());

        let same = trace(GrammarKind::Form, vec![("", vec![])]);
        let verdict = compare_traces(&trace(GrammarKind::Source, vec![("", vec![])]), &same);
        assert!(!verdict.diverged());
        assert_eq!(verdict.secondary, None);
    }

    #[test]
    fn test_unowned_secondary_scope_forces_secondary_trace() {
        let token = Token::new(0, 1, ["variable.other.readonly"]);
        let primary = trace(GrammarKind::Source, vec![("x", vec![token.clone()]), ("y", vec![])]);
        let secondary = trace(GrammarKind::Form, vec![("x", vec![token]), ("y", vec![])]);

        let verdict = compare_traces(&primary, &secondary);
        assert_eq!(
            verdict.lines,
            vec![LineDivergence {
                line: 0,
                structural: false,
                unowned_scopes: vec!["variable.other.readonly".to_string()],
            }]
        );
        let rendered = verdict.secondary.unwrap().to_string();
        assert_eq!(
            rendered,
            ">x\n ^\n variable.other.readonly INCORRECT_SCOPE_EXTENSION\n>y"
        );
    }
}
