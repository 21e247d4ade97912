//! Pattern variable resolution
//!
//! Grammar authors factor shared regex fragments into a `variables` table and refer
//! to them from rules (and from later variables) with `{{name}}` placeholders:
//!
//! ```text
//! variables:
//!   identifier: '[a-zA-Z_][a-zA-Z0-9_]*'
//!   keyword: 'if|then|{{identifier}}'
//! repository:
//!   keywords:
//!     match: '\b({{keyword}})\b'
//! ```
//!
//! Variables are processed in declaration order. Each one is first expanded with the
//! replacements recorded so far, then recorded itself, so a variable may embed any
//! variable declared before it. A reference to a variable declared *after* it stays in
//! its value verbatim. Placeholders are matched case-insensitively and replaced
//! literally (`$` in a replacement is not special).
//!
//! Unknown placeholders are not an error: resolution is substitution, not validation.
//! [`unresolved_placeholders`] reports what is left over.

use super::document::{GrammarBody, ResolvedGrammar, VariableTable};
use super::error::GrammarError;
use super::rule::PatternField;
use once_cell::sync::Lazy;
use regex::{NoExpand, Regex, RegexBuilder};
use std::borrow::Cow;

/// Any `{{...}}` token left in a pattern
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{([^{}]*)\}\}").unwrap());

#[derive(Debug, Clone)]
struct Replacer {
    name: String,
    placeholder: Regex,
    replacement: String,
}

/// Substitutes `{{name}}` placeholders with resolved variable text
#[derive(Debug, Clone, Default)]
pub struct VariableResolver {
    replacers: Vec<Replacer>,
}

impl VariableResolver {
    /// Resolve a variable table in declaration order.
    pub fn new(variables: &VariableTable) -> Result<Self, GrammarError> {
        let mut replacers: Vec<Replacer> = Vec::with_capacity(variables.len());
        for (name, pattern) in variables {
            let replacement = expand(&replacers, pattern);
            let source = ["\\{\\{", &regex::escape(name), "\\}\\}"].concat();
            let placeholder = RegexBuilder::new(&source)
                .case_insensitive(true)
                .multi_line(true)
                .build()
                .map_err(|e| GrammarError::InvalidVariable {
                    name: name.clone(),
                    reason: e.to_string(),
                })?;
            replacers.push(Replacer {
                name: name.clone(),
                placeholder,
                replacement,
            });
        }
        Ok(VariableResolver { replacers })
    }

    /// The resolved text of a variable, as recorded
    pub fn resolved(&self, name: &str) -> Option<&str> {
        self.replacers
            .iter()
            .find(|replacer| replacer.name == name)
            .map(|replacer| replacer.replacement.as_str())
    }

    /// Number of recorded variables
    pub fn len(&self) -> usize {
        self.replacers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replacers.is_empty()
    }

    /// Apply every recorded replacement, in declaration order, to `text`.
    pub fn expand(&self, text: &str) -> String {
        expand(&self.replacers, text)
    }

    /// Produce a new body with every pattern-bearing field expanded.
    pub fn resolve(&self, body: &GrammarBody) -> GrammarBody {
        body.map_patterns(&mut |_, pattern| self.expand(pattern))
    }
}

fn expand(replacers: &[Replacer], text: &str) -> String {
    let mut result = text.to_owned();
    for replacer in replacers {
        if let Cow::Owned(replaced) = replacer
            .placeholder
            .replace_all(&result, NoExpand(&replacer.replacement))
        {
            result = replaced;
        }
    }
    result
}

/// A placeholder still present in a resolved grammar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPlaceholder {
    /// Rule location, e.g. `repository/keywords`
    pub path: String,
    pub field: PatternField,
    /// Text between the braces
    pub name: String,
}

/// List every `{{...}}` token left in the pattern-bearing fields of `grammar`.
pub fn unresolved_placeholders(grammar: &ResolvedGrammar) -> Vec<UnresolvedPlaceholder> {
    let mut found = Vec::new();
    grammar.body().visit_patterns(&mut |path, field, pattern| {
        for captures in PLACEHOLDER.captures_iter(pattern) {
            found.push(UnresolvedPlaceholder {
                path: path.to_string(),
                field,
                name: captures[1].to_string(),
            });
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(entries: &[(&str, &str)]) -> VariableTable {
        entries
            .iter()
            .map(|(name, pattern)| (name.to_string(), pattern.to_string()))
            .collect()
    }

    #[test]
    fn test_later_variable_embeds_earlier_one() {
        let resolver = VariableResolver::new(&table(&[
            ("identifier", "[a-zA-Z_][a-zA-Z0-9_]*"),
            ("keyword", "if|then|{{identifier}}"),
        ]))
        .unwrap();
        assert_eq!(
            resolver.resolved("keyword"),
            Some("if|then|[a-zA-Z_][a-zA-Z0-9_]*")
        );
    }

    #[test]
    fn test_forward_reference_stays_verbatim_in_variable() {
        let resolver =
            VariableResolver::new(&table(&[("a", "x{{b}}"), ("b", "y")])).unwrap();
        assert_eq!(resolver.resolved("a"), Some("x{{b}}"));
        assert_eq!(resolver.resolved("b"), Some("y"));
    }

    #[test]
    fn test_forward_reference_in_rule_text_is_caught_by_later_replacer() {
        // `{{a}}` expands to `x{{b}}` first, and the `b` replacer runs afterwards.
        let resolver =
            VariableResolver::new(&table(&[("a", "x{{b}}"), ("b", "y")])).unwrap();
        assert_eq!(resolver.expand("{{a}}"), "xy");
    }

    #[test]
    fn test_placeholders_match_case_insensitively() {
        let resolver = VariableResolver::new(&table(&[("Identifier", "\\w+")])).unwrap();
        assert_eq!(resolver.expand("{{identifier}}|{{IDENTIFIER}}"), "\\w+|\\w+");
    }

    #[test]
    fn test_unknown_placeholder_is_left_alone() {
        let resolver = VariableResolver::new(&table(&[("a", "1")])).unwrap();
        assert_eq!(resolver.expand("{{a}}{{missing}}"), "1{{missing}}");
    }

    #[test]
    fn test_replacement_is_literal() {
        let resolver = VariableResolver::new(&table(&[("eol", "$0$1$")])).unwrap();
        assert_eq!(resolver.expand("a{{eol}}"), "a$0$1$");
    }

    #[test]
    fn test_variable_names_are_not_regex() {
        let resolver = VariableResolver::new(&table(&[("a.b", "dot")])).unwrap();
        assert_eq!(resolver.expand("{{a.b}} {{axb}}"), "dot {{axb}}");
    }

    #[test]
    fn test_empty_table_is_identity() {
        let resolver = VariableResolver::new(&VariableTable::new()).unwrap();
        assert!(resolver.is_empty());
        assert_eq!(resolver.expand("{{x}}"), "{{x}}");
    }
}
