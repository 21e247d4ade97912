//! Shared test support: fixture paths and a small scripted scanner
//!
//! The crate leaves scanning to a pluggable backend. The backend here is just enough
//! of one to drive the baseline engine: it takes the top-level `match` and
//! `begin`/`end` rules of a resolved grammar, tries them in order at each position of
//! a line and scopes each hit as `[scopeName, name]`. Runs of characters no rule
//! matches become root-scoped tokens, whitespace is skipped. An open `begin`/`end`
//! region is carried to the next line in the tokenizer state.

#![allow(dead_code)]

use fgl_grammars::baseline::{GrammarRegistry, LoadedGrammar};
use fgl_grammars::grammar::{GrammarKind, GrammarLoader, ResolvedGrammar, RuleKind};
use fgl_grammars::scan::{LineTokenizer, LineTokens, ScanError, ScannerBackend, Token};
use fgl_grammars::settings::{Loader, Settings};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

pub fn source_fixture() -> PathBuf {
    fixture("4GL.YAML-tmLanguage")
}

pub fn form_fixture() -> PathBuf {
    fixture("PER.YAML-tmLanguage")
}

/// Defaults with both grammar sources pointed at the given files
pub fn settings_with(source: &Path, form: &Path) -> Settings {
    Loader::new()
        .set_override("grammars.source.source", source.display().to_string())
        .unwrap()
        .set_override("grammars.form.source", form.display().to_string())
        .unwrap()
        .build()
        .unwrap()
}

pub fn fixture_settings() -> Settings {
    settings_with(&source_fixture(), &form_fixture())
}

/// Registry over both fixture grammars, loaded the same way the suite loads them
pub async fn fixture_registry() -> GrammarRegistry<ScriptedTokenizer> {
    GrammarRegistry::load(&fixture_settings(), Arc::new(ScriptedBackend)).await
}

/// Registry over both fixture grammars, compiled synchronously
pub fn compiled_fixtures() -> GrammarRegistry<ScriptedTokenizer> {
    let compile = |kind: GrammarKind, path: PathBuf, file_name: &str| {
        let grammar = GrammarLoader::new().load_file(&path).unwrap();
        let tokenizer = ScriptedBackend.compile(kind, &grammar).unwrap();
        LoadedGrammar::new(kind, file_name, Arc::new(grammar), tokenizer)
    };
    GrammarRegistry::from_grammars(
        compile(GrammarKind::Source, source_fixture(), "4GL.tmLanguage"),
        compile(GrammarKind::Form, form_fixture(), "PER.tmLanguage"),
    )
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedBackend;

#[derive(Debug)]
enum ScriptedRule {
    Match { scope: String, pattern: Regex },
    Region { scope: String, begin: Regex, end: Regex },
}

impl ScriptedRule {
    fn scope(&self) -> &str {
        match self {
            ScriptedRule::Match { scope, .. } | ScriptedRule::Region { scope, .. } => scope,
        }
    }
}

#[derive(Debug)]
pub struct ScriptedTokenizer {
    root: String,
    rules: Vec<ScriptedRule>,
}

impl ScannerBackend for ScriptedBackend {
    type Tokenizer = ScriptedTokenizer;

    fn compile(
        &self,
        kind: GrammarKind,
        grammar: &ResolvedGrammar,
    ) -> Result<ScriptedTokenizer, ScanError> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ScanError::Compile {
                kind,
                reason: e.to_string(),
            })
        };

        let mut rules = Vec::new();
        for rule in grammar.patterns() {
            let Some(scope) = rule.name() else { continue };
            let scope = scope.to_string();
            match &rule.kind {
                RuleKind::Match { pattern } => rules.push(ScriptedRule::Match {
                    scope,
                    pattern: compile(pattern.as_str())?,
                }),
                RuleKind::BeginEnd {
                    begin,
                    end: Some(end),
                    ..
                } => rules.push(ScriptedRule::Region {
                    scope,
                    begin: compile(begin.as_str())?,
                    end: compile(end.as_str())?,
                }),
                _ => {}
            }
        }

        Ok(ScriptedTokenizer {
            root: grammar
                .scope_name()
                .unwrap_or(kind.scope_name())
                .to_string(),
            rules,
        })
    }
}

impl ScriptedTokenizer {
    fn token(&self, line: &str, start: usize, end: usize, scope: Option<&str>) -> Token {
        let chars = |byte: usize| line[..byte].chars().count();
        let mut scopes = vec![self.root.clone()];
        scopes.extend(scope.map(str::to_string));
        Token::new(chars(start), chars(end), scopes)
    }

    /// Rule matching exactly at `pos`, with the end of its match
    fn match_at(&self, line: &str, pos: usize) -> Option<(usize, usize)> {
        self.rules.iter().enumerate().find_map(|(index, rule)| {
            let regex = match rule {
                ScriptedRule::Match { pattern, .. } => pattern,
                ScriptedRule::Region { begin, .. } => begin,
            };
            regex
                .find_at(line, pos)
                .filter(|found| found.start() == pos && found.end() > pos)
                .map(|found| (index, found.end()))
        })
    }
}

impl LineTokenizer for ScriptedTokenizer {
    /// Index of the region rule still open at the end of the previous line
    type State = Option<usize>;

    fn start_state(&self) -> Option<usize> {
        None
    }

    fn tokenize_line(
        &self,
        state: &Option<usize>,
        line: &str,
    ) -> Result<LineTokens<Option<usize>>, ScanError> {
        let mut tokens = Vec::new();
        let mut open = *state;
        let mut pos = 0;
        let mut unmatched: Option<usize> = None;

        while pos <= line.len() {
            if let Some(index) = open {
                let ScriptedRule::Region { scope, end, .. } = &self.rules[index] else {
                    return Err(ScanError::Tokenizer(format!("rule {index} is not a region")));
                };
                match end.find_at(line, pos) {
                    Some(found) => {
                        tokens.push(self.token(line, pos, found.end(), Some(scope.as_str())));
                        pos = found.end();
                        open = None;
                    }
                    None => {
                        if pos < line.len() {
                            tokens.push(self.token(line, pos, line.len(), Some(scope.as_str())));
                        }
                        break;
                    }
                }
                continue;
            }

            let Some(ch) = line[pos..].chars().next() else {
                break;
            };
            let hit = (!ch.is_whitespace())
                .then(|| self.match_at(line, pos))
                .flatten();
            if ch.is_whitespace() || hit.is_some() {
                if let Some(start) = unmatched.take() {
                    tokens.push(self.token(line, start, pos, None));
                }
            }
            match hit {
                Some((index, end)) => {
                    let rule = &self.rules[index];
                    tokens.push(self.token(line, pos, end, Some(rule.scope())));
                    if matches!(rule, ScriptedRule::Region { .. }) {
                        open = Some(index);
                    }
                    pos = end;
                }
                None => {
                    if !ch.is_whitespace() && unmatched.is_none() {
                        unmatched = Some(pos);
                    }
                    pos += ch.len_utf8();
                }
            }
        }
        if let Some(start) = unmatched {
            tokens.push(self.token(line, start, line.len(), None));
        }

        Ok(LineTokens {
            tokens,
            state: open,
        })
    }
}
