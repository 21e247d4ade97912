//! Typed rule tree
//!
//! A TextMate-style grammar is a tree of rule mappings. Rather than walking arbitrary
//! YAML, every rule is classified once into a closed set of kinds, and each kind names
//! the fields that hold matchable pattern text:
//!
//! ```text
//! Match      match
//! BeginEnd   begin, end, while
//! Include    (none)
//! Container  (none)
//! Opaque     (none)
//! ```
//!
//! Pattern text a kind does not own (`match` next to `include` or `begin`, `end`
//! without `begin`) is kept in `extra_patterns`. It is still rewritten and visited
//! like any other pattern field, since editors disagree on which field wins.
//!
//! Fields that hold nested rules (`patterns`, `repository` and the four capture maps)
//! are typed as well, so a traversal reaches every rule without guessing. Any other
//! field is an opaque attribute: carried through untouched, in its original order.
//! A pattern-bearing key whose value is not a string is treated as an attribute too,
//! and so is a rule map with keys that are neither strings nor numbers. An entry in
//! a rule position that is not a mapping at all becomes an `Opaque` rule.

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};
use std::fmt;
use thiserror::Error;

/// Ordered map of named rules (`repository` at grammar or rule level)
pub type Repository = IndexMap<String, Rule>;

/// Ordered map of capture group index to rule
pub type Captures = IndexMap<String, Rule>;

/// A rule field whose string value is matched against input text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternField {
    Match,
    Begin,
    End,
    While,
}

impl PatternField {
    pub fn key(self) -> &'static str {
        match self {
            PatternField::Match => "match",
            PatternField::Begin => "begin",
            PatternField::End => "end",
            PatternField::While => "while",
        }
    }
}

impl fmt::Display for PatternField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// A rule field holding a map of capture rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureField {
    Captures,
    BeginCaptures,
    EndCaptures,
    WhileCaptures,
}

impl CaptureField {
    pub fn key(self) -> &'static str {
        match self {
            CaptureField::Captures => "captures",
            CaptureField::BeginCaptures => "beginCaptures",
            CaptureField::EndCaptures => "endCaptures",
            CaptureField::WhileCaptures => "whileCaptures",
        }
    }
}

/// Location of a rule inside the grammar, e.g. `repository/strings/patterns/0`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RulePath(Vec<String>);

impl RulePath {
    pub fn root() -> Self {
        RulePath(Vec::new())
    }

    pub fn child(&self, segment: impl fmt::Display) -> RulePath {
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        RulePath(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for RulePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("<root>")
        } else {
            f.write_str(&self.0.join("/"))
        }
    }
}

/// A document shape that cannot be read as a grammar
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {reason}")]
pub struct ShapeError {
    pub path: RulePath,
    pub reason: String,
}

impl ShapeError {
    pub(crate) fn new(path: &RulePath, reason: impl Into<String>) -> Self {
        ShapeError {
            path: path.clone(),
            reason: reason.into(),
        }
    }
}

/// What a rule matches, with its pattern-bearing fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleKind {
    /// Single regex match (`match`)
    Match { pattern: String },
    /// Region rule (`begin` + `end`, or `begin` + `while`)
    BeginEnd {
        begin: String,
        end: Option<String>,
        while_pattern: Option<String>,
    },
    /// Reference to another rule (`include`)
    Include { target: String },
    /// Pure grouping of nested rules
    Container,
    /// A value in a rule position that is not a mapping, emitted as it was read
    Opaque(Value),
}

impl RuleKind {
    /// The pattern-bearing fields of this kind, in field order
    pub fn patterns(&self) -> Vec<(PatternField, &str)> {
        match self {
            RuleKind::Match { pattern } => vec![(PatternField::Match, pattern.as_str())],
            RuleKind::BeginEnd {
                begin,
                end,
                while_pattern,
            } => {
                let mut fields = vec![(PatternField::Begin, begin.as_str())];
                if let Some(end) = end {
                    fields.push((PatternField::End, end.as_str()));
                }
                if let Some(while_pattern) = while_pattern {
                    fields.push((PatternField::While, while_pattern.as_str()));
                }
                fields
            }
            RuleKind::Include { .. } | RuleKind::Container | RuleKind::Opaque(_) => Vec::new(),
        }
    }

    fn map_patterns<F>(&self, f: &mut F) -> RuleKind
    where
        F: FnMut(PatternField, &str) -> String,
    {
        match self {
            RuleKind::Match { pattern } => RuleKind::Match {
                pattern: f(PatternField::Match, pattern),
            },
            RuleKind::BeginEnd {
                begin,
                end,
                while_pattern,
            } => RuleKind::BeginEnd {
                begin: f(PatternField::Begin, begin),
                end: end.as_deref().map(|end| f(PatternField::End, end)),
                while_pattern: while_pattern
                    .as_deref()
                    .map(|while_pattern| f(PatternField::While, while_pattern)),
            },
            RuleKind::Include { target } => RuleKind::Include {
                target: target.clone(),
            },
            RuleKind::Container => RuleKind::Container,
            RuleKind::Opaque(value) => RuleKind::Opaque(value.clone()),
        }
    }
}

/// Rule-bearing fields of a rule
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NestedRules {
    pub patterns: Option<Vec<Rule>>,
    pub repository: Option<Repository>,
    /// Capture maps in the order they appeared
    pub captures: IndexMap<CaptureField, Captures>,
}

impl NestedRules {
    fn map_patterns<F>(&self, f: &mut F) -> NestedRules
    where
        F: FnMut(PatternField, &str) -> String,
    {
        NestedRules {
            patterns: self
                .patterns
                .as_ref()
                .map(|rules| rules.iter().map(|rule| rule.map_patterns(f)).collect()),
            repository: self.repository.as_ref().map(|repository| map_rule_map(repository, f)),
            captures: self
                .captures
                .iter()
                .map(|(field, rules)| (*field, map_rule_map(rules, f)))
                .collect(),
        }
    }

    fn visit_patterns<F>(&self, path: &RulePath, f: &mut F)
    where
        F: FnMut(&RulePath, PatternField, &str),
    {
        for (field, rules) in &self.captures {
            let field_path = path.child(field.key());
            for (index, rule) in rules {
                rule.visit_patterns(&field_path.child(index), f);
            }
        }
        if let Some(rules) = &self.patterns {
            let patterns_path = path.child("patterns");
            for (index, rule) in rules.iter().enumerate() {
                rule.visit_patterns(&patterns_path.child(index), f);
            }
        }
        if let Some(repository) = &self.repository {
            let repository_path = path.child("repository");
            for (name, rule) in repository {
                rule.visit_patterns(&repository_path.child(name), f);
            }
        }
    }

    fn write_into(&self, mapping: &mut Mapping) {
        for (field, rules) in &self.captures {
            mapping.insert(key(field.key()), rule_map_to_value(rules));
        }
        if let Some(rules) = &self.patterns {
            let items = rules.iter().map(Rule::to_value).collect();
            mapping.insert(key("patterns"), Value::Sequence(items));
        }
        if let Some(repository) = &self.repository {
            mapping.insert(key("repository"), rule_map_to_value(repository));
        }
    }
}

/// One grammar rule
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub kind: RuleKind,
    /// Pattern fields the kind has no slot for, in field order
    pub extra_patterns: IndexMap<PatternField, String>,
    pub nested: NestedRules,
    /// Every other field (`name`, `contentName`, `comment`, ...), untouched
    pub attributes: Mapping,
}

impl Rule {
    /// Classify a rule value. Anything but a mapping is kept as an opaque rule.
    pub fn from_value(value: Value) -> Rule {
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            other => return Rule::opaque(other),
        };

        let mut slots = PatternSlots::default();
        let mut include = None;
        let mut nested = NestedRules::default();
        let mut attributes = Mapping::new();

        for (key, value) in mapping {
            let name = match key {
                Value::String(name) => name,
                key => {
                    attributes.insert(key, value);
                    continue;
                }
            };
            match (FieldRole::of(&name), value) {
                (FieldRole::Pattern(field), Value::String(text)) => slots.set(field, text),
                (FieldRole::Include, Value::String(target)) => include = Some(target),
                (FieldRole::Patterns, Value::Sequence(items)) => {
                    nested.patterns = Some(parse_rules(items));
                }
                (FieldRole::Repository, Value::Mapping(entries)) => match parse_rule_map(entries) {
                    Ok(rules) => nested.repository = Some(rules),
                    Err(entries) => {
                        attributes.insert(Value::String(name), Value::Mapping(entries));
                    }
                },
                (FieldRole::Captures(field), Value::Mapping(entries)) => {
                    match parse_rule_map(entries) {
                        Ok(rules) => {
                            nested.captures.insert(field, rules);
                        }
                        Err(entries) => {
                            attributes.insert(Value::String(name), Value::Mapping(entries));
                        }
                    }
                }
                (_, value) => {
                    attributes.insert(Value::String(name), value);
                }
            }
        }

        let kind = if let Some(target) = include {
            RuleKind::Include { target }
        } else if let Some(begin) = slots.begin.take() {
            RuleKind::BeginEnd {
                begin,
                end: slots.end.take(),
                while_pattern: slots.while_pattern.take(),
            }
        } else if let Some(pattern) = slots.match_pattern.take() {
            RuleKind::Match { pattern }
        } else {
            RuleKind::Container
        };

        Rule {
            kind,
            extra_patterns: slots.into_leftovers().collect(),
            nested,
            attributes,
        }
    }

    fn opaque(value: Value) -> Rule {
        Rule {
            kind: RuleKind::Opaque(value),
            extra_patterns: IndexMap::new(),
            nested: NestedRules::default(),
            attributes: Mapping::new(),
        }
    }

    /// Rebuild the rule mapping.
    ///
    /// Attributes come first in their original order, followed by pattern fields,
    /// `include`, extra pattern fields, capture maps, `patterns` and `repository`.
    /// An opaque rule is its original value.
    pub fn to_value(&self) -> Value {
        if let RuleKind::Opaque(value) = &self.kind {
            return value.clone();
        }
        let mut mapping = self.attributes.clone();
        for (field, text) in self.kind.patterns() {
            mapping.insert(key(field.key()), Value::String(text.to_owned()));
        }
        if let RuleKind::Include { target } = &self.kind {
            mapping.insert(key("include"), Value::String(target.clone()));
        }
        for (field, text) in &self.extra_patterns {
            mapping.insert(key(field.key()), Value::String(text.clone()));
        }
        self.nested.write_into(&mut mapping);
        Value::Mapping(mapping)
    }

    /// Produce a new rule with every pattern-bearing field rewritten by `f`,
    /// recursing through all nested rules.
    pub fn map_patterns<F>(&self, f: &mut F) -> Rule
    where
        F: FnMut(PatternField, &str) -> String,
    {
        Rule {
            kind: self.kind.map_patterns(f),
            extra_patterns: self
                .extra_patterns
                .iter()
                .map(|(field, text)| (*field, f(*field, text)))
                .collect(),
            nested: self.nested.map_patterns(f),
            attributes: self.attributes.clone(),
        }
    }

    /// Call `f` for every pattern-bearing field of this rule and its nested rules.
    pub fn visit_patterns<F>(&self, path: &RulePath, f: &mut F)
    where
        F: FnMut(&RulePath, PatternField, &str),
    {
        for (field, text) in self.kind.patterns() {
            f(path, field, text);
        }
        for (field, text) in &self.extra_patterns {
            f(path, *field, text);
        }
        self.nested.visit_patterns(path, f);
    }

    /// The `name` attribute, if it is a string
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Copy)]
enum FieldRole {
    Pattern(PatternField),
    Include,
    Patterns,
    Repository,
    Captures(CaptureField),
    Attribute,
}

impl FieldRole {
    fn of(name: &str) -> FieldRole {
        match name {
            "match" => FieldRole::Pattern(PatternField::Match),
            "begin" => FieldRole::Pattern(PatternField::Begin),
            "end" => FieldRole::Pattern(PatternField::End),
            "while" => FieldRole::Pattern(PatternField::While),
            "include" => FieldRole::Include,
            "patterns" => FieldRole::Patterns,
            "repository" => FieldRole::Repository,
            "captures" => FieldRole::Captures(CaptureField::Captures),
            "beginCaptures" => FieldRole::Captures(CaptureField::BeginCaptures),
            "endCaptures" => FieldRole::Captures(CaptureField::EndCaptures),
            "whileCaptures" => FieldRole::Captures(CaptureField::WhileCaptures),
            _ => FieldRole::Attribute,
        }
    }
}

#[derive(Default)]
struct PatternSlots {
    match_pattern: Option<String>,
    begin: Option<String>,
    end: Option<String>,
    while_pattern: Option<String>,
}

impl PatternSlots {
    fn set(&mut self, field: PatternField, text: String) {
        let slot = match field {
            PatternField::Match => &mut self.match_pattern,
            PatternField::Begin => &mut self.begin,
            PatternField::End => &mut self.end,
            PatternField::While => &mut self.while_pattern,
        };
        *slot = Some(text);
    }

    fn into_leftovers(self) -> impl Iterator<Item = (PatternField, String)> {
        [
            (PatternField::Match, self.match_pattern),
            (PatternField::Begin, self.begin),
            (PatternField::End, self.end),
            (PatternField::While, self.while_pattern),
        ]
        .into_iter()
        .filter_map(|(field, text)| text.map(|text| (field, text)))
    }
}

pub(crate) fn parse_rules(items: Vec<Value>) -> Vec<Rule> {
    items.into_iter().map(Rule::from_value).collect()
}

/// Read a map of named rules, or hand the mapping back if a key cannot name a rule.
pub(crate) fn parse_rule_map(entries: Mapping) -> Result<IndexMap<String, Rule>, Mapping> {
    if !entries.keys().all(|name| rule_name(name).is_some()) {
        return Err(entries);
    }
    Ok(entries
        .into_iter()
        .filter_map(|(name, value)| rule_name(&name).map(|name| (name, Rule::from_value(value))))
        .collect())
}

// Capture maps are commonly keyed by bare integers.
fn rule_name(key: &Value) -> Option<String> {
    match key {
        Value::String(name) => Some(name.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn rule_map_to_value(rules: &IndexMap<String, Rule>) -> Value {
    let mut mapping = Mapping::with_capacity(rules.len());
    for (name, rule) in rules {
        mapping.insert(Value::String(name.clone()), rule.to_value());
    }
    Value::Mapping(mapping)
}

fn map_rule_map<F>(rules: &IndexMap<String, Rule>, f: &mut F) -> IndexMap<String, Rule>
where
    F: FnMut(PatternField, &str) -> String,
{
    rules
        .iter()
        .map(|(name, rule)| (name.clone(), rule.map_patterns(f)))
        .collect()
}

pub(crate) fn key(name: &str) -> Value {
    Value::String(name.to_owned())
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
