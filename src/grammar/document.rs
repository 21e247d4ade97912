//! Grammar documents before and after variable resolution
//!
//! A raw document is what authors write: grammar attributes, top-level `patterns`,
//! a `repository`, and a `variables` table of named pattern fragments. A resolved
//! grammar has the same rules with every placeholder substituted and no variable
//! table at all.

use super::error::GrammarError;
use super::rule::{
    describe, key, parse_rule_map, parse_rules, rule_map_to_value, PatternField, Repository, Rule,
    RulePath, ShapeError,
};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::str::FromStr;

/// Named pattern fragments in declaration order
pub type VariableTable = IndexMap<String, String>;

/// Grammar attributes and rules, shared by raw and resolved documents
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GrammarBody {
    /// Top-level fields other than rules (`name`, `scopeName`, `fileTypes`, ...)
    pub attributes: Mapping,
    /// `None` when the document has no `patterns` key
    pub patterns: Option<Vec<Rule>>,
    pub repository: Option<Repository>,
}

impl GrammarBody {
    /// Produce a new body with every pattern-bearing field rewritten by `f`.
    pub fn map_patterns<F>(&self, f: &mut F) -> GrammarBody
    where
        F: FnMut(PatternField, &str) -> String,
    {
        GrammarBody {
            attributes: self.attributes.clone(),
            patterns: self
                .patterns
                .as_ref()
                .map(|rules| rules.iter().map(|rule| rule.map_patterns(f)).collect()),
            repository: self.repository.as_ref().map(|repository| {
                repository
                    .iter()
                    .map(|(name, rule)| (name.clone(), rule.map_patterns(f)))
                    .collect()
            }),
        }
    }

    /// Call `f` for every pattern-bearing field, top-level patterns first.
    pub fn visit_patterns<F>(&self, f: &mut F)
    where
        F: FnMut(&RulePath, PatternField, &str),
    {
        let patterns_path = RulePath::root().child("patterns");
        for (index, rule) in self.patterns.iter().flatten().enumerate() {
            rule.visit_patterns(&patterns_path.child(index), f);
        }
        let repository_path = RulePath::root().child("repository");
        for (name, rule) in self.repository.iter().flatten() {
            rule.visit_patterns(&repository_path.child(name), f);
        }
    }

    fn to_value(&self) -> Value {
        let mut mapping = self.attributes.clone();
        if let Some(patterns) = &self.patterns {
            let items = patterns.iter().map(Rule::to_value).collect();
            mapping.insert(key("patterns"), Value::Sequence(items));
        }
        if let Some(repository) = &self.repository {
            mapping.insert(key("repository"), rule_map_to_value(repository));
        }
        Value::Mapping(mapping)
    }
}

/// A grammar as written, variables still pending
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawGrammar {
    pub body: GrammarBody,
    pub variables: VariableTable,
}

impl RawGrammar {
    /// Read a raw grammar out of a deserialized document tree.
    ///
    /// Only the root and the `variables` table are checked. Rules are taken as they
    /// come: an entry that does not look like a rule is carried through untouched.
    pub fn from_value(value: Value) -> Result<RawGrammar, ShapeError> {
        let root = RulePath::root();
        let mapping = match value {
            Value::Mapping(mapping) => mapping,
            other => {
                return Err(ShapeError::new(
                    &root,
                    format!("expected a grammar mapping, found {}", describe(&other)),
                ))
            }
        };

        let mut grammar = RawGrammar::default();
        for (name, value) in mapping {
            let section = name.as_str().map(str::to_owned);
            match (section.as_deref(), value) {
                (Some("variables"), Value::Mapping(entries)) => {
                    grammar.variables = parse_variables(entries, &root.child("variables"))?;
                }
                (Some("variables"), Value::Null) => {}
                (Some("variables"), other) => {
                    return Err(ShapeError::new(
                        &root.child("variables"),
                        format!("expected a variable table, found {}", describe(&other)),
                    ))
                }
                (Some("patterns"), Value::Sequence(items)) => {
                    grammar.body.patterns = Some(parse_rules(items));
                }
                (Some("repository"), Value::Mapping(entries)) => match parse_rule_map(entries) {
                    Ok(rules) => grammar.body.repository = Some(rules),
                    Err(entries) => {
                        grammar.body.attributes.insert(name, Value::Mapping(entries));
                    }
                },
                (_, value) => {
                    grammar.body.attributes.insert(name, value);
                }
            }
        }
        Ok(grammar)
    }
}

fn parse_variables(entries: Mapping, path: &RulePath) -> Result<VariableTable, ShapeError> {
    let mut variables = VariableTable::with_capacity(entries.len());
    for (name, value) in entries {
        match (name, value) {
            (Value::String(name), Value::String(pattern)) => {
                variables.insert(name, pattern);
            }
            (Value::String(name), other) => {
                return Err(ShapeError::new(
                    &path.child(&name),
                    format!("variable must be a string, found {}", describe(&other)),
                ))
            }
            (other, _) => {
                return Err(ShapeError::new(
                    path,
                    format!("variable name must be a string, found {}", describe(&other)),
                ))
            }
        }
    }
    Ok(variables)
}

/// A self-contained grammar with every placeholder substituted
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGrammar {
    body: GrammarBody,
}

impl ResolvedGrammar {
    pub(crate) fn from_body(body: GrammarBody) -> Self {
        ResolvedGrammar { body }
    }

    pub fn body(&self) -> &GrammarBody {
        &self.body
    }

    /// Top-level rules, empty when the grammar has none
    pub fn patterns(&self) -> &[Rule] {
        self.body.patterns.as_deref().unwrap_or(&[])
    }

    pub fn repository(&self) -> Option<&Repository> {
        self.body.repository.as_ref()
    }

    /// A named rule of the grammar-level repository
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.body.repository.as_ref()?.get(name)
    }

    /// The grammar's `scopeName` attribute
    pub fn scope_name(&self) -> Option<&str> {
        self.body.attributes.get("scopeName").and_then(Value::as_str)
    }

    /// The grammar as a plain document tree (no `variables` key)
    pub fn to_value(&self) -> Value {
        self.body.to_value()
    }

    pub fn to_yaml_string(&self) -> Result<String, GrammarError> {
        serde_yaml::to_string(&self.to_value()).map_err(|e| GrammarError::Serialize(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, GrammarError> {
        serde_json::to_string_pretty(&self.to_value())
            .map_err(|e| GrammarError::Serialize(e.to_string()))
    }

    /// Encode as an XML property list, the classic `.tmLanguage` format
    pub fn to_plist_bytes(&self) -> Result<Vec<u8>, GrammarError> {
        let plist = to_plist(&self.to_value(), &RulePath::root())?;
        let mut bytes = Vec::new();
        plist
            .to_writer_xml(&mut bytes)
            .map_err(|e| GrammarError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Encode in the requested output format
    pub fn encode(&self, format: OutputFormat) -> Result<Vec<u8>, GrammarError> {
        match format {
            OutputFormat::Plist => self.to_plist_bytes(),
            OutputFormat::Json => self.to_json_string().map(String::into_bytes),
        }
    }
}

fn to_plist(value: &Value, path: &RulePath) -> Result<plist::Value, GrammarError> {
    let converted = match value {
        Value::Bool(flag) => plist::Value::Boolean(*flag),
        Value::String(text) => plist::Value::String(text.clone()),
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                plist::Value::Integer(int.into())
            } else if let Some(int) = number.as_u64() {
                plist::Value::Integer(int.into())
            } else {
                plist::Value::Real(number.as_f64().unwrap_or(f64::NAN))
            }
        }
        Value::Sequence(items) => plist::Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| to_plist(item, &path.child(index)))
                .collect::<Result<_, _>>()?,
        ),
        Value::Mapping(entries) => {
            let mut dict = plist::Dictionary::new();
            for (name, item) in entries {
                let name = match name {
                    Value::String(name) => name.clone(),
                    Value::Number(number) => number.to_string(),
                    other => {
                        return Err(GrammarError::Serialize(format!(
                            "{path}: property list keys must be strings, found {}",
                            describe(other)
                        )))
                    }
                };
                let item = to_plist(item, &path.child(&name))?;
                dict.insert(name, item);
            }
            plist::Value::Dictionary(dict)
        }
        Value::Tagged(tagged) => to_plist(&tagged.value, path)?,
        Value::Null => {
            return Err(GrammarError::Serialize(format!(
                "{path}: property lists cannot hold null values"
            )))
        }
    };
    Ok(converted)
}

/// Serialization format for built grammars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// XML property list (`.tmLanguage`)
    Plist,
    /// Pretty-printed JSON (`.tmLanguage.json`)
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "plist" => Ok(OutputFormat::Plist),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown output format '{other}' (expected plist or json)")),
        }
    }
}
