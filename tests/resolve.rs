//! Variable resolution over whole grammar documents

mod common;

use fgl_grammars::grammar::{
    unresolved_placeholders, GrammarError, GrammarLoader, OutputFormat, PatternField, RawGrammar,
    ResolvedGrammar, RuleKind, VariableResolver, VariableTable,
};
use proptest::prelude::*;
use rstest::rstest;

fn load_keywords() -> ResolvedGrammar {
    GrammarLoader::new()
        .load_file(common::fixture("keywords.YAML-tmLanguage"))
        .unwrap()
}

fn match_pattern(grammar: &ResolvedGrammar, name: &str) -> String {
    match &grammar.rule(name).unwrap().kind {
        RuleKind::Match { pattern } => pattern.clone(),
        other => panic!("expected a match rule, found {other:?}"),
    }
}

#[test]
fn test_keyword_embeds_identifier() {
    let grammar = load_keywords();
    let keywords = match_pattern(&grammar, "keywords");
    assert_eq!(keywords, r"\b(?:if|then|[a-zA-Z_][a-zA-Z0-9_]*)\b");
    assert!(!keywords.contains("{{"));
}

#[test]
fn test_region_fields_and_captures_are_resolved() {
    let grammar = load_keywords();
    let blocks = grammar.rule("blocks").unwrap();
    match &blocks.kind {
        RuleKind::BeginEnd { begin, end, .. } => {
            // `statement` forward-references `later`; the later replacer still reaches
            // it in rule text.
            assert_eq!(begin, r"(?:if|then|[a-zA-Z_][a-zA-Z0-9_]*)\s+end");
            assert_eq!(
                end.as_deref(),
                Some(r"end\s+if|then|[a-zA-Z_][a-zA-Z0-9_]*")
            );
        }
        other => panic!("expected a region rule, found {other:?}"),
    }

    let captures = blocks.to_value();
    let capture = &captures["beginCaptures"]["0"]["match"];
    assert_eq!(capture.as_str(), Some("[a-zA-Z_][a-zA-Z0-9_]*"));
}

#[test]
fn test_unknown_placeholder_is_reported_not_rejected() {
    let grammar = load_keywords();
    let unresolved = unresolved_placeholders(&grammar);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].path, "repository/blocks/patterns/1");
    assert_eq!(unresolved[0].field, PatternField::Match);
    assert_eq!(unresolved[0].name, "undeclared");
}

#[test]
fn test_output_drops_variable_table() {
    let grammar = load_keywords();
    let json = String::from_utf8(grammar.encode(OutputFormat::Json).unwrap()).unwrap();
    assert!(!json.contains("\"variables\""));
    assert!(json.contains("\"scopeName\": \"source.4gl\""));

    let plist = String::from_utf8(grammar.encode(OutputFormat::Plist).unwrap()).unwrap();
    assert!(plist.contains("<key>scopeName</key>"));
    assert!(!plist.contains("<key>variables</key>"));
}

#[test]
fn test_variable_resolution_is_order_sensitive() {
    let raw = RawGrammar::from_value(
        serde_yaml::from_str(
            "variables:\n  statement: '{{keyword}} x'\n  keyword: 'if'\n",
        )
        .unwrap(),
    )
    .unwrap();
    let resolver = VariableResolver::new(&raw.variables).unwrap();
    assert_eq!(resolver.resolved("statement"), Some("{{keyword}} x"));
}

#[rstest]
#[case("{{keyword}}")]
#[case("{{KEYWORD}}")]
#[case("{{Keyword}}")]
fn test_placeholder_names_ignore_case(#[case] text: &str) {
    let table: VariableTable = [("keyword".to_string(), "if|then".to_string())]
        .into_iter()
        .collect();
    let resolver = VariableResolver::new(&table).unwrap();
    assert_eq!(resolver.expand(text), "if|then");
}

#[rstest]
#[case("variables: not a table\n")]
#[case("- not\n- a grammar\n")]
#[case("variables:\n  keyword: [if, then]\n")]
#[case("patterns: [unclosed\n")]
fn test_malformed_documents(#[case] text: &str) {
    let err = GrammarLoader::new().load_str("inline", text).unwrap_err();
    assert!(
        matches!(err, GrammarError::Malformed { .. }),
        "unexpected error: {err}"
    );
}

const STRAY_FIELDS: &str = "variables:\n  id: '[a-z]+'\nrepository:\n  r1: {include: '#x', match: '{{id}}'}\n  r2: {begin: '{{id}}', end: e, match: '{{id}}'}\n  r3: {end: '{{id}}'}\n";

#[test]
fn test_pattern_fields_beside_include_or_begin_are_resolved() {
    let grammar = GrammarLoader::new().load_str("inline", STRAY_FIELDS).unwrap();
    let yaml = grammar.to_yaml_string().unwrap();
    assert!(!yaml.contains("{{id}}"), "placeholder left in output:\n{yaml}");

    let value = grammar.to_value();
    assert_eq!(value["repository"]["r1"]["match"].as_str(), Some("[a-z]+"));
    assert_eq!(value["repository"]["r1"]["include"].as_str(), Some("#x"));
    assert_eq!(value["repository"]["r2"]["match"].as_str(), Some("[a-z]+"));
    assert_eq!(value["repository"]["r2"]["begin"].as_str(), Some("[a-z]+"));
    assert_eq!(value["repository"]["r3"]["end"].as_str(), Some("[a-z]+"));
}

#[test]
fn test_unknown_placeholder_beside_include_is_reported() {
    let text = STRAY_FIELDS.replace("'#x', match: '{{id}}'", "'#x', match: '{{missing}}'");
    let grammar = GrammarLoader::new().load_str("inline", &text).unwrap();
    let unresolved = unresolved_placeholders(&grammar);
    assert_eq!(unresolved.len(), 1);
    assert_eq!(unresolved[0].path, "repository/r1");
    assert_eq!(unresolved[0].field, PatternField::Match);
    assert_eq!(unresolved[0].name, "missing");
}

#[test]
fn test_entries_that_are_not_rules_are_carried_through() {
    let grammar = GrammarLoader::new()
        .load_str(
            "inline",
            "variables:\n  d: '[0-9]'\nrepository:\n  keywords: 1\n  other:\n    patterns: ['x', {match: '{{d}}'}]\n",
        )
        .unwrap();
    let value = grammar.to_value();
    assert_eq!(value["repository"]["keywords"].as_u64(), Some(1));
    assert_eq!(value["repository"]["other"]["patterns"][0].as_str(), Some("x"));
    assert_eq!(
        value["repository"]["other"]["patterns"][1]["match"].as_str(),
        Some("[0-9]")
    );
}

#[test]
fn test_variable_hook_rewrites_table_before_resolution() {
    let grammar = GrammarLoader::new()
        .with_variable_hook(|mut table| {
            table.insert("identifier".to_string(), "[A-Z]+".to_string());
            table
        })
        .load_file(common::fixture("keywords.YAML-tmLanguage"))
        .unwrap();
    assert_eq!(
        match_pattern(&grammar, "keywords"),
        r"\b(?:if|then|[A-Z]+)\b"
    );
}

fn grammar_text(variables: &[(String, String)], rule: &str) -> String {
    let mut text = String::from("scopeName: source.4gl\nvariables:\n");
    for (name, pattern) in variables {
        text.push_str(&format!("  {name}: '{pattern}'\n"));
    }
    text.push_str(&format!("repository:\n  rule:\n    match: '{rule}'\n"));
    text
}

fn variable_table() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-z]{1,6}", "[a-z|()]{0,8}"), 0..6).prop_map(|entries| {
        let mut seen = std::collections::HashSet::new();
        entries
            .into_iter()
            // YAML reads these back as non-string keys
            .filter(|(name, _)| !matches!(name.as_str(), "null" | "true" | "false"))
            .filter(|(name, _)| seen.insert(name.clone()))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_resolution_is_idempotent(
        variables in variable_table(),
        rule in "[a-z|]{0,6}",
        names in prop::collection::vec("[a-z]{1,6}", 0..4),
    ) {
        let mut rule = rule;
        for name in &names {
            rule.push_str(&format!("{{{{{name}}}}}"));
        }
        let text = grammar_text(&variables, &rule);
        let loader = GrammarLoader::new();
        let once = loader.load_str("prop", &text).unwrap();

        // Feeding the output back with the same variables changes nothing.
        let again = format!("{}variables:\n{}", once.to_yaml_string().unwrap(),
            variables.iter().map(|(n, p)| format!("  {n}: '{p}'\n")).collect::<String>());
        let twice = loader.load_str("prop", &again).unwrap();
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_resolution_is_deterministic(variables in variable_table(), rule in "[a-z|{}]{0,12}") {
        let text = grammar_text(&variables, &rule);
        let loader = GrammarLoader::new();
        let first = loader.load_str("prop", &text).unwrap();
        let second = loader.load_str("prop", &text).unwrap();
        prop_assert_eq!(first.to_yaml_string().unwrap(), second.to_yaml_string().unwrap());
    }
}
