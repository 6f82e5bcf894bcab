//! Grammar loading and expansion integration tests.

use narrative_toolkit::core::grammar::{Grammar, GrammarError, GrammarOptions};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn load_fixture() -> Grammar {
    let path = std::path::Path::new("tests/fixtures/grammar.json");
    let contents = std::fs::read_to_string(path).unwrap();
    Grammar::from_json(&contents).unwrap()
}

#[test]
fn fixture_grammar_loads() {
    let grammar = load_fixture();
    let expected_rules = ["<start>", "<greeting>", "<name>", "<adj>", "<noun>", "<verb>"];
    for rule_name in &expected_rules {
        assert!(grammar.has_rule(rule_name), "Missing rule: {}", rule_name);
    }

    let names: Vec<&str> = grammar.rules().map(|r| r.name.as_str()).collect();
    assert_eq!(names, expected_rules, "rules keep source order");

    let name = grammar.get_rule("<name>").unwrap();
    let bo = name.productions.iter().find(|p| p.text == "Bo").unwrap();
    assert_eq!(bo.weight, 2.0);
}

#[test]
fn expansions_leave_no_rule_names() {
    let grammar = load_fixture();
    let mut rng = StdRng::seed_from_u64(11);

    for _ in 0..200 {
        let text = grammar.expand(&mut rng).unwrap();
        for rule in grammar.rules() {
            assert!(!text.contains(&rule.name), "'{}' left in '{}'", rule.name, text);
        }
        assert!(text.ends_with('.'), "unexpected ending: {}", text);
    }
}

#[test]
fn weighted_alternatives_follow_their_weights() {
    let grammar = Grammar::from_map(vec![("<start>", "a[1] | b[3]")]).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    let samples = 10_000;
    let bs = (0..samples)
        .filter(|_| grammar.expand(&mut rng).unwrap() == "b")
        .count();
    let share = bs as f64 / samples as f64;
    assert!((share - 0.75).abs() < 0.05, "b chosen {:.3} of the time", share);
}

#[test]
fn self_referencing_rule_stops_at_cap() {
    let mut grammar = Grammar::new().with_options(GrammarOptions {
        max_iterations: 25,
        ..GrammarOptions::default()
    });
    grammar.add_rule("<start>", "x <start>").unwrap();

    let mut rng = StdRng::seed_from_u64(1);
    let text = grammar.expand(&mut rng).unwrap();
    assert_eq!(text.matches('x').count(), 25);
    assert!(text.ends_with("<start>"));
}

#[test]
fn malformed_grammars_are_rejected() {
    assert!(matches!(Grammar::from_json("{\"<start>\": "), Err(GrammarError::InvalidJson(_))));
    assert!(matches!(Grammar::from_json("[\"a\"]"), Err(GrammarError::InvalidRuleSet(_))));
    assert!(matches!(
        Grammar::from_json("{\"<start>\": 3}"),
        Err(GrammarError::InvalidRuleSet(_))
    ));

    let err = Grammar::from_json("{\"<start>\": \"").unwrap_err();
    assert!(err.to_string().contains("validate"));
}

#[test]
fn empty_and_missing_rules() {
    let mut rng = StdRng::seed_from_u64(1);
    assert!(matches!(Grammar::new().expand(&mut rng), Err(GrammarError::NoRules)));

    let grammar = load_fixture();
    assert!(matches!(
        grammar.expand_from("<nope>", &mut rng),
        Err(GrammarError::RuleNotFound(name)) if name == "<nope>"
    ));
    let verb = grammar.expand_from("<verb>", &mut rng).unwrap();
    assert!(["jumps", "sleeps", "runs away"].contains(&verb.as_str()));
}
