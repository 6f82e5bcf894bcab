//! Loading toolkit settings and wiring them into the generators.

use narrative_toolkit::core::config::{ConfigError, ToolkitConfig};
use narrative_toolkit::core::grammar::Grammar;
use narrative_toolkit::core::script::{Context, Script};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn fixture_config_loads() {
    let config = ToolkitConfig::load(std::path::Path::new("tests/fixtures/config.ron")).unwrap();
    assert_eq!(config.grammar.start_rule, "<start>");
    assert_eq!(config.grammar.max_iterations, 500);
    assert_eq!(config.markov.min_length, 4);
    assert_eq!(config.markov.max_length, 20);
    assert_eq!(config.markov.max_length_match, Some(3));
    assert_eq!(config.markov.start_tokens, None);
    assert_eq!(config.script.max_passes, 10);
    assert!(config.script.silent);
    assert_eq!(config.lexicon.limit, Some(5));
    assert_eq!(config.lexicon.min_distance, 1);
}

#[test]
fn missing_file_is_io_error() {
    let res = ToolkitConfig::load(std::path::Path::new("tests/fixtures/nope.ron"));
    assert!(matches!(res, Err(ConfigError::Io(_))));
}

#[test]
fn config_drives_generators() {
    let config = ToolkitConfig::from_ron("(grammar: (start_rule: \"<intro>\"), script: (max_passes: 1))").unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    let mut grammar = Grammar::new().with_options(config.grammar.clone());
    grammar.add_rule("<intro>", "Once upon a time").unwrap();
    assert_eq!(grammar.expand(&mut rng).unwrap(), "Once upon a time");

    // a single pass leaves the deferred symbol unresolved
    let mut script = Script::with_options(config.script.clone());
    let mut ctx: Context = vec![("a", "$b"), ("b", "done")].into_iter().collect();
    assert_eq!(script.evaluate("$a", &mut ctx, &mut rng).unwrap(), "($a=$b)");
}
