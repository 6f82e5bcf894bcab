//! Lexicon queries over the fixture word table.

use narrative_toolkit::core::lexicon::{Lexicon, LexiconError, SearchOptions, SearchType};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn load_fixture() -> Lexicon {
    let contents = std::fs::read_to_string("tests/fixtures/lexicon.json").unwrap();
    Lexicon::from_json(&contents).unwrap()
}

#[test]
fn fixture_lexicon_loads() {
    let lex = load_fixture();
    assert_eq!(lex.size(), 22);
    assert!(lex.has_word("Garden"));
    assert!(!lex.has_word("zebra"));
}

#[test]
fn rhymes_and_alliterations() {
    let lex = load_fixture();
    let opts = SearchOptions::default();

    assert_eq!(lex.rhymes("cat", &opts).unwrap(), vec!["bat", "fat", "flat", "hat", "mat", "sat"]);
    assert_eq!(lex.rhymes("mother", &opts).unwrap(), vec!["brother"]);
    assert_eq!(lex.alliterations("brother", &opts).unwrap(), vec!["bat"]);

    assert!(lex.is_rhyme("cat", "hat").unwrap());
    assert!(!lex.is_rhyme("cat", "dog").unwrap());
    assert!(lex.is_alliteration("dog", "daughter").unwrap());

    let limited = SearchOptions {
        limit: Some(2),
        ..SearchOptions::default()
    };
    assert_eq!(lex.rhymes("cat", &limited).unwrap(), vec!["bat", "fat"]);
}

#[test]
fn similarity_queries() {
    let lex = load_fixture();
    let opts = SearchOptions::default();
    assert_eq!(lex.spells_like("cat", &opts).unwrap(), vec!["bat", "fat", "hat", "mat", "sat"]);

    let sounds = lex.sounds_like("cat", &opts).unwrap();
    assert!(sounds.contains(&"bat".to_string()));
    assert!(!sounds.contains(&"cat".to_string()));
}

#[test]
fn stress_search() {
    let lex = load_fixture();
    let opts = SearchOptions {
        search_type: SearchType::Stresses,
        ..SearchOptions::default()
    };
    let trochees = lex.search("10", &opts).unwrap();
    assert!(trochees.contains(&"garden".to_string()));
    assert!(trochees.contains(&"sister".to_string()));
    assert!(!trochees.contains(&"cat".to_string()));
}

#[test]
fn random_plural_noun() {
    let lex = load_fixture();
    let mut rng = StdRng::seed_from_u64(10);
    let opts = SearchOptions {
        pos: Some("nns".to_string()),
        ..SearchOptions::default()
    };
    for _ in 0..20 {
        let word = lex.random_word(&opts, &mut rng).unwrap();
        assert!(word.ends_with('s'), "{}", word);
        assert!(word.len() >= 5, "{}", word);
    }
}

#[test]
fn unloaded_lexicon() {
    let opts = SearchOptions::default();
    assert!(matches!(Lexicon::new().rhymes("cat", &opts), Err(LexiconError::NoLexicon)));

    let lenient = Lexicon::new().fatal(false);
    assert!(lenient.rhymes("cat", &opts).unwrap().is_empty());
    assert_eq!(lenient.size(), 0);
}
