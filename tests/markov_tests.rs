//! Markov model training and generation against a small corpus.

use narrative_toolkit::core::markov::{GenerateOptions, Markov, MarkovError};
use narrative_toolkit::core::tokenizer::{SimpleTokenizer, Tokenizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use regex::Regex;

fn corpus_model(n: usize) -> Markov {
    let path = std::path::Path::new("tests/fixtures/corpus.txt");
    let contents = std::fs::read_to_string(path).unwrap();
    let mut model = Markov::new(n).unwrap();
    model.load_text(&contents);
    model
}

fn copies_run(input: &[String], tokens: &[String], len: usize) -> Option<Vec<String>> {
    tokens
        .windows(len)
        .find(|w| input.windows(len).any(|i| i == *w))
        .map(|w| w.to_vec())
}

#[test]
fn corpus_loads() {
    let model = corpus_model(3);
    assert_eq!(model.n(), 3);
    assert!(model.size() > 100);
    assert_eq!(model.size(), model.input().len());

    let after_sat = model.probabilities(&["sat"]);
    assert_eq!(after_sat.len(), 1);
    assert!((after_sat["on"] - 1.0).abs() < 1e-9);
    assert!(model.to_string().starts_with("Root {"));
}

#[test]
fn generated_sentences_are_well_formed_and_distinct() {
    let model = corpus_model(2);
    let mut rng = StdRng::seed_from_u64(5);
    let opts = GenerateOptions {
        min_length: 3,
        ..GenerateOptions::default()
    };
    let shape = Regex::new(r"^[A-Z].*[.!?]$").unwrap();

    let sentences = model.generate_sentences(3, &opts, &mut rng).unwrap();
    assert_eq!(sentences.len(), 3);
    for (i, sentence) in sentences.iter().enumerate() {
        assert!(shape.is_match(sentence), "malformed: {}", sentence);
        assert!(!sentences[..i].contains(sentence), "duplicate: {}", sentence);
    }
}

#[test]
fn copy_limit_keeps_output_novel() {
    let model = corpus_model(2);
    let mut rng = StdRng::seed_from_u64(99);
    let opts = GenerateOptions {
        min_length: 5,
        max_length_match: Some(3),
        ..GenerateOptions::default()
    };

    let sentences = model.generate_sentences(2, &opts, &mut rng).unwrap();
    for sentence in &sentences {
        let tokens = SimpleTokenizer.tokenize(sentence);
        assert!(tokens.len() >= 5);
        if let Some(run) = copies_run(model.input(), &tokens, 4) {
            panic!("'{}' copies {:?} from the corpus", sentence, run);
        }
    }
}

#[test]
fn copy_limit_applies_to_raw_tokens() {
    let model = corpus_model(2);
    let opts = GenerateOptions {
        max_length_match: Some(3),
        ..GenerateOptions::default()
    };

    let mut generated = 0;
    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let tokens = match model.generate_tokens(8, &opts, &mut rng) {
            Ok(tokens) => tokens,
            Err(MarkovError::Exhausted { .. }) => continue,
            Err(err) => panic!("seed {}: {}", seed, err),
        };
        assert_eq!(tokens.len(), 8);
        if let Some(run) = copies_run(model.input(), &tokens, 4) {
            panic!("seed {} copied {:?} from the corpus", seed, run);
        }
        generated += 1;
    }
    assert!(generated > 0);
}

#[test]
fn start_tokens_prefix_every_sentence() {
    let model = corpus_model(2);
    let mut rng = StdRng::seed_from_u64(3);
    let opts = GenerateOptions {
        min_length: 3,
        start_tokens: Some(vec!["My".to_string()]),
        ..GenerateOptions::default()
    };

    for sentence in model.generate_sentences(2, &opts, &mut rng).unwrap() {
        assert!(sentence.starts_with("My "), "{}", sentence);
    }
}

#[test]
fn generate_until_stops_at_match() {
    let model = corpus_model(2);
    let mut rng = StdRng::seed_from_u64(8);
    let opts = GenerateOptions {
        min_length: 2,
        max_length: 25,
        ..GenerateOptions::default()
    };
    let end = Regex::new(r"^[.!?]$").unwrap();

    let tokens = model.generate_until(&end, &opts, &mut rng).unwrap();
    assert!(tokens.len() > 2 && tokens.len() <= 25);
    assert!(end.is_match(tokens.last().unwrap()));
    assert!(!tokens[2..tokens.len() - 1].iter().any(|t| end.is_match(t)));
}

#[test]
fn same_seed_same_sentences() {
    let model = corpus_model(3);
    let opts = GenerateOptions {
        min_length: 4,
        ..GenerateOptions::default()
    };
    let first = model.generate_sentences(2, &opts, &mut StdRng::seed_from_u64(17)).unwrap();
    let second = model.generate_sentences(2, &opts, &mut StdRng::seed_from_u64(17)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn impossible_length_exhausts() {
    let model = corpus_model(2);
    let mut rng = StdRng::seed_from_u64(1);
    let opts = GenerateOptions {
        min_length: 200,
        max_length: 201,
        ..GenerateOptions::default()
    };
    let _ = env_logger::builder().is_test(true).try_init();
    assert!(matches!(
        model.generate_sentence(&opts, &mut rng),
        Err(MarkovError::Exhausted { .. })
    ));
}
