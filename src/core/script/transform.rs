//! Named text transforms applied with `.name()` in scripts.

use std::collections::BTreeMap;
use std::rc::Rc;

use inflector::cases::titlecase::to_title_case;

use crate::core::features::{is_vowel, BasicFeatures, WordFeatures};
use crate::core::script::value::ScriptFn;

/// Choice-site policy names; they select behavior rather than alter text.
pub const SEQUENCE: &str = "seq";
pub const RANDOM_SEQUENCE: &str = "rseq";
pub const NO_REPEAT: &str = "norep";

/// Registry of transforms by name.
#[derive(Clone)]
pub struct TransformTable {
    transforms: BTreeMap<String, ScriptFn>,
}

impl Default for TransformTable {
    fn default() -> Self {
        Self::with_features(BasicFeatures)
    }
}

impl std::fmt::Debug for TransformTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.transforms.keys()).finish()
    }
}

impl TransformTable {
    pub fn empty() -> Self {
        Self {
            transforms: BTreeMap::new(),
        }
    }

    /// The default transforms, inflecting with `features`.
    pub fn with_features<F: WordFeatures + 'static>(features: F) -> Self {
        let features = Rc::new(features);
        let mut table = Self::empty();

        table.insert("capitalize", capitalize);
        table.insert("cap", capitalize);
        table.insert("uc", |s: &str| s.to_uppercase());
        table.insert("lc", |s: &str| s.to_lowercase());
        table.insert("titleCase", to_title_case);
        table.insert("articlize", articlize);
        table.insert("a", articlize);
        table.insert("quotify", |s: &str| format!("\"{}\"", s));
        table.insert("inQuotes", |s: &str| format!("\"{}\"", s));
        table.insert("comma", |s: &str| {
            if s.ends_with([',', '.', '!', '?']) {
                s.to_string()
            } else {
                format!("{},", s)
            }
        });

        let plural = features.clone();
        table.insert("pluralize", move |s: &str| plural.pluralize(s));
        let plural = features.clone();
        table.insert("s", move |s: &str| plural.pluralize(s));
        table.insert("ed", move |s: &str| features.past_participle(s));

        for policy in [SEQUENCE, RANDOM_SEQUENCE, NO_REPEAT] {
            table.insert(policy, str::to_string);
        }
        table
    }

    pub fn insert<F: Fn(&str) -> String + 'static>(&mut self, name: &str, f: F) -> &mut Self {
        self.transforms.insert(name.to_string(), Rc::new(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScriptFn> {
        self.transforms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transforms.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transforms.keys().map(String::as_str)
    }
}

/// True for the choice policy names.
pub fn is_policy(name: &str) -> bool {
    matches!(name, SEQUENCE | RANDOM_SEQUENCE | NO_REPEAT)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn articlize(s: &str) -> String {
    let article = match s.chars().next() {
        Some(c) if is_vowel(c) => "an",
        _ => "a",
    };
    format!("{} {}", article, s)
}
