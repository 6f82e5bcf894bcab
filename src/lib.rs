//! Narrative Toolkit: small building blocks for procedural text.
//!
//! Three generators share one retry-under-constraints style: a weighted
//! context-free grammar expander, an n-gram Markov model with anti-copy
//! sampling, and a template script interpreter with inline variables,
//! weighted choices, conditionals and text transforms.

pub mod core;

pub use crate::core::config::{ConfigError, ToolkitConfig};
pub use crate::core::grammar::{Grammar, GrammarError};
pub use crate::core::lexicon::{Lexicon, LexiconError};
pub use crate::core::markov::{GenerateOptions, Markov, MarkovError};
pub use crate::core::script::{Context, Script, ScriptError, ScriptOptions, Value};
