//! Generators, the script interpreter, and their collaborators.

pub mod config;
pub mod features;
pub mod grammar;
pub mod lexicon;
pub mod markov;
pub mod random;
pub mod script;
pub mod tokenizer;
