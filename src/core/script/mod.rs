//! Template scripting: `$symbols`, `(weighted | choices)`, assignments,
//! conditionals and `.transform()` chains.
//!
//! [`Script`] drives repeated parse/visit passes until the text stops
//! changing or nothing parseable remains.

pub mod ast;
pub mod choice;
pub mod operator;
pub mod parser;
pub mod transform;
pub mod value;
pub mod visitor;

pub use self::ast::Expr;
pub use self::choice::ChoicePolicy;
pub use self::operator::Operator;
pub use self::transform::TransformTable;
pub use self::value::{Context, ScriptFn, Value};
pub use self::visitor::Visitor;

use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

lazy_static! {
    static ref PARSEABLE: Regex = Regex::new(r"\$[A-Za-z_]|&[A-Za-z_][A-Za-z0-9_]*\s*=|\([^)]|\{\s*\$").unwrap();
}

#[derive(Debug, Error, PartialEq)]
pub enum ScriptError {
    #[error("parse error at {position}: {message}")]
    Parse { message: String, position: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptOptions {
    /// Upper bound on parse/visit passes per evaluation.
    pub max_passes: usize,
    pub silent: bool,
    /// Log every pass and resolved node at debug level.
    pub trace: bool,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            max_passes: 20,
            silent: false,
            trace: false,
        }
    }
}

/// Whether `text` still holds something a pass could resolve.
pub fn is_parseable(text: &str) -> bool {
    PARSEABLE.is_match(text)
}

/// Multi-pass script evaluator. Choice-site state lives as long as the
/// `Script`, so `.seq` sites advance across calls to [`Script::evaluate`].
#[derive(Debug, Default)]
pub struct Script {
    visitor: Visitor,
    options: ScriptOptions,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ScriptOptions) -> Self {
        Self::with_transforms(TransformTable::default(), options)
    }

    pub fn with_transforms(transforms: TransformTable, options: ScriptOptions) -> Self {
        let visitor = Visitor::with_transforms(transforms)
            .silent(options.silent)
            .trace(options.trace);
        Self { visitor, options }
    }

    pub fn options(&self) -> &ScriptOptions {
        &self.options
    }

    /// Register a transform callable as `.name()`.
    pub fn add_transform<F: Fn(&str) -> String + 'static>(&mut self, name: &str, f: F) -> &mut Self {
        self.visitor.transforms_mut().insert(name, f);
        self
    }

    /// Forget choice-site state.
    pub fn reset(&mut self) {
        self.visitor.reset();
    }

    pub fn parse(&self, input: &str) -> Result<Expr, ScriptError> {
        parser::parse(input)
    }

    /// A single parse and visit: the output and whether it needs another pass.
    pub fn evaluate_pass<R: Rng + ?Sized>(
        &mut self,
        input: &str,
        ctx: &mut Context,
        rng: &mut R,
    ) -> Result<(String, bool), ScriptError> {
        self.run_pass(0, input, ctx, rng)
    }

    fn run_pass<R: Rng + ?Sized>(
        &mut self,
        pass: usize,
        input: &str,
        ctx: &mut Context,
        rng: &mut R,
    ) -> Result<(String, bool), ScriptError> {
        let tree = parser::parse(input)?;
        Ok(self.visitor.evaluate_pass(pass, &tree, ctx, rng))
    }

    /// Evaluate `input` to completion, or as far as `max_passes` allows.
    pub fn evaluate<R: Rng + ?Sized>(&mut self, input: &str, ctx: &mut Context, rng: &mut R) -> Result<String, ScriptError> {
        let mut text = input.to_string();

        for pass in 0..self.options.max_passes {
            let (output, pending) = match self.run_pass(pass, &text, ctx, rng) {
                Ok(result) => result,
                Err(err) if pass == 0 => return Err(err),
                Err(err) => {
                    if !self.options.silent {
                        log::warn!("pass {} left unparseable text '{}': {}", pass, text, err);
                    }
                    return Ok(text);
                }
            };
            if self.options.trace {
                log::debug!("pass {}: '{}'", pass, output);
            }

            let settled = !pending || output == text;
            text = output;
            if settled {
                return Ok(text);
            }
        }

        if !self.options.silent {
            log::warn!("stopped after {} passes with unresolved text '{}'", self.options.max_passes, text);
        }
        Ok(text)
    }
}
