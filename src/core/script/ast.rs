//! Parse tree for the template scripting language.

use std::fmt;

use crate::core::script::operator::Operator;

/// A sequence of nodes evaluated left to right and concatenated.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expr {
    pub nodes: Vec<Node>,
}

impl Expr {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            nodes: vec![Node::Text(text.into())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Strip leading whitespace from the first node and trailing whitespace
    /// from the last, dropping text nodes left empty.
    pub(crate) fn trim(&mut self) {
        if let Some(Node::Text(first)) = self.nodes.first_mut() {
            *first = first.trim_start().to_string();
        }
        if let Some(Node::Text(last)) = self.nodes.last_mut() {
            *last = last.trim_end().to_string();
        }
        self.nodes.retain(|n| !matches!(n, Node::Text(t) if t.is_empty()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text.
    Text(String),
    /// A line break, rendered as a single space.
    Newline,
    /// `$name` with an optional transform chain.
    Symbol { name: String, transform: Transform },
    /// `(a | b [2] | c)` with an optional transform chain.
    Choice {
        alternatives: Vec<Alternative>,
        transform: Transform,
    },
    /// `$name = value` to the end of the line, or `($name = value)` inline.
    Assign {
        name: String,
        value: Expr,
        /// Column of the `$` on its line; 0 makes this a silent statement.
        column: usize,
        inline: bool,
        transform: Transform,
    },
    /// `&name = source`, stored unevaluated.
    DynamicAssign { name: String, source: String },
    /// `{$a = x, $b > 2} body`: the body is kept only when every
    /// condition holds.
    Conditional { conditions: Vec<Condition>, body: Expr },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    pub expr: Expr,
    /// Explicit `[w]` weight; unweighted alternatives count as 1.
    pub weight: Option<f64>,
}

impl Alternative {
    pub fn weight(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub name: String,
    pub op: Operator,
    pub value: String,
}

/// A `.name` or `.name()` chain applied to a resolved value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transform {
    pub segments: Vec<Segment>,
}

impl Transform {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn has(&self, name: &str) -> bool {
        self.segments.iter().any(|s| s.name == name)
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub name: String,
    /// Written with `()`.
    pub call: bool,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.call {
            write!(f, ".{}()", self.name)
        } else {
            write!(f, ".{}", self.name)
        }
    }
}
