//! Hand-rolled scanner turning script source into an [`Expr`].

use lazy_static::lazy_static;
use regex::Regex;

use crate::core::script::ast::{Alternative, Condition, Expr, Node, Segment, Transform};
use crate::core::script::operator::Operator;
use crate::core::script::ScriptError;

/// Characters that may open or close a construct.
const SPECIAL: &[char] = &['$', '&', '(', ')', '|', '{', '\n'];

lazy_static! {
    static ref WEIGHT: Regex = Regex::new(r"(?s)^(.*?)\s*\[([0-9]+(?:\.[0-9]+)?)\]\s*$").unwrap();
}

/// Parse script source. Characters that do not form a construct are kept
/// as literal text; only an unclosed `(` or conditional `{` is an error.
pub fn parse(input: &str) -> Result<Expr, ScriptError> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };
    parser.parse_expr(&[])
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(' ' | '\t' | '\r')) {
            self.pos += 1;
        }
    }

    /// Chars between the previous line break and `at`.
    fn column(&self, at: usize) -> usize {
        self.chars[..at].iter().rev().take_while(|&&c| c != '\n').count()
    }

    fn error(&self, message: &str, position: usize) -> ScriptError {
        ScriptError::Parse {
            message: message.to_string(),
            position,
        }
    }

    /// Identifier starting at `at`, if any.
    fn ident_at(&self, at: usize) -> Option<String> {
        let first = *self.chars.get(at)?;
        if !(first.is_ascii_alphabetic() || first == '_') {
            return None;
        }
        Some(
            self.chars[at..]
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
                .collect(),
        )
    }

    /// At `=` but not `==`.
    fn at_assign(&self) -> bool {
        self.peek() == Some('=') && self.peek_at(1) != Some('=')
    }

    fn parse_expr(&mut self, stops: &[char]) -> Result<Expr, ScriptError> {
        let mut nodes = Vec::new();
        let mut literal = String::new();

        while let Some(c) = self.peek() {
            if stops.contains(&c) {
                break;
            }
            match self.parse_atom(stops)? {
                Node::Text(text) => literal.push_str(&text),
                node => {
                    if !literal.is_empty() {
                        nodes.push(Node::Text(std::mem::take(&mut literal)));
                    }
                    nodes.push(node);
                }
            }
        }

        if !literal.is_empty() {
            nodes.push(Node::Text(literal));
        }
        Ok(Expr::new(nodes))
    }

    /// One node; always consumes at least one char.
    fn parse_atom(&mut self, stops: &[char]) -> Result<Node, ScriptError> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(Node::Text(String::new())),
        };
        match c {
            '\n' => {
                self.pos += 1;
                Ok(Node::Newline)
            }
            '$' => self.parse_dollar(stops),
            '&' => Ok(self.parse_dynamic(stops)),
            '(' => self.parse_paren(),
            '{' => self.parse_conditional(stops),
            ')' | '|' => {
                self.pos += 1;
                Ok(Node::Text(c.to_string()))
            }
            _ => {
                let begin = self.pos;
                while let Some(c) = self.peek() {
                    if SPECIAL.contains(&c) || stops.contains(&c) {
                        break;
                    }
                    self.pos += 1;
                }
                Ok(Node::Text(self.chars[begin..self.pos].iter().collect()))
            }
        }
    }

    /// `$name`, `$name.transforms` or `$name = value`.
    fn parse_dollar(&mut self, stops: &[char]) -> Result<Node, ScriptError> {
        let start = self.pos;
        let name = match self.ident_at(start + 1) {
            Some(name) => name,
            None => {
                self.pos += 1;
                return Ok(Node::Text("$".to_string()));
            }
        };
        self.pos = start + 1 + name.len();

        let after_name = self.pos;
        self.skip_spaces();
        if self.at_assign() {
            self.pos += 1;
            self.skip_spaces();
            let column = self.column(start);
            let mut line_stops = stops.to_vec();
            line_stops.push('\n');
            let mut value = self.parse_expr(&line_stops)?;
            value.trim();
            // A statement line leaves no blank line behind
            if column == 0 && self.peek() == Some('\n') {
                self.pos += 1;
            }
            return Ok(Node::Assign {
                name,
                value,
                column,
                inline: false,
                transform: Transform::default(),
            });
        }

        self.pos = after_name;
        let transform = self.parse_transform();
        Ok(Node::Symbol { name, transform })
    }

    /// `&name = source` to the end of the line, else a literal `&`.
    fn parse_dynamic(&mut self, stops: &[char]) -> Node {
        let start = self.pos;
        if let Some(name) = self.ident_at(start + 1) {
            self.pos = start + 1 + name.len();
            self.skip_spaces();
            if self.at_assign() {
                self.pos += 1;
                let begin = self.pos;
                while let Some(c) = self.peek() {
                    if c == '\n' || stops.contains(&c) {
                        break;
                    }
                    self.pos += 1;
                }
                let source: String = self.chars[begin..self.pos].iter().collect();
                if self.column(start) == 0 && self.peek() == Some('\n') {
                    self.pos += 1;
                }
                return Node::DynamicAssign {
                    name,
                    source: source.trim().to_string(),
                };
            }
        }
        self.pos = start + 1;
        Node::Text("&".to_string())
    }

    /// `($name = value)` or a choice `(a | b [2] | c)`.
    fn parse_paren(&mut self) -> Result<Node, ScriptError> {
        let start = self.pos;
        self.pos += 1;
        if self.peek() == Some(')') {
            self.pos += 1;
            return Ok(Node::Text("()".to_string()));
        }

        let body = self.pos;
        self.skip_spaces();
        if self.peek() == Some('$') {
            let dollar = self.pos;
            if let Some(name) = self.ident_at(dollar + 1) {
                self.pos = dollar + 1 + name.len();
                self.skip_spaces();
                if self.at_assign() {
                    self.pos += 1;
                    self.skip_spaces();
                    let mut value = self.parse_expr(&[')'])?;
                    value.trim();
                    if self.peek() != Some(')') {
                        return Err(self.error("unclosed '('", start));
                    }
                    self.pos += 1;
                    let transform = self.parse_transform();
                    return Ok(Node::Assign {
                        name,
                        value,
                        column: self.column(dollar),
                        inline: true,
                        transform,
                    });
                }
            }
        }
        self.pos = body;

        let mut alternatives = Vec::new();
        loop {
            let mut expr = self.parse_expr(&['|', ')'])?;
            let weight = take_weight(&mut expr);
            expr.trim();
            alternatives.push(Alternative { expr, weight });

            match self.peek() {
                Some('|') => self.pos += 1,
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("unclosed '('", start)),
            }
        }

        let transform = self.parse_transform();
        Ok(Node::Choice {
            alternatives,
            transform,
        })
    }

    /// `{$a = x, $b > 2} body`; anything else is a literal `{`.
    fn parse_conditional(&mut self, stops: &[char]) -> Result<Node, ScriptError> {
        let start = self.pos;
        self.pos += 1;

        let mut conditions = Vec::new();
        loop {
            self.skip_spaces();
            let name = match (self.peek(), self.ident_at(self.pos + 1)) {
                (Some('$'), Some(name)) => name,
                _ => return Ok(self.literal_brace(start)),
            };
            self.pos += 1 + name.len();
            self.skip_spaces();

            let op = match self.parse_operator() {
                Some(op) => op,
                None => return Ok(self.literal_brace(start)),
            };
            self.skip_spaces();

            let begin = self.pos;
            while let Some(c) = self.peek() {
                if matches!(c, ',' | '}' | '\n') {
                    break;
                }
                self.pos += 1;
            }
            let value: String = self.chars[begin..self.pos].iter().collect();
            conditions.push(Condition {
                name,
                op,
                value: value.trim().to_string(),
            });

            match self.peek() {
                Some(',') => self.pos += 1,
                Some('}') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.error("unclosed '{'", start)),
            }
        }

        self.skip_spaces();
        let body = match self.peek() {
            Some(c) if c != '\n' && !stops.contains(&c) => Expr::new(vec![self.parse_atom(stops)?]),
            _ => Expr::default(),
        };
        Ok(Node::Conditional { conditions, body })
    }

    fn literal_brace(&mut self, start: usize) -> Node {
        self.pos = start + 1;
        Node::Text("{".to_string())
    }

    fn parse_operator(&mut self) -> Option<Operator> {
        for token in Operator::TOKENS {
            let matches = token.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c));
            if matches {
                self.pos += token.len();
                return token.parse().ok();
            }
        }
        None
    }

    /// Zero or more `.name` / `.name()` segments.
    fn parse_transform(&mut self) -> Transform {
        let mut segments = Vec::new();
        while self.peek() == Some('.') {
            let name = match self.ident_at(self.pos + 1) {
                Some(name) => name,
                None => break,
            };
            self.pos += 1 + name.len();
            let call = self.peek() == Some('(') && self.peek_at(1) == Some(')');
            if call {
                self.pos += 2;
            }
            segments.push(Segment { name, call });
        }
        Transform { segments }
    }
}

/// Strip a trailing `[w]` from a choice alternative. Non-positive weights,
/// and a weight with nothing to weigh, stay in the text.
fn take_weight(expr: &mut Expr) -> Option<f64> {
    let single = expr.nodes.len() == 1;
    let text = match expr.nodes.last_mut() {
        Some(Node::Text(text)) => text,
        _ => return None,
    };
    let (rest, weight) = {
        let caps = WEIGHT.captures(text)?;
        let weight: f64 = caps[2].parse().ok()?;
        if weight <= 0.0 || (single && caps[1].trim().is_empty()) {
            return None;
        }
        (caps[1].to_string(), weight)
    };
    *text = rest;
    Some(weight)
}
