//! Comparison operators used in conditionals.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use crate::core::script::ScriptError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    StartsWith,
    EndsWith,
    Matches,
}

impl Operator {
    /// Spellings, longest first so a scanner can match greedily.
    pub const TOKENS: &'static [&'static str] = &["==", "!=", ">=", "<=", "^=", "$=", "*=", "=", ">", "<"];

    /// Compare a symbol's value against a literal. Ordering operators
    /// compare numerically when both sides are numbers, else as text.
    pub fn invoke(&self, left: &str, right: &str) -> bool {
        let (left, right) = (left.trim(), right.trim());
        match self {
            Operator::Eq => left == right,
            Operator::Ne => left != right,
            Operator::Gt | Operator::Lt | Operator::Ge | Operator::Le => {
                let ordering = match (left.parse::<f64>(), right.parse::<f64>()) {
                    (Ok(l), Ok(r)) => l.partial_cmp(&r),
                    _ => Some(left.cmp(right)),
                };
                match (self, ordering) {
                    (_, None) => false,
                    (Operator::Gt, Some(o)) => o.is_gt(),
                    (Operator::Lt, Some(o)) => o.is_lt(),
                    (Operator::Ge, Some(o)) => o.is_ge(),
                    (_, Some(o)) => o.is_le(),
                }
            }
            Operator::StartsWith => left.starts_with(right),
            Operator::EndsWith => left.ends_with(right),
            Operator::Matches => match Regex::new(right) {
                Ok(re) => re.is_match(left),
                Err(err) => {
                    log::warn!("invalid pattern in condition '{}': {}", right, err);
                    false
                }
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::Matches => "*=",
        }
    }
}

impl FromStr for Operator {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            ">" => Ok(Operator::Gt),
            "<" => Ok(Operator::Lt),
            ">=" => Ok(Operator::Ge),
            "<=" => Ok(Operator::Le),
            "^=" => Ok(Operator::StartsWith),
            "$=" => Ok(Operator::EndsWith),
            "*=" => Ok(Operator::Matches),
            other => Err(ScriptError::Parse {
                message: format!("unknown operator '{}'", other),
                position: 0,
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
