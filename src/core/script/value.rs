//! Symbol values and the evaluation context.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

/// A function callable from a script as `$value.name()`.
pub type ScriptFn = Rc<dyn Fn(&str) -> String>;

/// What a symbol can be bound to.
#[derive(Clone)]
pub enum Value {
    Text(String),
    /// Properties reachable with `$value.name`.
    Object(BTreeMap<String, Value>),
    Function(ScriptFn),
}

impl Value {
    pub fn function<F: Fn(&str) -> String + 'static>(f: F) -> Self {
        Value::Function(Rc::new(f))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(object: BTreeMap<String, Value>) -> Self {
        Value::Object(object)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Object(object) => {
                write!(f, "{{")?;
                for (i, (key, value)) in object.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => f.write_str("[function]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Value::Object(object) => f.debug_tuple("Object").field(object).finish(),
            Value::Function(_) => f.write_str("Function"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Symbol table shared by every pass of an evaluation.
///
/// Dynamic bindings (`&name = ...`) live under the key `&name`.
#[derive(Debug, Clone, Default)]
pub struct Context {
    values: FxHashMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K: Into<String>, V: Into<Value>>(&mut self, name: K, value: V) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn insert_function<K, F>(&mut self, name: K, f: F) -> &mut Self
    where
        K: Into<String>,
        F: Fn(&str) -> String + 'static,
    {
        self.values.insert(name.into(), Value::function(f));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Context {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut ctx = Context::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn display_values() {
        assert_eq!(Value::from("hi").to_string(), "hi");
        let object = Value::from(btreemap! {
            "name".to_string() => Value::from("Ann"),
            "age".to_string() => Value::from("30"),
        });
        assert_eq!(object.to_string(), "{age: 30, name: Ann}");
        assert_eq!(Value::function(|s| s.to_string()).to_string(), "[function]");
    }

    #[test]
    fn context_from_pairs() {
        let ctx: Context = vec![("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(ctx.get("a"), Some(&Value::from("1")));
        assert!(ctx.contains("b"));
        assert!(!ctx.contains("c"));
    }
}
