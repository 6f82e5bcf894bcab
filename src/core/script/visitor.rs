//! One evaluation pass over a parsed script.
//!
//! A pass resolves what it can and re-emits the rest as source so a later
//! pass can finish it. Symbols whose value still needs resolving are marked
//! pending and left alone for the remainder of the pass.

use rand::Rng;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::core::random::RandomSource;
use crate::core::script::ast::{Alternative, Condition, Expr, Node, Segment, Transform};
use crate::core::script::choice::{ChoicePolicy, ChoiceState};
use crate::core::script::transform::{is_policy, TransformTable};
use crate::core::script::value::{Context, Value};
use crate::core::script::is_parseable;

#[derive(Debug, Default)]
pub struct Visitor {
    sequences: FxHashMap<(usize, usize), ChoiceState>,
    pass: usize,
    indexer: usize,
    pending: FxHashSet<String>,
    transforms: TransformTable,
    silent: bool,
    trace: bool,
}

impl Visitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transforms(transforms: TransformTable) -> Self {
        Self {
            transforms,
            ..Self::default()
        }
    }

    /// Suppress warnings about unresolvable transforms.
    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = silent;
        self
    }

    /// Log each resolved node at debug level.
    pub fn trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn transforms(&self) -> &TransformTable {
        &self.transforms
    }

    pub fn transforms_mut(&mut self) -> &mut TransformTable {
        &mut self.transforms
    }

    /// Forget all choice-site state.
    pub fn reset(&mut self) {
        self.sequences.clear();
    }

    /// Run one pass over `tree`, returning the trimmed output.
    pub fn start<R: Rng + ?Sized>(&mut self, tree: &Expr, ctx: &mut Context, rng: &mut R) -> String {
        self.start_pass(0, tree, ctx, rng)
    }

    /// Run pass number `pass` over `tree`.
    ///
    /// Choice sites are identified by the pass and their order within it, so
    /// a site that only appears once earlier passes have re-emitted it keeps
    /// its own state.
    pub fn start_pass<R: Rng + ?Sized>(&mut self, pass: usize, tree: &Expr, ctx: &mut Context, rng: &mut R) -> String {
        self.pass = pass;
        self.indexer = 0;
        self.pending.clear();
        self.visit_expr(tree, ctx, rng).trim().to_string()
    }

    /// One pass plus whether its output needs another.
    pub fn evaluate<R: Rng + ?Sized>(&mut self, tree: &Expr, ctx: &mut Context, rng: &mut R) -> (String, bool) {
        self.evaluate_pass(0, tree, ctx, rng)
    }

    pub fn evaluate_pass<R: Rng + ?Sized>(
        &mut self,
        pass: usize,
        tree: &Expr,
        ctx: &mut Context,
        rng: &mut R,
    ) -> (String, bool) {
        let output = self.start_pass(pass, tree, ctx, rng);
        let pending = is_parseable(&output);
        (output, pending)
    }

    fn visit_expr<R: Rng + ?Sized>(&mut self, expr: &Expr, ctx: &mut Context, rng: &mut R) -> String {
        let mut out = String::new();
        for node in &expr.nodes {
            out.push_str(&self.visit_node(node, ctx, rng));
        }
        out
    }

    fn visit_node<R: Rng + ?Sized>(&mut self, node: &Node, ctx: &mut Context, rng: &mut R) -> String {
        match node {
            Node::Text(text) => text.clone(),
            Node::Newline => " ".to_string(),
            Node::Symbol { name, transform } => self.visit_symbol(name, transform, ctx),
            Node::Choice {
                alternatives,
                transform,
            } => self.visit_choice(alternatives, transform, ctx, rng),
            Node::Assign {
                name,
                value,
                column,
                inline,
                transform,
            } => {
                let value = self.visit_expr(value, ctx, rng).trim().to_string();
                if !inline && *column == 0 {
                    self.log(|| format!("${} = '{}'", name, value));
                    ctx.insert(name.as_str(), value);
                    return String::new();
                }
                if is_parseable(&value) {
                    self.pending.insert(name.clone());
                    ctx.insert(name.as_str(), value.clone());
                    return format!("(${}={}){}", name, value, transform);
                }
                ctx.insert(name.as_str(), value.clone());
                self.apply_transforms(Value::Text(value), transform, ctx)
            }
            Node::DynamicAssign { name, source } => {
                self.log(|| format!("&{} = '{}'", name, source));
                ctx.insert(format!("&{}", name), source.as_str());
                String::new()
            }
            Node::Conditional { conditions, body } => {
                if conditions.iter().all(|c| self.holds(c, &*ctx)) {
                    self.visit_expr(body, ctx, rng)
                } else {
                    String::new()
                }
            }
        }
    }

    fn visit_symbol(&mut self, name: &str, transform: &Transform, ctx: &Context) -> String {
        if self.pending.contains(name) {
            return format!("${}{}", name, transform);
        }

        match ctx.get(name) {
            Some(Value::Text(text)) if is_parseable(text) => {
                self.pending.insert(name.to_string());
                format!("(${}={}){}", name, text, transform)
            }
            Some(value) => {
                let resolved = self.apply_transforms(value.clone(), transform, ctx);
                self.log(|| format!("${} -> '{}'", name, resolved));
                resolved
            }
            None => match ctx.get(&format!("&{}", name)) {
                Some(source) => format!("({}){}", source, transform),
                None => format!("${}{}", name, transform),
            },
        }
    }

    fn visit_choice<R: Rng + ?Sized>(
        &mut self,
        alternatives: &[Alternative],
        transform: &Transform,
        ctx: &mut Context,
        rng: &mut R,
    ) -> String {
        self.indexer += 1;
        let id = self.indexer;
        let key = (self.pass, id);
        let policy = ChoicePolicy::from_transform(transform);

        let picked = if policy.is_stateful() {
            let stale = self
                .sequences
                .get(&key)
                .map_or(true, |state| !state.fits(alternatives.len(), policy));
            if stale {
                self.sequences.insert(key, ChoiceState::new(id, alternatives, policy, rng));
            }
            self.sequences.get_mut(&key).and_then(|state| state.select(rng))
        } else if alternatives.is_empty() {
            None
        } else {
            let weights: Vec<f64> = alternatives.iter().map(Alternative::weight).collect();
            Some(rng.weighted_index(&weights).unwrap_or_else(|| rng.rand_int(weights.len())))
        };

        let result = match picked.and_then(|i| alternatives.get(i)) {
            Some(alternative) => self.visit_expr(&alternative.expr, ctx, rng),
            None => return String::new(),
        };
        self.log(|| format!("choice {}.{} ({:?}) -> '{}'", self.pass, id, policy, result));

        let transform = Transform {
            segments: transform.segments.iter().filter(|s| !is_policy(&s.name)).cloned().collect(),
        };
        if transform.is_empty() {
            result
        } else if is_parseable(&result) {
            format!("({}){}", result, transform)
        } else {
            self.apply_transforms(Value::Text(result), &transform, ctx)
        }
    }

    fn holds(&self, condition: &Condition, ctx: &Context) -> bool {
        match ctx.get(&condition.name) {
            Some(value) => condition.op.invoke(&value.to_string(), &condition.value),
            None => false,
        }
    }

    /// Apply each non-policy segment in order. An unresolvable segment
    /// leaves it and the rest of the chain as literal text.
    fn apply_transforms(&self, value: Value, transform: &Transform, ctx: &Context) -> String {
        let mut current = value;
        let segments: Vec<&Segment> = transform.segments.iter().filter(|s| !is_policy(&s.name)).collect();

        for (i, segment) in segments.iter().enumerate() {
            match self.apply_segment(&current, segment, ctx) {
                Some(next) => current = next,
                None => {
                    if !self.silent {
                        log::warn!("unresolved transform '{}' on '{}'", segment, current);
                    }
                    let rest: String = segments[i..].iter().map(|s| s.to_string()).collect();
                    return format!("{}{}", current, rest);
                }
            }
        }
        current.to_string()
    }

    fn apply_segment(&self, value: &Value, segment: &Segment, ctx: &Context) -> Option<Value> {
        let name = segment.name.as_str();
        if !segment.call {
            if let Value::Object(object) = value {
                if let Some(property) = object.get(name) {
                    return Some(property.clone());
                }
            }
        }

        if let Some(Value::Function(f)) = ctx.get(name) {
            return Some(Value::Text(f(&value.to_string())));
        }
        if let Some(f) = self.transforms.get(name) {
            return Some(Value::Text(f(&value.to_string())));
        }

        let text = match value {
            Value::Text(text) => text,
            _ => return None,
        };
        let native = match (name, segment.call) {
            ("toUpperCase", true) => text.to_uppercase(),
            ("toLowerCase", true) => text.to_lowercase(),
            ("trim", true) => text.trim().to_string(),
            ("toString", true) => text.clone(),
            ("length", false) => text.chars().count().to_string(),
            _ => return None,
        };
        Some(Value::Text(native))
    }

    fn log<F: FnOnce() -> String>(&self, message: F) {
        if self.trace {
            log::debug!("{}", message());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::script::parser::parse;
    use maplit::btreemap;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn run(visitor: &mut Visitor, input: &str, ctx: &mut Context) -> String {
        let mut rng = StdRng::seed_from_u64(42);
        visitor.start(&parse(input).unwrap(), ctx, &mut rng)
    }

    #[test]
    fn statement_assignment_is_silent() {
        let mut ctx = Context::new();
        let out = run(&mut Visitor::new(), "$x = hello\n$x", &mut ctx);
        assert_eq!(out, "hello");
        assert_eq!(ctx.get("x"), Some(&Value::from("hello")));
    }

    #[test]
    fn inline_assignment_outputs_transformed_value() {
        let mut ctx = Context::new();
        let out = run(&mut Visitor::new(), "I saw ($pet = cat).uc() and $pet.", &mut ctx);
        assert_eq!(out, "I saw CAT and cat.");
    }

    #[test]
    fn unresolved_symbol_is_left_verbatim() {
        let mut ctx = Context::new();
        let (out, pending) = Visitor::new().evaluate(&parse("hi $who.cap()").unwrap(), &mut ctx, &mut StdRng::seed_from_u64(1));
        assert_eq!(out, "hi $who.cap()");
        assert!(pending);
    }

    #[test]
    fn parseable_value_is_deferred() {
        let mut ctx: Context = vec![("a", "$b")].into_iter().collect();
        let out = run(&mut Visitor::new(), "$a and $a", &mut ctx);
        assert_eq!(out, "($a=$b) and $a");
    }

    #[test]
    fn dynamic_binding_is_reemitted() {
        let mut ctx = Context::new();
        let out = run(&mut Visitor::new(), "&x = (a | b)\n$x.uc()", &mut ctx);
        assert_eq!(out, "((a | b)).uc()");
        assert_eq!(ctx.get("&x"), Some(&Value::from("(a | b)")));
    }

    #[test]
    fn choice_transforms_apply_to_result() {
        let mut ctx = Context::new();
        let out = run(&mut Visitor::new(), "(dog | dog).s.uc()", &mut ctx);
        assert_eq!(out, "DOGS");
    }

    #[test]
    fn sequence_advances_across_starts() {
        let mut visitor = Visitor::new();
        let tree = parse("(a | b | c).seq").unwrap();
        let mut ctx = Context::new();
        let mut rng = StdRng::seed_from_u64(3);
        let picks: Vec<String> = (0..4).map(|_| visitor.start(&tree, &mut ctx, &mut rng)).collect();
        assert_eq!(picks, vec!["a", "b", "c", "a"]);

        visitor.reset();
        assert_eq!(visitor.start(&tree, &mut ctx, &mut rng), "a");
    }

    #[test]
    fn sites_in_later_passes_keep_their_own_state() {
        let mut visitor = Visitor::new();
        let first = parse("(a | b).seq").unwrap();
        let second = parse("(x | y | z).seq").unwrap();
        let mut ctx = Context::new();
        let mut rng = StdRng::seed_from_u64(3);

        let mut picks = Vec::new();
        for _ in 0..3 {
            picks.push(visitor.start_pass(0, &first, &mut ctx, &mut rng));
            picks.push(visitor.start_pass(1, &second, &mut ctx, &mut rng));
        }
        assert_eq!(picks, vec!["a", "x", "b", "y", "a", "z"]);
    }

    #[test]
    fn conditionals() {
        let mut ctx: Context = vec![("mood", "happy"), ("age", "30")].into_iter().collect();
        let mut visitor = Visitor::new();
        assert_eq!(run(&mut visitor, "{$mood = happy} yay", &mut ctx), "yay");
        assert_eq!(run(&mut visitor, "{$mood = happy, $age < 18} yay", &mut ctx), "");
        assert_eq!(run(&mut visitor, "{$missing != x} yay", &mut ctx), "");
        assert_eq!(run(&mut visitor, "{$age >= 21}(ok|ok) done", &mut ctx), "ok done");
    }

    #[test]
    fn transform_resolution_order() {
        let mut ctx = Context::new();
        ctx.insert_function("shout", |s| format!("{}!", s));
        ctx.insert(
            "who",
            btreemap! {
                "name".to_string() => Value::from("ann"),
            },
        );
        let mut visitor = Visitor::new();
        assert_eq!(run(&mut visitor, "$who.name.cap().shout()", &mut ctx), "Ann!");
        assert_eq!(run(&mut visitor, "(abc).toUpperCase()", &mut ctx), "ABC");
        assert_eq!(run(&mut visitor, "(abc).length", &mut ctx), "3");
    }

    #[test]
    fn unknown_transform_stays_literal() {
        let mut ctx: Context = vec![("x", "cat")].into_iter().collect();
        let mut visitor = Visitor::new().silent(true);
        assert_eq!(run(&mut visitor, "$x.cap.bogus().uc()", &mut ctx), "Cat.bogus().uc()");
    }

    #[test]
    fn newlines_become_spaces() {
        let mut ctx = Context::new();
        assert_eq!(run(&mut Visitor::new(), "a\nb", &mut ctx), "a b");
    }
}
