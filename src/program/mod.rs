//! (representation) Programs of a polymorphically-typed lambda calculus.
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp};
//! use ecgrammar::program::Expression;
//!
//! let plus = Expression::primitive("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)]));
//! let one = Expression::primitive("1", ptp!(int));
//! // (λ (+ 1 $0))
//! let expr = Expression::Abstraction(Box::new(Expression::apply(
//!     plus,
//!     vec![one, Expression::Index(0)],
//! )));
//! assert_eq!(expr.to_string(), "(λ (+ 1 $0))");
//! assert_eq!(expr.infer().unwrap(), ptp!(@arrow[tp!(int), tp!(int)]));
//! ```

mod eval;
mod parser;
pub use self::eval::{EvalError, Evaluator, SimpleEvaluator};
pub use self::parser::ParseError;
pub(crate) use self::parser::parse;

use polytype::{Context, Type, TypeScheme};
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::types::UnificationFailure;

/// A named leaf with a fixed type scheme. What it computes is up to an [`Evaluator`], which is
/// handed the name.
///
/// [`Evaluator`]: trait.Evaluator.html
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Primitive {
    pub name: String,
    pub tp: TypeScheme,
}

/// A closed program that behaves like a primitive. Its type is inferred once, when it is made
/// with [`Expression::invented`].
///
/// [`Expression::invented`]: enum.Expression.html#method.invented
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Invented {
    pub body: Expression,
    pub tp: TypeScheme,
}

/// Expressions of lambda calculus.
///
/// Expressions are immutable values: structurally hashable, and ordered by their canonical
/// string (the `Display` form) so that sorting them is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expression {
    /// De Bruijn index referring to the nth-nearest abstraction (0-indexed).
    /// For example, the identity function is `(λ $0)` or `Abstraction(Index(0))`.
    Index(usize),
    Primitive(Arc<Primitive>),
    Invented(Arc<Invented>),
    Application(Box<Expression>, Box<Expression>),
    Abstraction(Box<Expression>),
}
impl Expression {
    pub fn primitive(name: &str, tp: TypeScheme) -> Self {
        Expression::Primitive(Arc::new(Primitive {
            name: String::from(name),
            tp,
        }))
    }

    /// Promote a closed expression to an invented primitive, inferring its type.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp};
    /// use ecgrammar::program::Expression;
    ///
    /// let plus = Expression::primitive("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)]));
    /// let one = Expression::primitive("1", ptp!(int));
    /// let incr = Expression::invented(Expression::apply(plus, vec![one])).unwrap();
    /// assert_eq!(incr.to_string(), "#(+ 1)");
    /// assert_eq!(incr.infer().unwrap(), ptp!(@arrow[tp!(int), tp!(int)]));
    /// ```
    pub fn invented(body: Expression) -> Result<Self, InferenceError> {
        let tp = body.infer()?;
        Ok(Expression::Invented(Arc::new(Invented { body, tp })))
    }

    /// Fold arguments onto a function: `apply(f, [x, y])` is `((f x) y)`.
    pub fn apply(f: Expression, xs: Vec<Expression>) -> Self {
        xs.into_iter().fold(f, |f, x| {
            Expression::Application(Box::new(f), Box::new(x))
        })
    }

    /// Split an expression into its head and the arguments it is applied to, in order.
    pub fn application_parse(&self) -> (&Expression, Vec<&Expression>) {
        let mut f = self;
        let mut xs = Vec::new();
        while let Expression::Application(ref ff, ref x) = *f {
            xs.push(&**x);
            f = ff;
        }
        xs.reverse();
        (f, xs)
    }

    pub fn is_index(&self) -> bool {
        matches!(*self, Expression::Index(_))
    }

    /// The type scheme of a leaf that can be a grammar production.
    pub fn leaf_type(&self) -> Option<&TypeScheme> {
        match *self {
            Expression::Primitive(ref p) => Some(&p.tp),
            Expression::Invented(ref inv) => Some(&inv.tp),
            _ => None,
        }
    }

    /// Infer the principal type of the expression. Free indices get fresh type variables.
    pub fn infer(&self) -> Result<TypeScheme, InferenceError> {
        let mut ctx = Context::default();
        let env = VecDeque::new();
        let mut indices = HashMap::new();
        self.infer_internal(&mut ctx, &env, &mut indices)
            .map(|t| t.generalize(&[]))
    }
    /// The expression's type where `env` holds the types of the enclosing abstractions'
    /// arguments, nearest first.
    pub(crate) fn infer_in(
        &self,
        ctx: &mut Context,
        env: &VecDeque<Type>,
    ) -> Result<Type, InferenceError> {
        let mut indices = HashMap::new();
        self.infer_internal(ctx, env, &mut indices)
    }
    fn infer_internal(
        &self,
        ctx: &mut Context,
        env: &VecDeque<Type>,
        indices: &mut HashMap<usize, Type>,
    ) -> Result<Type, InferenceError> {
        match *self {
            Expression::Primitive(ref prim) => Ok(prim.tp.instantiate(ctx)),
            Expression::Invented(ref inv) => Ok(inv.tp.instantiate(ctx)),
            Expression::Application(ref f, ref x) => {
                let f_tp = f.infer_internal(ctx, env, indices)?;
                let x_tp = x.infer_internal(ctx, env, indices)?;
                let ret_tp = ctx.new_variable();
                ctx.unify(&f_tp, &Type::arrow(x_tp, ret_tp.clone()))
                    .map_err(UnificationFailure::from)?;
                Ok(ret_tp.apply(ctx))
            }
            Expression::Abstraction(ref body) => {
                let arg_tp = ctx.new_variable();
                let mut env = env.clone();
                env.push_front(arg_tp.clone());
                let ret_tp = body.infer_internal(ctx, &env, indices)?;
                let mut tp = Type::arrow(arg_tp, ret_tp);
                tp.apply_mut(ctx);
                Ok(tp)
            }
            Expression::Index(i) => {
                let mut tp = if i < env.len() {
                    env[i].clone()
                } else {
                    indices
                        .entry(i - env.len())
                        .or_insert_with(|| ctx.new_variable())
                        .clone()
                };
                tp.apply_mut(ctx);
                Ok(tp)
            }
        }
    }

    /// Remove all invented expressions by pulling out their underlying expressions.
    pub fn strip_invented(&self) -> Expression {
        match *self {
            Expression::Application(ref f, ref x) => Expression::Application(
                Box::new(f.strip_invented()),
                Box::new(x.strip_invented()),
            ),
            Expression::Abstraction(ref body) => {
                Expression::Abstraction(Box::new(body.strip_invented()))
            }
            Expression::Invented(ref inv) => inv.body.strip_invented(),
            _ => self.clone(),
        }
    }

    /// Shifts all free variables (indexes) in the expression. If `offset` is negative, then
    /// variables will not be changed if they are made to be negative. The return value is always
    /// `true` unless this scenario occurs.
    pub fn shift(&mut self, offset: i64) -> bool {
        self.shift_internal(offset, 0)
    }
    fn shift_internal(&mut self, offset: i64, depth: usize) -> bool {
        match *self {
            Expression::Index(ref mut i) => {
                if *i < depth {
                    true
                } else if offset >= 0 {
                    *i += offset as usize;
                    true
                } else if let Some(ni) = i.checked_sub((-offset) as usize) {
                    *i = ni;
                    true
                } else {
                    false
                }
            }
            Expression::Application(ref mut f, ref mut x) => {
                let a = f.shift_internal(offset, depth);
                let b = x.shift_internal(offset, depth);
                a && b
            }
            Expression::Abstraction(ref mut body) => body.shift_internal(offset, depth + 1),
            _ => true,
        }
    }

    /// The number of nodes, counting an invention as a single leaf.
    pub fn size(&self) -> usize {
        match *self {
            Expression::Application(ref f, ref x) => 1 + f.size() + x.size(),
            Expression::Abstraction(ref body) => 1 + body.size(),
            _ => 1,
        }
    }

    fn show(&self, f: &mut fmt::Formatter, is_function: bool) -> fmt::Result {
        match *self {
            Expression::Index(i) => write!(f, "${}", i),
            Expression::Primitive(ref prim) => write!(f, "{}", prim.name),
            Expression::Invented(ref inv) => {
                write!(f, "#")?;
                inv.body.show(f, false)
            }
            Expression::Application(ref g, ref x) => {
                if !is_function {
                    write!(f, "(")?;
                }
                g.show(f, true)?;
                write!(f, " ")?;
                x.show(f, false)?;
                if !is_function {
                    write!(f, ")")?;
                }
                Ok(())
            }
            Expression::Abstraction(ref body) => {
                write!(f, "(λ ")?;
                body.show(f, false)?;
                write!(f, ")")
            }
        }
    }
}
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.show(f, false)
    }
}
impl PartialOrd for Expression {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Expression {
    /// Canonical-string order. Distinct leaves that print the same (a name reused with another
    /// type) fall back to their debug form.
    fn cmp(&self, other: &Self) -> Ordering {
        if self == other {
            return Ordering::Equal;
        }
        self.to_string()
            .cmp(&other.to_string())
            .then_with(|| format!("{:?}", self).cmp(&format!("{:?}", other)))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("could not unify to infer type: {0}")]
    Unify(#[from] UnificationFailure),
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    fn plus() -> Expression {
        Expression::primitive("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)]))
    }
    fn zero() -> Expression {
        Expression::primitive("0", ptp!(int))
    }

    #[test]
    fn application_parse_returns_arguments_in_order() {
        let expr = Expression::apply(plus(), vec![zero(), Expression::Index(1)]);
        let (f, xs) = expr.application_parse();
        assert_eq!(f, &plus());
        assert_eq!(xs, vec![&zero(), &Expression::Index(1)]);
    }

    #[test]
    fn display_flattens_applications() {
        let inner = Expression::apply(plus(), vec![zero(), zero()]);
        let expr = Expression::Abstraction(Box::new(Expression::apply(
            plus(),
            vec![inner, Expression::Index(0)],
        )));
        assert_eq!(expr.to_string(), "(λ (+ (+ 0 0) $0))");
    }

    #[test]
    fn infer_free_index_gets_a_variable() {
        let expr = Expression::apply(plus(), vec![Expression::Index(0)]);
        assert_eq!(expr.infer().unwrap(), ptp!(@arrow[tp!(int), tp!(int)]));
        let t = Expression::Index(3).infer().unwrap();
        assert_eq!(t, ptp!(0; 0));
    }

    #[test]
    fn infer_rejects_ill_typed_application() {
        let expr = Expression::apply(zero(), vec![zero()]);
        assert!(expr.infer().is_err());
    }

    #[test]
    fn shift_moves_only_free_indices() {
        let mut expr = Expression::Abstraction(Box::new(Expression::apply(
            plus(),
            vec![Expression::Index(0), Expression::Index(1)],
        )));
        assert!(expr.shift(2));
        assert_eq!(expr.to_string(), "(λ (+ $0 $3))");
        assert!(!expr.shift(-4));
    }

    #[test]
    fn ordering_follows_canonical_string() {
        let mut xs = vec![plus(), zero(), Expression::Index(0)];
        xs.sort();
        let shown: Vec<String> = xs.iter().map(|x| x.to_string()).collect();
        assert_eq!(shown, vec!["$0", "+", "0"]);
    }
}
