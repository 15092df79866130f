//! Types, type schemes, and value-like substitution contexts.
//!
//! Types are [`polytype`] types: base types are nullary constructors (`tp!(int)`), parametric
//! containers are constructors with arguments (`tp!(maybe(tp!(int)))`), type variables are
//! `tp!(0)`, and arrows chain right-associatively (`tp!(@arrow[tp!(int), tp!(int), tp!(int)])`).
//!
//! A [`Context`] is never mutated through this module: every operation takes a context by
//! reference and hands back a new one, so search can backtrack by keeping the old context.
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp, Context};
//! use ecgrammar::types;
//!
//! let scheme = ptp!(0; @arrow[tp!(0), tp!(maybe(tp!(0)))]);
//! let (ctx, t) = types::instantiate(&Context::default(), &scheme);
//! let int_ctx = types::unify(&ctx, types::returns(&t), &tp!(maybe(tp!(int)))).unwrap();
//! assert_eq!(types::resolve(&int_ctx, &t), tp!(@arrow[tp!(int), tp!(maybe(tp!(int)))]));
//!
//! // the context we started from is untouched, so another branch may bind differently
//! let bool_ctx = types::unify(&ctx, types::returns(&t), &tp!(maybe(tp!(bool)))).unwrap();
//! assert_eq!(types::resolve(&bool_ctx, &t), tp!(@arrow[tp!(bool), tp!(maybe(tp!(bool)))]));
//! ```

pub use polytype::{Context, Type, TypeScheme, UnificationError, Variable};
use thiserror::Error;

/// Why two types could not be made equal.
///
/// This is an expected outcome during search: grammar operations catch it per candidate and
/// simply leave the candidate out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnificationFailure {
    #[error("cannot unify {0} with {1}")]
    Mismatch(Type, Type),
    #[error("type variable t{0} occurs in the type it would be bound to")]
    Occurs(Variable),
}
impl From<UnificationError> for UnificationFailure {
    fn from(err: UnificationError) -> Self {
        match err {
            UnificationError::Occurs(v) => UnificationFailure::Occurs(v),
            UnificationError::Failure(t1, t2) => UnificationFailure::Mismatch(t1, t2),
        }
    }
}

/// Replace the quantified variables of `scheme` with fresh variables from `ctx`.
pub fn instantiate(ctx: &Context, scheme: &TypeScheme) -> (Context, Type) {
    let mut ctx = ctx.clone();
    let tp = scheme.instantiate(&mut ctx);
    (ctx, tp)
}

/// Unify two types, yielding the extended context.
pub fn unify(ctx: &Context, t1: &Type, t2: &Type) -> Result<Context, UnificationFailure> {
    let mut ctx = ctx.clone();
    ctx.unify(t1, t2)?;
    Ok(ctx)
}

/// Fully apply the bindings of `ctx` to `tp`.
pub fn resolve(ctx: &Context, tp: &Type) -> Type {
    tp.apply(ctx)
}

/// Everything but the final return type of an arrow; empty for non-arrows.
pub fn arguments(tp: &Type) -> Vec<&Type> {
    tp.args()
        .map(|args| args.into_iter().collect())
        .unwrap_or_default()
}

/// The final return type of an arrow chain, or the type itself.
pub fn returns(tp: &Type) -> &Type {
    tp.returns().unwrap_or(tp)
}

pub fn is_arrow(tp: &Type) -> bool {
    tp.as_arrow().is_some()
}

/// How many arguments a value of this scheme takes before it returns a non-arrow.
pub fn arity(scheme: &TypeScheme) -> usize {
    let (_, tp) = instantiate(&Context::default(), scheme);
    arguments(&tp).len()
}

/// The optional-value container, `maybe(t)`.
pub fn maybe(tp: Type) -> Type {
    Type::Constructed("maybe", vec![tp])
}

pub fn list(tp: Type) -> Type {
    Type::Constructed("list", vec![tp])
}
