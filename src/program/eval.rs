use std::collections::VecDeque;
use std::marker::PhantomData;
use thiserror::Error;

use super::Expression;
use crate::types;

/// Gives meaning to primitives: [`Expression::eval`] handles variables, abstraction and
/// application itself, and asks the evaluator only for what a named primitive returns.
///
/// Every input a primitive receives and every result of evaluation is a [`Space`] value. A
/// primitive is called once it has all the inputs its type scheme asks for, never before, and
/// never with a closure among them.
///
/// [`Expression::eval`]: enum.Expression.html#method.eval
/// [`Space`]: #associatedtype.Space
pub trait Evaluator: Sized + Sync {
    type Space: Clone + PartialEq + Send + Sync;
    /// What a primitive reports when it cannot produce a value.
    type Error: Clone + Sync;
    fn evaluate(&self, primitive: &str, inps: &[Self::Space]) -> Result<Self::Space, Self::Error>;
}

/// Wraps a plain function of a primitive name and its inputs as an [`Evaluator`].
///
/// [`Evaluator`]: trait.Evaluator.html
pub struct SimpleEvaluator<V, R, F> {
    f: F,
    marker: PhantomData<fn() -> (V, R)>,
}
impl<V, R, F> SimpleEvaluator<V, R, F>
where
    V: Clone + PartialEq + Send + Sync,
    R: Clone + Sync,
    F: Fn(&str, &[V]) -> Result<V, R>,
{
    /// # Examples
    ///
    /// ```
    /// use ecgrammar::program::{Evaluator, SimpleEvaluator};
    ///
    /// let eval = SimpleEvaluator::of(|primitive: &str, inps: &[bool]| match primitive {
    ///     "nand" => Ok(!(inps[0] && inps[1])),
    ///     _ => Err(format!("unknown primitive {}", primitive)),
    /// });
    /// assert_eq!(eval.evaluate("nand", &[true, false]), Ok(true));
    /// ```
    pub fn of(f: F) -> Self {
        SimpleEvaluator {
            f,
            marker: PhantomData,
        }
    }
}
impl<V, R, F> Evaluator for SimpleEvaluator<V, R, F>
where
    V: Clone + PartialEq + Send + Sync,
    R: Clone + Sync,
    F: Fn(&str, &[V]) -> Result<V, R> + Sync,
{
    type Space = V;
    type Error = R;
    fn evaluate(&self, primitive: &str, inps: &[V]) -> Result<V, R> {
        (self.f)(primitive, inps)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError<E> {
    #[error("primitive evaluation failed")]
    Primitive(E),
    #[error("index ${0} is unbound")]
    UnboundIndex(usize),
    #[error("primitive {0} was given a function as input")]
    HigherOrderArgument(String),
    #[error("a value was applied as if it were a function")]
    NotAFunction,
    #[error("evaluation ended with a function rather than a value")]
    NotAValue,
}

#[derive(Clone)]
enum Value<'a, V> {
    Data(V),
    Closure {
        body: &'a Expression,
        env: VecDeque<Value<'a, V>>,
    },
    Partial {
        name: &'a str,
        arity: usize,
        args: Vec<V>,
    },
}

impl Expression {
    /// Evaluate the expression as a function of `inps`, strictly and left to right.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp};
    /// use ecgrammar::grammar::Grammar;
    /// use ecgrammar::program::SimpleEvaluator;
    ///
    /// let g = Grammar::uniform(vec![
    ///     ("1", ptp!(int)),
    ///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    /// ]);
    /// let eval = SimpleEvaluator::of(|primitive: &str, inps: &[i32]| match primitive {
    ///     "1" => Ok(1),
    ///     "+" => Ok(inps[0] + inps[1]),
    ///     _ => Err(()),
    /// });
    /// let expr = g.parse("(λ (+ 1 $0))").unwrap();
    /// assert_eq!(expr.eval(&eval, &[41]), Ok(42));
    /// ```
    pub fn eval<E: Evaluator>(
        &self,
        evaluator: &E,
        inps: &[E::Space],
    ) -> Result<E::Space, EvalError<E::Error>> {
        let mut value = eval_in(self, &VecDeque::new(), evaluator)?;
        for inp in inps {
            value = apply(value, Value::Data(inp.clone()), evaluator)?;
        }
        match value {
            Value::Data(v) => Ok(v),
            _ => Err(EvalError::NotAValue),
        }
    }
}

fn eval_in<'a, E: Evaluator>(
    expr: &'a Expression,
    env: &VecDeque<Value<'a, E::Space>>,
    evaluator: &E,
) -> Result<Value<'a, E::Space>, EvalError<E::Error>> {
    match *expr {
        Expression::Index(i) => env.get(i).cloned().ok_or(EvalError::UnboundIndex(i)),
        Expression::Primitive(ref prim) => {
            saturate(&prim.name, types::arity(&prim.tp), Vec::new(), evaluator)
        }
        Expression::Invented(ref inv) => eval_in(&inv.body, &VecDeque::new(), evaluator),
        Expression::Abstraction(ref body) => Ok(Value::Closure {
            body: body.as_ref(),
            env: env.clone(),
        }),
        Expression::Application(ref f, ref x) => {
            let f = eval_in(f, env, evaluator)?;
            let x = eval_in(x, env, evaluator)?;
            apply(f, x, evaluator)
        }
    }
}

fn apply<'a, E: Evaluator>(
    f: Value<'a, E::Space>,
    x: Value<'a, E::Space>,
    evaluator: &E,
) -> Result<Value<'a, E::Space>, EvalError<E::Error>> {
    match f {
        Value::Closure { body, mut env } => {
            env.push_front(x);
            eval_in(body, &env, evaluator)
        }
        Value::Partial {
            name,
            arity,
            mut args,
        } => match x {
            Value::Data(v) => {
                args.push(v);
                saturate(name, arity, args, evaluator)
            }
            _ => Err(EvalError::HigherOrderArgument(String::from(name))),
        },
        Value::Data(_) => Err(EvalError::NotAFunction),
    }
}

fn saturate<'a, E: Evaluator>(
    name: &'a str,
    arity: usize,
    args: Vec<E::Space>,
    evaluator: &E,
) -> Result<Value<'a, E::Space>, EvalError<E::Error>> {
    if args.len() == arity {
        evaluator
            .evaluate(name, &args)
            .map(Value::Data)
            .map_err(EvalError::Primitive)
    } else {
        Ok(Value::Partial { name, arity, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    fn arith(primitive: &str, inps: &[i32]) -> Result<i32, String> {
        match primitive {
            "0" => Ok(0),
            "1" => Ok(1),
            "+" => Ok(inps[0] + inps[1]),
            "-" => Ok(inps[0] - inps[1]),
            p => Err(format!("unknown primitive {}", p)),
        }
    }

    fn prim(name: &str) -> Expression {
        match name {
            "+" | "-" => Expression::primitive(name, ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
            _ => Expression::primitive(name, ptp!(int)),
        }
    }

    #[test]
    fn applies_inputs_in_order() {
        // (λ (λ (- $1 $0)))
        let expr = Expression::Abstraction(Box::new(Expression::Abstraction(Box::new(
            Expression::apply(prim("-"), vec![Expression::Index(1), Expression::Index(0)]),
        ))));
        let eval = SimpleEvaluator::of(arith);
        assert_eq!(expr.eval(&eval, &[10, 3]), Ok(7));
    }

    #[test]
    fn inventions_and_local_closures() {
        let incr = Expression::invented(Expression::apply(prim("+"), vec![prim("1")])).unwrap();
        // (λ ((λ (#(+ 1) $0)) (#(+ 1) $0)))
        let inner = Expression::Abstraction(Box::new(Expression::apply(
            incr.clone(),
            vec![Expression::Index(0)],
        )));
        let expr = Expression::Abstraction(Box::new(Expression::apply(
            inner,
            vec![Expression::apply(incr, vec![Expression::Index(0)])],
        )));
        let eval = SimpleEvaluator::of(arith);
        assert_eq!(expr.eval(&eval, &[1]), Ok(3));
    }

    #[test]
    fn reports_unsaturated_and_unbound() {
        let eval = SimpleEvaluator::of(arith);
        assert_eq!(prim("+").eval(&eval, &[1]), Err(EvalError::NotAValue));
        assert_eq!(
            Expression::Index(0).eval(&eval, &[]),
            Err(EvalError::UnboundIndex(0))
        );
        assert_eq!(prim("1").eval(&eval, &[1]), Err(EvalError::NotAFunction));
    }
}
