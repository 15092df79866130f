use crossbeam_channel::bounded;
use polytype::{Context, Type, TypeScheme};
use rayon::spawn;
use serde::{Deserialize, Serialize};
use itertools::Itertools;
use std::cell::Cell;
use std::collections::VecDeque;
use std::iter;
use std::rc::Rc;
use tracing::{debug, trace};

use super::{CandidateOptions, Grammar, LinkedList};
use crate::program::{Expression, InferenceError};
use crate::types::{self, UnificationFailure};

const BUDGET_INCREMENT: f64 = 1.0;
const DEFAULT_MAXIMUM_DEPTH: u32 = 20;

/// Set once any branch of an enumeration is pruned for exceeding its budget.
type Cut = Rc<Cell<bool>>;

/// A log-prior, the context the program was derived in, and the program.
pub type Enumerated = (f64, Context, Expression);

/// Parameters for iterative-deepening enumeration.
///
/// Enumeration proceeds in description-length windows `(k·Δ, (k+1)·Δ]` for `k = 0, 1, 2, …`,
/// where `Δ` is the `budget_increment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumerationParams {
    /// The width of each description-length window, in nats. Default `1.0`.
    pub budget_increment: f64,
    /// Programs whose applications nest deeper than this are not enumerated. Default `20`.
    pub maximum_depth: u32,
    /// Stop once windows start beyond this description length. Default `None`, i.e. enumerate
    /// until the termination condition says otherwise.
    pub upper_bound: Option<f64>,
}
impl Default for EnumerationParams {
    fn default() -> Self {
        EnumerationParams {
            budget_increment: BUDGET_INCREMENT,
            maximum_depth: DEFAULT_MAXIMUM_DEPTH,
            upper_bound: None,
        }
    }
}

/// Where an application is in consuming its arguments.
#[derive(Clone)]
struct Arguments {
    /// The head of the application, consulted for symmetry breaking.
    head: Rc<Expression>,
    tps: Rc<[Type]>,
    next: usize,
}

impl Grammar {
    /// Every program for the request whose description length lies in
    /// `(lower_bound, upper_bound]`, lazily, as `(log_prior, context, program)`.
    ///
    /// Applications nested `maximum_depth - 1` deep are the limit. Applications the grammar's
    /// [`SymmetryBreaking`] forbids are skipped.
    ///
    /// [`SymmetryBreaking`]: struct.SymmetryBreaking.html
    pub fn enumeration<'a>(
        &'a self,
        ctx: &Context,
        env: &VecDeque<Type>,
        request: &Type,
        upper_bound: f64,
        lower_bound: f64,
        maximum_depth: u32,
    ) -> Box<dyn Iterator<Item = Enumerated> + 'a> {
        self.enumeration_internal(
            ctx,
            LinkedList::from_vecdeque(env),
            request.clone(),
            (lower_bound, upper_bound),
            maximum_depth,
            Cut::default(),
        )
    }

    /// Every way of applying `f` to arguments of the given types such that the arguments'
    /// combined description length lies in `(lower_bound, upper_bound]`.
    pub fn enumerate_application<'a>(
        &'a self,
        ctx: &Context,
        env: &VecDeque<Type>,
        f: Expression,
        arg_tps: Vec<Type>,
        upper_bound: f64,
        lower_bound: f64,
        maximum_depth: u32,
    ) -> Box<dyn Iterator<Item = Enumerated> + 'a> {
        let args = Arguments {
            head: Rc::new(f.clone()),
            tps: Rc::from(arg_tps),
            next: 0,
        };
        self.application_internal(
            ctx,
            LinkedList::from_vecdeque(env),
            f,
            args,
            (lower_bound, upper_bound),
            maximum_depth,
            Cut::default(),
        )
    }

    fn enumeration_internal<'a>(
        &'a self,
        ctx: &Context,
        env: Rc<LinkedList<Type>>,
        request: Type,
        budget: (f64, f64),
        depth: u32,
        cut: Cut,
    ) -> Box<dyn Iterator<Item = Enumerated> + 'a> {
        let (lower, upper) = budget;
        if depth == 1 {
            return Box::new(iter::empty());
        }
        if upper <= 0f64 {
            cut.set(true);
            return Box::new(iter::empty());
        }
        if let Some((arg, ret)) = request.as_arrow() {
            let env = LinkedList::prepend(&env, arg.clone());
            let it = self
                .enumeration_internal(ctx, env, ret.clone(), budget, depth, cut)
                .map(|(l, ctx, body)| (l, ctx, Expression::Abstraction(Box::new(body))));
            return Box::new(it);
        }
        let candidates = match self.candidates(
            &request,
            ctx,
            &env.as_vecdeque(),
            CandidateOptions::default(),
        ) {
            Ok(candidates) => candidates,
            Err(_) => return Box::new(iter::empty()),
        };
        let pruned = cut.clone();
        Box::new(
            candidates
                .into_iter()
                .filter(move |c| {
                    let within = -c.weight <= upper;
                    if !within && c.weight.is_finite() {
                        pruned.set(true);
                    }
                    within
                })
                .flat_map(move |c| {
                    let l = c.weight;
                    let args = Arguments {
                        head: Rc::new(c.expr.clone()),
                        tps: types::arguments(&c.tp).into_iter().cloned().collect(),
                        next: 0,
                    };
                    self.application_internal(
                        &c.ctx,
                        env.clone(),
                        c.expr,
                        args,
                        (lower + l, upper + l),
                        depth.saturating_sub(1),
                        cut.clone(),
                    )
                    .map(move |(arg_l, ctx, expr)| (arg_l + l, ctx, expr))
                }),
        )
    }

    fn application_internal<'a>(
        &'a self,
        ctx: &Context,
        env: Rc<LinkedList<Type>>,
        f: Expression,
        args: Arguments,
        budget: (f64, f64),
        depth: u32,
        cut: Cut,
    ) -> Box<dyn Iterator<Item = Enumerated> + 'a> {
        let (lower, upper) = budget;
        if depth == 1 {
            return Box::new(iter::empty());
        }
        if upper <= 0f64 {
            cut.set(true);
            return Box::new(iter::empty());
        }
        if args.next == args.tps.len() {
            return if lower < 0f64 && 0f64 <= upper {
                Box::new(iter::once((0f64, ctx.clone(), f)))
            } else {
                Box::new(iter::empty())
            };
        }
        let arg_tp = types::resolve(ctx, &args.tps[args.next]);
        let head = args.head.clone();
        let index = args.next;
        Box::new(
            self.enumeration_internal(ctx, env.clone(), arg_tp, (0f64, upper), depth, cut.clone())
                .filter(move |(_, _, arg)| !self.symmetry.violates(&head, index, arg))
                .flat_map(move |(arg_l, ctx, arg)| {
                    let f = Expression::Application(Box::new(f.clone()), Box::new(arg));
                    let args = Arguments {
                        next: args.next + 1,
                        ..args.clone()
                    };
                    self.application_internal(
                        &ctx,
                        env.clone(),
                        f,
                        args,
                        (lower + arg_l, upper + arg_l),
                        depth,
                        cut.clone(),
                    )
                    .map(move |(l, ctx, expr)| (l + arg_l, ctx, expr))
                }),
        )
    }

    /// Enumerate by iterative deepening, calling `termination_condition` with each program and
    /// its log-prior until it returns `true`.
    ///
    /// Returns early once a window finishes without pruning anything for its budget: every
    /// program for the request has then been enumerated.
    pub fn enumerate_with<F>(
        &self,
        request: &TypeScheme,
        params: &EnumerationParams,
        mut termination_condition: F,
    ) where
        F: FnMut(Expression, f64) -> bool,
    {
        let (ctx, tp) = types::instantiate(&Context::default(), request);
        let env = Rc::new(LinkedList::default());
        let mut lower = 0f64;
        loop {
            if let Some(limit) = params.upper_bound {
                if lower >= limit {
                    debug!(limit, "enumeration reached its description length limit");
                    return;
                }
            }
            let upper = lower + params.budget_increment;
            debug!(lower, upper, "enumerating window");
            let cut = Cut::default();
            let window = self.enumeration_internal(
                &ctx,
                env.clone(),
                tp.clone(),
                (lower, upper),
                params.maximum_depth,
                cut.clone(),
            );
            for (log_prior, _, expr) in window {
                if termination_condition(expr, log_prior) {
                    return;
                }
            }
            if !cut.get() {
                debug!(upper, "enumeration exhausted every program for the request");
                return;
            }
            lower = upper;
        }
    }

    /// Enumerate expressions for a request type in order of description length, yielding each
    /// with its log-prior. Enumeration happens on the rayon thread pool and stops once the
    /// iterator is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp};
    /// use ecgrammar::grammar::{Grammar, SymmetryBreaking};
    ///
    /// let g = Grammar::uniform(vec![
    ///     ("0", ptp!(int)),
    ///     ("1", ptp!(int)),
    ///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    /// ])
    /// .with_symmetry(SymmetryBreaking::none());
    /// let exprs: Vec<String> = g
    ///     .enumerate(ptp!(int))
    ///     .take(8)
    ///     .map(|(expr, _log_prior)| expr.to_string())
    ///     .collect();
    ///
    /// assert_eq!(
    ///     exprs,
    ///     vec![
    ///         "0",
    ///         "1",
    ///         "(+ 0 0)",
    ///         "(+ 0 1)",
    ///         "(+ 1 0)",
    ///         "(+ 1 1)",
    ///         "(+ 0 (+ 0 0))",
    ///         "(+ 0 (+ 0 1))",
    ///     ]
    /// );
    /// ```
    pub fn enumerate(&self, request: TypeScheme) -> Box<dyn Iterator<Item = (Expression, f64)>> {
        let (tx, rx) = bounded(1);
        let grammar = self.clone();
        spawn(move || {
            let termination_condition = |expr, log_prior| tx.send((expr, log_prior)).is_err();
            grammar.enumerate_with(&request, &EnumerationParams::default(), termination_condition)
        });
        Box::new(rx.into_iter())
    }

    /// Programs one local edit away from `expr`: a single subtree is replaced by any program
    /// of its type whose description length is at most `distance` more than the subtree's own.
    ///
    /// For every subtree, the edits inside its function come first, then those inside its
    /// argument (or body), then replacements of the subtree itself. Each program is listed
    /// once, at its first occurrence. A `distance` of zero or less yields just `expr`.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp};
    /// use ecgrammar::grammar::Grammar;
    ///
    /// let g = Grammar::uniform(vec![
    ///     ("0", ptp!(int)),
    ///     ("1", ptp!(int)),
    ///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    /// ]);
    /// let expr = g.parse("(+ 1 1)").unwrap();
    /// let nearby: Vec<String> = g
    ///     .enumerate_nearby(&ptp!(int), &expr, 0.5)
    ///     .unwrap()
    ///     .iter()
    ///     .map(|e| e.to_string())
    ///     .collect();
    /// assert!(nearby.contains(&String::from("(+ 0 1)")));
    /// assert!(nearby.contains(&String::from("(+ 1 0)")));
    /// assert!(!nearby.contains(&String::from("(+ (+ 1 1) 1)")));
    /// ```
    pub fn enumerate_nearby(
        &self,
        request: &TypeScheme,
        expr: &Expression,
        distance: f64,
    ) -> Result<Vec<Expression>, InferenceError> {
        if distance <= 0f64 {
            return Ok(vec![expr.clone()]);
        }
        let (mut ctx, tp) = types::instantiate(&Context::default(), request);
        let edits = self.mutations(&mut ctx, &VecDeque::new(), &tp, expr, distance)?;
        Ok(edits.into_iter().unique().collect())
    }

    fn mutations(
        &self,
        ctx: &mut Context,
        env: &VecDeque<Type>,
        tp: &Type,
        expr: &Expression,
        distance: f64,
    ) -> Result<Vec<Expression>, InferenceError> {
        let tp = types::resolve(ctx, tp);
        let mut edits = Vec::new();
        match *expr {
            Expression::Application(ref f, ref x) => {
                let x_tp = x.infer_in(ctx, env)?;
                let f_tp = f.infer_in(ctx, env)?;
                let expected = Type::arrow(x_tp.clone(), tp.clone());
                ctx.unify(&f_tp, &expected)
                    .map_err(UnificationFailure::from)?;
                edits.extend(
                    self.mutations(ctx, env, &expected, f, distance)?
                        .into_iter()
                        .map(|g| Expression::Application(Box::new(g), x.clone())),
                );
                edits.extend(
                    self.mutations(ctx, env, &x_tp, x, distance)?
                        .into_iter()
                        .map(|y| Expression::Application(f.clone(), Box::new(y))),
                );
            }
            Expression::Abstraction(ref body) => {
                let (arg, ret) = match tp.as_arrow() {
                    Some((arg, ret)) => (arg.clone(), ret.clone()),
                    None => {
                        let arg = ctx.new_variable();
                        let ret = ctx.new_variable();
                        ctx.unify(&tp, &Type::arrow(arg.clone(), ret.clone()))
                            .map_err(UnificationFailure::from)?;
                        (arg, ret)
                    }
                };
                let mut env = env.clone();
                env.push_front(arg);
                edits.extend(
                    self.mutations(ctx, &env, &ret, body, distance)?
                        .into_iter()
                        .map(|b| Expression::Abstraction(Box::new(b))),
                );
            }
            _ => (),
        }
        edits.extend(self.replacements(ctx, env, &tp, expr, distance));
        Ok(edits)
    }

    fn replacements(
        &self,
        ctx: &Context,
        env: &VecDeque<Type>,
        tp: &Type,
        expr: &Expression,
        distance: f64,
    ) -> Vec<Expression> {
        let tp = types::resolve(ctx, tp);
        match self.subtree_log_likelihood(ctx, env, &tp, expr) {
            Some(loss) => self
                .enumeration(ctx, env, &tp, distance - loss, 0f64, DEFAULT_MAXIMUM_DEPTH)
                .map(|(_, _, replacement)| replacement)
                .collect(),
            None => {
                trace!(program = %expr, request = %tp, "subtree cannot be scored; left in place");
                Vec::new()
            }
        }
    }

    /// Partial applications in function position are scored in their eta-long form.
    fn subtree_log_likelihood(
        &self,
        ctx: &Context,
        env: &VecDeque<Type>,
        tp: &Type,
        expr: &Expression,
    ) -> Option<f64> {
        if let Ok((_, summary)) = self.likelihood_summary(ctx, env, tp, expr) {
            return Some(summary.log_likelihood(self));
        }
        let n = types::arguments(tp).len();
        if n == 0 || matches!(*expr, Expression::Abstraction(_)) {
            return None;
        }
        let mut head = expr.clone();
        head.shift(n as i64);
        let body = Expression::apply(head, (0..n).rev().map(Expression::Index).collect());
        let eta = (0..n).fold(body, |b, _| Expression::Abstraction(Box::new(b)));
        self.likelihood_summary(ctx, env, tp, &eta)
            .ok()
            .map(|(_, summary)| summary.log_likelihood(self))
    }
}
