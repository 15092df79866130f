use polytype::{Context, Type, TypeScheme};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;
use tracing::trace;

use super::{CandidateOptions, Grammar, LinkedList};
use crate::program::Expression;
use crate::types;

/// How many programs [`Grammar::best_first_enumeration`] collects unless told otherwise.
///
/// [`Grammar::best_first_enumeration`]: struct.Grammar.html#method.best_first_enumeration
pub const DEFAULT_BEST_FIRST_LIMIT: usize = 1000;

type Env = Rc<LinkedList<Type>>;
type Continuation = Rc<LinkedList<Frame>>;

/// What to do with a finished sub-program.
#[derive(Debug, Clone)]
enum Frame {
    /// Wrap it in an abstraction.
    Abstract,
    /// Apply `f` to it, then continue with the remaining argument types.
    Apply {
        f: Expression,
        remaining: VecDeque<Type>,
        env: Env,
    },
}

/// A head has been chosen; its arguments are yet to be filled in.
struct Pending {
    f: Expression,
    remaining: VecDeque<Type>,
    ctx: Context,
    env: Env,
    k: Continuation,
}

enum Item {
    Complete(Expression),
    Pending(Pending),
}

struct Queued {
    cost: f64,
    seq: u64,
    item: Item,
}
impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for Queued {}
impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Queued {
    /// Cheapest first, then first queued.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Programs for a request in order of non-decreasing description length, found by a global
/// best-first search.
///
/// Memory grows with the number of partial programs waiting to be expanded. The search never
/// ends on its own for requests with infinitely many programs: stop iterating to cancel it.
///
/// Symmetry breaking does not apply here.
pub struct BestFirst<'a> {
    grammar: &'a Grammar,
    queue: BinaryHeap<Queued>,
    seq: u64,
}
impl<'a> BestFirst<'a> {
    fn push(&mut self, cost: f64, item: Item) {
        self.queue.push(Queued {
            cost,
            seq: self.seq,
            item,
        });
        self.seq += 1;
    }

    /// Queue every candidate for the request.
    fn expand(&mut self, cost: f64, request: &Type, ctx: &Context, env: &Env, k: &Continuation) {
        if let Some((arg, ret)) = request.as_arrow() {
            let env = LinkedList::prepend(env, arg.clone());
            let k = LinkedList::prepend(k, Frame::Abstract);
            return self.expand(cost, ret, ctx, &env, &k);
        }
        let candidates = match self.grammar.candidates(
            request,
            ctx,
            &env.as_vecdeque(),
            CandidateOptions::default(),
        ) {
            Ok(candidates) => candidates,
            Err(err) => {
                trace!(%err, "best-first branch is a dead end");
                return;
            }
        };
        for c in candidates {
            let remaining = types::arguments(&c.tp).into_iter().cloned().collect();
            let pending = Pending {
                f: c.expr,
                remaining,
                ctx: c.ctx,
                env: env.clone(),
                k: k.clone(),
            };
            self.push(cost - c.weight, Item::Pending(pending));
        }
    }

    /// Move on to the next argument of a pending application, or finish it.
    fn step(&mut self, cost: f64, pending: Pending) {
        let Pending {
            f,
            mut remaining,
            ctx,
            env,
            k,
        } = pending;
        match remaining.pop_front() {
            Some(arg_tp) => {
                let arg_tp = types::resolve(&ctx, &arg_tp);
                let k = LinkedList::prepend(
                    &k,
                    Frame::Apply {
                        f,
                        remaining,
                        env: env.clone(),
                    },
                );
                self.expand(cost, &arg_tp, &ctx, &env, &k)
            }
            None => self.resume(cost, ctx, f, &k),
        }
    }

    /// Hand a finished sub-program to its continuation.
    fn resume(&mut self, cost: f64, ctx: Context, expr: Expression, k: &Continuation) {
        match k.uncons() {
            None => self.push(cost, Item::Complete(expr)),
            Some((Frame::Abstract, rest)) => {
                self.resume(cost, ctx, Expression::Abstraction(Box::new(expr)), rest)
            }
            Some((Frame::Apply { f, remaining, env }, rest)) => {
                let pending = Pending {
                    f: Expression::Application(Box::new(f.clone()), Box::new(expr)),
                    remaining: remaining.clone(),
                    ctx,
                    env: env.clone(),
                    k: rest.clone(),
                };
                self.step(cost, pending)
            }
        }
    }
}
impl<'a> Iterator for BestFirst<'a> {
    /// A program and its log-prior.
    type Item = (Expression, f64);
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(Queued { cost, item, .. }) = self.queue.pop() {
            match item {
                Item::Complete(expr) => return Some((expr, -cost)),
                Item::Pending(pending) => self.step(cost, pending),
            }
        }
        None
    }
}

impl Grammar {
    /// Search for programs for the request, most probable first.
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
    /// let exprs: Vec<String> = g
    ///     .best_first(&ptp!(int))
    ///     .take(4)
    ///     .map(|(expr, _log_prior)| expr.to_string())
    ///     .collect();
    /// assert_eq!(exprs, vec!["0", "1", "(+ 0 0)", "(+ 0 1)"]);
    /// ```
    pub fn best_first(&self, request: &TypeScheme) -> BestFirst<'_> {
        let (ctx, tp) = types::instantiate(&Context::default(), request);
        let mut search = BestFirst {
            grammar: self,
            queue: BinaryHeap::new(),
            seq: 0,
        };
        let env = Rc::new(LinkedList::default());
        let k = Rc::new(LinkedList::default());
        search.expand(0f64, &tp, &ctx, &env, &k);
        search
    }

    /// The first `limit` programs of a [`best_first`] search.
    ///
    /// [`best_first`]: #method.best_first
    pub fn best_first_enumeration(
        &self,
        request: &TypeScheme,
        limit: usize,
    ) -> Vec<(Expression, f64)> {
        self.best_first(request).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    #[test]
    fn queue_pops_cheapest_then_oldest() {
        let mut heap = BinaryHeap::new();
        for (seq, cost) in [(0, 2.0), (1, 1.0), (2, 1.0), (3, 0.5)].iter().copied() {
            heap.push(Queued {
                cost,
                seq,
                item: Item::Complete(Expression::Index(seq as usize)),
            });
        }
        let order: Vec<u64> = std::iter::from_fn(|| heap.pop().map(|q| q.seq)).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn abstractions_wrap_completed_bodies() {
        let g = Grammar::uniform(vec![("0", ptp!(int))]);
        let request = ptp!(@arrow[tp!(int), tp!(bool), tp!(int)]);
        let found = g.best_first_enumeration(&request, 10);
        let shown: Vec<String> = found.iter().map(|(e, _)| e.to_string()).collect();
        assert_eq!(shown, vec!["(λ (λ 0))", "(λ (λ $1))"]);
        for (expr, log_prior) in &found {
            assert!((g.log_likelihood(&request, expr).unwrap() - log_prior).abs() < 1e-9);
        }
    }
}
