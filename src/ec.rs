//! Tasks, and a search that turns a grammar and tasks into [`Frontier`]s.
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp};
//! use ecgrammar::ec::{explore, task_by_evaluation, ECParams};
//! use ecgrammar::grammar::Grammar;
//! use ecgrammar::program::SimpleEvaluator;
//!
//! let g = Grammar::uniform(vec![
//!     ("0", ptp!(int)),
//!     ("1", ptp!(int)),
//!     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
//! ]);
//! let evaluator = SimpleEvaluator::of(|primitive: &str, inps: &[i32]| match primitive {
//!     "0" => Ok(0),
//!     "1" => Ok(1),
//!     "+" => Ok(inps[0] + inps[1]),
//!     _ => Err(()),
//! });
//! let examples = vec![(vec![1], 2), (vec![5], 6)];
//! let task = task_by_evaluation("increment", evaluator, ptp!(@arrow[tp!(int), tp!(int)]), examples);
//!
//! let params = ECParams {
//!     frontier_limit: 1,
//!     search_limit_description_length: Some(10.0),
//!     ..Default::default()
//! };
//! let frontiers = explore(&g, &params, &[task]);
//! let best = frontiers[0].best_posterior().unwrap();
//! assert_eq!(best.expr.to_string(), "(λ (+ 1 $0))");
//! ```
//!
//! [`Frontier`]: ../frontier/struct.Frontier.html

use polytype::TypeScheme;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::frontier::{Frontier, FrontierEntry};
use crate::grammar::{EnumerationParams, Grammar};
use crate::program::{Evaluator, Expression};

/// Something a program can be judged against.
///
/// The grammar never looks at the observation: it only sees the log-likelihood the
/// [`oracle`] reports.
///
/// [`oracle`]: #tymethod.oracle
pub trait Task<Observation: ?Sized>: Sync {
    fn name(&self) -> &str;
    /// The type every solution must have.
    fn request(&self) -> &TypeScheme;
    /// The log-likelihood of the task given a program. Negative infinity means the program
    /// does not solve it.
    fn oracle(&self, grammar: &Grammar, expr: &Expression) -> f64;
    fn observation(&self) -> &Observation;
}

/// Parameters for [`explore`].
///
/// [`explore`]: fn.explore.html
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ECParams {
    /// How many solutions to find for a task before its search stops. Default `10`.
    pub frontier_limit: usize,
    /// Stop searching once this much time has passed. Default `None`.
    pub search_limit_timeout: Option<Duration>,
    /// Stop searching once programs are longer than this, in nats. Default `Some(10.0)`.
    pub search_limit_description_length: Option<f64>,
    /// See [`EnumerationParams::maximum_depth`]. Default `20`.
    ///
    /// [`EnumerationParams::maximum_depth`]: ../grammar/struct.EnumerationParams.html#structfield.maximum_depth
    pub maximum_depth: u32,
}
impl Default for ECParams {
    fn default() -> Self {
        ECParams {
            frontier_limit: 10,
            search_limit_timeout: None,
            search_limit_description_length: Some(10.0),
            maximum_depth: EnumerationParams::default().maximum_depth,
        }
    }
}

/// A task whose observations are input/output examples, solved by programs that map every
/// input list to its output under `evaluator`.
///
/// The oracle is all-or-nothing: `0` if every example is hit and negative infinity otherwise.
pub fn task_by_evaluation<E, V, O>(
    name: &str,
    evaluator: E,
    request: TypeScheme,
    examples: O,
) -> impl Task<[(Vec<V>, V)]>
where
    E: Evaluator<Space = V>,
    V: PartialEq + Clone + Send + Sync,
    O: AsRef<[(Vec<V>, V)]> + Sync,
{
    EvaluationTask {
        name: String::from(name),
        evaluator,
        request,
        examples,
        marker: PhantomData,
    }
}

struct EvaluationTask<E, V, O> {
    name: String,
    evaluator: E,
    request: TypeScheme,
    examples: O,
    marker: PhantomData<fn() -> V>,
}
impl<E, V, O> Task<[(Vec<V>, V)]> for EvaluationTask<E, V, O>
where
    E: Evaluator<Space = V>,
    V: PartialEq + Clone + Send + Sync,
    O: AsRef<[(Vec<V>, V)]> + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }
    fn request(&self) -> &TypeScheme {
        &self.request
    }
    fn oracle(&self, _grammar: &Grammar, expr: &Expression) -> f64 {
        let hit = self
            .examples
            .as_ref()
            .iter()
            .all(|(inps, out)| matches!(expr.eval(&self.evaluator, inps), Ok(ref o) if o == out));
        if hit {
            0f64
        } else {
            f64::NEG_INFINITY
        }
    }
    fn observation(&self) -> &[(Vec<V>, V)] {
        self.examples.as_ref()
    }
}

/// Search for solutions to every task, returning one normalized frontier per task in the order
/// the tasks were given.
///
/// Tasks that share a request share a single enumeration, and requests are searched in
/// parallel.
pub fn explore<O, T>(grammar: &Grammar, params: &ECParams, tasks: &[T]) -> Vec<Frontier>
where
    O: Sync + ?Sized,
    T: Task<O>,
{
    let mut by_request: HashMap<&TypeScheme, Vec<(usize, &T)>> = HashMap::new();
    for (i, task) in tasks.iter().enumerate() {
        by_request
            .entry(task.request())
            .or_insert_with(Vec::new)
            .push((i, task))
    }
    let mut results: Vec<Option<Frontier>> = vec![None; tasks.len()];
    let found: Vec<(usize, Frontier)> = by_request
        .into_par_iter()
        .flat_map_iter(|(request, group)| search_request::<O, T>(grammar, params, request, group))
        .collect();
    for (i, frontier) in found {
        results[i] = Some(frontier)
    }
    results
        .into_iter()
        .zip(tasks)
        .map(|(frontier, task)| {
            frontier.unwrap_or_else(|| Frontier::empty(task.name(), task.request().clone()))
        })
        .collect()
}

struct Search<'a, T> {
    index: usize,
    task: &'a T,
    entries: Vec<FrontierEntry>,
}

fn search_request<O, T>(
    grammar: &Grammar,
    params: &ECParams,
    request: &TypeScheme,
    group: Vec<(usize, &T)>,
) -> Vec<(usize, Frontier)>
where
    O: Sync + ?Sized,
    T: Task<O>,
{
    let mut searches: Vec<Search<T>> = group
        .into_iter()
        .map(|(index, task)| Search {
            index,
            task,
            entries: Vec::new(),
        })
        .collect();
    let enumeration = EnumerationParams {
        maximum_depth: params.maximum_depth,
        upper_bound: params.search_limit_description_length,
        ..Default::default()
    };
    let start = Instant::now();
    let mut seen = 0usize;
    grammar.enumerate_with(request, &enumeration, |expr, log_prior| {
        if let Some(limit) = params.search_limit_description_length {
            // windows are not sorted internally, so later programs may still be in bounds
            if -log_prior > limit {
                return false;
            }
        }
        seen += 1;
        let mut all_full = true;
        for search in &mut searches {
            if search.entries.len() >= params.frontier_limit {
                continue;
            }
            let log_likelihood = search.task.oracle(grammar, &expr);
            if log_likelihood.is_finite() {
                debug!(task = search.task.name(), program = %expr, log_prior, "hit");
                search
                    .entries
                    .push(FrontierEntry::new(expr.clone(), log_prior, log_likelihood));
            }
            all_full &= search.entries.len() >= params.frontier_limit;
        }
        all_full
            || params
                .search_limit_timeout
                .map_or(false, |timeout| start.elapsed() >= timeout)
    });
    info!(
        request = %request,
        programs = seen,
        elapsed = ?start.elapsed(),
        "finished searching request"
    );
    searches
        .into_iter()
        .map(|search| {
            let frontier = Frontier::new(
                search.task.name(),
                request.clone(),
                search.entries,
            );
            (search.index, frontier.normalize())
        })
        .collect()
}
