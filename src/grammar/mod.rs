//! (representation) Weighted grammars over typed programs.
//!
//! A [`Grammar`] assigns a log-weight to each of its productions (primitives and inventions) and a
//! single log-weight to "use some variable in scope". At any point in a derivation, the
//! productions whose return type unifies with the requested type compete according to those
//! weights. The grammar can sample programs, score programs, and enumerate programs in order of
//! description length.
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp};
//! use ecgrammar::grammar::Grammar;
//!
//! let g = Grammar::uniform(vec![
//!     ("0", ptp!(int)),
//!     ("1", ptp!(int)),
//!     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
//! ]);
//! let request = ptp!(@arrow[tp!(int), tp!(int)]);
//!
//! // the most probable programs for a request come first
//! let (expr, log_prior) = g.enumerate(request.clone()).next().unwrap();
//! assert_eq!(expr.to_string(), "(λ 0)");
//! assert!((log_prior + 4f64.ln()).abs() < 1e-9);
//! assert!((g.log_likelihood(&request, &expr).unwrap() - log_prior).abs() < 1e-9);
//! ```
//!
//! [`Grammar`]: struct.Grammar.html

mod best_first;
mod enumerator;
mod failure;
mod summary;
mod symmetry;
pub use self::best_first::{BestFirst, DEFAULT_BEST_FIRST_LIMIT};
pub use self::enumerator::{Enumerated, EnumerationParams};
pub use self::failure::{FailureReport, GrammarFailure};
pub use self::summary::{LikelihoodSummary, Uses};
pub use self::symmetry::SymmetryBreaking;

use itertools::Itertools;
use polytype::{Context, Type, TypeScheme};
use rand::Rng;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, trace};

use crate::frontier::{Frontier, FrontierEntry};
use crate::program::{self, Expression, InferenceError, Invented, ParseError};
use crate::types;
use crate::utils::{logsumexp, weighted_index};

const DEFAULT_FAILURE_DIRECTORY: &str = "failures";

/// A grammar rule: a leaf expression with its type scheme and log-weight.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    pub log_probability: f64,
    pub tp: TypeScheme,
    pub expr: Expression,
}

/// An immutable weighted rule set.
///
/// Builder methods such as [`remove_productions`] and [`with_symmetry`] return new grammars.
///
/// [`remove_productions`]: #method.remove_productions
/// [`with_symmetry`]: #method.with_symmetry
#[derive(Debug, Clone)]
pub struct Grammar {
    log_variable: f64,
    productions: Vec<Production>,
    positions: HashMap<Expression, usize>,
    symmetry: SymmetryBreaking,
    failure_directory: Option<PathBuf>,
}
impl Grammar {
    fn new(log_variable: f64, productions: Vec<Production>) -> Self {
        let positions = productions
            .iter()
            .enumerate()
            .map(|(i, p)| (p.expr.clone(), i))
            .collect();
        Grammar {
            log_variable,
            productions,
            positions,
            symmetry: SymmetryBreaking::default(),
            failure_directory: Some(PathBuf::from(DEFAULT_FAILURE_DIRECTORY)),
        }
    }

    /// A uniform distribution over primitives and the variable class.
    pub fn uniform(primitives: Vec<(&str, TypeScheme)>) -> Self {
        let productions = primitives
            .into_iter()
            .map(|(name, tp)| Production {
                log_probability: 0f64,
                expr: Expression::primitive(name, tp.clone()),
                tp,
            })
            .collect();
        Grammar::new(0f64, productions)
    }

    /// Make a grammar from expressions and their relative log-weights.
    ///
    /// Primitives and inventions bring their own type schemes; any other expression has its type
    /// inferred.
    pub fn from_productions(
        log_variable: f64,
        productions: Vec<(f64, Expression)>,
    ) -> Result<Self, InferenceError> {
        let productions = productions
            .into_iter()
            .map(|(log_probability, expr)| {
                let tp = match expr.leaf_type() {
                    Some(tp) => tp.clone(),
                    None => expr.infer()?,
                };
                Ok(Production {
                    log_probability,
                    tp,
                    expr,
                })
            })
            .collect::<Result<Vec<_>, InferenceError>>()?;
        Ok(Grammar::new(log_variable, productions))
    }

    /// Like [`from_productions`], with every weight zero.
    ///
    /// [`from_productions`]: #method.from_productions
    pub fn uniform_over(exprs: Vec<Expression>) -> Result<Self, InferenceError> {
        Grammar::from_productions(0f64, exprs.into_iter().map(|e| (0f64, e)).collect())
    }

    pub fn remove_productions(&self, exprs: &[Expression]) -> Self {
        let productions = self
            .productions
            .iter()
            .filter(|p| !exprs.contains(&p.expr))
            .cloned()
            .collect();
        self.rebuild(self.log_variable, productions)
    }

    /// Register a new invented expression with the given log-weight.
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
    /// let body = g.parse("(+ 1)").unwrap();
    /// let g = g.with_invention(body, -0.5).unwrap();
    /// let p = g.productions().last().unwrap();
    /// assert_eq!(p.expr.to_string(), "#(+ 1)");
    /// assert_eq!(p.tp, ptp!(@arrow[tp!(int), tp!(int)]));
    /// assert_eq!(p.log_probability, -0.5);
    /// ```
    pub fn with_invention(
        &self,
        body: Expression,
        log_probability: f64,
    ) -> Result<Self, InferenceError> {
        let tp = body.infer()?;
        let expr = Expression::Invented(Arc::new(Invented {
            body,
            tp: tp.clone(),
        }));
        let mut productions = self.productions.clone();
        productions.push(Production {
            log_probability,
            tp,
            expr,
        });
        Ok(self.rebuild(self.log_variable, productions))
    }

    pub fn with_symmetry(mut self, symmetry: SymmetryBreaking) -> Self {
        self.symmetry = symmetry;
        self
    }

    /// Where scoring failures are exported. `None` disables exporting.
    pub fn with_failure_directory(mut self, directory: Option<PathBuf>) -> Self {
        self.failure_directory = directory;
        self
    }

    /// Reweigh productions by arity: each production gets `-ln(n) - arity * expected_size`, where
    /// `n` is how many productions share its arity, and the variable class is weighed like a
    /// leaf.
    pub fn smartly_initialize(&self, expected_size: f64) -> Self {
        let arities: Vec<usize> = self.productions.iter().map(|p| types::arity(&p.tp)).collect();
        let frequencies = arities.iter().copied().counts();
        let log_variable = -(frequencies.get(&0).copied().unwrap_or(1) as f64).ln();
        let productions = self
            .productions
            .iter()
            .zip(arities)
            .map(|(p, arity)| Production {
                log_probability: -(frequencies[&arity] as f64).ln() - arity as f64 * expected_size,
                ..p.clone()
            })
            .collect();
        self.rebuild(log_variable, productions)
    }

    fn rebuild(&self, log_variable: f64, productions: Vec<Production>) -> Self {
        Grammar {
            symmetry: self.symmetry.clone(),
            failure_directory: self.failure_directory.clone(),
            ..Grammar::new(log_variable, productions)
        }
    }

    pub fn log_variable(&self) -> f64 {
        self.log_variable
    }
    pub fn productions(&self) -> &[Production] {
        &self.productions
    }
    pub fn symmetry(&self) -> &SymmetryBreaking {
        &self.symmetry
    }
    pub fn failure_directory(&self) -> Option<&Path> {
        self.failure_directory.as_deref()
    }
    pub fn len(&self) -> usize {
        self.productions.len()
    }
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    /// The log-weight of a production. Any index is the variable class.
    pub fn weight(&self, expr: &Expression) -> Option<f64> {
        if expr.is_index() {
            Some(self.log_variable)
        } else {
            self.positions
                .get(expr)
                .map(|&i| self.productions[i].log_probability)
        }
    }

    /// Parse the canonical string form of an expression, resolving primitive names and
    /// inventions against this grammar.
    pub fn parse(&self, inp: &str) -> Result<Expression, ParseError> {
        program::parse(self, inp)
    }

    /// Everything that could be produced at a point in a derivation with the given request and
    /// environment.
    ///
    /// Productions come first, in grammar order, followed by admissible variables. Admissible
    /// variables split the variable weight uniformly.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp, Context};
    /// use ecgrammar::grammar::{CandidateOptions, Grammar};
    /// use std::collections::VecDeque;
    ///
    /// let g = Grammar::uniform(vec![
    ///     ("0", ptp!(int)),
    ///     ("not", ptp!(@arrow[tp!(bool), tp!(bool)])),
    ///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    /// ]);
    /// let env: VecDeque<_> = vec![tp!(int), tp!(bool), tp!(int)].into();
    /// let options = CandidateOptions { probabilities: true, ..Default::default() };
    /// let candidates = g.candidates(&tp!(int), &Context::default(), &env, options).unwrap();
    ///
    /// let shown: Vec<_> = candidates.iter().map(|c| c.expr.to_string()).collect();
    /// assert_eq!(shown, vec!["0", "+", "$0", "$2"]);
    /// let total: f64 = candidates.iter().map(|c| c.weight).sum();
    /// assert!((total - 1.0).abs() < 1e-12);
    /// ```
    pub fn candidates(
        &self,
        request: &Type,
        ctx: &Context,
        env: &VecDeque<Type>,
        options: CandidateOptions,
    ) -> Result<Vec<Candidate>, NoCandidates> {
        let mut candidates = Vec::with_capacity(self.productions.len() + env.len());
        for p in &self.productions {
            let (ctx, tp) = types::instantiate(ctx, &p.tp);
            if let Ok(ctx) = types::unify(&ctx, types::returns(&tp), request) {
                let tp = types::resolve(&ctx, &tp);
                if options.leaf_only && types::is_arrow(&tp) {
                    continue;
                }
                candidates.push(Candidate {
                    weight: p.log_probability,
                    expr: p.expr.clone(),
                    tp,
                    ctx,
                })
            }
        }
        let variables_start = candidates.len();
        for (i, tp) in env.iter().enumerate() {
            if let Ok(ctx) = types::unify(ctx, types::returns(tp), request) {
                let tp = types::resolve(&ctx, tp);
                if options.leaf_only && types::is_arrow(&tp) {
                    continue;
                }
                candidates.push(Candidate {
                    weight: self.log_variable,
                    expr: Expression::Index(i),
                    tp,
                    ctx,
                })
            }
        }
        let n_variables = candidates.len() - variables_start;
        if n_variables > 0 {
            let log_n = (n_variables as f64).ln();
            for c in &mut candidates[variables_start..] {
                c.weight -= log_n;
            }
        }
        if candidates.is_empty() {
            return Err(NoCandidates(request.clone()));
        }
        if options.normalize || options.probabilities {
            let weights: Vec<f64> = candidates.iter().map(|c| c.weight).collect();
            let z = logsumexp(&weights);
            for c in &mut candidates {
                c.weight -= z;
                if options.probabilities {
                    c.weight = c.weight.exp();
                }
            }
        }
        Ok(candidates)
    }

    /// Like [`candidates`], keyed by expression.
    ///
    /// [`candidates`]: #method.candidates
    pub fn candidate_table(
        &self,
        request: &Type,
        ctx: &Context,
        env: &VecDeque<Type>,
        options: CandidateOptions,
    ) -> Result<HashMap<Expression, Candidate>, NoCandidates> {
        self.candidates(request, ctx, env, options).map(|candidates| {
            candidates
                .into_iter()
                .map(|c| (c.expr.clone(), c))
                .collect()
        })
    }

    /// Sample a program for the request, retrying from scratch whenever a derivation runs into
    /// a point where nothing can be produced.
    ///
    /// This does not return if no program of at most `maximum_depth` inhabits the request.
    ///
    /// # Examples
    ///
    /// ```
    /// use polytype::{ptp, tp};
    /// use ecgrammar::grammar::Grammar;
    /// use rand::{rngs::SmallRng, SeedableRng};
    ///
    /// let g = Grammar::uniform(vec![
    ///     ("0", ptp!(int)),
    ///     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    /// ]);
    /// let request = ptp!(@arrow[tp!(int), tp!(int)]);
    /// let rng = &mut SmallRng::seed_from_u64(42);
    /// let expr = g.sample(&request, 3, rng);
    /// assert!(g.log_likelihood(&request, &expr).unwrap().is_finite());
    /// ```
    pub fn sample<R: Rng>(
        &self,
        request: &TypeScheme,
        maximum_depth: u32,
        rng: &mut R,
    ) -> Expression {
        loop {
            match self.try_sample(request, maximum_depth, rng) {
                Ok(expr) => return expr,
                Err(err) => trace!(%err, "sampling hit a dead end; retrying"),
            }
        }
    }

    /// A single attempt at [`sample`].
    ///
    /// [`sample`]: #method.sample
    pub fn try_sample<R: Rng>(
        &self,
        request: &TypeScheme,
        maximum_depth: u32,
        rng: &mut R,
    ) -> Result<Expression, NoCandidates> {
        let (ctx, request) = types::instantiate(&Context::default(), request);
        self.sample_internal(&ctx, &VecDeque::new(), &request, maximum_depth, rng)
            .map(|(_, expr)| expr)
    }
    fn sample_internal<R: Rng>(
        &self,
        ctx: &Context,
        env: &VecDeque<Type>,
        request: &Type,
        maximum_depth: u32,
        rng: &mut R,
    ) -> Result<(Context, Expression), NoCandidates> {
        if let Some((arg, ret)) = request.as_arrow() {
            let mut env = env.clone();
            env.push_front(arg.clone());
            let (ctx, body) = self.sample_internal(ctx, &env, ret, maximum_depth, rng)?;
            return Ok((ctx, Expression::Abstraction(Box::new(body))));
        }
        let options = CandidateOptions {
            normalize: true,
            probabilities: true,
            leaf_only: maximum_depth <= 1,
        };
        let mut candidates = self.candidates(request, ctx, env, options)?;
        let weights: Vec<f64> = candidates.iter().map(|c| c.weight).collect();
        let chosen = weighted_index(rng, &weights).ok_or_else(|| NoCandidates(request.clone()))?;
        let Candidate {
            mut expr,
            tp,
            mut ctx,
            ..
        } = candidates.swap_remove(chosen);
        for arg_tp in types::arguments(&tp) {
            let arg_tp = types::resolve(&ctx, arg_tp);
            let (new_ctx, arg) =
                self.sample_internal(&ctx, env, &arg_tp, maximum_depth.saturating_sub(1), rng)?;
            ctx = new_ctx;
            expr = Expression::Application(Box::new(expr), Box::new(arg));
        }
        Ok((ctx, expr))
    }

    /// Summarize the derivation of `expr` for the request, mirroring how it would be sampled.
    pub fn likelihood_summary(
        &self,
        ctx: &Context,
        env: &VecDeque<Type>,
        request: &Type,
        expr: &Expression,
    ) -> Result<(Context, LikelihoodSummary), LikelihoodError> {
        if let Some((arg, ret)) = request.as_arrow() {
            return match *expr {
                Expression::Abstraction(ref body) => {
                    let mut env = env.clone();
                    env.push_front(arg.clone());
                    self.likelihood_summary(ctx, &env, ret, body)
                }
                _ => Err(LikelihoodError::NotAbstraction {
                    request: request.clone(),
                    expr: expr.clone(),
                }),
            };
        }
        let (f, xs) = expr.application_parse();
        let not_candidate = || LikelihoodError::NotCandidate {
            request: request.clone(),
            expr: f.clone(),
        };
        let options = CandidateOptions {
            normalize: false,
            ..Default::default()
        };
        let candidates = self
            .candidates(request, ctx, env, options)
            .map_err(|_| not_candidate())?;

        let n_variables = candidates.iter().filter(|c| c.expr.is_index()).count();
        let mut possibles: Vec<Expression> = candidates
            .iter()
            .filter(|c| !c.expr.is_index())
            .map(|c| c.expr.clone())
            .collect();
        if n_variables > 0 {
            possibles.push(Expression::Index(0));
        }

        let Candidate { tp, mut ctx, .. } = candidates
            .into_iter()
            .find(|c| &c.expr == f)
            .ok_or_else(not_candidate)?;
        let constant = if f.is_index() {
            -(n_variables as f64).ln()
        } else {
            0f64
        };
        let mut summary = LikelihoodSummary::default();
        summary.record(f, possibles, constant);

        let arg_tps = types::arguments(&tp);
        if arg_tps.len() != xs.len() {
            return Err(LikelihoodError::Failure(GrammarFailure {
                request: request.clone(),
                tp: tp.clone(),
                expr: expr.clone(),
                given: xs.len(),
                expected: arg_tps.len(),
                environment: env.iter().cloned().collect(),
            }));
        }
        for (arg_tp, x) in arg_tps.into_iter().zip(xs) {
            let arg_tp = types::resolve(&ctx, arg_tp);
            let (new_ctx, arg_summary) = self.likelihood_summary(&ctx, env, &arg_tp, x)?;
            ctx = new_ctx;
            summary.join(arg_summary);
        }
        Ok((ctx, summary))
    }

    /// Summarize a closed program, starting from an empty context and environment.
    ///
    /// Failures are logged with their context. A [`GrammarFailure`] is also exported as JSON to
    /// the grammar's failure directory before it is returned.
    ///
    /// [`GrammarFailure`]: struct.GrammarFailure.html
    pub fn closed_likelihood_summary(
        &self,
        request: &TypeScheme,
        expr: &Expression,
    ) -> Result<LikelihoodSummary, LikelihoodError> {
        let (ctx, tp) = types::instantiate(&Context::default(), request);
        match self.likelihood_summary(&ctx, &VecDeque::new(), &tp, expr) {
            Ok((_, summary)) => Ok(summary),
            Err(err) => {
                error!(%err, request = %tp, program = %expr, "could not score program");
                if let LikelihoodError::Failure(ref failure) = err {
                    self.export_failure(failure, &tp, expr);
                }
                Err(err)
            }
        }
    }

    fn export_failure(&self, failure: &GrammarFailure, request: &Type, expr: &Expression) {
        let directory = match self.failure_directory {
            Some(ref directory) => directory,
            None => return,
        };
        let report = FailureReport {
            error: failure.to_string(),
            grammar: self.to_string(),
            request: request.to_string(),
            program: expr.to_string(),
            environment: failure.environment.iter().map(|t| t.to_string()).collect(),
        };
        match failure::export(directory, &report) {
            Ok(path) => error!(path = %path.display(), "exported grammar failure"),
            Err(err) => error!(%err, "could not export grammar failure"),
        }
    }

    /// The log-probability of deriving `expr` for the request.
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
    /// let request = ptp!(@arrow[tp!(int), tp!(int), tp!(int)]);
    ///
    /// let expr = g.parse("(λ (λ (+ $0 $1)))").unwrap();
    /// let ll = g.log_likelihood(&request, &expr).unwrap();
    /// assert!((ll - -5.545177444479561).abs() < 1e-12);
    ///
    /// let expr = g.parse("(λ (λ (+ (+ $0 1) $1)))").unwrap();
    /// let ll = g.log_likelihood(&request, &expr).unwrap();
    /// assert!((ll - -8.317766166719343).abs() < 1e-12);
    /// ```
    pub fn log_likelihood(
        &self,
        request: &TypeScheme,
        expr: &Expression,
    ) -> Result<f64, LikelihoodError> {
        self.closed_likelihood_summary(request, expr)
            .map(|summary| summary.log_likelihood(self))
    }

    /// Replace every entry's prior with its log-probability under this grammar.
    pub fn rescore_frontier(&self, frontier: &Frontier) -> Result<Frontier, LikelihoodError> {
        let entries = frontier
            .entries
            .iter()
            .map(|e| {
                let log_prior = self.log_likelihood(&frontier.request, &e.expr)?;
                Ok(FrontierEntry::new(e.expr.clone(), log_prior, e.log_likelihood))
            })
            .collect::<Result<Vec<_>, LikelihoodError>>()?;
        Ok(Frontier::new(
            frontier.name.clone(),
            frontier.request.clone(),
            entries,
        ))
    }

    /// Summaries of every entry, each paired with its joint log-probability under this grammar.
    fn scored(&self, frontier: &Frontier) -> Result<Vec<(f64, LikelihoodSummary)>, LikelihoodError> {
        frontier
            .entries
            .iter()
            .map(|e| {
                let summary = self.closed_likelihood_summary(&frontier.request, &e.expr)?;
                let log_prior = summary.log_likelihood(self);
                Ok((log_prior + e.log_likelihood, summary))
            })
            .collect()
    }

    fn scored_frontiers(
        &self,
        frontiers: &[Frontier],
    ) -> Result<Vec<(f64, Vec<(f64, LikelihoodSummary)>)>, LikelihoodError> {
        let scored = frontiers
            .par_iter()
            .filter(|f| !f.is_empty())
            .map(|f| self.scored(f))
            .collect::<Result<Vec<_>, LikelihoodError>>()?;
        Ok(scored
            .into_iter()
            .filter_map(|entries| {
                let joints: Vec<f64> = entries.iter().map(|&(w, _)| w).collect();
                let z = logsumexp(&joints);
                if z == f64::NEG_INFINITY {
                    None
                } else {
                    Some((z, entries))
                }
            })
            .collect())
    }

    /// The expected number of times each production (and, under `Index(0)`, the variable class)
    /// is used, weighting every frontier entry by its posterior under this grammar.
    ///
    /// Frontiers with no evidence (empty, or every likelihood zero) contribute nothing.
    pub fn production_uses(
        &self,
        frontiers: &[Frontier],
    ) -> Result<HashMap<Expression, f64>, LikelihoodError> {
        let mut uses: HashMap<Expression, f64> = self
            .productions
            .iter()
            .map(|p| (p.expr.clone(), 0f64))
            .collect();
        uses.insert(Expression::Index(0), 0f64);
        for (z, entries) in self.scored_frontiers(frontiers)? {
            for (w, summary) in entries {
                let posterior = (w - z).exp();
                for (expr, count) in summary.uses {
                    *uses.entry(expr).or_insert(0f64) += f64::from(count) * posterior;
                }
            }
        }
        Ok(uses)
    }

    /// Expected actual and possible uses across frontiers, each entry weighted by its posterior.
    pub fn expected_uses(&self, frontiers: &[Frontier]) -> Result<Uses, LikelihoodError> {
        let mut total = Uses::default();
        for (z, entries) in self.scored_frontiers(frontiers)? {
            let weighted = entries
                .into_iter()
                .map(|(w, summary)| (w, Uses::from(&summary)))
                .collect();
            total.merge(Uses::join_from(z, weighted));
        }
        Ok(total)
    }
}
impl fmt::Display for Grammar {
    /// One production per line: log-weight, type, expression. The variable class comes first,
    /// then primitives and then inventions, each by descending weight.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.6}\tt0\t$_", self.log_variable)?;
        let sorted = self.productions.iter().sorted_by(|a, b| {
            let a_invented = !matches!(a.expr, Expression::Primitive(_));
            let b_invented = !matches!(b.expr, Expression::Primitive(_));
            a_invented.cmp(&b_invented).then_with(|| {
                b.log_probability
                    .partial_cmp(&a.log_probability)
                    .unwrap_or(Ordering::Equal)
            })
        });
        for p in sorted {
            write!(f, "\n{:.6}\t{}\t{}", p.log_probability, p.tp, p.expr)?;
        }
        Ok(())
    }
}

/// Something that could be produced at a point in a derivation.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// A log-probability, or a probability if [`CandidateOptions::probabilities`] was set.
    ///
    /// [`CandidateOptions::probabilities`]: struct.CandidateOptions.html#structfield.probabilities
    pub weight: f64,
    pub expr: Expression,
    /// The candidate's full type, resolved under `ctx`.
    pub tp: Type,
    /// The context after unifying the candidate's return type with the request.
    pub ctx: Context,
}

/// How [`Grammar::candidates`] should report weights.
///
/// [`Grammar::candidates`]: struct.Grammar.html#method.candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateOptions {
    /// Subtract the log-sum-exp of all weights. Default `true`.
    pub normalize: bool,
    /// Report normalized probabilities rather than log-probabilities. Implies `normalize`.
    /// Default `false`.
    pub probabilities: bool,
    /// Only admit candidates that take no arguments. Default `false`.
    pub leaf_only: bool,
}
impl Default for CandidateOptions {
    fn default() -> Self {
        CandidateOptions {
            normalize: true,
            probabilities: false,
            leaf_only: false,
        }
    }
}

/// Nothing in the grammar or environment can be produced for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no candidates for request {0}")]
pub struct NoCandidates(pub Type);

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LikelihoodError {
    #[error("request {request} is an arrow, but {expr} is not an abstraction")]
    NotAbstraction { request: Type, expr: Expression },
    #[error("{expr} cannot be produced for request {request}")]
    NotCandidate { request: Type, expr: Expression },
    #[error(transparent)]
    Failure(#[from] GrammarFailure),
}

/// A persistent environment: extending it shares the tail.
#[derive(Debug, Clone)]
pub(crate) struct LinkedList<T: Clone>(Option<(T, Rc<LinkedList<T>>)>);
impl<T: Clone> LinkedList<T> {
    pub(crate) fn prepend(lst: &Rc<LinkedList<T>>, v: T) -> Rc<LinkedList<T>> {
        Rc::new(LinkedList(Some((v, lst.clone()))))
    }
    pub(crate) fn uncons(&self) -> Option<(&T, &Rc<LinkedList<T>>)> {
        self.0.as_ref().map(|(v, next)| (v, next))
    }
    pub(crate) fn as_vecdeque(&self) -> VecDeque<T> {
        let mut out = VecDeque::new();
        let mut lst = self;
        while let Some((ref v, ref next)) = lst.0 {
            out.push_back(v.clone());
            lst = next;
        }
        out
    }
    pub(crate) fn from_vecdeque(items: &VecDeque<T>) -> Rc<LinkedList<T>> {
        items
            .iter()
            .rev()
            .fold(Rc::new(LinkedList::default()), |lst, v| {
                LinkedList::prepend(&lst, v.clone())
            })
    }
}
impl<T: Clone> Default for LinkedList<T> {
    fn default() -> Self {
        LinkedList(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    fn arith() -> Grammar {
        Grammar::uniform(vec![
            ("0", ptp!(int)),
            ("1", ptp!(int)),
            ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
        ])
    }

    #[test]
    fn linked_list_round_trips() {
        let items: VecDeque<u8> = vec![3, 1, 4].into();
        let lst = LinkedList::from_vecdeque(&items);
        assert_eq!(lst.as_vecdeque(), items);
        let lst = LinkedList::prepend(&lst, 9);
        assert_eq!(lst.as_vecdeque(), VecDeque::from(vec![9, 3, 1, 4]));
    }

    #[test]
    fn weight_treats_every_index_as_the_variable_class() {
        let g = arith();
        assert_eq!(g.weight(&Expression::Index(4)), Some(0.0));
        assert_eq!(g.weight(&g.parse("+").unwrap()), Some(0.0));
        let other = Expression::primitive("+", ptp!(@arrow[tp!(bool), tp!(bool)]));
        assert_eq!(g.weight(&other), None);
    }

    #[test]
    fn arity_mismatch_is_a_grammar_failure() {
        let g = arith().with_failure_directory(None);
        let partial = g.parse("(+ 1)").unwrap();
        match g.closed_likelihood_summary(&ptp!(int), &partial) {
            Err(LikelihoodError::Failure(failure)) => {
                assert_eq!(failure.given, 1);
                assert_eq!(failure.expected, 2);
            }
            other => panic!("expected grammar failure, got {:?}", other),
        }
    }

    #[test]
    fn display_orders_primitives_by_weight() {
        let g = Grammar::from_productions(
            -1.0,
            vec![
                (-2.0, Expression::primitive("0", ptp!(int))),
                (-0.5, Expression::primitive("1", ptp!(int))),
            ],
        )
        .unwrap();
        let shown = g.to_string();
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(lines[0], "-1.000000\tt0\t$_");
        assert_eq!(lines[1], "-0.500000\tint\t1");
        assert_eq!(lines[2], "-2.000000\tint\t0");
    }
}
