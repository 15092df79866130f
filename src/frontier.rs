//! Scored candidate programs for a single task.
//!
//! A [`Frontier`] never changes in place: every operation returns a new frontier.
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp};
//! use ecgrammar::frontier::{Frontier, FrontierEntry};
//! use ecgrammar::grammar::Grammar;
//!
//! let g = Grammar::uniform(vec![
//!     ("0", ptp!(int)),
//!     ("1", ptp!(int)),
//! ]);
//! let entries = vec![
//!     FrontierEntry::new(g.parse("0").unwrap(), -2f64.ln(), 0.0),
//!     FrontierEntry::new(g.parse("1").unwrap(), -2f64.ln(), -1.0),
//! ];
//! let frontier = Frontier::new("zero-ish", ptp!(int), entries).normalize();
//!
//! let best = frontier.best_posterior().unwrap();
//! assert_eq!(best.expr.to_string(), "0");
//! let total: f64 = frontier.entries.iter().map(|e| e.log_posterior.exp()).sum();
//! assert!((total - 1.0).abs() < 1e-12);
//! ```
//!
//! [`Frontier`]: struct.Frontier.html

use itertools::Itertools;
use polytype::TypeScheme;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;

use crate::program::{Expression, InferenceError};
use crate::utils::logsumexp;

/// The default tolerance for [`Frontier::combine`].
///
/// [`Frontier::combine`]: struct.Frontier.html#method.combine
pub const DEFAULT_COMBINE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct FrontierEntry {
    pub expr: Expression,
    pub log_prior: f64,
    pub log_likelihood: f64,
    pub log_posterior: f64,
}
impl FrontierEntry {
    /// An entry whose posterior is the unnormalized joint `log_prior + log_likelihood`.
    pub fn new(expr: Expression, log_prior: f64, log_likelihood: f64) -> Self {
        FrontierEntry {
            expr,
            log_prior,
            log_likelihood,
            log_posterior: log_prior + log_likelihood,
        }
    }

    /// Highest posterior first; ties go to the smaller canonical string.
    fn rank(&self, other: &Self) -> Ordering {
        other
            .log_posterior
            .total_cmp(&self.log_posterior)
            .then_with(|| self.expr.to_string().cmp(&other.expr.to_string()))
    }
}

/// The entries found for one task, identified by its name and request type.
#[derive(Debug, Clone, PartialEq)]
pub struct Frontier {
    pub name: String,
    pub request: TypeScheme,
    pub entries: Vec<FrontierEntry>,
}

/// Two frontiers for different tasks cannot be combined.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot combine frontier for {left} ({left_request}) with frontier for {right} ({right_request})")]
pub struct FrontierMismatch {
    pub left: String,
    pub left_request: TypeScheme,
    pub right: String,
    pub right_request: TypeScheme,
}

impl Frontier {
    pub fn new(name: impl Into<String>, request: TypeScheme, entries: Vec<FrontierEntry>) -> Self {
        Frontier {
            name: name.into(),
            request,
            entries,
        }
    }

    pub fn empty(name: impl Into<String>, request: TypeScheme) -> Self {
        Frontier::new(name, request, Vec::new())
    }

    /// A frontier holding just `expr`, for a task named after it whose request is the
    /// program's own type.
    pub fn dummy(
        expr: Expression,
        log_likelihood: f64,
        log_prior: f64,
    ) -> Result<Self, InferenceError> {
        let request = expr.infer()?;
        let name = format!("<dummy: {}>", expr);
        Ok(Frontier::new(
            name,
            request,
            vec![FrontierEntry::new(expr, log_prior, log_likelihood)],
        ))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The task's total evidence: log-sum-exp of every entry's joint log-probability.
    pub fn marginal_likelihood(&self) -> f64 {
        let joints: Vec<f64> = self
            .entries
            .iter()
            .map(|e| e.log_prior + e.log_likelihood)
            .collect();
        logsumexp(&joints)
    }

    /// Posteriors relative to the marginal likelihood, most probable first.
    ///
    /// If there is no evidence at all, every posterior is negative infinity.
    pub fn normalize(&self) -> Self {
        let z = self.marginal_likelihood();
        let entries = self
            .entries
            .iter()
            .map(|e| {
                let joint = e.log_prior + e.log_likelihood;
                let log_posterior = if z == f64::NEG_INFINITY {
                    f64::NEG_INFINITY
                } else {
                    joint - z
                };
                FrontierEntry {
                    log_posterior,
                    ..e.clone()
                }
            })
            .sorted_by(FrontierEntry::rank)
            .collect();
        self.with_entries(entries)
    }

    /// The `k` entries with the highest posterior. A `k` of zero keeps everything.
    pub fn top_k(&self, k: usize) -> Self {
        if k == 0 {
            return self.clone();
        }
        let entries = self
            .entries
            .iter()
            .sorted_by(|a, b| a.rank(b))
            .take(k)
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    pub fn remove_zero_likelihood(&self) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|e| e.log_likelihood != f64::NEG_INFINITY)
            .cloned()
            .collect();
        self.with_entries(entries)
    }

    pub fn best_posterior(&self) -> Option<&FrontierEntry> {
        self.entries.iter().min_by(|a, b| a.rank(b))
    }

    /// The union of two frontiers for the same task, with at most one entry per program.
    ///
    /// Entries of `self` keep their order and entries only in `other` follow in theirs. When
    /// both frontiers hold a program, priors that differ by more than `tolerance` are reported,
    /// and likelihoods that differ by more than `tolerance` are replaced by their mean (the
    /// geometric mean of the probabilities) with the prior taken from `self`. A program listed
    /// more than once in the same frontier is represented by its first entry there.
    pub fn combine(&self, other: &Frontier, tolerance: f64) -> Result<Self, FrontierMismatch> {
        if self.name != other.name || self.request != other.request {
            return Err(FrontierMismatch {
                left: self.name.clone(),
                left_request: self.request.clone(),
                right: other.name.clone(),
                right_request: other.request.clone(),
            });
        }
        let mut theirs: HashMap<&Expression, &FrontierEntry> = HashMap::new();
        for e in &other.entries {
            theirs.entry(&e.expr).or_insert(e);
        }
        let mut averaged = false;
        let mut union: Vec<FrontierEntry> = Vec::with_capacity(self.len() + other.len());
        for e1 in self.entries.iter().unique_by(|e| e.expr.clone()) {
            let e2 = match theirs.get(&e1.expr) {
                Some(e2) => e2,
                None => {
                    union.push(e1.clone());
                    continue;
                }
            };
            if (e1.log_prior - e2.log_prior).abs() > tolerance {
                warn!(
                    task = %self.name,
                    program = %e1.expr,
                    left = e1.log_prior,
                    right = e2.log_prior,
                    "log priors differed while combining frontiers"
                );
            }
            if (e1.log_likelihood - e2.log_likelihood).abs() > tolerance {
                averaged = true;
                let log_likelihood = (e1.log_likelihood + e2.log_likelihood) / 2f64;
                union.push(FrontierEntry::new(
                    e1.expr.clone(),
                    e1.log_prior,
                    log_likelihood,
                ));
            } else {
                union.push(e1.clone());
            }
        }
        let ours: HashSet<&Expression> = self.entries.iter().map(|e| &e.expr).collect();
        union.extend(
            other
                .entries
                .iter()
                .unique_by(|e| e.expr.clone())
                .filter(|e| !ours.contains(&e.expr))
                .cloned(),
        );
        if averaged {
            warn!(
                task = %self.name,
                "log likelihoods differed for the same program; took the geometric mean of the \
                 likelihoods, which is only sound for a stochastic likelihood model"
            );
        }
        Ok(self.with_entries(union))
    }

    /// A one-line report: `MISS <name>`, or the best entry if there is one.
    pub fn summarize(&self) -> String {
        match self.best_posterior() {
            None => format!("MISS {}", self.name),
            Some(best) => format!(
                "HIT {} w/ {} ; log prior = {:.6} ; log likelihood = {:.6}",
                self.name, best.expr, best.log_prior, best.log_likelihood
            ),
        }
    }

    /// A report over many frontiers: each summary, the hit rate, and the mean description
    /// length of the best entry of every hit.
    pub fn describe(frontiers: &[Frontier]) -> String {
        let mut lines: Vec<String> = frontiers.iter().map(Frontier::summarize).collect();
        let bests: Vec<&FrontierEntry> = frontiers.iter().filter_map(|f| f.best_posterior()).collect();
        lines.push(format!("Hits {}/{} tasks", bests.len(), frontiers.len()));
        if !bests.is_empty() {
            let mean = bests.iter().map(|e| -e.log_prior).sum::<f64>() / bests.len() as f64;
            lines.push(format!(
                "Average description length of a program solving a task: {:.6} nats",
                mean
            ));
        }
        lines.join("\n")
    }

    fn with_entries(&self, entries: Vec<FrontierEntry>) -> Self {
        Frontier {
            name: self.name.clone(),
            request: self.request.clone(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::ptp;

    fn leaf(name: &str) -> Expression {
        Expression::primitive(name, ptp!(int))
    }

    #[test]
    fn ties_break_on_canonical_string() {
        let f = Frontier::new(
            "t",
            ptp!(int),
            vec![
                FrontierEntry::new(leaf("b"), -1.0, 0.0),
                FrontierEntry::new(leaf("a"), -1.0, 0.0),
                FrontierEntry::new(leaf("c"), -3.0, 0.0),
            ],
        );
        let names: Vec<String> = f.top_k(2).entries.iter().map(|e| e.expr.to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(f.best_posterior().unwrap().expr, leaf("a"));
        assert_eq!(f.top_k(0), f);
    }

    #[test]
    fn normalize_without_evidence() {
        let f = Frontier::new(
            "t",
            ptp!(int),
            vec![FrontierEntry::new(leaf("a"), -1.0, f64::NEG_INFINITY)],
        )
        .normalize();
        assert_eq!(f.entries[0].log_posterior, f64::NEG_INFINITY);
        assert!(f.remove_zero_likelihood().is_empty());
    }

    #[test]
    fn combine_rejects_other_tasks() {
        let a = Frontier::empty("a", ptp!(int));
        let b = Frontier::empty("b", ptp!(int));
        assert!(a.combine(&b, DEFAULT_COMBINE_TOLERANCE).is_err());
    }
}
