//! Probabilistic typed grammars over a polymorphically-typed lambda calculus, for program
//! synthesis.
//!
//! A [`Grammar`] weighs primitives, inventions and variables. It can sample programs for a
//! requested type, score programs, enumerate them in order of description length, and gather the
//! expected-use statistics needed to re-estimate its weights from a set of [`Frontier`]s.
//!
//! Good places to start are [`Grammar`] and [`ec::explore`].
//!
//! # Examples
//!
//! ```
//! use polytype::{ptp, tp};
//! use ecgrammar::{Frontier, FrontierEntry, Grammar};
//!
//! let g = Grammar::uniform(vec![
//!     ("0", ptp!(int)),
//!     ("1", ptp!(int)),
//!     ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
//! ]);
//! let request = ptp!(@arrow[tp!(int), tp!(int)]);
//! let expr = g.parse("(λ (+ 1 $0))").unwrap();
//! let log_prior = g.log_likelihood(&request, &expr).unwrap();
//!
//! let frontier = Frontier::new("increment", request, vec![FrontierEntry::new(expr, log_prior, 0.0)]);
//! let uses = g.production_uses(&[frontier]).unwrap();
//! assert_eq!(uses[&g.parse("+").unwrap()], 1.0);
//! assert_eq!(uses[&g.parse("0").unwrap()], 0.0);
//! ```
//!
//! [`Grammar`]: grammar/struct.Grammar.html
//! [`Frontier`]: frontier/struct.Frontier.html
//! [`ec::explore`]: ec/fn.explore.html

pub mod ec;
pub mod frontier;
pub mod grammar;
pub mod program;
pub mod types;
pub mod utils;

pub use crate::ec::{explore, task_by_evaluation, ECParams, Task};
pub use crate::frontier::{Frontier, FrontierEntry, FrontierMismatch};
pub use crate::grammar::{Grammar, LikelihoodError, LikelihoodSummary, Uses};
pub use crate::program::{Evaluator, Expression, InferenceError, ParseError};
