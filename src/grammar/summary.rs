use std::collections::HashMap;

use super::Grammar;
use crate::program::Expression;
use crate::utils::{logsumexp, Real};

/// The terms of a likelihood calculation for a single derivation.
///
/// Scoring a program against a grammar requires unification at every choice point. A summary
/// records what was chosen and what else could have been chosen, so the same derivation can be
/// rescored under any weighting of the same productions without unifying again.
///
/// Variables are recorded as `Index(0)`: the grammar only weighs "some variable".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LikelihoodSummary {
    /// How many times each production (or the variable class) was chosen.
    pub uses: HashMap<Expression, u32>,
    /// How many times each admissible set was the context of a choice.
    pub normalizers: HashMap<Vec<Expression>, u32>,
    /// Additive log-probability terms, such as uniform choice among admissible variables.
    pub constant: f64,
}
impl LikelihoodSummary {
    pub fn record(&mut self, actual: &Expression, possibles: Vec<Expression>, constant: f64) {
        let actual = if actual.is_index() {
            Expression::Index(0)
        } else {
            actual.clone()
        };
        self.constant += constant;
        *self.uses.entry(actual).or_insert(0) += 1;
        *self.normalizers.entry(possibles).or_insert(0) += 1;
    }

    pub fn join(&mut self, other: LikelihoodSummary) {
        self.constant += other.constant;
        for (k, v) in other.uses {
            *self.uses.entry(k).or_insert(0) += v;
        }
        for (k, v) in other.normalizers {
            *self.normalizers.entry(k).or_insert(0) += v;
        }
    }

    /// The log-probability of the summarized derivation under `grammar`'s weights.
    ///
    /// A use of a production that `grammar` lacks makes the derivation impossible; members of an
    /// admissible set that `grammar` lacks are ignored.
    pub fn log_likelihood(&self, grammar: &Grammar) -> f64 {
        self.log_likelihood_with(|expr| grammar.weight(expr))
    }

    /// Like [`log_likelihood`], but generic over the numeric type so the weights may carry more
    /// than a float.
    ///
    /// [`log_likelihood`]: #method.log_likelihood
    pub fn log_likelihood_with<R, F>(&self, weight: F) -> R
    where
        R: Real,
        F: Fn(&Expression) -> Option<R>,
    {
        let mut total = R::from_f64(self.constant);
        for (expr, &count) in &self.uses {
            match weight(expr) {
                Some(w) => total = total + R::from_f64(f64::from(count)) * w,
                None => return R::neg_infinity(),
            }
        }
        for (possibles, &count) in &self.normalizers {
            let ws: Vec<R> = possibles.iter().filter_map(&weight).collect();
            total = total - R::from_f64(f64::from(count)) * logsumexp(&ws);
        }
        total
    }
}

/// Expected production use counts across many derivations: the sufficient statistics for
/// re-estimating production weights.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Uses {
    pub actual_variables: f64,
    pub possible_variables: f64,
    pub actual: HashMap<Expression, f64>,
    pub possible: HashMap<Expression, f64>,
}
impl Uses {
    pub fn scale(&mut self, a: f64) {
        self.actual_variables *= a;
        self.possible_variables *= a;
        for v in self.actual.values_mut() {
            *v *= a;
        }
        for v in self.possible.values_mut() {
            *v *= a;
        }
    }

    pub fn merge(&mut self, other: Uses) {
        self.actual_variables += other.actual_variables;
        self.possible_variables += other.possible_variables;
        for (k, v) in other.actual {
            *self.actual.entry(k).or_insert(0f64) += v;
        }
        for (k, v) in other.possible {
            *self.possible.entry(k).or_insert(0f64) += v;
        }
    }

    /// Sum uses, each weighted by `exp(w - z)` for its log-weight `w`.
    pub fn join_from(z: f64, weighted: Vec<(f64, Uses)>) -> Uses {
        weighted
            .into_iter()
            .fold(Uses::default(), |mut total, (w, mut uses)| {
                uses.scale((w - z).exp());
                total.merge(uses);
                total
            })
    }
}
impl<'a> From<&'a LikelihoodSummary> for Uses {
    fn from(summary: &'a LikelihoodSummary) -> Self {
        let mut uses = Uses::default();
        for (expr, &count) in &summary.uses {
            if expr.is_index() {
                uses.actual_variables += f64::from(count);
            } else {
                *uses.actual.entry(expr.clone()).or_insert(0f64) += f64::from(count);
            }
        }
        for (possibles, &count) in &summary.normalizers {
            for expr in possibles {
                if expr.is_index() {
                    uses.possible_variables += f64::from(count);
                } else {
                    *uses.possible.entry(expr.clone()).or_insert(0f64) += f64::from(count);
                }
            }
        }
        uses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    fn leaf(name: &str) -> Expression {
        Expression::primitive(name, ptp!(int))
    }

    #[test]
    fn record_collapses_variables() {
        let mut summary = LikelihoodSummary::default();
        let possibles = vec![leaf("0"), Expression::Index(0)];
        summary.record(&Expression::Index(2), possibles.clone(), -(2f64.ln()));
        summary.record(&leaf("0"), possibles.clone(), 0.0);
        assert_eq!(summary.uses[&Expression::Index(0)], 1);
        assert_eq!(summary.uses[&leaf("0")], 1);
        assert_eq!(summary.normalizers[&possibles], 2);
        assert_eq!(summary.constant, -(2f64.ln()));
    }

    #[test]
    fn missing_use_is_impossible() {
        let mut summary = LikelihoodSummary::default();
        summary.record(&leaf("0"), vec![leaf("0"), leaf("1")], 0.0);
        let weights = |e: &Expression| if e == &leaf("1") { Some(0f64) } else { None };
        assert_eq!(summary.log_likelihood_with(weights), f64::NEG_INFINITY);
        let weights = |_: &Expression| Some(0f64);
        let ll: f64 = summary.log_likelihood_with(weights);
        assert!((ll + 2f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn uses_from_summary_and_join() {
        let mut summary = LikelihoodSummary::default();
        let plus = Expression::primitive("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)]));
        let possibles = vec![plus.clone(), leaf("0"), Expression::Index(0)];
        summary.record(&plus, possibles.clone(), 0.0);
        summary.record(&leaf("0"), possibles.clone(), 0.0);
        summary.record(&Expression::Index(1), possibles, 0.0);
        let uses = Uses::from(&summary);
        assert_eq!(uses.actual_variables, 1.0);
        assert_eq!(uses.possible_variables, 3.0);
        assert_eq!(uses.actual[&plus], 1.0);
        assert_eq!(uses.possible[&leaf("0")], 3.0);

        let z = crate::utils::logsumexp(&[-1.0, -2.0]);
        let joined = Uses::join_from(z, vec![(-1.0, uses.clone()), (-2.0, uses.clone())]);
        assert!((joined.actual_variables - 1.0).abs() < 1e-12);
        assert!((joined.possible[&plus] - 3.0).abs() < 1e-12);
    }
}
