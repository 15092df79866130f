use polytype::{ptp, tp};
use std::collections::HashSet;

use ecgrammar::frontier::{Frontier, FrontierEntry, DEFAULT_COMBINE_TOLERANCE};
use ecgrammar::grammar::Grammar;
use ecgrammar::program::Expression;

fn arith() -> Grammar {
    Grammar::uniform(vec![
        ("0", ptp!(int)),
        ("1", ptp!(int)),
        ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
    ])
}

fn entry(g: &Grammar, program: &str, log_prior: f64, log_likelihood: f64) -> FrontierEntry {
    FrontierEntry::new(g.parse(program).unwrap(), log_prior, log_likelihood)
}

fn programs(f: &Frontier) -> HashSet<String> {
    f.entries.iter().map(|e| e.expr.to_string()).collect()
}

#[test]
fn frontier_normalize_is_a_distribution() {
    let g = arith();
    let f = Frontier::new(
        "t",
        ptp!(int),
        vec![
            entry(&g, "1", -1.1, -0.3),
            entry(&g, "0", -1.1, 0.0),
            entry(&g, "(+ 1 1)", -3.3, 0.0),
        ],
    );
    let normalized = f.normalize();
    let total: f64 = normalized.entries.iter().map(|e| e.log_posterior.exp()).sum();
    assert!((total - 1.0).abs() < 1e-12);
    let order: Vec<String> = normalized.entries.iter().map(|e| e.expr.to_string()).collect();
    assert_eq!(order, vec!["0", "1", "(+ 1 1)"]);
    assert_eq!(normalized.normalize(), normalized);
    assert!((f.marginal_likelihood() - normalized.marginal_likelihood()).abs() < 1e-12);
}

#[test]
fn frontier_top_k() {
    let g = arith();
    let f = Frontier::new(
        "t",
        ptp!(int),
        vec![
            entry(&g, "(+ 1 1)", -3.3, 0.0),
            entry(&g, "1", -1.1, 0.0),
            entry(&g, "0", -1.1, 0.0),
        ],
    );
    let top = f.top_k(2);
    let order: Vec<String> = top.entries.iter().map(|e| e.expr.to_string()).collect();
    assert_eq!(order, vec!["0", "1"]);
    assert_eq!(f.top_k(10).len(), 3);
    assert_eq!(f.top_k(0), f);
}

#[test]
fn frontier_combine_is_a_keyed_union() {
    let g = arith();
    let a = Frontier::new(
        "t",
        ptp!(int),
        vec![entry(&g, "0", -1.1, 0.0), entry(&g, "1", -1.1, 0.0)],
    );
    let b = Frontier::new(
        "t",
        ptp!(int),
        vec![entry(&g, "1", -1.1, 0.0), entry(&g, "(+ 1 1)", -3.3, 0.0)],
    );
    let ab = a.combine(&b, DEFAULT_COMBINE_TOLERANCE).unwrap();
    let ba = b.combine(&a, DEFAULT_COMBINE_TOLERANCE).unwrap();
    assert_eq!(ab.len(), 3);
    assert_eq!(programs(&ab), programs(&ba));

    let aa = a.combine(&a, DEFAULT_COMBINE_TOLERANCE).unwrap();
    assert_eq!(aa, a);
}

#[test]
fn frontier_combine_averages_differing_likelihoods() {
    let g = arith();
    let a = Frontier::new("t", ptp!(int), vec![entry(&g, "0", -1.0, -2.0)]);
    let b = Frontier::new("t", ptp!(int), vec![entry(&g, "0", -5.0, -4.0)]);
    let combined = a.combine(&b, DEFAULT_COMBINE_TOLERANCE).unwrap();
    assert_eq!(combined.len(), 1);
    let e = &combined.entries[0];
    assert_eq!(e.log_prior, -1.0);
    assert_eq!(e.log_likelihood, -3.0);
    assert_eq!(e.log_posterior, -4.0);

    // within tolerance, the first frontier's entry is kept as is
    let c = Frontier::new("t", ptp!(int), vec![entry(&g, "0", -1.0, -2.005)]);
    let combined = a.combine(&c, DEFAULT_COMBINE_TOLERANCE).unwrap();
    assert_eq!(combined.entries[0].log_likelihood, -2.0);
}

#[test]
fn frontier_combine_keeps_the_first_of_repeated_programs() {
    let g = arith();
    let a = Frontier::new(
        "t",
        ptp!(int),
        vec![entry(&g, "0", -1.0, -2.0), entry(&g, "0", -1.0, -7.0)],
    );
    let b = Frontier::new(
        "t",
        ptp!(int),
        vec![
            entry(&g, "0", -1.0, -2.0),
            entry(&g, "0", -1.0, -8.0),
            entry(&g, "1", -1.0, -1.0),
            entry(&g, "1", -1.0, -9.0),
        ],
    );
    let combined = a.combine(&b, DEFAULT_COMBINE_TOLERANCE).unwrap();
    let shown: Vec<(String, f64)> = combined
        .entries
        .iter()
        .map(|e| (e.expr.to_string(), e.log_likelihood))
        .collect();
    assert_eq!(
        shown,
        vec![(String::from("0"), -2.0), (String::from("1"), -1.0)]
    );
}

#[test]
fn frontier_combine_needs_the_same_task() {
    let a = Frontier::empty("t", ptp!(int));
    let b = Frontier::empty("t", ptp!(bool));
    assert!(a.combine(&b, DEFAULT_COMBINE_TOLERANCE).is_err());
}

#[test]
fn frontier_remove_zero_likelihood() {
    let g = arith();
    let f = Frontier::new(
        "t",
        ptp!(int),
        vec![
            entry(&g, "0", -1.1, f64::NEG_INFINITY),
            entry(&g, "1", -1.1, -0.5),
        ],
    );
    let kept = f.remove_zero_likelihood();
    let expected: HashSet<String> = vec![String::from("1")].into_iter().collect();
    assert_eq!(programs(&kept), expected);
    assert_eq!(f.len(), 2);
}

#[test]
fn frontier_summaries() {
    let g = arith();
    let hit = Frontier::new("zero", ptp!(int), vec![entry(&g, "0", -1.5, 0.0)]);
    let miss = Frontier::empty("two", ptp!(int));
    assert_eq!(
        hit.summarize(),
        "HIT zero w/ 0 ; log prior = -1.500000 ; log likelihood = 0.000000"
    );
    assert_eq!(miss.summarize(), "MISS two");
    assert!(miss.best_posterior().is_none());

    let other = Frontier::new("one", ptp!(int), vec![entry(&g, "1", -2.5, 0.0)]);
    let description = Frontier::describe(&[hit, miss, other]);
    let lines: Vec<&str> = description.lines().collect();
    assert_eq!(lines.len(), 5);
    assert_eq!(lines[3], "Hits 2/3 tasks");
    assert_eq!(
        lines[4],
        "Average description length of a program solving a task: 2.000000 nats"
    );
}

#[test]
fn frontier_dummy() {
    let g = arith();
    let expr = g.parse("(λ (+ $0 1))").unwrap();
    let f = Frontier::dummy(expr.clone(), 0.0, -2.0).unwrap();
    assert_eq!(f.name, "<dummy: (λ (+ $0 1))>");
    assert_eq!(f.request, ptp!(@arrow[tp!(int), tp!(int)]));
    assert_eq!(f.entries, vec![FrontierEntry::new(expr, -2.0, 0.0)]);

    let bad = Expression::apply(g.parse("0").unwrap(), vec![g.parse("1").unwrap()]);
    assert!(Frontier::dummy(bad, 0.0, 0.0).is_err());
}

#[test]
fn frontier_rescored_under_a_grammar() {
    let g = arith();
    let request = ptp!(@arrow[tp!(int), tp!(int)]);
    let f = Frontier::new(
        "t",
        request.clone(),
        vec![entry(&g, "(λ (+ $0 1))", 0.0, -0.5)],
    );
    let rescored = g.rescore_frontier(&f).unwrap();
    let expected = -3.0 * 4f64.ln();
    assert!((rescored.entries[0].log_prior - expected).abs() < 1e-12);
    assert_eq!(rescored.entries[0].log_likelihood, -0.5);
}
