use polytype::{ptp, tp, Context, Type};

use ecgrammar::grammar::Grammar;
use ecgrammar::types;
use ecgrammar::program::{EvalError, Expression, ParseError, SimpleEvaluator};

fn lists() -> Grammar {
    Grammar::uniform(vec![
        ("empty", ptp!(0; list(tp!(0)))),
        ("cons", ptp!(0; @arrow[tp!(0), tp!(list(tp!(0))), tp!(list(tp!(0)))])),
        ("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)])),
        ("1", ptp!(int)),
    ])
}

#[derive(Debug, Clone, PartialEq)]
enum Space {
    Num(i32),
    List(Vec<i32>),
}

fn evaluate(name: &str, inps: &[Space]) -> Result<Space, String> {
    match (name, inps) {
        ("empty", []) => Ok(Space::List(vec![])),
        ("1", []) => Ok(Space::Num(1)),
        ("+", [Space::Num(x), Space::Num(y)]) => Ok(Space::Num(x + y)),
        ("cons", [Space::Num(x), Space::List(xs)]) => {
            let mut xs = xs.clone();
            xs.insert(0, *x);
            Ok(Space::List(xs))
        }
        _ => Err(format!("bad call to {}", name)),
    }
}

#[test]
fn program_display_round_trips_through_parse() {
    let g = lists();
    for s in &[
        "(λ (cons $0 empty))",
        "(λ (λ (cons (+ $0 1) $1)))",
        "((λ $0) 1)",
        "(cons 1 (cons 1 empty))",
    ] {
        let expr = g.parse(s).unwrap();
        assert_eq!(&expr.to_string(), s);
    }
}

#[test]
fn program_parse_errors() {
    let g = lists();
    assert_eq!(
        g.parse("(cons 2 empty)"),
        Err(ParseError::UnknownPrimitive(String::from("2")))
    );
    assert_eq!(g.parse("()"), Err(ParseError::EmptyApplication));
    assert_eq!(g.parse("(λ $0 $0)"), Err(ParseError::MalformedAbstraction));
    assert!(matches!(g.parse("#(+ 1)"), Err(ParseError::UnknownInvention(_))));
    assert!(matches!(g.parse("(+ 1"), Err(ParseError::Syntax(_))));
}

#[test]
fn program_infers_polymorphic_types() {
    let g = lists();
    let expr = g.parse("(λ (cons $0 empty))").unwrap();
    let (_, t) = types::instantiate(&Context::default(), &expr.infer().unwrap());
    let (arg, ret) = t.as_arrow().unwrap();
    assert!(matches!(arg, Type::Variable(_)));
    assert_eq!(ret, &types::list(arg.clone()));
    let expr = g.parse("(λ (cons (+ $0 1) empty))").unwrap();
    assert_eq!(expr.infer().unwrap(), ptp!(@arrow[tp!(int), tp!(list(tp!(int)))]));
}

#[test]
fn program_evaluates_with_inventions() {
    let g = lists();
    let incr = g.parse("(λ (+ $0 1))").unwrap();
    let g = g.with_invention(incr, 0.0).unwrap();
    let expr = g.parse("(λ (λ (cons (#(λ (+ $0 1)) $0) $1)))").unwrap();
    let eval = SimpleEvaluator::of(evaluate);
    let result = expr.eval(&eval, &[Space::List(vec![7]), Space::Num(2)]);
    assert_eq!(result, Ok(Space::List(vec![3, 7])));

    let stripped = expr.strip_invented();
    assert_eq!(stripped.to_string(), "(λ (λ (cons ((λ (+ $0 1)) $0) $1)))");
    assert_eq!(stripped.eval(&eval, &[Space::List(vec![]), Space::Num(0)]), Ok(Space::List(vec![1])));
}

#[test]
fn program_evaluation_errors() {
    let g = lists();
    let eval = SimpleEvaluator::of(evaluate);
    let expr = g.parse("(λ (+ $0 1))").unwrap();
    assert_eq!(
        expr.eval(&eval, &[Space::List(vec![])]),
        Err(EvalError::Primitive(String::from("bad call to +")))
    );
    assert_eq!(expr.eval(&eval, &[]), Err(EvalError::NotAValue));
    let unbound = Expression::Index(2);
    assert_eq!(unbound.eval(&eval, &[]), Err(EvalError::UnboundIndex(2)));
}
