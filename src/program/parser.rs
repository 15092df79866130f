use thiserror::Error;
use winnow::{
    ascii::{digit1, multispace0},
    combinator::{alt, delimited, preceded, repeat},
    prelude::*,
    token::take_while,
};

use super::Expression;
use crate::grammar::Grammar;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("could not parse: {0}")]
    Syntax(String),
    #[error("primitive {0} is not in the grammar")]
    UnknownPrimitive(String),
    #[error("invention {0} is not in the grammar")]
    UnknownInvention(String),
    #[error("abstraction must have exactly one body")]
    MalformedAbstraction,
    #[error("empty application")]
    EmptyApplication,
}

#[derive(Debug)]
enum Item {
    Index(usize),
    Atom(String),
    List(Vec<Item>),
    Invented(Box<Item>),
}
impl Item {
    fn into_expression(self, grammar: &Grammar) -> Result<Expression, ParseError> {
        match self {
            Item::Index(i) => Ok(Expression::Index(i)),
            Item::Atom(name) => grammar
                .productions()
                .iter()
                .map(|p| &p.expr)
                .find(|e| matches!(e, Expression::Primitive(prim) if prim.name == name))
                .cloned()
                .ok_or(ParseError::UnknownPrimitive(name)),
            Item::Invented(body) => {
                let body = body.into_expression(grammar)?;
                grammar
                    .productions()
                    .iter()
                    .map(|p| &p.expr)
                    .find(|e| matches!(e, Expression::Invented(inv) if inv.body == body))
                    .cloned()
                    .ok_or_else(|| ParseError::UnknownInvention(body.to_string()))
            }
            Item::List(items) => {
                let mut items = items.into_iter();
                match items.next() {
                    None => Err(ParseError::EmptyApplication),
                    Some(Item::Atom(ref s)) if is_lambda(s) => {
                        let body = items.next().ok_or(ParseError::MalformedAbstraction)?;
                        if items.next().is_some() {
                            return Err(ParseError::MalformedAbstraction);
                        }
                        let body = body.into_expression(grammar)?;
                        Ok(Expression::Abstraction(Box::new(body)))
                    }
                    Some(f) => {
                        let f = f.into_expression(grammar)?;
                        let xs = items
                            .map(|x| x.into_expression(grammar))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(Expression::apply(f, xs))
                    }
                }
            }
        }
    }
}

fn is_lambda(s: &str) -> bool {
    s == "λ" || s == "lambda"
}

fn atom_char(c: char) -> bool {
    !c.is_whitespace() && c != '(' && c != ')'
}

fn parse_index(input: &mut &str) -> PResult<Item> {
    preceded("$", digit1.try_map(str::parse::<usize>))
        .map(Item::Index)
        .parse_next(input)
}

fn parse_atom(input: &mut &str) -> PResult<Item> {
    take_while(1.., atom_char)
        .map(|s: &str| Item::Atom(s.to_owned()))
        .parse_next(input)
}

fn parse_list(input: &mut &str) -> PResult<Item> {
    delimited(
        "(",
        repeat(0.., delimited(multispace0, parse_item, multispace0)),
        ")",
    )
    .map(Item::List)
    .parse_next(input)
}

fn parse_invented(input: &mut &str) -> PResult<Item> {
    preceded("#", parse_item)
        .map(|body| Item::Invented(Box::new(body)))
        .parse_next(input)
}

fn parse_item(input: &mut &str) -> PResult<Item> {
    alt((parse_invented, parse_list, parse_index, parse_atom)).parse_next(input)
}

/// Read the canonical form of an expression, resolving names against the grammar.
pub fn parse(grammar: &Grammar, input: &str) -> Result<Expression, ParseError> {
    match delimited(multispace0, parse_item, multispace0).parse(input) {
        Ok(item) => item.into_expression(grammar),
        Err(err) => Err(ParseError::Syntax(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polytype::{ptp, tp};

    fn grammar() -> Grammar {
        let plus = Expression::primitive("+", ptp!(@arrow[tp!(int), tp!(int), tp!(int)]));
        let one = Expression::primitive("1", ptp!(int));
        let incr = Expression::invented(Expression::apply(plus.clone(), vec![one.clone()]))
            .unwrap();
        Grammar::from_productions(0.0, vec![(0.0, plus), (0.0, one), (0.0, incr)]).unwrap()
    }

    #[test]
    fn parse_accepts_both_lambda_spellings() {
        let g = grammar();
        let a = parse(&g, "(λ (+ 1 $0))").unwrap();
        let b = parse(&g, "  (lambda (+ 1 $0)) ").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "(λ (+ 1 $0))");
    }

    #[test]
    fn parse_resolves_inventions() {
        let g = grammar();
        let expr = parse(&g, "(λ (#(+ 1) $0))").unwrap();
        let (f, _) = match expr {
            Expression::Abstraction(ref body) => body.application_parse(),
            _ => panic!("expected abstraction"),
        };
        assert!(matches!(f, Expression::Invented(_)));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let g = grammar();
        assert_eq!(
            parse(&g, "(+ 1 2)"),
            Err(ParseError::UnknownPrimitive(String::from("2")))
        );
        assert!(matches!(
            parse(&g, "#(+ $0 1)"),
            Err(ParseError::UnknownInvention(_))
        ));
        assert!(matches!(parse(&g, "(+ 1"), Err(ParseError::Syntax(_))));
        assert_eq!(
            parse(&g, "(λ 1 1)"),
            Err(ParseError::MalformedAbstraction)
        );
    }
}
