//! Property-based agreement with a backtracking reference parser
//!
//! Each grammar is written twice: once with zipll combinators, once with chumsky. For every
//! token sequence both must agree on acceptance and, when they accept, on the produced value.
//! Transforms reverse their input so that any mis-ordered fold shows up as a different string.

use chumsky::error::Simple;
use chumsky::primitive::{empty, end, just};
use chumsky::recursive::recursive;
use chumsky::Parser as _;
use proptest::prelude::*;
use zipll::{Grammar, Parser as Driver, ValidatedGrammar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Kind {
    Open,
    Close,
    Comma,
    Atom,
}

use Kind::*;

type G = Grammar<String, Kind>;

fn sym(kind: Kind) -> String {
    match kind {
        Open => "(",
        Close => ")",
        Comma => ",",
        Atom => "x",
    }
    .to_string()
}

fn reverse(value: String) -> String {
    value.chars().rev().collect()
}

fn el(kind: Kind) -> G {
    Grammar::element(kind)
}

// ============================================================================
// Grammars under test
// ============================================================================

/// S -> map(Open S Close) S | ε
fn parens() -> G {
    G::recursive(|s| {
        let group = G::sequence(G::sequence(el(Open), s.clone()), el(Close)).map(reverse);
        G::disjunction(G::sequence(group, s), G::success(String::new()))
    })
}

/// list -> item (Comma item)*
/// item -> Atom | map(Open list? Close)
fn list() -> G {
    G::recursive(|list| {
        let group = G::sequence(
            G::sequence(el(Open), G::optional(list, String::new())),
            el(Close),
        )
        .map(reverse);
        let item = G::disjunction(el(Atom), group);
        G::sequence(
            item.clone(),
            G::many(G::sequence(el(Comma), item), String::new()),
        )
    })
}

// ============================================================================
// Reference parsers
// ============================================================================

fn reference_parens() -> impl chumsky::Parser<Kind, String, Error = Simple<Kind>> {
    recursive(|s| {
        just(Open)
            .then(s.clone())
            .then(just(Close))
            .map(|((open, inner), close): ((Kind, String), Kind)| {
                reverse(sym(open) + &inner + &sym(close))
            })
            .then(s)
            .map(|(group, rest): (String, String)| group + &rest)
            .or(empty().to(String::new()))
    })
    .then_ignore(end())
}

fn reference_list() -> impl chumsky::Parser<Kind, String, Error = Simple<Kind>> {
    recursive(|list| {
        let group = just(Open)
            .then(list.or_not())
            .then(just(Close))
            .map(|((open, inner), close): ((Kind, Option<String>), Kind)| {
                reverse(sym(open) + &inner.unwrap_or_default() + &sym(close))
            });
        let item = just(Atom).map(sym).or(group);
        item.clone()
            .then(
                just(Comma)
                    .map(sym)
                    .then(item)
                    .map(|(comma, item): (String, String)| comma + &item)
                    .repeated(),
            )
            .map(|(first, rest): (String, Vec<String>)| first + &rest.concat())
    })
    .then_ignore(end())
}

fn run(validated: &ValidatedGrammar<String, Kind>, kinds: &[Kind]) -> Option<String> {
    Driver::new(validated)
        .parse(kinds.iter().map(|kind| (*kind, sym(*kind))))
        .ok()
}

// ============================================================================
// Strategies
// ============================================================================

fn kind() -> impl Strategy<Value = Kind> {
    prop_oneof![Just(Open), Just(Close), Just(Comma), Just(Atom)]
}

fn join(items: Vec<Vec<Kind>>) -> Vec<Kind> {
    let mut tokens = Vec::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            tokens.push(Comma);
        }
        tokens.extend(item);
    }
    tokens
}

fn balanced() -> impl Strategy<Value = Vec<Kind>> {
    prop::collection::vec(proptest::bool::ANY, 0..16).prop_map(|opens| {
        let mut tokens = Vec::new();
        let mut depth = 0usize;
        for open in opens {
            if open || depth == 0 {
                tokens.push(Open);
                depth += 1;
            } else {
                tokens.push(Close);
                depth -= 1;
            }
        }
        tokens.extend(std::iter::repeat(Close).take(depth));
        tokens
    })
}

fn item() -> impl Strategy<Value = Vec<Kind>> {
    Just(vec![Atom]).prop_recursive(4, 32, 3, |item| {
        prop::collection::vec(item, 0..3).prop_map(|items| {
            let mut tokens = vec![Open];
            tokens.extend(join(items));
            tokens.push(Close);
            tokens
        })
    })
}

fn well_formed_list() -> impl Strategy<Value = Vec<Kind>> {
    prop::collection::vec(item(), 1..4).prop_map(join)
}

proptest! {
    #[test]
    fn parens_agree_on_arbitrary_input(kinds in prop::collection::vec(kind(), 0..12)) {
        let validated = parens().validate().unwrap();
        let reference = reference_parens().parse(kinds.clone()).ok();
        prop_assert_eq!(run(&validated, &kinds), reference);
    }

    #[test]
    fn parens_accept_balanced_input(kinds in balanced()) {
        let validated = parens().validate().unwrap();
        let ours = run(&validated, &kinds);
        prop_assert!(ours.is_some(), "rejected {:?}", kinds);
        prop_assert_eq!(ours, reference_parens().parse(kinds.clone()).ok());
    }

    #[test]
    fn list_agrees_on_arbitrary_input(kinds in prop::collection::vec(kind(), 0..12)) {
        let validated = list().validate().unwrap();
        let reference = reference_list().parse(kinds.clone()).ok();
        prop_assert_eq!(run(&validated, &kinds), reference);
    }

    #[test]
    fn list_accepts_well_formed_input(kinds in well_formed_list()) {
        let validated = list().validate().unwrap();
        let ours = run(&validated, &kinds);
        prop_assert!(ours.is_some(), "rejected {:?}", kinds);
        prop_assert_eq!(ours, reference_list().parse(kinds.clone()).ok());
    }
}

#[test]
fn test_reference_and_grammar_agree_on_sample() {
    let kinds = vec![Open, Atom, Comma, Open, Close, Close, Comma, Atom];
    let validated = list().validate().unwrap();
    let ours = run(&validated, &kinds);
    assert_eq!(ours, Some(")(),x(,x".to_string()));
    assert_eq!(ours, reference_list().parse(kinds).ok());
}
