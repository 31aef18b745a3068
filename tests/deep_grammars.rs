//! Generated grammars thousands of nodes wide or deep
//!
//! Property solving, validation, rendering, parsing and dropping all have to cope with these
//! without running out of call stack.

use std::collections::{BTreeSet, VecDeque};
use zipll::{Grammar, Parser};

type G = Grammar<VecDeque<u32>, u32>;

fn el(kind: u32) -> G {
    Grammar::element(kind)
}

fn tokens(kinds: impl IntoIterator<Item = u32>) -> Vec<(u32, VecDeque<u32>)> {
    kinds
        .into_iter()
        .map(|kind| (kind, VecDeque::from([kind])))
        .collect()
}

/// `((0 | 1) | 2) | ...`, the shape a keyword table folded into alternatives takes.
fn keywords(count: u32) -> G {
    (1..count).fold(el(0), |acc, kind| acc.or(el(kind)))
}

/// `0 ~ (1 ~ (2 ~ ...))`
fn right_nested_sequence(count: u32) -> G {
    (0..count - 1)
        .rev()
        .fold(el(count - 1), |acc, kind| G::sequence(el(kind), acc))
}

/// `((0 ~ 1) ~ 2) ~ ...`
fn left_nested_sequence(count: u32) -> G {
    (1..count).fold(el(0), |acc, kind| G::sequence(acc, el(kind)))
}

#[test]
fn test_wide_keyword_disjunction_first_set() {
    let g = keywords(4000);
    let expected: BTreeSet<u32> = (0..4000).collect();
    assert_eq!(g.acceptable_kinds(), expected);
    assert!(g.is_conflict_free());
    assert!(g.nullable_value().is_none());
}

#[test]
fn test_wide_keyword_disjunction_validates_and_parses() {
    let validated = keywords(2000).validate().unwrap();
    let parser = Parser::new(&validated);
    assert_eq!(parser.parse(tokens([1999])), Ok(VecDeque::from([1999])));
    assert_eq!(parser.parse(tokens([0])), Ok(VecDeque::from([0])));
    assert!(parser.parse(tokens([2000])).is_err());
}

#[test]
fn test_duplicate_keyword_is_reported() {
    let g = keywords(3000).or(el(0));
    let error = g.validate().unwrap_err();
    assert_eq!(error.conflicts().len(), 1);
    let report = error.report();
    assert!(report.contains("both alternatives can start with {0}"));
    assert!(report.contains(" | 2999) | 0)"));
}

#[test]
fn test_deep_right_nested_sequence() {
    let validated = right_nested_sequence(3000).validate().unwrap();
    let result = Parser::new(&validated).parse(tokens(0..3000));
    assert_eq!(result, Ok((0..3000).collect::<VecDeque<u32>>()));
}

#[test]
fn test_deep_left_nested_sequence() {
    let g = left_nested_sequence(3000);
    assert_eq!(g.acceptable_kinds(), BTreeSet::from([0]));
    let validated = g.validate().unwrap();
    let result = Parser::new(&validated).parse(tokens(0..3000));
    assert_eq!(result, Ok((0..3000).collect::<VecDeque<u32>>()));
}

#[test]
fn test_wide_disjunction_renders() {
    let text = keywords(3000).to_string();
    assert!(text.starts_with(&format!("{}0 | 1)", "(".repeat(2999))));
    assert!(text.ends_with(" | 2999)"));
}

#[test]
fn test_long_repetition_collects_every_item() {
    let validated = G::many(el(7), VecDeque::new()).validate().unwrap();
    let result = Parser::new(&validated).parse(tokens(std::iter::repeat(7).take(100_000)));
    let items = result.unwrap();
    assert_eq!(items.len(), 100_000);
    assert!(items.iter().all(|kind| *kind == 7));
}

#[test]
fn test_dropping_a_deep_grammar() {
    let g = right_nested_sequence(100_000);
    let text = g.to_string();
    assert!(text.starts_with("(0 ~ (1 ~ (2 ~ "));
    assert!(text.ends_with(&format!("(99998 ~ 99999{}", ")".repeat(99_999))));
    drop(g);
}
