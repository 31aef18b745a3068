//! Fluent assertion API for grammars and parses
//!
//! ```ignore
//! assert_grammar(&g)
//!     .is_invalid()
//!     .has_first_first_clash(&['a'])
//!     .conflict_count(1);
//! ```

use crate::grammar::{Conflict, Grammar};
use crate::parser::Parser;
use crate::validated::ValidatedGrammar;
use crate::value::{TokenKind, Value};
use std::collections::BTreeSet;

// ============================================================================
// Entry Points
// ============================================================================

/// Create an assertion builder for a grammar
pub fn assert_grammar<V: Value, K: TokenKind>(grammar: &Grammar<V, K>) -> GrammarAssertion<'_, V, K> {
    GrammarAssertion {
        grammar,
        conflicts: grammar.conflicts(),
    }
}

/// Parse `kinds` as tokens whose value is built from their kind, and return the result
pub fn parse_kinds<V: Value, K: TokenKind>(
    grammar: &ValidatedGrammar<V, K>,
    kinds: &[K],
    value_of: impl Fn(&K) -> V,
) -> Result<V, crate::parser::ParseError<K>> {
    Parser::new(grammar).parse(kinds.iter().map(|kind| (kind.clone(), value_of(kind))))
}

// ============================================================================
// Grammar Assertions
// ============================================================================

pub struct GrammarAssertion<'a, V, K> {
    grammar: &'a Grammar<V, K>,
    conflicts: BTreeSet<Conflict<K>>,
}

impl<'a, V: Value, K: TokenKind> GrammarAssertion<'a, V, K> {
    /// Assert the grammar has no conflicts and lowers
    pub fn is_valid(self) -> Self {
        assert!(
            self.conflicts.is_empty(),
            "Expected {} to be LL(1), found conflicts: {}",
            self.grammar,
            summarize(&self.conflicts)
        );
        assert!(self.grammar.validate().is_ok());
        self
    }

    /// Assert the grammar has at least one conflict
    pub fn is_invalid(self) -> Self {
        assert!(
            !self.conflicts.is_empty(),
            "Expected {} to have conflicts, found none",
            self.grammar
        );
        self
    }

    pub fn conflict_count(self, expected: usize) -> Self {
        assert_eq!(
            self.conflicts.len(),
            expected,
            "Expected {} conflict(s), found {}: {}",
            expected,
            self.conflicts.len(),
            summarize(&self.conflicts)
        );
        self
    }

    pub fn has_both_accept_empty(self) -> Self {
        assert!(
            self.conflicts
                .iter()
                .any(|c| matches!(c, Conflict::BothAcceptEmpty { .. })),
            "Expected a both-accept-empty conflict, found: {}",
            summarize(&self.conflicts)
        );
        self
    }

    /// Assert a first/first clash on exactly `kinds`
    pub fn has_first_first_clash(self, kinds: &[K]) -> Self {
        let expected: BTreeSet<K> = kinds.iter().cloned().collect();
        assert!(
            self.conflicts.iter().any(
                |c| matches!(c, Conflict::FirstFirstClash { kinds, .. } if *kinds == expected)
            ),
            "Expected a first/first clash on {:?}, found: {}",
            expected,
            summarize(&self.conflicts)
        );
        self
    }

    /// Assert a follow clash on exactly `kinds`
    pub fn has_follow_clash(self, kinds: &[K]) -> Self {
        let expected: BTreeSet<K> = kinds.iter().cloned().collect();
        assert!(
            self.conflicts
                .iter()
                .any(|c| matches!(c, Conflict::FollowClash { kinds, .. } if *kinds == expected)),
            "Expected a follow clash on {:?}, found: {}",
            expected,
            summarize(&self.conflicts)
        );
        self
    }

    /// Assert the FIRST set is exactly `kinds`
    pub fn accepts_kinds(self, kinds: &[K]) -> Self {
        let expected: BTreeSet<K> = kinds.iter().cloned().collect();
        let actual = self.grammar.acceptable_kinds();
        assert_eq!(
            actual, expected,
            "Expected {} to accept {:?}, found {:?}",
            self.grammar, expected, actual
        );
        self
    }

    pub fn nullable_value(self, expected: V) -> Self
    where
        V: PartialEq,
    {
        let actual = self.grammar.nullable_value();
        assert_eq!(
            actual,
            Some(expected),
            "Unexpected nullable value for {}",
            self.grammar
        );
        self
    }

    pub fn not_nullable(self) -> Self {
        let actual = self.grammar.nullable_value();
        assert!(
            actual.is_none(),
            "Expected {} not to be nullable, found {:?}",
            self.grammar,
            actual
        );
        self
    }

    pub fn productive(self, expected: bool) -> Self {
        assert_eq!(
            self.grammar.is_productive(),
            expected,
            "Expected productive = {} for {}",
            expected,
            self.grammar
        );
        self
    }
}

fn summarize<K: std::fmt::Debug>(conflicts: &BTreeSet<Conflict<K>>) -> String {
    if conflicts.is_empty() {
        return "none".to_string();
    }
    conflicts
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
