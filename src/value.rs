//! Capability contracts the engine needs from user types.
//!
//! The engine is generic over two types:
//!
//!     Token kinds (`K`): opaque tags naming a class of tokens. Grammars are indexed by kind, so
//!     kinds must be comparable and hashable. They are also required to be ordered so that kind
//!     sets (and therefore conflict reports) come out in a stable order.
//!
//!     Values (`V`): the parse result threaded through the grammar. The only structural
//!     operation the engine performs on values is [Value::prepend], used whenever two adjacent
//!     pieces of a sequence have both produced a value.
//!
//! Tokens pair a kind with a value and are produced by an external lexer.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::hash::Hash;

/// Parse result threaded through a grammar.
pub trait Value: Clone + Debug + 'static {
    /// Combines `left` (produced first) with `self` (produced after it).
    ///
    /// Implementations must preserve left-to-right order: the result stands for `left`
    /// followed by `self`.
    fn prepend(self, left: Self) -> Self;
}

impl Value for () {
    fn prepend(self, _left: Self) -> Self {}
}

impl Value for String {
    fn prepend(self, mut left: Self) -> Self {
        left.push_str(&self);
        left
    }
}

/// Appends `self` onto `left`, which costs the length of `self`.
///
/// A right-recursive repetition such as [Grammar::many](crate::Grammar::many) folds its
/// accumulated tail in as `self` once per item, so collecting `n` items into a `Vec` takes
/// quadratic time. Use [VecDeque] for long repetitions.
impl<T: Clone + Debug + 'static> Value for Vec<T> {
    fn prepend(self, mut left: Self) -> Self {
        left.extend(self);
        left
    }
}

/// Moves the shorter side onto the longer one, so right-recursive folds stay linear overall.
impl<T: Clone + Debug + 'static> Value for VecDeque<T> {
    fn prepend(mut self, mut left: Self) -> Self {
        if left.len() > self.len() {
            left.extend(self);
            return left;
        }
        while let Some(item) = left.pop_back() {
            self.push_front(item);
        }
        self
    }
}

/// Tag identifying a class of tokens.
pub trait TokenKind: Clone + Ord + Hash + Debug + 'static {}

impl<T: Clone + Ord + Hash + Debug + 'static> TokenKind for T {}

/// A lexed token: a kind plus the semantic value it carries.
pub trait Token {
    type Kind: TokenKind;
    type Value: Value;

    /// The kind used to drive grammar decisions.
    fn kind(&self) -> Self::Kind;

    /// Consumes the token, yielding the value folded into the parse result.
    fn value(self) -> Self::Value;
}

impl<K: TokenKind, V: Value> Token for (K, V) {
    type Kind = K;
    type Value = V;

    fn kind(&self) -> K {
        self.0.clone()
    }

    fn value(self) -> V {
        self.1
    }
}
