//! The parse zipper
//!
//! A [Focus] is a cursor on the element that will consume the next token, plus a [Context]
//! describing the way back up to the root. The context is a stack of frames:
//!
//!     FollowBy(r): once the focused part is complete, `r` still has to be parsed.
//!     Prepend(v): `v` was produced to the left and goes in front of whatever completes here.
//!     Apply(f): the completed value passes through `f`.
//!
//! Folding
//!
//!     Feeding the focused element a value folds the context from the innermost frame outwards,
//!     applying `Prepend` and `Apply` frames, until either the stack is empty (the parse is
//!     complete, [Fold::Done]) or a `FollowBy` is reached ([Fold::Suspended]). A suspension is
//!     resumed with the next token kind, or finished at end of input.
//!
//! Every step is a loop over the frame stack, so nesting depth is bounded by memory only.

use crate::grammar::Transformation;
use crate::validated::{SyntaxId, ValidatedGrammar};
use crate::value::{Token, TokenKind, Value};
use log::trace;

#[derive(Debug, Clone)]
pub enum Frame<V> {
    FollowBy(SyntaxId),
    Prepend(V),
    Apply(Transformation<V>),
}

/// The path from a focus back to the root, innermost frame last.
#[derive(Debug, Clone)]
pub struct Context<V> {
    frames: Vec<Frame<V>>,
}

impl<V> Context<V> {
    /// The empty context.
    pub fn top() -> Self {
        Context { frames: Vec::new() }
    }

    pub fn is_top(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Frames from the outermost to the innermost.
    pub fn frames(&self) -> &[Frame<V>] {
        &self.frames
    }

    pub fn push(&mut self, frame: Frame<V>) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) -> Option<Frame<V>> {
        self.frames.pop()
    }
}

impl<V> Default for Context<V> {
    fn default() -> Self {
        Context::top()
    }
}

/// A cursor on the element that consumes the next token.
#[derive(Debug, Clone)]
pub struct Focus<'g, V, K> {
    grammar: &'g ValidatedGrammar<V, K>,
    leaf: SyntaxId,
    kind: &'g K,
    context: Context<V>,
}

impl<'g, V: Value, K: TokenKind> Focus<'g, V, K> {
    pub(crate) fn new(
        grammar: &'g ValidatedGrammar<V, K>,
        leaf: SyntaxId,
        kind: &'g K,
        context: Context<V>,
    ) -> Self {
        Focus {
            grammar,
            leaf,
            kind,
            context,
        }
    }

    /// The kind the focused element consumes.
    pub fn kind(&self) -> &'g K {
        self.kind
    }

    pub fn leaf(&self) -> SyntaxId {
        self.leaf
    }

    pub fn depth(&self) -> usize {
        self.context.depth()
    }

    pub fn context(&self) -> &Context<V> {
        &self.context
    }

    pub fn into_context(self) -> Context<V> {
        self.context
    }

    /// Completes the focused element with `value` and folds the context.
    pub fn fold(self, value: V) -> Fold<'g, V, K> {
        unwind(self.grammar, value, self.context)
    }

    /// Consumes `token` at the focused element.
    ///
    /// # Panics
    ///
    /// If the token's kind is not the focused kind.
    pub fn advance<T>(self, token: T) -> Fold<'g, V, K>
    where
        T: Token<Kind = K, Value = V>,
    {
        let kind = token.kind();
        assert!(
            kind == *self.kind,
            "token of kind {:?} fed to a focus on {:?}",
            kind,
            self.kind
        );
        self.fold(token.value())
    }
}

fn unwind<'g, V: Value, K: TokenKind>(
    grammar: &'g ValidatedGrammar<V, K>,
    mut value: V,
    mut context: Context<V>,
) -> Fold<'g, V, K> {
    while let Some(frame) = context.pop() {
        match frame {
            Frame::Prepend(left) => value = value.prepend(left),
            Frame::Apply(f) => value = f.apply(value),
            Frame::FollowBy(right) => {
                return Fold::Suspended(Suspension {
                    grammar,
                    value,
                    right,
                    context,
                })
            }
        }
    }
    Fold::Done(value)
}

/// Outcome of folding a completed value into its context.
#[derive(Debug, Clone)]
pub enum Fold<'g, V, K> {
    /// The context was fully folded; the value is the result of the whole parse.
    Done(V),
    Suspended(Suspension<'g, V, K>),
}

impl<'g, V: Value, K: TokenKind> Fold<'g, V, K> {
    pub fn is_done(&self) -> bool {
        matches!(self, Fold::Done(_))
    }

    /// Positions a focus for a token of kind `kind`, or `None` if no token of that kind can
    /// come next. A completed parse accepts nothing.
    pub fn resume(self, kind: &K) -> Option<Focus<'g, V, K>> {
        match self {
            Fold::Done(_) => None,
            Fold::Suspended(suspension) => suspension.resume(kind),
        }
    }

    /// The result at end of input, or `None` if more tokens are required.
    pub fn finish(self) -> Option<V> {
        match self {
            Fold::Done(value) => Some(value),
            Fold::Suspended(suspension) => suspension.finish(),
        }
    }
}

/// A partially folded parse waiting for the part named by a `FollowBy` frame.
#[derive(Debug, Clone)]
pub struct Suspension<'g, V, K> {
    grammar: &'g ValidatedGrammar<V, K>,
    value: V,
    right: SyntaxId,
    context: Context<V>,
}

impl<'g, V: Value, K: TokenKind> Suspension<'g, V, K> {
    /// The value produced so far for the left part.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// The part still to be parsed.
    pub fn next(&self) -> SyntaxId {
        self.right
    }

    pub fn context(&self) -> &Context<V> {
        &self.context
    }

    /// Positions a focus for a token of kind `kind`.
    ///
    /// Pending parts that cannot start with `kind` but may be empty are closed with their empty
    /// value, moving on to the next pending part.
    pub fn resume(self, kind: &K) -> Option<Focus<'g, V, K>> {
        let Suspension {
            grammar,
            mut value,
            mut right,
            mut context,
        } = self;
        loop {
            if grammar.accepts_at(right, kind) {
                trace!("resuming at {} with {:?}", right, kind);
                context.push(Frame::Prepend(value));
                return Some(grammar.focus_at(right, kind, context));
            }
            let empty = grammar.node(right).nullable_value.clone()?;
            match unwind(grammar, empty.prepend(value), context) {
                Fold::Done(_) => return None,
                Fold::Suspended(next) => {
                    value = next.value;
                    right = next.right;
                    context = next.context;
                }
            }
        }
    }

    /// Closes every pending part with its empty value.
    ///
    /// Returns `None` if some pending part cannot be empty.
    pub fn finish(self) -> Option<V> {
        let Suspension {
            grammar,
            mut value,
            mut right,
            mut context,
        } = self;
        loop {
            let empty = grammar.node(right).nullable_value.clone()?;
            match unwind(grammar, empty.prepend(value), context) {
                Fold::Done(result) => return Some(result),
                Fold::Suspended(next) => {
                    value = next.value;
                    right = next.right;
                    context = next.context;
                }
            }
        }
    }
}
