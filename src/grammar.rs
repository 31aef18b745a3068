//! Unvalidated grammars
//!
//! A [Grammar] is a cheap-to-clone handle to an immutable node. Nodes are shared, so the same
//! fragment can appear in many positions without being copied.
//!
//! Node kinds
//!
//!     success(v): matches the empty sequence, producing `v`.
//!     element(k): matches exactly one token of kind `k`, producing the token's value.
//!     disjunction(a, b): matches what `a` or `b` matches.
//!     sequence(a, b): matches `a` then `b`, combining the values with [Value::prepend].
//!     transform(f, a): matches what `a` matches, post-processing the value with `f`.
//!     deferred(thunk): a placeholder for a node produced on first use. This is how grammars
//!         refer to themselves.
//!
//! Recursion
//!
//!     Recursive grammars are best built with [Grammar::recursive], which hands the body a weak
//!     reference to the grammar being defined. A [Grammar::deferred] thunk that captures a strong
//!     handle to its own node forms a reference cycle and is never freed.
//!
//!     Recursion must be guarded: every cycle has to pass through at least one node that
//!     consumes a token or combines with a sibling. A deferred node resolving to itself through
//!     deferred nodes only is rejected with a panic when the grammar is realized.
//!
//! Before properties are read for real use, the tree is realized: every deferred thunk runs
//! once and the placeholder properties are bound to the produced nodes. The public property
//! accessors and [Grammar::validate] do this on their own.

mod conflict;
mod display;
mod node;

pub use conflict::{Conflict, ShouldNotFollow, ValidationError};
pub use node::{NodeId, Transformation};

pub(crate) use node::{Node, NodeKind};

use crate::validated::ValidatedGrammar;
use crate::value::{TokenKind, Value};
use log::debug;
use std::collections::{BTreeSet, HashSet};
use std::rc::{Rc, Weak};

enum Link<V, K> {
    Owned(Rc<Node<V, K>>),
    /// Self-reference handed out by [Grammar::recursive].
    Back(Weak<Node<V, K>>),
}

/// An unvalidated grammar producing values of type `V` from tokens of kind `K`.
pub struct Grammar<V, K> {
    link: Link<V, K>,
}

impl<V, K> Clone for Grammar<V, K> {
    fn clone(&self) -> Self {
        let link = match &self.link {
            Link::Owned(node) => Link::Owned(Rc::clone(node)),
            Link::Back(node) => Link::Back(Weak::clone(node)),
        };
        Grammar { link }
    }
}

/// Releases nodes with an explicit stack, so dropping a deep grammar does not recurse.
impl<V, K> Drop for Grammar<V, K> {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        let mut link = std::mem::replace(&mut self.link, Link::Back(Weak::new()));
        loop {
            if let Link::Owned(node) = link {
                if let Ok(node) = Rc::try_unwrap(node) {
                    for mut child in node.into_children() {
                        pending.push(std::mem::replace(&mut child.link, Link::Back(Weak::new())));
                    }
                }
            }
            link = match pending.pop() {
                Some(next) => next,
                None => break,
            };
        }
    }
}

impl<V: Value, K: TokenKind> Grammar<V, K> {
    fn from_node(node: Node<V, K>) -> Self {
        Grammar {
            link: Link::Owned(Rc::new(node)),
        }
    }

    /// # Panics
    ///
    /// If this is the self-reference of a [Grammar::recursive] definition that is still being
    /// built or has already been dropped.
    pub(crate) fn node(&self) -> Rc<Node<V, K>> {
        match &self.link {
            Link::Owned(node) => Rc::clone(node),
            Link::Back(node) => match node.upgrade() {
                Some(node) => node,
                None => panic!(
                    "recursive grammar reference used while its definition is being built or after it was dropped"
                ),
            },
        }
    }

    pub fn id(&self) -> NodeId {
        self.node().id
    }

    pub fn success(value: V) -> Self {
        Self::from_node(Node::success(value))
    }

    pub fn element(kind: K) -> Self {
        Self::from_node(Node::element(kind))
    }

    pub fn disjunction(left: Self, right: Self) -> Self {
        Self::from_node(Node::disjunction(left, right))
    }

    pub fn sequence(left: Self, right: Self) -> Self {
        Self::from_node(Node::sequence(left, right))
    }

    pub fn transform(f: impl Fn(V) -> V + Send + Sync + 'static, inner: Self) -> Self {
        Self::from_node(Node::transform(Transformation::new(f), inner))
    }

    /// A node produced by `thunk` when the grammar is realized. The thunk runs at most once.
    pub fn deferred(thunk: impl Fn() -> Self + 'static) -> Self {
        Self::from_node(Node::deferred(thunk))
    }

    /// Defines a self-referential grammar.
    ///
    /// `build` receives a handle to the grammar being defined and returns its body. The handle
    /// may be placed anywhere inside the body, but none of its methods may be called until
    /// `recursive` has returned.
    pub fn recursive(build: impl FnOnce(Self) -> Self) -> Self {
        let node = Rc::new_cyclic(|this: &Weak<Node<V, K>>| {
            let this = Grammar {
                link: Link::Back(Weak::clone(this)),
            };
            Node::recursive(build(this))
        });
        Grammar {
            link: Link::Owned(node),
        }
    }

    pub fn or(self, other: Self) -> Self {
        Self::disjunction(self, other)
    }

    pub fn then(self, other: Self) -> Self {
        Self::sequence(self, other)
    }

    pub fn map(self, f: impl Fn(V) -> V + Send + Sync + 'static) -> Self {
        Self::transform(f, self)
    }

    /// Matches `inner` or nothing, producing `default` for nothing.
    pub fn optional(inner: Self, default: V) -> Self {
        Self::disjunction(inner, Self::success(default))
    }

    /// Zero or more repetitions of `inner`, right-recursive. `empty` is the value of zero
    /// repetitions; the values of the repetitions are combined with [Value::prepend].
    pub fn many(inner: Self, empty: V) -> Self {
        Self::recursive(move |this| {
            Self::disjunction(Self::sequence(inner, this), Self::success(empty))
        })
    }

    /// One or more repetitions of `inner`.
    pub fn many1(inner: Self, empty: V) -> Self {
        Self::sequence(inner.clone(), Self::many(inner, empty))
    }

    /// Runs every deferred thunk reachable from this grammar and binds the placeholders.
    ///
    /// Already-realized nodes are skipped, so calling this again is cheap.
    ///
    /// # Panics
    ///
    /// If a deferred node resolves to itself through deferred nodes only.
    pub fn realize(&self) {
        let mut seen = HashSet::new();
        let mut pending = vec![self.clone()];
        let mut bound = 0usize;

        while let Some(grammar) = pending.pop() {
            let node = grammar.node();
            if !seen.insert(node.id) {
                continue;
            }
            match &node.kind {
                NodeKind::Success(_) | NodeKind::Element(_) => {}
                NodeKind::Disjunction(left, right) | NodeKind::Sequence(left, right) => {
                    pending.push(right.clone());
                    pending.push(left.clone());
                }
                NodeKind::Transform(_, inner) => pending.push(inner.clone()),
                NodeKind::Deferred(deferred) => {
                    let (target, fresh) = deferred.realize(&node.props);
                    if fresh {
                        bound += 1;
                        grammar.resolve();
                    }
                    pending.push(target);
                }
            }
        }

        if bound > 0 {
            debug!(
                "realized grammar {}: {} node(s) reachable, {} deferred node(s) bound",
                self.id(),
                seen.len(),
                bound
            );
        }
    }

    /// Follows realized deferred nodes down to the node they stand for.
    ///
    /// Stops at an unrealized deferred node.
    pub(crate) fn resolve(&self) -> Rc<Node<V, K>> {
        let mut node = self.node();
        let mut chain = HashSet::new();
        loop {
            let next = match &node.kind {
                NodeKind::Deferred(deferred) => match deferred.target() {
                    Some(target) => target.node(),
                    None => return node,
                },
                _ => return node,
            };
            if !chain.insert(node.id) {
                panic!(
                    "unguarded recursion: deferred grammar {} resolves to itself without consuming input",
                    node.id
                );
            }
            node = next;
        }
    }

    /// Kinds that can start a non-empty match (the FIRST set).
    pub fn acceptable_kinds(&self) -> BTreeSet<K> {
        self.realize();
        self.node().props.acceptable_kinds.get()
    }

    /// The value produced by matching the empty sequence, if that is possible.
    pub fn nullable_value(&self) -> Option<V> {
        self.realize();
        self.node().props.nullable_value.get()
    }

    /// Whether the grammar matches at least one token sequence.
    pub fn is_productive(&self) -> bool {
        self.realize();
        self.node().props.productive.get()
    }

    pub fn should_not_follow(&self) -> BTreeSet<ShouldNotFollow<K>> {
        self.realize();
        self.node().props.should_not_follow.get()
    }

    pub fn conflicts(&self) -> BTreeSet<Conflict<K>> {
        self.realize();
        self.node().props.conflicts.get()
    }

    pub fn is_conflict_free(&self) -> bool {
        self.conflicts().is_empty()
    }

    /// Checks the grammar is LL(1) and lowers it into its executable form.
    ///
    /// Validating the same tree again yields the same verdict and conflict set.
    pub fn validate(&self) -> Result<ValidatedGrammar<V, K>, ValidationError<V, K>> {
        let conflicts = self.conflicts();
        if !conflicts.is_empty() {
            debug!(
                "grammar {} rejected with {} conflict(s)",
                self.id(),
                conflicts.len()
            );
            return Err(ValidationError::new(self.clone(), conflicts));
        }

        let validated = ValidatedGrammar::lower(self);
        debug!(
            "grammar {} validated into {} node(s)",
            self.id(),
            validated.len()
        );
        Ok(validated)
    }

    /// Finds the node with the given id among the nodes reachable from this grammar.
    pub fn subtree(&self, id: NodeId) -> Option<Self> {
        self.realize();
        let mut seen = HashSet::new();
        let mut pending = vec![self.clone()];

        while let Some(grammar) = pending.pop() {
            let node = grammar.node();
            if node.id == id {
                return Some(grammar);
            }
            if !seen.insert(node.id) {
                continue;
            }
            match &node.kind {
                NodeKind::Success(_) | NodeKind::Element(_) => {}
                NodeKind::Disjunction(left, right) | NodeKind::Sequence(left, right) => {
                    pending.push(right.clone());
                    pending.push(left.clone());
                }
                NodeKind::Transform(_, inner) => pending.push(inner.clone()),
                NodeKind::Deferred(deferred) => pending.extend(deferred.target().cloned()),
            }
        }
        None
    }
}
