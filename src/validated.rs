//! Validated grammars
//!
//! Lowering turns a conflict-free [Grammar] into an arena of [ValidNode]s addressed by
//! [SyntaxId]. Each node keeps the facts computed during validation, so parse-time routing is a
//! set lookup.
//!
//! Lowering
//!
//!     Nodes are lowered once per identity, so shared fragments share a slot. A deferred node
//!     lowers to the slot of the node it resolves to, which turns recursion into a back-reference
//!     by index. The arena is immutable and, unlike the grammar it came from, can be shared
//!     across threads.

use crate::grammar::{Grammar, Node, NodeId, NodeKind, ShouldNotFollow, Transformation};
use crate::value::{TokenKind, Value};
use crate::zipper::{Context, Focus, Frame};
use log::trace;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

/// Index of a node inside a [ValidatedGrammar].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SyntaxId(usize);

impl SyntaxId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SyntaxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Shape of a lowered node. Deferred nodes do not survive lowering.
#[derive(Debug, Clone)]
pub enum Syntax<V, K> {
    Success(V),
    Element(K),
    Disjunction(SyntaxId, SyntaxId),
    Sequence(SyntaxId, SyntaxId),
    Transform(Transformation<V>, SyntaxId),
}

#[derive(Debug, Clone)]
pub struct ValidNode<V, K> {
    pub syntax: Syntax<V, K>,
    pub acceptable_kinds: BTreeSet<K>,
    pub nullable_value: Option<V>,
    pub productive: bool,
    pub should_not_follow: BTreeSet<ShouldNotFollow<K>>,
    /// The grammar node this was lowered from.
    pub origin: NodeId,
}

/// An LL(1) grammar ready for parsing.
///
/// Cloning shares the arena.
#[derive(Debug, Clone)]
pub struct ValidatedGrammar<V, K> {
    nodes: Arc<[ValidNode<V, K>]>,
    root: SyntaxId,
}

struct Lowering<V, K> {
    slots: HashMap<NodeId, SyntaxId>,
    order: Vec<Rc<Node<V, K>>>,
}

impl<V: Value, K: TokenKind> Lowering<V, K> {
    fn slot(&mut self, grammar: &Grammar<V, K>) -> SyntaxId {
        let node = grammar.resolve();
        if let Some(slot) = self.slots.get(&node.id) {
            return *slot;
        }
        let slot = SyntaxId(self.order.len());
        self.slots.insert(node.id, slot);
        self.order.push(node);
        slot
    }
}

impl<V: Value, K: TokenKind> ValidatedGrammar<V, K> {
    /// Lowers a realized, conflict-free grammar.
    pub(crate) fn lower(grammar: &Grammar<V, K>) -> Self {
        let mut lowering = Lowering {
            slots: HashMap::new(),
            order: Vec::new(),
        };
        let root = lowering.slot(grammar);

        // Slots are handed out in discovery order, so node `i` is built on iteration `i`.
        let mut nodes = Vec::new();
        let mut next = 0;
        while next < lowering.order.len() {
            let node = Rc::clone(&lowering.order[next]);
            let syntax = match &node.kind {
                NodeKind::Success(value) => Syntax::Success(value.clone()),
                NodeKind::Element(kind) => Syntax::Element(kind.clone()),
                NodeKind::Disjunction(left, right) => {
                    Syntax::Disjunction(lowering.slot(left), lowering.slot(right))
                }
                NodeKind::Sequence(left, right) => {
                    Syntax::Sequence(lowering.slot(left), lowering.slot(right))
                }
                NodeKind::Transform(f, inner) => Syntax::Transform(f.clone(), lowering.slot(inner)),
                NodeKind::Deferred(_) => {
                    unreachable!("grammar {} was lowered before being realized", node.id)
                }
            };
            nodes.push(ValidNode {
                syntax,
                acceptable_kinds: node.props.acceptable_kinds.get(),
                nullable_value: node.props.nullable_value.get(),
                productive: node.props.productive.get(),
                should_not_follow: node.props.should_not_follow.get(),
                origin: node.id,
            });
            next += 1;
        }

        ValidatedGrammar {
            nodes: nodes.into(),
            root,
        }
    }

    pub fn root(&self) -> SyntaxId {
        self.root
    }

    /// # Panics
    ///
    /// If `id` does not belong to this grammar.
    pub fn node(&self, id: SyntaxId) -> &ValidNode<V, K> {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (SyntaxId, &ValidNode<V, K>)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (SyntaxId(i), node))
    }

    pub fn acceptable_kinds(&self) -> &BTreeSet<K> {
        &self.node(self.root).acceptable_kinds
    }

    pub fn nullable_value(&self) -> Option<&V> {
        self.node(self.root).nullable_value.as_ref()
    }

    pub fn is_productive(&self) -> bool {
        self.node(self.root).productive
    }

    /// Whether a non-empty parse can start with `kind`.
    pub fn accepts(&self, kind: &K) -> bool {
        self.accepts_at(self.root, kind)
    }

    pub fn accepts_at(&self, id: SyntaxId, kind: &K) -> bool {
        self.node(id).acceptable_kinds.contains(kind)
    }

    /// Positions a focus on the element of kind `kind` the root would consume next.
    ///
    /// # Panics
    ///
    /// If the root does not accept `kind`.
    pub fn focus(&self, kind: &K, context: Context<V>) -> Focus<'_, V, K> {
        self.focus_at(self.root, kind, context)
    }

    /// Descends from `id` to the element that consumes `kind`, pushing the frames needed to
    /// rebuild the path onto `context`.
    ///
    /// Disjunctions route to the alternative that accepts `kind`. Sequences enter the left part
    /// unless it is nullable and does not accept `kind`, in which case its empty value is
    /// recorded and the right part is entered.
    ///
    /// # Panics
    ///
    /// If the node at `id` does not accept `kind`.
    pub fn focus_at(&self, id: SyntaxId, kind: &K, mut context: Context<V>) -> Focus<'_, V, K> {
        assert!(
            self.accepts_at(id, kind),
            "focus on {:?} at {} which does not accept it",
            kind,
            id
        );

        let mut current = id;
        loop {
            match &self.node(current).syntax {
                Syntax::Element(expected) => {
                    assert!(
                        expected == kind,
                        "focus on {:?} reached an element of kind {:?}",
                        kind,
                        expected
                    );
                    trace!("focused {:?} at {} (depth {})", kind, current, context.depth());
                    return Focus::new(self, current, expected, context);
                }
                Syntax::Success(_) => {
                    panic!("focus on {:?} reached a success node at {}", kind, current)
                }
                Syntax::Disjunction(left, right) => {
                    current = if self.accepts_at(*left, kind) {
                        *left
                    } else {
                        *right
                    };
                }
                Syntax::Sequence(left, right) => {
                    let left_node = self.node(*left);
                    match &left_node.nullable_value {
                        Some(empty) if !left_node.acceptable_kinds.contains(kind) => {
                            context.push(Frame::Prepend(empty.clone()));
                            current = *right;
                        }
                        _ => {
                            context.push(Frame::FollowBy(*right));
                            current = *left;
                        }
                    }
                }
                Syntax::Transform(f, inner) => {
                    context.push(Frame::Apply(f.clone()));
                    current = *inner;
                }
            }
        }
    }
}
