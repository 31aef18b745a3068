//! Grammar nodes and the wiring of their inductive properties.
//!
//! Each variant computes its five facts structurally from its children:
//!
//!     acceptable kinds (FIRST), nullable value, productivity: functions of the children only.
//!     should-not-follow entries and conflicts: additionally combine the node's own first three
//!         facts with the children's entries and conflicts.

use super::conflict::{Conflict, ShouldNotFollow};
use super::Grammar;
use crate::property::{Fact, InductiveProperty, Solver};
use crate::value::{TokenKind, Value};
use once_cell::unsync::OnceCell;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-unique identity of a grammar node.
///
/// Conflicts name the subtrees they originate from by id; [Grammar::subtree] maps an id back
/// to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value post-processing function attached to a transform node.
pub struct Transformation<V>(Arc<dyn Fn(V) -> V + Send + Sync>);

impl<V> Transformation<V> {
    pub fn new(f: impl Fn(V) -> V + Send + Sync + 'static) -> Self {
        Transformation(Arc::new(f))
    }

    pub fn apply(&self, value: V) -> V {
        (self.0)(value)
    }
}

impl<V> Clone for Transformation<V> {
    fn clone(&self) -> Self {
        Transformation(Arc::clone(&self.0))
    }
}

impl<V> fmt::Debug for Transformation<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Transformation(..)")
    }
}

pub(crate) struct Node<V, K> {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind<V, K>,
    pub(crate) props: Properties<V, K>,
}

pub(crate) enum NodeKind<V, K> {
    Success(V),
    Element(K),
    Disjunction(Grammar<V, K>, Grammar<V, K>),
    Sequence(Grammar<V, K>, Grammar<V, K>),
    Transform(Transformation<V>, Grammar<V, K>),
    Deferred(Deferred<V, K>),
}

/// Placeholder for a node that is only produced when the grammar is realized.
pub(crate) struct Deferred<V, K> {
    thunk: Box<dyn Fn() -> Grammar<V, K>>,
    /// Body of a [Grammar::recursive] definition, known before realization.
    body: Option<Grammar<V, K>>,
    target: OnceCell<Grammar<V, K>>,
}

impl<V: Value, K: TokenKind> Deferred<V, K> {
    pub(crate) fn target(&self) -> Option<&Grammar<V, K>> {
        self.target.get()
    }

    /// The node this placeholder stands for, if it is known without running the thunk.
    pub(crate) fn definition(&self) -> Option<&Grammar<V, K>> {
        self.target.get().or(self.body.as_ref())
    }

    /// Runs the thunk on first use and binds `props` to the produced node.
    ///
    /// Returns the target and whether this call performed the binding.
    pub(crate) fn realize(&self, props: &Properties<V, K>) -> (Grammar<V, K>, bool) {
        if let Some(target) = self.target.get() {
            return (target.clone(), false);
        }
        let target = self.target.get_or_init(|| {
            let target = (self.thunk)();
            props.bind(&target.node().props);
            target
        });
        (target.clone(), true)
    }
}

pub(crate) struct Properties<V, K> {
    pub(crate) acceptable_kinds: InductiveProperty<BTreeSet<K>>,
    pub(crate) nullable_value: InductiveProperty<Option<V>>,
    pub(crate) productive: InductiveProperty<bool>,
    pub(crate) should_not_follow: InductiveProperty<BTreeSet<ShouldNotFollow<K>>>,
    pub(crate) conflicts: InductiveProperty<BTreeSet<Conflict<K>>>,
}

impl<V: Value, K: TokenKind> Node<V, K> {
    pub(crate) fn success(value: V) -> Self {
        Node {
            id: NodeId::fresh(),
            props: Properties::success(value.clone()),
            kind: NodeKind::Success(value),
        }
    }

    pub(crate) fn element(kind: K) -> Self {
        Node {
            id: NodeId::fresh(),
            props: Properties::element(kind.clone()),
            kind: NodeKind::Element(kind),
        }
    }

    pub(crate) fn disjunction(left: Grammar<V, K>, right: Grammar<V, K>) -> Self {
        let id = NodeId::fresh();
        Node {
            id,
            props: Properties::disjunction(id, &left, &right),
            kind: NodeKind::Disjunction(left, right),
        }
    }

    pub(crate) fn sequence(left: Grammar<V, K>, right: Grammar<V, K>) -> Self {
        let id = NodeId::fresh();
        Node {
            id,
            props: Properties::sequence(id, &left, &right),
            kind: NodeKind::Sequence(left, right),
        }
    }

    pub(crate) fn transform(f: Transformation<V>, inner: Grammar<V, K>) -> Self {
        Node {
            id: NodeId::fresh(),
            props: Properties::transform(&f, &inner),
            kind: NodeKind::Transform(f, inner),
        }
    }

    pub(crate) fn deferred(thunk: impl Fn() -> Grammar<V, K> + 'static) -> Self {
        Node {
            id: NodeId::fresh(),
            props: Properties::deferred(),
            kind: NodeKind::Deferred(Deferred {
                thunk: Box::new(thunk),
                body: None,
                target: OnceCell::new(),
            }),
        }
    }

    /// A deferred node whose thunk yields `body`.
    pub(crate) fn recursive(body: Grammar<V, K>) -> Self {
        let produced = body.clone();
        Node {
            id: NodeId::fresh(),
            props: Properties::deferred(),
            kind: NodeKind::Deferred(Deferred {
                thunk: Box::new(move || produced.clone()),
                body: Some(body),
                target: OnceCell::new(),
            }),
        }
    }
}

impl<V, K> Node<V, K> {
    /// Takes the node apart, returning the children it owns.
    ///
    /// Properties and thunks go first: they only hold extra handles to the children, so
    /// releasing them never frees a child while the returned handles are alive.
    pub(crate) fn into_children(self) -> Vec<Grammar<V, K>> {
        let Node { kind, props, .. } = self;
        drop(props);
        match kind {
            NodeKind::Success(_) | NodeKind::Element(_) => Vec::new(),
            NodeKind::Disjunction(left, right) | NodeKind::Sequence(left, right) => {
                vec![left, right]
            }
            NodeKind::Transform(_, inner) => vec![inner],
            NodeKind::Deferred(Deferred {
                thunk,
                body,
                target,
            }) => {
                drop(thunk);
                body.into_iter().chain(target.into_inner()).collect()
            }
        }
    }
}

impl<V: Value, K: TokenKind> Properties<V, K> {
    fn success(value: V) -> Self {
        Properties {
            acceptable_kinds: InductiveProperty::constant(BTreeSet::new()),
            nullable_value: InductiveProperty::constant(Some(value)),
            productive: InductiveProperty::constant(true),
            should_not_follow: InductiveProperty::constant(BTreeSet::new()),
            conflicts: InductiveProperty::constant(BTreeSet::new()),
        }
    }

    fn element(kind: K) -> Self {
        Properties {
            acceptable_kinds: InductiveProperty::constant(BTreeSet::from([kind])),
            nullable_value: InductiveProperty::constant(None),
            productive: InductiveProperty::constant(true),
            should_not_follow: InductiveProperty::constant(BTreeSet::new()),
            conflicts: InductiveProperty::constant(BTreeSet::new()),
        }
    }

    fn disjunction(id: NodeId, left: &Grammar<V, K>, right: &Grammar<V, K>) -> Self {
        let acceptable_kinds = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut kinds = left.read_acceptable_kinds(s);
                kinds.extend(right.read_acceptable_kinds(s));
                kinds
            })
        };

        // The left alternative wins if both are nullable; that case is a conflict anyway.
        let nullable_value = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                left.read_nullable_value(s)
                    .or_else(|| right.read_nullable_value(s))
            })
        };

        let productive = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| left.read_productive(s) || right.read_productive(s))
        };

        let should_not_follow = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut entries = left.read_should_not_follow(s);
                entries.extend(right.read_should_not_follow(s));
                if left.read_nullable_value(s).is_some() {
                    entries.insert(ShouldNotFollow::new(id, right.read_acceptable_kinds(s)));
                }
                if right.read_nullable_value(s).is_some() {
                    entries.insert(ShouldNotFollow::new(id, left.read_acceptable_kinds(s)));
                }
                entries
            })
        };

        let conflicts = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut conflicts = left.read_conflicts(s);
                conflicts.extend(right.read_conflicts(s));

                if left.read_nullable_value(s).is_some() && right.read_nullable_value(s).is_some()
                {
                    conflicts.insert(Conflict::BothAcceptEmpty { disjunction: id });
                }

                let left_kinds = left.read_acceptable_kinds(s);
                let right_kinds = right.read_acceptable_kinds(s);
                let shared: BTreeSet<K> = left_kinds.intersection(&right_kinds).cloned().collect();
                if !shared.is_empty() {
                    conflicts.insert(Conflict::FirstFirstClash {
                        disjunction: id,
                        kinds: shared,
                    });
                }
                conflicts
            })
        };

        Properties {
            acceptable_kinds,
            nullable_value,
            productive,
            should_not_follow,
            conflicts,
        }
    }

    fn sequence(id: NodeId, left: &Grammar<V, K>, right: &Grammar<V, K>) -> Self {
        let acceptable_kinds = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut kinds = BTreeSet::new();
                if right.read_productive(s) {
                    kinds.extend(left.read_acceptable_kinds(s));
                }
                if left.read_nullable_value(s).is_some() {
                    kinds.extend(right.read_acceptable_kinds(s));
                }
                kinds
            })
        };

        let nullable_value = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let left_value = left.read_nullable_value(s)?;
                let right_value = right.read_nullable_value(s)?;
                Some(right_value.prepend(left_value))
            })
        };

        let productive = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| left.read_productive(s) && right.read_productive(s))
        };

        let should_not_follow = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut entries = BTreeSet::new();
                if right.read_nullable_value(s).is_some() {
                    entries.extend(left.read_should_not_follow(s));
                }
                if left.read_productive(s) {
                    entries.extend(right.read_should_not_follow(s));
                }
                entries
            })
        };

        let conflicts = {
            let (left, right) = (left.clone(), right.clone());
            InductiveProperty::rule(move |s| {
                let mut conflicts = left.read_conflicts(s);
                conflicts.extend(right.read_conflicts(s));

                let right_kinds = right.read_acceptable_kinds(s);
                for entry in left.read_should_not_follow(s) {
                    let clash: BTreeSet<K> =
                        entry.disallowed.intersection(&right_kinds).cloned().collect();
                    if !clash.is_empty() {
                        conflicts.insert(Conflict::FollowClash {
                            disjunction: entry.origin,
                            sequence: id,
                            kinds: clash,
                        });
                    }
                }
                conflicts
            })
        };

        Properties {
            acceptable_kinds,
            nullable_value,
            productive,
            should_not_follow,
            conflicts,
        }
    }

    fn transform(f: &Transformation<V>, inner: &Grammar<V, K>) -> Self {
        let acceptable_kinds = {
            let inner = inner.clone();
            InductiveProperty::rule(move |s| inner.read_acceptable_kinds(s))
        };
        let nullable_value = {
            let (inner, f) = (inner.clone(), f.clone());
            InductiveProperty::rule(move |s| inner.read_nullable_value(s).map(|v| f.apply(v)))
        };
        let productive = {
            let inner = inner.clone();
            InductiveProperty::rule(move |s| inner.read_productive(s))
        };
        let should_not_follow = {
            let inner = inner.clone();
            InductiveProperty::rule(move |s| inner.read_should_not_follow(s))
        };
        let conflicts = {
            let inner = inner.clone();
            InductiveProperty::rule(move |s| inner.read_conflicts(s))
        };

        Properties {
            acceptable_kinds,
            nullable_value,
            productive,
            should_not_follow,
            conflicts,
        }
    }

    fn deferred() -> Self {
        Properties {
            acceptable_kinds: InductiveProperty::deferred(Fact::bottom()),
            nullable_value: InductiveProperty::deferred(Fact::bottom()),
            productive: InductiveProperty::deferred(Fact::bottom()),
            should_not_follow: InductiveProperty::deferred(Fact::bottom()),
            conflicts: InductiveProperty::deferred(Fact::bottom()),
        }
    }

    fn bind(&self, target: &Properties<V, K>) {
        self.acceptable_kinds.realize(&target.acceptable_kinds);
        self.nullable_value.realize(&target.nullable_value);
        self.productive.realize(&target.productive);
        self.should_not_follow.realize(&target.should_not_follow);
        self.conflicts.realize(&target.conflicts);
    }
}

impl<V: Value, K: TokenKind> Grammar<V, K> {
    fn read_acceptable_kinds(&self, s: &mut Solver) -> BTreeSet<K> {
        self.node().props.acceptable_kinds.read(s)
    }

    fn read_nullable_value(&self, s: &mut Solver) -> Option<V> {
        self.node().props.nullable_value.read(s)
    }

    fn read_productive(&self, s: &mut Solver) -> bool {
        self.node().props.productive.read(s)
    }

    fn read_should_not_follow(&self, s: &mut Solver) -> BTreeSet<ShouldNotFollow<K>> {
        self.node().props.should_not_follow.read(s)
    }

    fn read_conflicts(&self, s: &mut Solver) -> BTreeSet<Conflict<K>> {
        self.node().props.conflicts.read(s)
    }
}
