//! LL(1) conflicts and the validation error that reports them.

use super::node::NodeId;
use super::Grammar;
use crate::value::{TokenKind, Value};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A pending follow restriction: whatever follows the nullable disjunction `origin` must not
/// start with any of `disallowed`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ShouldNotFollow<K> {
    pub origin: NodeId,
    pub disallowed: BTreeSet<K>,
}

impl<K> ShouldNotFollow<K> {
    pub fn new(origin: NodeId, disallowed: BTreeSet<K>) -> Self {
        ShouldNotFollow { origin, disallowed }
    }
}

/// A reason a grammar is not LL(1).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Conflict<K> {
    /// Both alternatives of a disjunction accept the empty sequence.
    BothAcceptEmpty { disjunction: NodeId },
    /// Both alternatives of a disjunction can start with the same kinds.
    FirstFirstClash {
        disjunction: NodeId,
        kinds: BTreeSet<K>,
    },
    /// A nullable disjunction is followed, in `sequence`, by something that can start with
    /// kinds one of its alternatives also starts with.
    FollowClash {
        disjunction: NodeId,
        sequence: NodeId,
        kinds: BTreeSet<K>,
    },
}

impl<K> Conflict<K> {
    /// The disjunction the conflict originates from.
    pub fn disjunction(&self) -> NodeId {
        match self {
            Conflict::BothAcceptEmpty { disjunction }
            | Conflict::FirstFirstClash { disjunction, .. }
            | Conflict::FollowClash { disjunction, .. } => *disjunction,
        }
    }

    /// The kinds involved, if the conflict is about specific kinds.
    pub fn kinds(&self) -> Option<&BTreeSet<K>> {
        match self {
            Conflict::BothAcceptEmpty { .. } => None,
            Conflict::FirstFirstClash { kinds, .. } | Conflict::FollowClash { kinds, .. } => {
                Some(kinds)
            }
        }
    }
}

struct KindSet<'a, K>(&'a BTreeSet<K>);

impl<K: fmt::Debug> fmt::Display for KindSet<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, kind) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{:?}", kind)?;
        }
        f.write_str("}")
    }
}

impl<K: fmt::Debug> fmt::Display for Conflict<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conflict::BothAcceptEmpty { disjunction } => write!(
                f,
                "disjunction {}: both alternatives accept the empty sequence",
                disjunction
            ),
            Conflict::FirstFirstClash { disjunction, kinds } => write!(
                f,
                "disjunction {}: both alternatives can start with {}",
                disjunction,
                KindSet(kinds)
            ),
            Conflict::FollowClash {
                disjunction,
                sequence,
                kinds,
            } => write!(
                f,
                "disjunction {}: may be empty but is followed by {} in sequence {}",
                disjunction,
                KindSet(kinds),
                sequence
            ),
        }
    }
}

/// Returned by [Grammar::validate] when the grammar has at least one conflict.
pub struct ValidationError<V, K> {
    grammar: Grammar<V, K>,
    conflicts: BTreeSet<Conflict<K>>,
}

impl<V: Value, K: TokenKind> ValidationError<V, K> {
    pub(crate) fn new(grammar: Grammar<V, K>, conflicts: BTreeSet<Conflict<K>>) -> Self {
        ValidationError { grammar, conflicts }
    }

    /// The conflicts found, never empty.
    pub fn conflicts(&self) -> &BTreeSet<Conflict<K>> {
        &self.conflicts
    }

    pub fn into_conflicts(self) -> BTreeSet<Conflict<K>> {
        self.conflicts
    }

    /// The grammar that failed validation.
    pub fn grammar(&self) -> &Grammar<V, K> {
        &self.grammar
    }

    /// Multi-line report listing each conflict with the subtree it originates from.
    pub fn report(&self) -> String {
        let mut out = format!("{}\n", self);
        for conflict in &self.conflicts {
            out.push_str(&format!("  - {}\n", conflict));
            if let Some(origin) = self.grammar.subtree(conflict.disjunction()) {
                out.push_str(&format!("      at {}\n", origin));
            }
        }
        out
    }
}

impl<V, K> fmt::Display for ValidationError<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grammar is not LL(1): {} conflict(s)",
            self.conflicts.len()
        )
    }
}

impl<V, K: fmt::Debug> fmt::Debug for ValidationError<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("conflicts", &self.conflicts)
            .finish()
    }
}

impl<V, K: fmt::Debug> std::error::Error for ValidationError<V, K> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_display() {
        let conflict = Conflict::FirstFirstClash {
            disjunction: NodeId::fresh(),
            kinds: BTreeSet::from(['a', 'b']),
        };
        let rendered = conflict.to_string();
        assert!(rendered.ends_with("both alternatives can start with {'a', 'b'}"));
    }

    #[test]
    fn test_conflict_accessors() {
        let id = NodeId::fresh();
        let conflict: Conflict<char> = Conflict::BothAcceptEmpty { disjunction: id };
        assert_eq!(conflict.disjunction(), id);
        assert!(conflict.kinds().is_none());
    }
}
