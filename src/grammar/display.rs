//! Textual rendering of grammars.
//!
//! Binary nodes are always parenthesized. A recursive node is rendered as a fixpoint binder
//! `fix rN. body` the first time it is met and as `rN` afterwards, so recursive grammars render
//! finitely. A [Grammar::recursive] body is known up front; other deferred nodes render as
//! `<deferred>` until they are realized.
//!
//! Rendering walks the tree with an explicit stack, so deep grammars render without recursion.

use super::node::{NodeId, NodeKind};
use super::Grammar;
use crate::value::{TokenKind, Value};
use std::collections::HashMap;
use std::fmt;

enum Step<V, K> {
    Render(Grammar<V, K>),
    Write(&'static str),
}

#[derive(Default)]
struct Renderer {
    names: HashMap<NodeId, usize>,
}

impl Renderer {
    fn render<V: Value, K: TokenKind>(
        &mut self,
        grammar: &Grammar<V, K>,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let mut pending = vec![Step::Render(grammar.clone())];
        while let Some(step) = pending.pop() {
            let grammar = match step {
                Step::Write(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Step::Render(grammar) => grammar,
            };
            let node = grammar.node();
            match &node.kind {
                NodeKind::Success(value) => write!(f, "success({:?})", value)?,
                NodeKind::Element(kind) => write!(f, "{:?}", kind)?,
                NodeKind::Disjunction(left, right) => {
                    Self::binary(&mut pending, left, " | ", right, f)?
                }
                NodeKind::Sequence(left, right) => {
                    Self::binary(&mut pending, left, " ~ ", right, f)?
                }
                NodeKind::Transform(_, inner) => {
                    f.write_str("map(")?;
                    pending.push(Step::Write(")"));
                    pending.push(Step::Render(inner.clone()));
                }
                NodeKind::Deferred(deferred) => {
                    if let Some(n) = self.names.get(&node.id) {
                        write!(f, "r{}", n)?;
                        continue;
                    }
                    match deferred.definition() {
                        None => f.write_str("<deferred>")?,
                        Some(body) => {
                            let n = self.names.len() + 1;
                            self.names.insert(node.id, n);
                            write!(f, "fix r{}. ", n)?;
                            pending.push(Step::Render(body.clone()));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn binary<V: Value, K: TokenKind>(
        pending: &mut Vec<Step<V, K>>,
        left: &Grammar<V, K>,
        operator: &'static str,
        right: &Grammar<V, K>,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        pending.push(Step::Write(")"));
        pending.push(Step::Render(right.clone()));
        pending.push(Step::Write(operator));
        pending.push(Step::Render(left.clone()));
        f.write_str("(")
    }
}

impl<V: Value, K: TokenKind> fmt::Display for Grammar<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Renderer::default().render(self, f)
    }
}

impl<V: Value, K: TokenKind> fmt::Debug for Grammar<V, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grammar({})", self)
    }
}
