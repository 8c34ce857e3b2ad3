//! Canonical keys for path expressions.
//!
//! A key replaces every variable by a *slot*: the path endpoints get slots
//! `0` and `1`, and every other variable gets the next free slot at its first
//! occurrence in preorder. Quantified variables open a fresh slot for their
//! scope. Two expressions that differ only by variable names therefore have
//! the same key.
//!
//! Structural keys stop there. Bound keys also record the identity of the set
//! bound to every slot, so the same shape bound to different sets yields
//! different keys.

use simgraph_graph::SetId;

use crate::error::{PathError, Result};
use crate::expr::{LinkKind, PathExpression, PathNode};
use crate::var::{Quantifier, Var};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathKey(KeyTerm);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct KeyVar {
    slot: u32,
    set: Option<SetId>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum KeyTerm {
    Link {
        kind: LinkKind,
        source: KeyVar,
        sink: KeyVar,
    },
    And(Box<KeyFormula>),
    Or(Box<KeyFormula>),
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct KeyFormula {
    free: Vec<KeyVar>,
    quantified: Vec<(Quantifier, KeyVar)>,
    lhs: KeyTerm,
    rhs: KeyTerm,
}

struct Canonicalizer {
    with_sets: bool,
    /// Innermost scope last.
    scope: Vec<(String, u32)>,
    next_slot: u32,
}

impl Canonicalizer {
    fn new(with_sets: bool) -> Self {
        Self {
            with_sets,
            scope: Vec::new(),
            next_slot: 0,
        }
    }

    fn fresh(&mut self, name: &str) -> u32 {
        let slot = self.next_slot;
        self.next_slot += 1;
        self.scope.push((name.to_string(), slot));
        slot
    }

    fn slot(&mut self, name: &str) -> u32 {
        match self.scope.iter().rev().find(|(n, _)| n == name) {
            Some(&(_, slot)) => slot,
            None => self.fresh(name),
        }
    }

    fn var(&mut self, v: &Var) -> KeyVar {
        let slot = self.slot(v.name());
        let set = if self.with_sets { v.set_id() } else { None };
        KeyVar { slot, set }
    }

    fn term(&mut self, expr: &PathExpression) -> KeyTerm {
        match expr.node() {
            PathNode::Link(link) => KeyTerm::Link {
                kind: link.kind().clone(),
                source: self.var(link.source()),
                sink: self.var(link.sink()),
            },
            PathNode::And(f) | PathNode::Or(f) => {
                let mut free = Vec::with_capacity(f.free_vars().len());
                for v in f.free_vars() {
                    free.push(self.var(v));
                }
                let depth = self.scope.len();
                let mut quantified = Vec::with_capacity(f.quantified_vars().len());
                for q in f.quantified_vars() {
                    self.fresh(q.var().name());
                    quantified.push((q.quantifier(), self.var(q.var())));
                }
                let lhs = self.term(f.lhs());
                let rhs = self.term(f.rhs());
                self.scope.truncate(depth);

                let formula = Box::new(KeyFormula {
                    free,
                    quantified,
                    lhs,
                    rhs,
                });
                match expr.node() {
                    PathNode::Or(_) => KeyTerm::Or(formula),
                    _ => KeyTerm::And(formula),
                }
            }
        }
    }

    fn key(mut self, expr: &PathExpression) -> PathKey {
        for i in 0..expr.num_path_endpoints() {
            if let Some(v) = expr.path_endpoint(i) {
                self.slot(v.name());
            }
        }
        PathKey(self.term(expr))
    }
}

impl PathKey {
    pub(crate) fn structural(expr: &PathExpression) -> Self {
        Canonicalizer::new(false).key(expr)
    }

    pub(crate) fn bound(expr: &PathExpression) -> Result<Self> {
        if let Some(v) = expr.vars().into_iter().find(|v| !v.is_bound()) {
            return Err(PathError::UnboundVar {
                name: v.name().to_string(),
            });
        }
        Ok(Canonicalizer::new(true).key(expr))
    }
}
