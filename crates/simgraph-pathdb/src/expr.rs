//! The path expression algebra.
//!
//! A path expression describes a binary relation between two sets of graph
//! elements (its two *path endpoints*). Leaves are [`Link`]s (one hop across
//! an edge's endpoints, or across a lattice stencil); internal nodes are
//! `And`/`Or` [`Formula`]s that combine two sub-expressions, optionally
//! eliminating one existentially quantified variable:
//!
//! ```text
//! vev = (vi,vj) exist e | (ve(vi,e)) ∧ (ev(e,vj))
//! ```
//!
//! Expressions are immutable and shared through `Arc`; cloning aliases.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use ahash::AHashSet;

use crate::error::{PathError, Result};
use crate::key::PathKey;
use crate::var::{Bindings, QuantifiedVar, Var};

// ============================================================================
// Stencils
// ============================================================================

/// Integer offsets applied, modulo the lattice extents, to every element of a
/// lattice. Offsets keep their order: it fixes the order of each index row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Stencil {
    offsets: Vec<Vec<i32>>,
}

impl Stencil {
    pub fn new(offsets: Vec<Vec<i32>>) -> Result<Self> {
        let Some(first) = offsets.first() else {
            return Err(PathError::EmptyStencil);
        };
        let arity = first.len();
        if let Some(bad) = offsets.iter().find(|o| o.len() != arity) {
            return Err(PathError::RaggedStencil {
                offset: bad.clone(),
                expected: arity,
                found: bad.len(),
            });
        }
        Ok(Self { offsets })
    }

    /// The `2 * dims + 1` point star (center first, then -/+ along each axis).
    pub fn star(dims: usize) -> Self {
        let mut offsets = vec![vec![0; dims]];
        for axis in 0..dims {
            for delta in [-1, 1] {
                let mut o = vec![0; dims];
                o[axis] = delta;
                offsets.push(o);
            }
        }
        Self { offsets }
    }

    pub fn offsets(&self) -> &[Vec<i32>] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Number of components per offset.
    pub fn arity(&self) -> usize {
        self.offsets.first().map(Vec::len).unwrap_or(0)
    }

    /// The stencil relating sinks back to sources.
    pub fn inverse(&self) -> Self {
        Self {
            offsets: self
                .offsets
                .iter()
                .map(|o| o.iter().map(|c| -c).collect())
                .collect(),
        }
    }
}

// ============================================================================
// Nodes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LinkKind {
    /// Edge -> incident vertices.
    EV,
    /// Vertex -> incident edges.
    VE,
    /// Lattice element -> stencil neighbors.
    VV(Stencil),
}

/// A single hop from `source` to `sink`.
#[derive(Debug, Clone)]
pub struct Link {
    source: Var,
    sink: Var,
    kind: LinkKind,
}

impl Link {
    pub fn source(&self) -> &Var {
        &self.source
    }

    pub fn sink(&self) -> &Var {
        &self.sink
    }

    pub fn kind(&self) -> &LinkKind {
        &self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    fn symbol(self) -> &'static str {
        match self {
            Connective::And => "\u{2227}",
            Connective::Or => "\u{2228}",
        }
    }
}

/// Two sub-expressions combined over two free variables and at most one
/// quantified variable.
#[derive(Debug, Clone)]
pub struct Formula {
    free_vars: Vec<Var>,
    quantified_vars: Vec<QuantifiedVar>,
    lhs: PathExpression,
    rhs: PathExpression,
}

impl Formula {
    pub fn free_vars(&self) -> &[Var] {
        &self.free_vars
    }

    pub fn quantified_vars(&self) -> &[QuantifiedVar] {
        &self.quantified_vars
    }

    /// The single quantified variable, if any.
    pub fn quantified(&self) -> Option<&Var> {
        self.quantified_vars.first().map(QuantifiedVar::var)
    }

    pub fn lhs(&self) -> &PathExpression {
        &self.lhs
    }

    pub fn rhs(&self) -> &PathExpression {
        &self.rhs
    }

    fn check(&self, connective: Connective) -> Result<()> {
        if self.free_vars.len() != 2 {
            return Err(PathError::UnsupportedFreeVars {
                count: self.free_vars.len(),
            });
        }
        if self.quantified_vars.len() > 1 {
            return Err(PathError::UnsupportedQuantifiedVars {
                count: self.quantified_vars.len(),
            });
        }
        let malformed = |reason: &str| PathError::MalformedFormula {
            expr: self.describe(connective),
            reason: reason.to_string(),
        };

        let f0 = self.free_vars[0].name();
        let f1 = self.free_vars[1].name();
        if f0 == f1 {
            return Err(malformed("free variables must be distinct"));
        }
        let l = self.lhs.endpoint_names();
        let r = self.rhs.endpoint_names();

        match self.quantified() {
            None => {
                let same = |e: [&str; 2]| (e == [f0, f1]) || (e == [f1, f0]);
                if !same(l) || !same(r) {
                    return Err(malformed(
                        "both operands must relate exactly the two free variables",
                    ));
                }
            }
            Some(q) => {
                let q = q.name();
                if q == f0 || q == f1 {
                    return Err(malformed("a free variable cannot also be quantified"));
                }
                let ends = far_end(l, q).zip(far_end(r, q));
                let Some((lo, ro)) = ends else {
                    return Err(malformed(
                        "each operand must relate the quantified variable to one free variable",
                    ));
                };
                if !((lo == f0 && ro == f1) || (lo == f1 && ro == f0)) {
                    return Err(malformed(
                        "operands must reach different free variables through the quantified one",
                    ));
                }
            }
        }
        Ok(())
    }

    fn parts(expr: &PathExpression) -> Option<(Connective, &Formula)> {
        match expr.node() {
            PathNode::Link(_) => None,
            PathNode::And(f) => Some((Connective::And, f)),
            PathNode::Or(f) => Some((Connective::Or, f)),
        }
    }

    fn describe(&self, connective: Connective) -> String {
        let mut out = String::new();
        let _ = self.write(&mut out, connective);
        out
    }

    fn write(&self, f: &mut impl fmt::Write, connective: Connective) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.free_vars.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{v}")?;
        }
        write!(f, ")")?;
        for q in &self.quantified_vars {
            write!(f, " {q}")?;
        }
        write!(
            f,
            " | ({}) {} ({})",
            self.lhs,
            connective.symbol(),
            self.rhs
        )
    }
}

/// The endpoint of `ends` that is not `q`, when exactly one of them is `q`.
fn far_end<'a>(ends: [&'a str; 2], q: &str) -> Option<&'a str> {
    match ends {
        [a, b] if a == q && b != q => Some(b),
        [a, b] if b == q && a != q => Some(a),
        _ => None,
    }
}

/// The node kinds of a path expression.
#[derive(Debug)]
pub enum PathNode {
    Link(Link),
    And(Formula),
    Or(Formula),
}

// ============================================================================
// PathExpression
// ============================================================================

/// Shared handle to an immutable path expression tree.
#[derive(Clone)]
pub struct PathExpression(Arc<PathNode>);

impl PathExpression {
    fn from_node(node: PathNode) -> Self {
        Self(Arc::new(node))
    }

    pub fn link(source: Var, sink: Var, kind: LinkKind) -> Self {
        Self::from_node(PathNode::Link(Link { source, sink, kind }))
    }

    /// Edge `e` to its endpoints in vertex set `v`.
    pub fn ev(e: Var, v: Var) -> Self {
        Self::link(e, v, LinkKind::EV)
    }

    /// Vertex `v` to the edges `e` incident on it.
    pub fn ve(v: Var, e: Var) -> Self {
        Self::link(v, e, LinkKind::VE)
    }

    /// Lattice element `u` to its `stencil` neighbors `v`.
    pub fn vv(u: Var, v: Var, stencil: Stencil) -> Self {
        Self::link(u, v, LinkKind::VV(stencil))
    }

    pub fn and(
        free_vars: Vec<Var>,
        quantified_vars: Vec<QuantifiedVar>,
        lhs: PathExpression,
        rhs: PathExpression,
    ) -> Result<Self> {
        Self::formula(Connective::And, free_vars, quantified_vars, lhs, rhs)
    }

    pub fn or(
        free_vars: Vec<Var>,
        quantified_vars: Vec<QuantifiedVar>,
        lhs: PathExpression,
        rhs: PathExpression,
    ) -> Result<Self> {
        Self::formula(Connective::Or, free_vars, quantified_vars, lhs, rhs)
    }

    pub fn formula(
        connective: Connective,
        free_vars: Vec<Var>,
        quantified_vars: Vec<QuantifiedVar>,
        lhs: PathExpression,
        rhs: PathExpression,
    ) -> Result<Self> {
        let formula = Formula {
            free_vars,
            quantified_vars,
            lhs,
            rhs,
        };
        formula.check(connective)?;
        Ok(Self::from_node(match connective {
            Connective::And => PathNode::And(formula),
            Connective::Or => PathNode::Or(formula),
        }))
    }

    /// Vertices that share an edge: `(vi,vj) exist e | ve(vi,e) ∧ ev(e,vj)`.
    pub fn vev(vi: Var, e: Var, vj: Var) -> Result<Self> {
        let ve = Self::ve(vi.clone(), e.clone());
        let ev = Self::ev(e.clone(), vj.clone());
        Self::and(vec![vi, vj], vec![QuantifiedVar::exists(e)], ve, ev)
    }

    /// Edges that share a vertex: `(ei,ej) exist v | ev(ei,v) ∧ ve(v,ej)`.
    pub fn eve(ei: Var, v: Var, ej: Var) -> Result<Self> {
        let ev = Self::ev(ei.clone(), v.clone());
        let ve = Self::ve(v.clone(), ej.clone());
        Self::and(vec![ei, ej], vec![QuantifiedVar::exists(v)], ev, ve)
    }

    pub fn node(&self) -> &PathNode {
        &self.0
    }

    pub fn connective(&self) -> Option<Connective> {
        match self.node() {
            PathNode::Link(_) => None,
            PathNode::And(_) => Some(Connective::And),
            PathNode::Or(_) => Some(Connective::Or),
        }
    }

    pub fn num_path_endpoints(&self) -> usize {
        match self.node() {
            PathNode::Link(_) => 2,
            PathNode::And(f) | PathNode::Or(f) => f.free_vars.len(),
        }
    }

    pub fn path_endpoint(&self, i: usize) -> Option<&Var> {
        match self.node() {
            PathNode::Link(link) => match i {
                0 => Some(&link.source),
                1 => Some(&link.sink),
                _ => None,
            },
            PathNode::And(f) | PathNode::Or(f) => f.free_vars.get(i),
        }
    }

    /// Ordinal of the endpoint named like `var`.
    pub fn endpoint_ordinal(&self, var: &Var) -> Option<usize> {
        (0..self.num_path_endpoints())
            .find(|&i| self.path_endpoint(i).map(Var::name) == Some(var.name()))
    }

    fn endpoint_names(&self) -> [&str; 2] {
        let name = |i| self.path_endpoint(i).map(Var::name).unwrap_or_default();
        [name(0), name(1)]
    }

    /// Every variable occurrence, in preorder.
    pub fn vars(&self) -> Vec<Var> {
        let mut out = Vec::new();
        self.collect_vars(&mut out);
        out
    }

    fn collect_vars(&self, out: &mut Vec<Var>) {
        match self.node() {
            PathNode::Link(link) => {
                out.push(link.source.clone());
                out.push(link.sink.clone());
            }
            PathNode::And(f) | PathNode::Or(f) => {
                out.extend(f.free_vars.iter().cloned());
                out.extend(f.quantified_vars.iter().map(|q| q.var().clone()));
                f.lhs.collect_vars(out);
                f.rhs.collect_vars(out);
            }
        }
    }

    /// `Ok(true)` when every variable is bound, `Ok(false)` when none is.
    pub fn check_bound(&self) -> Result<bool> {
        let vars = self.vars();
        let bound = vars.iter().filter(|v| v.is_bound()).count();
        if bound == 0 {
            Ok(false)
        } else if bound == vars.len() {
            Ok(true)
        } else {
            Err(PathError::PartiallyBound {
                expr: self.to_string(),
            })
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self.check_bound(), Ok(true))
    }

    /// Attach a set to every variable, by name.
    pub fn bind(&self, bindings: &Bindings) -> Result<Self> {
        self.map_vars(&mut |v: &Var| {
            bindings
                .get(v.name())
                .map(|set| v.rebind(set.clone()))
                .ok_or_else(|| PathError::UnboundVar {
                    name: v.name().to_string(),
                })
        })
    }

    /// Substitute `new_vars` for the path endpoints.
    ///
    /// Substitution is by name and respects quantifier scope. A new var that
    /// is itself unbound inherits the binding of the endpoint it replaces.
    pub fn rename(&self, new_vars: &[Var]) -> Result<Self> {
        if new_vars.len() != self.num_path_endpoints() {
            return Err(PathError::RenameArity {
                expr: self.to_string(),
                expected: self.num_path_endpoints(),
                found: new_vars.len(),
            });
        }
        let mut subst: Vec<(String, Var)> = Vec::with_capacity(new_vars.len());
        for (i, new) in new_vars.iter().enumerate() {
            let Some(old) = self.path_endpoint(i) else {
                continue;
            };
            let replacement = match old.binding() {
                Ok(set) if !new.is_bound() => new.rebind(set.clone()),
                _ => new.clone(),
            };
            subst.push((old.name().to_string(), replacement));
        }
        self.substitute(&subst)
    }

    fn substitute(&self, subst: &[(String, Var)]) -> Result<Self> {
        if subst.is_empty() {
            return Ok(self.clone());
        }
        let lookup = |v: &Var| {
            subst
                .iter()
                .find(|(name, _)| name == v.name())
                .map(|(_, new)| new.clone())
                .unwrap_or_else(|| v.clone())
        };
        let Some((connective, f)) = Formula::parts(self) else {
            return Ok(match self.node() {
                PathNode::Link(link) => Self::link(
                    lookup(&link.source),
                    lookup(&link.sink),
                    link.kind.clone(),
                ),
                _ => self.clone(),
            });
        };
        // Quantified vars shadow outer names in the operands.
        let mut inner: Vec<(String, Var)> = subst
            .iter()
            .filter(|(name, _)| !f.quantified_vars.iter().any(|q| q.var().name() == name))
            .cloned()
            .collect();
        // A quantified var named like a replacement would capture it; move it
        // to an unused name first.
        let mut quantified_vars = Vec::with_capacity(f.quantified_vars.len());
        for q in &f.quantified_vars {
            let name = q.var().name();
            if !subst.iter().any(|(_, new)| new.name() == name) {
                quantified_vars.push(q.clone());
                continue;
            }
            let fresh = q.var().renamed(self.unused_name(name, subst));
            inner.push((name.to_string(), fresh.clone()));
            quantified_vars.push(q.with_var(fresh));
        }
        Self::formula(
            connective,
            f.free_vars.iter().map(lookup).collect(),
            quantified_vars,
            f.lhs.substitute(&inner)?,
            f.rhs.substitute(&inner)?,
        )
    }

    /// `base` plus the smallest numeric suffix used neither in this tree nor
    /// in `subst`.
    fn unused_name(&self, base: &str, subst: &[(String, Var)]) -> String {
        let mut taken: AHashSet<String> = self
            .vars()
            .iter()
            .map(|v| v.name().to_string())
            .collect();
        for (old, new) in subst {
            taken.insert(old.clone());
            taken.insert(new.name().to_string());
        }
        (1u32..)
            .map(|n| format!("{base}{n}"))
            .find(|candidate| !taken.contains(candidate))
            .unwrap_or_else(|| format!("{base}'"))
    }

    /// Rebuild the tree with every variable passed through `f`.
    pub fn map_vars(&self, f: &mut dyn FnMut(&Var) -> Result<Var>) -> Result<Self> {
        let (connective, formula) = match self.node() {
            PathNode::Link(link) => {
                let source = f(&link.source)?;
                let sink = f(&link.sink)?;
                return Ok(Self::link(source, sink, link.kind.clone()));
            }
            PathNode::And(formula) => (Connective::And, formula),
            PathNode::Or(formula) => (Connective::Or, formula),
        };
        let mut free_vars = Vec::with_capacity(formula.free_vars.len());
        for v in &formula.free_vars {
            free_vars.push(f(v)?);
        }
        let mut quantified_vars = Vec::with_capacity(formula.quantified_vars.len());
        for q in &formula.quantified_vars {
            quantified_vars.push(q.with_var(f(q.var())?));
        }
        let lhs = formula.lhs.map_vars(f)?;
        let rhs = formula.rhs.map_vars(f)?;
        Self::formula(connective, free_vars, quantified_vars, lhs, rhs)
    }

    // ------------------------------------------------------------------------
    // Equality and ordering
    // ------------------------------------------------------------------------

    /// Shape-only key: insensitive to variable names and bindings.
    pub fn structural_key(&self) -> PathKey {
        PathKey::structural(self)
    }

    /// Key over the shape and the bound sets; `UnboundVar` if any var is unbound.
    pub fn bound_key(&self) -> Result<PathKey> {
        PathKey::bound(self)
    }

    /// Equal up to renaming, ignoring bindings.
    pub fn structural_eq(&self, other: &Self) -> bool {
        self.structural_key() == other.structural_key()
    }

    /// Both bound, with the same shape over the same sets.
    pub fn bound_eq(&self, other: &Self) -> bool {
        match (self.bound_key(), other.bound_key()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    pub fn structural_cmp(&self, other: &Self) -> Ordering {
        self.structural_key().cmp(&other.structural_key())
    }

    /// `None` unless both expressions are bound.
    pub fn bound_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.bound_key().ok()?.cmp(&other.bound_key().ok()?))
    }

    /// True when both handles alias the same tree.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            PathNode::Link(link) => {
                let tag = match link.kind {
                    LinkKind::EV => "ev",
                    LinkKind::VE => "ve",
                    LinkKind::VV(_) => "vv",
                };
                write!(f, "{tag}({},{})", link.source, link.sink)
            }
            PathNode::And(formula) => formula.write(f, Connective::And),
            PathNode::Or(formula) => formula.write(f, Connective::Or),
        }
    }
}

impl fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
