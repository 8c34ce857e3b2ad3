//! Path variables and set bindings.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;
use simgraph_graph::{SetId, SetRef};

use crate::error::{PathError, Result};

/// A logical path endpoint: a name, optionally bound to a concrete set.
///
/// Within one path expression, variables are identified by name. Two vars
/// compare equal when their names match, or, once both are bound, when they
/// are bound to the same set. (This relation is not transitive, so `Var` is
/// `PartialEq` only.)
#[derive(Clone)]
pub struct Var(Arc<VarInner>);

struct VarInner {
    name: String,
    binding: Option<SetRef>,
}

impl Var {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(VarInner {
            name: name.into(),
            binding: None,
        }))
    }

    pub fn bound(name: impl Into<String>, set: SetRef) -> Self {
        Self(Arc::new(VarInner {
            name: name.into(),
            binding: Some(set),
        }))
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_bound(&self) -> bool {
        self.0.binding.is_some()
    }

    /// The bound set, or `UnboundVar`.
    pub fn binding(&self) -> Result<&SetRef> {
        self.0.binding.as_ref().ok_or_else(|| PathError::UnboundVar {
            name: self.0.name.clone(),
        })
    }

    pub fn set_id(&self) -> Option<SetId> {
        self.0.binding.as_ref().map(|s| s.id())
    }

    /// Same name, new binding.
    pub fn rebind(&self, set: SetRef) -> Self {
        Self::bound(self.0.name.clone(), set)
    }

    /// New name, same binding.
    pub(crate) fn renamed(&self, name: impl Into<String>) -> Self {
        Self(Arc::new(VarInner {
            name: name.into(),
            binding: self.0.binding.clone(),
        }))
    }

    /// True when both handles point at the same var object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        match (self.set_id(), other.set_id()) {
            (Some(a), Some(b)) => a == b,
            _ => self.name() == other.name(),
        }
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.binding {
            Some(set) if !set.name().is_empty() => {
                write!(f, "({} in {})", self.name(), set.name())
            }
            _ => f.write_str(self.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Quantifier {
    Existential,
}

/// A variable bound by a quantifier inside an `And`/`Or` formula.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantifiedVar {
    quantifier: Quantifier,
    var: Var,
}

impl QuantifiedVar {
    pub fn new(quantifier: Quantifier, var: Var) -> Self {
        Self { quantifier, var }
    }

    pub fn exists(var: Var) -> Self {
        Self::new(Quantifier::Existential, var)
    }

    pub fn quantifier(&self) -> Quantifier {
        self.quantifier
    }

    pub fn var(&self) -> &Var {
        &self.var
    }

    pub(crate) fn with_var(&self, var: Var) -> Self {
        Self {
            quantifier: self.quantifier,
            var,
        }
    }
}

impl fmt::Display for QuantifiedVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.quantifier {
            Quantifier::Existential => write!(f, "exist {}", self.var),
        }
    }
}

/// Variable name -> concrete set.
#[derive(Clone, Default)]
pub struct Bindings {
    sets: AHashMap<String, SetRef>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `var`'s name to `set`, replacing any previous binding.
    pub fn insert(&mut self, var: &Var, set: SetRef) {
        self.sets.insert(var.name().to_string(), set);
    }

    pub fn insert_name(&mut self, name: impl Into<String>, set: SetRef) {
        self.sets.insert(name.into(), set);
    }

    pub fn with(mut self, var: &Var, set: SetRef) -> Self {
        self.insert(var, set);
        self
    }

    pub fn get(&self, name: &str) -> Option<&SetRef> {
        self.sets.get(name)
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

impl fmt::Debug for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<(&String, &str)> =
            self.sets.iter().map(|(k, v)| (k, v.name())).collect();
        names.sort();
        f.debug_map().entries(names).finish()
    }
}
