//! PathDB: path expressions over graph sets and the neighbor indices they
//! realize.
//!
//! The compiler describes every sparse neighbor relation it needs
//! (edge -> endpoints, vertex -> incident edges, vertex -> vertices sharing an
//! edge, lattice stencils) as a [`PathExpression`]. Binding the expression's
//! variables to concrete sets and handing it to a [`PathIndexBuilder`] yields
//! a [`PathIndex`]: a CSR-style map from every source element to its ordered
//! sink elements, used to size and drive sparse matrix assembly.
//!
//! ## Module Organization
//!
//! - `var`: variables, quantifiers, and name -> set bindings
//! - `expr`: the expression algebra (links, `And`/`Or` formulas)
//! - `key`: canonical keys for equality, ordering, and memoization
//! - `index`: the two physical index layouts behind [`PathIndex`]
//! - `builder`: evaluation with a per-builder memo cache
//! - `config`: builder knobs, loadable from JSON
//!
//! ## Logging
//!
//! The crate logs through `tracing` and never installs a subscriber; cache
//! hits and index construction are reported at `debug`, per-node evaluation at
//! `trace`.

pub mod builder;
pub mod config;
pub mod error;
pub mod expr;
pub mod index;
mod key;
pub mod var;

pub use builder::{BuildStats, PathIndexBuilder};
pub use config::PathIndexConfig;
pub use error::{PathError, Result};
pub use expr::{Connective, Formula, Link, LinkKind, PathExpression, PathNode, Stencil};
pub use index::{
    Neighbors, PathIndex, PathIndexRepr, SegmentedPathIndex, SetEndpointPathIndex,
};
pub use key::PathKey;
pub use var::{Bindings, QuantifiedVar, Quantifier, Var};
