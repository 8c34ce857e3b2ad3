//! Internal invariant violations.
//!
//! Path expressions are only built from type-checked programs, so every error
//! here points at a bug in the caller. None of them is recoverable: callers
//! abort compilation with the message.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("no binding for variable `{name}`")]
    UnboundVar { name: String },

    #[error("some but not all variables of `{expr}` are bound")]
    PartiallyBound { expr: String },

    #[error("`{name}` is already bound to set `{existing}`")]
    Rebound { name: String, existing: String },

    #[error("path expressions relate exactly 2 free variables, got {count}")]
    UnsupportedFreeVars { count: usize },

    #[error("at most 1 quantified variable is supported, got {count}")]
    UnsupportedQuantifiedVars { count: usize },

    #[error("malformed formula `{expr}`: {reason}")]
    MalformedFormula { expr: String, reason: String },

    #[error("rename of `{expr}` expects {expected} variables, got {found}")]
    RenameArity {
        expr: String,
        expected: usize,
        found: usize,
    },

    #[error("source endpoint {ordinal} is out of range for `{expr}`")]
    InvalidSourceEndpoint { expr: String, ordinal: usize },

    #[error("`{set}` is not an edge set")]
    NotAnEdgeSet { set: String },

    #[error("edge set `{edge_set}` has no endpoint in `{vertex_set}`")]
    EndpointSetMismatch {
        edge_set: String,
        vertex_set: String,
    },

    #[error("edge set `{set}` is not homogeneous")]
    NotHomogeneous { set: String },

    #[error("`{set}` is not a lattice")]
    NotALattice { set: String },

    #[error("stencil link relates `{source_set}` and `{sink_set}`; both ends must be the same lattice")]
    GridMismatch { source_set: String, sink_set: String },

    #[error("stencil offset {offset:?} has {found} components, lattice `{set}` has {expected} dimensions")]
    StencilArity {
        set: String,
        offset: Vec<i32>,
        expected: usize,
        found: usize,
    },

    #[error("stencil offset {offset:?} has {found} components, the first offset has {expected}")]
    RaggedStencil {
        offset: Vec<i32>,
        expected: usize,
        found: usize,
    },

    #[error("stencil is empty")]
    EmptyStencil,

    #[error("element {element} is out of range for an index over {num_elements} elements")]
    ElementOutOfRange { element: u32, num_elements: usize },
}

pub type Result<T> = std::result::Result<T, PathError>;
