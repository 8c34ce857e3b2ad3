//! Errors raised while populating graph sets.

use crate::SetId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("set `{set}` expects {expected} endpoints per element, got {found}")]
    EndpointCount {
        set: String,
        expected: usize,
        found: usize,
    },

    #[error("endpoint {position} of an element of `{set}` belongs to set #{found}, expected set #{expected}")]
    EndpointSetMismatch {
        set: String,
        position: usize,
        expected: SetId,
        found: SetId,
    },

    #[error("`{set}` is an edge set; use `add_edge`")]
    NotAVertexSet { set: String },

    #[error("`{set}` is not an edge set")]
    NotAnEdgeSet { set: String },

    #[error("`{set}` is a lattice; its elements are fixed by its dimensions")]
    FixedLattice { set: String },

    #[error("`{set}` is not a lattice")]
    NotALattice { set: String },

    #[error("invalid lattice dimensions {dims:?}: every dimension must be non-zero")]
    InvalidDimensions { dims: Vec<usize> },

    #[error("lattice coordinate {coords:?} does not fit dimensions {dims:?}")]
    CoordinateOutOfRange { coords: Vec<usize>, dims: Vec<usize> },
}
