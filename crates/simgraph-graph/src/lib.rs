//! Graph sets for simgraph programs.
//!
//! A simgraph program computes over **sets**: vertex sets, edge sets whose
//! elements connect a fixed number of endpoints drawn from other sets, and
//! lattice (grid) sets whose elements are addressed by periodic coordinates.
//!
//! The path index builder never looks inside a concrete container. It talks
//! to sets through the [`GraphSet`] trait, which exposes exactly what index
//! construction needs:
//!
//! - size and cardinality (endpoints per element),
//! - the identity of the set behind each endpoint position,
//! - per-element endpoints and the raw endpoint array (for zero-copy views),
//! - lattice dimensions and the coordinate <-> id mapping.
//!
//! [`Set`] is the in-memory implementation used by the compiler front end and
//! by tests; [`create_box`] builds the structured meshes used as fixtures.

pub mod error;
pub mod lattice;
mod set;

use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub use error::GraphError;
pub use lattice::{create_box, MeshBox};
pub use set::Set;

// ============================================================================
// Identity
// ============================================================================

static NEXT_SET_ID: AtomicU64 = AtomicU64::new(1);

/// A process-local identity for a set.
///
/// Endpoint positions of an edge set refer to other sets by `SetId`, and
/// bound path expressions compare sets by `SetId`, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SetId(NonZeroU64);

impl SetId {
    pub fn fresh() -> Self {
        let raw = NEXT_SET_ID.fetch_add(1, Ordering::Relaxed);
        Self(NonZeroU64::new(raw).unwrap_or(NonZeroU64::MIN))
    }

    pub fn raw(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for SetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to one element of a set.
///
/// Only the owning set hands these out, so `ident` is always below that
/// set's size; sets never shrink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef {
    set: SetId,
    ident: u32,
}

impl ElementRef {
    pub(crate) const fn new(set: SetId, ident: u32) -> Self {
        Self { set, ident }
    }

    /// The set this element belongs to.
    pub fn set(self) -> SetId {
        self.set
    }

    /// Dense element id in `[0, set.size())`.
    pub fn ident(self) -> u32 {
        self.ident
    }
}

// ============================================================================
// The collaborator interface
// ============================================================================

/// Read-only view of a set, as consumed by path index construction.
pub trait GraphSet: fmt::Debug + Send + Sync {
    fn id(&self) -> SetId;

    fn name(&self) -> &str;

    /// Number of elements.
    fn size(&self) -> usize;

    /// Number of endpoints per element (0 for vertex and lattice sets).
    fn cardinality(&self) -> usize;

    /// Identity of the set behind endpoint `position`.
    fn endpoint_set(&self, position: usize) -> Option<SetId>;

    /// Endpoint id at `position` of `element`.
    fn endpoint(&self, element: u32, position: usize) -> u32 {
        self.endpoints_data()[element as usize * self.cardinality() + position]
    }

    /// Flat endpoint array, `cardinality()` entries per element.
    fn endpoints_data(&self) -> &[u32];

    /// True when every endpoint position refers to the same set.
    fn is_homogeneous(&self) -> bool {
        let Some(first) = self.endpoint_set(0) else {
            return false;
        };
        (1..self.cardinality()).all(|i| self.endpoint_set(i) == Some(first))
    }

    /// Lattice extents, fastest-varying dimension first.
    fn dimensions(&self) -> Option<&[usize]> {
        None
    }

    fn is_lattice(&self) -> bool {
        self.dimensions().is_some()
    }

    fn lattice_coords(&self, element: u32) -> Option<Vec<usize>> {
        Some(lattice::coords_of(self.dimensions()?, element as usize))
    }

    fn lattice_id(&self, coords: &[usize]) -> Option<u32> {
        lattice::id_of(self.dimensions()?, coords).map(|id| id as u32)
    }
}

/// Shared handle to a set.
pub type SetRef = Arc<dyn GraphSet>;
