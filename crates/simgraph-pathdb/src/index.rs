//! Path indices: realized neighbor relations.
//!
//! A [`PathIndex`] maps every source element id in `[0, num_elements)` to an
//! ordered list of sink ids. It is immutable and shared through `Arc`, so the
//! builder's memo cache and every consumer hold the same object; equality is
//! object identity.
//!
//! Two physical layouts exist:
//!
//! - [`SegmentedPathIndex`]: CSR arrays. `coords` holds `num_elements + 1`
//!   non-decreasing offsets into `sinks`; the last offset is the total number
//!   of neighbors.
//! - [`SetEndpointPathIndex`]: a zero-copy view of a homogeneous edge set's
//!   endpoint array, where row `e` is simply the endpoints of edge `e`.

use std::fmt;
use std::ops::Range;
use std::slice;
use std::sync::Arc;

use simgraph_graph::{GraphSet, SetRef};

use crate::error::{PathError, Result};

// ============================================================================
// Segmented (CSR) layout
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentedPathIndex {
    coords: Vec<u32>,
    sinks: Vec<u32>,
    /// Common row length, when every row has the same length.
    row_width: Option<usize>,
}

impl SegmentedPathIndex {
    /// Pack one neighbor list per element.
    pub fn from_rows(mut rows: Vec<Vec<u32>>, sort: bool) -> Self {
        let total: usize = rows.iter().map(Vec::len).sum();
        let mut coords = Vec::with_capacity(rows.len() + 1);
        let mut sinks = Vec::with_capacity(total);
        coords.push(0);
        for row in &mut rows {
            if sort {
                row.sort_unstable();
            }
            sinks.extend_from_slice(row);
            coords.push(sinks.len() as u32);
        }
        let row_width = uniform_width(&rows);
        Self {
            coords,
            sinks,
            row_width,
        }
    }

    /// Pack an `{element -> neighbors}` map over `num_elements` elements.
    /// Elements missing from the map get empty rows.
    pub fn pack<I>(num_elements: usize, neighbors: I, sort: bool) -> Result<Self>
    where
        I: IntoIterator<Item = (u32, Vec<u32>)>,
    {
        let mut rows = vec![Vec::new(); num_elements];
        for (element, nbrs) in neighbors {
            let row = rows
                .get_mut(element as usize)
                .ok_or(PathError::ElementOutOfRange {
                    element,
                    num_elements,
                })?;
            row.extend(nbrs);
        }
        Ok(Self::from_rows(rows, sort))
    }

    /// Fixed-width layout: row `i` is `sinks[i * width..(i + 1) * width]`.
    pub(crate) fn fixed_width(num_elements: usize, width: usize, sinks: Vec<u32>) -> Self {
        debug_assert_eq!(sinks.len(), num_elements * width);
        Self {
            coords: (0..=num_elements).map(|i| (i * width) as u32).collect(),
            sinks,
            row_width: (num_elements > 0).then_some(width),
        }
    }

    pub fn num_elements(&self) -> usize {
        self.coords.len() - 1
    }

    pub fn num_neighbors(&self) -> usize {
        self.sinks.len()
    }

    pub fn row_width(&self) -> Option<usize> {
        self.row_width
    }

    /// Neighbors of `element`; empty when out of range.
    pub fn row(&self, element: u32) -> &[u32] {
        let e = element as usize;
        match (self.coords.get(e), self.coords.get(e + 1)) {
            (Some(&start), Some(&end)) => &self.sinks[start as usize..end as usize],
            _ => &[],
        }
    }

    /// Offsets array (`num_elements + 1` entries).
    pub fn coord_data(&self) -> &[u32] {
        &self.coords
    }

    /// Flat neighbor array.
    pub fn sink_data(&self) -> &[u32] {
        &self.sinks
    }
}

fn uniform_width(rows: &[Vec<u32>]) -> Option<usize> {
    let width = rows.first()?.len();
    rows.iter().all(|r| r.len() == width).then_some(width)
}

// ============================================================================
// Zero-copy endpoint view
// ============================================================================

#[derive(Debug, Clone)]
pub struct SetEndpointPathIndex {
    edge_set: SetRef,
}

impl SetEndpointPathIndex {
    /// View `edge_set`'s endpoints as an index; the set must be a homogeneous
    /// edge set.
    pub fn new(edge_set: SetRef) -> Result<Self> {
        if edge_set.cardinality() == 0 {
            return Err(PathError::NotAnEdgeSet {
                set: edge_set.name().to_string(),
            });
        }
        if !edge_set.is_homogeneous() {
            return Err(PathError::NotHomogeneous {
                set: edge_set.name().to_string(),
            });
        }
        Ok(Self { edge_set })
    }

    pub fn edge_set(&self) -> &SetRef {
        &self.edge_set
    }

    pub fn num_elements(&self) -> usize {
        self.edge_set.size()
    }

    pub fn num_neighbors(&self) -> usize {
        self.edge_set.size() * self.edge_set.cardinality()
    }

    pub fn row_width(&self) -> usize {
        self.edge_set.cardinality()
    }

    pub fn row(&self, element: u32) -> &[u32] {
        let width = self.row_width();
        let start = element as usize * width;
        self.edge_set
            .endpoints_data()
            .get(start..start + width)
            .unwrap_or(&[])
    }
}

// ============================================================================
// PathIndex
// ============================================================================

#[derive(Debug)]
pub enum PathIndexRepr {
    Segmented(SegmentedPathIndex),
    SetEndpoint(SetEndpointPathIndex),
}

/// Shared handle to an immutable path index.
#[derive(Clone)]
pub struct PathIndex(Arc<PathIndexRepr>);

impl PathIndex {
    pub fn repr(&self) -> &PathIndexRepr {
        &self.0
    }

    pub fn as_segmented(&self) -> Option<&SegmentedPathIndex> {
        match self.repr() {
            PathIndexRepr::Segmented(s) => Some(s),
            PathIndexRepr::SetEndpoint(_) => None,
        }
    }

    pub fn as_set_endpoint(&self) -> Option<&SetEndpointPathIndex> {
        match self.repr() {
            PathIndexRepr::SetEndpoint(s) => Some(s),
            PathIndexRepr::Segmented(_) => None,
        }
    }

    pub fn num_elements(&self) -> usize {
        match self.repr() {
            PathIndexRepr::Segmented(s) => s.num_elements(),
            PathIndexRepr::SetEndpoint(s) => s.num_elements(),
        }
    }

    /// Total number of neighbors over all elements.
    pub fn num_neighbors(&self) -> usize {
        match self.repr() {
            PathIndexRepr::Segmented(s) => s.num_neighbors(),
            PathIndexRepr::SetEndpoint(s) => s.num_neighbors(),
        }
    }

    pub fn num_neighbors_of(&self, element: u32) -> usize {
        self.row(element).len()
    }

    /// Common row length for fixed-arity indices (endpoint views, stencils,
    /// edge-to-vertex links).
    pub fn row_width(&self) -> Option<usize> {
        match self.repr() {
            PathIndexRepr::Segmented(s) => s.row_width(),
            PathIndexRepr::SetEndpoint(s) => Some(s.row_width()),
        }
    }

    fn row(&self, element: u32) -> &[u32] {
        match self.repr() {
            PathIndexRepr::Segmented(s) => s.row(element),
            PathIndexRepr::SetEndpoint(s) => s.row(element),
        }
    }

    /// Sink ids of `element` in index order; empty when out of range.
    pub fn neighbors(&self, element: u32) -> Neighbors<'_> {
        Neighbors {
            inner: self.row(element).iter(),
        }
    }

    /// Like [`neighbors`](Self::neighbors), but rejects out-of-range ids.
    pub fn try_neighbors(&self, element: u32) -> Result<Neighbors<'_>> {
        if element as usize >= self.num_elements() {
            return Err(PathError::ElementOutOfRange {
                element,
                num_elements: self.num_elements(),
            });
        }
        Ok(self.neighbors(element))
    }

    /// Source element ids in ascending order.
    pub fn iter(&self) -> Range<u32> {
        0..self.num_elements() as u32
    }

    /// `(element, neighbors)` for every element.
    pub fn rows(&self) -> impl Iterator<Item = (u32, Neighbors<'_>)> + '_ {
        self.iter().map(move |e| (e, self.neighbors(e)))
    }

    /// True when both handles refer to the same index object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl From<SegmentedPathIndex> for PathIndex {
    fn from(index: SegmentedPathIndex) -> Self {
        Self(Arc::new(PathIndexRepr::Segmented(index)))
    }
}

impl From<SetEndpointPathIndex> for PathIndex {
    fn from(index: SetEndpointPathIndex) -> Self {
        Self(Arc::new(PathIndexRepr::SetEndpoint(index)))
    }
}

impl PartialEq for PathIndex {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for PathIndex {}

impl<'a> IntoIterator for &'a PathIndex {
    type Item = u32;
    type IntoIter = Range<u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.repr() {
            PathIndexRepr::Segmented(_) => writeln!(f, "SegmentedPathIndex:")?,
            PathIndexRepr::SetEndpoint(s) => {
                writeln!(f, "SetEndpointPathIndex({}):", s.edge_set().name())?
            }
        }
        for (e, nbrs) in self.rows() {
            write!(f, "  {e}:")?;
            for n in nbrs {
                write!(f, " {n}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PathIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathIndex")
            .field("num_elements", &self.num_elements())
            .field("num_neighbors", &self.num_neighbors())
            .field("segmented", &self.as_segmented().is_some())
            .finish()
    }
}

/// Lazy, restartable (`Clone`) sequence of sink ids.
#[derive(Debug, Clone)]
pub struct Neighbors<'a> {
    inner: slice::Iter<'a, u32>,
}

impl<'a> Neighbors<'a> {
    /// The remaining neighbors as a slice.
    pub fn as_slice(&self) -> &'a [u32] {
        self.inner.as_slice()
    }
}

impl Iterator for Neighbors<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        self.inner.next().copied()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Neighbors<'_> {}
