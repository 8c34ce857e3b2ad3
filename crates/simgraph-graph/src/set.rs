use std::sync::Arc;

use crate::{lattice, ElementRef, GraphError, GraphSet, SetId, SetRef};

/// In-memory set: plain vertex set, edge set, or lattice.
///
/// Not `Clone`: every set owns a unique `SetId`.
#[derive(Debug)]
pub struct Set {
    id: SetId,
    name: String,
    /// Set behind each endpoint position (empty for vertex sets).
    endpoint_sets: Vec<SetId>,
    /// Names of the endpoint sets, for diagnostics.
    endpoint_names: Vec<String>,
    /// `cardinality` endpoint ids per element.
    endpoints: Vec<u32>,
    size: usize,
    dimensions: Option<Vec<usize>>,
}

impl Set {
    /// A vertex set with no elements.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: SetId::fresh(),
            name: name.into(),
            endpoint_sets: Vec::new(),
            endpoint_names: Vec::new(),
            endpoints: Vec::new(),
            size: 0,
            dimensions: None,
        }
    }

    /// An edge set whose elements connect one element of each of `endpoints`,
    /// in order.
    pub fn edge_set(name: impl Into<String>, endpoints: &[&Set]) -> Self {
        Self {
            endpoint_sets: endpoints.iter().map(|s| s.id).collect(),
            endpoint_names: endpoints.iter().map(|s| s.name.clone()).collect(),
            ..Self::new(name)
        }
    }

    /// A periodic lattice with the given extents (fastest-varying first).
    pub fn lattice(name: impl Into<String>, dims: Vec<usize>) -> Result<Self, GraphError> {
        if dims.is_empty() || dims.contains(&0) {
            return Err(GraphError::InvalidDimensions { dims });
        }
        let size = dims.iter().product();
        Ok(Self {
            size,
            dimensions: Some(dims),
            ..Self::new(name)
        })
    }

    pub fn id(&self) -> SetId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Add a vertex.
    pub fn add(&mut self) -> Result<ElementRef, GraphError> {
        if !self.endpoint_sets.is_empty() {
            return Err(GraphError::NotAVertexSet {
                set: self.name.clone(),
            });
        }
        if self.dimensions.is_some() {
            return Err(GraphError::FixedLattice {
                set: self.name.clone(),
            });
        }
        Ok(self.push_element())
    }

    /// Add an edge connecting `endpoints`, one per endpoint position.
    pub fn add_edge(&mut self, endpoints: &[ElementRef]) -> Result<ElementRef, GraphError> {
        if self.endpoint_sets.is_empty() {
            return Err(GraphError::NotAnEdgeSet {
                set: self.name.clone(),
            });
        }
        if endpoints.len() != self.endpoint_sets.len() {
            return Err(GraphError::EndpointCount {
                set: self.name.clone(),
                expected: self.endpoint_sets.len(),
                found: endpoints.len(),
            });
        }
        for (position, (endpoint, &expected)) in
            endpoints.iter().zip(&self.endpoint_sets).enumerate()
        {
            if endpoint.set() != expected {
                return Err(GraphError::EndpointSetMismatch {
                    set: self.name.clone(),
                    position,
                    expected,
                    found: endpoint.set(),
                });
            }
        }
        self.endpoints.extend(endpoints.iter().map(|e| e.ident()));
        Ok(self.push_element())
    }

    fn push_element(&mut self) -> ElementRef {
        let ident = self.size as u32;
        self.size += 1;
        ElementRef::new(self.id, ident)
    }

    /// Look up an element by dense id.
    pub fn element(&self, ident: u32) -> Option<ElementRef> {
        ((ident as usize) < self.size).then(|| ElementRef::new(self.id, ident))
    }

    pub fn elements(&self) -> impl Iterator<Item = ElementRef> + '_ {
        (0..self.size as u32).map(move |ident| ElementRef::new(self.id, ident))
    }

    /// Endpoint ids of `element` (empty for vertices).
    pub fn endpoints_of(&self, element: ElementRef) -> &[u32] {
        let card = self.endpoint_sets.len();
        let start = element.ident() as usize * card;
        self.endpoints.get(start..start + card).unwrap_or(&[])
    }

    /// Name of the set behind endpoint `position`.
    pub fn endpoint_set_name(&self, position: usize) -> Option<&str> {
        self.endpoint_names.get(position).map(String::as_str)
    }

    /// Lattice element at `coords`.
    pub fn lattice_element(&self, coords: &[usize]) -> Result<ElementRef, GraphError> {
        let dims = self
            .dimensions
            .as_deref()
            .ok_or_else(|| GraphError::NotALattice {
                set: self.name.clone(),
            })?;
        lattice::id_of(dims, coords)
            .map(|id| ElementRef::new(self.id, id as u32))
            .ok_or_else(|| GraphError::CoordinateOutOfRange {
                coords: coords.to_vec(),
                dims: dims.to_vec(),
            })
    }

    /// Freeze the set into a shared handle.
    pub fn into_ref(self) -> SetRef {
        Arc::new(self)
    }
}

impl GraphSet for Set {
    fn id(&self) -> SetId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> usize {
        self.size
    }

    fn cardinality(&self) -> usize {
        self.endpoint_sets.len()
    }

    fn endpoint_set(&self, position: usize) -> Option<SetId> {
        self.endpoint_sets.get(position).copied()
    }

    fn endpoints_data(&self) -> &[u32] {
        &self.endpoints
    }

    fn dimensions(&self) -> Option<&[usize]> {
        self.dimensions.as_deref()
    }
}
