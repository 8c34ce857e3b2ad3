//! Evaluating bound path expressions into path indices.
//!
//! [`PathIndexBuilder::build_segmented`] dispatches on the outermost node of
//! an expression and realizes operands recursively through itself, so every
//! sub-expression lands in the memo cache too. The cache is keyed by the
//! expression's *bound* key and the requested source endpoint; expressions
//! that differ only in variable names but are bound to the same sets share
//! one index.
//!
//! Row-wise set algebra (intersection, union, two-hop joins) runs on
//! `RoaringBitmap`s, which also yields sorted, deduplicated rows for free.

use ahash::AHashMap;
use roaring::RoaringBitmap;
use simgraph_graph::{lattice, GraphSet, SetRef};

use crate::config::PathIndexConfig;
use crate::error::{PathError, Result};
use crate::expr::{Connective, Formula, LinkKind, PathExpression, PathNode, Stencil};
use crate::index::{PathIndex, SegmentedPathIndex, SetEndpointPathIndex};
use crate::key::PathKey;
use crate::var::{Bindings, Var};

/// Cache counters, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub hits: u64,
    pub misses: u64,
}

/// Realizes path expressions; one per compilation.
pub struct PathIndexBuilder {
    config: PathIndexConfig,
    bindings: Bindings,
    cache: AHashMap<(PathKey, usize), PathIndex>,
    stats: BuildStats,
}

impl Default for PathIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PathIndexBuilder {
    pub fn new() -> Self {
        Self::with_config(PathIndexConfig::default())
    }

    pub fn with_config(config: PathIndexConfig) -> Self {
        Self {
            config,
            bindings: Bindings::new(),
            cache: AHashMap::new(),
            stats: BuildStats::default(),
        }
    }

    pub fn config(&self) -> &PathIndexConfig {
        &self.config
    }

    /// Register `set` under `name`. Bindings are append-only: binding a name
    /// again to the same set is a no-op, to a different set an error.
    pub fn bind(&mut self, name: impl Into<String>, set: SetRef) -> Result<()> {
        let name = name.into();
        if let Some(existing) = self.bindings.get(&name) {
            if existing.id() == set.id() {
                return Ok(());
            }
            return Err(PathError::Rebound {
                name,
                existing: existing.name().to_string(),
            });
        }
        tracing::debug!(var = %name, set = %set.name(), "bind");
        self.bindings.insert_name(name, set);
        Ok(())
    }

    pub fn binding(&self, name: &str) -> Option<&SetRef> {
        self.bindings.get(name)
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    /// Realize `expr` with path endpoint `source_endpoint` as the row index.
    ///
    /// Unbound expressions are bound from this builder's binding table first.
    pub fn build_segmented(
        &mut self,
        expr: &PathExpression,
        source_endpoint: usize,
    ) -> Result<PathIndex> {
        if source_endpoint >= expr.num_path_endpoints() {
            return Err(PathError::InvalidSourceEndpoint {
                expr: expr.to_string(),
                ordinal: source_endpoint,
            });
        }
        let bound = if expr.check_bound()? {
            expr.clone()
        } else {
            expr.bind(&self.bindings)?
        };

        let key = (bound.bound_key()?, source_endpoint);
        if let Some(index) = self.cache.get(&key) {
            self.stats.hits += 1;
            tracing::debug!(expr = %bound, source_endpoint, "path index cache hit");
            return Ok(index.clone());
        }
        self.stats.misses += 1;

        let index = match bound.node() {
            PathNode::Link(link) => {
                let source = link.source().binding()?;
                let sink = link.sink().binding()?;
                self.build_link(link.kind(), source, sink, source_endpoint)?
            }
            PathNode::And(f) => self.build_formula(Connective::And, f, source_endpoint)?,
            PathNode::Or(f) => self.build_formula(Connective::Or, f, source_endpoint)?,
        };
        tracing::debug!(
            expr = %bound,
            source_endpoint,
            num_elements = index.num_elements(),
            num_neighbors = index.num_neighbors(),
            "built path index"
        );
        self.cache.insert(key, index.clone());
        Ok(index)
    }

    // ------------------------------------------------------------------------
    // Links
    // ------------------------------------------------------------------------

    fn build_link(
        &self,
        kind: &LinkKind,
        source: &SetRef,
        sink: &SetRef,
        source_endpoint: usize,
    ) -> Result<PathIndex> {
        // Endpoint 1 as the row index realizes the inverse relation.
        let inverse = source_endpoint == 1;
        match (kind, inverse) {
            (LinkKind::EV, false) => self.edges_to_vertices(source, sink),
            (LinkKind::EV, true) => self.vertices_to_edges(sink, source),
            (LinkKind::VE, false) => self.vertices_to_edges(source, sink),
            (LinkKind::VE, true) => self.edges_to_vertices(sink, source),
            (LinkKind::VV(stencil), false) => stencil_neighbors(source, sink, stencil),
            (LinkKind::VV(stencil), true) => stencil_neighbors(sink, source, &stencil.inverse()),
        }
    }

    fn edges_to_vertices(&self, edges: &SetRef, vertices: &SetRef) -> Result<PathIndex> {
        let positions = incident_positions(edges, vertices)?;
        let card = edges.cardinality();
        tracing::trace!(edges = %edges.name(), vertices = %vertices.name(), ?positions, "ev");

        if positions.len() == card && self.config.zero_copy_endpoints {
            return Ok(SetEndpointPathIndex::new(edges.clone())?.into());
        }
        if self.config.zero_copy_endpoints {
            tracing::debug!(
                edges = %edges.name(),
                "edge set is not homogeneous over the target set; copying endpoints"
            );
        }

        let num_edges = edges.size();
        let mut sinks = Vec::with_capacity(num_edges * positions.len());
        for e in 0..num_edges as u32 {
            for &p in &positions {
                sinks.push(edges.endpoint(e, p));
            }
        }
        Ok(SegmentedPathIndex::fixed_width(num_edges, positions.len(), sinks).into())
    }

    fn vertices_to_edges(&self, vertices: &SetRef, edges: &SetRef) -> Result<PathIndex> {
        let positions = incident_positions(edges, vertices)?;
        tracing::trace!(vertices = %vertices.name(), edges = %edges.name(), ?positions, "ve");

        let num_vertices = vertices.size();
        let mut rows: Vec<Vec<u32>> = vec![Vec::new(); num_vertices];
        for e in 0..edges.size() as u32 {
            for &p in &positions {
                let v = edges.endpoint(e, p);
                let row = rows
                    .get_mut(v as usize)
                    .ok_or(PathError::ElementOutOfRange {
                        element: v,
                        num_elements: num_vertices,
                    })?;
                row.push(e);
            }
        }
        Ok(SegmentedPathIndex::from_rows(rows, self.config.sort_rows).into())
    }

    // ------------------------------------------------------------------------
    // Formulas
    // ------------------------------------------------------------------------

    fn build_formula(
        &mut self,
        connective: Connective,
        formula: &Formula,
        source_endpoint: usize,
    ) -> Result<PathIndex> {
        let row_var = &formula.free_vars()[source_endpoint];
        let sink_var = &formula.free_vars()[1 - source_endpoint];
        tracing::trace!(?connective, row = %row_var, sink = %sink_var, "formula");

        let Some(q) = formula.quantified() else {
            let lhs = self.build_operand(formula.lhs(), row_var)?;
            let rhs = self.build_operand(formula.rhs(), row_var)?;
            let rows = (0..lhs.num_elements() as u32).map(|e| {
                let l = row_bitmap(&lhs, e);
                let r = row_bitmap(&rhs, e);
                match connective {
                    Connective::And => l & r,
                    Connective::Or => l | r,
                }
            });
            return Ok(pack_bitmaps(rows));
        };

        // The operand mentioning the row variable is the first hop.
        let (near, far) = if formula.lhs().endpoint_ordinal(row_var).is_some() {
            (formula.lhs(), formula.rhs())
        } else {
            (formula.rhs(), formula.lhs())
        };
        let source_to_quantified = self.build_operand(near, row_var)?;
        let quantified_to_sink = self.build_operand(far, q)?;

        let num_sources = source_to_quantified.num_elements() as u32;
        let index = match connective {
            Connective::And => pack_bitmaps((0..num_sources).map(|e| {
                let mut row = RoaringBitmap::new();
                for hop in source_to_quantified.neighbors(e) {
                    row.extend(quantified_to_sink.neighbors(hop));
                }
                row
            })),
            Connective::Or => {
                // Reaching any quantified element reaches the whole sink set.
                let num_sinks = sink_var.binding()?.size() as u32;
                let mut everything = RoaringBitmap::new();
                everything.insert_range(0..num_sinks);
                pack_bitmaps((0..num_sources).map(|e| {
                    if source_to_quantified.num_neighbors_of(e) > 0 {
                        everything.clone()
                    } else {
                        RoaringBitmap::new()
                    }
                }))
            }
        };
        Ok(index)
    }

    /// Realize `operand` with its endpoint named like `row` as the row index.
    fn build_operand(&mut self, operand: &PathExpression, row: &Var) -> Result<PathIndex> {
        let ordinal = operand
            .endpoint_ordinal(row)
            .ok_or_else(|| PathError::MalformedFormula {
                expr: operand.to_string(),
                reason: format!("operand does not mention `{}`", row.name()),
            })?;
        self.build_segmented(operand, ordinal)
    }
}

/// Endpoint positions of `edges` that refer to `vertices`.
fn incident_positions(edges: &SetRef, vertices: &SetRef) -> Result<Vec<usize>> {
    if edges.cardinality() == 0 {
        return Err(PathError::NotAnEdgeSet {
            set: edges.name().to_string(),
        });
    }
    let positions: Vec<usize> = (0..edges.cardinality())
        .filter(|&p| edges.endpoint_set(p) == Some(vertices.id()))
        .collect();
    if positions.is_empty() {
        return Err(PathError::EndpointSetMismatch {
            edge_set: edges.name().to_string(),
            vertex_set: vertices.name().to_string(),
        });
    }
    Ok(positions)
}

fn stencil_neighbors(source: &SetRef, sink: &SetRef, stencil: &Stencil) -> Result<PathIndex> {
    let dims = source.dimensions().ok_or_else(|| PathError::NotALattice {
        set: source.name().to_string(),
    })?;
    if source.id() != sink.id() {
        return Err(PathError::GridMismatch {
            source_set: source.name().to_string(),
            sink_set: sink.name().to_string(),
        });
    }
    if let Some(bad) = stencil.offsets().iter().find(|o| o.len() != dims.len()) {
        return Err(PathError::StencilArity {
            set: source.name().to_string(),
            offset: bad.clone(),
            expected: dims.len(),
            found: bad.len(),
        });
    }
    tracing::trace!(lattice = %source.name(), ?dims, points = stencil.len(), "vv");

    let num_elements = source.size();
    let mut sinks = Vec::with_capacity(num_elements * stencil.len());
    for v in 0..num_elements {
        for offset in stencil.offsets() {
            sinks.push(lattice::wrapped_neighbor(dims, v, offset) as u32);
        }
    }
    Ok(SegmentedPathIndex::fixed_width(num_elements, stencil.len(), sinks).into())
}

fn row_bitmap(index: &PathIndex, element: u32) -> RoaringBitmap {
    index.neighbors(element).collect()
}

fn pack_bitmaps(rows: impl Iterator<Item = RoaringBitmap>) -> PathIndex {
    let rows: Vec<Vec<u32>> = rows.map(|row| row.iter().collect()).collect();
    SegmentedPathIndex::from_rows(rows, false).into()
}
