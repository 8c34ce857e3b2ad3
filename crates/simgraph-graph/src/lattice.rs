//! Lattice coordinates and structured mesh fixtures.
//!
//! Lattice ids are laid out with the first dimension varying fastest:
//! `id = c0 + d0 * (c1 + d1 * (c2 + ...))`.

use crate::{ElementRef, GraphError, Set};

/// Coordinates of lattice element `id`.
pub fn coords_of(dims: &[usize], id: usize) -> Vec<usize> {
    let mut rest = id;
    dims.iter()
        .map(|&d| {
            let c = rest % d;
            rest /= d;
            c
        })
        .collect()
}

/// Lattice id of `coords`, or `None` if they fall outside `dims`.
pub fn id_of(dims: &[usize], coords: &[usize]) -> Option<usize> {
    if coords.len() != dims.len() {
        return None;
    }
    let mut id = 0usize;
    for (&c, &d) in coords.iter().zip(dims).rev() {
        if c >= d {
            return None;
        }
        id = id * d + c;
    }
    Some(id)
}

/// Id of the element reached from `id` by `offset`, wrapping periodically in
/// every dimension. `offset.len()` must equal `dims.len()`.
pub fn wrapped_neighbor(dims: &[usize], id: usize, offset: &[i32]) -> usize {
    let coords = coords_of(dims, id);
    let mut out = 0usize;
    for ((&c, &o), &d) in coords.iter().zip(offset).zip(dims).rev() {
        let w = (c as i64 + o as i64).rem_euclid(d as i64) as usize;
        out = out * d + w;
    }
    out
}

/// A structured `nx * ny * nz` block of vertices created by [`create_box`].
#[derive(Debug, Clone)]
pub struct MeshBox {
    dims: [usize; 3],
    vertices: Vec<ElementRef>,
}

impl MeshBox {
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Vertex at `(x, y, z)`.
    pub fn at(&self, x: usize, y: usize, z: usize) -> Option<ElementRef> {
        let [nx, ny, nz] = self.dims;
        if x >= nx || y >= ny || z >= nz {
            return None;
        }
        self.vertices.get(x + nx * (y + ny * z)).copied()
    }

    pub fn vertices(&self) -> &[ElementRef] {
        &self.vertices
    }
}

/// Add an `nx * ny * nz` block of vertices to `vertices` and connect
/// axis-adjacent vertices with edges in `edges`.
///
/// Edges are added axis by axis (all x-edges, then y, then z), each block in
/// vertex order, so a `5 x 1 x 1` box yields the chain
/// `(v0,v1), (v1,v2), (v2,v3), (v3,v4)`.
pub fn create_box(
    vertices: &mut Set,
    edges: &mut Set,
    nx: usize,
    ny: usize,
    nz: usize,
) -> Result<MeshBox, GraphError> {
    let mut created = Vec::with_capacity(nx * ny * nz);
    for _ in 0..nx * ny * nz {
        created.push(vertices.add()?);
    }
    let mesh = MeshBox {
        dims: [nx, ny, nz],
        vertices: created,
    };

    let steps: [(usize, usize, usize); 3] = [(1, 0, 0), (0, 1, 0), (0, 0, 1)];
    for (dx, dy, dz) in steps {
        for z in 0..nz {
            for y in 0..ny {
                for x in 0..nx {
                    let (Some(a), Some(b)) = (mesh.at(x, y, z), mesh.at(x + dx, y + dy, z + dz))
                    else {
                        continue;
                    };
                    edges.add_edge(&[a, b])?;
                }
            }
        }
    }
    Ok(mesh)
}
