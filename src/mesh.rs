// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Result, SolveError};

/// Spatial mesh access. Provides element/vertex connectivity, vertex
/// coordinates, the affine reference-to-physical map, and boundary
/// ("surface") element queries. The generic parameter `D` is the spatial
/// dimension (1 or 2); elements are simplices with D+1 vertices.
pub trait MeshAccess<const D: usize> {
    /// Number of elements in the mesh.
    fn num_elements(&self) -> usize;

    /// Number of vertices in the mesh.
    fn num_vertices(&self) -> usize;

    /// Vertex ids of an element (D+1 entries).
    fn element_vertices(&self, el: usize) -> &[usize];

    /// Coordinates of a vertex.
    fn point(&self, v: usize) -> [f64; D];

    /// Elements incident to a vertex.
    fn vertex_elements(&self, v: usize) -> &[usize];

    /// Vertices sharing an element with a vertex (the vertex itself excluded).
    fn vertex_neighbors(&self, v: usize) -> &[usize];

    /// Boundary elements incident to a vertex. Empty for interior vertices.
    fn vertex_boundary_elements(&self, v: usize) -> &[usize];

    /// Vertex ids of a boundary element (1 entry for D=1, 2 for D=2;
    /// 2-D boundary edges are oriented counterclockwise around the domain).
    fn boundary_element_vertices(&self, sel: usize) -> &[usize];

    /// Map reference coordinates to a physical point of an element.
    fn map_reference(&self, el: usize, xi: [f64; D]) -> [f64; D];

    /// Absolute Jacobian determinant of the element's affine map.
    fn jacobian_det(&self, el: usize) -> f64;
}

/// A simplicial mesh with flat, stride-indexed connectivity storage.
///
/// Element vertex ids are stored row-major with stride D+1, boundary
/// element vertex ids with stride D. Per-vertex incidence lists are built
/// once at construction.
pub struct SimplicialMesh<const D: usize> {
    points: Vec<[f64; D]>,
    element_verts: Vec<usize>,
    boundary_verts: Vec<usize>,
    jac_dets: Vec<f64>,
    vertex_elements: Vec<Vec<usize>>,
    vertex_neighbors: Vec<Vec<usize>>,
    vertex_boundary: Vec<Vec<usize>>,
}

impl<const D: usize> SimplicialMesh<D> {
    /// Assemble a mesh from vertex coordinates, element vertex ids
    /// (stride D+1), and boundary element vertex ids (stride D).
    ///
    /// # Errors
    /// Returns an error if the element list is empty or an element's
    /// affine map is degenerate.
    pub fn from_raw(
        points: Vec<[f64; D]>,
        element_verts: Vec<usize>,
        boundary_verts: Vec<usize>,
    ) -> Result<Self> {
        assert!(D == 1 || D == 2, "SimplicialMesh only supports D=1 or D=2");
        if element_verts.is_empty() {
            return Err(SolveError::EmptyMesh);
        }

        let num_elements = element_verts.len() / (D + 1);
        let num_vertices = points.len();

        let mut vertex_elements = vec![Vec::new(); num_vertices];
        let mut vertex_neighbors: Vec<Vec<usize>> = vec![Vec::new(); num_vertices];
        for el in 0..num_elements {
            let verts = &element_verts[el * (D + 1)..(el + 1) * (D + 1)];
            for &v in verts {
                vertex_elements[v].push(el);
                for &w in verts {
                    if w != v && !vertex_neighbors[v].contains(&w) {
                        vertex_neighbors[v].push(w);
                    }
                }
            }
        }
        for nbs in &mut vertex_neighbors {
            nbs.sort_unstable();
        }

        let mut vertex_boundary = vec![Vec::new(); num_vertices];
        for sel in 0..boundary_verts.len() / D {
            for &v in &boundary_verts[sel * D..(sel + 1) * D] {
                vertex_boundary[v].push(sel);
            }
        }

        let mut jac_dets = Vec::with_capacity(num_elements);
        for el in 0..num_elements {
            let verts = &element_verts[el * (D + 1)..(el + 1) * (D + 1)];
            let det = affine_det::<D>(&points, verts);
            if !det.is_finite() || det <= 0.0 {
                return Err(SolveError::Other(format!(
                    "element {} has degenerate geometry (|det J| = {})",
                    el, det
                )));
            }
            jac_dets.push(det);
        }

        Ok(SimplicialMesh {
            points,
            element_verts,
            boundary_verts,
            jac_dets,
            vertex_elements,
            vertex_neighbors,
            vertex_boundary,
        })
    }

    /// Number of boundary elements.
    pub fn num_boundary_elements(&self) -> usize {
        self.boundary_verts.len() / D
    }
}

/// |det J| of the affine map of a simplex given its vertex ids.
fn affine_det<const D: usize>(points: &[[f64; D]], verts: &[usize]) -> f64 {
    let p0 = points[verts[0]];
    if D == 1 {
        (points[verts[1]][0] - p0[0]).abs()
    } else {
        let y = D - 1;
        let a = points[verts[1]];
        let b = points[verts[2]];
        ((a[0] - p0[0]) * (b[y] - p0[y]) - (a[y] - p0[y]) * (b[0] - p0[0])).abs()
    }
}

impl SimplicialMesh<1> {
    /// Uniform mesh of `n` segments on the interval [x0, x1].
    ///
    /// The two endpoint vertices form the boundary elements.
    pub fn interval(n: usize, x0: f64, x1: f64) -> Result<Self> {
        if n == 0 {
            return Err(SolveError::EmptyMesh);
        }
        let h = (x1 - x0) / n as f64;
        let points: Vec<[f64; 1]> = (0..=n).map(|i| [x0 + i as f64 * h]).collect();
        let mut element_verts = Vec::with_capacity(2 * n);
        for i in 0..n {
            element_verts.push(i);
            element_verts.push(i + 1);
        }
        let boundary_verts = vec![0, n];
        Self::from_raw(points, element_verts, boundary_verts)
    }
}

impl SimplicialMesh<2> {
    /// Structured triangulation of the unit square with `n` cells per side
    /// (2 n^2 triangles). Boundary edges are oriented counterclockwise.
    pub fn unit_square(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(SolveError::EmptyMesh);
        }
        let h = 1.0 / n as f64;
        let id = |i: usize, j: usize| i * (n + 1) + j;

        let mut points = Vec::with_capacity((n + 1) * (n + 1));
        for i in 0..=n {
            for j in 0..=n {
                points.push([i as f64 * h, j as f64 * h]);
            }
        }

        let mut element_verts = Vec::with_capacity(6 * n * n);
        for i in 0..n {
            for j in 0..n {
                let (v00, v10) = (id(i, j), id(i + 1, j));
                let (v11, v01) = (id(i + 1, j + 1), id(i, j + 1));
                element_verts.extend_from_slice(&[v00, v10, v11]);
                element_verts.extend_from_slice(&[v00, v11, v01]);
            }
        }

        // Counterclockwise walk: bottom, right, top, left.
        let mut boundary_verts = Vec::with_capacity(8 * n);
        for i in 0..n {
            boundary_verts.extend_from_slice(&[id(i, 0), id(i + 1, 0)]);
        }
        for j in 0..n {
            boundary_verts.extend_from_slice(&[id(n, j), id(n, j + 1)]);
        }
        for i in (0..n).rev() {
            boundary_verts.extend_from_slice(&[id(i + 1, n), id(i, n)]);
        }
        for j in (0..n).rev() {
            boundary_verts.extend_from_slice(&[id(0, j + 1), id(0, j)]);
        }

        Self::from_raw(points, element_verts, boundary_verts)
    }
}

impl<const D: usize> MeshAccess<D> for SimplicialMesh<D> {
    fn num_elements(&self) -> usize {
        self.element_verts.len() / (D + 1)
    }

    fn num_vertices(&self) -> usize {
        self.points.len()
    }

    fn element_vertices(&self, el: usize) -> &[usize] {
        &self.element_verts[el * (D + 1)..(el + 1) * (D + 1)]
    }

    fn point(&self, v: usize) -> [f64; D] {
        self.points[v]
    }

    fn vertex_elements(&self, v: usize) -> &[usize] {
        &self.vertex_elements[v]
    }

    fn vertex_neighbors(&self, v: usize) -> &[usize] {
        &self.vertex_neighbors[v]
    }

    fn vertex_boundary_elements(&self, v: usize) -> &[usize] {
        &self.vertex_boundary[v]
    }

    fn boundary_element_vertices(&self, sel: usize) -> &[usize] {
        &self.boundary_verts[sel * D..(sel + 1) * D]
    }

    fn map_reference(&self, el: usize, xi: [f64; D]) -> [f64; D] {
        let verts = self.element_vertices(el);
        let p0 = self.points[verts[0]];
        let mut p = p0;
        for (i, &x) in xi.iter().enumerate() {
            let pi = self.points[verts[i + 1]];
            for d in 0..D {
                p[d] += x * (pi[d] - p0[d]);
            }
        }
        p
    }

    fn jacobian_det(&self, el: usize) -> f64 {
        self.jac_dets[el]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_connectivity() {
        let mesh = SimplicialMesh::<1>::interval(4, 0.0, 1.0).unwrap();
        assert_eq!(mesh.num_elements(), 4);
        assert_eq!(mesh.num_vertices(), 5);
        assert_eq!(mesh.element_vertices(2), &[2, 3]);
        assert_eq!(mesh.vertex_elements(2), &[1, 2]);
        assert_eq!(mesh.vertex_neighbors(2), &[1, 3]);
        assert!((mesh.jacobian_det(0) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn interval_boundary() {
        let mesh = SimplicialMesh::<1>::interval(3, 0.0, 1.0).unwrap();
        assert_eq!(mesh.num_boundary_elements(), 2);
        assert_eq!(mesh.vertex_boundary_elements(0), &[0]);
        assert_eq!(mesh.vertex_boundary_elements(3), &[1]);
        assert!(mesh.vertex_boundary_elements(1).is_empty());
        assert_eq!(mesh.boundary_element_vertices(1), &[3]);
    }

    #[test]
    fn interval_map_reference() {
        let mesh = SimplicialMesh::<1>::interval(2, 0.0, 1.0).unwrap();
        let p = mesh.map_reference(1, [0.5]);
        assert!((p[0] - 0.75).abs() < 1e-15);
    }

    #[test]
    fn unit_square_counts() {
        let mesh = SimplicialMesh::<2>::unit_square(3).unwrap();
        assert_eq!(mesh.num_elements(), 18);
        assert_eq!(mesh.num_vertices(), 16);
        assert_eq!(mesh.num_boundary_elements(), 12);
        // Triangle areas sum to the unit square.
        let total: f64 = (0..mesh.num_elements())
            .map(|el| 0.5 * mesh.jacobian_det(el))
            .sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unit_square_boundary_edges_ccw() {
        let mesh = SimplicialMesh::<2>::unit_square(2).unwrap();
        for sel in 0..mesh.num_boundary_elements() {
            let verts = mesh.boundary_element_vertices(sel);
            let p0 = mesh.point(verts[0]);
            let p1 = mesh.point(verts[1]);
            // Rotating the edge difference p0 - p1 by 90 degrees must point
            // out of the square: (-dy, dx) away from the center.
            let (dx, dy) = (p0[0] - p1[0], p0[1] - p1[1]);
            let normal = [-dy, dx];
            let mid = [0.5 * (p0[0] + p1[0]) - 0.5, 0.5 * (p0[1] + p1[1]) - 0.5];
            assert!(
                normal[0] * mid[0] + normal[1] * mid[1] > 0.0,
                "edge {} normal points inward",
                sel
            );
        }
    }

    #[test]
    fn unit_square_vertex_incidence() {
        let mesh = SimplicialMesh::<2>::unit_square(2).unwrap();
        // The center vertex (1,1) of a 2x2 grid touches 6 triangles.
        let center = 1 * 3 + 1;
        assert_eq!(mesh.vertex_elements(center).len(), 6);
        assert_eq!(mesh.vertex_neighbors(center).len(), 6);
        assert!(mesh.vertex_boundary_elements(center).is_empty());
    }

    #[test]
    fn empty_mesh_rejected() {
        assert!(matches!(
            SimplicialMesh::<1>::interval(0, 0.0, 1.0),
            Err(SolveError::EmptyMesh)
        ));
    }
}
