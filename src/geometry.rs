// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Space-time geometry of tent faces.
//!
//! A tent's top and bottom faces are simplices in space-time: one vertex
//! per element vertex, spatial coordinates from the mesh, time coordinates
//! from the tent (`ttop`/`tbot` at the anchor vertex, the arrival time at
//! neighbors). Lateral faces close the tent where the anchor vertex lies
//! on the mesh boundary. Areas use segment length (D=1) or Heron's formula
//! (D=2); normals are unit vectors with the time-component sign forced
//! upward for top faces and downward for bottom faces.

use crate::error::{Result, SolveError};
use crate::mesh::MeshAccess;
use crate::tent::Tent;

/// Sign of `v`, treating exact zero as positive.
fn sign_nonzero(v: f64) -> f64 {
    if v < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// A top or bottom tent face on one element: D+1 space-time vertices
/// ordered like the element's vertex list (entries past D+1 unused).
#[derive(Debug, Clone, Copy)]
pub struct TentFace<const D: usize> {
    verts: [[f64; D]; 3],
    times: [f64; 3],
    /// Face area, validated finite and positive at construction.
    pub area: f64,
}

/// Build the top (`top = true`) or bottom face of `tent` on element `el`.
///
/// # Errors
/// Returns [`SolveError::DegenerateFace`] if the face has non-finite or
/// non-positive area.
pub fn tent_face<const D: usize, M: MeshAccess<D>>(
    tent: &Tent,
    el: usize,
    mesh: &M,
    top: bool,
) -> Result<TentFace<D>> {
    let mut verts = [[0.0; D]; 3];
    let mut times = [0.0; 3];
    for (i, &v) in mesh.element_vertices(el).iter().enumerate() {
        verts[i] = mesh.point(v);
        times[i] = if v == tent.vertex {
            if top {
                tent.ttop
            } else {
                tent.tbot
            }
        } else {
            tent.neighbor_time(v).ok_or(SolveError::DegenerateFace {
                vertex: tent.vertex,
                element: el,
            })?
        };
    }

    let area = face_area::<D>(&verts, &times);
    if !area.is_finite() || area <= 0.0 {
        return Err(SolveError::DegenerateFace {
            vertex: tent.vertex,
            element: el,
        });
    }
    Ok(TentFace { verts, times, area })
}

impl<const D: usize> TentFace<D> {
    /// Time coordinate of the face above a reference point of the element,
    /// by P1 interpolation of the vertex times.
    pub fn time_at(&self, xi: [f64; D]) -> f64 {
        let mut lambda0 = 1.0;
        let mut t = 0.0;
        for (i, &x) in xi.iter().enumerate() {
            lambda0 -= x;
            t += x * self.times[i + 1];
        }
        t + lambda0 * self.times[0]
    }

    /// Unit outward space-time normal. `top` fixes the orientation: the
    /// time component is forced positive for top faces, negative for
    /// bottom faces.
    pub fn normal(&self, top: bool) -> ([f64; D], f64) {
        let (mut nx, mut nt) = face_direction::<D>(&self.verts, &self.times);
        let sign = if top {
            sign_nonzero(nt)
        } else {
            -sign_nonzero(nt)
        };
        for n in nx.iter_mut() {
            *n *= sign;
        }
        nt *= sign;
        (nx, nt)
    }
}

/// Area of a space-time face: segment length for D=1, Heron's formula
/// for D=2.
fn face_area<const D: usize>(verts: &[[f64; D]; 3], times: &[f64; 3]) -> f64 {
    let dist = |i: usize, j: usize| {
        let mut d2 = (times[i] - times[j]) * (times[i] - times[j]);
        for k in 0..D {
            d2 += (verts[i][k] - verts[j][k]) * (verts[i][k] - verts[j][k]);
        }
        d2.sqrt()
    };
    if D == 1 {
        dist(0, 1)
    } else {
        let a = dist(0, 1);
        let b = dist(1, 2);
        let c = dist(0, 2);
        let s = 0.5 * (a + b + c);
        (s * (s - a) * (s - b) * (s - c)).sqrt()
    }
}

/// Unnormalized-orientation unit normal of the face, before the top/bottom
/// sign fix. D=1 rotates the edge vector by 90 degrees; D=2 takes the
/// cross product of two edges, normalized by `sqrt(|a|^2 |b|^2 - (a.b)^2)`
/// which is stabler than the cross-product magnitude.
fn face_direction<const D: usize>(verts: &[[f64; D]; 3], times: &[f64; 3]) -> ([f64; D], f64) {
    let mut nx = [0.0; D];
    let nt;
    if D == 1 {
        let ex = verts[1][0] - verts[0][0];
        let et = times[1] - times[0];
        let len = (ex * ex + et * et).sqrt();
        nx[0] = -et / len;
        nt = ex / len;
    } else {
        let a = edge3(verts, times, 0, 1);
        let b = edge3(verts, times, 0, 2);
        let cross = [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ];
        let a2 = a[0] * a[0] + a[1] * a[1] + a[2] * a[2];
        let b2 = b[0] * b[0] + b[1] * b[1] + b[2] * b[2];
        let ab = a[0] * b[0] + a[1] * b[1] + a[2] * b[2];
        let norm = (a2 * b2 - ab * ab).sqrt();
        nx[0] = cross[0] / norm;
        nx[D - 1] = cross[1] / norm;
        nt = cross[2] / norm;
    }
    (nx, nt)
}

/// Space-time edge vector between two face vertices, embedded in 3
/// components (spatial parts first, time last).
fn edge3<const D: usize>(verts: &[[f64; D]; 3], times: &[f64; 3], i: usize, j: usize) -> [f64; 3] {
    let mut e = [0.0; 3];
    for d in 0..D {
        e[d] = verts[i][d] - verts[j][d];
    }
    e[2] = times[i] - times[j];
    e
}

/// A lateral tent face on the mesh boundary, with the affine map from the
/// reference element onto the face.
#[derive(Debug, Clone, Copy)]
pub struct LateralFace<const D: usize> {
    /// Face area.
    pub area: f64,
    /// Outward spatial normal; the time component is zero.
    pub normal: [f64; D],
    origin: ([f64; D], f64),
    axes: [([f64; D], f64); 2],
}

impl<const D: usize> LateralFace<D> {
    /// Map a reference point onto the face; returns the spatial point and
    /// its time coordinate.
    pub fn map(&self, xi: [f64; D]) -> ([f64; D], f64) {
        let (mut x, mut t) = self.origin;
        for (i, &v) in xi.iter().enumerate() {
            let (ax, at) = self.axes[i];
            for d in 0..D {
                x[d] += v * ax[d];
            }
            t += v * at;
        }
        (x, t)
    }
}

/// Build the lateral face of `tent` on boundary element `sel`.
///
/// For D=1 the face is the vertical segment at the boundary vertex between
/// `tbot` and `ttop`. For D=2 it is the space-time triangle spanned by the
/// anchor vertex at `ttop` and `tbot` and the boundary-edge neighbor at its
/// arrival time; the spatial normal comes from the boundary edge rotated
/// 90 degrees, with the coordinate swap that keeps it outward for
/// counterclockwise-oriented boundary edges.
pub fn lateral_face<const D: usize, M: MeshAccess<D>>(
    tent: &Tent,
    sel: usize,
    mesh: &M,
) -> Result<LateralFace<D>> {
    let degenerate = || SolveError::DegenerateFace {
        vertex: tent.vertex,
        element: sel,
    };

    if D == 1 {
        let area = tent.ttop - tent.tbot;
        if !area.is_finite() || area <= 0.0 {
            return Err(degenerate());
        }
        let xv = mesh.point(tent.vertex);
        let xnb = mesh.point(tent.nbv[0]);
        let mut normal = [0.0; D];
        normal[0] = sign_nonzero(xv[0] - xnb[0]);
        return Ok(LateralFace {
            area,
            normal,
            origin: (xv, tent.tbot),
            axes: [([0.0; D], area), ([0.0; D], 0.0)],
        });
    }

    let sel_verts = mesh.boundary_element_vertices(sel);
    let nb = if sel_verts[0] == tent.vertex {
        sel_verts[1]
    } else {
        sel_verts[0]
    };
    let nbtime = tent.neighbor_time(nb).ok_or_else(degenerate)?;

    let xv = mesh.point(tent.vertex);
    let xnb = mesh.point(nb);
    let verts = [xv, xv, xnb];
    let times = [tent.ttop, tent.tbot, nbtime];
    let area = face_area::<D>(&verts, &times);
    if !area.is_finite() || area <= 0.0 {
        return Err(degenerate());
    }

    // Boundary edge rotated 90 degrees; CCW edge orientation makes it
    // point out of the domain.
    let p0 = mesh.point(sel_verts[0]);
    let p1 = mesh.point(sel_verts[1]);
    let y = D - 1;
    let (ex, ey) = (p0[0] - p1[0], p0[y] - p1[y]);
    let len = (ex * ex + ey * ey).sqrt();
    if !(len > 0.0) {
        return Err(degenerate());
    }
    let mut normal = [0.0; D];
    normal[0] = -ey / len;
    normal[y] = ex / len;

    let mut axis0 = ([0.0; D], times[1] - times[0]);
    let mut axis1 = ([0.0; D], times[2] - times[0]);
    for d in 0..D {
        axis0.0[d] = verts[1][d] - verts[0][d];
        axis1.0[d] = verts[2][d] - verts[0][d];
    }

    Ok(LateralFace {
        area,
        normal,
        origin: (verts[0], times[0]),
        axes: [axis0, axis1],
    })
}
