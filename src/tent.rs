// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Tent pitching: partitioning a time slab into causal space-time patches.
//!
//! An advancing front assigns every mesh vertex a time `tau`, initially 0.
//! A vertex that is a local minimum of `tau` among its neighbors can be
//! "pitched": raised to the largest time allowed by causality,
//! `min(slab, min_nb(tau_nb + dist / wavespeed))`. Each pitch produces one
//! [`Tent`]. The slab is complete when every front time has reached the
//! slab height.
//!
//! Dependencies are tracked per element: a tent reads the wavefront data
//! its elements carried and overwrites it, so each tent depends on the
//! previous writer of each of its elements. Pitching order makes every
//! edge point from an earlier tent to a later one, so the graph is acyclic
//! by construction.

use smallvec::SmallVec;

use crate::error::{Result, SolveError};
use crate::mesh::MeshAccess;

/// A causal space-time patch anchored at one mesh vertex.
///
/// Produced by [`pitch_slab`]; read-only afterwards. The anchor vertex
/// spans [`tbot`](Tent::tbot)..[`ttop`](Tent::ttop) in time while each
/// neighbor vertex stays at its arrival time `nbtime`.
#[derive(Debug, Clone)]
pub struct Tent {
    /// Anchor vertex id.
    pub vertex: usize,
    /// Front time of the anchor vertex before the pitch.
    pub tbot: f64,
    /// Front time of the anchor vertex after the pitch.
    pub ttop: f64,
    /// Mesh elements incident to the anchor vertex.
    pub els: SmallVec<[usize; 8]>,
    /// Neighbor vertex ids.
    pub nbv: SmallVec<[usize; 8]>,
    /// Front time of each neighbor at pitch time (parallel to `nbv`).
    pub nbtime: SmallVec<[f64; 8]>,
}

impl Tent {
    /// Arrival time of a neighbor vertex, if `v` is one.
    pub fn neighbor_time(&self, v: usize) -> Option<f64> {
        self.nbv
            .iter()
            .position(|&n| n == v)
            .map(|i| self.nbtime[i])
    }

    /// Time extent of the tent.
    pub fn height(&self) -> f64 {
        self.ttop - self.tbot
    }
}

/// Directed acyclic graph over tent indices. An edge i -> j means tent j
/// reads data written by tent i and must not start before i completes.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    successors: Vec<Vec<usize>>,
    predecessor_counts: Vec<usize>,
}

impl DependencyGraph {
    /// Graph over `n` nodes with no edges.
    pub fn with_nodes(n: usize) -> Self {
        DependencyGraph {
            successors: vec![Vec::new(); n],
            predecessor_counts: vec![0; n],
        }
    }

    /// Add an edge `from -> to`.
    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.successors[from].push(to);
        self.predecessor_counts[to] += 1;
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.successors.len()
    }

    /// Successors of a node.
    pub fn successors(&self, i: usize) -> &[usize] {
        &self.successors[i]
    }

    /// Number of predecessors of a node.
    pub fn predecessor_count(&self, i: usize) -> usize {
        self.predecessor_counts[i]
    }

    /// Kahn's algorithm: true if every node can be topologically ordered.
    pub fn is_acyclic(&self) -> bool {
        let n = self.num_nodes();
        let mut remaining = self.predecessor_counts.clone();
        let mut queue: Vec<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
        let mut seen = 0;
        while let Some(i) = queue.pop() {
            seen += 1;
            for &j in &self.successors[i] {
                remaining[j] -= 1;
                if remaining[j] == 0 {
                    queue.push(j);
                }
            }
        }
        seen == n
    }
}

/// All tents of one time slab plus their causal dependency graph.
pub struct TentSlab {
    /// Tents in pitching order.
    pub tents: Vec<Tent>,
    /// Causal ordering constraints between tents.
    pub dependency: DependencyGraph,
    /// The slab height every vertex front reaches.
    pub slab_height: f64,
}

/// Pitch all tents of one slab of the given height.
///
/// # Errors
/// Returns an error for an invalid slab height or if the front cannot
/// advance (degenerate mesh geometry).
pub fn pitch_slab<const D: usize, M: MeshAccess<D>>(
    mesh: &M,
    slab_height: f64,
    wavespeed: f64,
) -> Result<TentSlab> {
    if !slab_height.is_finite() || slab_height <= 0.0 {
        return Err(SolveError::InvalidSlabHeight(slab_height));
    }
    if mesh.num_elements() == 0 {
        return Err(SolveError::EmptyMesh);
    }

    let nv = mesh.num_vertices();
    let mut tau = vec![0.0f64; nv];
    let mut tents: Vec<Tent> = Vec::new();
    let mut dependency = DependencyGraph::default();
    let mut last_writer: Vec<Option<usize>> = vec![None; mesh.num_elements()];

    let edge_time = |a: usize, b: usize| {
        let pa = mesh.point(a);
        let pb = mesh.point(b);
        let mut d2 = 0.0;
        for i in 0..D {
            d2 += (pa[i] - pb[i]) * (pa[i] - pb[i]);
        }
        d2.sqrt() / wavespeed
    };

    loop {
        let mut progressed = false;
        for v in 0..nv {
            if tau[v] >= slab_height {
                continue;
            }
            let nbs = mesh.vertex_neighbors(v);
            if nbs.iter().any(|&w| tau[w] < tau[v]) {
                continue;
            }

            let mut ttop = slab_height;
            for &w in nbs {
                ttop = ttop.min(tau[w] + edge_time(v, w));
            }
            if !(ttop > tau[v]) {
                return Err(SolveError::PitchingStalled { vertex: v });
            }

            let id = tents.len();
            let els: SmallVec<[usize; 8]> = mesh.vertex_elements(v).iter().copied().collect();
            let nbv: SmallVec<[usize; 8]> = nbs.iter().copied().collect();
            let nbtime: SmallVec<[f64; 8]> = nbs.iter().map(|&w| tau[w]).collect();

            dependency.successors.push(Vec::new());
            dependency.predecessor_counts.push(0);
            let mut preds: SmallVec<[usize; 8]> = SmallVec::new();
            for &el in &els {
                if let Some(prev) = last_writer[el] {
                    preds.push(prev);
                }
                last_writer[el] = Some(id);
            }
            preds.sort_unstable();
            preds.dedup();
            for &p in &preds {
                dependency.add_edge(p, id);
            }

            tents.push(Tent {
                vertex: v,
                tbot: tau[v],
                ttop,
                els,
                nbv,
                nbtime,
            });
            tau[v] = ttop;
            progressed = true;
        }

        if tau.iter().all(|&t| t >= slab_height) {
            break;
        }
        if !progressed {
            let v = (0..nv).find(|&v| tau[v] < slab_height).unwrap_or(0);
            return Err(SolveError::PitchingStalled { vertex: v });
        }
    }

    Ok(TentSlab {
        tents,
        dependency,
        slab_height,
    })
}
