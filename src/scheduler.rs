// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Dependency-graph task executor for tent scheduling.
//!
//! Nodes run exactly once, never before all their predecessors have
//! completed. A pool of workers consumes a lock-free ready queue; a node
//! enters the queue when its atomic remaining-predecessor count reaches
//! zero. The release/acquire edges of those counters (and of the queue
//! hand-off) make a completed node's writes visible to its successors, so
//! node bodies can use relaxed per-slot operations on shared buffers.
//!
//! Nothing here is tent-specific: any acyclic task graph with per-worker
//! scratch state fits.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossbeam_queue::SegQueue;

use crate::error::{Result, SolveError};
use crate::tent::DependencyGraph;

/// Progress information passed to the optional callback.
pub struct SlabProgress {
    /// Number of graph nodes (tents) processed so far.
    pub tents_processed: u64,
    /// Current size of the ready queue.
    pub ready_queue_size: usize,
    /// Number of worker threads currently processing nodes.
    pub in_flight: usize,
    /// Elapsed time since the schedule started.
    pub elapsed: Duration,
}

/// Run every node of `graph` exactly once, honoring its edges.
///
/// `make_scratch` is called once per worker; the scratch value is handed
/// to `body` for every node that worker processes. Results are independent
/// of the schedule as long as bodies only touch state owned by their node.
///
/// # Errors
/// Returns the first node error (further nodes are abandoned), or
/// [`SolveError::CyclicDependency`] if the graph cannot be completed.
pub fn execute_graph<S, G, F>(
    graph: &DependencyGraph,
    num_threads: usize,
    progress: Option<&(dyn Fn(SlabProgress) + Send + Sync)>,
    make_scratch: G,
    body: F,
) -> Result<()>
where
    G: Fn() -> S + Sync,
    F: Fn(usize, &mut S) -> Result<()> + Sync,
{
    let total = graph.num_nodes();
    if total == 0 {
        return Ok(());
    }
    let num_threads = num_threads.max(1);

    let remaining: Vec<AtomicUsize> = (0..total)
        .map(|i| AtomicUsize::new(graph.predecessor_count(i)))
        .collect();
    let ready = SegQueue::new();
    for (i, r) in remaining.iter().enumerate() {
        if r.load(Ordering::Relaxed) == 0 {
            ready.push(i);
        }
    }

    let done = AtomicBool::new(false);
    let processed = AtomicU64::new(0);
    let in_flight = AtomicUsize::new(0);
    let first_error: Mutex<Option<SolveError>> = Mutex::new(None);
    let start_time = Instant::now();
    let last_progress = AtomicU64::new(0);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build()
        .map_err(|e| SolveError::Other(e.to_string()))?;

    pool.scope(|s| {
        for _ in 0..num_threads {
            s.spawn(|_| {
                let mut scratch = make_scratch();
                loop {
                    if done.load(Ordering::Acquire) {
                        break;
                    }
                    in_flight.fetch_add(1, Ordering::AcqRel);

                    if let Some(node) = ready.pop() {
                        if let Some(cb) = progress {
                            let elapsed_ms = start_time.elapsed().as_millis() as u64;
                            let last = last_progress.load(Ordering::Relaxed);
                            if elapsed_ms >= last + 500
                                && last_progress
                                    .compare_exchange(
                                        last,
                                        elapsed_ms,
                                        Ordering::Relaxed,
                                        Ordering::Relaxed,
                                    )
                                    .is_ok()
                            {
                                cb(SlabProgress {
                                    tents_processed: processed.load(Ordering::Relaxed),
                                    ready_queue_size: ready.len(),
                                    in_flight: in_flight.load(Ordering::Relaxed),
                                    elapsed: start_time.elapsed(),
                                });
                            }
                        }

                        match body(node, &mut scratch) {
                            Ok(()) => {
                                for &succ in graph.successors(node) {
                                    if remaining[succ].fetch_sub(1, Ordering::AcqRel) == 1 {
                                        ready.push(succ);
                                    }
                                }
                                let seen = processed.fetch_add(1, Ordering::AcqRel) + 1;
                                if seen == total as u64 {
                                    done.store(true, Ordering::Release);
                                }
                            }
                            Err(e) => {
                                let mut slot = first_error.lock().unwrap();
                                if slot.is_none() {
                                    *slot = Some(e);
                                }
                                done.store(true, Ordering::Release);
                            }
                        }
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                    } else {
                        in_flight.fetch_sub(1, Ordering::AcqRel);
                        if in_flight.load(Ordering::Acquire) == 0 && ready.is_empty() {
                            // All nodes finished, or none can become ready:
                            // either way the schedule is over.
                            done.store(true, Ordering::Release);
                            break;
                        } else {
                            std::thread::yield_now();
                        }
                    }
                }
            });
        }
    });

    if let Some(e) = first_error.into_inner().unwrap() {
        return Err(e);
    }
    let seen = processed.load(Ordering::Acquire) as usize;
    if seen != total {
        return Err(SolveError::CyclicDependency {
            processed: seen,
            total,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn chain_graph(n: usize) -> DependencyGraph {
        let mut g = DependencyGraph::with_nodes(n);
        for i in 1..n {
            g.add_edge(i - 1, i);
        }
        g
    }

    #[test]
    fn runs_every_node_exactly_once() {
        let mut g = DependencyGraph::with_nodes(16);
        for i in 0..8 {
            g.add_edge(i, i + 8);
        }
        let counts: Vec<AtomicUsize> = (0..16).map(|_| AtomicUsize::new(0)).collect();
        execute_graph(
            &g,
            4,
            None,
            || (),
            |i, _| {
                counts[i].fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
        for (i, c) in counts.iter().enumerate() {
            assert_eq!(c.load(Ordering::SeqCst), 1, "node {} ran wrong count", i);
        }
    }

    #[test]
    fn respects_chain_order() {
        let n = 64;
        let g = chain_graph(n);
        let order = Mutex::new(Vec::new());
        execute_graph(
            &g,
            4,
            None,
            || (),
            |i, _| {
                order.lock().unwrap().push(i);
                Ok(())
            },
        )
        .unwrap();
        let order = order.into_inner().unwrap();
        assert_eq!(order, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn predecessors_complete_first() {
        // Diamond: 0 -> {1, 2} -> 3
        let mut g = DependencyGraph::with_nodes(4);
        g.add_edge(0, 1);
        g.add_edge(0, 2);
        g.add_edge(1, 3);
        g.add_edge(2, 3);
        let finished: Vec<AtomicBool> = (0..4).map(|_| AtomicBool::new(false)).collect();
        execute_graph(
            &g,
            4,
            None,
            || (),
            |i, _| {
                match i {
                    1 | 2 => assert!(finished[0].load(Ordering::SeqCst)),
                    3 => {
                        assert!(finished[1].load(Ordering::SeqCst));
                        assert!(finished[2].load(Ordering::SeqCst));
                    }
                    _ => {}
                }
                finished[i].store(true, Ordering::SeqCst);
                Ok(())
            },
        )
        .unwrap();
    }

    #[test]
    fn cycle_is_detected_not_misordered() {
        let mut g = DependencyGraph::with_nodes(4);
        g.add_edge(0, 1);
        g.add_edge(1, 2);
        g.add_edge(2, 1); // cycle between 1 and 2
        g.add_edge(2, 3);
        let result = execute_graph(&g, 2, None, || (), |_, _| Ok(()));
        assert!(matches!(
            result,
            Err(SolveError::CyclicDependency { processed: 1, total: 4 })
        ));
    }

    #[test]
    fn body_error_aborts_schedule() {
        let g = chain_graph(8);
        let ran = AtomicUsize::new(0);
        let result = execute_graph(
            &g,
            2,
            None,
            || (),
            |i, _| {
                ran.fetch_add(1, Ordering::SeqCst);
                if i == 3 {
                    Err(SolveError::SingularSystem { tent: i })
                } else {
                    Ok(())
                }
            },
        );
        assert!(matches!(result, Err(SolveError::SingularSystem { tent: 3 })));
        // Nothing past the failing node can have started on a chain.
        assert!(ran.load(Ordering::SeqCst) <= 4);
    }

    #[test]
    fn scratch_is_per_worker() {
        let g = chain_graph(32);
        let makes = AtomicUsize::new(0);
        execute_graph(
            &g,
            3,
            None,
            || {
                makes.fetch_add(1, Ordering::SeqCst);
                Vec::<usize>::new()
            },
            |i, scratch| {
                scratch.push(i);
                Ok(())
            },
        )
        .unwrap();
        assert_eq!(makes.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_graph_completes() {
        let g = DependencyGraph::with_nodes(0);
        execute_graph(&g, 4, None, || (), |_, _| Ok(())).unwrap();
    }
}
