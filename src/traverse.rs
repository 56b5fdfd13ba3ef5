//! Generic DFS and Dijkstra kernels, parameterized over a visitor so the
//! same walk can serve reduction heuristics, star contraction, and the
//! bridge-component builder without duplicating traversal logic.
//!
//! Grounded in `original_source/src/dfs.hpp`'s `_dfs_visitor`/`DFS` and
//! `Dijkstra` templates. The original lets a visitor throw to abort a
//! walk early (`struct done_DFS {};` caught by the caller); Rust has no
//! equivalent of catching an arbitrary exception type through a generic
//! callback without `std::panic`, which is not for control flow. Each
//! visitor method instead returns a [`Flow`] the kernel checks after
//! every call, and `Flow::Stop` unwinds the walk immediately.

use std::cell::RefCell;

use crate::graph::{EdgeRef, Graph, Vertex, Weight};
use crate::heap::IndexedHeap;

/// Distances above this are "unreachable" without risking overflow when
/// two of them are added together.
pub const INF: Weight = Weight::MAX / 4;

/// Returned by every visitor callback: whether the walk should continue
/// or stop immediately, mid-vertex.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Flow {
    Continue,
    Stop,
}

/// Callbacks for [`dfs`]. Default bodies are no-ops that never stop,
/// mirroring `dfs.hpp`'s `Dummy` visitor - implement only the methods a
/// given walk actually cares about.
pub trait DfsVisitor {
    fn discover_vertex(&mut self, _v: Vertex) -> Flow {
        Flow::Continue
    }
    fn tree_edge(&mut self, _e: EdgeRef, _from: Vertex, _to: Vertex) -> Flow {
        Flow::Continue
    }
    /// Called post-order, once `v`'s whole subtree has finished. `parent`
    /// and `tree_edge` are `None` only for the walk's start vertex.
    fn finish_vertex(&mut self, _v: Vertex, _parent: Option<Vertex>, _tree_edge: Option<EdgeRef>) {}
    /// An edge to an already-visited vertex that isn't `v`'s own tree edge.
    fn non_tree_edge(&mut self, _e: EdgeRef) {}
}

/// A visitor that does nothing; used where only the `visited` side effect
/// of a walk matters (e.g. connectivity checks).
pub struct NoOpVisitor;
impl DfsVisitor for NoOpVisitor {}

/// Iterative (explicit-stack) DFS from `start`, skipping removed edges and
/// already-visited vertices. `visited` is shared across calls so a caller
/// can run a DFS forest over several starting points.
pub fn dfs(g: &Graph, start: Vertex, visited: &mut [bool], visitor: &mut impl DfsVisitor) {
    if visited[start] {
        return;
    }
    let n = g.vertex_count();
    let mut pred: Vec<Option<Vertex>> = vec![None; n];
    let mut tree_edge: Vec<Option<EdgeRef>> = vec![None; n];

    visited[start] = true;
    if visitor.discover_vertex(start) == Flow::Stop {
        return;
    }

    let mut stack: Vec<(Vertex, usize)> = vec![(start, 0)];
    while let Some(&(v, mut idx)) = stack.last() {
        let edges = g.incident(v);
        let mut next_child = None;
        while idx < edges.len() {
            let e = edges[idx];
            idx += 1;
            if g.is_removed(e) {
                continue;
            }
            let w = g.other(e, v);
            if !visited[w] {
                next_child = Some((e, w));
                break;
            } else if tree_edge[v] != Some(e) {
                visitor.non_tree_edge(e);
            }
        }
        stack.last_mut().unwrap().1 = idx;

        match next_child {
            Some((e, w)) => {
                visited[w] = true;
                pred[w] = Some(v);
                tree_edge[w] = Some(e);
                if visitor.tree_edge(e, v, w) == Flow::Stop {
                    return;
                }
                if visitor.discover_vertex(w) == Flow::Stop {
                    return;
                }
                stack.push((w, 0));
            }
            None => {
                visitor.finish_vertex(v, pred[v], tree_edge[v]);
                stack.pop();
            }
        }
    }
}

/// Callbacks for [`dijkstra`].
pub trait DijkstraVisitor {
    fn discover_vertex(&mut self, _v: Vertex, _dist: Weight) -> Flow {
        Flow::Continue
    }
    fn examine_edge(&mut self, _e: EdgeRef, _from: Vertex, _to: Vertex) -> Flow {
        Flow::Continue
    }
    /// Called when `v` is popped off the heap with its final distance.
    fn finish_vertex(&mut self, _v: Vertex, _dist: Weight) -> Flow {
        Flow::Continue
    }
}

pub struct NoOpDijkstraVisitor;
impl DijkstraVisitor for NoOpDijkstraVisitor {}

/// Multi-source Dijkstra. Distances at or above `limit` are not relaxed
/// past (used by the bounded bottleneck-Steiner-distance test); pass
/// [`INF`] for an unbounded search.
///
/// Returns `(dist, pred)`: `dist[v]` is [`INF`] for unreached vertices;
/// `pred[v]` is the tree edge `v` was first reached through, `None` for
/// sources and unreached vertices.
pub fn dijkstra(
    g: &Graph,
    sources: impl IntoIterator<Item = Vertex>,
    limit: Weight,
    visitor: &mut impl DijkstraVisitor,
) -> (Vec<Weight>, Vec<Option<EdgeRef>>) {
    let n = g.vertex_count();
    let dist = RefCell::new(vec![INF; n]);
    let mut pred: Vec<Option<EdgeRef>> = vec![None; n];
    let mut done = vec![false; n];

    // The comparator and the relaxation loop both need to read and write
    // `dist`; a bare `&mut Vec` captured by the closure would make every
    // later direct mutation a borrow-checker conflict for as long as the
    // heap (and its stored closure) are alive. `RefCell` gives both sides
    // a shared handle with the aliasing checked at runtime instead.
    let mut heap = IndexedHeap::with_capacity(n, |a: Vertex, b: Vertex| dist.borrow()[a] < dist.borrow()[b]);

    for s in sources {
        if dist.borrow()[s] > 0 {
            dist.borrow_mut()[s] = 0;
            heap.push(s);
        }
    }

    while !heap.is_empty() {
        let v = heap.pop();
        if done[v] {
            continue;
        }
        done[v] = true;
        let dv = dist.borrow()[v];
        if visitor.finish_vertex(v, dv) == Flow::Stop {
            break;
        }

        for &e in g.incident(v) {
            if g.is_removed(e) {
                continue;
            }
            let w = g.other(e, v);
            if done[w] {
                continue;
            }
            if visitor.examine_edge(e, v, w) == Flow::Stop {
                return (dist.into_inner(), pred);
            }
            let nd = dv + g.weight(e);
            if nd < limit && nd < dist.borrow()[w] {
                dist.borrow_mut()[w] = nd;
                pred[w] = Some(e);
                heap.push(w);
                if visitor.discover_vertex(w, nd) == Flow::Stop {
                    return (dist.into_inner(), pred);
                }
            }
        }
    }

    (dist.into_inner(), pred)
}

#[cfg(test)]
mod test {
    use super::*;

    fn path_graph() -> Graph {
        // 0 -1- 1 -2- 2 -4- 3
        let mut g = Graph::new(4);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(1, 2, 2, 2, 3);
        g.add_original_edge(2, 3, 4, 3, 4);
        g
    }

    struct Collect(Vec<Vertex>);
    impl DfsVisitor for Collect {
        fn discover_vertex(&mut self, v: Vertex) -> Flow {
            self.0.push(v);
            Flow::Continue
        }
    }

    #[test]
    fn dfs_visits_every_reachable_vertex_once() {
        let g = path_graph();
        let mut visited = vec![false; g.vertex_count()];
        let mut visitor = Collect(Vec::new());
        dfs(&g, 0, &mut visited, &mut visitor);
        assert_eq!(visitor.0, vec![0, 1, 2, 3]);
    }

    #[test]
    fn dfs_stops_when_visitor_requests_it() {
        let g = path_graph();
        let mut visited = vec![false; g.vertex_count()];

        struct StopAtTwo(Vec<Vertex>);
        impl DfsVisitor for StopAtTwo {
            fn discover_vertex(&mut self, v: Vertex) -> Flow {
                self.0.push(v);
                if v == 2 {
                    Flow::Stop
                } else {
                    Flow::Continue
                }
            }
        }
        let mut visitor = StopAtTwo(Vec::new());
        dfs(&g, 0, &mut visited, &mut visitor);
        assert_eq!(visitor.0, vec![0, 1, 2]);
    }

    #[test]
    fn dijkstra_finds_shortest_distances() {
        let g = path_graph();
        let (dist, _) = dijkstra(&g, [0], INF, &mut NoOpDijkstraVisitor);
        assert_eq!(dist, vec![0, 1, 3, 7]);
    }

    #[test]
    fn dijkstra_respects_distance_limit() {
        let g = path_graph();
        let (dist, _) = dijkstra(&g, [0], 4, &mut NoOpDijkstraVisitor);
        assert_eq!(dist[0], 0);
        assert_eq!(dist[1], 1);
        assert_eq!(dist[2], 3);
        assert_eq!(dist[3], INF);
    }

    #[test]
    fn dijkstra_multi_source_takes_the_closer_one() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 10, 1, 2);
        g.add_original_edge(1, 2, 1, 2, 3);
        let (dist, pred) = dijkstra(&g, [0, 2], INF, &mut NoOpDijkstraVisitor);
        assert_eq!(dist[1], 1);
        assert!(pred[1].is_some());
    }
}
