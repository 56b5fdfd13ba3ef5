//! Safe graph-shrinking rules, plus the orchestration entry points that
//! drive them to a fixpoint. Every rule here is
//! monotone-safe: it never eliminates every optimum, only ever buys an
//! edge that some optimal solution is guaranteed to contain, or removes
//! one that no optimal solution needs.
//!
//! Grounded in `original_source/src/heuristics.hpp` (degree rules, cherry
//! deletion, shortest-path domination, the `run_*_heuristics` pipeline)
//! and `tdist.hpp` (the bottleneck Steiner / terminal-distance test).

use std::cell::RefCell;

use crate::bridges::IncrementalBridgeComponents;
use crate::graph::{EdgeRef, Graph, Vertex, Weight};
use crate::heap::IndexedHeap;
use crate::traverse::{dijkstra, DijkstraVisitor, Flow, INF};

/// Removes degree-1 Steiner (non-terminal) vertices' single edge, and
/// suppresses degree-2 non-terminals. Returns `(deleted, suppressed)`.
pub fn handle_small_steiner_degrees(g: &mut Graph) -> (usize, usize) {
    let mut deleted = 0;
    let mut suppressed = 0;
    for v in 0..g.vertex_count() {
        if g.is_terminal(v) {
            continue;
        }
        match g.degree(v) {
            1 => {
                g.remove_edge(g.incident(v)[0]);
                deleted += 1;
            }
            2 => {
                g.suppress_vertex(v);
                suppressed += 1;
            }
            _ => {}
        }
    }
    (deleted, suppressed)
}

/// Buys the single edge off every degree-1 terminal.
pub fn handle_small_terminal_degrees(g: &mut Graph) -> usize {
    let mut count = 0;
    for v in 0..g.vertex_count() {
        if g.is_terminal(v) && g.degree(v) == 1 {
            let e = g.incident(v)[0];
            if g.buy_edge(e).is_some() {
                count += 1;
            }
        }
    }
    count
}

fn cheapest_edge_from(g: &Graph, v: Vertex) -> Option<EdgeRef> {
    g.incident(v).iter().copied().min_by_key(|&e| g.weight(e))
}

/// Buys every terminal's cheapest incident edge when that edge also leads
/// to another terminal.
pub fn shortest_edge_between_terminals(g: &mut Graph) -> usize {
    if g.terminal_count() <= 1 {
        return 0;
    }
    let mut possible = Vec::new();
    for &t in g.terminals() {
        if let Some(e) = cheapest_edge_from(g, t) {
            if g.is_terminal(g.other(e, t)) {
                possible.push(e);
            }
        }
    }
    let mut count = 0;
    for e in possible {
        if g.buy_edge(e).is_some() {
            count += 1;
        }
    }
    count
}

/// Buys every zero-weight edge still standing.
pub fn buy_zero(g: &mut Graph) -> usize {
    let to_buy: Vec<EdgeRef> = g.edges().filter(|&e| g.weight(e) == 0).collect();
    let mut count = 0;
    for e in to_buy {
        if g.buy_edge(e).is_some() {
            count += 1;
        }
    }
    count
}

/// For edge `(u, v)`, is there a common neighbor `x` with
/// `w(u,x) + w(x,v) <= w(u,v)`? Sorted-incidence-list intersection, O(deg).
fn cherry_dominates(g: &Graph, u: Vertex, v: Vertex, uv_weight: Weight) -> bool {
    let iu = g.incident(u);
    let iv = g.incident(v);
    let (mut i, mut j) = (0usize, 0usize);
    while i < iu.len() && j < iv.len() {
        let ou = g.other(iu[i], u);
        let ov = g.other(iv[j], v);
        match ou.cmp(&ov) {
            std::cmp::Ordering::Equal => {
                if g.weight(iu[i]) + g.weight(iv[j]) <= uv_weight {
                    return true;
                }
                i += 1;
                j += 1;
            }
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
        }
    }
    false
}

/// Cherry domination: deletes every edge `e = (u, v)` dominated by a
/// common-neighbor detour. A round may find two dominated edges sharing
/// an endpoint; only one of those can be safely removed before the
/// other's incidence lists are stale, so the loser is deferred to the
/// next round (mirrors `heuristics.hpp`'s `marked`/`rerun` bookkeeping).
pub fn delete_edges(g: &mut Graph) -> usize {
    let mut total = 0;
    loop {
        let mut to_del = Vec::new();
        for e in g.edges() {
            let (u, v) = g.endpoints(e);
            if cherry_dominates(g, u, v, g.weight(e)) {
                to_del.push(e);
            }
        }
        if to_del.is_empty() {
            break;
        }
        let mut marked = vec![false; g.vertex_count()];
        let mut rerun = false;
        for e in to_del {
            let (u, v) = g.endpoints(e);
            if !marked[u] && !marked[v] {
                marked[u] = true;
                marked[v] = true;
                g.remove_edge(e);
                total += 1;
            } else {
                rerun = true;
            }
        }
        if !rerun {
            break;
        }
    }
    total
}

/// For each vertex `v`, a bounded Dijkstra that stops once every one of
/// `v`'s neighbors has been settled, counting how many equal-weight
/// shortest paths reach each. An incident edge `(v, u)` is redundant if
/// it's strictly longer than `dist[u]`, or ties it without being the
/// unique shortest predecessor.
fn shortest_path_dominated_edges(g: &Graph, v: Vertex) -> Vec<EdgeRef> {
    let n = g.vertex_count();
    let dist = RefCell::new(vec![INF; n]);
    let mut pred_count = vec![0u32; n];
    let mut neighbor_mask = vec![false; n];
    let mut neighbors_to_go = g.degree(v);
    for &e in g.incident(v) {
        neighbor_mask[g.other(e, v)] = true;
    }

    dist.borrow_mut()[v] = 0;
    pred_count[v] = 1;
    let mut heap = IndexedHeap::with_capacity(n, |a: Vertex, b: Vertex| dist.borrow()[a] < dist.borrow()[b]);
    heap.push(v);
    let mut done = vec![false; n];

    while !heap.is_empty() {
        let x = heap.pop();
        if done[x] {
            continue;
        }
        done[x] = true;
        if neighbor_mask[x] {
            neighbor_mask[x] = false;
            neighbors_to_go -= 1;
        }
        if neighbors_to_go == 0 {
            break;
        }
        let dx = dist.borrow()[x];
        for &e in g.incident(x) {
            if g.is_removed(e) {
                continue;
            }
            let w = g.other(e, x);
            if done[w] {
                continue;
            }
            let nd = dx + g.weight(e);
            let cur = dist.borrow()[w];
            if nd < cur {
                dist.borrow_mut()[w] = nd;
                pred_count[w] = 1;
                heap.push(w);
            } else if nd == cur {
                pred_count[w] += 1;
            }
        }
    }

    let dist = dist.into_inner();
    let mut to_remove = Vec::new();
    for &e in g.incident(v) {
        let u = g.other(e, v);
        let w = g.weight(e);
        if w > dist[u] || (w == dist[u] && pred_count[u] > 1) {
            to_remove.push(e);
        }
    }
    to_remove
}

/// Shortest-path domination: deletes any edge `(v, u)` that a cheaper (or
/// equally cheap but non-unique) alternative path already makes
/// redundant. Requires no zero-weight edges to remain (run [`buy_zero`]
/// first): a zero-weight cycle would make every incident edge trivially
/// dominated by itself.
pub fn delete_edges_shortest_path(g: &mut Graph) -> usize {
    let mut total = 0;
    for v in 0..g.vertex_count() {
        if g.degree(v) == 0 {
            continue;
        }
        let to_remove = shortest_path_dominated_edges(g, v);
        total += to_remove.len();
        for e in to_remove {
            g.remove_edge(e);
        }
    }
    total
}

struct TerminalReachVisitor<'a> {
    g: &'a Graph,
    threshold: Weight,
    found: bool,
    term_dist: Weight,
}

impl<'a> DijkstraVisitor for TerminalReachVisitor<'a> {
    fn finish_vertex(&mut self, v: Vertex, dist: Weight) -> Flow {
        if dist > self.threshold {
            return Flow::Stop;
        }
        if self.g.is_terminal(v) {
            self.found = true;
            self.term_dist = dist;
            return Flow::Stop;
        }
        Flow::Continue
    }
}

/// Tests whether edge `f` is dominated under the bottleneck-Steiner-
/// distance test with threshold `w(e)` for the edge `e` that just closed
/// a cycle over it: both of `f`'s endpoints must reach a terminal,
/// without using `f` itself, within a shrinking weight budget. Runs the
/// probe on a scratch clone with `f` removed, since the traversal kernels
/// have no notion of "ignore this one edge". On success, marks both of
/// `f`'s endpoints terminal - mirroring the original's unconditional
/// `mark_terminal` on both endpoints before returning, so later edges
/// tested within the same pass can find a terminal at distance 0 here.
fn test_edge(g: &mut Graph, f: EdgeRef, threshold: Weight) -> bool {
    let (s, t) = g.endpoints(f);
    let f_weight = g.weight(f);
    let mut probe = g.clone();
    probe.remove_edge(f);

    let mut remaining = threshold - f_weight;
    for start in [s, t] {
        let mut visitor = TerminalReachVisitor { g: &probe, threshold: remaining, found: false, term_dist: 0 };
        dijkstra(&probe, [start], INF, &mut visitor);
        if !visitor.found {
            return false;
        }
        remaining -= visitor.term_dist;
    }
    g.mark_terminal(s);
    g.mark_terminal(t);
    true
}

/// The bottleneck Steiner / terminal-distance test: processes edges in
/// ascending weight order through an incremental bridge-components
/// structure, marking edges between distinct terminal components buyable
/// outright, and testing every edge demoted from a bridge against the
/// closing edge's weight.
pub fn terminal_distance_test(g: &mut Graph) -> usize {
    let n = g.vertex_count();
    let mut inc = IncrementalBridgeComponents::new(n);
    let mut sorted: Vec<EdgeRef> = g.edges().collect();
    sorted.sort_by_key(|&e| g.weight(e));

    let mut to_buy = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let w = g.weight(sorted[i]);
        let mut j = i;
        while j < sorted.len() && g.weight(sorted[j]) == w {
            let f = sorted[j];
            let (fs, ft) = g.endpoints(f);
            if !inc.same_component(fs, ft) && g.is_terminal(fs) && g.is_terminal(ft) {
                to_buy.push(f);
                inc.link(f, fs, ft);
            }
            j += 1;
        }
        for e in &sorted[i..j] {
            let (es, et) = g.endpoints(*e);
            for f in inc.link(*e, es, et) {
                if test_edge(g, f, w) {
                    to_buy.push(f);
                }
            }
        }
        i = j;
    }

    let count = to_buy.len();
    for e in to_buy {
        g.buy_edge(e);
    }
    count
}

/// The cheap fixpoint loop: degree-1/2 rules plus the cheapest-terminal-
/// edge rule, repeated until the edge count stops changing.
pub fn run_cheap_heuristics(g: &mut Graph) {
    let mut prev_count = usize::MAX;
    loop {
        handle_small_terminal_degrees(g);
        handle_small_steiner_degrees(g);
        shortest_edge_between_terminals(g);
        let count = g.edge_count();
        if count == prev_count {
            break;
        }
        prev_count = count;
    }
}

/// The full reduction pipeline run once, between reductions and the
/// start of star contraction: cheap fixpoint, cherry deletion, shortest-
/// path domination, the terminal-distance test, then shortest-path
/// domination again, each followed by another cheap fixpoint and a
/// vertex-numbering compression.
pub fn run_all_heuristics(g: &mut Graph) {
    run_cheap_heuristics(g);
    g.compress_graph();

    delete_edges(g);
    run_cheap_heuristics(g);
    g.compress_graph();

    delete_edges_shortest_path(g);
    run_cheap_heuristics(g);
    g.compress_graph();

    terminal_distance_test(g);
    run_cheap_heuristics(g);
    g.compress_graph();

    delete_edges_shortest_path(g);
    run_cheap_heuristics(g);
    g.compress_graph();
}

/// The rules safe to run *without* invalidating a star-contraction round's
/// cached ratios: steiner-degree cleanup every round, plus one cherry-
/// deletion pass the first time the graph still has more than 20
/// terminals (mirrors `run_noninvalidating_heuristics`'s one-shot static
/// counter).
pub fn run_noninvalidating_heuristics(g: &mut Graph, cherry_done: &mut bool) {
    if !*cherry_done && g.terminal_count() > 20 {
        delete_edges(g);
        *cherry_done = true;
    }
    handle_small_steiner_degrees(g);
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn degree1_terminal_gets_bought() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(1, 2, 5, 2, 3);
        g.mark_terminal(0);
        g.mark_terminal(2);
        handle_small_terminal_degrees(&mut g);
        assert_eq!(g.partial_solution().len(), 1);
    }

    #[test]
    fn degree2_steiner_gets_suppressed() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 2, 1, 2);
        g.add_original_edge(1, 2, 3, 2, 3);
        g.mark_terminal(0);
        g.mark_terminal(2);
        handle_small_steiner_degrees(&mut g);
        assert_eq!(g.degree(1), 0);
        let e = g.find_edge(0, 2).unwrap();
        assert_eq!(g.weight(e), 5);
    }

    #[test]
    fn zero_weight_edge_is_bought() {
        let mut g = Graph::new(4);
        g.add_original_edge(0, 1, 0, 1, 2);
        g.add_original_edge(1, 2, 4, 2, 3);
        g.add_original_edge(2, 3, 0, 3, 4);
        let n = buy_zero(&mut g);
        assert_eq!(n, 2);
        assert_eq!(g.partial_solution().len(), 2);
    }

    #[test]
    fn cherry_domination_removes_dominated_edge() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 5, 1, 2);
        g.add_original_edge(1, 2, 3, 2, 3);
        g.add_original_edge(0, 2, 100, 1, 3);
        g.mark_terminal(0);
        g.mark_terminal(2);
        let removed = delete_edges(&mut g);
        assert_eq!(removed, 1);
        assert!(g.find_edge(0, 2).is_none());
    }

    #[test]
    fn shortest_path_domination_removes_redundant_parallel_route() {
        // 0-1 weight 1, 1-2 weight 1, 0-2 weight 5: the direct (0,2) edge
        // is longer than the 0-1-2 detour and should be removed.
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(1, 2, 1, 2, 3);
        g.add_original_edge(0, 2, 5, 1, 3);
        delete_edges_shortest_path(&mut g);
        assert!(g.find_edge(0, 2).is_none());
        assert!(g.find_edge(0, 1).is_some());
        assert!(g.find_edge(1, 2).is_some());
    }

    #[test]
    fn terminal_distance_test_buys_direct_terminal_edge() {
        let mut g = Graph::new(2);
        g.add_original_edge(0, 1, 3, 1, 2);
        g.mark_terminal(0);
        g.mark_terminal(1);
        terminal_distance_test(&mut g);
        assert_eq!(g.partial_solution().len(), 1);
    }

    #[test]
    fn cheap_fixpoint_converges_on_repeated_application() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(1, 2, 5, 2, 3);
        g.mark_terminal(0);
        g.mark_terminal(2);
        run_cheap_heuristics(&mut g);
        let edges_before = g.edge_count();
        run_cheap_heuristics(&mut g);
        assert_eq!(g.edge_count(), edges_before);
    }
}
