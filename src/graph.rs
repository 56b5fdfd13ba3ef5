//! The mutating graph substrate: an arena of edges supporting contraction,
//! parallel-edge resolution, degree-2 suppression, and a history DAG so any
//! edge surviving in a derived graph can be expanded back to the original
//! edges it represents.
//!
//! Grounded in `original_source/src/graph.hpp`'s `Graph`/`Edge`/`EdgeData`.
//! The original represents an edge as a raw pointer into a `std::deque`,
//! with a direction bit folded into the low pointer bit so the same
//! allocation serves as two opposite directed views. That aliasing trick
//! doesn't translate to safe Rust; per the design notes this becomes an
//! arena of `EdgeData` records addressed by a small `Copy` handle
//! (`EdgeRef`), with `other(e, v)` computed from whichever endpoint `v`
//! is not, instead of embedding a direction bit in the handle itself.

use std::collections::BTreeSet;
use std::rc::Rc;

pub type Vertex = usize;
pub type Weight = i64;

/// A handle into a [`Graph`]'s edge arena. Two handles are equal iff they
/// name the same arena slot; handles remain valid for the lifetime of the
/// graph they came from (slots are never reordered, only flagged removed).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EdgeRef {
    index: u32,
}

/// A node in the history DAG recorded on every edge. See the module
/// design notes: `Original` and `External` are leaves, `Pair` has two
/// children (both indices into the *same* arena as the edge carrying
/// them). `Scratch` marks edges created in a throwaway graph (e.g. the
/// zero-weight trees used by reductions and local search) that are never
/// expanded and whose history is therefore never inspected.
#[derive(Clone, Copy, Debug)]
enum EdgeHistory {
    /// Leaf: this edge came straight from the input, naming the original
    /// (1-based) endpoint ids.
    Original(u32, u32),
    /// Leaf: this edge's identity is unchanged since [`Graph::save_orig_graph`]
    /// was called; the index names its slot in the saved snapshot's arena.
    External(u32),
    /// Internal node: this edge was synthesized (by [`Graph::suppress_vertex`])
    /// from two edges, given here as arena indices in this same graph.
    Pair(u32, u32),
    /// Not part of any original-edge lineage; never expanded.
    Scratch,
}

#[derive(Clone, Debug)]
struct EdgeData {
    s: Vertex,
    t: Vertex,
    weight: Weight,
    removed: bool,
    edge_list_pos: u32,
    successor_index: Option<u32>,
    history: EdgeHistory,
}

/// A mutable weighted graph with contraction, suppression, and history
/// tracking.
#[derive(Clone)]
pub struct Graph {
    vertex_count: usize,
    arena: Vec<EdgeData>,
    /// Per-vertex incidence lists, each kept sorted ascending by the
    /// *other* endpoint's index.
    inc: Vec<Vec<EdgeRef>>,
    edge_list: Vec<EdgeRef>,
    degrees: Vec<u32>,
    terminals: Vec<Vertex>,
    terminal_mask: Vec<bool>,
    partial_solution: Vec<EdgeRef>,
    /// Set once, by [`Graph::save_orig_graph`]; an immutable copy of this
    /// graph's state at the moment reductions end and contraction begins.
    orig_graph: Option<Rc<Graph>>,
}

impl Graph {
    pub fn new(vertex_count: usize) -> Self {
        Graph {
            vertex_count,
            arena: Vec::new(),
            inc: vec![Vec::new(); vertex_count],
            edge_list: Vec::new(),
            degrees: vec![0; vertex_count],
            terminals: Vec::new(),
            terminal_mask: vec![false; vertex_count],
            partial_solution: Vec::new(),
            orig_graph: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_count
    }

    pub fn edge_count(&self) -> usize {
        self.edge_list.len()
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    pub fn terminals(&self) -> &[Vertex] {
        &self.terminals
    }

    pub fn is_terminal(&self, v: Vertex) -> bool {
        self.terminal_mask[v]
    }

    pub fn degree(&self, v: Vertex) -> usize {
        self.degrees[v] as usize
    }

    pub fn incident(&self, v: Vertex) -> &[EdgeRef] {
        &self.inc[v]
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeRef> + '_ {
        self.edge_list.iter().copied()
    }

    pub fn weight(&self, e: EdgeRef) -> Weight {
        self.arena[e.index as usize].weight
    }

    pub fn endpoints(&self, e: EdgeRef) -> (Vertex, Vertex) {
        let d = &self.arena[e.index as usize];
        (d.s, d.t)
    }

    pub fn other(&self, e: EdgeRef, v: Vertex) -> Vertex {
        Self::other_of(&self.arena, e, v)
    }

    pub fn is_removed(&self, e: EdgeRef) -> bool {
        self.arena[e.index as usize].removed
    }

    pub fn partial_solution(&self) -> &[EdgeRef] {
        &self.partial_solution
    }

    pub fn set_partial_solution(&mut self, sol: Vec<EdgeRef>) {
        self.partial_solution = sol;
    }

    pub fn partial_solution_weight(&self) -> Weight {
        self.partial_solution.iter().map(|&e| self.weight(e)).sum()
    }

    pub fn mark_terminal(&mut self, v: Vertex) {
        if self.terminal_mask[v] {
            return;
        }
        self.terminal_mask[v] = true;
        self.terminals.push(v);
    }

    pub fn unmark_terminal(&mut self, v: Vertex) {
        if !self.terminal_mask[v] {
            return;
        }
        self.terminal_mask[v] = false;
        if let Some(pos) = self.terminals.iter().position(|&x| x == v) {
            self.terminals.swap_remove(pos);
        }
    }

    fn other_of(arena: &[EdgeData], e: EdgeRef, v: Vertex) -> Vertex {
        let d = &arena[e.index as usize];
        if d.s == v {
            d.t
        } else {
            d.s
        }
    }

    /// Binary search, since incidence lists are sorted by other-endpoint.
    pub fn find_edge(&self, s: Vertex, t: Vertex) -> Option<EdgeRef> {
        let arena = &self.arena;
        self.inc[s]
            .binary_search_by_key(&t, |&e| Self::other_of(arena, e, s))
            .ok()
            .map(|pos| self.inc[s][pos])
    }

    fn insert_sorted(&mut self, v: Vertex, e: EdgeRef, key: Vertex) {
        let arena = &self.arena;
        let pos = self.inc[v].partition_point(|&ee| Self::other_of(arena, ee, v) < key);
        self.inc[v].insert(pos, e);
    }

    fn remove_from_incidence(&mut self, v: Vertex, other: Vertex) {
        let arena = &self.arena;
        if let Ok(pos) = self.inc[v].binary_search_by_key(&other, |&e| Self::other_of(arena, e, v)) {
            self.inc[v].remove(pos);
        }
    }

    fn add_edge_with_history(&mut self, s: Vertex, t: Vertex, weight: Weight, history: EdgeHistory) -> EdgeRef {
        debug_assert!(s != t, "no self-loops");
        if let Some(old) = self.find_edge(s, t) {
            if self.weight(old) <= weight {
                return old;
            }
            self.remove_edge(old);
        }

        let index = self.arena.len() as u32;
        self.arena.push(EdgeData {
            s,
            t,
            weight,
            removed: false,
            edge_list_pos: self.edge_list.len() as u32,
            successor_index: None,
            history,
        });
        let e = EdgeRef { index };
        self.edge_list.push(e);

        self.insert_sorted(s, e, t);
        self.insert_sorted(t, e, s);
        self.degrees[s] += 1;
        self.degrees[t] += 1;

        e
    }

    /// Adds an edge straight from the input format (original, 1-based
    /// endpoint ids kept for final output).
    pub fn add_original_edge(&mut self, s: Vertex, t: Vertex, weight: Weight, orig_s: u32, orig_t: u32) -> EdgeRef {
        self.add_edge_with_history(s, t, weight, EdgeHistory::Original(orig_s, orig_t))
    }

    /// Adds an edge with no tracked history, for throwaway scratch graphs
    /// (e.g. the zero-weight trees built by reductions and local search).
    /// Such edges must never end up in a [`Graph::partial_solution`] that
    /// is later expanded.
    pub fn add_scratch_edge(&mut self, s: Vertex, t: Vertex, weight: Weight) -> EdgeRef {
        self.add_edge_with_history(s, t, weight, EdgeHistory::Scratch)
    }

    /// Idempotent; removing an already-removed edge is a no-op.
    pub fn remove_edge(&mut self, e: EdgeRef) -> bool {
        let idx = e.index as usize;
        if self.arena[idx].removed {
            return false;
        }
        let (s, t) = (self.arena[idx].s, self.arena[idx].t);

        self.remove_from_incidence(s, t);
        self.remove_from_incidence(t, s);

        let pos = self.arena[idx].edge_list_pos as usize;
        let last = self.edge_list.len() - 1;
        if pos != last {
            self.edge_list.swap(pos, last);
            let moved = self.edge_list[pos];
            self.arena[moved.index as usize].edge_list_pos = pos as u32;
        }
        self.edge_list.pop();

        self.arena[idx].removed = true;
        self.degrees[s] -= 1;
        self.degrees[t] -= 1;
        true
    }

    /// Contracts edge `e`, identifying its endpoints. The terminal side (if
    /// either is a terminal) is retained; the other becomes isolated.
    /// Returns the retained vertex, or `None` if `e` was already removed.
    pub fn contract_edge(&mut self, e: EdgeRef) -> Option<Vertex> {
        if self.arena[e.index as usize].removed {
            return None;
        }
        let (mut s, mut t) = self.endpoints(e);
        if self.is_terminal(t) {
            std::mem::swap(&mut s, &mut t);
        }

        self.remove_edge(e);

        let list_s = std::mem::take(&mut self.inc[s]);
        let list_t = std::mem::take(&mut self.inc[t]);

        let mut merged = Vec::with_capacity(list_s.len() + list_t.len());
        let mut losers = Vec::new();
        let (mut i, mut j) = (0usize, 0usize);
        while i < list_s.len() && j < list_t.len() {
            let ei = list_s[i];
            let ej = list_t[j];
            let oi = self.other(ei, s);
            let oj = self.other(ej, t);
            match oi.cmp(&oj) {
                std::cmp::Ordering::Less => {
                    merged.push(ei);
                    i += 1;
                }
                std::cmp::Ordering::Greater => {
                    merged.push(ej);
                    j += 1;
                }
                std::cmp::Ordering::Equal => {
                    let (survivor, loser) = if self.weight(ei) <= self.weight(ej) { (ei, ej) } else { (ej, ei) };
                    merged.push(survivor);
                    self.arena[loser.index as usize].successor_index = Some(survivor.index);
                    losers.push(loser);
                    i += 1;
                    j += 1;
                }
            }
        }
        merged.extend_from_slice(&list_s[i..]);
        merged.extend_from_slice(&list_t[j..]);

        for loser in losers {
            self.remove_edge(loser);
        }

        // Re-point every surviving ex-t edge at s, preserving sort order in
        // the far endpoint's incidence list. A plain remove+reinsert plays
        // the role of the original's in-place array rotation: same O(deg)
        // shape, clearer in safe Rust.
        for &e in &merged {
            let (old_s, old_t) = self.endpoints(e);
            if old_s != t && old_t != t {
                continue;
            }
            let neighbor = if old_s == t { old_t } else { old_s };
            self.remove_from_incidence(neighbor, t);
            let ed = &mut self.arena[e.index as usize];
            if ed.s == t {
                ed.s = s;
            } else {
                ed.t = s;
            }
            self.insert_sorted(neighbor, e, s);
        }

        self.inc[s] = merged;
        self.inc[t].clear();
        self.degrees[t] = 0;
        self.degrees[s] = self.inc[s].len() as u32;

        if self.is_terminal(s) && self.is_terminal(t) {
            self.unmark_terminal(t);
        }

        Some(s)
    }

    /// Forwards `e` along its successor chain (set when parallel-edge
    /// resolution supersedes it), then buys the survivor: records it in
    /// the partial solution and contracts it. Returns `None` if the
    /// survivor was already removed by the time this runs.
    pub fn buy_edge(&mut self, e: EdgeRef) -> Option<Vertex> {
        let mut idx = e.index;
        while let Some(next) = self.arena[idx as usize].successor_index {
            idx = next;
        }
        let survivor = EdgeRef { index: idx };
        if self.arena[idx as usize].removed {
            return None;
        }
        self.partial_solution.push(survivor);
        self.contract_edge(survivor)
    }

    /// Replaces a non-terminal degree-2 vertex and its two edges with a
    /// single edge between its neighbors, weight-summed.
    pub fn suppress_vertex(&mut self, v: Vertex) {
        debug_assert!(!self.is_terminal(v));
        debug_assert_eq!(self.degrees[v], 2);

        let e = self.inc[v][0];
        let f = self.inc[v][1];
        let s = self.other(e, v);
        let t = self.other(f, v);
        let w = self.weight(e) + self.weight(f);

        self.add_edge_with_history(s, t, w, EdgeHistory::Pair(e.index, f.index));

        self.remove_edge(e);
        self.remove_edge(f);
    }

    /// Relabels vertices to remove isolated slots, preserving relative
    /// order. Returns the forward map (old index -> new index, or `-1` if
    /// the vertex was isolated and dropped).
    pub fn compress_graph(&mut self) -> Vec<i64> {
        let n = self.vertex_count;
        let mut forward = vec![-1i64; n];
        let mut j = 0usize;
        for i in 0..n {
            if self.degrees[i] > 0 {
                forward[i] = j as i64;
                self.degrees[j] = self.degrees[i];
                self.inc.swap(j, i);
                self.terminal_mask[j] = self.terminal_mask[i];
                j += 1;
            }
        }
        self.degrees.truncate(j);
        self.inc.truncate(j);
        self.terminal_mask.truncate(j);

        for t in self.terminals.iter_mut() {
            *t = forward[*t] as usize;
        }
        for e in &self.edge_list {
            let ed = &mut self.arena[e.index as usize];
            ed.s = forward[ed.s] as usize;
            ed.t = forward[ed.t] as usize;
        }

        self.vertex_count = j;
        forward
    }

    /// Captures an immutable snapshot of the current state, then rewrites
    /// every edge currently in the arena (including removed ones, whose
    /// indices must stay meaningful to any dangling successor reference)
    /// to point at its own slot in that snapshot.
    pub fn save_orig_graph(&mut self) {
        let snapshot = Rc::new(self.clone());
        for (i, ed) in self.arena.iter_mut().enumerate() {
            ed.history = EdgeHistory::External(i as u32);
        }
        self.orig_graph = Some(snapshot);
    }

    pub fn has_snapshot(&self) -> bool {
        self.orig_graph.is_some()
    }

    /// Builds a working copy over the saved snapshot's topology, with a
    /// partial solution re-homed onto the snapshot's own edge identities.
    /// Used once, at the top of local search, so repair iterations run
    /// against the full pre-contraction instance rather than the heavily
    /// contracted graph star-contraction leaves behind.
    pub fn solution_graph(&self) -> Graph {
        let snapshot = self.orig_graph.as_ref().expect("solution_graph requires save_orig_graph to have run");
        let mut sol = (**snapshot).clone();
        sol.partial_solution.clear();

        let mut seen = std::collections::HashSet::new();
        for &e in &self.partial_solution {
            for idx in self.shallow_expand(e) {
                if seen.insert(idx) {
                    sol.partial_solution.push(EdgeRef { index: idx });
                }
            }
        }
        sol
    }

    /// Walks this graph's own history down to the first `External` leaf,
    /// returning the snapshot arena indices reached. Does not recurse
    /// further into the snapshot: that is [`Graph::expand_to_original_pairs`]'s job.
    fn shallow_expand(&self, e: EdgeRef) -> Vec<u32> {
        let mut stack = vec![e.index];
        let mut out = Vec::new();
        while let Some(idx) = stack.pop() {
            match self.arena[idx as usize].history {
                EdgeHistory::External(snap_idx) => out.push(snap_idx),
                EdgeHistory::Pair(a, b) => {
                    stack.push(a);
                    stack.push(b);
                }
                EdgeHistory::Original(..) => out.push(idx),
                EdgeHistory::Scratch => unreachable!("scratch edge in a solution history chain"),
            }
        }
        out
    }

    /// Fully expands `edges` (arena indices in *this* graph, which must
    /// carry no `External` history - call this on a snapshot, or on a
    /// graph that never had `save_orig_graph` called) down to original
    /// `(orig_s, orig_t)` 1-based endpoint pairs.
    ///
    /// The original C++ only expands one level (down to its own
    /// equivalent of an `External` leaf) and trusts that no residual
    /// `Pair` chain survives inside the snapshot by the time a solution is
    /// printed. Suppression can run before the snapshot is taken, so that
    /// trust isn't always warranted; this walks the snapshot's own `Pair`
    /// chains to completion instead.
    pub fn expand_to_original_pairs(&self, edges: &[EdgeRef]) -> BTreeSet<(u32, u32)> {
        let mut out = BTreeSet::new();
        let mut stack: Vec<u32> = edges.iter().map(|e| e.index).collect();
        while let Some(idx) = stack.pop() {
            match self.arena[idx as usize].history {
                EdgeHistory::Original(a, b) => {
                    out.insert((a, b));
                }
                EdgeHistory::Pair(a, b) => {
                    stack.push(a);
                    stack.push(b);
                }
                EdgeHistory::External(_) => {
                    panic!("expand_to_original_pairs called on a graph with External history; call it on a snapshot")
                }
                EdgeHistory::Scratch => unreachable!("scratch edge in a solution history chain"),
            }
        }
        out
    }

    #[cfg(test)]
    fn incidence_sorted(&self, v: Vertex) -> bool {
        self.inc[v].windows(2).all(|w| self.other(w[0], v) < self.other(w[1], v))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn triangle() -> Graph {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 3, 1, 2);
        g.add_original_edge(1, 2, 2, 2, 3);
        g.add_original_edge(2, 0, 70, 3, 1);
        g
    }

    #[test]
    fn add_edge_keeps_incidence_sorted() {
        let mut g = Graph::new(4);
        g.add_original_edge(0, 3, 1, 1, 4);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(0, 2, 1, 1, 3);
        assert!(g.incidence_sorted(0));
        assert_eq!(g.degree(0), 3);
    }

    #[test]
    fn add_edge_keeps_cheaper_parallel() {
        let mut g = Graph::new(2);
        let e1 = g.add_original_edge(0, 1, 5, 1, 2);
        let e2 = g.add_original_edge(0, 1, 3, 1, 2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.weight(e2), 3);
        assert!(g.find_edge(0, 1) == Some(e2) || g.find_edge(0, 1) == Some(e1));
    }

    #[test]
    fn add_edge_tie_keeps_existing() {
        let mut g = Graph::new(2);
        let e1 = g.add_original_edge(0, 1, 5, 1, 2);
        let e2 = g.add_original_edge(0, 1, 5, 9, 9);
        assert_eq!(e1, e2);
    }

    #[test]
    fn remove_edge_is_idempotent() {
        let mut g = triangle();
        let e = g.find_edge(0, 1).unwrap();
        assert!(g.remove_edge(e));
        assert!(!g.remove_edge(e));
        assert_eq!(g.degree(0), 1);
        assert_eq!(g.degree(1), 1);
    }

    #[test]
    fn contract_merges_and_drops_parallel() {
        let mut g = Graph::new(4);
        g.add_original_edge(0, 1, 1, 1, 2);
        g.add_original_edge(1, 2, 5, 2, 3);
        g.add_original_edge(0, 2, 2, 1, 3);
        let e01 = g.find_edge(0, 1).unwrap();
        let s = g.contract_edge(e01).unwrap();
        assert_eq!(g.degree(1), 0);
        // the (0,2) and merged (1,2) edges collide; cheaper (weight 2) wins
        assert_eq!(g.degree(s), 1);
        let surv = g.find_edge(s, 2).unwrap();
        assert_eq!(g.weight(surv), 2);
        assert!(g.incidence_sorted(s));
    }

    #[test]
    fn contract_prefers_terminal_as_retained_endpoint() {
        let mut g = Graph::new(2);
        g.mark_terminal(1);
        let e = g.add_original_edge(0, 1, 1, 1, 2);
        let s = g.contract_edge(e).unwrap();
        assert_eq!(s, 1);
    }

    #[test]
    fn suppress_vertex_replaces_degree_two_steiner() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 2, 1, 2);
        g.add_original_edge(1, 2, 3, 2, 3);
        g.suppress_vertex(1);
        assert_eq!(g.degree(1), 0);
        let e = g.find_edge(0, 2).unwrap();
        assert_eq!(g.weight(e), 5);
    }

    #[test]
    fn buy_edge_forwards_through_successor_chain() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 5, 1, 2);
        g.add_original_edge(1, 2, 1, 2, 3);
        g.add_original_edge(0, 2, 1, 1, 3);
        let e01 = g.find_edge(0, 1).unwrap();
        // contracting (0,1) collapses (1,2)/(0,2) into a parallel pair;
        // buying the now-superseded loser should forward to the survivor.
        let s = g.contract_edge(e01).unwrap();
        let surv = g.find_edge(s, 2).unwrap();
        assert_eq!(g.partial_solution().len(), 0);
        g.buy_edge(surv);
        assert_eq!(g.partial_solution(), &[surv]);
    }

    #[test]
    fn compress_graph_relabels_without_changing_edge_set() {
        let mut g = Graph::new(5);
        g.add_original_edge(1, 3, 1, 2, 4);
        g.contract_edge(g.find_edge(1, 3).unwrap());
        // vertex 0, 2, 4 are isolated/untouched; compress should drop empties
        let forward = g.compress_graph();
        assert_eq!(g.vertex_count(), 1);
        assert!(forward[1] >= 0);
    }

    #[test]
    fn expand_walks_pair_chains_to_original_leaves() {
        let mut g = Graph::new(3);
        g.add_original_edge(0, 1, 2, 10, 20);
        g.add_original_edge(1, 2, 3, 20, 30);
        g.suppress_vertex(1);
        let e = g.find_edge(0, 2).unwrap();
        let out = g.expand_to_original_pairs(&[e]);
        assert_eq!(out.len(), 2);
        assert!(out.contains(&(10, 20)));
        assert!(out.contains(&(20, 30)));
    }

    #[test]
    fn save_and_solution_graph_round_trips_bought_edges() {
        let mut g = triangle();
        g.save_orig_graph();
        let e = g.find_edge(0, 1).unwrap();
        g.buy_edge(e);
        let sol = g.solution_graph();
        assert_eq!(sol.partial_solution().len(), 1);
        let out = sol.expand_to_original_pairs(sol.partial_solution());
        assert_eq!(out, [(1u32, 2u32)].into_iter().collect());
    }
}
