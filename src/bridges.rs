//! Incremental bridge-connected components, maintained as edges are added
//! one at a time in increasing weight order.
//!
//! Grounded in `original_source/src/tdist.hpp`'s `IncrementalBridgeConnComponents`,
//! following Westbrook-Tarjan: a union-find over full connected components,
//! a second union-find over bridge-connected components, and a forest (one
//! parent pointer + one parent edge per bridge-component root) linking
//! bridge-components together through the bridges still standing between
//! them. Adding an edge either joins two components (a new bridge), is
//! already inside one bridge-component (a no-op), or closes a cycle that
//! collapses every bridge-component on the path between its endpoints'
//! bridge-components into one (those former bridges are returned, since
//! they just stopped being bridges).

use crate::graph::EdgeRef;
use crate::union_find::UnionFind;

pub struct IncrementalBridgeComponents {
    components: UnionFind,
    bridge_conn_components: UnionFind,
    parent_bc: Vec<Option<usize>>,
    parent_edge: Vec<Option<EdgeRef>>,
    visited: Vec<bool>,
}

impl IncrementalBridgeComponents {
    pub fn new(size: usize) -> Self {
        IncrementalBridgeComponents {
            components: UnionFind::new(size),
            bridge_conn_components: UnionFind::new(size),
            parent_bc: vec![None; size],
            parent_edge: vec![None; size],
            visited: vec![false; size],
        }
    }

    fn component_label(&mut self, u: usize) -> usize {
        let bc_label = self.bridge_conn_components.label(u);
        self.components.label(bc_label)
    }

    fn get_parent_edge(&mut self, bcu: usize) -> Option<EdgeRef> {
        let root = self.bridge_conn_components.root(bcu);
        self.parent_edge[root]
    }

    /// The bridge-component one hop further from the root than `bcu`,
    /// itself resolved to its current bridge-component root.
    fn get_parent_bc(&mut self, bcu: usize) -> Option<usize> {
        let root = self.bridge_conn_components.root(bcu);
        self.parent_bc[root].map(|p| self.bridge_conn_components.root(p))
    }

    pub fn same_component(&mut self, u: usize, v: usize) -> bool {
        self.component_label(u) == self.component_label(v)
    }

    pub fn same_bridge_conn_component(&mut self, u: usize, v: usize) -> bool {
        self.bridge_conn_components.root(u) == self.bridge_conn_components.root(v)
    }

    /// Incorporates edge `e` (with endpoints `u`, `v`) into the structure.
    /// Returns the edges that were bridges before this call but are
    /// condensed into `e`'s bridge-connected component by it.
    pub fn link(&mut self, e: EdgeRef, mut u: usize, mut v: usize) -> Vec<EdgeRef> {
        let mut removed_bridges = Vec::new();

        if self.same_bridge_conn_component(u, v) {
            return removed_bridges;
        }

        if !self.same_component(u, v) {
            let mut bcu = self.bridge_conn_components.root(u);
            let mut bcv = self.bridge_conn_components.root(v);
            let mut cu = self.component_label(u);
            let mut cv = self.component_label(v);

            if self.components.class_size(cu) > self.components.class_size(cv) {
                std::mem::swap(&mut cu, &mut cv);
                std::mem::swap(&mut bcu, &mut bcv);
                std::mem::swap(&mut u, &mut v);
            }

            self.evert(bcu);
            self.parent_bc[bcu] = Some(bcv);
            self.parent_edge[bcu] = Some(e);
            self.components.union(cu, cv);
        } else {
            let bcu = self.bridge_conn_components.root(u);
            let bcv = self.bridge_conn_components.root(v);
            let bcz = self.find_lca(bcu, bcv);

            let mut to_link = Vec::new();
            for &start in &[bcu, bcv] {
                let mut bcx = start;
                while bcx != bcz {
                    removed_bridges.push(self.get_parent_edge(bcx).expect("non-root bc has a parent edge"));
                    to_link.push(bcx);
                    bcx = self.get_parent_bc(bcx).expect("non-root bc has a parent bc");
                }
            }
            let bczp = self.get_parent_bc(bcz);
            let bcze = self.get_parent_edge(bcz);
            for bcx in to_link {
                self.bridge_conn_components.union(bcx, bcz);
            }
            let new_bcz = self.bridge_conn_components.root(bcz);
            self.parent_bc[new_bcz] = bczp;
            self.parent_edge[new_bcz] = bcze;
        }

        removed_bridges
    }

    /// Reverses the chain of parent pointers from `bcu`'s root up to the
    /// top of its bridge-component tree, so `bcu` becomes the new root.
    fn evert(&mut self, bcu: usize) {
        let bcu = self.bridge_conn_components.root(bcu);
        let mut curr = bcu;
        let mut e = self.get_parent_edge(curr);
        let mut par = self.get_parent_bc(curr);
        while let Some(p) = par {
            let pp = self.get_parent_bc(p);
            let pe = self.get_parent_edge(p);
            self.parent_bc[p] = Some(curr);
            self.parent_edge[p] = e;
            e = pe;
            curr = p;
            par = pp;
        }
        self.parent_bc[bcu] = None;
        self.parent_edge[bcu] = None;
    }

    /// Lowest common ancestor of `bcu` and `bcv` in the bridge-component
    /// tree, found by alternately stepping each one toward the root until
    /// the paths meet.
    ///
    /// The original resets its `visited` scratch array with a second,
    /// partial walk down each starting path before also unconditionally
    /// zeroing the whole array - the partial walk is redundant with that
    /// final full reset and isn't ported here.
    fn find_lca(&mut self, mut bcu: usize, mut bcv: usize) -> usize {
        let lca = loop {
            if let Some(p) = self.get_parent_bc(bcu) {
                self.visited[bcu] = true;
                bcu = p;
                if self.visited[bcu] {
                    break bcu;
                }
            }
            if let Some(p) = self.get_parent_bc(bcv) {
                self.visited[bcv] = true;
                bcv = p;
                if self.visited[bcv] {
                    break bcv;
                }
            }
            if bcu == bcv {
                break bcu;
            }
        };
        for flag in self.visited.iter_mut() {
            *flag = false;
        }
        lca
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::graph::Graph;

    fn edge_ref_at(g: &mut Graph, s: usize, t: usize) -> EdgeRef {
        g.add_original_edge(s, t, 1, s as u32 + 1, t as u32 + 1);
        g.find_edge(s, t).unwrap()
    }

    #[test]
    fn linking_within_same_bridge_component_is_a_noop() {
        let mut inc = IncrementalBridgeComponents::new(3);
        let mut g = Graph::new(3);
        let e = edge_ref_at(&mut g, 0, 1);
        inc.link(e, 0, 1);
        assert!(inc.same_bridge_conn_component(0, 1));
        let again = edge_ref_at(&mut g, 0, 1);
        let removed = inc.link(again, 0, 1);
        assert!(removed.is_empty());
    }

    #[test]
    fn closing_a_triangle_condenses_both_bridges() {
        let mut g = Graph::new(3);
        let mut inc = IncrementalBridgeComponents::new(3);
        let e01 = edge_ref_at(&mut g, 0, 1);
        let e12 = edge_ref_at(&mut g, 1, 2);
        inc.link(e01, 0, 1);
        inc.link(e12, 1, 2);
        assert!(!inc.same_bridge_conn_component(0, 2));

        let e02 = edge_ref_at(&mut g, 2, 0);
        let removed = inc.link(e02, 2, 0);
        assert_eq!(removed.len(), 2);
        assert!(inc.same_bridge_conn_component(0, 1));
        assert!(inc.same_bridge_conn_component(1, 2));
    }

    #[test]
    fn disjoint_components_become_one_after_linking() {
        let mut g = Graph::new(4);
        let mut inc = IncrementalBridgeComponents::new(4);
        assert!(!inc.same_component(0, 3));
        let e01 = edge_ref_at(&mut g, 0, 1);
        let e23 = edge_ref_at(&mut g, 2, 3);
        inc.link(e01, 0, 1);
        inc.link(e23, 2, 3);
        assert!(!inc.same_component(0, 3));

        let e13 = edge_ref_at(&mut g, 1, 3);
        inc.link(e13, 1, 3);
        assert!(inc.same_component(0, 3));
        assert!(!inc.same_bridge_conn_component(0, 3));
    }
}
