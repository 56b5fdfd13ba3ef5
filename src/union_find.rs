//! Path-compressed, union-by-rank disjoint set, with a per-class label.
//!
//! Grounded in `tdist.hpp`'s `UnionFind`: the original encodes "is root"
//! by biasing root parent pointers into `[size, 2*size)` so a single
//! comparison tells root from non-root without a separate flag. The Rust
//! port keeps that trick (it avoids an extra `Vec<bool>` and a branch in
//! the hot `root` loop) but documents it instead of leaving it implicit.

/// Disjoint-set forest. `label(u)` is distinct from `root(u)`: the label
/// is attached to the root and can be changed independently of which
/// element happens to be the representative (used by
/// [`crate::bridges::IncrementalBridgeComponents`] to track a
/// bridge-component's parent separately from union-find's own root
/// bookkeeping).
pub struct UnionFind {
    size: usize,
    parent: Vec<usize>,
    rank: Vec<usize>,
    class_size: Vec<usize>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        UnionFind {
            size,
            parent: (0..size).map(|i| i + size).collect(),
            rank: vec![0; size],
            class_size: vec![1; size],
        }
    }

    fn is_root(&self, u: usize) -> bool {
        self.parent[u] >= self.size
    }

    /// Finds the root of `u`'s class, compressing the path along the way.
    pub fn root(&mut self, u: usize) -> usize {
        let mut to_compress = Vec::new();
        let mut v = u;
        while !self.is_root(v) {
            to_compress.push(v);
            v = self.parent[v];
        }
        for w in to_compress {
            self.parent[w] = v;
        }
        v
    }

    /// The label attached to `u`'s class (defaults to the root's own
    /// index, biased by `size`, until overwritten).
    pub fn label(&mut self, u: usize) -> usize {
        let r = self.root(u);
        self.parent[r] - self.size
    }

    pub fn class_size(&mut self, u: usize) -> usize {
        let r = self.root(u);
        self.class_size[r]
    }

    pub fn same_class(&mut self, u: usize, v: usize) -> bool {
        self.root(u) == self.root(v)
    }

    /// Unions the classes of `u` and `v`, returning the resulting root.
    /// No-op (returns the shared root) if already unioned.
    pub fn union(&mut self, u: usize, v: usize) -> usize {
        let mut ur = self.root(u);
        let mut vr = self.root(v);
        if ur == vr {
            return ur;
        }
        if self.rank[ur] > self.rank[vr] {
            std::mem::swap(&mut ur, &mut vr);
        }
        self.parent[ur] = vr;
        self.class_size[vr] += self.class_size[ur];
        if self.rank[ur] == self.rank[vr] {
            self.rank[vr] += 1;
        }
        vr
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn singletons_are_distinct() {
        let mut uf = UnionFind::new(4);
        assert!(!uf.same_class(0, 1));
        assert!(!uf.same_class(2, 3));
    }

    #[test]
    fn union_merges_classes() {
        let mut uf = UnionFind::new(4);
        uf.union(0, 1);
        assert!(uf.same_class(0, 1));
        assert!(!uf.same_class(0, 2));
        uf.union(1, 2);
        assert!(uf.same_class(0, 2));
        assert_eq!(uf.class_size(0), 3);
    }

    #[test]
    fn union_is_idempotent() {
        let mut uf = UnionFind::new(3);
        uf.union(0, 1);
        let r1 = uf.union(0, 1);
        let r2 = uf.root(0);
        assert_eq!(r1, r2);
    }
}
