//! Disjoint-set forest over `0..n`.
//!
//! Used to replay dendrogram merges: applying the first `n − k` merges of an
//! agglomerative clustering and reading off [`UnionFind::labels`] yields the
//! flat k-cluster partition.
//!
//! # Algorithm
//!
//! Union by size with iterative path halving in `find`, giving amortised
//! O(α(n)) per operation.
//!
//! Reference: Tarjan & van Leeuwen (1984), "Worst-Case Analysis of Set
//! Union Algorithms", *J. ACM* 31(2).

/// Disjoint-set forest.
///
/// # Examples
/// ```
/// use u_statkit::collections::UnionFind;
///
/// let mut uf = UnionFind::new(5);
/// uf.union(0, 3);
/// uf.union(4, 1);
/// assert_eq!(uf.component_count(), 3);
/// assert_eq!(uf.labels(), vec![0, 1, 2, 0, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    components: usize,
}

impl UnionFind {
    /// `n` singleton sets.
    pub fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            size: vec![1; n],
            components: n,
        }
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Root of the set containing `x`.
    ///
    /// # Panics
    /// Panics if `x >= len()`.
    pub fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            let grandparent = self.parent[self.parent[x]];
            self.parent[x] = grandparent;
            x = grandparent;
        }
        x
    }

    /// Merges the sets holding `x` and `y`, attaching the smaller under the
    /// larger. Returns `false` if they were already joined.
    ///
    /// # Panics
    /// Panics if either index is out of range.
    pub fn union(&mut self, x: usize, y: usize) -> bool {
        let (mut a, mut b) = (self.find(x), self.find(y));
        if a == b {
            return false;
        }
        if self.size[a] < self.size[b] {
            std::mem::swap(&mut a, &mut b);
        }
        self.parent[b] = a;
        self.size[a] += self.size[b];
        self.components -= 1;
        true
    }

    pub fn connected(&mut self, x: usize, y: usize) -> bool {
        self.find(x) == self.find(y)
    }

    pub fn component_count(&self) -> usize {
        self.components
    }

    /// Size of the set containing `x`.
    pub fn component_size(&mut self, x: usize) -> usize {
        let root = self.find(x);
        self.size[root]
    }

    /// Dense component labels `0..component_count()`, numbered in order of
    /// each component's first element.
    pub fn labels(&mut self) -> Vec<usize> {
        let n = self.len();
        let mut by_root = vec![usize::MAX; n];
        let mut next = 0;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let root = self.find(i);
            if by_root[root] == usize::MAX {
                by_root[root] = next;
                next += 1;
            }
            out.push(by_root[root]);
        }
        out
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn labels_agree_with_connectivity(
            n in 1_usize..40,
            pairs in proptest::collection::vec((0_usize..40, 0_usize..40), 0..60),
        ) {
            let mut uf = UnionFind::new(n);
            for (a, b) in pairs {
                uf.union(a % n, b % n);
            }
            let labels = uf.labels();
            let distinct = labels.iter().copied().max().map_or(0, |m| m + 1);
            prop_assert_eq!(distinct, uf.component_count());
            for i in 0..n {
                for j in 0..n {
                    prop_assert_eq!(labels[i] == labels[j], uf.connected(i, j));
                }
            }
        }
    }
}
