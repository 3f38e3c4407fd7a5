// ============================================================================
// Union-Find (sequential)
// ============================================================================

/// Union-find over the detection positions of one leaf.
///
/// Union always links the larger root under the smaller one, so the root of
/// every set is its smallest member.
#[derive(Debug)]
pub(crate) struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    pub(crate) fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    /// Find root with iterative path compression (two-pass).
    #[inline]
    pub(crate) fn find(&mut self, item: usize) -> usize {
        // First pass: find root
        let mut root = item;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        // Second pass: compress path
        let mut current = item;
        while current != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }

        root
    }

    #[inline]
    pub(crate) fn union(&mut self, a: usize, b: usize) {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a != root_b {
            let (smaller, larger) = if root_a < root_b {
                (root_a, root_b)
            } else {
                (root_b, root_a)
            };
            self.parent[larger] = smaller;
        }
    }

    /// Members of every set, sets ordered by their smallest member and
    /// members in ascending order.
    pub(crate) fn groups(&mut self) -> Vec<Vec<usize>> {
        let len = self.parent.len();
        let mut slot_of_root = vec![usize::MAX; len];
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for item in 0..len {
            let root = self.find(item);
            if slot_of_root[root] == usize::MAX {
                slot_of_root[root] = groups.len();
                groups.push(Vec::new());
            }
            groups[slot_of_root[root]].push(item);
        }
        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_is_smallest_member() {
        let mut uf = UnionFind::new(6);
        uf.union(4, 5);
        uf.union(5, 2);
        uf.union(1, 3);
        assert_eq!(uf.find(5), 2);
        assert_eq!(uf.find(4), 2);
        assert_eq!(uf.find(3), 1);
        assert_eq!(uf.find(0), 0);
    }

    #[test]
    fn groups_are_ordered() {
        let mut uf = UnionFind::new(5);
        uf.union(3, 0);
        uf.union(4, 2);
        uf.union(2, 3);
        assert_eq!(uf.groups(), vec![vec![0, 2, 3, 4], vec![1]]);
    }

    #[test]
    fn long_chain_compresses() {
        let mut uf = UnionFind::new(100);
        for i in (1..100).rev() {
            uf.union(i, i - 1);
        }
        assert_eq!(uf.find(99), 0);
        assert_eq!(uf.groups().len(), 1);
    }
}
