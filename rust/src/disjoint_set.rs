//! Arena-backed disjoint-set forest with path compression.
//!
//! Each node carries an integer value. Unions move the value of the absorbed set onto the
//! surviving root, so a lookup always yields the value of the most recently merged-in set.
//! The unit-job scheduler uses this to redirect an exhausted deadline to the previous one.

/// Node handle into a [`DisjointSet`].
pub type NodeId = usize;

#[derive(Debug, Clone, Default)]
pub struct DisjointSet {
    parent: Vec<NodeId>,
    size: Vec<usize>,
    value: Vec<i64>,
}

impl DisjointSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: Vec::with_capacity(capacity),
            size: Vec::with_capacity(capacity),
            value: Vec::with_capacity(capacity),
        }
    }

    /// Create a singleton set holding `value`.
    pub fn make_set(&mut self, value: i64) -> NodeId {
        let id = self.parent.len();
        self.parent.push(id);
        self.size.push(1);
        self.value.push(value);
        id
    }

    /// Root of `node`'s set. Every node on the path is repointed to the root.
    pub fn find_root(&mut self, node: NodeId) -> NodeId {
        let mut root = node;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut current = node;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Value carried by `node`'s set.
    pub fn value(&mut self, node: NodeId) -> i64 {
        let root = self.find_root(node);
        self.value[root]
    }

    /// Merge `other`'s set into `node`'s set. The merged set takes `other`'s value.
    ///
    /// Returns the new root.
    pub fn union(&mut self, node: NodeId, other: NodeId) -> NodeId {
        let a = self.find_root(node);
        let b = self.find_root(other);
        if a == b {
            return a;
        }

        let value = self.value[b];
        let (root, child) = if self.size[a] >= self.size[b] {
            (a, b)
        } else {
            (b, a)
        };
        self.parent[child] = root;
        self.size[root] += self.size[child];
        self.value[root] = value;
        root
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }
}
