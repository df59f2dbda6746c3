//! Maximum-cardinality matching on general graphs (Edmonds' blossom algorithm).
//!
//! Blossoms are contracted implicitly: every vertex carries a `base` label and contracting an
//! odd cycle relabels all of its vertices with the cycle's base. Lifting the augmenting path
//! back through a blossom follows the `parent` links recorded while marking the cycle, which
//! always picks the even-length side.

use rustc_hash::FxHashSet;
use std::collections::VecDeque;

use crate::scheduler::SchedulerError;

pub type Vertex = usize;

/// Simple undirected graph. Self-loops and parallel edges are ignored.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    adjacency: Vec<Vec<Vertex>>,
    edges: FxHashSet<(Vertex, Vertex)>,
}

impl Graph {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); vertex_count],
            edges: FxHashSet::default(),
        }
    }

    /// Append an isolated vertex and return it.
    pub fn add_vertex(&mut self) -> Vertex {
        self.adjacency.push(Vec::new());
        self.adjacency.len() - 1
    }

    /// Grow the vertex set so that `vertex` exists.
    pub fn ensure_vertex(&mut self, vertex: Vertex) {
        if vertex >= self.adjacency.len() {
            self.adjacency.resize(vertex + 1, Vec::new());
        }
    }

    /// Add the undirected edge `{u, v}`. Returns false if it was a self-loop or already present.
    pub fn add_edge(&mut self, u: Vertex, v: Vertex) -> bool {
        if u == v || !self.edges.insert((u.min(v), u.max(v))) {
            return false;
        }
        self.ensure_vertex(u.max(v));
        self.adjacency[u].push(v);
        self.adjacency[v].push(u);
        true
    }

    #[inline]
    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.edges.contains(&(u.min(v), u.max(v)))
    }

    pub fn neighbors(&self, v: Vertex) -> &[Vertex] {
        &self.adjacency[v]
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// A matching stored as a mate vector. `mate(u) == Some(v)` iff `mate(v) == Some(u)` for any
/// matching produced by this module.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Matching {
    mate: Vec<Option<Vertex>>,
}

impl Matching {
    pub fn new(vertex_count: usize) -> Self {
        Self {
            mate: vec![None; vertex_count],
        }
    }

    /// Build from raw mates. Nothing is checked; see [`is_matching_feasible`].
    pub fn from_mates(mate: Vec<Option<Vertex>>) -> Self {
        Self { mate }
    }

    /// Build from vertex pairs.
    pub fn from_pairs(vertex_count: usize, pairs: &[(Vertex, Vertex)]) -> Self {
        let mut matching = Self::new(vertex_count);
        for &(u, v) in pairs {
            matching.pair(u, v);
        }
        matching
    }

    #[inline]
    pub fn mate(&self, v: Vertex) -> Option<Vertex> {
        self.mate.get(v).copied().flatten()
    }

    pub fn is_matched(&self, v: Vertex) -> bool {
        self.mate(v).is_some()
    }

    pub fn contains(&self, u: Vertex, v: Vertex) -> bool {
        self.mate(u) == Some(v)
    }

    fn pair(&mut self, u: Vertex, v: Vertex) {
        let needed = u.max(v) + 1;
        if needed > self.mate.len() {
            self.mate.resize(needed, None);
        }
        self.mate[u] = Some(v);
        self.mate[v] = Some(u);
    }

    /// Unmatch `v` and its mate.
    pub fn unpair(&mut self, v: Vertex) {
        if let Some(u) = self.mate(v) {
            self.mate[u] = None;
            self.mate[v] = None;
        }
    }

    /// Match `u` with `v`, dropping any previous partners of either.
    pub fn rematch(&mut self, u: Vertex, v: Vertex) {
        self.unpair(u);
        self.unpair(v);
        self.pair(u, v);
    }

    /// Matched pairs `(u, v)` with `u < v`.
    pub fn pairs(&self) -> impl Iterator<Item = (Vertex, Vertex)> + '_ {
        self.mate
            .iter()
            .enumerate()
            .filter_map(|(u, m)| m.filter(|&v| u < v).map(|v| (u, v)))
    }

    /// Number of matched pairs.
    pub fn len(&self) -> usize {
        self.pairs().count()
    }

    pub fn is_empty(&self) -> bool {
        self.mate.iter().all(Option::is_none)
    }
}

/// Every matched pair is a real edge, mates are symmetric, and no vertex is matched twice.
pub fn is_matching_feasible(graph: &Graph, matching: &Matching) -> bool {
    matching.mate.iter().enumerate().all(|(u, m)| match *m {
        None => true,
        Some(v) => {
            u < graph.vertex_count()
                && v < graph.vertex_count()
                && graph.has_edge(u, v)
                && matching.mate(v) == Some(u)
        }
    })
}

/// Maximum-cardinality matching, optionally extending `initial`.
///
/// Vertices matched by `initial` stay matched in the result (augmentation never exposes a
/// matched vertex), which is what the two-phase schedulers rely on.
pub fn max_matching(graph: &Graph, initial: Option<&Matching>) -> Result<Matching, SchedulerError> {
    let n = graph.vertex_count();
    let mut mate: Vec<Option<Vertex>> = vec![None; n];

    if let Some(initial) = initial {
        if initial.mate.len() > n || !is_matching_feasible(graph, initial) {
            return Err(SchedulerError::Invariant(
                "initial matching is not a matching of the graph".to_string(),
            ));
        }
        mate[..initial.mate.len()].copy_from_slice(&initial.mate);
    }

    let mut search = BlossomSearch::new(graph, mate);
    for root in 0..n {
        if search.mate[root].is_none() {
            if let Some(end) = search.find_augmenting_path(root) {
                search.augment(end);
            }
        }
    }

    let matching = Matching { mate: search.mate };
    if !is_matching_feasible(graph, &matching) {
        return Err(SchedulerError::Invariant(
            "blossom search produced an infeasible matching".to_string(),
        ));
    }
    Ok(matching)
}

struct BlossomSearch<'a> {
    graph: &'a Graph,
    mate: Vec<Option<Vertex>>,
    parent: Vec<Option<Vertex>>,
    base: Vec<Vertex>,
    in_tree: Vec<bool>,
    in_blossom: Vec<bool>,
    queue: VecDeque<Vertex>,
}

impl<'a> BlossomSearch<'a> {
    fn new(graph: &'a Graph, mate: Vec<Option<Vertex>>) -> Self {
        let n = graph.vertex_count();
        Self {
            graph,
            mate,
            parent: vec![None; n],
            base: (0..n).collect(),
            in_tree: vec![false; n],
            in_blossom: vec![false; n],
            queue: VecDeque::new(),
        }
    }

    /// Grow an alternating tree from `root`; returns the exposed vertex ending an augmenting
    /// path, if any.
    fn find_augmenting_path(&mut self, root: Vertex) -> Option<Vertex> {
        let n = self.graph.vertex_count();
        self.parent.iter_mut().for_each(|p| *p = None);
        self.in_tree.iter_mut().for_each(|u| *u = false);
        for (i, b) in self.base.iter_mut().enumerate() {
            *b = i;
        }
        self.queue.clear();

        self.in_tree[root] = true;
        self.queue.push_back(root);

        let graph = self.graph;
        while let Some(v) = self.queue.pop_front() {
            for &to in graph.neighbors(v) {
                if self.base[v] == self.base[to] || self.mate[v] == Some(to) {
                    continue;
                }

                let closes_odd_cycle =
                    to == root || self.mate[to].is_some_and(|m| self.parent[m].is_some());
                if closes_odd_cycle {
                    let cycle_base = self.lowest_common_ancestor(v, to);
                    self.in_blossom.iter_mut().for_each(|b| *b = false);
                    self.mark_path(v, cycle_base, to);
                    self.mark_path(to, cycle_base, v);
                    for i in 0..n {
                        if self.in_blossom[self.base[i]] {
                            self.base[i] = cycle_base;
                            if !self.in_tree[i] {
                                self.in_tree[i] = true;
                                self.queue.push_back(i);
                            }
                        }
                    }
                } else if self.parent[to].is_none() {
                    self.parent[to] = Some(v);
                    match self.mate[to] {
                        None => return Some(to),
                        Some(next) => {
                            self.in_tree[next] = true;
                            self.queue.push_back(next);
                        }
                    }
                }
            }
        }
        None
    }

    fn lowest_common_ancestor(&self, a: Vertex, b: Vertex) -> Vertex {
        let mut on_path = vec![false; self.graph.vertex_count()];

        let mut a = a;
        loop {
            a = self.base[a];
            on_path[a] = true;
            match self.mate[a].and_then(|m| self.parent[m]) {
                Some(next) => a = next,
                None => break,
            }
        }

        let mut b = b;
        loop {
            b = self.base[b];
            if on_path[b] {
                return b;
            }
            match self.mate[b].and_then(|m| self.parent[m]) {
                Some(next) => b = next,
                None => return b,
            }
        }
    }

    fn mark_path(&mut self, mut v: Vertex, cycle_base: Vertex, mut child: Vertex) {
        while self.base[v] != cycle_base {
            let Some(m) = self.mate[v] else { break };
            self.in_blossom[self.base[v]] = true;
            self.in_blossom[self.base[m]] = true;
            self.parent[v] = Some(child);
            child = m;
            match self.parent[m] {
                Some(next) => v = next,
                None => break,
            }
        }
    }

    /// Flip the matched/unmatched edges along the path ending at `end`.
    fn augment(&mut self, end: Vertex) {
        let mut v = Some(end);
        while let Some(current) = v {
            let Some(pv) = self.parent[current] else { break };
            let next = self.mate[pv];
            self.mate[current] = Some(pv);
            self.mate[pv] = Some(current);
            v = next;
        }
    }
}

/// Exhaustive maximum matching, used as a reference on small graphs.
pub fn brute_force_max_matching(graph: &Graph) -> Matching {
    fn search(graph: &Graph, from: Vertex, current: &mut Matching, best: &mut Matching) {
        let n = graph.vertex_count();
        let Some(u) = (from..n).find(|&u| !current.is_matched(u)) else {
            if current.len() > best.len() {
                *best = current.clone();
            }
            return;
        };

        for &v in graph.neighbors(u) {
            if v > u && !current.is_matched(v) {
                current.pair(u, v);
                search(graph, u + 1, current, best);
                current.unpair(u);
            }
        }
        // Leave u exposed.
        search(graph, u + 1, current, best);
    }

    let n = graph.vertex_count();
    let mut current = Matching::new(n);
    let mut best = Matching::new(n);
    search(graph, 0, &mut current, &mut best);
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn graph_from(n: usize, edges: &[(Vertex, Vertex)]) -> Graph {
        let mut graph = Graph::new(n);
        for &(u, v) in edges {
            graph.add_edge(u, v);
        }
        graph
    }

    #[test]
    fn test_graph_ignores_loops_and_duplicates() {
        let mut graph = Graph::new(3);
        assert!(graph.add_edge(0, 1));
        assert!(!graph.add_edge(1, 0));
        assert!(!graph.add_edge(2, 2));
        assert_eq!(graph.edge_count(), 1);
        assert!(graph.has_edge(1, 0));
    }

    #[test]
    fn test_feasibility_check() {
        let graph = graph_from(4, &[(0, 1), (1, 2), (2, 3)]);

        assert!(is_matching_feasible(&graph, &Matching::from_pairs(4, &[(0, 1), (2, 3)])));
        assert!(!is_matching_feasible(&graph, &Matching::from_pairs(4, &[(0, 2)])));
        let asymmetric = Matching::from_mates(vec![Some(1), Some(2), Some(1), None]);
        assert!(!is_matching_feasible(&graph, &asymmetric));
    }

    #[test]
    fn test_odd_cycle_needs_blossom() {
        // Triangle 0-1-2 with a tail 2-3 and a pendant 0-4: perfect-ish matching of size 2
        // only found by going through the blossom.
        let graph = graph_from(6, &[(0, 1), (1, 2), (2, 0), (2, 3), (0, 4), (3, 5)]);
        let initial = Matching::from_pairs(6, &[(1, 2)]);
        let matching = max_matching(&graph, Some(&initial)).unwrap();

        assert!(is_matching_feasible(&graph, &matching));
        assert_eq!(matching.len(), 3);
    }

    #[test]
    fn test_petersen_graph_has_perfect_matching() {
        let outer = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)];
        let spokes = [(0, 5), (1, 6), (2, 7), (3, 8), (4, 9)];
        let inner = [(5, 7), (7, 9), (9, 6), (6, 8), (8, 5)];
        let edges: Vec<_> = outer.iter().chain(&spokes).chain(&inner).copied().collect();
        let graph = graph_from(10, &edges);

        let matching = max_matching(&graph, None).unwrap();
        assert!(is_matching_feasible(&graph, &matching));
        assert_eq!(matching.len(), 5);
    }

    #[test]
    fn test_initial_matching_vertices_stay_matched() {
        let graph = graph_from(6, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 5)]);
        let initial = Matching::from_pairs(6, &[(1, 2), (3, 4)]);
        let matching = max_matching(&graph, Some(&initial)).unwrap();

        assert_eq!(matching.len(), 3);
        for v in 1..=4 {
            assert!(matching.is_matched(v));
        }
    }

    #[test]
    fn test_rejects_invalid_initial_matching() {
        let graph = graph_from(3, &[(0, 1)]);
        let bogus = Matching::from_pairs(3, &[(1, 2)]);
        assert!(matches!(
            max_matching(&graph, Some(&bogus)),
            Err(SchedulerError::Invariant(_))
        ));
    }

    #[test]
    fn test_random_graphs_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..300 {
            let n = rng.random_range(1..11);
            let mut graph = Graph::new(n);
            let density = rng.random_range(0.1..0.7);
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.random_bool(density) {
                        graph.add_edge(u, v);
                    }
                }
            }

            let expected = brute_force_max_matching(&graph);
            let matching = max_matching(&graph, None).unwrap();
            assert!(is_matching_feasible(&graph, &expected));
            assert!(is_matching_feasible(&graph, &matching));
            assert_eq!(matching.len(), expected.len());
        }
    }

    #[test]
    fn test_seeded_growth_keeps_maximum() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let n = rng.random_range(2..10);
            let mut graph = Graph::new(n);
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.random_bool(0.3) {
                        graph.add_edge(u, v);
                    }
                }
            }
            let first = max_matching(&graph, None).unwrap();

            let extra = graph.add_vertex();
            for u in 0..n {
                if rng.random_bool(0.3) {
                    graph.add_edge(u, extra);
                }
                if rng.random_bool(0.2) {
                    graph.add_edge(u, (u + 2) % n);
                }
            }
            let second = max_matching(&graph, Some(&first)).unwrap();
            assert!(is_matching_feasible(&graph, &second));
            assert_eq!(second.len(), brute_force_max_matching(&graph).len());
        }
    }
}
