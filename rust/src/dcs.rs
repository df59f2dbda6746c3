//! Upper degree-constrained subgraphs via reduction to matching.
//!
//! Every original edge `e = {u, v}` becomes two outer gadget nodes `u_e`, `v_e` joined by a
//! cross edge. A vertex `v` with degree `d` and bound `b` gets `max(0, d - b)` inner gadget
//! nodes, each adjacent to every outer node of `v`. A maximum matching of the gadget graph
//! that saturates all inner nodes leaves at most `b` cross edges at `v`, and the matched
//! cross edges form a maximum subgraph respecting the bounds:
//!
//! `|max matching| = |max subgraph| + sum over v of max(0, d - b)`.
//!
//! The builder is incremental and never renumbers gadget nodes, so a matching computed before
//! adding edges stays a valid seed for the grown gadget graph.

use crate::matching::{max_matching, Graph, Matching, Vertex};
use crate::scheduler::SchedulerError;

#[derive(Clone, Debug)]
struct GadgetEdge {
    u: Vertex,
    v: Vertex,
    outer_u: Vertex,
    outer_v: Vertex,
}

/// Incremental gadget construction for a degree-bounded subgraph problem.
#[derive(Clone, Debug, Default)]
pub struct DegreeConstrainedSubgraph {
    bounds: Vec<usize>,
    outer: Vec<Vec<Vertex>>,
    inner: Vec<Vec<Vertex>>,
    edges: Vec<GadgetEdge>,
    original: Graph,
    gadget: Graph,
}

impl DegreeConstrainedSubgraph {
    /// Start with isolated vertices carrying the given degree bounds.
    pub fn new(bounds: Vec<usize>) -> Self {
        let n = bounds.len();
        Self {
            bounds,
            outer: vec![Vec::new(); n],
            inner: vec![Vec::new(); n],
            edges: Vec::new(),
            original: Graph::new(n),
            gadget: Graph::default(),
        }
    }

    pub fn add_vertex(&mut self, bound: usize) -> Vertex {
        self.bounds.push(bound);
        self.outer.push(Vec::new());
        self.inner.push(Vec::new());
        self.original.add_vertex()
    }

    pub fn vertex_count(&self) -> usize {
        self.bounds.len()
    }

    pub fn bound(&self, v: Vertex) -> usize {
        self.bounds[v]
    }

    /// Add the original edge `{u, v}`. Returns false for self-loops and duplicates.
    pub fn add_edge(&mut self, u: Vertex, v: Vertex) -> Result<bool, SchedulerError> {
        let n = self.vertex_count();
        if u >= n || v >= n {
            return Err(SchedulerError::Invariant(format!(
                "edge {{{}, {}}} references a vertex outside 0..{}",
                u, v, n
            )));
        }
        if !self.original.add_edge(u, v) {
            return Ok(false);
        }

        let outer_u = self.gadget.add_vertex();
        let outer_v = self.gadget.add_vertex();
        self.gadget.add_edge(outer_u, outer_v);
        self.attach_outer(u, outer_u);
        self.attach_outer(v, outer_v);
        self.edges.push(GadgetEdge {
            u,
            v,
            outer_u,
            outer_v,
        });
        Ok(true)
    }

    fn attach_outer(&mut self, vertex: Vertex, outer: Vertex) {
        for &inner in &self.inner[vertex] {
            self.gadget.add_edge(outer, inner);
        }
        self.outer[vertex].push(outer);

        if self.outer[vertex].len() > self.bounds[vertex] {
            let inner = self.gadget.add_vertex();
            for &o in &self.outer[vertex] {
                self.gadget.add_edge(o, inner);
            }
            self.inner[vertex].push(inner);
        }
    }

    /// The auxiliary graph handed to the matching engine.
    pub fn gadget(&self) -> &Graph {
        &self.gadget
    }

    /// Total number of inner gadget nodes.
    pub fn inner_node_count(&self) -> usize {
        self.inner.iter().map(Vec::len).sum()
    }

    /// Maximum matching of the gadget graph, optionally extending `initial`.
    ///
    /// Before augmenting, every exposed inner node is paired with an exposed outer node of
    /// the same vertex when one exists. Edges added after `initial` was computed bring fresh
    /// outer nodes, so a seed taken from an earlier solve keeps all inner nodes covered and
    /// every vertex that was saturated stays saturated.
    pub fn solve(&self, initial: Option<&Matching>) -> Result<Matching, SchedulerError> {
        let mut seed = initial.cloned().unwrap_or_default();
        for vertex in 0..self.vertex_count() {
            for &inner in &self.inner[vertex] {
                if seed.is_matched(inner) {
                    continue;
                }
                if let Some(&outer) = self.outer[vertex].iter().find(|&&o| !seed.is_matched(o)) {
                    seed.rematch(outer, inner);
                }
            }
        }

        let matching = max_matching(&self.gadget, Some(&seed))?;
        self.cover_inner_nodes(matching)
    }

    /// Swap exposed inner nodes onto cross-matched outer nodes of their vertex.
    ///
    /// The swap keeps the matching size, so this only fails when `matching` is not maximum.
    fn cover_inner_nodes(&self, mut matching: Matching) -> Result<Matching, SchedulerError> {
        for vertex in 0..self.vertex_count() {
            for &inner in &self.inner[vertex] {
                if matching.is_matched(inner) {
                    continue;
                }
                let crossing = self.outer[vertex].iter().copied().find(|&o| {
                    matching
                        .mate(o)
                        .is_some_and(|m| !self.inner[vertex].contains(&m))
                });
                match crossing {
                    Some(outer) => matching.rematch(outer, inner),
                    None => {
                        return Err(SchedulerError::Invariant(format!(
                            "gadget matching is not maximum at vertex {}",
                            vertex
                        )))
                    }
                }
            }
        }
        Ok(matching)
    }

    /// Read the subgraph off a maximum gadget matching: the edges whose cross edge is matched.
    pub fn subgraph(&self, matching: &Matching) -> Result<Subgraph, SchedulerError> {
        let matching = self.cover_inner_nodes(matching.clone())?;

        let mut subgraph = Subgraph {
            adjacency: vec![Vec::new(); self.vertex_count()],
        };
        for edge in &self.edges {
            if matching.contains(edge.outer_u, edge.outer_v) {
                subgraph.adjacency[edge.u].push(edge.v);
                subgraph.adjacency[edge.v].push(edge.u);
            }
        }

        for vertex in 0..self.vertex_count() {
            if subgraph.degree(vertex) > self.bounds[vertex] {
                return Err(SchedulerError::Invariant(format!(
                    "vertex {} has degree {} above its bound {}",
                    vertex,
                    subgraph.degree(vertex),
                    self.bounds[vertex]
                )));
            }
        }
        for neighbors in &mut subgraph.adjacency {
            neighbors.sort_unstable();
        }
        Ok(subgraph)
    }
}

/// Chosen subgraph as `vertex -> neighbors`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Subgraph {
    adjacency: Vec<Vec<Vertex>>,
}

impl Subgraph {
    /// Neighbors of `v`, ascending.
    pub fn neighbors(&self, v: Vertex) -> &[Vertex] {
        &self.adjacency[v]
    }

    pub fn degree(&self, v: Vertex) -> usize {
        self.adjacency[v].len()
    }

    pub fn contains(&self, u: Vertex, v: Vertex) -> bool {
        self.adjacency[u].binary_search(&v).is_ok()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum::<usize>() / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force_size(bounds: &[usize], edges: &[(Vertex, Vertex)]) -> usize {
        let mut best = 0;
        for mask in 0u32..(1 << edges.len()) {
            let mut degree = vec![0usize; bounds.len()];
            for (i, &(u, v)) in edges.iter().enumerate() {
                if mask & (1 << i) != 0 {
                    degree[u] += 1;
                    degree[v] += 1;
                }
            }
            if degree.iter().zip(bounds).all(|(d, b)| d <= b) {
                best = best.max(mask.count_ones() as usize);
            }
        }
        best
    }

    #[test]
    fn test_star_respects_center_bound() {
        let mut dcs = DegreeConstrainedSubgraph::new(vec![2, 1, 1, 1, 1]);
        for leaf in 1..5 {
            assert!(dcs.add_edge(0, leaf).unwrap());
        }
        assert!(!dcs.add_edge(1, 0).unwrap());
        assert_eq!(dcs.inner_node_count(), 2);

        let matching = dcs.solve(None).unwrap();
        let subgraph = dcs.subgraph(&matching).unwrap();
        assert_eq!(subgraph.degree(0), 2);
        assert_eq!(subgraph.edge_count(), 2);
        assert_eq!(matching.len(), subgraph.edge_count() + dcs.inner_node_count());
    }

    #[test]
    fn test_triangle_with_unit_bounds() {
        let mut dcs = DegreeConstrainedSubgraph::new(vec![1, 1, 1]);
        dcs.add_edge(0, 1).unwrap();
        dcs.add_edge(1, 2).unwrap();
        dcs.add_edge(2, 0).unwrap();

        let subgraph = dcs.subgraph(&dcs.solve(None).unwrap()).unwrap();
        assert_eq!(subgraph.edge_count(), 1);
    }

    #[test]
    fn test_zero_bound_isolates_vertex() {
        let mut dcs = DegreeConstrainedSubgraph::new(vec![0, 3, 3]);
        dcs.add_edge(0, 1).unwrap();
        dcs.add_edge(0, 2).unwrap();
        dcs.add_edge(1, 2).unwrap();

        let subgraph = dcs.subgraph(&dcs.solve(None).unwrap()).unwrap();
        assert_eq!(subgraph.degree(0), 0);
        assert!(subgraph.contains(1, 2));
    }

    #[test]
    fn test_rejects_unknown_vertex() {
        let mut dcs = DegreeConstrainedSubgraph::new(vec![1]);
        assert!(matches!(
            dcs.add_edge(0, 3),
            Err(SchedulerError::Invariant(_))
        ));
    }

    #[test]
    fn test_random_instances_match_brute_force() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..150 {
            let n = rng.random_range(2..7);
            let bounds: Vec<usize> = (0..n).map(|_| rng.random_range(0..4)).collect();
            let mut edges = Vec::new();
            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.random_bool(0.5) {
                        edges.push((u, v));
                    }
                }
            }

            let mut dcs = DegreeConstrainedSubgraph::new(bounds.clone());
            for &(u, v) in &edges {
                dcs.add_edge(u, v).unwrap();
            }
            let subgraph = dcs.subgraph(&dcs.solve(None).unwrap()).unwrap();
            assert_eq!(subgraph.edge_count(), brute_force_size(&bounds, &edges));
        }
    }

    #[test]
    fn test_two_phase_seeding() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..100 {
            let n = rng.random_range(3..7);
            let bounds: Vec<usize> = (0..n).map(|_| rng.random_range(1..3)).collect();
            let mut all_edges = Vec::new();
            let mut dcs = DegreeConstrainedSubgraph::new(bounds.clone());

            for u in 0..n {
                for v in (u + 1)..n {
                    if rng.random_bool(0.4) {
                        dcs.add_edge(u, v).unwrap();
                        all_edges.push((u, v));
                    }
                }
            }
            let first = dcs.solve(None).unwrap();

            for u in 0..n {
                let v = (u + 1) % n;
                if dcs.add_edge(u, v).unwrap() {
                    all_edges.push((u.min(v), u.max(v)));
                }
            }
            let second = dcs.solve(Some(&first)).unwrap();
            let subgraph = dcs.subgraph(&second).unwrap();
            assert_eq!(subgraph.edge_count(), brute_force_size(&bounds, &all_edges));
        }
    }
}
