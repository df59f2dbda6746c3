//! Maximum flow over small integer-capacity networks.
//!
//! A [`FlowNetwork`] is mutated in place (edges added, removed, re-weighted) and re-solved
//! from zero flow on every call to [`FlowNetwork::max_flow`]. The network itself is never
//! modified by a solve, so the schedulers can toggle time slots and re-check feasibility
//! without rebuilding the graph.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

pub type NodeIndex = usize;
pub type Capacity = i64;

/// Max-flow algorithm selection. All methods return the same flow value; the particular
/// flow decomposition may differ.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FlowMethod {
    /// BFS shortest augmenting paths.
    EdmondsKarp,
    /// DFS augmenting paths.
    FordFulkerson,
    /// Level graph with blocking flows.
    Dinic,
    /// FIFO preflow-push.
    #[default]
    PushRelabel,
}

impl FlowMethod {
    pub const ALL: [FlowMethod; 4] = [
        FlowMethod::EdmondsKarp,
        FlowMethod::FordFulkerson,
        FlowMethod::Dinic,
        FlowMethod::PushRelabel,
    ];

    fn solve(self, residual: &mut Residual<'_>, source: NodeIndex, sink: NodeIndex) -> Capacity {
        match self {
            FlowMethod::EdmondsKarp => augmenting_paths(residual, source, sink, SearchOrder::Breadth),
            FlowMethod::FordFulkerson => augmenting_paths(residual, source, sink, SearchOrder::Depth),
            FlowMethod::Dinic => dinic(residual, source, sink),
            FlowMethod::PushRelabel => push_relabel(residual, source, sink),
        }
    }
}

/// Directed network with integer capacities.
///
/// Arcs are stored in pairs: arc `2k` is the forward arc, `2k + 1` its residual twin.
#[derive(Clone, Debug, Default)]
pub struct FlowNetwork {
    adjacency: Vec<Vec<usize>>,
    heads: Vec<NodeIndex>,
    capacity: Vec<Capacity>,
    present: Vec<bool>,
    arc_of: FxHashMap<(NodeIndex, NodeIndex), usize>,
}

impl FlowNetwork {
    pub fn new(node_count: usize) -> Self {
        Self {
            adjacency: vec![Vec::new(); node_count],
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of edges currently present.
    pub fn edge_count(&self) -> usize {
        self.present.iter().filter(|&&p| p).count()
    }

    fn ensure_node(&mut self, node: NodeIndex) {
        if node >= self.adjacency.len() {
            self.adjacency.resize(node + 1, Vec::new());
        }
    }

    /// Create edge `u -> v`, or overwrite its capacity if it already exists.
    pub fn add_edge(&mut self, u: NodeIndex, v: NodeIndex, capacity: Capacity) {
        if let Some(&arc) = self.arc_of.get(&(u, v)) {
            self.capacity[arc] = capacity;
            self.present[arc / 2] = true;
            return;
        }

        self.ensure_node(u.max(v));
        let arc = self.heads.len();
        self.heads.push(v);
        self.capacity.push(capacity);
        self.heads.push(u);
        self.capacity.push(0);
        self.present.push(true);
        self.adjacency[u].push(arc);
        self.adjacency[v].push(arc + 1);
        self.arc_of.insert((u, v), arc);
    }

    /// Add `delta` to the capacity of `u -> v`, creating the edge at zero if missing.
    pub fn add_capacity(&mut self, u: NodeIndex, v: NodeIndex, delta: Capacity) {
        let current = self.capacity(u, v).unwrap_or(0);
        self.add_edge(u, v, current + delta);
    }

    /// Remove `u -> v`. Returns its capacity if it was present.
    pub fn remove_edge(&mut self, u: NodeIndex, v: NodeIndex) -> Option<Capacity> {
        let arc = *self.arc_of.get(&(u, v))?;
        if !self.present[arc / 2] {
            return None;
        }
        self.present[arc / 2] = false;
        Some(std::mem::replace(&mut self.capacity[arc], 0))
    }

    pub fn has_edge(&self, u: NodeIndex, v: NodeIndex) -> bool {
        self.arc_of
            .get(&(u, v))
            .is_some_and(|&arc| self.present[arc / 2])
    }

    pub fn capacity(&self, u: NodeIndex, v: NodeIndex) -> Option<Capacity> {
        let arc = *self.arc_of.get(&(u, v))?;
        self.present[arc / 2].then(|| self.capacity[arc])
    }

    /// Compute a maximum flow from `source` to `sink`.
    pub fn max_flow(&self, source: NodeIndex, sink: NodeIndex, method: FlowMethod) -> FlowSolution {
        if source == sink || source >= self.node_count() || sink >= self.node_count() {
            return FlowSolution::default();
        }

        let mut residual = Residual {
            adjacency: &self.adjacency,
            heads: &self.heads,
            residual: self.capacity.clone(),
        };
        let value = method.solve(&mut residual, source, sink);

        let mut flows = FxHashMap::default();
        for (&(u, v), &arc) in &self.arc_of {
            let flow = self.capacity[arc] - residual.residual[arc];
            if flow > 0 {
                flows.insert((u, v), flow);
            }
        }
        FlowSolution { value, flows }
    }

    /// Flow value only.
    pub fn max_flow_value(&self, source: NodeIndex, sink: NodeIndex, method: FlowMethod) -> Capacity {
        self.max_flow(source, sink, method).value
    }
}

/// Result of a max-flow computation.
#[derive(Clone, Debug, Default)]
pub struct FlowSolution {
    pub value: Capacity,
    flows: FxHashMap<(NodeIndex, NodeIndex), Capacity>,
}

impl FlowSolution {
    /// Flow on edge `u -> v` (zero if the edge carries none).
    pub fn flow(&self, u: NodeIndex, v: NodeIndex) -> Capacity {
        self.flows.get(&(u, v)).copied().unwrap_or(0)
    }

    /// Edges carrying positive flow.
    pub fn iter(&self) -> impl Iterator<Item = ((NodeIndex, NodeIndex), Capacity)> + '_ {
        self.flows.iter().map(|(&edge, &flow)| (edge, flow))
    }
}

struct Residual<'a> {
    adjacency: &'a [Vec<usize>],
    heads: &'a [NodeIndex],
    residual: Vec<Capacity>,
}

impl Residual<'_> {
    #[inline]
    fn push(&mut self, arc: usize, amount: Capacity) {
        self.residual[arc] -= amount;
        self.residual[arc ^ 1] += amount;
    }
}

#[derive(Clone, Copy)]
enum SearchOrder {
    Breadth,
    Depth,
}

/// Repeatedly find an s-t path in the residual graph and saturate its bottleneck.
fn augmenting_paths(res: &mut Residual<'_>, source: NodeIndex, sink: NodeIndex, order: SearchOrder) -> Capacity {
    let n = res.adjacency.len();
    let mut total = 0;
    let mut parent_arc: Vec<Option<usize>> = vec![None; n];
    let mut visited = vec![false; n];
    let mut frontier: VecDeque<NodeIndex> = VecDeque::new();

    loop {
        parent_arc.iter_mut().for_each(|p| *p = None);
        visited.iter_mut().for_each(|v| *v = false);
        frontier.clear();
        frontier.push_back(source);
        visited[source] = true;

        while let Some(u) = match order {
            SearchOrder::Breadth => frontier.pop_front(),
            SearchOrder::Depth => frontier.pop_back(),
        } {
            if u == sink {
                break;
            }
            for &arc in &res.adjacency[u] {
                let v = res.heads[arc];
                if !visited[v] && res.residual[arc] > 0 {
                    visited[v] = true;
                    parent_arc[v] = Some(arc);
                    frontier.push_back(v);
                }
            }
        }

        if !visited[sink] {
            return total;
        }

        let mut bottleneck = Capacity::MAX;
        let mut node = sink;
        while let Some(arc) = parent_arc[node] {
            bottleneck = bottleneck.min(res.residual[arc]);
            node = res.heads[arc ^ 1];
        }

        let mut node = sink;
        while let Some(arc) = parent_arc[node] {
            res.push(arc, bottleneck);
            node = res.heads[arc ^ 1];
        }
        total += bottleneck;
    }
}

fn dinic(res: &mut Residual<'_>, source: NodeIndex, sink: NodeIndex) -> Capacity {
    let n = res.adjacency.len();
    let mut total = 0;
    let mut level = vec![usize::MAX; n];
    let mut next = vec![0usize; n];

    loop {
        level.iter_mut().for_each(|l| *l = usize::MAX);
        level[source] = 0;
        let mut queue = VecDeque::from([source]);
        while let Some(u) = queue.pop_front() {
            for &arc in &res.adjacency[u] {
                let v = res.heads[arc];
                if level[v] == usize::MAX && res.residual[arc] > 0 {
                    level[v] = level[u] + 1;
                    queue.push_back(v);
                }
            }
        }
        if level[sink] == usize::MAX {
            return total;
        }

        next.iter_mut().for_each(|i| *i = 0);
        loop {
            let pushed = blocking_flow(res, &level, &mut next, source, sink, Capacity::MAX);
            if pushed == 0 {
                break;
            }
            total += pushed;
        }
    }
}

fn blocking_flow(
    res: &mut Residual<'_>,
    level: &[usize],
    next: &mut [usize],
    u: NodeIndex,
    sink: NodeIndex,
    limit: Capacity,
) -> Capacity {
    if u == sink {
        return limit;
    }
    while next[u] < res.adjacency[u].len() {
        let arc = res.adjacency[u][next[u]];
        let v = res.heads[arc];
        if res.residual[arc] > 0 && level[v] == level[u] + 1 {
            let pushed = blocking_flow(res, level, next, v, sink, limit.min(res.residual[arc]));
            if pushed > 0 {
                res.push(arc, pushed);
                return pushed;
            }
        }
        next[u] += 1;
    }
    0
}

fn push_relabel(res: &mut Residual<'_>, source: NodeIndex, sink: NodeIndex) -> Capacity {
    let n = res.adjacency.len();
    let mut height = vec![0usize; n];
    let mut excess: Vec<Capacity> = vec![0; n];
    let mut current = vec![0usize; n];
    let mut active: VecDeque<NodeIndex> = VecDeque::new();

    height[source] = n;
    for &arc in &res.adjacency[source] {
        let amount = res.residual[arc];
        if amount > 0 {
            let v = res.heads[arc];
            res.push(arc, amount);
            if excess[v] == 0 && v != sink && v != source {
                active.push_back(v);
            }
            excess[v] += amount;
            excess[source] -= amount;
        }
    }

    while let Some(u) = active.pop_front() {
        while excess[u] > 0 {
            if current[u] == res.adjacency[u].len() {
                let lowest = res.adjacency[u]
                    .iter()
                    .filter(|&&arc| res.residual[arc] > 0)
                    .map(|&arc| height[res.heads[arc]])
                    .min();
                match lowest {
                    Some(h) => height[u] = h + 1,
                    None => break,
                }
                current[u] = 0;
                continue;
            }

            let arc = res.adjacency[u][current[u]];
            let v = res.heads[arc];
            if res.residual[arc] > 0 && height[u] == height[v] + 1 {
                let amount = excess[u].min(res.residual[arc]);
                res.push(arc, amount);
                if excess[v] == 0 && v != sink && v != source {
                    active.push_back(v);
                }
                excess[u] -= amount;
                excess[v] += amount;
            } else {
                current[u] += 1;
            }
        }
    }

    excess[sink]
}
