//! Centrality measures over the projected author graph.
//!
//! Degree, closeness, and betweenness, all on the weighted undirected
//! author ↔ author graph. Path-based measures use edge cost `1/weight`:
//! the stronger two authors' affinity, the shorter the path between
//! them. When the constraint set names an author and a hop distance,
//! every measure runs on the induced ego subgraph instead of the whole
//! projection.

use std::collections::{BinaryHeap, HashMap, VecDeque};

use petgraph::visit::EdgeRef;
use tributary_core::{CentralityKind, Constraints, RankedAuthor};

use crate::project::ProjectedGraph;

const EPS: f64 = 1e-9;

/// Compute the requested centrality measure and rank the authors.
///
/// Returns `(author, score)` rows in descending score order, ties
/// broken by author key ascending so results are deterministic,
/// truncated to `constraints.num` when set. An empty projection, or an
/// ego constraint naming an unknown author, yields an empty result.
///
/// # Examples
///
/// ```
/// use tributary_core::{Constraints, NodeId};
/// use tributary_graph::centrality::centrality;
/// use tributary_graph::project::{project, Decay};
/// use tributary_graph::store::GraphStore;
///
/// let mut store = GraphStore::new();
/// let g = store.create("file_author", true);
/// g.connect(NodeId::File("a.c".into()), NodeId::Author("Alice".into()));
/// g.connect(NodeId::File("a.c".into()), NodeId::Author("Bob".into()));
///
/// let projected = project(&store, "file_author", &Decay::Constant, 256).unwrap();
/// let ranked = centrality(&projected, &Constraints::default());
/// assert_eq!(ranked.len(), 2);
/// assert_eq!(ranked[0].author, "Alice");
/// ```
pub fn centrality(graph: &ProjectedGraph, constraints: &Constraints) -> Vec<RankedAuthor> {
    let Some(compact) = Compact::build(graph, constraints) else {
        return Vec::new();
    };

    let scores = match constraints.kind {
        CentralityKind::Degree => compact.degree(),
        CentralityKind::Closeness => compact.closeness(),
        CentralityKind::Betweenness => compact.betweenness(),
    };

    let mut ranked: Vec<RankedAuthor> = compact
        .names
        .iter()
        .zip(scores)
        .map(|(name, score)| RankedAuthor {
            author: (*name).to_string(),
            score,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.author.cmp(&b.author))
    });
    if let Some(num) = constraints.num {
        ranked.truncate(num);
    }
    ranked
}

/// The (sub)graph centrality actually runs on: compact indices and an
/// adjacency list carrying both affinity weights and path costs.
struct Compact<'a> {
    names: Vec<&'a str>,
    adj: Vec<Vec<(usize, f64)>>,
}

impl<'a> Compact<'a> {
    /// Build the compact form, applying the ego restriction if the
    /// constraints carry both an author and a distance. Returns `None`
    /// when the ego author is not in the projection.
    fn build(graph: &'a ProjectedGraph, constraints: &Constraints) -> Option<Self> {
        let keep: Vec<petgraph::graph::NodeIndex> = match (&constraints.author, constraints.distance)
        {
            (Some(author), Some(distance)) => {
                let start = *graph.index.get(author.as_str())?;
                ego_nodes(graph, start, distance)
            }
            _ => graph.inner.node_indices().collect(),
        };

        let mut position = HashMap::with_capacity(keep.len());
        let mut names = Vec::with_capacity(keep.len());
        for (i, &idx) in keep.iter().enumerate() {
            position.insert(idx, i);
            names.push(graph.inner[idx].as_str());
        }

        let mut adj = vec![Vec::new(); keep.len()];
        for edge in graph.inner.edge_references() {
            let (Some(&a), Some(&b)) = (position.get(&edge.source()), position.get(&edge.target()))
            else {
                continue; // endpoint outside the induced subgraph
            };
            let w = *edge.weight();
            if w <= 0.0 {
                continue;
            }
            adj[a].push((b, w));
            adj[b].push((a, w));
        }

        Some(Self { names, adj })
    }

    /// Degree centrality: sum of incident edge weights.
    fn degree(&self) -> Vec<f64> {
        self.adj
            .iter()
            .map(|edges| edges.iter().map(|(_, w)| w).sum())
            .collect()
    }

    /// Closeness centrality: inverse mean shortest-path distance over
    /// reachable authors. Authors in a different component are excluded
    /// from both the distance sum and the reachable-count denominator;
    /// an isolated author scores 0.
    fn closeness(&self) -> Vec<f64> {
        (0..self.names.len())
            .map(|source| {
                let dist = self.dijkstra(source);
                let mut sum = 0.0;
                let mut reachable = 0usize;
                for (node, d) in dist.iter().enumerate() {
                    if node != source && d.is_finite() {
                        sum += d;
                        reachable += 1;
                    }
                }
                if reachable == 0 || sum <= 0.0 {
                    0.0
                } else {
                    reachable as f64 / sum
                }
            })
            .collect()
    }

    /// Betweenness centrality via Brandes single-source accumulation:
    /// for each author, the summed fraction of all-pairs shortest paths
    /// passing through them, with equal credit split among ties. The
    /// undirected double count is halved away, so the sole intermediary
    /// on a 3-node path scores exactly 1.
    fn betweenness(&self) -> Vec<f64> {
        let n = self.names.len();
        let mut score = vec![0.0; n];

        for source in 0..n {
            // Weighted Brandes: Dijkstra order, predecessor lists,
            // path counts, then dependency back-propagation.
            let mut dist = vec![f64::INFINITY; n];
            let mut sigma = vec![0.0; n];
            let mut preds: Vec<Vec<usize>> = vec![Vec::new(); n];
            let mut settled = vec![false; n];
            let mut order: Vec<usize> = Vec::with_capacity(n);
            let mut heap = BinaryHeap::new();

            dist[source] = 0.0;
            sigma[source] = 1.0;
            heap.push(HeapEntry {
                dist: 0.0,
                node: source,
            });

            while let Some(HeapEntry { node, .. }) = heap.pop() {
                if settled[node] {
                    continue;
                }
                settled[node] = true;
                order.push(node);

                for &(next, weight) in &self.adj[node] {
                    let candidate = dist[node] + 1.0 / weight;
                    if candidate < dist[next] - EPS {
                        dist[next] = candidate;
                        sigma[next] = sigma[node];
                        preds[next].clear();
                        preds[next].push(node);
                        heap.push(HeapEntry {
                            dist: candidate,
                            node: next,
                        });
                    } else if (candidate - dist[next]).abs() <= EPS && !settled[next] {
                        sigma[next] += sigma[node];
                        preds[next].push(node);
                    }
                }
            }

            let mut delta = vec![0.0; n];
            for &node in order.iter().rev() {
                for &pred in &preds[node] {
                    delta[pred] += sigma[pred] / sigma[node] * (1.0 + delta[node]);
                }
                if node != source {
                    score[node] += delta[node];
                }
            }
        }

        // Each unordered pair was counted from both endpoints.
        for s in &mut score {
            *s /= 2.0;
        }
        score
    }

    fn dijkstra(&self, source: usize) -> Vec<f64> {
        let n = self.names.len();
        let mut dist = vec![f64::INFINITY; n];
        let mut settled = vec![false; n];
        let mut heap = BinaryHeap::new();
        dist[source] = 0.0;
        heap.push(HeapEntry {
            dist: 0.0,
            node: source,
        });

        while let Some(HeapEntry { node, .. }) = heap.pop() {
            if settled[node] {
                continue;
            }
            settled[node] = true;
            for &(next, weight) in &self.adj[node] {
                let candidate = dist[node] + 1.0 / weight;
                if candidate < dist[next] {
                    dist[next] = candidate;
                    heap.push(HeapEntry {
                        dist: candidate,
                        node: next,
                    });
                }
            }
        }
        dist
    }
}

/// Nodes within `distance` hops of `start`, breadth-first; hop count
/// increments once per edge regardless of weight.
fn ego_nodes(
    graph: &ProjectedGraph,
    start: petgraph::graph::NodeIndex,
    distance: usize,
) -> Vec<petgraph::graph::NodeIndex> {
    let mut seen = HashMap::new();
    let mut queue = VecDeque::new();
    seen.insert(start, 0usize);
    queue.push_back(start);
    let mut nodes = vec![start];

    while let Some(node) = queue.pop_front() {
        let hops = seen[&node];
        if hops == distance {
            continue;
        }
        for neighbor in graph.inner.neighbors(node) {
            if !seen.contains_key(&neighbor) {
                seen.insert(neighbor, hops + 1);
                nodes.push(neighbor);
                queue.push_back(neighbor);
            }
        }
    }
    nodes
}

/// Min-heap entry ordered by distance; `BinaryHeap` is a max-heap, so
/// the ordering is reversed.
struct HeapEntry {
    dist: f64,
    node: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.dist == other.dist && self.node == other.node
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .dist
            .total_cmp(&self.dist)
            .then_with(|| other.node.cmp(&self.node))
    }
}
