//! Named graphs over typed string-keyed nodes.
//!
//! The store holds a set of named directed or undirected graphs. Nodes
//! are [`NodeId`] values interned on first use; edges carry an intensity
//! weight that grows on repeated insertion, plus the last commit time
//! seen on the edge, which the duality projector uses for temporal
//! decay. Edge direction is fixed per graph (every `file_author` edge
//! runs File → Author), so traversal never needs type checks.

use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use tributary_core::NodeId;

/// Intensity and recency of one edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeData {
    /// Accumulated intensity; starts at the first insertion's weight
    /// and grows on every repeat.
    pub weight: u64,
    /// Latest commit time seen on this edge, if any.
    pub last_touch: Option<i64>,
}

/// One named graph: string-keyed nodes, weighted idempotent edges.
///
/// # Examples
///
/// ```
/// use tributary_core::NodeId;
/// use tributary_graph::store::Graph;
///
/// let mut g = Graph::new(true);
/// let file = NodeId::File("a.c".into());
/// let alice = NodeId::Author("Alice".into());
/// g.connect(file.clone(), alice.clone());
/// g.connect(file.clone(), alice.clone());
/// assert_eq!(g.edge_count(), 1);
/// assert_eq!(g.weight_of(&file, &alice), Some(2));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Graph {
    directed: bool,
    inner: DiGraph<NodeId, EdgeData>,
    index: HashMap<NodeId, NodeIndex>,
}

impl Graph {
    /// An empty graph. `directed` is fixed for the graph's lifetime.
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            inner: DiGraph::new(),
            index: HashMap::new(),
        }
    }

    /// Whether edges have a direction.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    fn intern(&mut self, node: NodeId) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node) {
            return idx;
        }
        let idx = self.inner.add_node(node.clone());
        self.index.insert(node, idx);
        idx
    }

    /// Insert an edge with intensity 1 and no timestamp.
    ///
    /// Idempotent: inserting an existing edge increments its intensity
    /// instead of duplicating it.
    pub fn connect(&mut self, src: NodeId, dst: NodeId) {
        self.connect_weighted(src, dst, 1, None);
    }

    /// Insert an edge contributing `weight` units of intensity, stamped
    /// with the commit time that produced it.
    pub fn connect_weighted(
        &mut self,
        mut src: NodeId,
        mut dst: NodeId,
        weight: u64,
        timestamp: Option<i64>,
    ) {
        if !self.directed && src > dst {
            std::mem::swap(&mut src, &mut dst);
        }
        let s = self.intern(src);
        let d = self.intern(dst);
        match self.inner.find_edge(s, d) {
            Some(edge) => {
                let data = &mut self.inner[edge];
                data.weight += weight;
                data.last_touch = data.last_touch.max(timestamp);
            }
            None => {
                self.inner.add_edge(
                    s,
                    d,
                    EdgeData {
                        weight,
                        last_touch: timestamp,
                    },
                );
            }
        }
    }

    /// Lazy sequence of `(neighbor, weight)` pairs for `node`.
    ///
    /// A node with no edges, or a node the graph has never seen, yields
    /// an empty sequence; neither is an error. For directed graphs only
    /// out-neighbors are produced.
    pub fn neighbors<'a>(&'a self, node: &NodeId) -> impl Iterator<Item = (&'a NodeId, u64)> + 'a {
        self.edges_of(node).map(|(n, data)| (n, data.weight))
    }

    /// Like [`Graph::neighbors`] but exposing full edge data; the
    /// duality projector needs the last-touch timestamps.
    pub fn edges_of<'a>(
        &'a self,
        node: &NodeId,
    ) -> impl Iterator<Item = (&'a NodeId, &'a EdgeData)> + 'a {
        let idx = self.index.get(node).copied();
        let directed = self.directed;
        idx.into_iter().flat_map(move |i| {
            let outgoing = self
                .inner
                .edges_directed(i, Direction::Outgoing)
                .map(move |e| (&self.inner[e.target()], e.weight()));
            let incoming = self
                .inner
                .edges_directed(i, Direction::Incoming)
                .filter(move |_| !directed)
                .map(move |e| (&self.inner[e.source()], e.weight()));
            outgoing.chain(incoming)
        })
    }

    /// Out-degree for directed graphs, total incident edge count for
    /// undirected ones. Unknown nodes have degree 0.
    pub fn degree(&self, node: &NodeId) -> usize {
        self.edges_of(node).count()
    }

    /// Intensity of the edge between `a` and `b`, if one exists.
    pub fn weight_of(&self, a: &NodeId, b: &NodeId) -> Option<u64> {
        let (a, b) = if !self.directed && a > b { (b, a) } else { (a, b) };
        let s = *self.index.get(a)?;
        let d = *self.index.get(b)?;
        self.inner
            .find_edge(s, d)
            .map(|e| self.inner[e].weight)
    }

    /// Every node interned in this graph.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> {
        self.inner.node_weights()
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Fold every edge of `other` into this graph, summing intensities
    /// and keeping the newest timestamps. Both graphs must share the
    /// same directedness; the merged result is what per-repository
    /// partial graphs become after parallel mining.
    pub fn merge_from(&mut self, other: &Graph) {
        debug_assert_eq!(self.directed, other.directed);
        for edge in other.inner.edge_references() {
            let src = other.inner[edge.source()].clone();
            let dst = other.inner[edge.target()].clone();
            let data = edge.weight();
            self.connect_weighted(src, dst, data.weight, data.last_touch);
        }
        // Carry over isolated nodes too; an author with no edges is a
        // valid state the store must represent.
        for node in other.inner.node_weights() {
            if !self.index.contains_key(node) {
                self.intern(node.clone());
            }
        }
    }
}

/// A set of named graphs.
///
/// # Examples
///
/// ```
/// use tributary_core::NodeId;
/// use tributary_graph::store::GraphStore;
///
/// let mut store = GraphStore::new();
/// store.create("file_author", true);
/// store
///     .get_mut("file_author")
///     .unwrap()
///     .connect(NodeId::File("a.c".into()), NodeId::Author("Alice".into()));
/// assert_eq!(store.get("file_author").unwrap().edge_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    graphs: BTreeMap<String, Graph>,
}

impl GraphStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a named graph if it does not exist yet. Creating an
    /// existing graph is a no-op; directedness is fixed by the first
    /// creation.
    pub fn create(&mut self, name: &str, directed: bool) -> &mut Graph {
        self.graphs
            .entry(name.to_string())
            .or_insert_with(|| Graph::new(directed))
    }

    /// Look up a graph by name.
    pub fn get(&self, name: &str) -> Option<&Graph> {
        self.graphs.get(name)
    }

    /// Look up a graph by name, mutably.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.graphs.get_mut(name)
    }

    /// Graph names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graphs.keys().map(String::as_str)
    }

    /// Merge another store into this one, graph by graph. Graphs
    /// missing on either side are created or carried over whole.
    pub fn merge(&mut self, other: &GraphStore) {
        for (name, graph) in &other.graphs {
            self.graphs
                .entry(name.clone())
                .or_insert_with(|| Graph::new(graph.is_directed()))
                .merge_from(graph);
        }
    }
}
