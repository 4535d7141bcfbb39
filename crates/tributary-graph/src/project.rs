//! Bipartite-to-unipartite duality projection.
//!
//! Turns group-membership data (file → author edges) into a weighted
//! author ↔ author proximity graph, following the persons/groups
//! duality method: two authors grow closer for every group they share,
//! in proportion to how intensely each of them touched it and how close
//! in time they did so.

use std::collections::HashMap;

use petgraph::graph::{NodeIndex, UnGraph};
use tributary_core::{ProjectionConfig, Result, TributaryError};

use crate::store::GraphStore;

const DAY_SECS: f64 = 86_400.0;

/// Temporal-decay strategy applied to each pair contribution.
///
/// The decay takes the absolute distance in seconds between the two
/// authors' last touches of the shared group and returns a factor in
/// `(0, 1]`. [`Decay::Constant`] ignores time entirely and degenerates
/// to the classical persons/groups transform; it is the default, and
/// the factor every strategy returns when timestamps are absent
/// (distance 0).
///
/// # Examples
///
/// ```
/// use tributary_graph::project::Decay;
///
/// let exp = Decay::Exponential { half_life_secs: 100.0 };
/// assert_eq!(exp.factor(0), 1.0);
/// assert!((exp.factor(100) - 0.5).abs() < 1e-12);
/// assert_eq!(Decay::Constant.factor(1_000_000), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decay {
    /// No decay; every shared group counts fully.
    Constant,
    /// Halves every `half_life_secs`.
    Exponential {
        /// Time for a contribution to lose half its value.
        half_life_secs: f64,
    },
    /// `1 / (1 + dt / scale_secs)`.
    InverseLinear {
        /// Time distance at which a contribution halves once.
        scale_secs: f64,
    },
}

impl Decay {
    /// Decay factor for a time distance of `dt_secs` seconds.
    pub fn factor(&self, dt_secs: i64) -> f64 {
        let dt = dt_secs.unsigned_abs() as f64;
        match self {
            Decay::Constant => 1.0,
            Decay::Exponential { half_life_secs } => 0.5_f64.powf(dt / half_life_secs),
            Decay::InverseLinear { scale_secs } => 1.0 / (1.0 + dt / scale_secs),
        }
    }

    /// Build a strategy from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TributaryError::Config`] for an unknown strategy name
    /// or a non-positive half-life.
    pub fn from_config(config: &ProjectionConfig) -> Result<Self> {
        let scale = config.half_life_days * DAY_SECS;
        if scale <= 0.0 {
            return Err(TributaryError::Config(format!(
                "half_life_days must be positive, got {}",
                config.half_life_days
            )));
        }
        match config.decay.as_str() {
            "constant" => Ok(Decay::Constant),
            "exponential" => Ok(Decay::Exponential {
                half_life_secs: scale,
            }),
            "inverse" => Ok(Decay::InverseLinear { scale_secs: scale }),
            other => Err(TributaryError::Config(format!(
                "unknown decay strategy: {other}"
            ))),
        }
    }
}

impl Default for Decay {
    fn default() -> Self {
        Decay::Constant
    }
}

/// The derived author ↔ author proximity graph.
///
/// Never mutated directly; always recomputed from a bipartite source
/// graph by [`project`]. A projection with zero edges is a valid result
/// (centrality over it is simply empty), not an error.
#[derive(Debug, Clone, Default)]
pub struct ProjectedGraph {
    pub(crate) inner: UnGraph<String, f64>,
    pub(crate) index: HashMap<String, NodeIndex>,
}

impl ProjectedGraph {
    pub(crate) fn intern(&mut self, author: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(author) {
            return idx;
        }
        let idx = self.inner.add_node(author.to_string());
        self.index.insert(author.to_string(), idx);
        idx
    }

    pub(crate) fn add_weight(&mut self, a: &str, b: &str, w: f64) {
        let ai = self.intern(a);
        let bi = self.intern(b);
        match self.inner.find_edge(ai, bi) {
            Some(edge) => self.inner[edge] += w,
            None => {
                self.inner.add_edge(ai, bi, w);
            }
        }
    }

    /// Proximity weight between two authors, if they share any group.
    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        let ai = *self.index.get(a)?;
        let bi = *self.index.get(b)?;
        self.inner.find_edge(ai, bi).map(|e| self.inner[e])
    }

    /// Author keys, in insertion order.
    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.inner.node_weights().map(String::as_str)
    }

    /// Number of authors.
    pub fn node_count(&self) -> usize {
        self.inner.node_count()
    }

    /// Number of author-pair edges.
    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Whether the projection came out empty.
    pub fn is_empty(&self) -> bool {
        self.inner.edge_count() == 0
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> f64 {
        self.inner.edge_references().map(|e| *e.weight()).sum()
    }
}

/// Project a bipartite membership graph onto its person side.
///
/// For every group node `g` with incident persons `a_1 … a_k`, every
/// unordered pair `{a_i, a_j}` receives a contribution of
/// `w(g, a_i) * w(g, a_j) * decay(|t_i - t_j|)`, summed across groups.
/// Self-pairs are skipped. Per-group cost is quadratic in the group's
/// fan-in, so fan-in is capped at `max_group_fanin` (keeping the
/// largest-weight contributors): one generated file with thousands of
/// nominal authors must not dominate the whole projection.
///
/// # Errors
///
/// Returns [`TributaryError::Config`] if `graph_name` does not exist in
/// the store.
///
/// # Examples
///
/// ```
/// use tributary_core::NodeId;
/// use tributary_graph::project::{project, Decay};
/// use tributary_graph::store::GraphStore;
///
/// let mut store = GraphStore::new();
/// let g = store.create("file_author", true);
/// g.connect(NodeId::File("a.c".into()), NodeId::Author("Alice".into()));
/// g.connect(NodeId::File("a.c".into()), NodeId::Author("Bob".into()));
///
/// let projected = project(&store, "file_author", &Decay::Constant, 256).unwrap();
/// assert_eq!(projected.weight("Alice", "Bob"), Some(1.0));
/// ```
pub fn project(
    store: &GraphStore,
    graph_name: &str,
    decay: &Decay,
    max_group_fanin: usize,
) -> Result<ProjectedGraph> {
    let source = store.get(graph_name).ok_or_else(|| {
        TributaryError::Config(format!("no such graph to project: {graph_name}"))
    })?;

    let mut projected = ProjectedGraph::default();

    for group in source.nodes() {
        let mut members: Vec<(&str, u64, Option<i64>)> = source
            .edges_of(group)
            .map(|(person, data)| (person.key(), data.weight, data.last_touch))
            .collect();
        if members.len() < 2 {
            continue;
        }
        if members.len() > max_group_fanin {
            members.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
            members.truncate(max_group_fanin);
        }

        for i in 0..members.len() {
            for j in (i + 1)..members.len() {
                let (a, wa, ta) = members[i];
                let (b, wb, tb) = members[j];
                if a == b {
                    continue;
                }
                let dt = match (ta, tb) {
                    (Some(ta), Some(tb)) => ta - tb,
                    _ => 0,
                };
                let contribution = (wa * wb) as f64 * decay.factor(dt);
                projected.add_weight(a, b, contribution);
            }
        }
    }

    Ok(projected)
}
