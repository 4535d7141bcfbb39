//! Graph construction, duality projection, and centrality.
//!
//! Consumes commit streams from `tributary-vcs`, folds them into named
//! typed graphs, projects the bipartite file ↔ author graph onto an
//! author ↔ author proximity graph, and ranks authors by degree,
//! closeness, or betweenness centrality.

pub mod builder;
pub mod centrality;
pub mod project;
pub mod store;

pub use builder::{build_graphs, resolve_author, BuildOutput, BuildReport, SkippedRepo};
pub use centrality::centrality;
pub use project::{project, Decay, ProjectedGraph};
pub use store::{Graph, GraphStore};
