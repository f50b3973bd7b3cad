use crate::error::Result;
use crate::types::{EntityId, EntityType};
use crate::relationship::RelationType;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};

/// A node as the graph store sees it: just enough of the entity dictionary (§6) to
/// drive traversal and risk scoring, without the store needing to know about
/// `FunctionEntity`/`ClassEntity` shapes.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub name: String,
    pub cyclomatic_complexity: Option<f64>,
    pub cognitive_complexity: Option<f64>,
}

impl GraphNode {
    pub fn new(id: EntityId, entity_type: EntityType, name: impl Into<String>) -> Self {
        Self {
            id,
            entity_type,
            name: name.into(),
            cyclomatic_complexity: None,
            cognitive_complexity: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GraphEdgeView {
    pub source: EntityId,
    pub target: EntityId,
    pub rel_type: RelationType,
    pub weight: f64,
}

/// The code graph store port (§4.F, §6): a directed multi-relation graph behind one
/// interface. Two implementations must be interchangeable — in-process adjacency
/// (`codegraph-graph::InMemoryGraphStore`) and a remote store speaking a
/// graph-traversal protocol — so every operation is async even though the in-memory
/// implementation never actually suspends.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn add_node(&mut self, node: GraphNode) -> Result<()>;
    async fn has_node(&self, id: &EntityId) -> Result<bool>;
    async fn node(&self, id: &EntityId) -> Result<Option<GraphNode>>;
    async fn all_node_ids(&self) -> Result<Vec<EntityId>>;

    async fn add_edge(&mut self, edge: GraphEdgeView) -> Result<()>;
    async fn has_edge(&self, source: &EntityId, target: &EntityId, rel_type: RelationType) -> Result<bool>;
    async fn edge_count(&self) -> Result<usize>;

    /// Edges whose target is `id`, optionally restricted to one relation type.
    async fn edges_to(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>>;
    /// Edges whose source is `id`, optionally restricted to one relation type.
    async fn edges_from(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>>;

    async fn predecessors(&self, id: &EntityId) -> Result<Vec<EntityId>>;
    async fn successors(&self, id: &EntityId) -> Result<Vec<EntityId>>;

    /// Transitive predecessors of `id` across all edge types, de-duplicated via a
    /// visited set — the graph may be cyclic (§9), so this must not recurse naively.
    async fn ancestors(&self, id: &EntityId) -> Result<HashSet<EntityId>>;
    async fn descendants(&self, id: &EntityId) -> Result<HashSet<EntityId>>;

    async fn in_degree(&self, id: &EntityId) -> Result<usize>;
    async fn out_degree(&self, id: &EntityId) -> Result<usize>;

    async fn betweenness_centrality(&self) -> Result<HashMap<EntityId, f64>>;
    async fn simple_cycles(&self) -> Result<Vec<Vec<EntityId>>>;
    async fn density(&self) -> Result<f64>;
    async fn clear(&mut self) -> Result<()>;
    async fn node_count(&self) -> Result<usize>;
}

/// A single commit's effect on one file, as surfaced by the injected git provider (§6).
#[derive(Debug, Clone)]
pub struct CommitTouch {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub message: String,
    pub files_changed: Vec<String>,
    pub lines_added: u64,
    pub lines_deleted: u64,
}

/// One line of `git blame`, attributing a line number to the commit that last touched it.
#[derive(Debug, Clone)]
pub struct BlameLine {
    pub line_number: u32,
    pub commit_hash: String,
    pub author_email: String,
}

/// Additive/subtractive line counts for a single commit (whole-commit, not per-file).
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffStats {
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub files_changed: u64,
}

/// The git provider port (§4.I, §6). `codegraph-expertise::LocalGitProvider` is the
/// concrete adapter over `git2`; tests substitute an in-memory fake.
#[async_trait]
pub trait GitProvider: Send + Sync {
    async fn commits_touching_file(&self, file_path: &str, max_count: usize) -> Result<Vec<CommitTouch>>;
    async fn file_blame_by_line(&self, file_path: &str) -> Result<Vec<BlameLine>>;
    async fn commit_diff_stats(&self, commit_hash: &str) -> Result<DiffStats>;
    async fn all_tracked_files(&self) -> Result<Vec<String>>;
    async fn file_contents_at(&self, file_path: &str, commit_hash: Option<&str>) -> Result<String>;
    async fn all_contributors(&self, file_path: Option<&str>) -> Result<Vec<String>>;
}
