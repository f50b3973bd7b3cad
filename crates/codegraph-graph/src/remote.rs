//! A graph store speaking a real graph-traversal protocol (Neo4j's Bolt protocol via
//! Cypher), interchangeable with [`crate::memory::InMemoryGraphStore`] behind the same
//! `GraphStore` port. Grounded on the `neo4rs`-based Cypher access pattern used for a
//! remote property graph elsewhere in this ecosystem.

use crate::algorithms::{betweenness_centrality, simple_cycles};
use async_trait::async_trait;
use codegraph_core::{
    CodeGraphError, EntityId, EntityType, GraphEdgeView, GraphNode, GraphStore, RelationType, Result,
};
use neo4rs::{query, Graph};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Connection parameters for the remote backend (§6 environment signals: graph backend
/// selector plus endpoint/port when `remote`).
#[derive(Debug, Clone)]
pub struct RemoteGraphConfig {
    pub uri: String,
    pub username: String,
    pub password: String,
}

/// `GraphStore` backed by a Neo4j instance reached over Bolt. Every node carries a
/// single `:Entity` label with `id`/`entity_type`/`name`/complexity properties; every
/// edge carries the relation type as its Cypher relationship type, with `weight` as a
/// property, so multiple edge types between the same pair of nodes coexist naturally.
pub struct RemoteGraphStore {
    graph: Graph,
}

impl RemoteGraphStore {
    pub async fn connect(config: &RemoteGraphConfig) -> Result<Self> {
        let graph = Graph::new(&config.uri, &config.username, &config.password)
            .await
            .map_err(|e| CodeGraphError::ExternalProviderError {
                provider: "neo4j".to_string(),
                cause: e.to_string(),
            })?;
        Ok(Self { graph })
    }

    async fn run(&self, q: neo4rs::Query) -> Result<()> {
        self.graph
            .run(q)
            .await
            .map_err(|e| CodeGraphError::ExternalProviderError {
                provider: "neo4j".to_string(),
                cause: e.to_string(),
            })
    }

    /// Pulls the whole edge set locally. Centrality and cycle enumeration are then
    /// computed client-side (§9 design note: an alternative would push the computation
    /// to the backend, but the interface does not yet model that).
    async fn pull_successors(&self) -> Result<HashMap<EntityId, Vec<EntityId>>> {
        let mut result = self
            .graph
            .execute(query("MATCH (a:Entity)-[r]->(b:Entity) RETURN a.id AS source, b.id AS target"))
            .await
            .map_err(external_err)?;

        let mut map: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        while let Some(row) = result.next().await.map_err(external_err)? {
            let source: String = row.get("source").map_err(external_err)?;
            let target: String = row.get("target").map_err(external_err)?;
            map.entry(EntityId::from(source)).or_default().push(EntityId::from(target));
        }
        Ok(map)
    }

    async fn all_ids(&self) -> Result<Vec<EntityId>> {
        let mut result = self
            .graph
            .execute(query("MATCH (n:Entity) RETURN n.id AS id"))
            .await
            .map_err(external_err)?;
        let mut ids = Vec::new();
        while let Some(row) = result.next().await.map_err(external_err)? {
            let id: String = row.get("id").map_err(external_err)?;
            ids.push(EntityId::from(id));
        }
        Ok(ids)
    }
}

fn external_err(e: impl std::fmt::Display) -> CodeGraphError {
    CodeGraphError::ExternalProviderError {
        provider: "neo4j".to_string(),
        cause: e.to_string(),
    }
}

fn entity_type_str(t: EntityType) -> &'static str {
    match t {
        EntityType::Function => "function",
        EntityType::Class => "class",
        EntityType::Import => "import",
        EntityType::Module => "module",
        EntityType::Variable => "variable",
    }
}

fn entity_type_from_str(s: &str) -> EntityType {
    match s {
        "function" => EntityType::Function,
        "class" => EntityType::Class,
        "import" => EntityType::Import,
        "module" => EntityType::Module,
        _ => EntityType::Variable,
    }
}

#[async_trait]
impl GraphStore for RemoteGraphStore {
    async fn add_node(&mut self, node: GraphNode) -> Result<()> {
        self.run(
            query(
                "MERGE (n:Entity {id: $id}) \
                 SET n.entity_type = $entity_type, n.name = $name, \
                     n.cyclomatic_complexity = $cyclomatic, n.cognitive_complexity = $cognitive",
            )
            .param("id", node.id.as_str())
            .param("entity_type", entity_type_str(node.entity_type))
            .param("name", node.name.as_str())
            .param("cyclomatic", node.cyclomatic_complexity.unwrap_or_default())
            .param("cognitive", node.cognitive_complexity.unwrap_or_default()),
        )
        .await
    }

    async fn has_node(&self, id: &EntityId) -> Result<bool> {
        Ok(self.node(id).await?.is_some())
    }

    async fn node(&self, id: &EntityId) -> Result<Option<GraphNode>> {
        let mut result = self
            .graph
            .execute(
                query("MATCH (n:Entity {id: $id}) RETURN n.entity_type AS entity_type, n.name AS name, n.cyclomatic_complexity AS cyclomatic, n.cognitive_complexity AS cognitive")
                    .param("id", id.as_str()),
            )
            .await
            .map_err(external_err)?;

        let Some(row) = result.next().await.map_err(external_err)? else {
            return Ok(None);
        };
        let entity_type: String = row.get("entity_type").map_err(external_err)?;
        let name: String = row.get("name").map_err(external_err)?;
        let cyclomatic: Option<f64> = row.get("cyclomatic").ok();
        let cognitive: Option<f64> = row.get("cognitive").ok();

        Ok(Some(GraphNode {
            id: id.clone(),
            entity_type: entity_type_from_str(&entity_type),
            name,
            cyclomatic_complexity: cyclomatic,
            cognitive_complexity: cognitive,
        }))
    }

    async fn all_node_ids(&self) -> Result<Vec<EntityId>> {
        self.all_ids().await
    }

    async fn add_edge(&mut self, edge: GraphEdgeView) -> Result<()> {
        let rel_type = edge.rel_type.to_string();
        let cypher = format!(
            "MATCH (a:Entity {{id: $source}}), (b:Entity {{id: $target}}) \
             MERGE (a)-[r:{rel_type} {{kind: $rel_type}}]->(b) SET r.weight = $weight"
        );
        self.run(
            query(&cypher)
                .param("source", edge.source.as_str())
                .param("target", edge.target.as_str())
                .param("rel_type", rel_type.as_str())
                .param("weight", edge.weight),
        )
        .await
    }

    async fn has_edge(&self, source: &EntityId, target: &EntityId, rel_type: RelationType) -> Result<bool> {
        let cypher = format!(
            "MATCH (a:Entity {{id: $source}})-[r:{}]->(b:Entity {{id: $target}}) RETURN count(r) AS c",
            rel_type
        );
        let mut result = self
            .graph
            .execute(
                query(&cypher)
                    .param("source", source.as_str())
                    .param("target", target.as_str()),
            )
            .await
            .map_err(external_err)?;
        let Some(row) = result.next().await.map_err(external_err)? else {
            return Ok(false);
        };
        let count: i64 = row.get("c").map_err(external_err)?;
        Ok(count > 0)
    }

    async fn edge_count(&self) -> Result<usize> {
        let mut result = self
            .graph
            .execute(query("MATCH (:Entity)-[r]->(:Entity) RETURN count(r) AS c"))
            .await
            .map_err(external_err)?;
        let Some(row) = result.next().await.map_err(external_err)? else {
            return Ok(0);
        };
        let count: i64 = row.get("c").map_err(external_err)?;
        Ok(count as usize)
    }

    async fn edges_to(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>> {
        self.query_edges("b.id = $id", id, rel_type).await
    }

    async fn edges_from(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>> {
        self.query_edges("a.id = $id", id, rel_type).await
    }

    async fn predecessors(&self, id: &EntityId) -> Result<Vec<EntityId>> {
        Ok(self
            .edges_to(id, None)
            .await?
            .into_iter()
            .map(|e| e.source)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect())
    }

    async fn successors(&self, id: &EntityId) -> Result<Vec<EntityId>> {
        Ok(self
            .edges_from(id, None)
            .await?
            .into_iter()
            .map(|e| e.target)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect())
    }

    async fn ancestors(&self, id: &EntityId) -> Result<HashSet<EntityId>> {
        if !self.has_node(id).await? {
            return Ok(HashSet::new());
        }
        let successors = self.pull_successors().await?;
        let mut predecessors: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        for (src, targets) in &successors {
            for t in targets {
                predecessors.entry(t.clone()).or_default().push(src.clone());
            }
        }
        Ok(crate::algorithms::transitive_closure(id, &predecessors))
    }

    async fn descendants(&self, id: &EntityId) -> Result<HashSet<EntityId>> {
        if !self.has_node(id).await? {
            return Ok(HashSet::new());
        }
        let successors = self.pull_successors().await?;
        Ok(crate::algorithms::transitive_closure(id, &successors))
    }

    async fn in_degree(&self, id: &EntityId) -> Result<usize> {
        Ok(self.edges_to(id, None).await?.len())
    }

    async fn out_degree(&self, id: &EntityId) -> Result<usize> {
        Ok(self.edges_from(id, None).await?.len())
    }

    async fn betweenness_centrality(&self) -> Result<HashMap<EntityId, f64>> {
        let nodes = self.all_ids().await?;
        let successors = self.pull_successors().await?;
        Ok(betweenness_centrality(&nodes, &successors))
    }

    async fn simple_cycles(&self) -> Result<Vec<Vec<EntityId>>> {
        let nodes = self.all_ids().await?;
        let successors = self.pull_successors().await?;
        Ok(simple_cycles(&nodes, &successors))
    }

    async fn density(&self) -> Result<f64> {
        let n = self.node_count().await? as f64;
        if n <= 1.0 {
            return Ok(0.0);
        }
        let e = self.edge_count().await? as f64;
        Ok(e / (n * (n - 1.0)))
    }

    async fn clear(&mut self) -> Result<()> {
        self.run(query("MATCH (n:Entity) DETACH DELETE n")).await
    }

    async fn node_count(&self) -> Result<usize> {
        let mut result = self
            .graph
            .execute(query("MATCH (n:Entity) RETURN count(n) AS c"))
            .await
            .map_err(external_err)?;
        let Some(row) = result.next().await.map_err(external_err)? else {
            return Ok(0);
        };
        let count: i64 = row.get("c").map_err(external_err)?;
        Ok(count as usize)
    }
}

impl RemoteGraphStore {
    async fn query_edges(
        &self,
        predicate: &str,
        id: &EntityId,
        rel_type: Option<RelationType>,
    ) -> Result<Vec<GraphEdgeView>> {
        let rel_pattern = match rel_type {
            Some(rt) => format!(":{rt}"),
            None => String::new(),
        };
        let cypher = format!(
            "MATCH (a:Entity)-[r{rel_pattern}]->(b:Entity) WHERE {predicate} RETURN a.id AS source, b.id AS target, type(r) AS rel_type, r.weight AS weight"
        );
        let mut result = self
            .graph
            .execute(query(&cypher).param("id", id.as_str()))
            .await
            .map_err(external_err)?;

        let mut edges = Vec::new();
        while let Some(row) = result.next().await.map_err(external_err)? {
            let source: String = row.get("source").map_err(external_err)?;
            let target: String = row.get("target").map_err(external_err)?;
            let rel_type_str: String = row.get("rel_type").map_err(external_err)?;
            let weight: f64 = row.get("weight").unwrap_or(1.0);
            let Ok(rel_type) = RelationType::from_str(&rel_type_str) else {
                continue;
            };
            edges.push(GraphEdgeView {
                source: EntityId::from(source),
                target: EntityId::from(target),
                rel_type,
                weight,
            });
        }
        Ok(edges)
    }
}
