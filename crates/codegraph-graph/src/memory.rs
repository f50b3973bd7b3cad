use crate::algorithms::{betweenness_centrality, simple_cycles, transitive_closure};
use async_trait::async_trait;
use codegraph_core::{EntityId, EntityType, GraphEdgeView, GraphNode, GraphStore, RelationType, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// The in-process adjacency-based implementation of the code graph store (§4.F). Backed
/// by `petgraph`'s `DiGraph`; every operation is still `async` to stay interchangeable
/// with the remote backend, even though nothing here ever actually suspends.
#[derive(Default)]
pub struct InMemoryGraphStore {
    graph: DiGraph<GraphNode, GraphEdgeView>,
    index: HashMap<EntityId, NodeIndex>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_create(&mut self, id: &EntityId) -> NodeIndex {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        // An edge endpoint that was never registered via `add_node` (an unresolved call
        // target, a raw type name, ...) still needs a graph slot (§3 invariant i).
        let idx = self
            .graph
            .add_node(GraphNode::new(id.clone(), EntityType::Variable, id.as_str()));
        self.index.insert(id.clone(), idx);
        idx
    }

    fn successors_map(&self) -> HashMap<EntityId, Vec<EntityId>> {
        let mut map: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        for edge in self.graph.edge_references() {
            let source = self.graph[edge.source()].id.clone();
            let target = self.graph[edge.target()].id.clone();
            map.entry(source).or_default().push(target);
        }
        map
    }

    fn predecessors_map(&self) -> HashMap<EntityId, Vec<EntityId>> {
        let mut map: HashMap<EntityId, Vec<EntityId>> = HashMap::new();
        for edge in self.graph.edge_references() {
            let source = self.graph[edge.source()].id.clone();
            let target = self.graph[edge.target()].id.clone();
            map.entry(target).or_default().push(source);
        }
        map
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn add_node(&mut self, node: GraphNode) -> Result<()> {
        if let Some(&idx) = self.index.get(&node.id) {
            self.graph[idx] = node;
        } else {
            let id = node.id.clone();
            let idx = self.graph.add_node(node);
            self.index.insert(id, idx);
        }
        Ok(())
    }

    async fn has_node(&self, id: &EntityId) -> Result<bool> {
        Ok(self.index.contains_key(id))
    }

    async fn node(&self, id: &EntityId) -> Result<Option<GraphNode>> {
        Ok(self.index.get(id).map(|&idx| self.graph[idx].clone()))
    }

    async fn all_node_ids(&self) -> Result<Vec<EntityId>> {
        Ok(self.index.keys().cloned().collect())
    }

    async fn add_edge(&mut self, edge: GraphEdgeView) -> Result<()> {
        if self.has_edge(&edge.source, &edge.target, edge.rel_type).await? {
            return Ok(());
        }
        let source_idx = self.get_or_create(&edge.source);
        let target_idx = self.get_or_create(&edge.target);
        self.graph.add_edge(source_idx, target_idx, edge);
        Ok(())
    }

    async fn has_edge(&self, source: &EntityId, target: &EntityId, rel_type: RelationType) -> Result<bool> {
        let (Some(&s), Some(&t)) = (self.index.get(source), self.index.get(target)) else {
            return Ok(false);
        };
        Ok(self
            .graph
            .edges_connecting(s, t)
            .any(|e| e.weight().rel_type == rel_type))
    }

    async fn edge_count(&self) -> Result<usize> {
        Ok(self.graph.edge_count())
    }

    async fn edges_to(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| e.weight().clone())
            .filter(|e| rel_type.map_or(true, |rt| e.rel_type == rt))
            .collect())
    }

    async fn edges_from(&self, id: &EntityId, rel_type: Option<RelationType>) -> Result<Vec<GraphEdgeView>> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(Vec::new());
        };
        Ok(self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.weight().clone())
            .filter(|e| rel_type.map_or(true, |rt| e.rel_type == rt))
            .collect())
    }

    async fn predecessors(&self, id: &EntityId) -> Result<Vec<EntityId>> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        Ok(self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .filter(|n| seen.insert(*n))
            .map(|n| self.graph[n].id.clone())
            .collect())
    }

    async fn successors(&self, id: &EntityId) -> Result<Vec<EntityId>> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(Vec::new());
        };
        let mut seen = HashSet::new();
        Ok(self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter(|n| seen.insert(*n))
            .map(|n| self.graph[n].id.clone())
            .collect())
    }

    async fn ancestors(&self, id: &EntityId) -> Result<HashSet<EntityId>> {
        if !self.index.contains_key(id) {
            return Ok(HashSet::new());
        }
        Ok(transitive_closure(id, &self.predecessors_map()))
    }

    async fn descendants(&self, id: &EntityId) -> Result<HashSet<EntityId>> {
        if !self.index.contains_key(id) {
            return Ok(HashSet::new());
        }
        Ok(transitive_closure(id, &self.successors_map()))
    }

    async fn in_degree(&self, id: &EntityId) -> Result<usize> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(0);
        };
        Ok(self.graph.edges_directed(idx, Direction::Incoming).count())
    }

    async fn out_degree(&self, id: &EntityId) -> Result<usize> {
        let Some(&idx) = self.index.get(id) else {
            return Ok(0);
        };
        Ok(self.graph.edges_directed(idx, Direction::Outgoing).count())
    }

    async fn betweenness_centrality(&self) -> Result<HashMap<EntityId, f64>> {
        let nodes: Vec<EntityId> = self.index.keys().cloned().collect();
        Ok(betweenness_centrality(&nodes, &self.successors_map()))
    }

    async fn simple_cycles(&self) -> Result<Vec<Vec<EntityId>>> {
        let nodes: Vec<EntityId> = self.index.keys().cloned().collect();
        Ok(simple_cycles(&nodes, &self.successors_map()))
    }

    async fn density(&self) -> Result<f64> {
        let n = self.graph.node_count() as f64;
        if n <= 1.0 {
            return Ok(0.0);
        }
        Ok(self.graph.edge_count() as f64 / (n * (n - 1.0)))
    }

    async fn clear(&mut self) -> Result<()> {
        self.graph.clear();
        self.index.clear();
        Ok(())
    }

    async fn node_count(&self) -> Result<usize> {
        Ok(self.graph.node_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::EntityType;

    fn node(id: &str) -> GraphNode {
        GraphNode::new(EntityId::from(id), EntityType::Function, id)
    }

    #[tokio::test]
    async fn ancestors_terminate_on_a_cycle() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a")).await.unwrap();
        store.add_node(node("b")).await.unwrap();
        store
            .add_edge(GraphEdgeView {
                source: EntityId::from("a"),
                target: EntityId::from("b"),
                rel_type: RelationType::Calls,
                weight: 1.0,
            })
            .await
            .unwrap();
        store
            .add_edge(GraphEdgeView {
                source: EntityId::from("b"),
                target: EntityId::from("a"),
                rel_type: RelationType::Calls,
                weight: 1.0,
            })
            .await
            .unwrap();

        let ancestors = store.ancestors(&EntityId::from("a")).await.unwrap();
        assert_eq!(ancestors, HashSet::from([EntityId::from("b")]));
    }

    #[tokio::test]
    async fn duplicate_edges_of_the_same_type_are_not_added_twice() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a")).await.unwrap();
        store.add_node(node("b")).await.unwrap();
        for _ in 0..3 {
            store
                .add_edge(GraphEdgeView {
                    source: EntityId::from("a"),
                    target: EntityId::from("b"),
                    rel_type: RelationType::Calls,
                    weight: 1.0,
                })
                .await
                .unwrap();
        }
        assert_eq!(store.edge_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unresolved_edge_target_gets_a_placeholder_node() {
        let mut store = InMemoryGraphStore::new();
        store.add_node(node("a")).await.unwrap();
        store
            .add_edge(GraphEdgeView {
                source: EntityId::from("a"),
                target: EntityId::from("mystery_call"),
                rel_type: RelationType::Calls,
                weight: 0.5,
            })
            .await
            .unwrap();
        assert!(store.has_node(&EntityId::from("mystery_call")).await.unwrap());
    }

    #[tokio::test]
    async fn empty_store_has_zero_density_and_node_count() {
        let store = InMemoryGraphStore::new();
        assert_eq!(store.node_count().await.unwrap(), 0);
        assert_eq!(store.density().await.unwrap(), 0.0);
    }
}
