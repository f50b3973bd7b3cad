pub mod algorithms;
pub mod memory;
pub mod remote;

pub use memory::InMemoryGraphStore;
pub use remote::{RemoteGraphConfig, RemoteGraphStore};

use codegraph_core::{EntityType, GraphEdgeView, GraphNode, GraphStore, ParsedFile, Relationship, Result};

/// Builds and populates a store from a repository snapshot (§2 data flow:
/// `Relationship[] -> CodeGraphStore`), registering every parsed entity as a node first
/// so that `add_edge`'s placeholder-node fallback only ever fires for genuinely
/// unresolved targets.
pub async fn build_graph(
    store: &mut dyn GraphStore,
    parsed_files: &[ParsedFile],
    relationships: &[Relationship],
) -> Result<()> {
    for pf in parsed_files {
        if let Some(module) = &pf.module {
            store
                .add_node(GraphNode::new(module.unique_id(), EntityType::Module, &pf.file_path))
                .await?;
        }
        for func in &pf.functions {
            let mut node = GraphNode::new(func.unique_id(), EntityType::Function, &func.name);
            node.cyclomatic_complexity = Some(func.cyclomatic_complexity as f64);
            node.cognitive_complexity = Some(func.cognitive_complexity as f64);
            store.add_node(node).await?;
        }
        for cls in &pf.classes {
            store
                .add_node(GraphNode::new(cls.unique_id(), EntityType::Class, &cls.name))
                .await?;
        }
    }

    for rel in relationships {
        store
            .add_edge(GraphEdgeView {
                source: rel.source.clone(),
                target: rel.target.clone(),
                rel_type: rel.rel_type,
                weight: rel.weight,
            })
            .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegraph_core::{FunctionEntity, Language, RelationType};

    #[tokio::test]
    async fn build_graph_registers_typed_nodes_before_edges() {
        let func = FunctionEntity {
            name: "helper".to_string(),
            file_path: "a.py".to_string(),
            cyclomatic_complexity: 1,
            lines_of_code: 1,
            ..Default::default()
        };
        let pf = ParsedFile {
            file_path: "a.py".to_string(),
            language: Language::Python,
            module: None,
            functions: vec![func.clone()],
            classes: vec![],
            imports: vec![],
            variables: vec![],
            parse_success: true,
            parse_errors: vec![],
        };
        let rel = Relationship::new(func.unique_id(), func.unique_id(), RelationType::Calls);

        let mut store = InMemoryGraphStore::new();
        build_graph(&mut store, &[pf], &[rel]).await.unwrap();

        let node = store.node(&func.unique_id()).await.unwrap().unwrap();
        assert_eq!(node.entity_type, EntityType::Function);
        assert_eq!(store.edge_count().await.unwrap(), 1);
    }
}
