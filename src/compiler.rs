//! The compilation driver.
//!
//! Validates the graph, resolves annotation defaults, compiles one fragment
//! per entity operation and edge sub-resource, folds the fragments together
//! in overlap mode, and runs the global finishing pass.

use crate::annotation::{Config, OperationKind};
use crate::document::{Document, Info};
use crate::error::CompileError;
use crate::global;
use crate::graph::Graph;
use crate::merge::{merge, MergeMode};
use crate::paths::{edge_fragment, entity_fragment};

/// Compile a graph into a complete OpenAPI document.
pub fn compile(graph: &Graph, config: &Config) -> Result<Document, CompileError> {
    graph.validate()?;
    let mut graph = graph.clone();
    graph.prepare(config);
    let graph = graph;

    let mut doc = Document::new();
    doc.info = Info {
        title: config.title.clone(),
        description: config.description.clone(),
        version: config.version.clone(),
    };
    doc.servers = config.servers.clone();
    doc.components.security_schemes = config.security_schemes.clone();

    for entity in &graph.entities {
        // through entities and skipped entities have no REST surface
        if entity.annotation.skip || entity.id.is_none() {
            continue;
        }
        let ops = entity.annotation.operations(config);
        for op in OperationKind::ALL {
            if !ops.contains(op) {
                continue;
            }
            let fragment = entity_fragment(&graph, config, entity, *op)?;
            merge(&mut doc, fragment, MergeMode::Overlap)?;
        }

        // edge sub-resources hang off the item path, which only exists
        // when the entity is readable
        if !ops.contains(&OperationKind::Read) {
            continue;
        }
        for edge in &entity.edges {
            if edge.annotation.skip {
                continue;
            }
            let Some(target) = graph.entity(&edge.target) else {
                continue;
            };
            if target.annotation.skip || target.id.is_none() {
                continue;
            }
            let needed = if edge.unique {
                OperationKind::Read
            } else {
                OperationKind::List
            };
            if !target.annotation.operations(config).contains(&needed) {
                continue;
            }
            let fragment = edge_fragment(&graph, config, entity, edge)?;
            merge(&mut doc, fragment, MergeMode::Overlap)?;
        }
    }

    doc.tags.sort_by(|a, b| a.name.cmp(&b.name));
    global::apply(&mut doc, config);
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Annotation;
    use crate::graph::{Edge, Entity};
    use std::collections::BTreeSet;

    #[test]
    fn document_header_comes_from_config() {
        let graph = Graph {
            entities: vec![Entity::new("Pet")],
        };
        let config = Config {
            title: "Pet Store".to_string(),
            version: "1.2.3".to_string(),
            ..Config::default()
        };
        let doc = compile(&graph, &config).unwrap();
        assert_eq!(doc.openapi, "3.0.3");
        assert_eq!(doc.info.title, "Pet Store");
        assert_eq!(doc.info.version, "1.2.3");
    }

    #[test]
    fn skipped_entities_are_invisible() {
        let mut pet = Entity::new("Pet");
        pet.annotation.skip = true;
        let graph = Graph {
            entities: vec![pet],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        assert!(doc.paths.is_empty());
        assert!(doc.components.schemas.is_empty());
    }

    #[test]
    fn through_entities_get_no_paths() {
        let mut user = Entity::new("User");
        user.edges.push(Edge::new("memberships", "Membership"));
        let mut membership = Entity::new("Membership");
        membership.id = None;
        let graph = Graph {
            entities: vec![user, membership],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        assert!(doc.paths.contains_key("/users"));
        assert!(!doc.paths.contains_key("/memberships"));
    }

    #[test]
    fn operation_subset_limits_methods() {
        let mut pet = Entity::new("Pet");
        pet.annotation.operations = Some(
            [OperationKind::Read, OperationKind::List]
                .into_iter()
                .collect::<BTreeSet<_>>(),
        );
        let graph = Graph {
            entities: vec![pet],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        assert!(doc.paths["/pets"].get.is_some());
        assert!(doc.paths["/pets"].post.is_none());
        assert!(doc.paths["/pets/{id}"].get.is_some());
        assert!(doc.paths["/pets/{id}"].delete.is_none());
    }

    #[test]
    fn edge_requires_target_operation() {
        let mut pet = Entity::new("Pet");
        pet.edges.push(Edge {
            unique: true,
            ..Edge::new("owner", "User")
        });
        let mut user = Entity::new("User");
        // User is not readable, so the sub-resource would dangle
        user.annotation.operations = Some(BTreeSet::new());
        let graph = Graph {
            entities: vec![pet, user],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        assert!(!doc.paths.contains_key("/pets/{id}/owner"));
    }

    #[test]
    fn edges_need_a_readable_owner() {
        let mut pet = Entity::new("Pet");
        pet.annotation.operations = Some(
            [OperationKind::List].into_iter().collect::<BTreeSet<_>>(),
        );
        pet.edges.push(Edge {
            unique: true,
            ..Edge::new("owner", "User")
        });
        let graph = Graph {
            entities: vec![pet, Entity::new("User")],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        assert!(!doc.paths.contains_key("/pets/{id}/owner"));
    }

    #[test]
    fn tags_are_sorted() {
        let graph = Graph {
            entities: vec![Entity::new("Zebra"), Entity::new("Ant")],
        };
        let doc = compile(&graph, &Config::default()).unwrap();
        let names: Vec<&str> = doc.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Ant", "Zebra"]);
    }

    #[test]
    fn compilation_is_deterministic() {
        let mut pet = Entity::new("Pet");
        pet.edges.push(Edge {
            unique: true,
            annotation: Annotation {
                eager_load: Some(true),
                ..Annotation::default()
            },
            ..Edge::new("owner", "User")
        });
        let graph = Graph {
            entities: vec![pet, Entity::new("User")],
        };
        let first =
            serde_json::to_string(&compile(&graph, &Config::default()).unwrap()).unwrap();
        let second =
            serde_json::to_string(&compile(&graph, &Config::default()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn validation_failures_surface() {
        let mut pet = Entity::new("Pet");
        pet.edges.push(Edge::new("owner", "Nowhere"));
        let graph = Graph {
            entities: vec![pet],
        };
        assert!(matches!(
            compile(&graph, &Config::default()),
            Err(CompileError::UnknownEntity { .. })
        ));
    }

    #[test]
    fn security_schemes_pass_through() {
        let mut config = Config::default();
        config.security_schemes.insert(
            "bearer".to_string(),
            serde_json::json!({ "type": "http", "scheme": "bearer" }),
        );
        let graph = Graph {
            entities: vec![Entity::new("Pet")],
        };
        let doc = compile(&graph, &config).unwrap();
        assert!(doc.components.security_schemes.contains_key("bearer"));
    }
}
