//! End-to-end compilation tests over small but complete graphs.

use std::collections::BTreeSet;

use serde_json::Value;

use oas_graph::{
    compile, Annotation, CompileError, Config, Edge, Entity, Field, FieldType,
    FilterOp, FilterOpSet, Graph, OperationKind,
};

fn sortable(name: &str, ty: FieldType) -> Field {
    Field {
        annotation: Annotation {
            sortable: true,
            ..Annotation::default()
        },
        ..Field::new(name, ty)
    }
}

/// A pet store graph exercising edges, enums, and filters.
fn pet_store() -> Graph {
    let mut pet = Entity::new("Pet");
    pet.fields.push(Field {
        annotation: Annotation {
            filter: FilterOpSet::of(&[FilterOp::Eq, FilterOp::Contains]),
            ..Annotation::default()
        },
        ..Field::new("name", FieldType::String)
    });
    pet.fields.push(sortable("age", FieldType::Int32));
    pet.edges.push(Edge {
        unique: true,
        annotation: Annotation {
            eager_load: Some(true),
            ..Annotation::default()
        },
        ..Edge::new("owner", "User")
    });
    pet.edges.push(Edge::new("friends", "Pet"));

    let mut user = Entity::new("User");
    user.fields.push(sortable("name", FieldType::String));
    user.fields.push(Field {
        enum_values: vec!["user".into(), "admin".into()],
        ..Field::new("role", FieldType::Enum)
    });

    Graph {
        entities: vec![pet, user],
    }
}

#[test]
fn full_crud_surface_for_each_entity() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();

    for path in ["/pets", "/pets/{id}", "/users", "/users/{id}"] {
        assert!(doc.paths.contains_key(path), "missing {path}");
    }
    let pets = &doc.paths["/pets"];
    assert!(pets.post.is_some());
    assert!(pets.get.is_some());
    let pet = &doc.paths["/pets/{id}"];
    assert!(pet.get.is_some());
    assert!(pet.patch.is_some());
    assert!(pet.delete.is_some());

    for schema in ["Pet", "PetCreate", "PetUpdate", "PetRead", "PetList", "PagedResponse"] {
        assert!(doc.components.schemas.contains_key(schema), "missing {schema}");
    }
}

#[test]
fn edge_sub_resources_exist() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    assert!(doc.paths.contains_key("/pets/{id}/owner"));
    assert!(doc.paths.contains_key("/pets/{id}/friends"));
    // the friends listing reuses the shared list schema
    let friends = doc.paths["/pets/{id}/friends"].get.as_ref().unwrap();
    assert_eq!(friends.operation_id.as_deref(), Some("listPetFriends"));
}

#[test]
fn eager_edge_expands_read_dependencies() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    assert!(doc.components.schemas.contains_key("PetEdges"));
    assert!(doc.components.schemas.contains_key("UserRead"));

    let read = doc.components.schemas["PetRead"].as_item().unwrap();
    assert_eq!(read.all_of.len(), 2);
}

#[test]
fn enum_hoisted_once_and_shared() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    assert!(doc.components.schemas.contains_key("UserRoleEnum"));

    let value = serde_json::to_value(&doc).unwrap();
    let json = serde_json::to_string(&value).unwrap();
    // every operation references the hoisted schema, none inlines it
    assert!(json.matches("#/components/schemas/UserRoleEnum").count() >= 2);
}

#[test]
fn filter_parameters_surface_on_list() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    for component in ["PetNameEQ", "PetNameContains", "PetIdEQ", "PetIdIn"] {
        assert!(
            doc.components.parameters.contains_key(component),
            "missing {component}"
        );
    }
    // capability beyond structural support was discarded silently, and the
    // list operation references every surviving component
    let list = doc.paths["/pets"].get.as_ref().unwrap();
    let refs: Vec<String> = serde_json::to_value(&list.parameters)
        .unwrap()
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|p| p.get("$ref").and_then(Value::as_str).map(String::from))
        .collect();
    assert!(refs.contains(&"#/components/parameters/PetNameEQ".to_string()));
    assert!(refs.contains(&"#/components/parameters/FilterOperation".to_string()));
}

#[test]
fn filter_group_type_mismatch_reported_before_empty_intersection() {
    let mut pet = Entity::new("Pet");
    // disjoint op sets AND mismatched types: the type error must win
    pet.fields.push(Field {
        annotation: Annotation {
            filter: FilterOpSet::of(&[FilterOp::Contains]),
            filter_group: Some("name".into()),
            ..Annotation::default()
        },
        ..Field::new("first", FieldType::String)
    });
    pet.fields.push(Field {
        annotation: Annotation {
            filter: FilterOpSet::of(&[FilterOp::Gt]),
            filter_group: Some("name".into()),
            ..Annotation::default()
        },
        ..Field::new("count", FieldType::Int32)
    });
    let graph = Graph {
        entities: vec![pet],
    };
    let err = compile(&graph, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::FilterGroupTypeMismatch { .. }));
}

#[test]
fn filter_group_errors_surface_without_a_list_operation() {
    let mut pet = Entity::new("Pet");
    pet.annotation.operations = Some(
        [OperationKind::Read].into_iter().collect::<BTreeSet<_>>(),
    );
    for (name, ty) in [("a", FieldType::String), ("b", FieldType::Int32)] {
        pet.fields.push(Field {
            annotation: Annotation {
                filter: FilterOpSet::equality(),
                filter_group: Some("mixed".into()),
                ..Annotation::default()
            },
            ..Field::new(name, ty)
        });
    }
    let graph = Graph {
        entities: vec![pet],
    };
    let err = compile(&graph, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::FilterGroupTypeMismatch { .. }));
}

#[test]
fn default_sort_is_checked_without_a_list_operation() {
    let mut pet = Entity::new("Pet");
    pet.annotation.operations = Some(
        [OperationKind::Read].into_iter().collect::<BTreeSet<_>>(),
    );
    pet.annotation.default_sort = Some("weight".into());
    let graph = Graph {
        entities: vec![pet],
    };
    let err = compile(&graph, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::DefaultSortNotSortable { .. }));
}

#[test]
fn sortable_vocabulary_spans_edges() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    let sort = doc.components.schemas["PetSortFields"].as_item().unwrap();
    let values: BTreeSet<&str> = sort
        .enum_values
        .iter()
        .filter_map(Value::as_str)
        .collect();

    for expected in ["id", "age", "random", "owner.id", "owner.name", "friends.count", "friends.age.sum"] {
        assert!(values.contains(expected), "missing {expected}");
    }
    // fields of a collection edge are not directly sortable
    assert!(!values.contains("friends.age"));
    // random never escapes the root
    assert!(!values.contains("owner.random"));
}

#[test]
fn error_responses_injected_per_method_semantics() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();

    let create = doc.paths["/pets"].post.as_ref().unwrap();
    assert!(create.responses.contains_key("409"));
    assert!(create.responses.contains_key("404"));

    let read = doc.paths["/pets/{id}"].get.as_ref().unwrap();
    assert!(read.responses.contains_key("404"));
    assert!(!read.responses.contains_key("409"));

    let list = doc.paths["/pets"].get.as_ref().unwrap();
    assert!(!list.responses.contains_key("404"));
}

#[test]
fn every_reference_resolves() {
    let doc = compile(&pet_store(), &Config::default()).unwrap();
    let value = serde_json::to_value(&doc).unwrap();

    let mut refs = Vec::new();
    collect_refs(&value, &mut refs);
    assert!(!refs.is_empty());

    for reference in refs {
        let mut node = &value;
        for segment in reference.trim_start_matches("#/").split('/') {
            node = node
                .get(segment)
                .unwrap_or_else(|| panic!("dangling reference {reference}"));
        }
    }
}

fn collect_refs(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map {
                if key == "$ref" {
                    if let Some(s) = inner.as_str() {
                        out.push(s.to_string());
                    }
                } else {
                    collect_refs(inner, out);
                }
            }
        }
        Value::Array(items) => {
            for inner in items {
                collect_refs(inner, out);
            }
        }
        _ => {}
    }
}

#[test]
fn pagination_wrapping_round_trip() {
    let mut graph = pet_store();
    let paginated = compile(&graph, &Config::default()).unwrap();
    let read_before =
        serde_json::to_value(&paginated.components.schemas["PetRead"]).unwrap();
    let users_before =
        serde_json::to_value(&paginated.components.schemas["UserList"]).unwrap();

    graph.entities[0].annotation.pagination = Some(false);
    let unpaginated = compile(&graph, &Config::default()).unwrap();
    let list = unpaginated.components.schemas["PetList"].as_item().unwrap();
    assert_eq!(list.schema_type.as_deref(), Some("array"));
    assert!(list.all_of.is_empty());
    // nothing else moved
    assert_eq!(
        serde_json::to_value(&unpaginated.components.schemas["PetRead"]).unwrap(),
        read_before
    );
    assert_eq!(
        serde_json::to_value(&unpaginated.components.schemas["UserList"]).unwrap(),
        users_before
    );

    graph.entities[0].annotation.pagination = Some(true);
    let restored = compile(&graph, &Config::default()).unwrap();
    assert_eq!(
        serde_json::to_value(&restored).unwrap(),
        serde_json::to_value(&paginated).unwrap()
    );
}

#[test]
fn compilation_is_byte_deterministic() {
    let first = serde_json::to_string(&compile(&pet_store(), &Config::default()).unwrap()).unwrap();
    let second = serde_json::to_string(&compile(&pet_store(), &Config::default()).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn operations_subset_respected_end_to_end() {
    let mut graph = pet_store();
    graph.entities[0].annotation.operations = Some(
        [OperationKind::Read].into_iter().collect::<BTreeSet<_>>(),
    );
    let doc = compile(&graph, &Config::default()).unwrap();
    assert!(!doc.paths.contains_key("/pets") || doc.paths["/pets"].post.is_none());
    assert!(doc.paths["/pets/{id}"].get.is_some());
    assert!(doc.paths["/pets/{id}"].patch.is_none());
    // no create operation, no create schema
    assert!(!doc.components.schemas.contains_key("PetCreate"));
}

#[test]
fn unsupported_nested_array_fails_compilation() {
    let mut pet = Entity::new("Pet");
    pet.fields.push(Field::new(
        "grid",
        FieldType::Array(Box::new(FieldType::Array(Box::new(FieldType::Int32)))),
    ));
    let graph = Graph {
        entities: vec![pet],
    };
    let err = compile(&graph, &Config::default()).unwrap_err();
    assert!(matches!(err, CompileError::UnsupportedType { .. }));
}

#[test]
fn sensitive_fields_are_write_only() {
    let mut pet = Entity::new("Pet");
    pet.fields.push(Field {
        sensitive: true,
        annotation: Annotation {
            filter: FilterOpSet::all(),
            sortable: true,
            ..Annotation::default()
        },
        ..Field::new("secret", FieldType::String)
    });
    let graph = Graph {
        entities: vec![pet],
    };
    let doc = compile(&graph, &Config::default()).unwrap();

    // writable on the way in
    let create = doc.components.schemas["PetCreate"].as_item().unwrap();
    assert!(create.properties.contains_key("secret"));

    // invisible on the way out
    let read = doc.components.schemas["Pet"].as_item().unwrap();
    assert!(!read.properties.contains_key("secret"));
    assert!(!doc.components.parameters.keys().any(|k| k.contains("Secret")));
    let sort = doc.components.schemas["PetSortFields"].as_item().unwrap();
    assert!(!sort.enum_values.iter().any(|v| v == "secret"));
}
