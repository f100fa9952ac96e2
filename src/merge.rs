//! Merging of independently generated document fragments.
//!
//! The compiler builds one fragment per operation and folds them into the
//! output document in overlap mode, where fragments are expected to share
//! paths and components. Strict mode treats any collision as an authoring
//! error and is the right mode for combining documents from unrelated
//! sources.

use crate::document::{
    Components, Document, Info, Operation, Parameter, PathItem, RefOr, Response,
    Server, Tag, METHODS,
};
use crate::error::MergeError;

/// Conflict policy for [`merge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Any duplicate path, component, or response status is an error.
    Strict,
    /// Duplicates are unioned; scalar conflicts resolve first-writer-wins.
    Overlap,
}

/// Merge `from` into `into`.
///
/// Identity keys are path strings, component names, tag names, server
/// URLs, parameter (name, location) pairs, and response status codes.
pub fn merge(
    into: &mut Document,
    from: Document,
    mode: MergeMode,
) -> Result<(), MergeError> {
    merge_info(&mut into.info, from.info);
    merge_tags(&mut into.tags, from.tags);
    merge_servers(&mut into.servers, from.servers);

    for (path, item) in from.paths {
        match into.paths.get_mut(&path) {
            None => {
                into.paths.insert(path, item);
            }
            Some(existing) => {
                if mode == MergeMode::Strict {
                    return Err(MergeError::DuplicatePath { path });
                }
                merge_path_item(existing, item, mode)?;
            }
        }
    }

    merge_components(&mut into.components, from.components, mode)
}

/// Merge one path item into another, method by method.
pub fn merge_path_item(
    into: &mut PathItem,
    from: PathItem,
    mode: MergeMode,
) -> Result<(), MergeError> {
    let mut from = from;
    for method in METHODS {
        let slot = from.slot_mut(method).and_then(Option::take);
        let Some(incoming) = slot else {
            continue;
        };
        let Some(target) = into.slot_mut(method) else {
            continue;
        };
        match target {
            None => *target = Some(incoming),
            Some(existing) => merge_operation(existing, incoming, mode)?,
        }
    }
    for parameter in from.parameters {
        if !contains_parameter(&into.parameters, &parameter) {
            into.parameters.push(parameter);
        }
    }
    Ok(())
}

/// Merge one operation into another.
///
/// Scalars resolve first-writer-wins, but an absent value always yields to
/// a present one; `deprecated` is sticky.
pub fn merge_operation(
    into: &mut Operation,
    from: Operation,
    mode: MergeMode,
) -> Result<(), MergeError> {
    for tag in from.tags {
        if !into.tags.contains(&tag) {
            into.tags.push(tag);
        }
    }
    merge_scalar(&mut into.summary, from.summary);
    merge_scalar(&mut into.description, from.description);
    merge_scalar(&mut into.operation_id, from.operation_id);
    into.deprecated |= from.deprecated;

    for parameter in from.parameters {
        if !contains_parameter(&into.parameters, &parameter) {
            into.parameters.push(parameter);
        }
    }
    if into.request_body.is_none() {
        into.request_body = from.request_body;
    }

    for (status, response) in from.responses {
        match into.responses.get_mut(&status) {
            None => {
                into.responses.insert(status, response);
            }
            Some(existing) => {
                if mode == MergeMode::Strict {
                    return Err(MergeError::DuplicateResponse { status });
                }
                merge_response(existing, response);
            }
        }
    }
    Ok(())
}

fn merge_components(
    into: &mut Components,
    from: Components,
    mode: MergeMode,
) -> Result<(), MergeError> {
    for (name, schema) in from.schemas {
        if into.schemas.contains_key(&name) {
            if mode == MergeMode::Strict {
                return Err(MergeError::DuplicateComponent {
                    kind: "schema",
                    name,
                });
            }
            continue;
        }
        into.schemas.insert(name, schema);
    }
    for (name, parameter) in from.parameters {
        if into.parameters.contains_key(&name) {
            if mode == MergeMode::Strict {
                return Err(MergeError::DuplicateComponent {
                    kind: "parameter",
                    name,
                });
            }
            continue;
        }
        into.parameters.insert(name, parameter);
    }
    for (name, response) in from.responses {
        match into.responses.get_mut(&name) {
            None => {
                into.responses.insert(name, response);
            }
            Some(existing) => {
                if mode == MergeMode::Strict {
                    return Err(MergeError::DuplicateComponent {
                        kind: "response",
                        name,
                    });
                }
                merge_response(existing, response);
            }
        }
    }
    for (name, body) in from.request_bodies {
        if into.request_bodies.contains_key(&name) {
            if mode == MergeMode::Strict {
                return Err(MergeError::DuplicateComponent {
                    kind: "request body",
                    name,
                });
            }
            continue;
        }
        into.request_bodies.insert(name, body);
    }
    for (name, header) in from.headers {
        if into.headers.contains_key(&name) {
            if mode == MergeMode::Strict {
                return Err(MergeError::DuplicateComponent {
                    kind: "header",
                    name,
                });
            }
            continue;
        }
        into.headers.insert(name, header);
    }
    for (name, scheme) in from.security_schemes {
        if into.security_schemes.contains_key(&name) {
            if mode == MergeMode::Strict {
                return Err(MergeError::DuplicateComponent {
                    kind: "security scheme",
                    name,
                });
            }
            continue;
        }
        into.security_schemes.insert(name, scheme);
    }
    Ok(())
}

fn merge_response(into: &mut RefOr<Response>, from: RefOr<Response>) {
    let (Some(existing), RefOr::Item(incoming)) = (into.as_item_mut(), from) else {
        // a reference already in place wins
        return;
    };
    if existing.description.is_empty() {
        existing.description = incoming.description;
    }
    for (name, header) in incoming.headers {
        existing.headers.entry(name).or_insert(header);
    }
    for (media, content) in incoming.content {
        existing.content.entry(media).or_insert(content);
    }
}

fn merge_info(into: &mut Info, from: Info) {
    if into.title.is_empty() {
        into.title = from.title;
    }
    if into.version.is_empty() {
        into.version = from.version;
    }
    merge_scalar(&mut into.description, from.description);
}

fn merge_tags(into: &mut Vec<Tag>, from: Vec<Tag>) {
    for tag in from {
        if !into.iter().any(|t| t.name == tag.name) {
            into.push(tag);
        }
    }
}

fn merge_servers(into: &mut Vec<Server>, from: Vec<Server>) {
    for server in from {
        if !into.iter().any(|s| s.url == server.url) {
            into.push(server);
        }
    }
}

fn merge_scalar(into: &mut Option<String>, from: Option<String>) {
    if into.is_none() {
        *into = from;
    }
}

fn contains_parameter(existing: &[RefOr<Parameter>], candidate: &RefOr<Parameter>) -> bool {
    existing.iter().any(|p| same_parameter(p, candidate))
}

fn same_parameter(a: &RefOr<Parameter>, b: &RefOr<Parameter>) -> bool {
    match (a, b) {
        (RefOr::Ref { reference: ra }, RefOr::Ref { reference: rb }) => ra == rb,
        (RefOr::Item(pa), RefOr::Item(pb)) => {
            pa.name == pb.name && pa.location == pb.location
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Schema;

    fn doc_with_path(path: &str, item: PathItem) -> Document {
        let mut doc = Document::new();
        doc.paths.insert(path.to_string(), item);
        doc
    }

    fn get_op(id: &str) -> Operation {
        Operation {
            operation_id: Some(id.to_string()),
            ..Operation::default()
        }
    }

    #[test]
    fn strict_rejects_duplicate_path() {
        let mut base = doc_with_path("/pets", PathItem::default());
        let other = doc_with_path("/pets", PathItem::default());
        let err = merge(&mut base, other, MergeMode::Strict).unwrap_err();
        assert!(matches!(err, MergeError::DuplicatePath { .. }));
    }

    #[test]
    fn strict_accepts_disjoint_paths() {
        let mut base = doc_with_path("/pets", PathItem::default());
        let other = doc_with_path("/users", PathItem::default());
        merge(&mut base, other, MergeMode::Strict).unwrap();
        assert_eq!(base.paths.len(), 2);
    }

    #[test]
    fn overlap_unions_methods_on_shared_path() {
        let mut base = doc_with_path(
            "/pets",
            PathItem {
                get: Some(get_op("listPets")),
                ..PathItem::default()
            },
        );
        let other = doc_with_path(
            "/pets",
            PathItem {
                post: Some(get_op("createPet")),
                ..PathItem::default()
            },
        );
        merge(&mut base, other, MergeMode::Overlap).unwrap();
        let item = &base.paths["/pets"];
        assert!(item.get.is_some());
        assert!(item.post.is_some());
    }

    #[test]
    fn strict_rejects_duplicate_component() {
        let mut base = Document::new();
        base.components
            .schemas
            .insert("Pet".into(), RefOr::Item(Schema::object()));
        let mut other = Document::new();
        other
            .components
            .schemas
            .insert("Pet".into(), RefOr::Item(Schema::object()));
        let err = merge(&mut base, other, MergeMode::Strict).unwrap_err();
        assert!(matches!(
            err,
            MergeError::DuplicateComponent { kind: "schema", .. }
        ));
    }

    #[test]
    fn overlap_keeps_first_component() {
        let mut base = Document::new();
        base.components
            .schemas
            .insert("Pet".into(), RefOr::Item(Schema::new("string")));
        let mut other = Document::new();
        other
            .components
            .schemas
            .insert("Pet".into(), RefOr::Item(Schema::new("integer")));
        merge(&mut base, other, MergeMode::Overlap).unwrap();
        let kept = base.components.schemas["Pet"].as_item().unwrap();
        assert_eq!(kept.schema_type.as_deref(), Some("string"));
    }

    #[test]
    fn operation_scalars_first_writer_wins_absent_yields() {
        let mut into = Operation {
            summary: Some("first".into()),
            ..Operation::default()
        };
        let from = Operation {
            summary: Some("second".into()),
            description: Some("filled in".into()),
            ..Operation::default()
        };
        merge_operation(&mut into, from, MergeMode::Overlap).unwrap();
        assert_eq!(into.summary.as_deref(), Some("first"));
        assert_eq!(into.description.as_deref(), Some("filled in"));
    }

    #[test]
    fn deprecated_is_sticky() {
        let mut into = Operation::default();
        let from = Operation {
            deprecated: true,
            ..Operation::default()
        };
        merge_operation(&mut into, from, MergeMode::Overlap).unwrap();
        assert!(into.deprecated);

        // and never un-set
        merge_operation(&mut into, Operation::default(), MergeMode::Overlap).unwrap();
        assert!(into.deprecated);
    }

    #[test]
    fn parameters_union_by_name_and_location() {
        let mut into = Operation {
            parameters: vec![RefOr::Item(Parameter::query(
                "page",
                RefOr::Item(Schema::new("integer")),
            ))],
            ..Operation::default()
        };
        let from = Operation {
            parameters: vec![
                RefOr::Item(Parameter::query("page", RefOr::Item(Schema::new("integer")))),
                RefOr::Item(Parameter::query("sort", RefOr::Item(Schema::new("string")))),
            ],
            ..Operation::default()
        };
        merge_operation(&mut into, from, MergeMode::Overlap).unwrap();
        assert_eq!(into.parameters.len(), 2);
    }

    #[test]
    fn strict_rejects_duplicate_response_status() {
        let mut into = Operation::default();
        into.responses
            .insert("200".into(), RefOr::Item(Response::empty("ok")));
        let mut from = Operation::default();
        from.responses
            .insert("200".into(), RefOr::Item(Response::empty("also ok")));
        let err = merge_operation(&mut into, from, MergeMode::Strict).unwrap_err();
        assert!(matches!(err, MergeError::DuplicateResponse { .. }));
    }

    #[test]
    fn overlap_merges_response_bodies() {
        let mut into = Operation::default();
        into.responses
            .insert("200".into(), RefOr::Item(Response::empty("")));
        let mut from = Operation::default();
        from.responses.insert(
            "200".into(),
            RefOr::Item(Response::json("ok", RefOr::schema_ref("Pet"))),
        );
        merge_operation(&mut into, from, MergeMode::Overlap).unwrap();
        let merged = into.responses["200"].as_item().unwrap();
        assert_eq!(merged.description, "ok");
        assert!(!merged.content.is_empty());
    }

    #[test]
    fn tags_and_servers_union_by_identity() {
        let mut base = Document::new();
        base.tags.push(Tag {
            name: "Pet".into(),
            description: None,
        });
        base.servers.push(Server {
            url: "https://api.example.com".into(),
            description: None,
        });

        let mut other = Document::new();
        other.tags.push(Tag {
            name: "Pet".into(),
            description: None,
        });
        other.tags.push(Tag {
            name: "User".into(),
            description: None,
        });
        other.servers.push(Server {
            url: "https://api.example.com".into(),
            description: None,
        });

        merge(&mut base, other, MergeMode::Overlap).unwrap();
        assert_eq!(base.tags.len(), 2);
        assert_eq!(base.servers.len(), 1);
    }

    #[test]
    fn merge_is_not_destructive_on_error() {
        // strict failure happens before the offending insert
        let mut base = doc_with_path("/pets", PathItem::default());
        base.components
            .schemas
            .insert("Pet".into(), RefOr::Item(Schema::new("string")));
        let other = doc_with_path("/pets", PathItem::default());
        assert!(merge(&mut base, other, MergeMode::Strict).is_err());
        assert_eq!(base.components.schemas.len(), 1);
    }
}
