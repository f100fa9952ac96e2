//! Path and operation fragment generation.
//!
//! Each CRUD operation (and each edge sub-resource) compiles to its own
//! single-operation document fragment, carrying exactly the components it
//! references. The compiler folds fragments together in overlap mode, so
//! shared components like the page parameter may be emitted many times.

use serde_json::{json, Number, Value};

use crate::annotation::{Annotation, Config, OperationKind};
use crate::casing::{kebab, pascal, plural};
use crate::document::{
    Components, Document, Operation, Parameter, RefOr, RequestBody, Response,
    Schema, Tag,
};
use crate::error::CompileError;
use crate::filter::filter_parameters;
use crate::graph::{Edge, Entity, Field, Graph};
use crate::schema::{
    create_schema, ensure_read_schemas, list_schema, read_name, resolve_target,
    update_schema, value_schema, wrap_list,
};
use crate::sort::sortable_fields;

/// Shared component name of the page-number parameter.
pub const PAGE_PARAM: &str = "Page";

/// Shared component name of the filter-combination parameter.
pub const FILTER_OP_PARAM: &str = "FilterOperation";

/// `/pets` for an entity named `Pet`.
pub fn collection_path(entity: &Entity) -> String {
    format!("/{}", plural(&kebab(&entity.name)))
}

/// `/pets/{id}` for an entity named `Pet`.
pub fn item_path(entity: &Entity) -> String {
    format!("{}/{{id}}", collection_path(entity))
}

/// Compile one CRUD operation of one entity into a standalone fragment.
pub fn entity_fragment(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    op: OperationKind,
) -> Result<Document, CompileError> {
    let mut doc = Document::new();
    doc.tags.push(entity_tag(entity));
    // entities without an identity have no REST surface
    let Some(id_field) = &entity.id else {
        return Ok(doc);
    };

    let name = pascal(&entity.name);
    match op {
        OperationKind::Create => {
            let body = create_schema(graph, config, entity, &mut doc.components.schemas)?;
            let mut operation = base_operation(
                entity,
                op,
                format!("Create a new {name}"),
                format!("create{name}"),
            );
            operation.request_body =
                Some(RequestBody::json(RefOr::schema_ref(&body), true));
            operation.responses.insert(
                "201".to_string(),
                RefOr::Item(Response::json(
                    &format!("{name} created"),
                    RefOr::schema_ref(&read_name(entity)),
                )),
            );
            doc.paths
                .entry(collection_path(entity))
                .or_default()
                .post = Some(operation);
        }
        OperationKind::Read => {
            ensure_read_schemas(graph, config, entity, &mut doc.components.schemas)?;
            let mut operation = base_operation(
                entity,
                op,
                format!("Find a {name} by ID"),
                format!("read{name}"),
            );
            operation
                .parameters
                .push(id_parameter(entity, id_field, &mut doc.components)?);
            operation.responses.insert(
                "200".to_string(),
                RefOr::Item(Response::json(
                    &format!("The requested {name}"),
                    RefOr::schema_ref(&read_name(entity)),
                )),
            );
            doc.paths.entry(item_path(entity)).or_default().get = Some(operation);
        }
        OperationKind::Update => {
            let body = update_schema(graph, config, entity, &mut doc.components.schemas)?;
            let mut operation = base_operation(
                entity,
                op,
                format!("Update an existing {name}"),
                format!("update{name}"),
            );
            operation
                .parameters
                .push(id_parameter(entity, id_field, &mut doc.components)?);
            operation.request_body =
                Some(RequestBody::json(RefOr::schema_ref(&body), true));
            operation.responses.insert(
                "200".to_string(),
                RefOr::Item(Response::json(
                    &format!("The updated {name}"),
                    RefOr::schema_ref(&read_name(entity)),
                )),
            );
            doc.paths.entry(item_path(entity)).or_default().patch = Some(operation);
        }
        OperationKind::Delete => {
            let mut operation = base_operation(
                entity,
                op,
                format!("Delete a {name} by ID"),
                format!("delete{name}"),
            );
            operation
                .parameters
                .push(id_parameter(entity, id_field, &mut doc.components)?);
            operation.responses.insert(
                "204".to_string(),
                RefOr::Item(Response::empty("Deletion successful")),
            );
            doc.paths.entry(item_path(entity)).or_default().delete = Some(operation);
        }
        OperationKind::List => {
            let schema = list_schema(graph, config, entity, &mut doc.components.schemas)?;
            let mut operation = base_operation(
                entity,
                op,
                format!("List {}", plural(&name)),
                format!("list{name}"),
            );
            if entity.annotation.paginated(config) {
                push_page_parameters(
                    &mut operation,
                    &entity.annotation,
                    config,
                    &mut doc.components,
                );
            }
            push_sort_parameters(graph, entity, &mut operation, &mut doc.components)?;
            push_filter_parameters(graph, entity, &mut operation, &mut doc.components)?;
            operation.responses.insert(
                "200".to_string(),
                RefOr::Item(Response::json(
                    &format!("List of {}", plural(&name)),
                    RefOr::schema_ref(&schema),
                )),
            );
            doc.paths
                .entry(collection_path(entity))
                .or_default()
                .get = Some(operation);
        }
    }
    Ok(doc)
}

/// Compile an edge sub-resource (`GET /pets/{id}/owner`) into a fragment.
///
/// Unique edges read the single attached target; collections list the
/// attached targets with the target's sort and filter surface.
pub fn edge_fragment(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    edge: &Edge,
) -> Result<Document, CompileError> {
    let mut doc = Document::new();
    doc.tags.push(entity_tag(entity));
    let Some(id_field) = &entity.id else {
        return Ok(doc);
    };
    let target = resolve_target(graph, entity, edge)?;
    if target.id.is_none() {
        return Ok(doc);
    }

    let name = pascal(&entity.name);
    let edge_name = pascal(&edge.name);
    let target_name = pascal(&target.name);
    let path = format!("{}/{}", item_path(entity), kebab(&edge.name));
    let deprecated = entity.annotation.deprecated
        || edge.annotation.deprecated
        || target.annotation.deprecated;

    let mut operation;
    if edge.unique {
        ensure_read_schemas(graph, config, target, &mut doc.components.schemas)?;
        operation = edge_operation(
            entity,
            edge,
            OperationKind::Read,
            format!("Find the attached {target_name}"),
            format!("read{name}{edge_name}"),
        );
        operation.responses.insert(
            "200".to_string(),
            RefOr::Item(Response::json(
                &format!("The attached {target_name}"),
                RefOr::schema_ref(&read_name(target)),
            )),
        );
    } else {
        // the edge may override the target's pagination settings
        let mut effective = target.annotation.clone();
        effective.merge(&edge.annotation);
        let paginated = effective.paginated(config);
        let limits = effective.page_limits(config);

        operation = edge_operation(
            entity,
            edge,
            OperationKind::List,
            format!("List attached {}", plural(&target_name)),
            format!("list{name}{edge_name}"),
        );
        if paginated {
            push_page_parameters(&mut operation, &effective, config, &mut doc.components);
        }
        push_sort_parameters(graph, target, &mut operation, &mut doc.components)?;
        push_filter_parameters(graph, target, &mut operation, &mut doc.components)?;

        let differs = paginated != target.annotation.paginated(config)
            || limits != target.annotation.page_limits(config);
        let schema = if config.dedicated_edge_schema && differs {
            ensure_read_schemas(graph, config, target, &mut doc.components.schemas)?;
            let dedicated = format!("{name}{edge_name}List");
            let wrapped = wrap_list(
                config,
                paginated,
                RefOr::schema_ref(&read_name(target)),
                &mut doc.components.schemas,
            );
            doc.components
                .schemas
                .insert(dedicated.clone(), RefOr::Item(wrapped));
            dedicated
        } else {
            list_schema(graph, config, target, &mut doc.components.schemas)?
        };
        operation.responses.insert(
            "200".to_string(),
            RefOr::Item(Response::json(
                &format!("List of attached {}", plural(&target_name)),
                RefOr::schema_ref(&schema),
            )),
        );
    }
    operation.deprecated = deprecated;
    operation
        .parameters
        .insert(0, id_parameter(entity, id_field, &mut doc.components)?);

    doc.paths.entry(path).or_default().get = Some(operation);
    Ok(doc)
}

fn entity_tag(entity: &Entity) -> Tag {
    Tag {
        name: pascal(&entity.name),
        description: entity.annotation.description.clone(),
    }
}

fn base_operation(
    entity: &Entity,
    op: OperationKind,
    summary: String,
    operation_id: String,
) -> Operation {
    let mut operation = Operation {
        tags: vec![pascal(&entity.name)],
        summary: Some(summary),
        operation_id: Some(operation_id),
        deprecated: entity.annotation.deprecated,
        ..Operation::default()
    };
    for tag in &entity.annotation.tags {
        if !operation.tags.contains(tag) {
            operation.tags.push(tag.clone());
        }
    }
    apply_override(&mut operation, &entity.annotation, op);
    operation
}

fn edge_operation(
    entity: &Entity,
    edge: &Edge,
    op: OperationKind,
    summary: String,
    operation_id: String,
) -> Operation {
    let mut operation = Operation {
        tags: vec![pascal(&entity.name)],
        summary: Some(summary),
        operation_id: Some(operation_id),
        ..Operation::default()
    };
    for tag in &edge.annotation.tags {
        if !operation.tags.contains(tag) {
            operation.tags.push(tag.clone());
        }
    }
    apply_override(&mut operation, &edge.annotation, op);
    operation
}

fn apply_override(operation: &mut Operation, annotation: &Annotation, op: OperationKind) {
    let Some(ov) = annotation.override_for(op) else {
        return;
    };
    if ov.summary.is_some() {
        operation.summary = ov.summary.clone();
    }
    if ov.description.is_some() {
        operation.description = ov.description.clone();
    }
    for tag in &ov.tags {
        if !operation.tags.contains(tag) {
            operation.tags.push(tag.clone());
        }
    }
}

/// Ensure the `{Entity}ID` path parameter component and return a reference
/// to it.
fn id_parameter(
    entity: &Entity,
    id_field: &Field,
    components: &mut Components,
) -> Result<RefOr<Parameter>, CompileError> {
    let component = format!("{}ID", pascal(&entity.name));
    let schema = value_schema(entity, id_field, &mut components.schemas)?;
    let parameter = Parameter::path("id", schema)
        .describe(&format!("ID of the {}", pascal(&entity.name)));
    components
        .parameters
        .insert(component.clone(), RefOr::Item(parameter));
    Ok(RefOr::parameter_ref(&component))
}

/// Page number is a shared component; the page size is inlined because its
/// bounds vary per entity and edge.
fn push_page_parameters(
    operation: &mut Operation,
    annotation: &Annotation,
    config: &Config,
    components: &mut Components,
) {
    components
        .parameters
        .entry(PAGE_PARAM.to_string())
        .or_insert_with(|| {
            let schema = Schema {
                minimum: Some(Number::from(1)),
                default: Some(json!(1)),
                ..Schema::new("integer")
            };
            RefOr::Item(
                Parameter::query("page", RefOr::Item(schema))
                    .describe("The page number to fetch"),
            )
        });
    operation.parameters.push(RefOr::parameter_ref(PAGE_PARAM));

    let limits = annotation.page_limits(config);
    let schema = Schema {
        minimum: Some(Number::from(limits.min)),
        maximum: Some(Number::from(limits.max)),
        default: Some(json!(limits.default)),
        ..Schema::new("integer")
    };
    operation.parameters.push(RefOr::Item(
        Parameter::query("per_page", RefOr::Item(schema))
            .describe("The number of items to fetch per page"),
    ));
}

/// Sort parameters are only worth emitting when there is a real choice to
/// make.
fn push_sort_parameters(
    graph: &Graph,
    entity: &Entity,
    operation: &mut Operation,
    components: &mut Components,
) -> Result<(), CompileError> {
    let fields = sortable_fields(graph, entity)?;
    if fields.len() <= 1 {
        return Ok(());
    }

    let component = format!("{}SortFields", pascal(&entity.name));
    let mut enum_schema = Schema::new("string");
    enum_schema.enum_values = fields.iter().map(|f| Value::String(f.clone())).collect();
    if let Some(default) = &entity.annotation.default_sort {
        enum_schema.default = Some(Value::String(default.clone()));
    }
    components
        .schemas
        .insert(component.clone(), RefOr::Item(enum_schema));

    let mut sort = Parameter::query("sort", RefOr::schema_ref(&component))
        .describe("The field to sort results by");
    if let Some(default) = &entity.annotation.default_sort {
        sort.description = Some(format!(
            "The field to sort results by, defaults to {default}"
        ));
    }
    operation.parameters.push(RefOr::Item(sort));

    let mut order_schema = Schema::new("string");
    order_schema.enum_values = vec![json!("asc"), json!("desc")];
    order_schema.default = Some(json!("asc"));
    operation.parameters.push(RefOr::Item(
        Parameter::query("order", RefOr::Item(order_schema)).describe("The sort direction"),
    ));
    Ok(())
}

fn push_filter_parameters(
    graph: &Graph,
    entity: &Entity,
    operation: &mut Operation,
    components: &mut Components,
) -> Result<(), CompileError> {
    let filters = filter_parameters(graph, entity, &mut components.schemas)?;
    if filters.is_empty() {
        return Ok(());
    }

    components
        .parameters
        .entry(FILTER_OP_PARAM.to_string())
        .or_insert_with(|| {
            let mut schema = Schema::new("string");
            schema.enum_values = vec![json!("and"), json!("or")];
            schema.default = Some(json!("and"));
            RefOr::Item(
                Parameter::query("filter_op", RefOr::Item(schema))
                    .describe("How multiple filter predicates are combined"),
            )
        });
    operation
        .parameters
        .push(RefOr::parameter_ref(FILTER_OP_PARAM));

    for filter in filters {
        operation
            .parameters
            .push(RefOr::parameter_ref(&filter.component));
        components
            .parameters
            .insert(filter.component, RefOr::Item(filter.parameter));
    }
    Ok(())
}
