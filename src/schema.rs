//! Field and entity schema generation.
//!
//! Maps graph fields to schema nodes and assembles the per-entity
//! Create/Update/Read/List component schemas. Enum fields are hoisted into
//! shared `{Entity}{Field}Enum` components; hoisting is deterministic and
//! idempotent, so any operation may trigger it first.

use std::collections::BTreeMap;

use serde_json::{Number, Value};

use crate::annotation::Config;
use crate::casing::pascal;
use crate::document::{RefOr, Schema};
use crate::error::CompileError;
use crate::graph::{Edge, Entity, Field, FieldType, Graph};

/// Component name of the shared pagination envelope.
pub const PAGED_RESPONSE: &str = "PagedResponse";

type Schemas = BTreeMap<String, RefOr<Schema>>;

/// `{Entity}` component name.
pub fn base_name(entity: &Entity) -> String {
    pascal(&entity.name)
}

/// `{Entity}Read` component name.
pub fn read_name(entity: &Entity) -> String {
    format!("{}Read", pascal(&entity.name))
}

/// `{Entity}Create` component name.
pub fn create_name(entity: &Entity) -> String {
    format!("{}Create", pascal(&entity.name))
}

/// `{Entity}Update` component name.
pub fn update_name(entity: &Entity) -> String {
    format!("{}Update", pascal(&entity.name))
}

/// `{Entity}List` component name.
pub fn list_name(entity: &Entity) -> String {
    format!("{}List", pascal(&entity.name))
}

/// `{Entity}{Field}Enum` component name.
pub fn enum_name(entity: &Entity, field: &Field) -> String {
    format!("{}{}Enum", pascal(&entity.name), pascal(&field.name))
}

/// Map a field to a schema node, hoisting enums into `schemas`.
///
/// The same (entity, field) pair always hoists to the same component name;
/// hoisting an existing name overwrites it, since every operation derives
/// the identical schema.
pub fn field_schema(
    entity: &Entity,
    field: &Field,
    schemas: &mut Schemas,
) -> Result<RefOr<Schema>, CompileError> {
    let mut schema = value_schema(entity, field, schemas)?;
    if let RefOr::Item(item) = &mut schema {
        decorate(item, field);
    }
    Ok(schema)
}

/// The bare type schema of a field, without the nullability, default, or
/// annotation decoration. Filter parameters reference values of the field,
/// not the field itself.
pub(crate) fn value_schema(
    entity: &Entity,
    field: &Field,
    schemas: &mut Schemas,
) -> Result<RefOr<Schema>, CompileError> {
    match &field.field_type {
        FieldType::Enum => {
            let name = enum_name(entity, field);
            schemas.insert(name.clone(), RefOr::Item(enum_schema(entity, field)?));
            Ok(RefOr::schema_ref(&name))
        }
        FieldType::Array(inner) => {
            let items = match inner.as_ref() {
                FieldType::Enum => {
                    let name = enum_name(entity, field);
                    schemas.insert(name.clone(), RefOr::Item(enum_schema(entity, field)?));
                    RefOr::schema_ref(&name)
                }
                FieldType::Array(_) => {
                    return Err(unsupported(entity, field));
                }
                primitive => RefOr::Item(primitive_schema(entity, field, primitive)?),
            };
            Ok(RefOr::Item(Schema::array(items)))
        }
        ty => Ok(RefOr::Item(primitive_schema(entity, field, ty)?)),
    }
}

/// Primitive-type table lookup. Sized integers get explicit bounds derived
/// from bit width and signedness.
fn primitive_schema(
    entity: &Entity,
    field: &Field,
    ty: &FieldType,
) -> Result<Schema, CompileError> {
    let schema = match ty {
        FieldType::Bool => Schema::new("boolean"),
        FieldType::String => Schema::new("string"),
        FieldType::Time => Schema::new("string").with_format("date-time"),
        FieldType::Bytes => Schema::new("string").with_format("byte"),
        FieldType::Uuid => Schema::new("string").with_format("uuid"),
        FieldType::Int8 => bounded_int(-128, 127),
        FieldType::Int16 => bounded_int(-32_768, 32_767),
        FieldType::Int32 => bounded_int(i64::from(i32::MIN), i64::from(i32::MAX))
            .with_format("int32"),
        FieldType::Int64 => bounded_int(i64::MIN, i64::MAX).with_format("int64"),
        FieldType::Int => Schema::new("integer").with_format("int64"),
        FieldType::Uint8 => bounded_uint(255),
        FieldType::Uint16 => bounded_uint(65_535),
        FieldType::Uint32 => bounded_uint(u64::from(u32::MAX)),
        FieldType::Uint64 => bounded_uint(u64::MAX),
        FieldType::Uint => Schema {
            minimum: Some(Number::from(0)),
            ..Schema::new("integer").with_format("int64")
        },
        FieldType::Float32 => Schema::new("number").with_format("float"),
        FieldType::Float64 => Schema::new("number").with_format("double"),
        FieldType::Enum | FieldType::Array(_) => {
            return Err(unsupported(entity, field));
        }
    };
    Ok(schema)
}

fn bounded_int(min: i64, max: i64) -> Schema {
    Schema {
        minimum: Some(Number::from(min)),
        maximum: Some(Number::from(max)),
        ..Schema::new("integer")
    }
}

fn bounded_uint(max: u64) -> Schema {
    Schema {
        minimum: Some(Number::from(0)),
        maximum: Some(Number::from(max)),
        ..Schema::new("integer")
    }
}

fn enum_schema(entity: &Entity, field: &Field) -> Result<Schema, CompileError> {
    if field.enum_values.is_empty() {
        return Err(unsupported(entity, field));
    }
    let mut schema = Schema::new("string");
    schema.enum_values = field
        .enum_values
        .iter()
        .map(|v| Value::String(v.clone()))
        .collect();
    Ok(schema)
}

fn unsupported(entity: &Entity, field: &Field) -> CompileError {
    CompileError::UnsupportedType {
        entity: entity.name.clone(),
        field: field.name.clone(),
        ty: field.field_type.to_string(),
    }
}

/// Apply nullability, defaults, and annotation overrides to a field schema.
///
/// Explicit annotation text wins over the structural comment.
fn decorate(schema: &mut Schema, field: &Field) {
    if field.nullable {
        schema.nullable = true;
    }
    if let Some(default) = &field.default {
        schema.default = Some(default.clone());
    }
    schema.description = field
        .annotation
        .description
        .clone()
        .or_else(|| field.comment.clone());
    if let Some(example) = &field.annotation.example {
        schema.example = Some(example.clone());
    }
    if field.annotation.deprecated {
        schema.deprecated = true;
    }
}

/// Ensure `{Entity}`, `{Entity}Read`, and (when eager edges exist)
/// `{Entity}Edges` are present, expanding transitively through eager
/// edges. Safe on self-referential entities: a placeholder breaks cycles.
pub fn ensure_read_schemas(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    schemas: &mut Schemas,
) -> Result<(), CompileError> {
    let base = base_name(entity);
    let read = read_name(entity);
    if schemas.contains_key(&read) {
        return Ok(());
    }
    // Placeholder so recursion through a self-referential eager edge
    // terminates; overwritten below.
    schemas.insert(read.clone(), RefOr::schema_ref(&base));

    let mut obj = Schema::object();
    obj.description = entity.annotation.description.clone();
    if let Some(id) = &entity.id {
        if !id.annotation.skip && !id.sensitive {
            obj.properties
                .insert(id.name.clone(), field_schema(entity, id, schemas)?);
            obj.required.push(id.name.clone());
        }
    }
    for field in &entity.fields {
        if field.annotation.skip || field.sensitive {
            continue;
        }
        obj.properties
            .insert(field.name.clone(), field_schema(entity, field, schemas)?);
        if !field.nullable {
            obj.required.push(field.name.clone());
        }
    }
    obj.required.sort();
    schemas.insert(base.clone(), RefOr::Item(obj));

    let eager: Vec<&Edge> = entity
        .edges
        .iter()
        .filter(|e| !e.annotation.skip && e.annotation.eager_loaded(config))
        .collect();

    if eager.is_empty() {
        // no wrapper: {Entity}Read is a plain alias
        schemas.insert(read, RefOr::schema_ref(&base));
        return Ok(());
    }

    let edges_name = format!("{base}Edges");
    let mut wrapper = Schema::object();
    for edge in eager {
        let target = resolve_target(graph, entity, edge)?;
        ensure_read_schemas(graph, config, target, schemas)?;
        let target_read = RefOr::schema_ref(&read_name(target));
        let property = if edge.unique {
            target_read
        } else {
            RefOr::Item(Schema::array(target_read))
        };
        wrapper.properties.insert(edge.name.clone(), property);
    }
    schemas.insert(edges_name.clone(), RefOr::Item(wrapper));

    let mut edges_holder = Schema::object();
    edges_holder
        .properties
        .insert("edges".to_string(), RefOr::schema_ref(&edges_name));
    let composite = Schema {
        all_of: vec![RefOr::schema_ref(&base), RefOr::Item(edges_holder)],
        ..Schema::default()
    };
    schemas.insert(read, RefOr::Item(composite));
    Ok(())
}

/// Build `{Entity}Create` (and its Read dependency). Returns the
/// component name.
pub fn create_schema(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    schemas: &mut Schemas,
) -> Result<String, CompileError> {
    ensure_read_schemas(graph, config, entity, schemas)?;

    let mut obj = Schema::object();
    if config.allow_client_ids {
        if let Some(id) = &entity.id {
            if !id.annotation.skip {
                obj.properties
                    .insert(id.name.clone(), field_schema(entity, id, schemas)?);
                if !id.has_default() {
                    obj.required.push(id.name.clone());
                }
            }
        }
    }
    for field in &entity.fields {
        if field.annotation.skip || field.annotation.read_only {
            continue;
        }
        obj.properties
            .insert(field.name.clone(), field_schema(entity, field, schemas)?);
        if !field.nullable && !field.has_default() {
            obj.required.push(field.name.clone());
        }
    }
    for edge in &entity.edges {
        if !writable_edge(graph, entity, edge, false)? {
            continue;
        }
        let reference = edge_reference_schema(graph, entity, edge, schemas)?;
        let property = if edge.unique {
            reference
        } else {
            RefOr::Item(Schema::array(reference))
        };
        obj.properties.insert(edge.name.clone(), property);
        if edge.required {
            obj.required.push(edge.name.clone());
        }
    }
    obj.required.sort();

    let name = create_name(entity);
    schemas.insert(name.clone(), RefOr::Item(obj));
    Ok(name)
}

/// Build `{Entity}Update` (and its Read dependency). Returns the
/// component name. Everything is optional: updates are partial.
pub fn update_schema(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    schemas: &mut Schemas,
) -> Result<String, CompileError> {
    ensure_read_schemas(graph, config, entity, schemas)?;

    let mut obj = Schema::object();
    for field in &entity.fields {
        if field.annotation.skip || field.annotation.read_only || field.immutable {
            continue;
        }
        obj.properties
            .insert(field.name.clone(), field_schema(entity, field, schemas)?);
    }
    for edge in &entity.edges {
        if !writable_edge(graph, entity, edge, true)? {
            continue;
        }
        let reference = edge_reference_schema(graph, entity, edge, schemas)?;
        if edge.unique {
            obj.properties.insert(edge.name.clone(), reference);
        } else {
            let array = RefOr::Item(Schema::array(reference));
            obj.properties
                .insert(format!("add_{}", edge.name), array.clone());
            obj.properties
                .insert(format!("remove_{}", edge.name), array.clone());
            if edge.annotation.bulk_edge_update {
                // replace-all surface, opt-in only
                obj.properties.insert(edge.name.clone(), array);
            }
        }
    }

    let name = update_name(entity);
    schemas.insert(name.clone(), RefOr::Item(obj));
    Ok(name)
}

/// Build `{Entity}List` (and its Read dependency). Returns the component
/// name.
pub fn list_schema(
    graph: &Graph,
    config: &Config,
    entity: &Entity,
    schemas: &mut Schemas,
) -> Result<String, CompileError> {
    ensure_read_schemas(graph, config, entity, schemas)?;
    let name = list_name(entity);
    let schema = wrap_list(
        config,
        entity.annotation.paginated(config),
        RefOr::schema_ref(&read_name(entity)),
        schemas,
    );
    schemas.insert(name.clone(), RefOr::Item(schema));
    Ok(name)
}

/// Wrap an item reference into a list schema according to the pagination
/// policy. Ensures the shared `PagedResponse` envelope when needed.
pub fn wrap_list(
    config: &Config,
    paginated: bool,
    item: RefOr<Schema>,
    schemas: &mut Schemas,
) -> Schema {
    let array = Schema::array(item);
    if paginated {
        schemas
            .entry(PAGED_RESPONSE.to_string())
            .or_insert_with(|| RefOr::Item(paged_response_schema()));
        let mut content = Schema::object();
        content
            .properties
            .insert("content".to_string(), RefOr::Item(array));
        content.required.push("content".to_string());
        Schema {
            all_of: vec![
                RefOr::schema_ref(PAGED_RESPONSE),
                RefOr::Item(content),
            ],
            ..Schema::default()
        }
    } else if config.wrap_unpaged {
        let mut content = Schema::object();
        content
            .properties
            .insert("content".to_string(), RefOr::Item(array));
        content.required.push("content".to_string());
        content
    } else {
        array
    }
}

fn paged_response_schema() -> Schema {
    let mut schema = Schema::object();
    schema.description = Some("Pagination metadata for list results.".to_string());
    schema.properties.insert(
        "page".to_string(),
        RefOr::Item(Schema::new("integer").with_format("int64")),
    );
    schema.properties.insert(
        "per_page".to_string(),
        RefOr::Item(Schema::new("integer").with_format("int64")),
    );
    schema.properties.insert(
        "total".to_string(),
        RefOr::Item(Schema::new("integer").with_format("int64")),
    );
    schema.required = vec!["page".to_string(), "per_page".to_string()];
    schema
}

/// Whether an edge appears on the Create/Update writable surface.
///
/// Through edges and edges without an addressable target are excluded; an
/// edge backed by a non-skipped foreign-key field yields to that field.
fn writable_edge(
    graph: &Graph,
    entity: &Entity,
    edge: &Edge,
    update: bool,
) -> Result<bool, CompileError> {
    if edge.annotation.skip || edge.annotation.read_only {
        return Ok(false);
    }
    if edge.is_through(graph) {
        return Ok(false);
    }
    let target = resolve_target(graph, entity, edge)?;
    if target.id.is_none() {
        return Ok(false);
    }
    if let Some(field_name) = &edge.field {
        let field = entity.field(field_name).ok_or_else(|| {
            CompileError::UnknownEdgeField {
                entity: entity.name.clone(),
                edge: edge.name.clone(),
                field: field_name.clone(),
            }
        })?;
        if !field.annotation.skip {
            // the foreign-key field is the writable surface
            return Ok(false);
        }
        if update && field.immutable {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The schema used to reference an edge target: the target's identity
/// schema.
fn edge_reference_schema(
    graph: &Graph,
    entity: &Entity,
    edge: &Edge,
    schemas: &mut Schemas,
) -> Result<RefOr<Schema>, CompileError> {
    let target = resolve_target(graph, entity, edge)?;
    let id = target.id.as_ref().ok_or_else(|| {
        CompileError::UnknownEdgeField {
            entity: entity.name.clone(),
            edge: edge.name.clone(),
            field: "id".to_string(),
        }
    })?;
    field_schema(target, id, schemas)
}

pub(crate) fn resolve_target<'a>(
    graph: &'a Graph,
    entity: &Entity,
    edge: &Edge,
) -> Result<&'a Entity, CompileError> {
    graph
        .entity(&edge.target)
        .ok_or_else(|| CompileError::UnknownEntity {
            entity: entity.name.clone(),
            edge: edge.name.clone(),
            target: edge.target.clone(),
        })
}
