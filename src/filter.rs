//! Filter query-parameter derivation.
//!
//! A field surfaces one query parameter per operation in the intersection
//! of its annotated capability and what its type structurally supports.
//! Edges contribute an existence check plus one level of target-field
//! parameters; filter groups collapse several same-typed fields into a
//! single disjunctive parameter.

use std::collections::BTreeMap;

use crate::casing::{camel, pascal, singular};
use crate::document::{Parameter, RefOr, Schema};
use crate::error::CompileError;
use crate::graph::{Entity, Field, Graph};
use crate::predicate::{FilterOp, FilterOpSet};
use crate::schema::{resolve_target, value_schema};

type Schemas = BTreeMap<String, RefOr<Schema>>;

/// One derived filter parameter, keyed by its component name.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParam {
    pub component: String,
    pub parameter: Parameter,
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    /// First contributing member; its type is the group's required type and
    /// its schema is the group's value schema.
    representative: Option<&'a Field>,
    ops: FilterOpSet,
    members: Vec<String>,
}

/// Derive all filter parameters for an entity's list operation, sorted by
/// component name. Enum value schemas are hoisted into `schemas` on the
/// way.
pub fn filter_parameters(
    graph: &Graph,
    entity: &Entity,
    schemas: &mut Schemas,
) -> Result<Vec<FilterParam>, CompileError> {
    let mut out = Vec::new();
    let mut groups: BTreeMap<String, GroupAccumulator<'_>> = BTreeMap::new();

    for field in entity.id.iter().chain(&entity.fields) {
        if let Some(group) = &field.annotation.filter_group {
            let acc = groups.entry(group.clone()).or_default();
            if field.annotation.skip || field.sensitive || field.annotation.filter.is_empty() {
                // the group name is declared, but this member is not
                // filterable
                continue;
            }
            match acc.representative {
                Some(rep) if rep.field_type != field.field_type => {
                    return Err(CompileError::FilterGroupTypeMismatch {
                        group: group.clone(),
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                        expected: rep.field_type.to_string(),
                        found: field.field_type.to_string(),
                    });
                }
                Some(_) => {
                    acc.ops = acc.ops.intersection(&retained_ops(field));
                }
                None => {
                    acc.representative = Some(field);
                    acc.ops = retained_ops(field);
                }
            }
            acc.members.push(field.name.clone());
            continue;
        }

        if field.annotation.skip || field.sensitive || field.annotation.filter.is_empty() {
            continue;
        }
        for op in retained_ops(field).explode() {
            out.push(FilterParam {
                component: format!(
                    "{}{}{}",
                    pascal(&entity.name),
                    pascal(&field.name),
                    op.component_suffix()
                ),
                parameter: Parameter::query(
                    &format!("{}.{}", camel(&field.name), op.token()),
                    op_schema(entity, field, op, schemas)?,
                )
                .describe(&format!(
                    "Filters items where {} {}.",
                    field.name,
                    op.describe()
                )),
            });
        }
    }

    for edge in &entity.edges {
        if edge.annotation.skip || edge.annotation.filter.is_empty() {
            continue;
        }
        let prefix = camel(&singular(&edge.name));
        out.push(FilterParam {
            component: format!("{}Has{}", pascal(&entity.name), pascal(&edge.name)),
            parameter: Parameter::query(
                &format!("has.{prefix}"),
                RefOr::Item(Schema::new("boolean")),
            )
            .describe(&format!(
                "Filters items that have a {} edge.",
                edge.name
            )),
        });

        // One level of target-field parameters. Deeper nesting would make
        // the parameter list quadratic in the graph size.
        let target = resolve_target(graph, entity, edge)?;
        for field in target.id.iter().chain(&target.fields) {
            if field.annotation.skip
                || field.sensitive
                || field.annotation.filter_group.is_some()
                || field.annotation.filter.is_empty()
            {
                continue;
            }
            for op in retained_ops(field).explode() {
                out.push(FilterParam {
                    component: format!(
                        "{}{}{}{}",
                        pascal(&entity.name),
                        pascal(&edge.name),
                        pascal(&field.name),
                        op.component_suffix()
                    ),
                    parameter: Parameter::query(
                        &format!("{}.{}.{}", prefix, camel(&field.name), op.token()),
                        op_schema(target, field, op, schemas)?,
                    )
                    .describe(&format!(
                        "Filters items whose {} edge has {} {}.",
                        edge.name,
                        field.name,
                        op.describe()
                    )),
                });
            }
        }
    }

    for (name, acc) in groups {
        let representative = acc.representative.ok_or_else(|| {
            CompileError::FilterGroupEmpty {
                group: name.clone(),
                entity: entity.name.clone(),
            }
        })?;
        if acc.ops.is_empty() {
            return Err(CompileError::FilterGroupNoCommonOps {
                group: name,
                entity: entity.name.clone(),
            });
        }
        let members = acc.members.join(", ");
        for op in acc.ops.explode() {
            out.push(FilterParam {
                component: format!(
                    "{}FilterGroup{}{}",
                    pascal(&entity.name),
                    pascal(&name),
                    op.component_suffix()
                ),
                parameter: Parameter::query(
                    &format!("{}.{}", camel(&name), op.token()),
                    op_schema(entity, representative, op, schemas)?,
                )
                .describe(&format!(
                    "Filters items where any of {} {}.",
                    members,
                    op.describe()
                )),
            });
        }
    }

    out.sort_by(|a, b| a.component.cmp(&b.component));
    Ok(out)
}

/// The operations a field actually surfaces: annotated capability narrowed
/// to structural support, with the nil check dropped on non-nullable
/// fields.
fn retained_ops(field: &Field) -> FilterOpSet {
    let mut retained = field
        .annotation
        .filter
        .intersection(&field.field_type.supported_filter_ops());
    if !field.nullable {
        retained.remove(FilterOp::IsNil);
    }
    retained
}

/// The value schema of one filter parameter.
///
/// Ordering comparisons on non-numeric types compare length and take an
/// integer; the nil check takes a boolean; variadic operations take an
/// array of the field's value type.
fn op_schema(
    entity: &Entity,
    field: &Field,
    op: FilterOp,
    schemas: &mut Schemas,
) -> Result<RefOr<Schema>, CompileError> {
    if op == FilterOp::IsNil {
        return Ok(RefOr::Item(Schema::new("boolean")));
    }
    let value = if op.numeric_comparison() && !field.field_type.is_numeric() {
        RefOr::Item(Schema::new("integer").with_format("int64"))
    } else {
        value_schema(entity, field, schemas)?
    };
    if op.variadic() {
        Ok(RefOr::Item(Schema::array(value)))
    } else {
        Ok(value)
    }
}
