//! Sortable field derivation.
//!
//! An entity's sort vocabulary is its identity field, every field marked
//! sortable, the pseudo-field `random` at the root, and edge-derived
//! entries: unique edges expose the target's vocabulary under a dotted
//! prefix, collections expose a row count and integer sums.

use std::collections::HashSet;

use crate::casing::camel;
use crate::error::CompileError;
use crate::graph::{Entity, Graph};

/// The sorted, deduplicated sort vocabulary of one entity.
///
/// Fails when the entity declares a default sort outside its own
/// vocabulary.
pub fn sortable_fields(
    graph: &Graph,
    entity: &Entity,
) -> Result<Vec<String>, CompileError> {
    let mut out = Vec::new();
    let mut visited = HashSet::new();
    collect(graph, entity, "", true, &mut visited, &mut out);
    out.sort();
    out.dedup();

    if let Some(default) = &entity.annotation.default_sort {
        if !out.contains(default) {
            return Err(CompileError::DefaultSortNotSortable {
                entity: entity.name.clone(),
                field: default.clone(),
            });
        }
    }
    Ok(out)
}

fn collect(
    graph: &Graph,
    entity: &Entity,
    prefix: &str,
    root: bool,
    visited: &mut HashSet<String>,
    out: &mut Vec<String>,
) {
    // Cycle guard: an entity contributes at most once per dotted path.
    if !visited.insert(entity.name.clone()) {
        return;
    }

    if let Some(id) = &entity.id {
        if !id.annotation.skip && !id.sensitive {
            out.push(format!("{prefix}{}", camel(&id.name)));
        }
    }
    for field in &entity.fields {
        if field.annotation.sortable && !field.annotation.skip && !field.sensitive {
            out.push(format!("{prefix}{}", camel(&field.name)));
        }
    }
    if root {
        out.push("random".to_string());
    }

    for edge in &entity.edges {
        if edge.annotation.skip {
            continue;
        }
        let Some(target) = graph.entity(&edge.target) else {
            continue;
        };
        let edge_prefix = format!("{prefix}{}.", camel(&edge.name));
        if edge.unique {
            collect(graph, target, &edge_prefix, false, visited, out);
        } else {
            out.push(format!("{edge_prefix}count"));
            for field in &target.fields {
                if field.annotation.sortable
                    && !field.annotation.skip
                    && !field.sensitive
                    && field.field_type.is_integer()
                {
                    out.push(format!("{edge_prefix}{}.sum", camel(&field.name)));
                }
            }
        }
    }

    visited.remove(&entity.name);
}
