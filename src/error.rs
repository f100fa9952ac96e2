//! Error types for graph compilation and document merging.

use thiserror::Error;

/// Errors raised while compiling a graph into a document.
///
/// All variants are schema-author errors: the input graph (or its
/// annotations) is inconsistent, and the compilation run is aborted.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("entity {entity}: field {field}: no schema mapping for type {ty}")]
    UnsupportedType {
        entity: String,
        field: String,
        ty: String,
    },

    #[error("entity {entity}: duplicate field {field}")]
    DuplicateField { entity: String, field: String },

    #[error("entity {entity}: duplicate edge {edge}")]
    DuplicateEdge { entity: String, edge: String },

    #[error("duplicate entity {name}")]
    DuplicateEntity { name: String },

    #[error("entity {entity}: edge {edge} references unknown entity {target}")]
    UnknownEntity {
        entity: String,
        edge: String,
        target: String,
    },

    #[error("entity {entity}: edge {edge} names unknown owning field {field}")]
    UnknownEdgeField {
        entity: String,
        edge: String,
        field: String,
    },

    #[error("filter group {group} on entity {entity}: field {field} has type {found}, other members have type {expected}")]
    FilterGroupTypeMismatch {
        group: String,
        entity: String,
        field: String,
        expected: String,
        found: String,
    },

    #[error("filter group {group} on entity {entity}: no operation is supported by every member field")]
    FilterGroupNoCommonOps { group: String, entity: String },

    #[error("filter group {group} on entity {entity}: no filterable member fields")]
    FilterGroupEmpty { group: String, entity: String },

    #[error("entity {entity}: default sort field {field} is not in the sortable field set")]
    DefaultSortNotSortable { entity: String, field: String },

    #[error(transparent)]
    Merge(#[from] MergeError),
}

/// Conflicts detected while merging document fragments in strict mode.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("duplicate path {path}")]
    DuplicatePath { path: String },

    #[error("duplicate {kind} component {name}")]
    DuplicateComponent { kind: &'static str, name: String },

    #[error("duplicate response status {status}")]
    DuplicateResponse { status: String },
}

impl CompileError {
    /// Returns the exit code for this error type.
    ///
    /// All compile errors are schema-author errors (exit code 2); I/O
    /// failures are handled by the CLI before compilation starts.
    pub fn exit_code(&self) -> i32 {
        2
    }
}
