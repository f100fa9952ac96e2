//! Compile a typed entity-relationship graph into an OpenAPI 3.0.3
//! document.
//!
//! The input is a [`Graph`] of entities, fields, and edges, optionally
//! decorated with [`Annotation`]s; the output is a complete [`Document`]
//! with CRUD paths, request and response schemas, filter and sort query
//! parameters, pagination envelopes, and shared error responses.
//! Compilation is deterministic: the same graph and [`Config`] always
//! serialize to byte-identical JSON.
//!
//! ```
//! use oas_graph::{compile, Config, Entity, Field, FieldType, Graph};
//!
//! let mut pet = Entity::new("Pet");
//! pet.fields.push(Field::new("name", FieldType::String));
//! let graph = Graph { entities: vec![pet] };
//!
//! let doc = compile(&graph, &Config::default()).unwrap();
//! assert!(doc.paths.contains_key("/pets"));
//! assert!(doc.paths.contains_key("/pets/{id}"));
//! ```

mod annotation;
mod casing;
mod compiler;
mod document;
mod error;
mod filter;
mod global;
mod graph;
mod merge;
mod paths;
mod predicate;
mod schema;
mod sort;

pub use annotation::{Annotation, Config, OperationKind, OperationOverride, PageLimits};
pub use compiler::compile;
pub use document::{
    Components, Document, Header, Info, MediaType, Operation, Parameter, PathItem,
    RefOr, RequestBody, Response, Schema, Server, Tag, JSON_MEDIA_TYPE, METHODS,
    OPENAPI_VERSION,
};
pub use error::{CompileError, MergeError};
pub use graph::{Edge, Entity, Field, FieldType, Graph};
pub use merge::{merge, MergeMode};
pub use predicate::{FilterOp, FilterOpSet};
