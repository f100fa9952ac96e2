//! The input entity-relationship graph.
//!
//! Constructed once per compilation run, normally by deserializing the
//! output of an external schema loader. The compiler treats the graph as
//! immutable apart from the one-time annotation default merge performed by
//! [`Graph::prepare`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::annotation::Annotation;
use crate::annotation::Config;
use crate::error::CompileError;
use crate::predicate::{FilterOp, FilterOpSet};

/// Primitive field types understood by the schema generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Bool,
    String,
    Time,
    Bytes,
    Uuid,
    Int8,
    Int16,
    Int32,
    Int64,
    Int,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uint,
    Float32,
    Float64,
    Enum,
    Array(Box<FieldType>),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Array(inner) => return write!(f, "array<{inner}>"),
            FieldType::Bool => "bool",
            FieldType::String => "string",
            FieldType::Time => "time",
            FieldType::Bytes => "bytes",
            FieldType::Uuid => "uuid",
            FieldType::Int8 => "int8",
            FieldType::Int16 => "int16",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Int => "int",
            FieldType::Uint8 => "uint8",
            FieldType::Uint16 => "uint16",
            FieldType::Uint32 => "uint32",
            FieldType::Uint64 => "uint64",
            FieldType::Uint => "uint",
            FieldType::Float32 => "float32",
            FieldType::Float64 => "float64",
            FieldType::Enum => "enum",
        };
        f.write_str(name)
    }
}

impl FieldType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            FieldType::Int8
                | FieldType::Int16
                | FieldType::Int32
                | FieldType::Int64
                | FieldType::Int
                | FieldType::Uint8
                | FieldType::Uint16
                | FieldType::Uint32
                | FieldType::Uint64
                | FieldType::Uint
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, FieldType::Float32 | FieldType::Float64)
    }

    /// The filter operations this type structurally supports.
    ///
    /// Booleans never get `neq` (redundant with `eq` on the negated value);
    /// ordering on strings and bytes compares length; arrays only support
    /// the nil check.
    pub fn supported_filter_ops(&self) -> FilterOpSet {
        match self {
            FieldType::Bool => {
                FilterOpSet::of(&[FilterOp::Eq]).union(&FilterOpSet::nil())
            }
            FieldType::String => FilterOpSet::all(),
            FieldType::Bytes | FieldType::Time => FilterOpSet::equality()
                .union(&FilterOpSet::order())
                .union(&FilterOpSet::nil()),
            FieldType::Uuid | FieldType::Enum => FilterOpSet::equality()
                .union(&FilterOpSet::array())
                .union(&FilterOpSet::nil()),
            FieldType::Array(_) => FilterOpSet::nil(),
            // remaining variants are the numeric types
            _ => FilterOpSet::equality()
                .union(&FilterOpSet::order())
                .union(&FilterOpSet::array())
                .union(&FilterOpSet::nil()),
        }
    }
}

/// A single entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub nullable: bool,
    /// The field has a default (serializable or not).
    #[serde(default)]
    pub defaulted: bool,
    /// A serializable default value, when one exists.
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default)]
    pub sensitive: bool,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default)]
    pub enum_values: Vec<String>,
    /// Structural documentation inherited from the source schema.
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Field {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Field {
            name: name.into(),
            field_type,
            nullable: false,
            defaulted: false,
            default: None,
            sensitive: false,
            immutable: false,
            enum_values: Vec::new(),
            comment: None,
            annotation: Annotation::default(),
        }
    }

    pub fn has_default(&self) -> bool {
        self.defaulted || self.default.is_some()
    }
}

/// A typed relationship to another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub name: String,
    /// Name of the referenced entity.
    pub target: String,
    /// Single reference (true) or collection (false).
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub required: bool,
    /// The owning foreign-key field, for non-through edges.
    #[serde(default)]
    pub field: Option<String>,
    /// The join entity, for many-to-many relationships.
    #[serde(default)]
    pub through: Option<String>,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Edge {
    pub fn new(name: impl Into<String>, target: impl Into<String>) -> Self {
        Edge {
            name: name.into(),
            target: target.into(),
            unique: false,
            required: false,
            field: None,
            through: None,
            annotation: Annotation::default(),
        }
    }

    /// A through-relationship crosses a join row with no identity of its
    /// own; such edges are excluded from create/update-by-reference flows.
    pub fn is_through(&self, graph: &Graph) -> bool {
        if self.through.is_some() {
            return true;
        }
        !self.unique
            && graph
                .entity(&self.target)
                .is_some_and(|target| target.id.is_none())
    }
}

/// A named node in the graph, corresponding to one REST resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    /// Absent for through entities representing join rows.
    #[serde(default)]
    pub id: Option<Field>,
    #[serde(default)]
    pub fields: Vec<Field>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub annotation: Annotation,
}

impl Entity {
    /// A new entity with an `int64` identity field named `id`.
    pub fn new(name: impl Into<String>) -> Self {
        Entity {
            name: name.into(),
            id: Some(Field::new("id", FieldType::Int64)),
            fields: Vec::new(),
            edges: Vec::new(),
            annotation: Annotation::default(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// The full entity-relationship graph fed into the compiler.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub entities: Vec<Entity>,
}

impl Graph {
    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    /// Structural validation: duplicate names, dangling edge targets,
    /// unknown owning fields. Filter-group and default-sort declarations
    /// are checked for every entity here, so they fail even when the
    /// entity's operation subset never generates a list.
    pub fn validate(&self) -> Result<(), CompileError> {
        let mut seen = BTreeSet::new();
        for entity in &self.entities {
            if !seen.insert(entity.name.as_str()) {
                return Err(CompileError::DuplicateEntity {
                    name: entity.name.clone(),
                });
            }

            let mut fields = BTreeSet::new();
            for field in entity.id.iter().chain(&entity.fields) {
                if !fields.insert(field.name.as_str()) {
                    return Err(CompileError::DuplicateField {
                        entity: entity.name.clone(),
                        field: field.name.clone(),
                    });
                }
            }

            let mut edges = BTreeSet::new();
            for edge in &entity.edges {
                if !edges.insert(edge.name.as_str()) {
                    return Err(CompileError::DuplicateEdge {
                        entity: entity.name.clone(),
                        edge: edge.name.clone(),
                    });
                }
                if self.entity(&edge.target).is_none() {
                    return Err(CompileError::UnknownEntity {
                        entity: entity.name.clone(),
                        edge: edge.name.clone(),
                        target: edge.target.clone(),
                    });
                }
                if let Some(through) = &edge.through {
                    if self.entity(through).is_none() {
                        return Err(CompileError::UnknownEntity {
                            entity: entity.name.clone(),
                            edge: edge.name.clone(),
                            target: through.clone(),
                        });
                    }
                }
                if let Some(field) = &edge.field {
                    if entity.field(field).is_none() {
                        return Err(CompileError::UnknownEdgeField {
                            entity: entity.name.clone(),
                            edge: edge.name.clone(),
                            field: field.clone(),
                        });
                    }
                }
            }
        }

        for entity in &self.entities {
            if entity.annotation.skip || entity.id.is_none() {
                continue;
            }
            let mut scratch = BTreeMap::new();
            crate::filter::filter_parameters(self, entity, &mut scratch)?;
            crate::sort::sortable_fields(self, entity)?;
        }
        Ok(())
    }

    /// Resolve configuration defaults into annotations, once, before
    /// compilation. Currently this writes the default filter capability
    /// onto identity fields so dependent passes see an explicit value.
    pub fn prepare(&mut self, config: &Config) {
        if !config.filter_on_id {
            return;
        }
        for entity in &mut self.entities {
            if let Some(id) = &mut entity.id {
                if id.annotation.filter.is_empty() {
                    id.annotation.filter = FilterOpSet::equality()
                        .union(&FilterOpSet::array())
                        .intersection(&id.field_type.supported_filter_ops());
                }
            }
        }
    }
}
