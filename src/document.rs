//! The OpenAPI 3.0.3 document model.
//!
//! Only the subset of the specification the compiler emits is modeled. All
//! keyed sections are `BTreeMap`s so that a compiled document serializes
//! canonically: two runs over the same graph produce byte-identical JSON.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// The OpenAPI version every compiled document declares.
pub const OPENAPI_VERSION: &str = "3.0.3";

/// The media type used for request and response bodies.
pub const JSON_MEDIA_TYPE: &str = "application/json";

fn is_false(v: &bool) -> bool {
    !*v
}

/// A `$ref` to a named component, or an inline value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

impl<T> RefOr<T> {
    pub fn schema_ref(name: &str) -> Self {
        RefOr::Ref {
            reference: format!("#/components/schemas/{name}"),
        }
    }

    pub fn parameter_ref(name: &str) -> Self {
        RefOr::Ref {
            reference: format!("#/components/parameters/{name}"),
        }
    }

    pub fn response_ref(name: &str) -> Self {
        RefOr::Ref {
            reference: format!("#/components/responses/{name}"),
        }
    }

    pub fn header_ref(name: &str) -> Self {
        RefOr::Ref {
            reference: format!("#/components/headers/{name}"),
        }
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, RefOr::Ref { .. })
    }

    pub fn as_item(&self) -> Option<&T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref { .. } => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut T> {
        match self {
            RefOr::Item(item) => Some(item),
            RefOr::Ref { .. } => None,
        }
    }
}

/// An OpenAPI schema object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<RefOr<Schema>>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, RefOr<Schema>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(rename = "allOf", skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<RefOr<Schema>>,
}

impl Schema {
    pub fn new(schema_type: &str) -> Self {
        Schema {
            schema_type: Some(schema_type.to_string()),
            ..Schema::default()
        }
    }

    pub fn object() -> Self {
        Schema::new("object")
    }

    pub fn array(items: RefOr<Schema>) -> Self {
        Schema {
            items: Some(Box::new(items)),
            ..Schema::new("array")
        }
    }

    pub fn with_format(mut self, format: &str) -> Self {
        self.format = Some(format.to_string());
        self
    }
}

/// An operation parameter (path, query, or header).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RefOr<Schema>>,
}

impl Parameter {
    pub fn query(name: &str, schema: RefOr<Schema>) -> Self {
        Parameter {
            name: name.to_string(),
            location: "query".to_string(),
            schema: Some(schema),
            ..Parameter::default()
        }
    }

    pub fn path(name: &str, schema: RefOr<Schema>) -> Self {
        Parameter {
            name: name.to_string(),
            location: "path".to_string(),
            required: true,
            schema: Some(schema),
            ..Parameter::default()
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

/// A reusable response header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Header {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RefOr<Schema>>,
}

/// A media type entry in a request or response body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaType {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<RefOr<Schema>>,
}

/// A request body with a JSON media type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

impl RequestBody {
    pub fn json(schema: RefOr<Schema>, required: bool) -> Self {
        let mut content = BTreeMap::new();
        content.insert(
            JSON_MEDIA_TYPE.to_string(),
            MediaType {
                schema: Some(schema),
            },
        );
        RequestBody {
            description: None,
            required,
            content,
        }
    }
}

/// A response object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Response {
    pub description: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, RefOr<Header>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

impl Response {
    /// A response without a body.
    pub fn empty(description: &str) -> Self {
        Response {
            description: description.to_string(),
            ..Response::default()
        }
    }

    /// A response with a JSON body.
    pub fn json(description: &str, schema: RefOr<Schema>) -> Self {
        let mut content = BTreeMap::new();
        content.insert(
            JSON_MEDIA_TYPE.to_string(),
            MediaType {
                schema: Some(schema),
            },
        );
        Response {
            description: description.to_string(),
            headers: BTreeMap::new(),
            content,
        }
    }
}

/// A single HTTP operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operation {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
    pub responses: BTreeMap<String, RefOr<Response>>,
}

/// A path item holding up to eight HTTP-method operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<Parameter>>,
}

/// The HTTP methods a path item can carry, in a fixed traversal order.
pub const METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

impl PathItem {
    pub fn operation(&self, method: &str) -> Option<&Operation> {
        match method {
            "get" => self.get.as_ref(),
            "put" => self.put.as_ref(),
            "post" => self.post.as_ref(),
            "delete" => self.delete.as_ref(),
            "options" => self.options.as_ref(),
            "head" => self.head.as_ref(),
            "patch" => self.patch.as_ref(),
            "trace" => self.trace.as_ref(),
            _ => None,
        }
    }

    pub fn slot_mut(&mut self, method: &str) -> Option<&mut Option<Operation>> {
        match method {
            "get" => Some(&mut self.get),
            "put" => Some(&mut self.put),
            "post" => Some(&mut self.post),
            "delete" => Some(&mut self.delete),
            "options" => Some(&mut self.options),
            "head" => Some(&mut self.head),
            "patch" => Some(&mut self.patch),
            "trace" => Some(&mut self.trace),
            _ => None,
        }
    }

    /// The operations present on this item, paired with their method.
    pub fn operations(&self) -> Vec<(&'static str, &Operation)> {
        let mut out = Vec::new();
        for method in METHODS {
            if let Some(op) = self.operation(method) {
                out.push((*method, op));
            }
        }
        out
    }

    pub fn operations_mut(&mut self) -> Vec<(&'static str, &mut Operation)> {
        let mut out = Vec::new();
        let slots = [
            ("get", &mut self.get),
            ("put", &mut self.put),
            ("post", &mut self.post),
            ("delete", &mut self.delete),
            ("options", &mut self.options),
            ("head", &mut self.head),
            ("patch", &mut self.patch),
            ("trace", &mut self.trace),
        ];
        for (method, slot) in slots {
            if let Some(op) = slot.as_mut() {
                out.push((method, op));
            }
        }
        out
    }
}

/// The document info header.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Info {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: String,
}

/// A tag grouping related operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A server entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The shared components section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Components {
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, RefOr<Schema>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, RefOr<Parameter>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub responses: BTreeMap<String, RefOr<Response>>,
    #[serde(rename = "requestBodies", skip_serializing_if = "BTreeMap::is_empty")]
    pub request_bodies: BTreeMap<String, RequestBody>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Header>,
    #[serde(rename = "securitySchemes", skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, Value>,
}

impl Components {
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.parameters.is_empty()
            && self.responses.is_empty()
            && self.request_bodies.is_empty()
            && self.headers.is_empty()
            && self.security_schemes.is_empty()
    }
}

/// A complete OpenAPI document (or an independently generated fragment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Document {
    pub openapi: String,
    pub info: Info,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    pub paths: BTreeMap<String, PathItem>,
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
}

impl Default for Document {
    fn default() -> Self {
        Document {
            openapi: OPENAPI_VERSION.to_string(),
            info: Info::default(),
            tags: Vec::new(),
            servers: Vec::new(),
            paths: BTreeMap::new(),
            components: Components::default(),
        }
    }
}

impl Document {
    pub fn new() -> Self {
        Document::default()
    }
}
