//! Per-node annotations and compilation-wide configuration.
//!
//! An [`Annotation`] is a typed, mergeable property bag attached to every
//! entity, field, and edge. Resolution is a pure function of
//! (annotation, config): the explicit per-node value wins, then the
//! configured default, then a hard-coded default.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::{Header, Parameter, Server};
use crate::predicate::FilterOpSet;

/// The CRUD operations an entity can expose.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl OperationKind {
    /// Every operation, in generation order.
    pub const ALL: &'static [OperationKind] = &[
        OperationKind::Create,
        OperationKind::Read,
        OperationKind::Update,
        OperationKind::Delete,
        OperationKind::List,
    ];
}

/// Explicit overrides for one generated operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationOverride {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: BTreeSet<String>,
}

/// Resolved pagination limits for one entity or edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub min: u64,
    pub default: u64,
    pub max: u64,
}

/// A mergeable annotation bag.
///
/// `Option` fields distinguish "never set" from an explicit value so that
/// merge can be last-wins-on-explicit; plain booleans mean "ever set" and
/// merge with OR; sets merge with union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotation {
    pub skip: bool,
    pub read_only: bool,
    pub deprecated: bool,
    pub sortable: bool,
    pub bulk_edge_update: bool,
    pub pagination: Option<bool>,
    pub eager_load: Option<bool>,
    pub filter: FilterOpSet,
    pub filter_group: Option<String>,
    pub operations: Option<BTreeSet<OperationKind>>,
    pub description: Option<String>,
    pub example: Option<Value>,
    pub tags: BTreeSet<String>,
    pub default_sort: Option<String>,
    pub min_items_per_page: Option<u64>,
    pub items_per_page: Option<u64>,
    pub max_items_per_page: Option<u64>,
    pub operation_overrides: BTreeMap<OperationKind, OperationOverride>,
}

impl Annotation {
    /// Merge `other` into `self`. Associative: merging a, b, c in any
    /// grouping yields the same bag.
    pub fn merge(&mut self, other: &Annotation) {
        self.skip |= other.skip;
        self.read_only |= other.read_only;
        self.deprecated |= other.deprecated;
        self.sortable |= other.sortable;
        self.bulk_edge_update |= other.bulk_edge_update;

        if other.pagination.is_some() {
            self.pagination = other.pagination;
        }
        if other.eager_load.is_some() {
            self.eager_load = other.eager_load;
        }
        if other.filter_group.is_some() {
            self.filter_group = other.filter_group.clone();
        }
        if other.description.is_some() {
            self.description = other.description.clone();
        }
        if other.example.is_some() {
            self.example = other.example.clone();
        }
        if other.default_sort.is_some() {
            self.default_sort = other.default_sort.clone();
        }
        if other.min_items_per_page.is_some() {
            self.min_items_per_page = other.min_items_per_page;
        }
        if other.items_per_page.is_some() {
            self.items_per_page = other.items_per_page;
        }
        if other.max_items_per_page.is_some() {
            self.max_items_per_page = other.max_items_per_page;
        }

        self.filter.union_with(&other.filter);
        self.tags.extend(other.tags.iter().cloned());
        match (&mut self.operations, &other.operations) {
            (Some(ours), Some(theirs)) => ours.extend(theirs.iter().copied()),
            (ours @ None, Some(theirs)) => *ours = Some(theirs.clone()),
            _ => {}
        }

        for (op, incoming) in &other.operation_overrides {
            let entry = self.operation_overrides.entry(*op).or_default();
            if incoming.summary.is_some() {
                entry.summary = incoming.summary.clone();
            }
            if incoming.description.is_some() {
                entry.description = incoming.description.clone();
            }
            entry.tags.extend(incoming.tags.iter().cloned());
        }
    }

    /// Whether list results are paginated, falling back to the configured
    /// default.
    pub fn paginated(&self, config: &Config) -> bool {
        self.pagination.unwrap_or(config.default_pagination)
    }

    /// Whether an edge is embedded in its owner's Read schema.
    pub fn eager_loaded(&self, config: &Config) -> bool {
        self.eager_load.unwrap_or(config.default_eager_load)
    }

    /// The operations generated for an entity.
    pub fn operations(&self, config: &Config) -> BTreeSet<OperationKind> {
        self.operations
            .clone()
            .unwrap_or_else(|| config.default_operations.clone())
    }

    /// Page limits, field by field over the configured defaults.
    pub fn page_limits(&self, config: &Config) -> PageLimits {
        PageLimits {
            min: self.min_items_per_page.unwrap_or(config.min_items_per_page),
            default: self.items_per_page.unwrap_or(config.items_per_page),
            max: self.max_items_per_page.unwrap_or(config.max_items_per_page),
        }
    }

    /// The explicit override for one operation, if any.
    pub fn override_for(&self, op: OperationKind) -> Option<&OperationOverride> {
        self.operation_overrides.get(&op)
    }
}

/// Compilation-wide configuration.
///
/// Threaded explicitly through every compiler function; nothing is looked
/// up through node attachments at compile time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Document info header.
    pub title: String,
    pub description: Option<String>,
    pub version: String,
    pub servers: Vec<Server>,

    /// Operations generated for entities without an explicit subset.
    pub default_operations: BTreeSet<OperationKind>,
    /// Whether list results are paginated by default.
    pub default_pagination: bool,
    /// Whether edges are eager-loaded by default.
    pub default_eager_load: bool,
    /// Whether identity fields get default equality filters.
    pub filter_on_id: bool,
    /// Whether Create schemas accept client-supplied identity values.
    pub allow_client_ids: bool,

    /// Global page-size bounds, overridable per entity or edge.
    pub min_items_per_page: u64,
    pub items_per_page: u64,
    pub max_items_per_page: u64,

    /// Wrap unpaginated list results in a `{content: [...]}` envelope.
    pub wrap_unpaged: bool,
    /// Give edge sub-resources their own list schema when their pagination
    /// settings differ from the referenced entity's.
    pub dedicated_edge_schema: bool,
    /// Attach the 404 error response to list operations too.
    pub list_not_found: bool,

    /// Request-header parameters injected onto every path item, keyed by
    /// component name.
    pub request_headers: BTreeMap<String, Parameter>,
    /// Response headers injected onto every response, keyed by component
    /// name.
    pub response_headers: BTreeMap<String, Header>,
    /// HTTP statuses for which shared error responses are generated.
    pub error_responses: BTreeSet<u16>,
    /// Opaque security scheme definitions copied into the document.
    pub security_schemes: BTreeMap<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            title: "API".to_string(),
            description: None,
            version: "0.0.0".to_string(),
            servers: Vec::new(),
            default_operations: OperationKind::ALL.iter().copied().collect(),
            default_pagination: true,
            default_eager_load: false,
            filter_on_id: true,
            allow_client_ids: false,
            min_items_per_page: 1,
            items_per_page: 30,
            max_items_per_page: 255,
            wrap_unpaged: false,
            dedicated_edge_schema: true,
            list_not_found: false,
            request_headers: BTreeMap::new(),
            response_headers: BTreeMap::new(),
            error_responses: [400, 404, 409, 500].into_iter().collect(),
            security_schemes: BTreeMap::new(),
        }
    }
}
