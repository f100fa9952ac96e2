//! Filter predicates: atomic operations and tagged operation sets.
//!
//! A field's filter capability is a set of [`FilterOp`] variants rather than
//! an integer bitmask; named groups are plain constructor functions and the
//! union/intersection algebra is ordinary set algebra.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// One atomic filter operation on a field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    IsNil,
    In,
    NotIn,
    EqualFold,
    Contains,
    ContainsFold,
    HasPrefix,
    HasSuffix,
}

impl FilterOp {
    /// Every atomic operation, in canonical order.
    pub const ALL: &'static [FilterOp] = &[
        FilterOp::Eq,
        FilterOp::Neq,
        FilterOp::Gt,
        FilterOp::Gte,
        FilterOp::Lt,
        FilterOp::Lte,
        FilterOp::IsNil,
        FilterOp::In,
        FilterOp::NotIn,
        FilterOp::EqualFold,
        FilterOp::Contains,
        FilterOp::ContainsFold,
        FilterOp::HasPrefix,
        FilterOp::HasSuffix,
    ];

    /// Query-parameter token for this operation.
    ///
    /// The token format is part of the generated API surface and must stay
    /// bit-exact for client compatibility.
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::IsNil => "null",
            FilterOp::In => "in",
            FilterOp::NotIn => "notIn",
            FilterOp::EqualFold => "ieq",
            FilterOp::Contains => "has",
            FilterOp::ContainsFold => "ihas",
            FilterOp::HasPrefix => "prefix",
            FilterOp::HasSuffix => "suffix",
        }
    }

    /// PascalCase suffix used in component names.
    pub fn component_suffix(&self) -> &'static str {
        match self {
            FilterOp::Eq => "EQ",
            FilterOp::Neq => "NEQ",
            FilterOp::Gt => "GT",
            FilterOp::Gte => "GTE",
            FilterOp::Lt => "LT",
            FilterOp::Lte => "LTE",
            FilterOp::IsNil => "IsNil",
            FilterOp::In => "In",
            FilterOp::NotIn => "NotIn",
            FilterOp::EqualFold => "EqualFold",
            FilterOp::Contains => "Contains",
            FilterOp::ContainsFold => "ContainsFold",
            FilterOp::HasPrefix => "HasPrefix",
            FilterOp::HasSuffix => "HasSuffix",
        }
    }

    /// Human-readable predicate fragment for parameter descriptions.
    pub fn describe(&self) -> &'static str {
        match self {
            FilterOp::Eq => "is equal to the given value",
            FilterOp::Neq => "is not equal to the given value",
            FilterOp::Gt => "is greater than the given value",
            FilterOp::Gte => "is greater than or equal to the given value",
            FilterOp::Lt => "is less than the given value",
            FilterOp::Lte => "is less than or equal to the given value",
            FilterOp::IsNil => "is null",
            FilterOp::In => "is in the given list",
            FilterOp::NotIn => "is not in the given list",
            FilterOp::EqualFold => "is equal to the given value, case-insensitive",
            FilterOp::Contains => "contains the given value",
            FilterOp::ContainsFold => "contains the given value, case-insensitive",
            FilterOp::HasPrefix => "starts with the given value",
            FilterOp::HasSuffix => "ends with the given value",
        }
    }

    /// Operations that accept a list of values.
    pub fn variadic(&self) -> bool {
        matches!(self, FilterOp::In | FilterOp::NotIn)
    }

    /// Ordering comparisons; on unsized input types these compare length.
    pub fn numeric_comparison(&self) -> bool {
        matches!(
            self,
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte
        )
    }
}

/// A set of atomic filter operations.
///
/// Serialized as a sorted array of operation names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterOpSet(BTreeSet<FilterOp>);

impl FilterOpSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(ops: &[FilterOp]) -> Self {
        Self(ops.iter().copied().collect())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, op: FilterOp) -> bool {
        self.0.contains(&op)
    }

    pub fn insert(&mut self, op: FilterOp) {
        self.0.insert(op);
    }

    pub fn remove(&mut self, op: FilterOp) {
        self.0.remove(&op);
    }

    pub fn union(&self, other: &Self) -> Self {
        Self(self.0.union(&other.0).copied().collect())
    }

    /// In-place union, used when merging annotations.
    pub fn union_with(&mut self, other: &Self) {
        self.0.extend(other.0.iter().copied());
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self(self.0.intersection(&other.0).copied().collect())
    }

    /// The atomic members of this set, in canonical order.
    pub fn explode(&self) -> Vec<FilterOp> {
        self.0.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = FilterOp> + '_ {
        self.0.iter().copied()
    }

    // Named groups.

    /// `eq`, `neq`.
    pub fn equality() -> Self {
        Self::of(&[FilterOp::Eq, FilterOp::Neq])
    }

    /// `gt`, `gte`, `lt`, `lte`.
    pub fn order() -> Self {
        Self::of(&[FilterOp::Gt, FilterOp::Gte, FilterOp::Lt, FilterOp::Lte])
    }

    /// `in`, `notIn`.
    pub fn array() -> Self {
        Self::of(&[FilterOp::In, FilterOp::NotIn])
    }

    /// Case-folding and substring operations.
    pub fn string() -> Self {
        Self::of(&[
            FilterOp::EqualFold,
            FilterOp::Contains,
            FilterOp::ContainsFold,
            FilterOp::HasPrefix,
            FilterOp::HasSuffix,
        ])
    }

    /// `null`.
    pub fn nil() -> Self {
        Self::of(&[FilterOp::IsNil])
    }

    /// Every atomic operation.
    pub fn all() -> Self {
        Self::of(FilterOp::ALL)
    }
}
