//! Declarative attribute filters and their evaluation against a catalog.
//!
//! Clauses arrive in the wire shape `{"Field", "Type", "Value"}` and are
//! compiled into a [`FilterSet`] before any catalog is touched, so malformed
//! operator/value combinations are rejected up front.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use strum::{Display, EnumString};
use utoipa::ToSchema;

use crate::catalog::CatalogIndex;
use crate::error::QueryError;
use crate::models::PriceRecord;

/// Comparison operator of a filter clause
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterType {
    #[default]
    Equals,
    AnyOf,
    Contains,
    NoneOf,
}

/// A single value or a value set, as sent by the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum FilterValue {
    Single(String),
    Set(Vec<String>),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Single(value) => write!(f, "{value:?}"),
            FilterValue::Set(values) => write!(f, "{values:?}"),
        }
    }
}

/// One predicate over a record attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilterClause {
    #[serde(rename = "Field", alias = "field")]
    pub field: String,
    #[serde(rename = "Type", alias = "type", default)]
    pub filter_type: FilterType,
    #[serde(rename = "Value", alias = "value")]
    pub value: FilterValue,
}

impl FilterClause {
    pub fn equals(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            filter_type: FilterType::Equals,
            value: FilterValue::Single(value.into()),
        }
    }

    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            filter_type: FilterType::Contains,
            value: FilterValue::Single(value.into()),
        }
    }

    pub fn any_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            filter_type: FilterType::AnyOf,
            value: FilterValue::Set(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn none_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            field: field.into(),
            filter_type: FilterType::NoneOf,
            value: FilterValue::Set(values.into_iter().map(Into::into).collect()),
        }
    }
}

impl fmt::Display for FilterClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.filter_type, self.value)
    }
}

#[derive(Debug, Clone)]
enum Predicate {
    Equals(String),
    AnyOf(HashSet<String>),
    Contains(String),
    NoneOf(HashSet<String>),
}

impl Predicate {
    fn matches(&self, value: &str) -> bool {
        match self {
            Predicate::Equals(expected) => value == expected,
            Predicate::AnyOf(set) => set.contains(value),
            Predicate::Contains(needle) => value.contains(needle.as_str()),
            Predicate::NoneOf(set) => !set.contains(value),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledClause {
    field: String,
    predicate: Predicate,
}

/// Validated conjunction of filter clauses
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    clauses: Vec<CompiledClause>,
}

impl FilterSet {
    /// Validate every clause; the first malformed one is reported.
    pub fn compile(clauses: &[FilterClause]) -> Result<Self, QueryError> {
        let clauses = clauses
            .iter()
            .map(compile_clause)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { clauses })
    }

    /// AND across clauses; an absent attribute fails its clause.
    pub fn matches(&self, record: &PriceRecord) -> bool {
        self.clauses.iter().all(|clause| {
            record
                .attribute(&clause.field)
                .is_some_and(|value| clause.predicate.matches(value))
        })
    }

    /// Matching records in index order.
    ///
    /// A field that no record carries yields an empty result rather than an error.
    pub fn evaluate<'a>(&self, index: &'a CatalogIndex) -> Vec<&'a PriceRecord> {
        if self
            .clauses
            .iter()
            .any(|clause| !index.has_attribute(&clause.field))
        {
            return Vec::new();
        }

        index.records().filter(|record| self.matches(record)).collect()
    }
}

fn compile_clause(clause: &FilterClause) -> Result<CompiledClause, QueryError> {
    let invalid = |reason: &str| QueryError::InvalidFilter {
        clause: clause.to_string(),
        reason: reason.to_string(),
    };

    if clause.field.trim().is_empty() {
        return Err(invalid("field must not be empty"));
    }

    let predicate = match (clause.filter_type, &clause.value) {
        (FilterType::Equals, FilterValue::Single(value)) => Predicate::Equals(value.clone()),
        (FilterType::Contains, FilterValue::Single(value)) => Predicate::Contains(value.clone()),
        (FilterType::Equals | FilterType::Contains, FilterValue::Set(_)) => {
            return Err(invalid("operator takes a single string value"));
        }
        (FilterType::AnyOf | FilterType::NoneOf, FilterValue::Single(_)) => {
            return Err(invalid("operator takes a list of values"));
        }
        (_, FilterValue::Set(values)) if values.is_empty() => {
            return Err(invalid("value list must not be empty"));
        }
        (FilterType::AnyOf, FilterValue::Set(values)) => {
            Predicate::AnyOf(values.iter().cloned().collect())
        }
        (FilterType::NoneOf, FilterValue::Set(values)) => {
            Predicate::NoneOf(values.iter().cloned().collect())
        }
    };

    Ok(CompiledClause {
        field: clause.field.clone(),
        predicate,
    })
}
