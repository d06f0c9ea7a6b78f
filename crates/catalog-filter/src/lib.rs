//! Boolean predicate trees over catalog record payloads
//!
//! A filter is a tree of [`Comparison`] leaves joined by [`Combinator`]
//! nodes. Trees are immutable once built, so one tree can be evaluated
//! against any number of records. Trees render to a one-line expression for
//! display and persistence; there is no parser back from that text.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

pub mod combinator;
pub mod comparison;
pub mod field;
pub mod operator;

pub use combinator::Combinator;
pub use comparison::{Comparison, Condition};
pub use field::FieldRef;
pub use operator::{BoolOp, CompareOp};

/// One archival record as returned by the catalog API
pub type Record = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, thiserror::Error, Eq, PartialEq)]
pub enum FilterError {
    #[error("operator `{0}` requires a literal")]
    MissingLiteral(CompareOp),
    #[error("operator `{0}` does not take a literal")]
    UnexpectedLiteral(CompareOp),
}

/// Capabilities shared by every node of a filter tree
pub trait Predicate {
    /// Structural check: literal presence for leaves, arity for combinators
    fn validate(&self) -> bool;

    fn evaluate(&self, record: &Record) -> bool;

    /// Deterministic one-line rendering of the tree
    fn to_expression(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum PredicateNode {
    Comparison(Comparison),
    Combinator(Combinator),
}

impl PredicateNode {
    /// # Errors
    /// Fails when literal presence does not match `operator`.
    pub fn comparison(
        field: FieldRef,
        operator: CompareOp,
        literal: Option<&str>,
    ) -> Result<Self, FilterError> {
        Comparison::new(field, operator, literal.map(str::to_string)).map(Self::Comparison)
    }

    #[must_use]
    pub fn and(children: Vec<Self>) -> Self {
        Self::Combinator(Combinator::and(children))
    }

    #[must_use]
    pub fn or(children: Vec<Self>) -> Self {
        Self::Combinator(Combinator::or(children))
    }

    #[must_use]
    pub fn not(child: Self) -> Self {
        Self::Combinator(Combinator::not(child))
    }
}

impl Predicate for PredicateNode {
    fn validate(&self) -> bool {
        match self {
            Self::Comparison(comparison) => comparison.validate(),
            Self::Combinator(combinator) => combinator.validate(),
        }
    }

    fn evaluate(&self, record: &Record) -> bool {
        match self {
            Self::Comparison(comparison) => comparison.evaluate(record),
            Self::Combinator(combinator) => combinator.evaluate(record),
        }
    }

    fn to_expression(&self) -> String {
        match self {
            Self::Comparison(comparison) => comparison.to_expression(),
            Self::Combinator(combinator) => combinator.to_expression(),
        }
    }
}

impl From<Comparison> for PredicateNode {
    fn from(comparison: Comparison) -> Self {
        Self::Comparison(comparison)
    }
}

impl From<Combinator> for PredicateNode {
    fn from(combinator: Combinator) -> Self {
        Self::Combinator(combinator)
    }
}

impl Display for PredicateNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_expression())
    }
}

/// Keys of the records the filter accepts, in input order
pub fn select_matching<'a, K, P, I>(filter: &P, records: I) -> Vec<K>
where
    P: Predicate + ?Sized,
    I: IntoIterator<Item = (K, &'a Record)>,
{
    records
        .into_iter()
        .filter(|(_, record)| filter.evaluate(record))
        .map(|(key, _)| key)
        .collect()
}
