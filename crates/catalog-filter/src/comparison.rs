use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::field::FieldRef;
use crate::operator::CompareOp;
use crate::{FilterError, Predicate, Record};

/// Operator together with its literal. Operators that need a literal carry
/// one; `Empty` and `NotEmpty` cannot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Equals(String),
    NotEquals(String),
    Empty,
    NotEmpty,
    StartsWith(String),
    NotStartsWith(String),
    EndsWith(String),
    NotEndsWith(String),
    Contains(String),
    NotContains(String),
}

impl Condition {
    /// # Errors
    /// [`FilterError::MissingLiteral`] or [`FilterError::UnexpectedLiteral`]
    /// when literal presence does not match the operator.
    pub fn new(operator: CompareOp, literal: Option<String>) -> Result<Self, FilterError> {
        let condition = match (operator, literal) {
            (CompareOp::Empty, None) => Self::Empty,
            (CompareOp::NotEmpty, None) => Self::NotEmpty,
            (CompareOp::Empty | CompareOp::NotEmpty, Some(_)) => {
                return Err(FilterError::UnexpectedLiteral(operator));
            }
            (_, None) => return Err(FilterError::MissingLiteral(operator)),
            (CompareOp::Equals, Some(literal)) => Self::Equals(literal),
            (CompareOp::NotEquals, Some(literal)) => Self::NotEquals(literal),
            (CompareOp::StartsWith, Some(literal)) => Self::StartsWith(literal),
            (CompareOp::NotStartsWith, Some(literal)) => Self::NotStartsWith(literal),
            (CompareOp::EndsWith, Some(literal)) => Self::EndsWith(literal),
            (CompareOp::NotEndsWith, Some(literal)) => Self::NotEndsWith(literal),
            (CompareOp::Contains, Some(literal)) => Self::Contains(literal),
            (CompareOp::NotContains, Some(literal)) => Self::NotContains(literal),
        };
        Ok(condition)
    }

    #[must_use]
    pub fn operator(&self) -> CompareOp {
        match self {
            Self::Equals(_) => CompareOp::Equals,
            Self::NotEquals(_) => CompareOp::NotEquals,
            Self::Empty => CompareOp::Empty,
            Self::NotEmpty => CompareOp::NotEmpty,
            Self::StartsWith(_) => CompareOp::StartsWith,
            Self::NotStartsWith(_) => CompareOp::NotStartsWith,
            Self::EndsWith(_) => CompareOp::EndsWith,
            Self::NotEndsWith(_) => CompareOp::NotEndsWith,
            Self::Contains(_) => CompareOp::Contains,
            Self::NotContains(_) => CompareOp::NotContains,
        }
    }

    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        match self {
            Self::Empty | Self::NotEmpty => None,
            Self::Equals(literal)
            | Self::NotEquals(literal)
            | Self::StartsWith(literal)
            | Self::NotStartsWith(literal)
            | Self::EndsWith(literal)
            | Self::NotEndsWith(literal)
            | Self::Contains(literal)
            | Self::NotContains(literal) => Some(literal),
        }
    }

    #[must_use]
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Self::Equals(literal) => value == literal,
            Self::NotEquals(literal) => value != literal,
            Self::Empty => value.trim().is_empty(),
            Self::NotEmpty => !value.trim().is_empty(),
            Self::StartsWith(literal) => value.starts_with(literal.as_str()),
            Self::NotStartsWith(literal) => !value.starts_with(literal.as_str()),
            Self::EndsWith(literal) => value.ends_with(literal.as_str()),
            Self::NotEndsWith(literal) => !value.ends_with(literal.as_str()),
            Self::Contains(literal) => value.contains(literal.as_str()),
            Self::NotContains(literal) => !value.contains(literal.as_str()),
        }
    }
}

/// Leaf predicate: one record field tested by one condition
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ComparisonDef", into = "ComparisonDef")]
pub struct Comparison {
    field: FieldRef,
    condition: Condition,
}

impl Comparison {
    /// # Errors
    /// Fails when literal presence does not match `operator`.
    pub fn new(
        field: FieldRef,
        operator: CompareOp,
        literal: Option<String>,
    ) -> Result<Self, FilterError> {
        Ok(Self::with_condition(field, Condition::new(operator, literal)?))
    }

    #[must_use]
    pub fn with_condition(field: FieldRef, condition: Condition) -> Self {
        Self { field, condition }
    }

    #[must_use]
    pub fn field(&self) -> FieldRef {
        self.field
    }

    #[must_use]
    pub fn operator(&self) -> CompareOp {
        self.condition.operator()
    }

    #[must_use]
    pub fn literal(&self) -> Option<&str> {
        self.condition.literal()
    }

    #[must_use]
    pub fn condition(&self) -> &Condition {
        &self.condition
    }
}

/// String form of a record field read from the key named by `field`.
/// Absent and null read as empty, strings are taken verbatim, and any other
/// value compares as its JSON text (`true`, `42`, `["a"]`).
fn field_text(record: &Record, field: FieldRef) -> Cow<'_, str> {
    match record.get(field.as_str()) {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(text)) => Cow::Borrowed(text),
        Some(other) => Cow::Owned(other.to_string()),
    }
}

impl Predicate for Comparison {
    fn validate(&self) -> bool {
        self.operator().requires_literal() == self.literal().is_some()
    }

    fn evaluate(&self, record: &Record) -> bool {
        self.condition.matches(&field_text(record, self.field))
    }

    fn to_expression(&self) -> String {
        let mut out = format!("[{}] <{}>", self.field, self.operator());
        if let Some(literal) = self.literal() {
            out.push(' ');
            out.push_str(&Value::String(literal.to_string()).to_string());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ComparisonDef {
    field: FieldRef,
    operator: CompareOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    literal: Option<String>,
}

impl TryFrom<ComparisonDef> for Comparison {
    type Error = FilterError;

    fn try_from(def: ComparisonDef) -> Result<Self, Self::Error> {
        Self::new(def.field, def.operator, def.literal)
    }
}

impl From<Comparison> for ComparisonDef {
    fn from(comparison: Comparison) -> Self {
        Self {
            field: comparison.field,
            operator: comparison.operator(),
            literal: comparison.literal().map(str::to_string),
        }
    }
}
