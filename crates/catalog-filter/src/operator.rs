use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Field comparison operators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Equals,
    NotEquals,
    Empty,
    NotEmpty,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Contains,
    NotContains,
}

impl CompareOp {
    pub const ALL: [Self; 10] = [
        Self::Equals,
        Self::NotEquals,
        Self::Empty,
        Self::NotEmpty,
        Self::StartsWith,
        Self::NotStartsWith,
        Self::EndsWith,
        Self::NotEndsWith,
        Self::Contains,
        Self::NotContains,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::Empty => "empty",
            Self::NotEmpty => "not_empty",
            Self::StartsWith => "starts_with",
            Self::NotStartsWith => "not_starts_with",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
        }
    }

    /// Every operator except the emptiness checks compares against a literal
    #[must_use]
    pub fn requires_literal(self) -> bool {
        !matches!(self, Self::Empty | Self::NotEmpty)
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean connectives
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BoolOp {
    And,
    Or,
    Not,
}

impl BoolOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
        }
    }

    /// `Not` takes exactly one child; `And`/`Or` take more than one
    #[must_use]
    pub fn accepts_arity(self, children: usize) -> bool {
        match self {
            Self::Not => children == 1,
            Self::And | Self::Or => children > 1,
        }
    }
}

impl Display for BoolOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
