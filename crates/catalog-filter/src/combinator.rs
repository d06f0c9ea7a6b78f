use serde::{Deserialize, Serialize};

use crate::operator::BoolOp;
use crate::{Predicate, PredicateNode, Record};

/// Boolean connective over ordered child predicates
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Combinator<P = PredicateNode> {
    operator: BoolOp,
    children: Vec<P>,
}

impl<P> Combinator<P> {
    /// Construction is unchecked; [`Predicate::validate`] reports arity errors.
    pub fn new(operator: BoolOp, children: Vec<P>) -> Self {
        Self { operator, children }
    }

    pub fn and(children: Vec<P>) -> Self {
        Self::new(BoolOp::And, children)
    }

    pub fn or(children: Vec<P>) -> Self {
        Self::new(BoolOp::Or, children)
    }

    pub fn not(child: P) -> Self {
        Self::new(BoolOp::Not, vec![child])
    }

    pub fn operator(&self) -> BoolOp {
        self.operator
    }

    pub fn children(&self) -> &[P] {
        &self.children
    }
}

impl<P: Predicate> Predicate for Combinator<P> {
    fn validate(&self) -> bool {
        self.children.iter().all(P::validate)
            && self.operator.accepts_arity(self.children.len())
    }

    /// Children are evaluated left to right and stop at the first decisive
    /// result. A malformed `Not` with several children acts as NOR.
    fn evaluate(&self, record: &Record) -> bool {
        match self.operator {
            BoolOp::And => self.children.iter().all(|child| child.evaluate(record)),
            BoolOp::Or => self.children.iter().any(|child| child.evaluate(record)),
            BoolOp::Not => !self.children.iter().any(|child| child.evaluate(record)),
        }
    }

    fn to_expression(&self) -> String {
        let mut out = self.operator.as_str().to_string();
        for child in &self.children {
            out.push('{');
            out.push_str(&child.to_expression());
            out.push('}');
        }
        out
    }
}
