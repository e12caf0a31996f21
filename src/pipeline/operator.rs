//! Comparison operators shared by the filter engine and the requirement
//! evaluator.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::Serialize;

use crate::data::model::Value;
use crate::error::{PipelineError, Result};

/// A binary comparison between a record value and a configured operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::Ne,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
    ];

    /// Canonical token of the operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "≠",
            Operator::Lt => "<",
            Operator::Le => "≤",
            Operator::Gt => ">",
            Operator::Ge => "≥",
        }
    }

    /// Whether an ordering between left and right operand satisfies the
    /// operator.
    pub fn holds(self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
        }
    }

    /// Apply the operator to `(left, right)`.
    ///
    /// * numbers compare numerically across integer and float
    /// * text compares lexicographically
    /// * dates compare chronologically; a text operand is parsed as a date
    /// * a `Null` operand (or a NaN) makes every operator false except `≠`
    ///
    /// Any other pairing is an [`PipelineError::IncomparableValues`].
    pub fn compare(self, left: &Value, right: &Value) -> Result<bool> {
        match ordering(left, right)? {
            Some(ord) => Ok(self.holds(ord)),
            None => Ok(self == Operator::Ne),
        }
    }
}

/// `None` means "unordered" (missing value or NaN).
fn ordering(left: &Value, right: &Value) -> Result<Option<Ordering>> {
    use Value::*;
    let ord = match (left, right) {
        (Null, _) | (_, Null) => None,
        (Integer(a), Integer(b)) => Some(a.cmp(b)),
        (Integer(a), Float(b)) => (*a as f64).partial_cmp(b),
        (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Float(a), Float(b)) => a.partial_cmp(b),
        (Text(a), Text(b)) => Some(a.cmp(b)),
        (Bool(a), Bool(b)) => Some(a.cmp(b)),
        (Date(a), Date(b)) => Some(a.cmp(b)),
        (Date(a), Text(s)) => Some(a.cmp(&parse_operand_date(s, left, right)?)),
        (Text(s), Date(b)) => Some(parse_operand_date(s, left, right)?.cmp(b)),
        _ => return Err(incomparable(left, right)),
    };
    Ok(ord)
}

fn parse_operand_date(s: &str, left: &Value, right: &Value) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| incomparable(left, right))
}

fn incomparable(left: &Value, right: &Value) -> PipelineError {
    PipelineError::IncomparableValues {
        left: format!("{} '{left}'", left.kind()),
        right: format!("{} '{right}'", right.kind()),
    }
}

impl FromStr for Operator {
    type Err = PipelineError;

    fn from_str(token: &str) -> Result<Self> {
        match token.trim() {
            "=" | "==" => Ok(Operator::Eq),
            "≠" | "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "≤" | "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            "≥" | ">=" => Ok(Operator::Ge),
            other => Err(PipelineError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Look up the operator for a symbolic token.
pub fn comparator(token: &str) -> Result<Operator> {
    token.parse()
}
