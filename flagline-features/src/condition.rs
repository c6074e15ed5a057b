//! Boolean condition expressions.
//!
//! A rule's conditions form a recursive tree: a leaf [`Condition`] compares one
//! context attribute, a [`ConditionGroup`] combines children, and
//! [`Expression::Always`] (no condition at all) matches everything.
//!
//! Matching never fails. Missing attributes, non-coercible operands, malformed
//! values and invalid patterns all make the sub-check false.

use crate::bucket::bucket;
use crate::coerce::{stringify, to_f64, to_i64, to_string_list};
use crate::context::EvaluationContext;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Boolean expression over context attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expression {
    /// Single attribute comparison
    Condition(Condition),
    /// Combination of child expressions
    Group(ConditionGroup),
    /// Empty filter; matches every context
    #[default]
    Always,
}

impl Expression {
    /// Create a leaf comparison
    pub fn condition(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self::Condition(Condition::new(attribute, operator, value))
    }

    /// Match when every child matches
    pub fn and(children: Vec<Expression>) -> Self {
        Self::Group(ConditionGroup::new(GroupOperator::And, children))
    }

    /// Match when any child matches
    pub fn or(children: Vec<Expression>) -> Self {
        Self::Group(ConditionGroup::new(GroupOperator::Or, children))
    }

    /// Match when the first child matches and no other does
    pub fn and_not(children: Vec<Expression>) -> Self {
        Self::Group(ConditionGroup::new(GroupOperator::AndNot, children))
    }

    /// Evaluate the expression against a context.
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        match self {
            Self::Condition(condition) => condition.matches(context),
            Self::Group(group) => group.matches(context),
            Self::Always => true,
        }
    }
}

impl From<Condition> for Expression {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

/// How a group combines its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupOperator {
    /// All children match
    And,
    /// Any child matches
    Or,
    /// First child matches and no other child does
    AndNot,
}

/// Group of child expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    /// How children are combined
    pub operator: GroupOperator,

    /// Child expressions
    #[serde(default)]
    pub children: Vec<Expression>,
}

impl ConditionGroup {
    /// Create a new group
    pub fn new(operator: GroupOperator, children: Vec<Expression>) -> Self {
        Self { operator, children }
    }

    /// Evaluate the group against a context
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        match self.operator {
            GroupOperator::And => self.children.iter().all(|c| c.matches(context)),
            GroupOperator::Or => self.children.iter().any(|c| c.matches(context)),
            GroupOperator::AndNot => match self.children.split_first() {
                Some((first, rest)) => {
                    first.matches(context) && !rest.iter().any(|c| c.matches(context))
                }
                None => false,
            },
        }
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    Neq,
    In,
    NotIn,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
    Percentage,
    /// Operator name this engine does not know; never matches
    #[serde(other)]
    Unknown,
}

/// Targeting condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Context attribute to check
    pub attribute: String,

    /// Operator
    pub operator: Operator,

    /// Operand; its shape depends on the operator
    #[serde(default)]
    pub value: Value,
}

impl Condition {
    /// Create a new condition
    pub fn new(
        attribute: impl Into<String>,
        operator: Operator,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            value: value.into(),
        }
    }

    /// Check the condition; a missing attribute never matches
    pub fn matches(&self, context: &EvaluationContext) -> bool {
        let Some(actual) = context.get(&self.attribute) else {
            return false;
        };

        match self.operator {
            Operator::Eq => stringify(actual) == stringify(&self.value),
            Operator::Neq => stringify(actual) != stringify(&self.value),
            Operator::In => self.membership(actual).unwrap_or(false),
            Operator::NotIn => self.membership(actual).map(|found| !found).unwrap_or(false),
            Operator::Gt => self.compare(actual, |a, b| a > b),
            Operator::Gte => self.compare(actual, |a, b| a >= b),
            Operator::Lt => self.compare(actual, |a, b| a < b),
            Operator::Lte => self.compare(actual, |a, b| a <= b),
            Operator::Regex => self.regex_matches(actual),
            Operator::Percentage => match to_i64(&self.value) {
                Some(threshold) => i64::from(bucket(&stringify(actual))) < threshold,
                None => false,
            },
            Operator::Unknown => false,
        }
    }

    /// Case-insensitive membership; `None` when the operand is not a list.
    fn membership(&self, actual: &Value) -> Option<bool> {
        let list = to_string_list(&self.value)?;
        let needle = stringify(actual).to_lowercase();
        Some(list.iter().any(|item| item.to_lowercase() == needle))
    }

    fn compare(&self, actual: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
        match (to_f64(actual), to_f64(&self.value)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    fn regex_matches(&self, actual: &Value) -> bool {
        let pattern = stringify(&self.value);
        match Regex::new(&pattern) {
            Ok(re) => re.is_match(&stringify(actual)),
            Err(e) => {
                debug!(
                    attribute = %self.attribute,
                    pattern = %pattern,
                    error = %e,
                    "Invalid regex in condition"
                );
                false
            }
        }
    }
}
