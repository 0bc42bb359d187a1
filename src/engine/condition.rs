// ABOUTME: Evaluates single-comparison task conditions against the workflow environment
// ABOUTME: Unparseable expressions evaluate to true so the task runs

use once_cell::sync::Lazy;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::template;

static COMPARISON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(.+?)\s*(==|!=|>=|<=|>|<)\s*(.+?)\s*$").expect("valid comparison pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Operator {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "==" => Some(Operator::Eq),
            "!=" => Some(Operator::Ne),
            ">" => Some(Operator::Gt),
            "<" => Some(Operator::Lt),
            ">=" => Some(Operator::Ge),
            "<=" => Some(Operator::Le),
            _ => None,
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Ne => ordering != Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Ge => ordering != Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
        }
    }
}

/// An interpolated `left op right` comparison with quotes removed
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub left: String,
    pub operator: Operator,
    pub right: String,
}

impl Comparison {
    pub fn evaluate(&self) -> bool {
        match (self.left.parse::<f64>(), self.right.parse::<f64>()) {
            (Ok(left), Ok(right)) => match left.partial_cmp(&right) {
                Some(ordering) => self.operator.holds(ordering),
                // NaN only satisfies inequality
                None => self.operator == Operator::Ne,
            },
            _ => self.operator.holds(self.left.cmp(&self.right)),
        }
    }
}

pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Interpolate and split an expression, or None when it is not a single comparison
    pub fn parse(expression: &str, environment: &HashMap<String, String>) -> Option<Comparison> {
        let resolved = template::interpolate(expression, environment);
        let captures = COMPARISON.captures(&resolved)?;
        let left = operand(captures.get(1)?.as_str())?;
        let right = operand(captures.get(3)?.as_str())?;

        Some(Comparison {
            left: strip_quotes(left).to_string(),
            operator: Operator::parse(captures.get(2)?.as_str())?,
            right: strip_quotes(right).to_string(),
        })
    }

    /// Evaluate a condition; anything that is not a recognised comparison is true
    pub fn evaluate(expression: &str, environment: &HashMap<String, String>) -> bool {
        match Self::parse(expression, environment) {
            Some(comparison) => comparison.evaluate(),
            None => true,
        }
    }
}

/// A bare operand that interpolated to nothing is not a comparison; `''` still is
fn operand(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn strip_quotes(operand: &str) -> &str {
    let trimmed = operand.trim();
    for quote in ['\'', '"'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return &trimmed[1..trimmed.len() - 1];
        }
    }
    trimmed
}
