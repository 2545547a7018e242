//! Compiled condition trees with AND/OR/NOT composition.

use regex::Regex;
use validus_core::{AttributePath, AttributeValue, AttributeValues};

use crate::schema::Condition;

/// A condition ready for evaluation.
#[derive(Debug, Clone)]
pub enum Check {
    Required(String),
    Equals { attribute: String, value: String },
    OneOf { attribute: String, values: Vec<String> },
    Matches { attribute: String, regex: Regex },
    Contains { attribute: String, value: String },
    Count {
        attribute: String,
        min: Option<usize>,
        max: Option<usize>,
    },
    All(Vec<Check>),
    Any(Vec<Check>),
    Not(Box<Check>),
}

fn checked_path(attribute: &str) -> Result<String, String> {
    AttributePath::parse(attribute)
        .map(|p| p.as_str().to_string())
        .map_err(|e| e.to_string())
}

impl Check {
    /// Compile a condition, validating every path and pattern it contains.
    pub fn compile(condition: &Condition) -> Result<Self, String> {
        Ok(match condition {
            Condition::Required { required } => Check::Required(checked_path(required)?),
            Condition::Equals { equals } => Check::Equals {
                attribute: checked_path(&equals.attribute)?,
                value: equals.value.clone(),
            },
            Condition::OneOf { one_of } => Check::OneOf {
                attribute: checked_path(&one_of.attribute)?,
                values: one_of.values.clone(),
            },
            Condition::Matches { matches } => Check::Matches {
                attribute: checked_path(&matches.attribute)?,
                regex: Regex::new(&matches.pattern)
                    .map_err(|e| format!("invalid pattern '{}': {}", matches.pattern, e))?,
            },
            Condition::Contains { contains } => Check::Contains {
                attribute: checked_path(&contains.attribute)?,
                value: contains.value.clone(),
            },
            Condition::Count { count } => {
                if let (Some(min), Some(max)) = (count.min, count.max) {
                    if min > max {
                        return Err(format!(
                            "count on '{}' has min {} > max {}",
                            count.attribute, min, max
                        ));
                    }
                }
                Check::Count {
                    attribute: checked_path(&count.attribute)?,
                    min: count.min,
                    max: count.max,
                }
            }
            Condition::All { all } => Check::All(
                all.iter().map(Check::compile).collect::<Result<_, _>>()?,
            ),
            Condition::Any { any } => {
                if any.is_empty() {
                    return Err("'any' needs at least one condition".to_string());
                }
                Check::Any(any.iter().map(Check::compile).collect::<Result<_, _>>()?)
            }
            Condition::Not { not } => Check::Not(Box::new(Check::compile(not)?)),
        })
    }

    /// `true` when the values satisfy the check.
    pub fn evaluate(&self, values: &AttributeValues) -> bool {
        match self {
            Check::Required(attribute) => values.get(attribute).is_some_and(|v| !v.is_empty()),
            Check::Equals { attribute, value } => {
                every(values.get(attribute), |v| v == value)
            }
            Check::OneOf { attribute, values: allowed } => {
                every(values.get(attribute), |v| allowed.iter().any(|a| a == v))
            }
            Check::Matches { attribute, regex } => every(values.get(attribute), |v| regex.is_match(v)),
            Check::Contains { attribute, value } => values
                .get(attribute)
                .is_some_and(|v| v.values().contains(&value.as_str())),
            Check::Count { attribute, min, max } => {
                let n = values.get(attribute).map_or(0, AttributeValue::len);
                min.map_or(true, |min| n >= min) && max.map_or(true, |max| n <= max)
            }
            Check::All(children) => children.iter().all(|c| c.evaluate(values)),
            Check::Any(children) => children.iter().any(|c| c.evaluate(values)),
            Check::Not(inner) => !inner.evaluate(values),
        }
    }
}

/// Absent attributes satisfy value constraints vacuously.
fn every(value: Option<&AttributeValue>, pred: impl Fn(&str) -> bool) -> bool {
    value.map_or(true, |v| v.values().into_iter().all(pred))
}
