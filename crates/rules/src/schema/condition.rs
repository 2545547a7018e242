//! Condition language for validation rules.

use serde::{Deserialize, Serialize};

/// A check over extracted attribute values. Evaluates to `true` when the
/// entity satisfies it; `false` produces a violation.
///
/// Each node is a single-key map naming the operator:
///
/// ```yaml
/// all:
///   - required: prov-status
///   - one_of: {attribute: prov-status, values: [ACTIVE, PROV]}
/// ```
///
/// Value constraints (`equals`, `one_of`, `matches`) hold vacuously when
/// the attribute is absent; pair them with `required` to demand presence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Condition {
    /// The attribute is present with a non-blank value.
    Required { required: String },
    /// Every value equals `value`.
    Equals { equals: ValueCheck },
    /// Every value is one of `values`.
    OneOf { one_of: AllowedValues },
    /// Every value matches the regex `pattern`.
    Matches { matches: PatternCheck },
    /// At least one value equals `value`.
    Contains { contains: ValueCheck },
    /// Number of values lies within the inclusive bounds.
    Count { count: CountBounds },
    All { all: Vec<Condition> },
    Any { any: Vec<Condition> },
    Not { not: Box<Condition> },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ValueCheck {
    pub attribute: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AllowedValues {
    pub attribute: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PatternCheck {
    pub attribute: String,
    pub pattern: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CountBounds {
    pub attribute: String,
    #[serde(default)]
    pub min: Option<usize>,
    #[serde(default)]
    pub max: Option<usize>,
}

impl Condition {
    /// Every attribute path referenced anywhere in the tree, in order.
    pub fn attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    fn collect_attributes<'a>(&'a self, out: &mut Vec<&'a str>) {
        let attribute = match self {
            Condition::Required { required } => required.as_str(),
            Condition::Equals { equals: check } | Condition::Contains { contains: check } => {
                check.attribute.as_str()
            }
            Condition::OneOf { one_of } => one_of.attribute.as_str(),
            Condition::Matches { matches } => matches.attribute.as_str(),
            Condition::Count { count } => count.attribute.as_str(),
            Condition::All { all: children } | Condition::Any { any: children } => {
                for child in children {
                    child.collect_attributes(out);
                }
                return;
            }
            Condition::Not { not } => return not.collect_attributes(out),
        };
        if !out.contains(&attribute) {
            out.push(attribute);
        }
    }
}
