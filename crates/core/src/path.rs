//! Path expressions for pulling attribute values out of an entity's JSON.
//!
//! Syntax: dot-separated segments, each optionally followed by a selector:
//!
//! - `name`: child field; arrays are fanned out implicitly
//! - `name[*]`: every element
//! - `name[2]`: element at index 2
//! - `name[field=value]`: elements whose `field` equals `value`
//! - `name[field~regex]`: elements whose `field` matches `regex`
//!
//! Example: `relationship-list.relationship[related-to=tenant].related-link`

use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::attributes::AttributeValue;

#[derive(Debug, Error)]
pub enum PathError {
    #[error("empty path expression")]
    Empty,

    #[error("unbalanced brackets in '{0}'")]
    UnbalancedBrackets(String),

    #[error("invalid selector '[{selector}]' in '{path}'")]
    InvalidSelector { path: String, selector: String },

    #[error("invalid regex '{pattern}' in '{path}': {source}")]
    InvalidRegex {
        path: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[derive(Debug, Clone)]
enum Selector {
    All,
    Index(usize),
    Equals { field: String, value: String },
    Matches { field: String, regex: Regex },
}

#[derive(Debug, Clone)]
struct Segment {
    name: String,
    selector: Option<Selector>,
}

/// A parsed attribute path.
#[derive(Debug, Clone)]
pub struct AttributePath {
    raw: String,
    segments: Vec<Segment>,
}

impl AttributePath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for part in split_segments(raw)? {
            segments.push(parse_segment(raw, &part)?);
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Evaluate against a JSON value.
    ///
    /// Returns `None` when a non-fanning path finds nothing. A path that fans
    /// out (wildcard, filter, or array) always yields a list, possibly empty.
    pub fn extract(&self, root: &Value) -> Option<AttributeValue> {
        let mut current: Vec<&Value> = vec![root];
        let mut fanned = false;

        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                let Some(child) = value.get(&segment.name) else {
                    continue;
                };
                match (&segment.selector, child) {
                    (None, Value::Array(items)) => {
                        fanned = true;
                        next.extend(items.iter());
                    }
                    (None, other) => next.push(other),
                    (Some(selector), child) => {
                        let items: Vec<&Value> = match child {
                            Value::Array(items) => items.iter().collect(),
                            other => vec![other],
                        };
                        if !matches!(selector, Selector::Index(_)) {
                            fanned = true;
                        }
                        next.extend(select(selector, items));
                    }
                }
            }
            current = next;
        }

        let mut values = Vec::new();
        for value in current {
            match value {
                Value::Array(items) => {
                    fanned = true;
                    values.extend(items.iter().filter_map(scalar_to_string));
                }
                other => values.extend(scalar_to_string(other)),
            }
        }

        if fanned {
            return Some(AttributeValue::List(values));
        }
        match values.len() {
            0 => None,
            1 => values.pop().map(AttributeValue::Single),
            _ => Some(AttributeValue::List(values)),
        }
    }
}

fn select<'a>(selector: &Selector, items: Vec<&'a Value>) -> Vec<&'a Value> {
    match selector {
        Selector::All => items,
        Selector::Index(i) => items.get(*i).copied().into_iter().collect(),
        Selector::Equals { field, value } => items
            .into_iter()
            .filter(|item| {
                item.get(field)
                    .and_then(scalar_to_string)
                    .is_some_and(|v| &v == value)
            })
            .collect(),
        Selector::Matches { field, regex } => items
            .into_iter()
            .filter(|item| {
                item.get(field)
                    .and_then(scalar_to_string)
                    .is_some_and(|v| regex.is_match(&v))
            })
            .collect(),
    }
}

/// Render a JSON scalar as a string. Null is skipped; objects become JSON text.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Split on dots that sit outside brackets.
fn split_segments(raw: &str) -> Result<Vec<String>, PathError> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for ch in raw.chars() {
        match ch {
            '[' => {
                depth += 1;
                current.push(ch);
            }
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| PathError::UnbalancedBrackets(raw.to_string()))?;
                current.push(ch);
            }
            '.' if depth == 0 => parts.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    if depth != 0 {
        return Err(PathError::UnbalancedBrackets(raw.to_string()));
    }
    parts.push(current);

    if parts.iter().any(|p| p.is_empty()) {
        return Err(PathError::Empty);
    }
    Ok(parts)
}

fn parse_segment(raw: &str, part: &str) -> Result<Segment, PathError> {
    let Some(open) = part.find('[') else {
        return Ok(Segment {
            name: part.to_string(),
            selector: None,
        });
    };

    if !part.ends_with(']') {
        return Err(PathError::UnbalancedBrackets(raw.to_string()));
    }
    let name = part[..open].to_string();
    let inner = &part[open + 1..part.len() - 1];
    let invalid = || PathError::InvalidSelector {
        path: raw.to_string(),
        selector: inner.to_string(),
    };

    if name.is_empty() {
        return Err(invalid());
    }

    let selector = if inner == "*" {
        Selector::All
    } else if let Ok(i) = inner.parse::<usize>() {
        Selector::Index(i)
    } else if let Some((field, pattern)) = inner.split_once('~') {
        let regex = Regex::new(pattern).map_err(|source| PathError::InvalidRegex {
            path: raw.to_string(),
            pattern: pattern.to_string(),
            source,
        })?;
        Selector::Matches {
            field: field.trim().to_string(),
            regex,
        }
    } else if let Some((field, value)) = inner.split_once('=') {
        Selector::Equals {
            field: field.trim().to_string(),
            value: value.trim().to_string(),
        }
    } else {
        return Err(invalid());
    };

    Ok(Segment {
        name,
        selector: Some(selector),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vserver() -> Value {
        json!({
            "vserver-id": "vs-1",
            "vserver-name": "web-01",
            "in-maint": false,
            "relationship-list": {
                "relationship": [
                    {"related-to": "tenant", "related-link": "/tenants/t-1"},
                    {"related-to": "image", "related-link": "/images/i-9"},
                    {"related-to": "flavor", "related-link": "/flavors/f-2"}
                ]
            }
        })
    }

    fn extract(path: &str) -> Option<AttributeValue> {
        AttributePath::parse(path).unwrap().extract(&vserver())
    }

    #[test]
    fn scalar_field() {
        assert_eq!(extract("vserver-name"), Some(AttributeValue::Single("web-01".into())));
        assert_eq!(extract("in-maint"), Some(AttributeValue::Single("false".into())));
        assert_eq!(extract("missing"), None);
    }

    #[test]
    fn wildcard_fans_out() {
        assert_eq!(
            extract("relationship-list.relationship[*].related-to"),
            Some(AttributeValue::List(vec![
                "tenant".into(),
                "image".into(),
                "flavor".into()
            ]))
        );
    }

    #[test]
    fn implicit_array_fan_out() {
        let value = extract("relationship-list.relationship.related-to").unwrap();
        assert_eq!(value.len(), 3);
    }

    #[test]
    fn index_selector_stays_single() {
        assert_eq!(
            extract("relationship-list.relationship[1].related-to"),
            Some(AttributeValue::Single("image".into()))
        );
    }

    #[test]
    fn equality_filter() {
        assert_eq!(
            extract("relationship-list.relationship[related-to=tenant].related-link"),
            Some(AttributeValue::List(vec!["/tenants/t-1".into()]))
        );
    }

    #[test]
    fn regex_filter() {
        assert_eq!(
            extract("relationship-list.relationship[related-to~^(image|flavor)$].related-link"),
            Some(AttributeValue::List(vec!["/images/i-9".into(), "/flavors/f-2".into()]))
        );
    }

    #[test]
    fn fanned_path_with_no_matches_is_empty_list() {
        assert_eq!(
            extract("relationship-list.relationship[related-to=pserver].related-link"),
            Some(AttributeValue::List(vec![]))
        );
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = AttributePath::parse("relationship-list.relationship[related-to~(unclosed].x")
            .unwrap_err();
        assert!(matches!(err, PathError::InvalidRegex { .. }));
    }

    #[test]
    fn malformed_paths_are_rejected() {
        assert!(matches!(AttributePath::parse(""), Err(PathError::Empty)));
        assert!(matches!(AttributePath::parse("a..b"), Err(PathError::Empty)));
        assert!(matches!(
            AttributePath::parse("a[*"),
            Err(PathError::UnbalancedBrackets(_))
        ));
        assert!(matches!(
            AttributePath::parse("a[nonsense]"),
            Err(PathError::InvalidSelector { .. })
        ));
    }
}
