//! Condition evaluation and violation message rendering.
//!
//! Conditions from rule documents are compiled once at load time into
//! [`Check`] trees (attribute paths parsed, regexes built), then evaluated
//! per entity against the attribute values extracted for the rule.

mod check;
mod message;

pub use check::Check;
pub use message::{EntityInfo, MessageContext, MessageRenderer, RuleInfo};
