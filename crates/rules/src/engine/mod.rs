//! Rule engine: event payload in, one [`ValidationResult`] per entity out.
//!
//! [`ValidationResult`]: validus_core::ValidationResult

mod error;
mod validator;

pub use error::ValidatorError;
pub use validator::{Validator, ValidatorConfig};
