pub mod attributes;
pub mod config;
pub mod entity;
pub mod error;
pub mod model_id;
pub mod path;
pub mod reader;
pub mod result;

pub use attributes::{AttributeValue, AttributeValues};
pub use config::Config;
pub use entity::{Entity, EntityId};
pub use error::*;
pub use model_id::ModelId;
pub use path::{AttributePath, PathError};
pub use reader::{EventPayload, EventReader, JsonEventReader, ReaderConfig, ReaderError};
pub use result::{ValidationResult, Violation, ViolationType};
