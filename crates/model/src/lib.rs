pub mod cache;
pub mod definition;
pub mod error;
pub mod local;
pub mod namespace;
pub mod remote;
pub mod resolver;

pub use cache::{CacheStats, ModelCache};
pub use definition::{ModelDefinition, ModelElement};
pub use error::{CacheError, DocumentError, ResolverError};
pub use local::LocalModelResolver;
pub use namespace::strip_namespaces;
pub use remote::RemoteModelResolver;
pub use resolver::{ModelResolver, Resolution};
