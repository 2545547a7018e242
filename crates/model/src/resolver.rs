use async_trait::async_trait;
use validus_core::ModelId;

use crate::definition::ModelDefinition;
use crate::error::ResolverError;

/// Outcome of a successful lookup. Not-found is a value, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found(ModelDefinition),
    NotFound,
}

/// Loads a model definition for a [`ModelId`] on a cache miss.
#[async_trait]
pub trait ModelResolver: Send + Sync {
    /// Short label for logs.
    fn name(&self) -> &str;

    async fn resolve(&self, id: &ModelId) -> Result<Resolution, ResolverError>;
}
