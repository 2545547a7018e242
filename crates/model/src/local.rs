//! Resolves models from a `models` XML document on disk.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;
use validus_core::ModelId;

use crate::definition::{ModelDefinition, ModelElement};
use crate::error::ResolverError;
use crate::resolver::{ModelResolver, Resolution};

pub const MODELS_ROOT: &str = "models";
pub const MODEL_ELEMENT: &str = "model";

/// Reads the configured document on every call and picks the `model` whose
/// id element matches.
#[derive(Debug, Clone)]
pub struct LocalModelResolver {
    path: PathBuf,
    /// Path to the id element inside a `model`; defaults to the id attribute name.
    id_path: Option<String>,
}

impl LocalModelResolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            id_path: None,
        }
    }

    pub fn with_id_path(mut self, id_path: impl Into<String>) -> Self {
        self.id_path = Some(id_path.into());
        self
    }
}

/// Pick the `model` child of a `models` root whose id element equals `id`.
pub(crate) fn select_model(root: ModelElement, id_path: &str, id: &str) -> Resolution {
    if root.name != MODELS_ROOT {
        return Resolution::NotFound;
    }
    root.children
        .into_iter()
        .filter(|model| model.name == MODEL_ELEMENT)
        .find(|model| model.texts(id_path).contains(&id))
        .map(|model| Resolution::Found(ModelDefinition::new(model)))
        .unwrap_or(Resolution::NotFound)
}

#[async_trait]
impl ModelResolver for LocalModelResolver {
    fn name(&self) -> &str {
        "local"
    }

    async fn resolve(&self, id: &ModelId) -> Result<Resolution, ResolverError> {
        let xml = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ResolverError::Io {
                path: self.path.clone(),
                source,
            })?;
        let root = ModelElement::parse(&xml)?;
        let id_path = self.id_path.as_deref().unwrap_or(id.attr());

        let resolution = select_model(root, id_path, id.id());
        debug!(
            model = %id,
            path = %self.path.display(),
            found = matches!(resolution, Resolution::Found(_)),
            "local model lookup"
        );
        Ok(resolution)
    }
}
