//! Core [`RuleRegistry`]: load once, index, serve lookups.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::evaluator::MessageRenderer;
use crate::rule::Rule;
use crate::schema::{EntityDefinition, RuleDocument, RuleEnvelope};

use super::error::{LoadResult, LoadStatus, Result, RuleError};

type IndexKey = (String, String);

fn index_key(entity_type: &str, event_type: &str) -> IndexKey {
    (entity_type.trim().to_lowercase(), event_type.trim().to_lowercase())
}

/// Immutable set of validation rules and entity definitions.
///
/// Built once by [`RuleRegistry::initialise`]; shared read-only afterwards.
#[derive(Debug, Default)]
pub struct RuleRegistry {
    /// (entity type, event type) -> rules in load order.
    index: HashMap<IndexKey, Vec<Arc<Rule>>>,
    /// Lowercased entity types with at least one rule under any event type.
    entity_types: HashSet<String>,
    /// Lowercased entity type -> identity definition.
    entities: HashMap<String, Arc<EntityDefinition>>,
    rule_count: usize,
    report: Vec<LoadResult>,
}

impl RuleRegistry {
    /// Registry with no rules.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load every YAML document under `roots`.
    ///
    /// Roots that do not exist are skipped. Files are visited in file-name
    /// order. The first malformed file aborts initialization.
    pub fn initialise(roots: &[PathBuf]) -> Result<Self> {
        let renderer = MessageRenderer::new();
        let mut registry = Self::default();
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for root in roots {
            if !root.exists() {
                debug!(path = %root.display(), "rules root does not exist, skipping");
                continue;
            }
            for path in yaml_files(root, &mut registry.report)? {
                registry.load_path(&path, &renderer, &mut seen)?;
            }
        }

        info!(
            rules = registry.rule_count,
            entity_types = registry.entity_types.len(),
            entity_definitions = registry.entities.len(),
            "rule registry initialised"
        );
        Ok(registry)
    }

    fn load_path(
        &mut self,
        path: &Path,
        renderer: &MessageRenderer,
        seen: &mut HashMap<String, PathBuf>,
    ) -> Result<()> {
        let doc = Self::load_file(path)?;
        let id = doc.metadata().id.clone();

        if let Some(first) = seen.get(&id) {
            return Err(RuleError::Duplicate {
                id,
                path: path.to_path_buf(),
                first: first.clone(),
            });
        }
        seen.insert(id.clone(), path.to_path_buf());

        if !doc.metadata().enabled {
            debug!(rule_id = %id, path = %path.display(), "rule disabled, skipping");
            self.report.push(LoadResult {
                path: path.to_path_buf(),
                status: LoadStatus::Disabled { id },
            });
            return Ok(());
        }

        match doc {
            RuleDocument::Validation(definition) => {
                let rule = Rule::compile(definition, renderer)
                    .map_err(|reason| RuleError::invalid(path, reason))?;
                info!(rule_id = %id, entity_type = %rule.entity_type(), path = %path.display(), "loaded rule");
                self.insert_rule(Arc::new(rule));
            }
            RuleDocument::Entity(definition) => {
                let key = definition.spec.entity_type.trim().to_lowercase();
                if key.is_empty() {
                    return Err(RuleError::invalid(path, "spec.entity_type must not be empty"));
                }
                if self.entities.contains_key(&key) {
                    return Err(RuleError::invalid(
                        path,
                        format!("entity type '{}' is already defined", definition.spec.entity_type),
                    ));
                }
                info!(entity_type = %definition.spec.entity_type, path = %path.display(), "loaded entity definition");
                self.entities.insert(key, Arc::new(definition));
            }
        }

        self.report.push(LoadResult {
            path: path.to_path_buf(),
            status: LoadStatus::Loaded { id },
        });
        Ok(())
    }

    fn insert_rule(&mut self, rule: Arc<Rule>) {
        let mut keys: Vec<IndexKey> = rule
            .event_types()
            .map(|event_type| index_key(rule.entity_type(), event_type))
            .collect();
        // Event types differing only in case share a key.
        keys.sort();
        keys.dedup();
        for key in keys {
            self.index.entry(key).or_default().push(Arc::clone(&rule));
        }
        self.entity_types.insert(rule.entity_type().trim().to_lowercase());
        self.rule_count += 1;
    }

    /// Parse a single YAML file into a [`RuleDocument`] via two-pass deserialization.
    pub fn load_file(path: &Path) -> Result<RuleDocument> {
        let contents = fs::read_to_string(path).map_err(|source| RuleError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let envelope: RuleEnvelope =
            serde_yaml::from_str(&contents).map_err(|e| RuleError::invalid(path, e.to_string()))?;

        if envelope.metadata.id.trim().is_empty() {
            return Err(RuleError::invalid(path, "metadata.id must not be empty"));
        }

        envelope.parse_full().map_err(|e| {
            RuleError::invalid(
                path,
                format!("failed to parse '{}': {}", envelope.metadata.id, e),
            )
        })
    }

    /// Rules for an entity/event pair, in load order. Empty when none match.
    pub fn rules_for(&self, entity_type: &str, event_type: &str) -> &[Arc<Rule>] {
        self.index
            .get(&index_key(entity_type, event_type))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether any rule targets this entity type, under any event type.
    pub fn is_known_entity_type(&self, entity_type: &str) -> bool {
        self.entity_types
            .contains(&entity_type.trim().to_lowercase())
    }

    pub fn entity_definition(&self, entity_type: &str) -> Option<&EntityDefinition> {
        self.entities
            .get(&entity_type.trim().to_lowercase())
            .map(Arc::as_ref)
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Per-file outcome of the last initialization.
    pub fn report(&self) -> &[LoadResult] {
        &self.report
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "yml" || e == "yaml")
        .unwrap_or(false)
}

/// YAML files under `root`, sorted by file name within each directory.
/// Dotfiles and dot-directories below the root are skipped.
fn yaml_files(root: &Path, report: &mut Vec<LoadResult>) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e) || e.file_type().is_file());

    for entry in walker {
        let entry = entry.map_err(|e| RuleError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let reason = if entry.depth() > 0 && is_hidden(&entry) {
            Some("dotfile")
        } else if !is_yaml(path) {
            Some("not a YAML file")
        } else {
            None
        };
        match reason {
            Some(reason) => report.push(LoadResult {
                path: path.to_path_buf(),
                status: LoadStatus::Skipped {
                    reason: reason.to_string(),
                },
            }),
            None => files.push(path.to_path_buf()),
        }
    }
    Ok(files)
}
