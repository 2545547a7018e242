//! Tests for the rule registry.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use validus_core::error::ErrorCode;

use super::*;

fn rule_yaml(id: &str, entity_type: &str, event_types: &str, category: &str) -> String {
    format!(
        r#"
apiVersion: v1
kind: ValidationRule
metadata:
  id: {id}
  name: {id}
spec:
  entity_type: {entity_type}
  event_types: {event_types}
  category: {category}
  condition:
    required: {entity_type}-name
  message: "{entity_type} has no name"
"#
    )
}

const ENTITY_YAML: &str = r#"
apiVersion: v1
kind: EntityDefinition
metadata:
  id: pserver-identity
  name: pserver identity
spec:
  entity_type: pserver
  keys: [hostname]
"#;

fn roots(dir: &TempDir) -> Vec<PathBuf> {
    vec![dir.path().to_path_buf()]
}

#[test]
fn indexes_by_entity_and_event_type() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.yml"),
        rule_yaml("vserver-name", "vserver", "[AAI-EVENT, UPDATE]", "MISSING_ATTR"),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.yaml"),
        rule_yaml("pserver-name", "pserver", "[AAI-EVENT]", "MISSING_ATTR"),
    )
    .unwrap();

    let registry = RuleRegistry::initialise(&roots(&dir)).unwrap();
    assert_eq!(registry.rule_count(), 2);
    assert_eq!(registry.rules_for("vserver", "AAI-EVENT").len(), 1);
    assert_eq!(registry.rules_for("VSERVER", "update").len(), 1);
    assert_eq!(registry.rules_for("pserver", "AAI-EVENT")[0].id(), "pserver-name");
    assert!(registry.rules_for("pserver", "UPDATE").is_empty());
    assert!(registry.is_known_entity_type("PServer"));
    assert!(!registry.is_known_entity_type("tenant"));
}

#[test]
fn event_types_differing_in_case_index_the_rule_once() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.yml"),
        rule_yaml("vserver-name", "vserver", "[AAI-EVENT, aai-event, UPDATE]", "MISSING_ATTR"),
    )
    .unwrap();

    let registry = RuleRegistry::initialise(&roots(&dir)).unwrap();
    assert_eq!(registry.rule_count(), 1);
    assert_eq!(registry.rules_for("vserver", "AAI-EVENT").len(), 1);
    assert_eq!(registry.rules_for("vserver", "update").len(), 1);
}

#[test]
fn rules_keep_file_name_order_across_subdirectories() {
    let dir = TempDir::new().unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();
    fs::write(
        dir.path().join("nested/02-second.yml"),
        rule_yaml("second", "vserver", "[AAI-EVENT]", "B"),
    )
    .unwrap();
    fs::write(
        dir.path().join("01-first.yml"),
        rule_yaml("first", "vserver", "[AAI-EVENT]", "A"),
    )
    .unwrap();

    let registry = RuleRegistry::initialise(&roots(&dir)).unwrap();
    let ids: Vec<_> = registry
        .rules_for("vserver", "AAI-EVENT")
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["first", "second"]);
}

#[test]
fn missing_root_is_tolerated() {
    let dir = TempDir::new().unwrap();
    let registry = RuleRegistry::initialise(&[dir.path().join("absent")]).unwrap();
    assert_eq!(registry.rule_count(), 0);
    assert!(registry.rules_for("vserver", "AAI-EVENT").is_empty());
}

#[test]
fn skips_dotfiles_non_yaml_and_disabled_rules() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("rule.yml"),
        rule_yaml("vserver-name", "vserver", "[AAI-EVENT]", "MISSING_ATTR"),
    )
    .unwrap();
    fs::write(
        dir.path().join(".hidden.yml"),
        rule_yaml("hidden", "vserver", "[AAI-EVENT]", "X"),
    )
    .unwrap();
    fs::write(dir.path().join("readme.txt"), "not a rule").unwrap();
    fs::write(
        dir.path().join("disabled.yml"),
        rule_yaml("dormant", "tenant", "[AAI-EVENT]", "X")
            .replace("  name: dormant", "  name: dormant\n  enabled: false"),
    )
    .unwrap();

    let registry = RuleRegistry::initialise(&roots(&dir)).unwrap();
    assert_eq!(registry.rule_count(), 1);
    assert!(!registry.is_known_entity_type("tenant"));

    let skipped = registry
        .report()
        .iter()
        .filter(|r| matches!(r.status, LoadStatus::Skipped { .. }))
        .count();
    assert_eq!(skipped, 2);
    assert!(registry
        .report()
        .iter()
        .any(|r| r.status == LoadStatus::Disabled { id: "dormant".into() }));
}

#[test]
fn entity_definitions_are_indexed() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("pserver.yml"), ENTITY_YAML).unwrap();

    let registry = RuleRegistry::initialise(&roots(&dir)).unwrap();
    let def = registry.entity_definition("PSERVER").unwrap();
    assert_eq!(def.spec.keys, vec!["hostname"]);
    // A definition alone does not make the type known to the engine.
    assert!(!registry.is_known_entity_type("pserver"));
}

#[test]
fn malformed_file_fails_with_its_path() {
    let dir = TempDir::new().unwrap();
    let bad = dir.path().join("bad.yml");
    fs::write(&bad, "apiVersion: v1\nkind: ValidationRule\nmetadata: [oops").unwrap();

    let err = RuleRegistry::initialise(&roots(&dir)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::RuleFileInvalid);
    assert_eq!(err.path(), &bad);
}

#[test]
fn invalid_regex_and_template_fail_initialization() {
    let dir = TempDir::new().unwrap();
    let yaml = rule_yaml("bad-regex", "vserver", "[AAI-EVENT]", "X").replace(
        "required: vserver-name",
        "matches: {attribute: vserver-name, pattern: \"(unclosed\"}",
    );
    fs::write(dir.path().join("regex.yml"), yaml).unwrap();
    let err = RuleRegistry::initialise(&roots(&dir)).unwrap_err();
    assert!(err.to_string().contains("invalid pattern"));

    let dir = TempDir::new().unwrap();
    let yaml = rule_yaml("bad-template", "vserver", "[AAI-EVENT]", "X")
        .replace("\"vserver has no name\"", "\"{{ unclosed\"");
    fs::write(dir.path().join("template.yml"), yaml).unwrap();
    let err = RuleRegistry::initialise(&roots(&dir)).unwrap_err();
    assert!(err.to_string().contains("invalid message template"));
}

#[test]
fn unknown_kind_and_empty_id_fail() {
    let dir = TempDir::new().unwrap();
    let yaml = rule_yaml("x", "vserver", "[AAI-EVENT]", "X").replace("ValidationRule", "AnomalyRule");
    fs::write(dir.path().join("kind.yml"), yaml).unwrap();
    assert!(RuleRegistry::initialise(&roots(&dir)).is_err());

    let dir = TempDir::new().unwrap();
    let yaml = rule_yaml("\"\"", "vserver", "[AAI-EVENT]", "X");
    fs::write(dir.path().join("empty-id.yml"), yaml).unwrap();
    let err = RuleRegistry::initialise(&roots(&dir)).unwrap_err();
    assert!(err.to_string().contains("metadata.id"));
}

#[test]
fn duplicate_ids_fail() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("a.yml"),
        rule_yaml("same", "vserver", "[AAI-EVENT]", "X"),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.yml"),
        rule_yaml("same", "pserver", "[AAI-EVENT]", "X"),
    )
    .unwrap();

    let err = RuleRegistry::initialise(&roots(&dir)).unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateRule);
    assert!(matches!(err, RuleError::Duplicate { ref id, .. } if id == "same"));
}
