//! Integration tests for rule registration and first-match resolution.

use std::sync::Arc;

use rstest::rstest;

use genja::domain::{ActionRegistry, Bindings, OutputSpec, PathKey, Rule};

fn rule(name: &str, pattern: &str) -> Rule {
    Rule::new(
        name,
        pattern,
        Arc::new(vec![OutputSpec::new(format!("_{name}"), Bindings::new())]),
    )
    .unwrap()
}

fn registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    let dir = PathKey::from("src/types");
    registry.register(&dir, rule("complex", "*complex*.cpy")).unwrap();
    registry.register(&dir, rule("any-cpy", "*.cpy")).unwrap();
    registry.register(&dir, rule("header", "*.cpd")).unwrap();
    registry.register(&PathKey::from("src"), rule("top", "*")).unwrap();
    registry.register_default(rule("fallback", "*.cpx")).unwrap();
    registry
}

#[rstest]
#[case("src/types", "sum_complex.cpy", Some("complex"))]
#[case("src/types", "sum.cpy", Some("any-cpy"))]
#[case("src/types", "decl.cpd", Some("header"))]
#[case("src/types", "other.cpx", Some("fallback"))]
#[case("src/types", "readme.md", None)]
#[case("src", "anything.txt", Some("top"))]
#[case("docs", "page.cpx", Some("fallback"))]
#[case("docs", "page.cpy", None)]
fn given_registry_when_resolving_then_first_matching_rule_wins(
    #[case] dir: &str,
    #[case] filename: &str,
    #[case] expected: Option<&str>,
) {
    let registry = registry();

    let resolved = registry.resolve(&PathKey::from(dir), filename);

    assert_eq!(resolved.map(|r| r.name()), expected);
}

#[test]
fn given_registration_order_reversed_then_resolution_changes() {
    let mut registry = ActionRegistry::new();
    let dir = PathKey::from("d");
    registry.register(&dir, rule("broad", "*.cpy")).unwrap();
    registry.register(&dir, rule("narrow", "*complex*.cpy")).unwrap();

    let resolved = registry.resolve(&dir, "sum_complex.cpy").unwrap();

    assert_eq!(resolved.name(), "broad");
}

#[test]
fn given_registry_when_rendering_tree_then_lists_directories_and_default() {
    let rendered = registry().to_tree().to_string();

    assert!(rendered.contains("types"), "{rendered}");
    assert!(rendered.contains("complex [*complex*.cpy]"), "{rendered}");
    assert!(rendered.contains("(default) fallback [*.cpx]"), "{rendered}");
}

#[test]
fn given_registry_then_counts_directories_with_rules() {
    let registry = registry();

    assert_eq!(registry.directory_count(), 2);
    assert_eq!(registry.rules_for(&PathKey::from("src/types")).len(), 3);
    assert!(registry.rules_for(&PathKey::from("nowhere")).is_empty());
}
