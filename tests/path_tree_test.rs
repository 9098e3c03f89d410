//! Integration tests for path keys and the path-keyed trie.

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use rstest::rstest;

use genja::domain::{DomainError, InsertMode, PathKey, PathTree};

// ============================================================
// PathKey
// ============================================================

#[rstest]
#[case("", "")]
#[case("a", "")]
#[case("", "x/y")]
#[case("a/b", "c")]
#[case("a/b/c", "d/e/f")]
fn given_two_keys_when_concatenated_then_slices_recover_both(#[case] left: &str, #[case] right: &str) {
    let a = PathKey::from(left);
    let b = PathKey::from(right);

    let joined = a.concat(&b).unwrap();

    assert_eq!(joined.segment_count(), a.segment_count() + b.segment_count());
    assert_eq!(joined.slice(0..a.segment_count()), a);
    assert_eq!(joined.slice(a.segment_count()..), b);
}

#[test]
fn given_keys_with_different_separators_when_concatenated_then_errors() {
    let slash = PathKey::parse("a/b", '/');
    let colon = PathKey::parse("c:d", ':');

    let err = slash.concat(&colon).unwrap_err();

    assert!(matches!(err, DomainError::SeparatorMismatch { .. }));
}

#[test]
fn given_same_segments_with_different_separators_then_keys_are_equal() {
    assert_eq!(PathKey::parse("a/b", '/'), PathKey::parse("a.b", '.'));
    assert_eq!(PathKey::parse("a.b", '.').to_string_with('/'), "a/b");
}

#[test]
fn given_key_when_listing_cumulative_prefixes_then_grows_one_segment_at_a_time() {
    let key = PathKey::from("a/b/c");

    let prefixes: Vec<String> = key.cumulative().map(|k| k.to_string()).collect();

    assert_eq!(prefixes, vec!["a", "a/b", "a/b/c"]);
}

// ============================================================
// PathTree
// ============================================================

fn distinct_prefixes(keys: &[&str]) -> usize {
    keys.iter()
        .flat_map(|k| PathKey::from(*k).cumulative().map(|p| p.to_string()).collect::<Vec<_>>())
        .collect::<BTreeSet<_>>()
        .len()
}

#[rstest]
#[case(&["a"])]
#[case(&["a/b/c", "a/b/d", "e"])]
#[case(&["x", "x/y", "x/y/z/w"])]
fn given_unique_insertions_then_node_count_equals_distinct_prefixes(#[case] keys: &[&str]) {
    let mut tree = PathTree::new();

    for (i, key) in keys.iter().enumerate() {
        tree.add_unique_element(&PathKey::from(*key), i).unwrap();
    }

    assert_eq!(tree.node_count(), distinct_prefixes(keys));
    for (i, key) in keys.iter().enumerate() {
        assert_eq!(tree.retrieve_element(&PathKey::from(*key)).unwrap(), Some(&i));
    }
}

#[test]
fn given_existing_key_when_adding_unique_then_errors_and_keeps_payload() {
    let mut tree = PathTree::new();
    let key = PathKey::from("a/b");
    tree.add_unique_element(&key, "first").unwrap();

    let err = tree.add_unique_element(&key, "second").unwrap_err();

    assert_eq!(
        err,
        DomainError::AlreadyExists {
            path: "a/b".to_string()
        }
    );
    assert_eq!(tree.find(&key), Some(&"first"));
}

#[test]
fn given_existing_key_when_adding_element_then_overwrites_without_new_nodes() {
    let mut tree = PathTree::new();
    let key = PathKey::from("a/b");
    tree.add_unique_element(&key, 1).unwrap();
    let count = tree.node_count();

    let (_, previous) = tree.add_element(&key, 2, false).unwrap();

    assert_eq!(previous, Some(1));
    assert_eq!(tree.node_count(), count);
    assert_eq!(tree.find(&key), Some(&2));
}

#[test]
fn given_discard_old_when_overwriting_then_old_payload_not_returned() {
    let mut tree = PathTree::new();
    let key = PathKey::from("k");
    tree.add_element(&key, "old", false).unwrap();

    let (_, previous) = tree
        .insert(&key, "new", InsertMode::Overwrite { discard_old: true })
        .unwrap();

    assert_eq!(previous, None);
    assert_eq!(tree.find(&key), Some(&"new"));
}

#[test]
fn given_missing_path_when_retrieving_then_names_first_missing_segment() {
    let mut tree = PathTree::new();
    tree.add_unique_element(&PathKey::from("a/b"), 0).unwrap();

    let err = tree.retrieve_element(&PathKey::from("a/x/y")).unwrap_err();

    assert_eq!(
        err,
        DomainError::PathNotFound {
            segment: "x".to_string(),
            path: "a/x/y".to_string()
        }
    );
}

#[test]
fn given_linking_node_when_retrieving_then_ok_none() {
    let mut tree = PathTree::new();
    tree.add_unique_element(&PathKey::from("a/b"), 0).unwrap();

    assert_eq!(tree.retrieve_element(&PathKey::from("a")).unwrap(), None);
    assert_eq!(tree.retrieve_element_or_default(&PathKey::from("a"), &9), &9);
    assert_eq!(tree.retrieve_element_or_default(&PathKey::from("zz"), &9), &9);
    assert_eq!(tree.depth(&PathKey::from("a/b")), Some(2));
}

#[test]
fn given_root_key_when_inserting_then_stores_root_payload_once() {
    let mut tree = PathTree::new();
    let root = PathKey::default();

    tree.add_unique_element(&root, "root").unwrap();

    assert_eq!(tree.find(&root), Some(&"root"));
    assert_eq!(tree.node_count(), 0);
    assert!(tree.add_unique_element(&root, "again").is_err());
}

#[test]
fn given_populated_tree_when_cleared_then_releases_all_payloads() {
    let mut tree = PathTree::new();
    tree.add_unique_element(&PathKey::from("a/b"), 1).unwrap();
    tree.add_unique_element(&PathKey::from("a/c"), 2).unwrap();
    tree.add_unique_element(&PathKey::from("d"), 3).unwrap();

    let mut released = tree.clear();
    released.sort();

    assert_eq!(released, vec![1, 2, 3]);
    assert!(tree.is_empty());
    assert_eq!(tree.node_count(), 0);
    assert!(!tree.contains(&PathKey::from("a")));

    tree.add_unique_element(&PathKey::from("a/b"), 4).unwrap();
    assert_eq!(tree.node_count(), 2);
}
