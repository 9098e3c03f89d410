//! Trie keyed by [`PathKey`].
//!
//! Nodes are addressed by the whole path from an internal, payload-less
//! root. Linking nodes are created on the fly, so the tree behaves like a
//! forest of named subtrees.

use termtree::Tree;
use tracing::{instrument, trace};

use crate::domain::arena::{NodeArena, NodeId};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path_key::PathKey;

/// What to do when the terminal node of an insertion already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    /// Fail with [`DomainError::AlreadyExists`].
    Unique,
    /// Replace the payload. The old payload is dropped first when
    /// `discard_old` is set, otherwise it is handed back to the caller.
    Overwrite { discard_old: bool },
}

#[derive(Debug)]
pub struct PathTree<T> {
    nodes: NodeArena<T>,
    root: NodeId,
    node_count: usize,
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PathTree<T> {
    pub fn new() -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.insert_root(None);
        Self {
            nodes,
            root,
            node_count: 0,
        }
    }

    /// Number of nodes created through this tree's insertion API.
    ///
    /// The internal root is not counted.
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_empty(&self) -> bool {
        !self.nodes.has_children(self.root) && self.nodes.payload(self.root).is_none()
    }

    /// Drop every node below the root.
    ///
    /// Subtrees are unlinked first and then released; their payloads are
    /// returned so callers can keep whatever they still need.
    #[instrument(level = "debug", skip(self))]
    pub fn clear(&mut self) -> Vec<T> {
        let mut released: Vec<T> = self.nodes.take_payload(self.root).into_iter().collect();
        for (_, child) in self.nodes.detach_children(self.root) {
            released.extend(self.nodes.remove_subtree(child));
        }
        self.node_count = 0;
        released
    }

    /// Store `value` at `location`; the location must not exist yet.
    pub fn add_unique_element(&mut self, location: &PathKey, value: T) -> DomainResult<NodeId> {
        self.insert(location, value, InsertMode::Unique)
            .map(|(node, _)| node)
    }

    /// Store `value` at `location`, replacing any existing payload.
    ///
    /// Returns the terminal node and, unless `discard_old` is set, the
    /// payload that was replaced.
    pub fn add_element(
        &mut self,
        location: &PathKey,
        value: T,
        discard_old: bool,
    ) -> DomainResult<(NodeId, Option<T>)> {
        self.insert(location, value, InsertMode::Overwrite { discard_old })
    }

    /// Create the entry at `location` according to `mode`.
    ///
    /// Missing parent nodes are created payload-less. The empty key addresses
    /// the internal root.
    #[instrument(level = "trace", skip(self, value))]
    pub fn insert(
        &mut self,
        location: &PathKey,
        value: T,
        mode: InsertMode,
    ) -> DomainResult<(NodeId, Option<T>)> {
        let Some(last) = location.last() else {
            return self.overwrite(self.root, location, value, mode);
        };

        let parent = self.get_or_create_node(&location.parent())?;
        match self.nodes.child(parent, last) {
            None => {
                let node = self.nodes.insert(Some(value));
                self.nodes.set_child(parent, last, node)?;
                self.node_count += 1;
                Ok((node, None))
            }
            Some(node) => self.overwrite(node, location, value, mode),
        }
    }

    fn overwrite(
        &mut self,
        node: NodeId,
        location: &PathKey,
        value: T,
        mode: InsertMode,
    ) -> DomainResult<(NodeId, Option<T>)> {
        match mode {
            InsertMode::Unique => {
                // The root always exists; it only counts as taken once it holds a payload
                if node != self.root || self.nodes.payload(node).is_some() {
                    return Err(DomainError::AlreadyExists {
                        path: location.to_string(),
                    });
                }
                self.nodes.set_payload(node, value)?;
                Ok((node, None))
            }
            InsertMode::Overwrite { discard_old } => {
                if discard_old {
                    drop(self.nodes.take_payload(node));
                }
                let previous = self.nodes.set_payload(node, value)?;
                Ok((node, previous))
            }
        }
    }

    /// Walk to the node at `location`, creating missing nodes payload-less.
    fn get_or_create_node(&mut self, location: &PathKey) -> DomainResult<NodeId> {
        let mut node = self.root;
        for segment in location.segments() {
            node = match self.nodes.child(node, segment) {
                Some(child) => child,
                None => {
                    let child = self.nodes.insert(None);
                    self.nodes.set_child(node, segment, child)?;
                    self.node_count += 1;
                    trace!("created linking node '{}' for '{}'", segment, location);
                    child
                }
            };
        }
        Ok(node)
    }

    /// Walk to the node at `location`; the first missing segment is reported.
    fn find_node(&self, location: &PathKey) -> DomainResult<NodeId> {
        let mut node = self.root;
        for segment in location.segments() {
            node = self
                .nodes
                .child(node, segment)
                .ok_or_else(|| self.not_found(segment, location))?;
        }
        Ok(node)
    }

    fn not_found(&self, segment: &str, location: &PathKey) -> DomainError {
        DomainError::PathNotFound {
            segment: segment.to_string(),
            path: location.to_string(),
        }
    }

    pub fn contains(&self, location: &PathKey) -> bool {
        self.find_node(location).is_ok()
    }

    /// Payload at `location`.
    ///
    /// Fails if the path does not exist; an existing linking node yields
    /// `Ok(None)`.
    pub fn retrieve_element(&self, location: &PathKey) -> DomainResult<Option<&T>> {
        let node = self.find_node(location)?;
        Ok(self.nodes.payload(node))
    }

    pub fn retrieve_element_mut(&mut self, location: &PathKey) -> DomainResult<Option<&mut T>> {
        let node = self.find_node(location)?;
        Ok(self.nodes.payload_mut(node))
    }

    /// Payload at `location`, or `default` when there is none. Never fails.
    pub fn retrieve_element_or_default<'a>(&'a self, location: &PathKey, default: &'a T) -> &'a T {
        self.find(location).unwrap_or(default)
    }

    /// Payload at `location`, None for absent paths and linking nodes.
    pub fn find(&self, location: &PathKey) -> Option<&T> {
        self.find_node(location)
            .ok()
            .and_then(|node| self.nodes.payload(node))
    }

    /// Depth of the node at `location` (root = 0).
    pub fn depth(&self, location: &PathKey) -> Option<usize> {
        self.find_node(location)
            .ok()
            .and_then(|node| self.nodes.depth(node))
    }

    /// Render the tree structure, naming each node and describing its
    /// payload with `describe`.
    pub fn to_tree<F>(&self, label: &str, describe: F) -> Tree<String>
    where
        F: Fn(&T) -> String,
    {
        let root_label = match self.nodes.payload(self.root) {
            Some(payload) => format!("{label}: {}", describe(payload)),
            None => label.to_string(),
        };
        let mut tree = Tree::new(root_label);
        self.build_tree(self.root, &mut tree, &describe);
        tree
    }

    fn build_tree<F>(&self, node: NodeId, parent_tree: &mut Tree<String>, describe: &F)
    where
        F: Fn(&T) -> String,
    {
        for (name, child) in self.nodes.children(node) {
            let label = match self.nodes.payload(child) {
                Some(payload) => format!("{name}: {}", describe(payload)),
                None => name.to_string(),
            };
            let mut child_tree = Tree::new(label);
            self.build_tree(child, &mut child_tree, describe);
            parent_tree.push(child_tree);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_nested_location_when_adding_then_creates_linking_nodes() {
        let mut tree = PathTree::new();
        tree.add_unique_element(&PathKey::from("a/b/c"), 1).unwrap();

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.retrieve_element(&PathKey::from("a/b")).unwrap(), None);
        assert_eq!(tree.depth(&PathKey::from("a/b/c")), Some(3));
    }

    #[test]
    fn given_root_location_when_adding_unique_twice_then_errors() {
        let mut tree = PathTree::new();
        tree.add_unique_element(&PathKey::default(), 1).unwrap();

        let err = tree.add_unique_element(&PathKey::default(), 2).unwrap_err();

        assert!(matches!(err, DomainError::AlreadyExists { .. }));
        assert_eq!(tree.node_count(), 0);
        assert!(!tree.is_empty());
    }

    #[test]
    fn given_existing_payload_when_overwriting_without_discard_then_returns_old() {
        let mut tree = PathTree::new();
        let key = PathKey::from("x");
        tree.add_element(&key, "old", false).unwrap();

        let (_, previous) = tree.add_element(&key, "new", false).unwrap();
        assert_eq!(previous, Some("old"));

        let (_, previous) = tree.add_element(&key, "newer", true).unwrap();
        assert_eq!(previous, None);
        assert_eq!(tree.find(&key), Some(&"newer"));
    }

    #[test]
    fn given_tree_when_rendered_then_lists_nodes() {
        let mut tree = PathTree::new();
        tree.add_element(&PathKey::from("a/b"), 7, false).unwrap();

        let rendered = tree.to_tree("root", |n| n.to_string()).to_string();

        assert!(rendered.contains("a"));
        assert!(rendered.contains("b: 7"));
    }
}
