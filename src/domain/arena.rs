use std::collections::BTreeMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::error::{DomainError, DomainResult};

/// Handle to a node stored in a [`NodeArena`].
pub type NodeId = Index;

/// Tree node in the arena-based hierarchy structure.
#[derive(Debug)]
pub struct TreeNode<T> {
    /// Payload, None for pure linking nodes
    pub payload: Option<T>,
    /// Index of parent node in the arena, None for roots and detached nodes
    pub parent: Option<NodeId>,
    /// Named child links; the arena owns the nodes, this map only names them
    pub children: BTreeMap<String, NodeId>,
    /// Distance from the root. None until the node is attached somewhere.
    pub depth: Option<usize>,
}

impl<T> TreeNode<T> {
    fn new(payload: Option<T>, depth: Option<usize>) -> Self {
        Self {
            payload,
            parent: None,
            children: BTreeMap::new(),
            depth,
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// Arena holding a forest of named trees.
///
/// Parent links are plain indices and never keep a node alive, so detaching
/// is only a matter of rewriting links.
#[derive(Debug)]
pub struct NodeArena<T> {
    arena: Arena<TreeNode<T>>,
}

impl<T> Default for NodeArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> NodeArena<T> {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
        }
    }

    /// Number of live nodes, attached or not.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Store a node that is not attached anywhere yet (depth unknown).
    pub fn insert(&mut self, payload: Option<T>) -> NodeId {
        self.arena.insert(TreeNode::new(payload, None))
    }

    /// Store a root node (depth 0).
    pub fn insert_root(&mut self, payload: Option<T>) -> NodeId {
        self.arena.insert(TreeNode::new(payload, Some(0)))
    }

    pub fn get(&self, id: NodeId) -> Option<&TreeNode<T>> {
        self.arena.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TreeNode<T>> {
        self.arena.get_mut(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains(id)
    }

    pub fn depth(&self, id: NodeId) -> Option<usize> {
        self.arena.get(id).and_then(|n| n.depth)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent)
    }

    pub fn payload(&self, id: NodeId) -> Option<&T> {
        self.arena.get(id).and_then(|n| n.payload.as_ref())
    }

    pub fn payload_mut(&mut self, id: NodeId) -> Option<&mut T> {
        self.arena.get_mut(id).and_then(|n| n.payload.as_mut())
    }

    /// Replace the payload, returning the previous one.
    pub fn set_payload(&mut self, id: NodeId, payload: T) -> DomainResult<Option<T>> {
        let node = self.arena.get_mut(id).ok_or(DomainError::StaleNode)?;
        Ok(node.payload.replace(payload))
    }

    pub fn take_payload(&mut self, id: NodeId) -> Option<T> {
        self.arena.get_mut(id).and_then(|n| n.payload.take())
    }

    pub fn child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.arena
            .get(parent)
            .and_then(|n| n.children.get(name).copied())
    }

    /// Like [`child`](Self::child) but falls back to `fallback`. Never fails.
    pub fn child_or(&self, parent: NodeId, name: &str, fallback: NodeId) -> NodeId {
        self.child(parent, name).unwrap_or(fallback)
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.arena.get(id).map_or(0, |n| n.children.len())
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.child_count(id) > 0
    }

    /// Named children of `id`, ordered by name.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.arena
            .get(id)
            .into_iter()
            .flat_map(|n| n.children.iter().map(|(name, &idx)| (name.as_str(), idx)))
    }

    /// Attach `child` under `parent` as `name`.
    ///
    /// Any node already bound to `name` is unlinked (not destroyed) and its id
    /// is returned so the caller can keep using it. A child that was attached
    /// elsewhere is moved, since a node has exactly one parent.
    #[instrument(level = "trace", skip(self))]
    pub fn set_child(
        &mut self,
        parent: NodeId,
        name: &str,
        child: NodeId,
    ) -> DomainResult<Option<NodeId>> {
        if !self.arena.contains(parent) || !self.arena.contains(child) {
            return Err(DomainError::StaleNode);
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(DomainError::InvalidLocation {
                location: name.to_string(),
                reason: "node cannot become a descendant of itself".to_string(),
            });
        }

        self.unlink_from_parent(child);

        let parent_depth = self.depth(parent);
        let displaced = self
            .arena
            .get_mut(parent)
            .and_then(|p| p.children.insert(name.to_string(), child));

        if let Some(old) = displaced.filter(|&old| old != child) {
            if let Some(node) = self.arena.get_mut(old) {
                node.parent = None;
            }
            self.refresh_depths(old, Some(0));
        }

        if let Some(node) = self.arena.get_mut(child) {
            node.parent = Some(parent);
        }
        self.refresh_depths(child, parent_depth.map(|d| d + 1));

        Ok(displaced.filter(|&old| old != child))
    }

    /// Attach `child` under `parent`, failing if `name` is already bound.
    pub fn set_unique_child(
        &mut self,
        parent: NodeId,
        name: &str,
        child: NodeId,
    ) -> DomainResult<()> {
        if self.child(parent, name).is_some() {
            return Err(DomainError::ChildExists {
                name: name.to_string(),
            });
        }
        self.set_child(parent, name, child).map(|_| ())
    }

    /// Unlink every child of `id` without destroying it.
    ///
    /// Former children become roots of their own subtrees (depth 0) and stay
    /// in the arena until [`remove_subtree`](Self::remove_subtree) is called.
    #[instrument(level = "trace", skip(self))]
    pub fn detach_children(&mut self, id: NodeId) -> Vec<(String, NodeId)> {
        let children = match self.arena.get_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Vec::new(),
        };

        let detached: Vec<(String, NodeId)> = children.into_iter().collect();
        for (_, child) in &detached {
            if let Some(node) = self.arena.get_mut(*child) {
                node.parent = None;
            }
            self.refresh_depths(*child, Some(0));
        }
        detached
    }

    /// Remove `id` and all its descendants, returning their payloads in
    /// pre-order.
    pub fn remove_subtree(&mut self, id: NodeId) -> Vec<T> {
        self.unlink_from_parent(id);
        let ids: Vec<NodeId> = self.descendants(id).collect();
        ids.into_iter()
            .filter_map(|idx| self.arena.remove(idx))
            .filter_map(|node| node.payload)
            .collect()
    }

    /// Pre-order traversal starting at (and including) `id`.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_, T> {
        Descendants::new(self, id)
    }

    /// Nodes below `id` that have no children (`id` itself if it is a leaf).
    pub fn leaves(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .filter(|&idx| !self.has_children(idx))
            .collect()
    }

    fn unlink_from_parent(&mut self, id: NodeId) {
        let Some(parent) = self.parent(id) else {
            return;
        };
        if let Some(p) = self.arena.get_mut(parent) {
            p.children.retain(|_, &mut idx| idx != id);
        }
        if let Some(node) = self.arena.get_mut(id) {
            node.parent = None;
        }
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, mut id: NodeId) -> bool {
        loop {
            if id == candidate {
                return true;
            }
            match self.parent(id) {
                Some(parent) => id = parent,
                None => return false,
            }
        }
    }

    fn refresh_depths(&mut self, id: NodeId, depth: Option<usize>) {
        let mut stack = vec![(id, depth)];
        while let Some((idx, depth)) = stack.pop() {
            if let Some(node) = self.arena.get_mut(idx) {
                node.depth = depth;
                let next = depth.map(|d| d + 1);
                stack.extend(node.children.values().map(|&child| (child, next)));
            }
        }
    }
}

pub struct Descendants<'a, T> {
    arena: &'a NodeArena<T>,
    stack: Vec<NodeId>,
}

impl<'a, T> Descendants<'a, T> {
    fn new(arena: &'a NodeArena<T>, start: NodeId) -> Self {
        let stack = if arena.contains(start) {
            vec![start]
        } else {
            Vec::new()
        };
        Self { arena, stack }
    }
}

impl<T> Iterator for Descendants<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(node) = self.arena.get(current) {
            // Push children in reverse order for name-ordered traversal
            self.stack.extend(node.children.values().rev().copied());
        }
        Some(current)
    }
}
