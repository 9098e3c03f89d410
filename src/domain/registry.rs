//! Directory-scoped rule registry with a global fallback rule.

use std::sync::Arc;

use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::path_key::PathKey;
use crate::domain::path_tree::PathTree;
use crate::domain::rule::Rule;

/// Maps relative directories to ordered rule lists.
///
/// Rule order within a directory matters: the first rule whose pattern
/// matches a filename wins. The default rule is only consulted when no
/// directory rule matches.
#[derive(Debug, Default)]
pub struct ActionRegistry {
    rules: PathTree<Vec<Arc<Rule>>>,
    default_rule: Option<Arc<Rule>>,
    directories: usize,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rule` to the list for `location`.
    #[instrument(level = "debug", skip(self, rule), fields(rule = %rule))]
    pub fn register(&mut self, location: &PathKey, rule: Rule) -> DomainResult<()> {
        rule.validate()?;
        let rule = Arc::new(rule);

        match self.rules.retrieve_element_mut(location) {
            Ok(Some(list)) => list.push(rule),
            _ => {
                self.rules.add_element(location, vec![rule], false)?;
                self.directories += 1;
            }
        }
        Ok(())
    }

    /// Set the fallback rule. Only one may ever be registered.
    #[instrument(level = "debug", skip(self, rule), fields(rule = %rule))]
    pub fn register_default(&mut self, rule: Rule) -> DomainResult<()> {
        if let Some(existing) = &self.default_rule {
            return Err(DomainError::DuplicateDefaultRule {
                existing: existing.to_string(),
            });
        }
        rule.validate()?;
        self.default_rule = Some(Arc::new(rule));
        Ok(())
    }

    /// Rule for `filename` inside directory `location`, if any.
    pub fn resolve(&self, location: &PathKey, filename: &str) -> Option<&Arc<Rule>> {
        let directory_rule = self
            .rules_for(location)
            .iter()
            .find(|rule| rule.matches(filename));

        if let Some(rule) = directory_rule {
            debug!("resolve: '{}' in '{}' -> {}", filename, location, rule);
            return Some(rule);
        }

        let fallback = self
            .default_rule
            .as_ref()
            .filter(|rule| rule.matches(filename));
        match fallback {
            Some(rule) => debug!("resolve: '{}' in '{}' -> default {}", filename, location, rule),
            None => debug!("resolve: no rule for '{}' in '{}'", filename, location),
        }
        fallback
    }

    /// Rules registered for exactly `location`, in registration order.
    pub fn rules_for(&self, location: &PathKey) -> &[Arc<Rule>] {
        self.rules.find(location).map_or(&[], Vec::as_slice)
    }

    pub fn default_rule(&self) -> Option<&Arc<Rule>> {
        self.default_rule.as_ref()
    }

    /// Number of directories holding at least one rule.
    pub fn directory_count(&self) -> usize {
        self.directories
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty() && self.default_rule.is_none()
    }

    /// Forget every registration, including the default rule.
    pub fn clear(&mut self) {
        self.rules.clear();
        self.default_rule = None;
        self.directories = 0;
    }

    /// Tree view of the registered directories and their rules.
    pub fn to_tree(&self) -> Tree<String> {
        let mut tree = self.rules.to_tree(".", |rules| {
            rules
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        });
        if let Some(rule) = &self.default_rule {
            tree.push(Tree::new(format!("(default) {rule}")));
        }
        tree
    }
}
