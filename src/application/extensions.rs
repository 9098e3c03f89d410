//! Input -> output file extension table.

use std::collections::BTreeMap;

use tracing::debug;

use crate::application::{ApplicationError, ApplicationResult};

/// Which template extensions are recognized, and what each one becomes.
///
/// Extensions are stored without their leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionMap {
    map: BTreeMap<String, String>,
}

impl ExtensionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `input` to `output`.
    ///
    /// Re-mapping an existing input to a different output requires `force`;
    /// registering the identical pair again is accepted.
    pub fn register(&mut self, input: &str, output: &str, force: bool) -> ApplicationResult<()> {
        let input = strip_dot(input);
        let output = strip_dot(output);

        if let Some(existing) = self.map.get(input) {
            if existing != output && !force {
                return Err(ApplicationError::DuplicateExtension {
                    input: input.to_string(),
                    existing: existing.clone(),
                });
            }
        }
        debug!("extension: .{} -> .{}", input, output);
        self.map.insert(input.to_string(), output.to_string());
        Ok(())
    }

    /// Output extension for `input`, if registered.
    pub fn get(&self, input: &str) -> Option<&str> {
        self.map.get(strip_dot(input)).map(String::as_str)
    }

    pub fn contains(&self, input: &str) -> bool {
        self.map.contains_key(strip_dot(input))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(i, o)| (i.as_str(), o.as_str()))
    }
}

fn strip_dot(ext: &str) -> &str {
    ext.strip_prefix('.').unwrap_or(ext)
}
