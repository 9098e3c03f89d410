//! Generation rules: a filename pattern plus the outputs it expands to.

use std::collections::BTreeMap;
use std::fmt;
use std::path::is_separator;
use std::sync::Arc;

use glob::{MatchOptions, Pattern};

use crate::domain::error::{DomainError, DomainResult};

/// Variables handed to the template renderer.
pub type Bindings = BTreeMap<String, toml::Value>;

/// One output of a rule: appended to the template stem, rendered with
/// `bindings`.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub suffix: String,
    pub bindings: Bindings,
}

impl OutputSpec {
    pub fn new(suffix: impl Into<String>, bindings: Bindings) -> Self {
        Self {
            suffix: suffix.into(),
            bindings,
        }
    }
}

/// Producer of a rule's outputs.
///
/// Every call to [`outputs`](Self::outputs) starts a fresh, finite iteration
/// that yields the same sequence.
pub trait OutputSource: Send + Sync {
    fn outputs(&self) -> Box<dyn Iterator<Item = OutputSpec> + '_>;
}

impl OutputSource for Vec<OutputSpec> {
    fn outputs(&self) -> Box<dyn Iterator<Item = OutputSpec> + '_> {
        Box::new(self.iter().cloned())
    }
}

/// Adapter turning a closure into an [`OutputSource`].
pub struct FnSource<F>(pub F);

impl<F, I> OutputSource for FnSource<F>
where
    F: Fn() -> I + Send + Sync,
    I: IntoIterator<Item = OutputSpec>,
    I::IntoIter: 'static,
{
    fn outputs(&self) -> Box<dyn Iterator<Item = OutputSpec> + '_> {
        Box::new((self.0)().into_iter())
    }
}

/// Glob options for template file names.
///
/// Matching is case-insensitive on Windows only, like the host filesystem.
pub fn filename_match_options() -> MatchOptions {
    MatchOptions {
        case_sensitive: !cfg!(windows),
        require_literal_separator: false,
        require_literal_leading_dot: false,
    }
}

/// Compile a glob pattern, mapping failures to [`DomainError::InvalidPattern`].
pub fn compile_pattern(pattern: &str) -> DomainResult<Pattern> {
    Pattern::new(pattern).map_err(|e| DomainError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.msg.to_string(),
    })
}

/// A (pattern, output source) pair deciding how matching templates expand.
#[derive(Clone)]
pub struct Rule {
    name: String,
    pattern: Pattern,
    source: Arc<dyn OutputSource>,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        pattern: &str,
        source: Arc<dyn OutputSource>,
    ) -> DomainResult<Self> {
        Ok(Self {
            name: name.into(),
            pattern: compile_pattern(pattern)?,
            source,
        })
    }

    /// Rule whose outputs come from a closure.
    pub fn from_fn<F, I>(name: impl Into<String>, pattern: &str, f: F) -> DomainResult<Self>
    where
        F: Fn() -> I + Send + Sync + 'static,
        I: IntoIterator<Item = OutputSpec>,
        I::IntoIter: 'static,
    {
        Self::new(name, pattern, Arc::new(FnSource(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.pattern
            .matches_with(filename, filename_match_options())
    }

    pub fn outputs(&self) -> Box<dyn Iterator<Item = OutputSpec> + '_> {
        self.source.outputs()
    }

    /// Check what the type system cannot: every suffix must stay a plain
    /// filename fragment, and no two outputs may share a suffix.
    pub fn validate(&self) -> DomainResult<()> {
        let mut seen = std::collections::HashSet::new();
        for output in self.outputs() {
            if output.suffix.chars().any(is_separator) || output.suffix.contains('\0') {
                return Err(self.malformed(format!(
                    "suffix '{}' must not contain path separators",
                    output.suffix
                )));
            }
            if !seen.insert(output.suffix.clone()) {
                return Err(self.malformed(format!(
                    "suffix '{}' is produced more than once",
                    output.suffix
                )));
            }
        }
        Ok(())
    }

    fn malformed(&self, reason: String) -> DomainError {
        DomainError::MalformedRule {
            rule: self.name.clone(),
            reason,
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.pattern.as_str())
    }
}
