//! Per-output results of a generation run.

use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to one output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rendered and written.
    Generated,
    /// Output newer than its template; left alone.
    UpToDate,
    /// Dry run: would be generated.
    Planned,
    /// Deleted by a clean run.
    Removed,
    /// Clean run found nothing to delete.
    Absent,
    Failed(String),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Generated => write!(f, "generated"),
            Outcome::UpToDate => write!(f, "up to date"),
            Outcome::Planned => write!(f, "planned"),
            Outcome::Removed => write!(f, "removed"),
            Outcome::Absent => write!(f, "absent"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One output of one template. Paths are relative to the generator root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub template: PathBuf,
    pub rule: String,
    pub output: PathBuf,
    pub outcome: Outcome,
}

/// A template that resolved to a rule, whether or not the rule yields outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateRecord {
    pub template: PathBuf,
    pub rule: String,
}

/// Ordered results of a run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    records: Vec<OutputRecord>,
    templates: Vec<TemplateRecord>,
}

impl GenerationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, record: OutputRecord) {
        self.records.push(record);
    }

    pub(crate) fn template_seen(&mut self, template: TemplateRecord) {
        self.templates.push(template);
    }

    pub fn records(&self) -> &[OutputRecord] {
        &self.records
    }

    /// Templates that resolved to a rule, in processing order.
    pub fn templates(&self) -> &[TemplateRecord] {
        &self.templates
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn outputs_of<'a>(&'a self, template: &'a Path) -> impl Iterator<Item = &'a OutputRecord> {
        self.records.iter().filter(move |r| r.template == template)
    }

    pub fn count(&self, outcome: &Outcome) -> usize {
        self.records.iter().filter(|r| &r.outcome == outcome).count()
    }

    pub fn generated(&self) -> usize {
        self.count(&Outcome::Generated)
    }

    pub fn up_to_date(&self) -> usize {
        self.count(&Outcome::UpToDate)
    }

    pub fn planned(&self) -> usize {
        self.count(&Outcome::Planned)
    }

    pub fn removed(&self) -> usize {
        self.count(&Outcome::Removed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.iter().filter(|r| r.outcome.is_failure())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Output paths with the given outcome, in processing order.
    pub fn outputs_with(&self, outcome: &Outcome) -> Vec<&PathBuf> {
        self.records
            .iter()
            .filter(|r| &r.outcome == outcome)
            .map(|r| &r.output)
            .collect()
    }
}
