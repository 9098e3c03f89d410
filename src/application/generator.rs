//! Generation driver: selects templates, resolves their rule, and renders,
//! plans or cleans every output the rule produces.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glob::Pattern;
use tracing::{debug, info, instrument, warn};

use crate::application::error_ext::IoResultExt;
use crate::application::extensions::ExtensionMap;
use crate::application::report::{GenerationReport, OutputRecord, Outcome, TemplateRecord};
use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{OutputConfig, Settings};
use crate::domain::rule::{compile_pattern, filename_match_options};
use crate::domain::{ActionRegistry, DomainError, OutputSource, OutputSpec, PathKey, Rule};
use crate::infrastructure::traits::{FileSystem, TemplateRenderer};
use crate::util::path::relative_to;

/// Knobs deciding when outputs are rewritten and how warnings are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationPolicy {
    /// A template must be newer than its output by more than this to count as changed.
    pub mtime_tolerance: Duration,
    /// Turn every warning, including per-output failures, into an error.
    pub raise_on_warning: bool,
}

impl Default for GenerationPolicy {
    fn default() -> Self {
        Self {
            mtime_tolerance: Duration::from_secs(1),
            raise_on_warning: false,
        }
    }
}

impl GenerationPolicy {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            mtime_tolerance: Duration::from_secs(settings.mtime_tolerance_secs),
            raise_on_warning: settings.raise_on_warning,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Generate,
    DryRun,
    Clean,
}

/// Which templates to process and what to do with their outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Glob of directories, relative to the root.
    pub dir_pattern: String,
    /// Glob of template file names.
    pub file_pattern: String,
    pub mode: Mode,
    /// Descend into subdirectories of every selected directory.
    pub recursive: bool,
    /// Regenerate even when outputs are up to date.
    pub force: bool,
}

impl Default for GenerateRequest {
    fn default() -> Self {
        Self {
            dir_pattern: ".".to_string(),
            file_pattern: "*".to_string(),
            mode: Mode::Generate,
            recursive: false,
            force: false,
        }
    }
}

impl GenerateRequest {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// A template selected for processing, located relative to the root.
struct Template {
    dir: PathBuf,
    name: String,
    stem: String,
    out_ext: String,
    location: PathKey,
}

pub struct Generator {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    renderer: Arc<dyn TemplateRenderer>,
    policy: GenerationPolicy,
    extensions: ExtensionMap,
    registry: ActionRegistry,
}

impl Generator {
    /// Generator for the tree below `root`, which must be an existing directory.
    pub fn new(
        root: impl AsRef<Path>,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
        policy: GenerationPolicy,
    ) -> ApplicationResult<Self> {
        let root = root.as_ref();
        if !fs.is_dir(root) {
            return Err(ApplicationError::MissingRoot(root.to_path_buf()));
        }
        let root = fs
            .canonicalize(root)
            .with_path_context("resolve root directory", root)?;
        debug!("generator root: {}", root.display());

        Ok(Self {
            root,
            fs,
            renderer,
            policy,
            extensions: ExtensionMap::new(),
            registry: ActionRegistry::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy(&self) -> GenerationPolicy {
        self.policy
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    // ============================================================
    // Registration
    // ============================================================

    pub fn register_extension(
        &mut self,
        input: &str,
        output: &str,
        force: bool,
    ) -> ApplicationResult<()> {
        self.extensions.register(input, output, force)
    }

    pub fn register_extensions<'a, I>(&mut self, extensions: I, force: bool) -> ApplicationResult<()>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (input, output) in extensions {
            self.register_extension(input, output, force)?;
        }
        Ok(())
    }

    pub fn registered_extensions(&self) -> &ExtensionMap {
        &self.extensions
    }

    /// Register `source` for templates in `relative_dir` whose name matches
    /// `pattern`. The rule is named after its pattern.
    pub fn register_action(
        &mut self,
        relative_dir: impl AsRef<Path>,
        pattern: &str,
        source: Arc<dyn OutputSource>,
    ) -> ApplicationResult<()> {
        let rule = Rule::new(pattern, pattern, source)?;
        self.register_rule(relative_dir, rule)
    }

    /// Append `rule` to the rules of `relative_dir`, an existing directory
    /// below the root.
    #[instrument(level = "debug", skip_all, fields(rule = %rule))]
    pub fn register_rule(&mut self, relative_dir: impl AsRef<Path>, rule: Rule) -> ApplicationResult<()> {
        let relative_dir = relative_dir.as_ref();
        let location = PathKey::from_relative_path(relative_dir)?;
        let absolute = self.root.join(relative_dir);
        if !self.fs.is_dir(&absolute) {
            return Err(ApplicationError::MissingDirectory(absolute));
        }
        self.registry.register(&location, rule)?;
        Ok(())
    }

    /// Fallback for templates no directory rule matches. At most one.
    pub fn register_default_action(
        &mut self,
        pattern: &str,
        source: Arc<dyn OutputSource>,
    ) -> ApplicationResult<()> {
        let rule = Rule::new(pattern, pattern, source)?;
        self.register_default_rule(rule)
    }

    pub fn register_default_rule(&mut self, rule: Rule) -> ApplicationResult<()> {
        self.registry.register_default(rule)?;
        Ok(())
    }

    /// Register the extensions, rules and default rule declared in `settings`.
    pub fn apply_settings(&mut self, settings: &Settings) -> ApplicationResult<()> {
        self.register_extensions(
            settings
                .extensions
                .iter()
                .map(|(i, o)| (i.as_str(), o.as_str())),
            false,
        )?;

        for rule in &settings.rules {
            let name = rule.name.as_deref().unwrap_or(&rule.pattern);
            let rule_def = Rule::new(name, &rule.pattern, outputs_from_config(&rule.outputs))?;
            self.register_rule(&rule.directory, rule_def)?;
        }

        if let Some(default) = &settings.default_rule {
            let name = default.name.as_deref().unwrap_or(&default.pattern);
            let rule_def = Rule::new(name, &default.pattern, outputs_from_config(&default.outputs))?;
            self.register_default_rule(rule_def)?;
        }
        Ok(())
    }

    // ============================================================
    // Generation
    // ============================================================

    /// Process every template selected by `request`.
    ///
    /// Per-output failures are recorded in the report; they only abort the
    /// run when the policy raises warnings.
    #[instrument(level = "debug", skip(self))]
    pub fn generate(&self, request: &GenerateRequest) -> ApplicationResult<GenerationReport> {
        let file_pattern = compile_pattern(&request.file_pattern)?;
        let mut report = GenerationReport::new();
        let mut seen = BTreeSet::new();

        for dir in self.expand_directories(&request.dir_pattern)? {
            let files = self
                .fs
                .find_files(&dir, &file_pattern, request.recursive)
                .with_path_context("list templates", &dir)?;

            for (parent, name) in files {
                // Overlapping directory selections must not process a file twice
                if !seen.insert(parent.join(&name)) {
                    continue;
                }
                let Some(template) = self.select_template(parent, name) else {
                    continue;
                };
                self.process_template(&template, request, &mut report)?;
            }
        }

        info!(
            "{:?}: {} templates, {} outputs",
            request.mode,
            report.template_count(),
            report.records().len()
        );
        Ok(report)
    }

    /// Existing directories below the root matching `dir_pattern`, sorted and
    /// de-duplicated.
    fn expand_directories(&self, dir_pattern: &str) -> ApplicationResult<BTreeSet<PathBuf>> {
        let dir_pattern = if dir_pattern.is_empty() { "." } else { dir_pattern };
        let full_pattern = if Path::new(dir_pattern).is_absolute() {
            dir_pattern.to_string()
        } else {
            let root = Pattern::escape(&self.root.to_string_lossy());
            format!("{}/{}", root, dir_pattern)
        };

        let paths = glob::glob_with(&full_pattern, filename_match_options()).map_err(|e| {
            DomainError::InvalidPattern {
                pattern: dir_pattern.to_string(),
                reason: e.msg.to_string(),
            }
        })?;

        let mut dirs = BTreeSet::new();
        for path in paths.filter_map(Result::ok) {
            if !self.fs.is_dir(&path) {
                continue;
            }
            let dir = self
                .fs
                .canonicalize(&path)
                .with_path_context("resolve directory", &path)?;
            if !dir.starts_with(&self.root) {
                self.warn(format!(
                    "directory {} is outside root {}",
                    dir.display(),
                    self.root.display()
                ))?;
                continue;
            }
            dirs.insert(dir);
        }

        if dirs.is_empty() {
            self.warn(format!("no directory matches '{}'", dir_pattern))?;
        }
        Ok(dirs)
    }

    /// Keep files with a registered extension living below the root.
    fn select_template(&self, dir: PathBuf, name: String) -> Option<Template> {
        let file = Path::new(&name);
        let (Some(stem), Some(ext)) = (
            file.file_stem().and_then(|s| s.to_str()),
            file.extension().and_then(|s| s.to_str()),
        ) else {
            debug!("skip '{}': no extension", name);
            return None;
        };

        let Some(out_ext) = self.extensions.get(ext) else {
            debug!("skip '{}': extension '{}' not registered", name, ext);
            return None;
        };

        let location = match dir
            .strip_prefix(&self.root)
            .ok()
            .map(PathKey::from_relative_path)
        {
            Some(Ok(location)) => location,
            _ => {
                debug!("skip '{}': {} not below root", name, dir.display());
                return None;
            }
        };

        Some(Template {
            stem: stem.to_string(),
            out_ext: out_ext.to_string(),
            dir,
            name,
            location,
        })
    }

    fn process_template(
        &self,
        template: &Template,
        request: &GenerateRequest,
        report: &mut GenerationReport,
    ) -> ApplicationResult<()> {
        let Some(rule) = self.registry.resolve(&template.location, &template.name) else {
            return Ok(());
        };
        let template_path = template.dir.join(&template.name);
        report.template_seen(TemplateRecord {
            template: self.relative(&template_path),
            rule: rule.name().to_string(),
        });

        for spec in rule.outputs() {
            let output_name = if template.out_ext.is_empty() {
                format!("{}{}", template.stem, spec.suffix)
            } else {
                format!("{}{}.{}", template.stem, spec.suffix, template.out_ext)
            };
            let output_path = template.dir.join(&output_name);

            let outcome = match request.mode {
                Mode::Generate => self.generate_output(&template_path, &output_path, &spec, request.force),
                Mode::DryRun => Outcome::Planned,
                Mode::Clean => self.clean_output(&output_path),
            };

            if let Outcome::Failed(reason) = &outcome {
                self.warn(format!(
                    "{} -> {}: {}",
                    template_path.display(),
                    output_name,
                    reason
                ))?;
            }

            report.push(OutputRecord {
                template: self.relative(&template_path),
                rule: rule.name().to_string(),
                output: self.relative(&output_path),
                outcome,
            });
        }
        Ok(())
    }

    fn generate_output(
        &self,
        template: &Path,
        output: &Path,
        spec: &OutputSpec,
        force: bool,
    ) -> Outcome {
        match self.needs_generation(template, output, force) {
            Ok(false) => {
                debug!("up to date: {}", output.display());
                return Outcome::UpToDate;
            }
            Ok(true) => {}
            Err(e) => return Outcome::Failed(format!("cannot stat: {e}")),
        }

        let content = match self.renderer.render(template, &spec.bindings) {
            Ok(content) => content,
            Err(e) => return Outcome::Failed(e.message),
        };
        match self.fs.write(output, &content) {
            Ok(()) => {
                info!("generated {}", output.display());
                Outcome::Generated
            }
            Err(e) => Outcome::Failed(format!("cannot write: {e}")),
        }
    }

    /// Regenerate when forced, when the output is missing, or when the template
    /// is newer than the output by more than the tolerance.
    fn needs_generation(&self, template: &Path, output: &Path, force: bool) -> std::io::Result<bool> {
        if force || !self.fs.is_file(output) {
            return Ok(true);
        }
        let template_mtime = self.fs.modified(template)?;
        let output_mtime = self.fs.modified(output)?;
        Ok(template_mtime
            .duration_since(output_mtime)
            .is_ok_and(|newer_by| newer_by > self.policy.mtime_tolerance))
    }

    fn clean_output(&self, output: &Path) -> Outcome {
        if !self.fs.exists(output) {
            return Outcome::Absent;
        }
        match self.fs.remove_file(output) {
            Ok(()) => {
                info!("removed {}", output.display());
                Outcome::Removed
            }
            Err(e) => Outcome::Failed(format!("cannot remove: {e}")),
        }
    }

    fn warn(&self, message: String) -> ApplicationResult<()> {
        warn!("{}", message);
        if self.policy.raise_on_warning {
            return Err(ApplicationError::Warning(message));
        }
        Ok(())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        relative_to(path, &self.root)
    }
}

fn outputs_from_config(outputs: &[OutputConfig]) -> Arc<dyn OutputSource> {
    Arc::new(
        outputs
            .iter()
            .map(|o| OutputSpec::new(o.suffix.clone(), o.bindings.clone()))
            .collect::<Vec<_>>(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bindings;
    use crate::infrastructure::error::RenderError;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    struct EchoRenderer;

    impl TemplateRenderer for EchoRenderer {
        fn render(&self, template: &Path, _bindings: &Bindings) -> Result<String, RenderError> {
            Ok(template.display().to_string())
        }
    }

    fn generator(root: &Path) -> Generator {
        Generator::new(
            root,
            Arc::new(RealFileSystem),
            Arc::new(EchoRenderer),
            GenerationPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn given_missing_root_when_creating_generator_then_errors() {
        let result = Generator::new(
            "/nonexistent/genja-root",
            Arc::new(RealFileSystem),
            Arc::new(EchoRenderer),
            GenerationPolicy::default(),
        );
        assert!(matches!(result, Err(ApplicationError::MissingRoot(_))));
    }

    #[test]
    fn given_missing_directory_when_registering_action_then_errors() {
        let dir = TempDir::new().unwrap();
        let mut generator = generator(dir.path());

        let err = generator
            .register_action("nope", "*", Arc::new(vec![OutputSpec::new("", Bindings::new())]))
            .unwrap_err();

        assert!(matches!(err, ApplicationError::MissingDirectory(_)));
    }

    #[test]
    fn given_file_without_extension_when_selecting_then_skipped() {
        let dir = TempDir::new().unwrap();
        let mut generator = generator(dir.path());
        generator.register_extension("tmpl", "out", false).unwrap();
        let root = generator.root().to_path_buf();

        assert!(generator.select_template(root.clone(), "Makefile".into()).is_none());
        assert!(generator.select_template(root.clone(), "a.txt".into()).is_none());
        let template = generator.select_template(root, "a.b.tmpl".into()).unwrap();
        assert_eq!(template.stem, "a.b");
        assert_eq!(template.out_ext, "out");
        assert!(template.location.is_empty());
    }
}
