//! Template rendering backed by minijinja.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use minijinja::functions::Function;
use minijinja::value::{FunctionArgs, FunctionResult};
use minijinja::Environment;
use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::Bindings;
use crate::infrastructure::error::RenderError;
use crate::infrastructure::filters;
use crate::infrastructure::traits::{FileSystem, TemplateRenderer};

/// Renders template files with minijinja.
///
/// Templates are read through the [`FileSystem`] on every call, so edits
/// between runs are always picked up. Only minijinja's builtin filters are
/// available until more are registered; the type filters are opt-in via
/// [`MiniJinjaRenderer::register_common_type_filters`].
pub struct MiniJinjaRenderer {
    env: Environment<'static>,
    fs: Arc<dyn FileSystem>,
    filters: BTreeSet<String>,
}

impl MiniJinjaRenderer {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        Self {
            env,
            fs,
            filters: BTreeSet::new(),
        }
    }

    /// Make `filter` available to templates as `name`.
    ///
    /// Registering a name twice is a [`ApplicationError::DuplicateFilter`]
    /// unless `force` is set, in which case the new filter replaces the old.
    pub fn register_filter<F, Rv, Args>(
        &mut self,
        name: &str,
        filter: F,
        force: bool,
    ) -> ApplicationResult<()>
    where
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        if self.filters.contains(name) && !force {
            return Err(ApplicationError::DuplicateFilter {
                name: name.to_string(),
            });
        }
        debug!(name, force, "registering filter");
        self.env.add_filter(name.to_string(), filter);
        self.filters.insert(name.to_string());
        Ok(())
    }

    /// Register several filters of the same function type; stops at the
    /// first clash.
    pub fn register_filters<'n, I, F, Rv, Args>(
        &mut self,
        filters: I,
        force: bool,
    ) -> ApplicationResult<()>
    where
        I: IntoIterator<Item = (&'n str, F)>,
        F: Function<Rv, Args>,
        Rv: FunctionResult,
        Args: for<'a> FunctionArgs<'a>,
    {
        for (name, filter) in filters {
            self.register_filter(name, filter, force)?;
        }
        Ok(())
    }

    /// Install the type-name filters from [`filters`].
    pub fn register_common_type_filters(&mut self, force: bool) -> ApplicationResult<()> {
        self.register_filters(
            [
                ("type2enum", filters::type2enum as fn(String) -> String),
                ("type_to_numpy_c_type", filters::type_to_numpy_c_type),
                ("type_to_numpy_type", filters::type_to_numpy_type),
                ("type_to_numpy_enum_type", filters::type_to_numpy_enum_type),
            ],
            force,
        )?;
        self.register_filters(
            [
                (
                    "type_to_real_sum_type",
                    filters::type_to_real_sum_type as fn(String) -> Result<String, minijinja::Error>,
                ),
                (
                    "real_type_from_complex_type",
                    filters::real_type_from_complex_type,
                ),
            ],
            force,
        )
    }

    /// Names of the filters registered on top of minijinja's builtins, sorted.
    pub fn registered_filters(&self) -> Vec<&str> {
        self.filters.iter().map(String::as_str).collect()
    }
}

impl TemplateRenderer for MiniJinjaRenderer {
    #[instrument(level = "debug", skip(self, bindings))]
    fn render(&self, template: &Path, bindings: &Bindings) -> Result<String, RenderError> {
        let source = self
            .fs
            .read_to_string(template)
            .map_err(|e| RenderError::new(template, e.to_string()))?;

        let name = template.to_string_lossy();
        let rendered = self
            .env
            .render_named_str(&name, &source, bindings)
            .map_err(|e| RenderError::new(template, format_render_error(&e)))?;

        debug!("rendered {} bytes", rendered.len());
        Ok(rendered)
    }
}

/// Flatten a minijinja error and its causes into one line.
fn format_render_error(err: &minijinja::Error) -> String {
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::traits::RealFileSystem;
    use tempfile::TempDir;

    fn typed_renderer() -> MiniJinjaRenderer {
        let mut renderer = MiniJinjaRenderer::new(Arc::new(RealFileSystem));
        renderer.register_common_type_filters(false).unwrap();
        renderer
    }

    fn render_with(
        renderer: &MiniJinjaRenderer,
        source: &str,
        bindings: &Bindings,
    ) -> Result<String, RenderError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.tmpl");
        std::fs::write(&path, source).unwrap();
        renderer.render(&path, bindings)
    }

    fn render(source: &str, bindings: &Bindings) -> Result<String, RenderError> {
        render_with(&typed_renderer(), source, bindings)
    }

    fn kind(value: &str) -> Bindings {
        let mut bindings = Bindings::new();
        bindings.insert("kind".into(), toml::Value::String(value.into()));
        bindings
    }

    #[test]
    fn given_bindings_when_rendering_then_substitutes_values() {
        let mut bindings = kind("INT32_t");
        bindings.insert("n".into(), toml::Value::Integer(3));

        let out = render("{{ n }} {{ kind | type2enum }}\n", &bindings).unwrap();

        assert_eq!(out, "3 INT32_T\n");
    }

    #[test]
    fn given_failing_filter_when_rendering_then_returns_render_error() {
        let err = render("{{ kind | real_type_from_complex_type }}", &kind("INT32_t")).unwrap_err();

        assert!(err.message.contains("INT32_t"), "{}", err.message);
    }

    #[test]
    fn given_common_type_filters_when_referenced_then_each_renders() {
        let renderer = typed_renderer();
        let bindings = kind("COMPLEX128_t");

        assert_eq!(
            renderer.registered_filters(),
            vec![
                "real_type_from_complex_type",
                "type2enum",
                "type_to_numpy_c_type",
                "type_to_numpy_enum_type",
                "type_to_numpy_type",
                "type_to_real_sum_type",
            ]
        );
        for filter in renderer.registered_filters() {
            let source = format!("{{{{ kind | {filter} }}}}");
            assert!(render_with(&renderer, &source, &bindings).is_ok(), "{filter}");
        }
    }

    #[test]
    fn given_fresh_renderer_then_type_filters_are_not_installed() {
        let renderer = MiniJinjaRenderer::new(Arc::new(RealFileSystem));

        assert!(renderer.registered_filters().is_empty());
        assert!(render_with(&renderer, "{{ kind | type2enum }}", &kind("INT32_t")).is_err());
        assert_eq!(
            render_with(&renderer, "{{ kind | lower }}", &kind("INT32_t")).unwrap(),
            "int32_t"
        );
    }

    #[test]
    fn given_registered_filter_when_registering_again_then_duplicate_error() {
        let mut renderer = MiniJinjaRenderer::new(Arc::new(RealFileSystem));
        renderer
            .register_filter("shout", |s: String| s.to_uppercase(), false)
            .unwrap();

        let err = renderer
            .register_filter("shout", |s: String| format!("{s}!"), false)
            .unwrap_err();

        assert!(matches!(err, ApplicationError::DuplicateFilter { ref name } if name == "shout"));
        assert_eq!(
            render_with(&renderer, "{{ kind | shout }}", &kind("abc")).unwrap(),
            "ABC"
        );
    }

    #[test]
    fn given_force_when_registering_existing_filter_then_replaces_it() {
        let mut renderer = typed_renderer();

        renderer
            .register_filter("type2enum", |s: String| format!("enum_{s}"), true)
            .unwrap();

        assert_eq!(renderer.registered_filters().len(), 6);
        assert_eq!(
            render_with(&renderer, "{{ kind | type2enum }}", &kind("INT32_t")).unwrap(),
            "enum_INT32_t"
        );
    }

    #[test]
    fn given_type_filters_installed_when_installing_again_then_needs_force() {
        let mut renderer = typed_renderer();

        assert!(matches!(
            renderer.register_common_type_filters(false),
            Err(ApplicationError::DuplicateFilter { .. })
        ));
        assert!(renderer.register_common_type_filters(true).is_ok());
    }

    #[test]
    fn given_filter_list_when_registering_then_all_available() {
        let mut renderer = MiniJinjaRenderer::new(Arc::new(RealFileSystem));

        renderer
            .register_filters(
                [
                    ("first", (|s: String| format!("1{s}")) as fn(String) -> String),
                    ("second", |s: String| format!("2{s}")),
                ],
                false,
            )
            .unwrap();

        assert_eq!(renderer.registered_filters(), vec!["first", "second"]);
        assert_eq!(
            render_with(&renderer, "{{ kind | first | second }}", &kind("x")).unwrap(),
            "21x"
        );
    }

    #[test]
    fn given_missing_template_when_rendering_then_returns_render_error() {
        let renderer = MiniJinjaRenderer::new(Arc::new(RealFileSystem));
        let err = renderer
            .render(Path::new("/nonexistent/t.tmpl"), &Bindings::new())
            .unwrap_err();
        assert_eq!(err.template, Path::new("/nonexistent/t.tmpl"));
    }
}
