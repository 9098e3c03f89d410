//! Service container for dependency injection
//!
//! Wires the generator up with its collaborators.

use std::sync::Arc;

use crate::application::{ApplicationResult, GenerationPolicy, Generator};
use crate::config::Settings;
use crate::infrastructure::renderer::MiniJinjaRenderer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, TemplateRenderer};

/// Container holding the settings and I/O collaborators.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Template renderer
    pub renderer: Arc<dyn TemplateRenderer>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations; the
    /// renderer has the common type filters installed.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let mut renderer = MiniJinjaRenderer::new(fs.clone());
        renderer.register_common_type_filters(false)?;
        Ok(Self::with_deps(settings, fs, Arc::new(renderer)))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        renderer: Arc<dyn TemplateRenderer>,
    ) -> Self {
        let settings = Arc::new(settings);

        Self {
            settings,
            fs,
            renderer,
        }
    }

    /// Generator rooted at the configured root, with every configured
    /// extension and rule registered.
    pub fn generator(&self) -> ApplicationResult<Generator> {
        let mut generator = Generator::new(
            &self.settings.root_dir,
            self.fs.clone(),
            self.renderer.clone(),
            GenerationPolicy::from_settings(&self.settings),
        )?;
        generator.apply_settings(&self.settings)?;
        Ok(generator)
    }
}
