//! Infrastructure layer: I/O implementations and DI container
//!
//! This layer implements I/O boundary traits and wires up services.

pub mod di;
pub mod error;
pub mod filters;
pub mod renderer;
pub mod traits;

pub use error::{InfraError, RenderError};
pub use renderer::MiniJinjaRenderer;
pub use traits::{FileSystem, RealFileSystem, TemplateRenderer};
