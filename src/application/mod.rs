//! Application layer: generation use cases
//!
//! This layer orchestrates domain logic and depends on I/O boundary traits.

pub mod error;
pub mod error_ext;
pub mod extensions;
pub mod generator;
pub mod report;

pub use error::{ApplicationError, ApplicationResult};
pub use error_ext::IoResultExt;
pub use extensions::ExtensionMap;
pub use generator::{GenerateRequest, GenerationPolicy, Generator, Mode};
pub use report::{GenerationReport, OutputRecord, Outcome, TemplateRecord};
