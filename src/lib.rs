//! genja: rule-driven, multi-output template generation.
//!
//! Templates are matched to generation rules by the directory they live in
//! and their file name. A rule expands one template into any number of
//! outputs, each rendered with its own bindings.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
