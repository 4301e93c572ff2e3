//! Template rendering for generated package files

pub mod generator;

pub use generator::{TemplateError, TemplateGenerator};
