//! Rendering of generated package files

use rust_embed::Embed;
use std::collections::HashMap;
use tera::{Context, Tera, Value};
use thiserror::Error;

use crate::core::license;
use crate::core::validate::{Layout, PackageConfig};

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const README_TEMPLATE: &str = "readme.md.tera";
const PYPROJECT_TEMPLATE: &str = "pyproject.toml.tera";
const INIT_NAMESPACED_TEMPLATE: &str = "init_namespaced.py.tera";
const INIT_FLAT_TEMPLATE: &str = "init_flat.py.tera";

/// Template generator using Tera
pub struct TemplateGenerator {
    tera: Tera,
}

#[derive(Debug, Error, miette::Diagnostic)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    #[diagnostic(code(pypackify::template::not_found))]
    NotFound(String),

    #[error("template rendering error: {0}")]
    #[diagnostic(code(pypackify::template::render))]
    RenderError(String),
}

impl TemplateGenerator {
    /// Create a new template generator with embedded templates
    pub fn new() -> Result<Self, TemplateError> {
        let mut tera = Tera::default();
        tera.register_filter("toml_string", toml_string_filter);

        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                let template_str = std::str::from_utf8(&content.data)
                    .map_err(|e| TemplateError::RenderError(format!("{filename}: {e}")))?;
                tera.add_raw_template(filename, template_str)
                    .map_err(|e| TemplateError::RenderError(e.to_string()))?;
            }
        }

        Ok(Self { tera })
    }

    /// `README.md`: heading, description, and an Author section for flat packages
    pub fn render_readme(&self, config: &PackageConfig) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("name", &config.name);
        context.insert("description", config.description());
        context.insert("author", config.author());
        context.insert("show_author", &!config.is_namespaced());

        self.render(README_TEMPLATE, &context)
    }

    /// `pyproject.toml` for a setuptools build
    pub fn render_pyproject(&self, config: &PackageConfig) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("package_id", &config.package_id());
        context.insert("version", &config.version);
        context.insert("description", config.description());
        context.insert("author", config.author());
        context.insert("author_email", config.author_email());
        context.insert("license", &config.license);
        // Namespaced packages ship a LICENSE file, so point at it
        context.insert("license_is_file", &config.is_namespaced());
        context.insert("license_classifier", license::classifier(&config.license));

        self.render(PYPROJECT_TEMPLATE, &context)
    }

    /// `__init__.py`. `modules` are the base names of the copied files.
    pub fn render_init(
        &self,
        config: &PackageConfig,
        modules: &[String],
    ) -> Result<String, TemplateError> {
        let mut context = Context::new();
        context.insert("package_id", &config.package_id());
        context.insert("modules", modules);

        let template = match config.layout {
            Layout::Namespaced { .. } => INIT_NAMESPACED_TEMPLATE,
            Layout::Flat => INIT_FLAT_TEMPLATE,
        };
        self.render(template, &context)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String, TemplateError> {
        if !self.tera.get_template_names().any(|n| n == name) {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        self.tera
            .render(name, context)
            .map_err(|e| TemplateError::RenderError(e.to_string()))
    }
}

/// Render a string as a quoted TOML string literal
fn toml_string_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(
            toml::Value::String(s.to_owned()).to_string(),
        )),
        other => Err(tera::Error::msg(format!(
            "toml_string expects a string, got {other}"
        ))),
    }
}
