//! Configuration file loading
//!
//! Reads the package configuration (`config.json` by default) into a raw
//! JSON object. Field checks happen in [`crate::core::validate`].

use miette::{Diagnostic, NamedSource, SourceSpan};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::fs::FileSystem;

/// Default configuration file name, relative to the working directory
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// A parsed but not yet validated configuration object
#[derive(Debug, Clone)]
pub struct RawConfig {
    fields: Map<String, Value>,
}

impl RawConfig {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Value of a top-level key, if present
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

/// Load and parse a configuration file
pub fn load_config(fs: &dyn FileSystem, path: &Path) -> Result<RawConfig, ConfigError> {
    if !fs.is_file(path) {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }

    let source = fs.read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    parse_config(path, &source)
}

/// Parse configuration text that was read from `path`
pub fn parse_config(path: &Path, source: &str) -> Result<RawConfig, ConfigError> {
    let filename = path.display().to_string();

    let value: Value = serde_json::from_str(source).map_err(|e| {
        ConfigError::Syntax(ConfigSyntaxError::from_serde_error(&e, source, &filename))
    })?;

    match value {
        Value::Object(fields) => Ok(RawConfig::new(fields)),
        other => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
            found: json_type_name(&other),
        }),
    }
}

/// Human-readable name of a JSON value's type
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// JSON syntax error with source location
#[derive(Debug, Error, Diagnostic)]
#[error("invalid JSON in configuration: {message}")]
#[diagnostic(code(pypackify::config::syntax))]
pub struct ConfigSyntaxError {
    #[source_code]
    src: NamedSource<String>,

    #[label("error here")]
    span: SourceSpan,

    #[help]
    help: Option<String>,

    message: String,
}

impl ConfigSyntaxError {
    /// Create a syntax error from a serde_json error
    pub fn from_serde_error(err: &serde_json::Error, source: &str, filename: &str) -> Self {
        let offset = line_col_to_offset(source, err.line(), err.column());
        let message = err.to_string();
        let help = generate_help(&message);

        let end = offset.saturating_add(1).min(source.len()).max(offset);

        Self {
            src: NamedSource::new(filename, source.to_string()),
            span: SourceSpan::from(offset..end),
            help,
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset of the error in the source
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}

/// Errors that can occur while loading the configuration
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("configuration file '{}' not found", .0.display())]
    #[diagnostic(
        code(pypackify::config::not_found),
        help("pass the path of an existing file with --config")
    )]
    NotFound(PathBuf),

    #[error("could not read configuration file '{}': {message}", path.display())]
    #[diagnostic(code(pypackify::config::io))]
    Io { path: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] ConfigSyntaxError),

    #[error("configuration in '{}' must be a JSON object, found {found}", path.display())]
    #[diagnostic(code(pypackify::config::not_an_object))]
    NotAnObject { path: PathBuf, found: &'static str },
}

/// Convert a 1-based line/column pair to a byte offset
fn line_col_to_offset(source: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }

    let line_start = source
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum::<usize>();

    if line_start >= source.len() {
        return source.len().saturating_sub(1);
    }

    let line_text = source[line_start..].split('\n').next().unwrap_or("");
    let within = line_text
        .char_indices()
        .nth(column.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(line_text.len().saturating_sub(1));

    line_start + within
}

/// Suggestions for the most common hand-editing mistakes
fn generate_help(message: &str) -> Option<String> {
    let msg_lower = message.to_lowercase();

    if msg_lower.contains("trailing comma") {
        return Some("JSON does not allow a comma after the last item.".to_string());
    }

    if msg_lower.contains("key must be a string") {
        return Some("Object keys must be double-quoted: \"name\": \"demo\"".to_string());
    }

    if msg_lower.contains("eof while parsing") {
        return Some("The file ends early. Check for a missing '}' or ']'.".to_string());
    }

    if msg_lower.contains("expected `,` or `}`") || msg_lower.contains("expected `,` or `]`") {
        return Some("Separate items with commas.".to_string());
    }

    None
}
