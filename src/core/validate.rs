//! Configuration validation
//!
//! Turns a [`RawConfig`] into an immutable [`PackageConfig`]. Checks run in
//! a fixed order and the first failure wins, so nothing is written to disk
//! for an invalid configuration.

use miette::Diagnostic;
use serde_json::Value;
use thiserror::Error;

use crate::core::config::{json_type_name, RawConfig};

pub const DEFAULT_VERSION: &str = "0.1.0";
pub const DEFAULT_LICENSE: &str = "MIT";
pub const DEFAULT_DESCRIPTION: &str = "A Python package created with PyPackify.";
pub const DEFAULT_AUTHOR: &str = "Unknown";
pub const DEFAULT_AUTHOR_EMAIL: &str = "unknown@example.com";

/// Directory layout of the generated package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `src/<name>_<username>/` plus `tests/` and a generated `LICENSE`
    Namespaced { username: String },
    /// Sources directly under `src/`, re-exported from a root `__init__.py`
    Flat,
}

/// A validated package configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageConfig {
    pub name: String,
    pub layout: Layout,
    pub files: Vec<String>,
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub author_email: Option<String>,
    pub license: String,
    pub year: Option<String>,
}

impl PackageConfig {
    /// Importable package name: `<name>_<username>` when namespaced
    pub fn package_id(&self) -> String {
        match &self.layout {
            Layout::Namespaced { username } => format!("{}_{}", self.name, username),
            Layout::Flat => self.name.clone(),
        }
    }

    pub fn is_namespaced(&self) -> bool {
        matches!(self.layout, Layout::Namespaced { .. })
    }

    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or(DEFAULT_DESCRIPTION)
    }

    pub fn author(&self) -> &str {
        self.author.as_deref().unwrap_or(DEFAULT_AUTHOR)
    }

    pub fn author_email(&self) -> &str {
        self.author_email.as_deref().unwrap_or(DEFAULT_AUTHOR_EMAIL)
    }

    /// Configured year, or `fallback` when the config leaves it out
    pub fn year_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.year.as_deref().unwrap_or(fallback)
    }
}

/// Configuration validation failures
#[derive(Debug, Error, Diagnostic, PartialEq, Eq)]
pub enum ValidationError {
    #[error("config must include a '{field}' key {expected}")]
    #[diagnostic(code(pypackify::validate::missing_field))]
    MissingField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("config field '{field}' must be {expected}, found {found}")]
    #[diagnostic(code(pypackify::validate::wrong_type))]
    WrongType {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("config field 'name' must not be empty")]
    #[diagnostic(code(pypackify::validate::empty_name))]
    EmptyName,

    #[error("unknown layout '{0}'")]
    #[diagnostic(
        code(pypackify::validate::layout),
        help("use \"namespaced\" (the default) or \"flat\"")
    )]
    UnknownLayout(String),

    #[error("invalid version format '{0}'")]
    #[diagnostic(
        code(pypackify::validate::version),
        help("versions must look like MAJOR.MINOR.PATCH, e.g. 1.2.3")
    )]
    InvalidVersion(String),
}

/// Validate a raw configuration
pub fn validate(raw: &RawConfig) -> Result<PackageConfig, ValidationError> {
    let files = match raw.get("files") {
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::String(path) => Ok(path.clone()),
                other => Err(ValidationError::WrongType {
                    field: format!("files[{i}]"),
                    expected: "a file path string",
                    found: json_type_name(other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) | None => {
            return Err(ValidationError::MissingField {
                field: "files",
                expected: "with a list of Python file paths",
            })
        }
    };

    let name = match raw.get("name") {
        Some(value) => string_field("name", value)?,
        None => {
            return Err(ValidationError::MissingField {
                field: "name",
                expected: "for the package name",
            })
        }
    };
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }

    let layout = match optional_string(raw, "layout")?.as_deref() {
        None | Some("namespaced") => match raw.get("username") {
            Some(value) => Layout::Namespaced {
                username: string_field("username", value)?,
            },
            None => {
                return Err(ValidationError::MissingField {
                    field: "username",
                    expected: "for the package namespace",
                })
            }
        },
        Some("flat") => Layout::Flat,
        Some(other) => return Err(ValidationError::UnknownLayout(other.to_string())),
    };

    let version = optional_string(raw, "version")?.unwrap_or_else(|| DEFAULT_VERSION.to_string());
    if !is_semver(&version) {
        return Err(ValidationError::InvalidVersion(version));
    }

    Ok(PackageConfig {
        name,
        layout,
        files,
        version,
        description: optional_string(raw, "description")?,
        author: optional_string(raw, "author")?,
        author_email: optional_string(raw, "author_email")?,
        license: optional_string(raw, "license")?.unwrap_or_else(|| DEFAULT_LICENSE.to_string()),
        year: year_field(raw)?,
    })
}

/// Whether `version` is `MAJOR.MINOR.PATCH` with ASCII digit components
pub fn is_semver(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}

fn string_field(field: &str, value: &Value) -> Result<String, ValidationError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        other => Err(ValidationError::WrongType {
            field: field.to_string(),
            expected: "a string",
            found: json_type_name(other),
        }),
    }
}

fn optional_string(raw: &RawConfig, field: &str) -> Result<Option<String>, ValidationError> {
    raw.get(field)
        .map(|value| string_field(field, value))
        .transpose()
}

/// `year` may be written as a string or a bare integer
fn year_field(raw: &RawConfig) -> Result<Option<String>, ValidationError> {
    match raw.get("year") {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(Some(n.to_string())),
        Some(other) => Err(ValidationError::WrongType {
            field: "year".to_string(),
            expected: "a string or an integer",
            found: json_type_name(other),
        }),
    }
}
