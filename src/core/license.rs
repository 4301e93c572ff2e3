//! License catalog and classifier lookup

use miette::Diagnostic;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::fs::FileSystem;

/// Catalog file name, looked up in the working directory
pub const LICENSE_CATALOG_FILE: &str = "licenses.json";

const MIT_CLASSIFIER: &str = "License :: OSI Approved :: MIT License";

/// Trove classifiers for the licenses we know about
const CLASSIFIERS: &[(&str, &str)] = &[
    ("MIT", MIT_CLASSIFIER),
    (
        "Apache-2.0",
        "License :: OSI Approved :: Apache Software License",
    ),
    (
        "GPL-3.0",
        "License :: OSI Approved :: GNU General Public License v3 (GPLv3)",
    ),
];

/// Trove classifier for a license identifier, MIT for anything unrecognized
pub fn classifier(license: &str) -> &'static str {
    CLASSIFIERS
        .iter()
        .find(|(id, _)| *id == license)
        .map(|(_, classifier)| *classifier)
        .unwrap_or(MIT_CLASSIFIER)
}

/// License identifiers mapped to body templates containing `[YEAR]` and `[AUTHOR]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct LicenseCatalog {
    licenses: BTreeMap<String, String>,
}

impl LicenseCatalog {
    /// Load the catalog from a JSON object of `identifier -> text`
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self, LicenseError> {
        if !fs.is_file(path) {
            return Err(LicenseError::CatalogNotFound(path.to_path_buf()));
        }

        let contents = fs
            .read_to_string(path)
            .map_err(|e| LicenseError::Io {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        serde_json::from_str(&contents).map_err(|e| LicenseError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            licenses: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn contains(&self, license: &str) -> bool {
        self.licenses.contains_key(license)
    }

    /// Template text for `license`, or a placeholder sentence when it is unknown
    pub fn lookup(&self, license: &str) -> String {
        self.licenses
            .get(license)
            .cloned()
            .unwrap_or_else(|| format!("License text for '{}' not found", license))
    }

    /// License text with `[YEAR]` and `[AUTHOR]` filled in
    pub fn render(&self, license: &str, year: &str, author: &str) -> String {
        self.lookup(license)
            .replace("[YEAR]", year)
            .replace("[AUTHOR]", author)
    }
}

/// Errors loading the license catalog
#[derive(Debug, Error, Diagnostic)]
pub enum LicenseError {
    #[error("license catalog '{}' not found", .0.display())]
    #[diagnostic(
        code(pypackify::license::not_found),
        help("create a licenses.json mapping license identifiers to license text")
    )]
    CatalogNotFound(PathBuf),

    #[error("could not read license catalog '{}': {message}", path.display())]
    #[diagnostic(code(pypackify::license::io))]
    Io { path: PathBuf, message: String },

    #[error("invalid license catalog '{}': {message}", path.display())]
    #[diagnostic(
        code(pypackify::license::parse),
        help("the catalog must be a JSON object of identifier to license text")
    )]
    Parse { path: PathBuf, message: String },
}
