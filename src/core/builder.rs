//! Package building - directory layout, file copying, and generated files

use chrono::Datelike;
use console::style;
use miette::Diagnostic;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::config::{load_config, ConfigError};
use crate::core::fs::FileSystem;
use crate::core::license::{LicenseCatalog, LicenseError, LICENSE_CATALOG_FILE};
use crate::core::validate::{validate, Layout, PackageConfig, ValidationError};
use crate::template::{TemplateError, TemplateGenerator};

/// Inputs that would otherwise come from the process environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Directory that relative paths (config, sources, output) resolve against
    pub base_dir: PathBuf,

    /// Year written into LICENSE when the config has no `year`
    pub default_year: String,
}

impl BuildOptions {
    pub fn new(base_dir: impl Into<PathBuf>, default_year: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            default_year: default_year.into(),
        }
    }

    /// Options for `base_dir` using the current local year
    pub fn current_year(base_dir: impl Into<PathBuf>) -> Self {
        Self::new(base_dir, chrono::Local::now().year().to_string())
    }
}

/// What a build did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Package root directory
    pub root: PathBuf,

    /// Directory the sources were copied into
    pub source_dir: PathBuf,

    /// Directories that did not exist before this run
    pub created_dirs: Vec<PathBuf>,

    /// Destination paths of copied sources
    pub copied: Vec<PathBuf>,

    /// `files` entries that were skipped
    pub skipped: Vec<String>,

    /// Generated files that were written successfully
    pub generated: Vec<PathBuf>,

    /// Non-fatal failures
    pub warnings: Vec<String>,
}

/// Load, validate, and build the package described by `config_path`
///
/// Everything that can reject the configuration (including a missing license
/// catalog) runs before the first directory is created.
pub fn create_package(
    fs: &dyn FileSystem,
    options: &BuildOptions,
    config_path: &Path,
) -> Result<BuildSummary, BuildError> {
    let raw = load_config(fs, &options.base_dir.join(config_path))?;
    let config = validate(&raw)?;

    let licenses = match config.layout {
        Layout::Namespaced { .. } => {
            LicenseCatalog::load(fs, &options.base_dir.join(LICENSE_CATALOG_FILE))?
        }
        Layout::Flat => LicenseCatalog::default(),
    };

    let builder = PackageBuilder::new(fs, options)?;
    builder.build(&config, &licenses)
}

/// Builds a package layout on a [`FileSystem`]
pub struct PackageBuilder<'a> {
    fs: &'a dyn FileSystem,
    options: &'a BuildOptions,
    templates: TemplateGenerator,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(fs: &'a dyn FileSystem, options: &'a BuildOptions) -> Result<Self, BuildError> {
        Ok(Self {
            fs,
            options,
            templates: TemplateGenerator::new()?,
        })
    }

    /// `<base>/<name>`
    pub fn root_dir(&self, config: &PackageConfig) -> PathBuf {
        self.options.base_dir.join(&config.name)
    }

    /// `<root>/src/<package_id>` when namespaced, `<root>/src` when flat
    pub fn source_dir(&self, config: &PackageConfig) -> PathBuf {
        let src = self.root_dir(config).join("src");
        match config.layout {
            Layout::Namespaced { .. } => src.join(config.package_id()),
            Layout::Flat => src,
        }
    }

    /// Create the package described by a validated config
    pub fn build(
        &self,
        config: &PackageConfig,
        licenses: &LicenseCatalog,
    ) -> Result<BuildSummary, BuildError> {
        let root = self.root_dir(config);
        let source_dir = self.source_dir(config);
        let mut summary = BuildSummary {
            root: root.clone(),
            source_dir: source_dir.clone(),
            ..Default::default()
        };

        self.create_dir(&root, &mut summary)?;
        self.create_dir(&source_dir, &mut summary)?;
        if config.is_namespaced() {
            self.create_dir(&root.join("tests"), &mut summary)?;
        }

        let modules = self.copy_sources(config, &source_dir, &mut summary)?;

        self.write_init(config, &modules, &mut summary)?;
        self.write_readme(config, &mut summary)?;
        self.write_pyproject(config, &mut summary)?;
        if config.is_namespaced() {
            self.write_license(config, licenses, &mut summary);
        }

        Ok(summary)
    }

    fn create_dir(&self, path: &Path, summary: &mut BuildSummary) -> Result<(), BuildError> {
        if self.fs.is_dir(path) {
            return Ok(());
        }

        self.fs
            .create_dir_all(path)
            .map_err(|e| BuildError::CreateDir {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        println!(
            "{} Created directory {}",
            style("✓").green(),
            style(self.display(path)).cyan()
        );
        summary.created_dirs.push(path.to_path_buf());
        Ok(())
    }

    /// Copy each valid `.py` entry, returning the module names in copy order
    fn copy_sources(
        &self,
        config: &PackageConfig,
        source_dir: &Path,
        summary: &mut BuildSummary,
    ) -> Result<Vec<String>, BuildError> {
        let mut modules = Vec::new();

        for entry in &config.files {
            let source = self.options.base_dir.join(entry);
            let file_name = match source.file_name() {
                Some(name) if entry.ends_with(".py") && self.fs.is_file(&source) => name,
                _ => {
                    println!(
                        "{} Skipping invalid Python file: {}",
                        style("!").yellow(),
                        style(entry).yellow()
                    );
                    summary.skipped.push(entry.clone());
                    continue;
                }
            };

            let destination = source_dir.join(file_name);
            // Copying a file onto itself truncates it
            if self.fs.same_file(&source, &destination) {
                println!(
                    "{} {} is already in place",
                    style("✓").green(),
                    style(self.display(&destination)).cyan()
                );
            } else {
                self.fs
                    .copy(&source, &destination)
                    .map_err(|e| BuildError::Copy {
                        from: source.clone(),
                        to: destination.clone(),
                        message: e.to_string(),
                    })?;

                println!(
                    "{} Copied {} to {}",
                    style("✓").green(),
                    entry,
                    style(self.display(&destination)).cyan()
                );
            }

            if let Some(module) = Path::new(file_name).file_stem() {
                let module = module.to_string_lossy().into_owned();
                if !modules.contains(&module) {
                    modules.push(module);
                }
            }
            summary.copied.push(destination);
        }

        Ok(modules)
    }

    fn write_init(
        &self,
        config: &PackageConfig,
        modules: &[String],
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        let dir = match config.layout {
            Layout::Namespaced { .. } => self.source_dir(config),
            Layout::Flat => self.root_dir(config),
        };
        let contents = self.templates.render_init(config, modules)?;
        self.write_required(&dir.join("__init__.py"), &contents, summary)
    }

    fn write_readme(
        &self,
        config: &PackageConfig,
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        let contents = self.templates.render_readme(config)?;
        self.write_required(&self.root_dir(config).join("README.md"), &contents, summary)
    }

    fn write_pyproject(
        &self,
        config: &PackageConfig,
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        let contents = self.templates.render_pyproject(config)?;
        self.write_best_effort(
            &self.root_dir(config).join("pyproject.toml"),
            &contents,
            summary,
        );
        Ok(())
    }

    fn write_license(
        &self,
        config: &PackageConfig,
        licenses: &LicenseCatalog,
        summary: &mut BuildSummary,
    ) {
        if !licenses.contains(&config.license) {
            println!(
                "{} No license text for '{}', writing a placeholder",
                style("!").yellow(),
                config.license
            );
        }

        let contents = licenses.render(
            &config.license,
            config.year_or(&self.options.default_year),
            config.author(),
        );
        self.write_best_effort(&self.root_dir(config).join("LICENSE"), &contents, summary);
    }

    fn write_required(
        &self,
        path: &Path,
        contents: &str,
        summary: &mut BuildSummary,
    ) -> Result<(), BuildError> {
        self.fs.write(path, contents).map_err(|e| BuildError::Write {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        self.report_written(path, summary);
        Ok(())
    }

    /// Write a file, reporting a failure instead of returning it
    fn write_best_effort(&self, path: &Path, contents: &str, summary: &mut BuildSummary) {
        match self.fs.write(path, contents) {
            Ok(()) => self.report_written(path, summary),
            Err(e) => {
                let warning = format!("Failed to write {}: {}", self.display(path), e);
                println!("{} {}", style("!").yellow(), warning);
                summary.warnings.push(warning);
            }
        }
    }

    fn report_written(&self, path: &Path, summary: &mut BuildSummary) {
        println!(
            "{} Created {}",
            style("✓").green(),
            style(self.display(path)).cyan()
        );
        summary.generated.push(path.to_path_buf());
    }

    /// Path relative to the base directory, for messages
    fn display(&self, path: &Path) -> String {
        path.strip_prefix(&self.options.base_dir)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

/// Errors that abort a build
#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    License(#[from] LicenseError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to create directory '{}': {message}", path.display())]
    #[diagnostic(code(pypackify::build::create_dir))]
    CreateDir { path: PathBuf, message: String },

    #[error("failed to copy '{}' to '{}': {message}", from.display(), to.display())]
    #[diagnostic(code(pypackify::build::copy))]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    #[error("failed to write '{}': {message}", path.display())]
    #[diagnostic(code(pypackify::build::write))]
    Write { path: PathBuf, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fs::MemoryFs;

    const LICENSES: &str =
        r#"{"MIT": "MIT License\n\nCopyright (c) [YEAR] [AUTHOR]\n", "GPL-3.0": "GPL [YEAR]"}"#;

    fn options() -> BuildOptions {
        BuildOptions::new("/work", "2030")
    }

    fn workspace(config: &str) -> MemoryFs {
        MemoryFs::new()
            .with_file("/work/config.json", config)
            .with_file("/work/licenses.json", LICENSES)
            .with_file("/work/a.py", "print('a')\n")
            .with_file("/work/lib/b.py", "B = 1\n")
            .with_file("/work/notes.txt", "not python")
    }

    const DEMO: &str = r#"{
        "name": "demo",
        "username": "u1",
        "files": ["a.py"],
        "version": "1.2.3",
        "license": "MIT",
        "author": "Jane"
    }"#;

    #[test]
    fn test_create_package_namespaced_layout() {
        let fs = workspace(DEMO);

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(summary.root, PathBuf::from("/work/demo"));
        assert_eq!(summary.source_dir, PathBuf::from("/work/demo/src/demo_u1"));
        assert_eq!(
            fs.contents("/work/demo/src/demo_u1/a.py").unwrap(),
            b"print('a')\n".to_vec()
        );
        assert_eq!(
            fs.text("/work/demo/src/demo_u1/__init__.py").unwrap(),
            "# demo_u1 package\n"
        );
        assert!(fs.is_dir(Path::new("/work/demo/tests")));
        assert!(fs
            .text("/work/demo/pyproject.toml")
            .unwrap()
            .contains("version = \"1.2.3\""));
        assert!(fs.text("/work/demo/README.md").unwrap().contains("# demo"));

        let license = fs.text("/work/demo/LICENSE").unwrap();
        assert!(license.contains("Copyright (c) 2030 Jane"));
        assert!(!license.contains("[AUTHOR]"));
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.generated.len(), 4);
    }

    #[test]
    fn test_tests_dir_is_empty() {
        let fs = workspace(DEMO);
        create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert!(!fs
            .file_paths()
            .iter()
            .any(|p| p.starts_with("/work/demo/tests")));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let fs = workspace(
            r#"{"name": "demo", "username": "u1",
                "files": ["a.py", "missing.py", "notes.txt", "lib/b.py", "lib"]}"#,
        );

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(summary.skipped, vec!["missing.py", "notes.txt", "lib"]);
        assert_eq!(
            summary.copied,
            vec![
                PathBuf::from("/work/demo/src/demo_u1/a.py"),
                PathBuf::from("/work/demo/src/demo_u1/b.py"),
            ]
        );
        assert!(!fs.is_file(Path::new("/work/demo/src/demo_u1/notes.txt")));
        assert!(!fs.is_file(Path::new("/work/demo/src/demo_u1/missing.py")));
    }

    #[test]
    fn test_missing_required_field_creates_nothing() {
        for config in [
            r#"{"username": "u1", "files": ["a.py"]}"#,
            r#"{"name": "demo", "files": ["a.py"]}"#,
            r#"{"name": "demo", "username": "u1"}"#,
            r#"{"name": "demo", "username": "u1", "files": [], "version": "1.0"}"#,
        ] {
            let fs = workspace(config);

            let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
            assert!(matches!(err, BuildError::Validation(_)), "{err:?}");
            assert!(!fs.is_dir(Path::new("/work/demo")));
        }
    }

    #[test]
    fn test_missing_config_file() {
        let fs = MemoryFs::new().with_dir("/work");

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        assert!(matches!(err, BuildError::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_missing_license_catalog_aborts_before_mutation() {
        let fs = MemoryFs::new()
            .with_file("/work/config.json", DEMO)
            .with_file("/work/a.py", "");

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        assert!(matches!(
            err,
            BuildError::License(LicenseError::CatalogNotFound(_))
        ));
        assert!(!fs.is_dir(Path::new("/work/demo")));
    }

    #[test]
    fn test_unknown_license_writes_placeholder() {
        let fs = workspace(
            r#"{"name": "demo", "username": "u1", "files": [], "license": "Unknown-License"}"#,
        );

        create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(
            fs.text("/work/demo/LICENSE").unwrap(),
            "License text for 'Unknown-License' not found"
        );
    }

    #[test]
    fn test_config_year_overrides_default() {
        let fs = workspace(
            r#"{"name": "demo", "username": "u1", "files": [], "year": "1999", "author": "Al"}"#,
        );

        create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert!(fs
            .text("/work/demo/LICENSE")
            .unwrap()
            .contains("Copyright (c) 1999 Al"));
    }

    #[test]
    fn test_pyproject_write_failure_is_not_fatal() {
        let fs = workspace(DEMO);
        fs.deny_write("/work/demo/pyproject.toml");
        fs.deny_write("/work/demo/LICENSE");

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(summary.warnings.len(), 2);
        assert!(summary.warnings[0].contains("pyproject.toml"));
        assert!(summary.warnings[1].contains("LICENSE"));
        assert!(!fs.is_file(Path::new("/work/demo/pyproject.toml")));
        assert!(!fs.is_file(Path::new("/work/demo/LICENSE")));
        assert!(fs.is_file(Path::new("/work/demo/README.md")));
    }

    #[test]
    fn test_readme_write_failure_is_fatal() {
        let fs = workspace(DEMO);
        fs.deny_write("/work/demo/README.md");

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        assert!(matches!(err, BuildError::Write { .. }));
        // Partial output stays behind
        assert!(fs.is_file(Path::new("/work/demo/src/demo_u1/a.py")));
    }

    #[test]
    fn test_rerun_is_identical() {
        let fs = workspace(DEMO);

        create_package(&fs, &options(), Path::new("config.json")).unwrap();
        let first: Vec<_> = fs
            .file_paths()
            .into_iter()
            .map(|p| (p.clone(), fs.contents(&p)))
            .collect();

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();
        let second: Vec<_> = fs
            .file_paths()
            .into_iter()
            .map(|p| (p.clone(), fs.contents(&p)))
            .collect();

        assert_eq!(first, second);
        assert!(summary.created_dirs.is_empty());
    }

    #[test]
    fn test_flat_layout() {
        let fs = workspace(
            r#"{"name": "demo", "layout": "flat", "author": "Jane",
                "files": ["a.py", "lib/b.py", "notes.txt"]}"#,
        )
        // Flat packages never read the catalog
        .with_file("/work/licenses.json", "not json");

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(summary.source_dir, PathBuf::from("/work/demo/src"));
        assert!(fs.is_file(Path::new("/work/demo/src/a.py")));
        assert!(fs.is_file(Path::new("/work/demo/src/b.py")));
        assert_eq!(
            fs.text("/work/demo/__init__.py").unwrap(),
            "# __init__.py\nfrom .src.a import *\nfrom .src.b import *\n"
        );
        assert!(fs.text("/work/demo/README.md").unwrap().contains("## Author\nJane"));
        assert!(fs
            .text("/work/demo/pyproject.toml")
            .unwrap()
            .contains("license = \"MIT\""));
        assert!(!fs.is_dir(Path::new("/work/demo/tests")));
        assert!(!fs.is_file(Path::new("/work/demo/LICENSE")));
    }

    #[test]
    fn test_builder_paths() {
        let fs = MemoryFs::new();
        let options = options();
        let builder = PackageBuilder::new(&fs, &options).unwrap();
        let config = PackageConfig {
            name: "pkg".to_string(),
            layout: Layout::Namespaced {
                username: "me".to_string(),
            },
            files: Vec::new(),
            version: "0.1.0".to_string(),
            description: None,
            author: None,
            author_email: None,
            license: "MIT".to_string(),
            year: None,
        };

        assert_eq!(builder.root_dir(&config), PathBuf::from("/work/pkg"));
        assert_eq!(builder.source_dir(&config), PathBuf::from("/work/pkg/src/pkg_me"));
    }

    #[test]
    fn test_build_on_local_fs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("a.py"), [0xffu8, 0x00, b'x']).unwrap();
        std::fs::write(tmp.path().join("config.json"), DEMO).unwrap();
        std::fs::write(tmp.path().join("licenses.json"), LICENSES).unwrap();

        let options = BuildOptions::new(tmp.path(), "2030");
        create_package(&crate::core::fs::LocalFs, &options, Path::new("config.json")).unwrap();

        let copied = std::fs::read(tmp.path().join("demo/src/demo_u1/a.py")).unwrap();
        assert_eq!(copied, vec![0xffu8, 0x00, b'x']);
        assert!(tmp.path().join("demo/tests").is_dir());
    }

    #[test]
    fn test_malformed_license_catalog_aborts_before_mutation() {
        let fs = workspace(DEMO).with_file("/work/licenses.json", r#"{"MIT": "#);

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        assert!(matches!(err, BuildError::License(LicenseError::Parse { .. })));
        assert!(!fs.is_dir(Path::new("/work/demo")));
    }

    #[test]
    fn test_directory_creation_failure_is_fatal() {
        // A regular file where the package root should go
        let fs = workspace(DEMO).with_file("/work/demo", "occupied");

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        match err {
            BuildError::CreateDir { path, .. } => assert_eq!(path, PathBuf::from("/work/demo")),
            other => panic!("expected CreateDir, got {other:?}"),
        }
        assert_eq!(fs.text("/work/demo").unwrap(), "occupied");
    }

    #[test]
    fn test_copy_failure_is_fatal() {
        let fs = workspace(DEMO);
        fs.deny_write("/work/demo/src/demo_u1/a.py");

        let err = create_package(&fs, &options(), Path::new("config.json")).unwrap_err();
        match err {
            BuildError::Copy { from, to, .. } => {
                assert_eq!(from, PathBuf::from("/work/a.py"));
                assert_eq!(to, PathBuf::from("/work/demo/src/demo_u1/a.py"));
            }
            other => panic!("expected Copy, got {other:?}"),
        }
        // Nothing after the copy step ran
        assert!(!fs.is_file(Path::new("/work/demo/src/demo_u1/__init__.py")));
        assert!(!fs.is_file(Path::new("/work/demo/README.md")));
    }

    #[test]
    fn test_source_already_in_package_is_left_alone() {
        let fs = workspace(r#"{"name": "demo", "layout": "flat", "files": ["demo/src/a.py"]}"#)
            .with_file("/work/demo/src/a.py", "print('keep me')\n");
        fs.deny_write("/work/demo/src/a.py");

        let summary = create_package(&fs, &options(), Path::new("config.json")).unwrap();

        assert_eq!(summary.copied, vec![PathBuf::from("/work/demo/src/a.py")]);
        assert_eq!(fs.text("/work/demo/src/a.py").unwrap(), "print('keep me')\n");
        assert!(fs
            .text("/work/demo/__init__.py")
            .unwrap()
            .contains("from .src.a import *"));
    }

    #[test]
    fn test_source_already_in_package_keeps_bytes_on_local_fs() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("demo/src")).unwrap();
        std::fs::write(tmp.path().join("demo/src/a.py"), "print('keep me')\n").unwrap();
        std::fs::write(
            tmp.path().join("config.json"),
            r#"{"name": "demo", "layout": "flat", "files": ["demo/src/a.py"]}"#,
        )
        .unwrap();

        let options = BuildOptions::new(tmp.path(), "2030");
        let summary =
            create_package(&crate::core::fs::LocalFs, &options, Path::new("config.json")).unwrap();

        assert_eq!(summary.copied.len(), 1);
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("demo/src/a.py")).unwrap(),
            "print('keep me')\n"
        );
    }
}
