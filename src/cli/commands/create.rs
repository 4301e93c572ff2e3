//! Create a package from a configuration file

use console::style;
use miette::{IntoDiagnostic, Result};
use std::path::{Path, PathBuf};

use crate::core::builder::{create_package, BuildOptions, BuildSummary};
use crate::core::config::DEFAULT_CONFIG_FILE;
use crate::core::fs::LocalFs;

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    /// Path to the JSON configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

pub fn run(args: CreateArgs) -> Result<()> {
    let cwd = std::env::current_dir().into_diagnostic()?;
    let options = BuildOptions::current_year(cwd);

    let summary = create_package(&LocalFs, &options, &args.config)?;

    println!();
    println!(
        "{} Package created at {}",
        style("✓").green(),
        style(relative(&summary.root, &options.base_dir).display()).cyan()
    );
    print_structure(&summary.root);
    print_notes(&summary);

    Ok(())
}

fn relative<'a>(path: &'a Path, base: &Path) -> &'a Path {
    path.strip_prefix(base).unwrap_or(path)
}

fn print_structure(root: &Path) {
    let entries = walkdir::WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok());

    for entry in entries {
        let indent = "  ".repeat(entry.depth());
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            println!("{}📁 {}/", indent, style(name).dim());
        } else {
            println!("{}📄 {}", indent, style(name).dim());
        }
    }
}

fn print_notes(summary: &BuildSummary) {
    if summary.skipped.is_empty() && summary.warnings.is_empty() {
        return;
    }

    println!();
    if !summary.skipped.is_empty() {
        println!(
            "{} Skipped {} invalid file entr{}",
            style("!").yellow(),
            summary.skipped.len(),
            if summary.skipped.len() == 1 { "y" } else { "ies" }
        );
    }
    for warning in &summary.warnings {
        println!("{} {}", style("!").yellow(), warning);
    }
}
