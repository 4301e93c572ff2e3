//! CLI argument definitions using clap derive

use clap::Parser;

use crate::cli::commands::create::CreateArgs;

#[derive(Parser, Debug)]
#[command(name = "pypackify")]
#[command(author, version, about = "Scaffold a Python package from a JSON config")]
#[command(long_about = "Copies Python source files into a package layout and generates __init__.py, README.md, pyproject.toml, and LICENSE from a JSON configuration file.")]
pub struct Cli {
    #[command(flatten)]
    pub create: CreateArgs,
}
