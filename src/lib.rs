//! PyPackify: scaffold a Python package from a JSON configuration file
//!
//! Copies source files into a package layout and generates `__init__.py`,
//! `README.md`, `pyproject.toml`, and `LICENSE` from embedded templates.

pub mod cli;
pub mod core;
pub mod template;
