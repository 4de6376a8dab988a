//! Module and reference model of a TypeScript project's exported API surface.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;

pub use crate::config::Config;
pub use crate::core::{Analysis, Analyzer, Engine, OutputDocument};
pub use crate::error::{ExportMapError, Result};
