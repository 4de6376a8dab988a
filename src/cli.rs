use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::Result;
use tracing::info;

use crate::core::Engine;

#[derive(Parser)]
#[command(name = "exportmap")]
#[command(about = "Maps what a TypeScript project exports and where every name comes from")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a default exportmap.toml
    Init {
        /// Target directory (defaults to current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing configuration
        #[arg(long)]
        force: bool,
    },

    /// Build the module and reference model
    Build {
        /// Entry file of a project, repeat for several projects
        #[arg(short, long = "entry")]
        entries: Vec<PathBuf>,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Folder name that does not create a module level
        #[arg(short, long)]
        passthrough: Vec<String>,
    },
}

impl Cli {
    pub async fn execute(self, mut engine: Engine) -> Result<()> {
        match self.command {
            Commands::Init { path, force } => {
                engine.init(path, force).await
            }
            Commands::Build { entries, output, passthrough } => {
                let document = engine.build(entries, output, passthrough).await?;
                for project in &document.projects {
                    info!("  - {}: {} modules", project.name, count_modules(project));
                }
                Ok(())
            }
        }
    }
}

fn count_modules(module: &crate::core::Module) -> usize {
    1 + module.children.values().map(count_modules).sum::<usize>()
}
