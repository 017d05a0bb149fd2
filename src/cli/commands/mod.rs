//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod check;
pub mod clean;
pub mod compile;

use anyhow::Result;
use clap::Subcommand;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build dependency units, then project units in dependency order
    Compile {
        /// Only build dependency units
        #[arg(long)]
        deps_only: bool,

        /// Build profile
        #[arg(short, long, env = "STAGECRAFT_PROFILE")]
        profile: Option<String>,

        /// Number of parallel jobs (0 uses every CPU)
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// Validate configuration without building
    Check {
        /// Build profile
        #[arg(short, long, env = "STAGECRAFT_PROFILE")]
        profile: Option<String>,
    },

    /// Remove build output
    Clean {
        /// Build profile
        #[arg(short, long, env = "STAGECRAFT_PROFILE")]
        profile: Option<String>,

        /// Remove the whole build directory
        #[arg(long)]
        all: bool,
    },
}

impl Commands {
    /// Execute the command
    pub async fn run(self) -> Result<()> {
        let current_dir = std::env::current_dir()?;
        match self {
            Self::Compile {
                deps_only,
                profile,
                jobs,
            } => {
                compile::execute(
                    &current_dir,
                    compile::CompileOptions {
                        deps_only,
                        profile,
                        jobs,
                    },
                )
                .await
            }
            Self::Check { profile } => check::execute(&current_dir, profile).await,
            Self::Clean { profile, all } => clean::execute(&current_dir, profile, all).await,
        }
    }
}
