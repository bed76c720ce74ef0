//! Command line interface definition using clap.
//!
//! This module defines the [`Cli`] structure and its subcommands. Each
//! subcommand selects one generator backend; when none is given the Ninja
//! backend is assumed.

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// Generate Ninja build files and Visual Studio projects from a declarative
/// manifest.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the manifest file to use.
    #[arg(short, long, value_name = "FILE", default_value = "kanna.toml")]
    pub file: Utf8PathBuf,

    /// Directory receiving build outputs.
    #[arg(short, long, value_name = "DIR", default_value = "out")]
    pub out_dir: Utf8PathBuf,

    /// Directory receiving generated project files; defaults to the output
    /// directory.
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<Utf8PathBuf>,

    /// Activate a tag; may be given multiple times, applied in order.
    #[arg(short = 't', long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Enable verbose diagnostic logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Optional subcommand to execute; defaults to `ninja` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Apply the default command if none was specified.
    #[must_use]
    pub fn with_default_command(mut self) -> Self {
        if self.command.is_none() {
            self.command = Some(Commands::Ninja {
                file: default_ninja_path(),
            });
        }
        self
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            file: Utf8PathBuf::from("kanna.toml"),
            out_dir: Utf8PathBuf::from("out"),
            project_dir: None,
            tags: Vec::new(),
            verbose: false,
            command: None,
        }
        .with_default_command()
    }
}

/// Available top-level commands.
#[derive(Debug, Subcommand, PartialEq, Eq, Clone)]
pub enum Commands {
    /// Write a Ninja build file.
    Ninja {
        /// Output path for the generated Ninja file.
        #[arg(value_name = "FILE", default_value = "build.ninja")]
        file: Utf8PathBuf,
    },

    /// Write Visual Studio project files and a solution.
    Msbuild {
        /// Solution name, without the `.sln` extension.
        #[arg(long, value_name = "NAME", default_value = "out")]
        solution: String,
    },
}

/// Return the default Ninja output path when none is provided.
fn default_ninja_path() -> Utf8PathBuf {
    Utf8PathBuf::from("build.ninja")
}
