//! CLI execution and command dispatch logic.
//!
//! This module keeps `main` minimal by providing a single entry point that
//! loads the manifest, builds the target graph, and dispatches to the
//! backend selected by the subcommand.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::graph::{Environment, Graph};
use crate::{manifest, msbuild, ninja_gen};

/// Execute the parsed [`Cli`] commands.
///
/// # Errors
///
/// Returns an error if manifest loading, graph construction, generation, or
/// writing the output files fails.
pub fn run(cli: &Cli) -> Result<()> {
    let targets = manifest::load(&cli.file)
        .with_context(|| format!("failed to load manifest '{}'", cli.file))?;
    let graph = Graph::from_targets(&targets).context("failed to build the target graph")?;

    let env = Environment {
        out_dir: cli.out_dir.clone(),
        project_dir: cli
            .project_dir
            .clone()
            .unwrap_or_else(|| cli.out_dir.clone()),
        tags: cli.tags.clone(),
    };

    let command = cli.command.clone().unwrap_or(Commands::Ninja {
        file: "build.ninja".into(),
    });
    match command {
        Commands::Ninja { file } => write_ninja(&graph, &env, &file),
        Commands::Msbuild { solution } => write_msbuild(&graph, &env, &solution),
    }
}

fn write_file(path: &Utf8Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory '{parent}'"))?;
    }
    fs::write(path, content).with_context(|| format!("failed to write '{path}'"))
}

fn write_ninja(graph: &Graph, env: &Environment, file: &Utf8Path) -> Result<()> {
    let content = ninja_gen::generate(graph, env).context("failed to generate the Ninja file")?;
    write_file(file, &content)?;
    info!(file = %file, "generated");
    Ok(())
}

fn write_msbuild(graph: &Graph, env: &Environment, solution: &str) -> Result<()> {
    let projects =
        msbuild::generate(graph, env).context("failed to generate the project files")?;

    for project in &projects {
        write_file(&project.file_path, &project.project_document())?;
        info!(file = %project.file_path, "generated");

        let filters_path = Utf8PathBuf::from(format!("{}.filters", project.file_path));
        write_file(&filters_path, &project.filters_document())?;
        info!(file = %filters_path, "generated");
    }

    let solution_path = env.out_dir.join(format!("{solution}.sln"));
    write_file(
        &solution_path,
        &msbuild::render_solution(&solution_path, &projects),
    )?;
    info!(file = %solution_path, "generated");
    Ok(())
}
