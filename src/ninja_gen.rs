//! Ninja file generator.
//!
//! This module projects a resolved [`Graph`](crate::graph::Graph) onto the
//! line-oriented text format expected by the Ninja build system. Statements
//! switch to a continuation-line layout as soon as they carry more than one
//! output or input, and per-statement variables are sorted lexicographically
//! so repeated runs produce byte-identical files.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::{self, Display, Formatter};

use crate::graph::{Environment, Graph, GraphError, NodeId, OutputKind};
use crate::paths;
use crate::source_type::SourceKind;

/// A Ninja rule block.
#[derive(Debug, Clone, Default)]
pub struct NinjaRule {
    /// Rule name referenced by build statements.
    pub name: String,
    /// Command template.
    pub command: String,
    /// Optional human-friendly description.
    pub description: Option<String>,
    /// Optional dependency-scanning mode (`gcc` or `msvc`).
    pub deps: Option<String>,
    /// Optional dependency file path template.
    pub depfile: Option<String>,
}

/// A Ninja build statement.
#[derive(Debug, Clone, Default)]
pub struct NinjaBuild {
    /// Rule invoked by this statement.
    pub rule: String,
    /// Explicit outputs.
    pub outputs: Vec<Utf8PathBuf>,
    /// Implicit outputs, rendered after a `|` separator.
    pub implicit_outputs: Vec<Utf8PathBuf>,
    /// Explicit inputs.
    pub inputs: Vec<Utf8PathBuf>,
    /// Implicit inputs, rendered after a `|` separator.
    pub implicit_deps: Vec<Utf8PathBuf>,
    /// Per-statement variable bindings.
    pub variables: IndexMap<String, String>,
    /// Optional resource pool.
    pub pool: Option<String>,
}

/// An in-memory Ninja document: variables, then rules, then build
/// statements.
#[derive(Debug, Default)]
pub struct NinjaFile {
    variables: Vec<(String, String)>,
    rules: Vec<NinjaRule>,
    builds: Vec<NinjaBuild>,
}

impl NinjaFile {
    /// Append a top-level variable declaration.
    pub fn add_variable(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.push((key.into(), value.into()));
    }

    /// Append a rule block.
    pub fn add_rule(&mut self, rule: NinjaRule) {
        self.rules.push(rule);
    }

    /// Append a build statement.
    pub fn add_build(&mut self, build: NinjaBuild) {
        self.builds.push(build);
    }
}

impl Display for NinjaRule {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "rule {}", self.name)?;
        if let Some(description) = &self.description {
            writeln!(f, "  description = {description}")?;
        }
        writeln!(f, "  command = {}", self.command)?;
        if let Some(deps) = &self.deps {
            writeln!(f, "  deps = {deps}")?;
        }
        if let Some(depfile) = &self.depfile {
            writeln!(f, "  depfile = {depfile}")?;
        }
        Ok(())
    }
}

/// Write one output/input group, optionally preceded by the `|` marker
/// separating explicit from implicit entries.
fn write_group(
    f: &mut Formatter<'_>,
    paths: &[Utf8PathBuf],
    multi_line: bool,
    implicit: bool,
) -> fmt::Result {
    if implicit {
        if paths.is_empty() {
            return Ok(());
        }
        write!(f, " | ")?;
        if multi_line {
            write!(f, "$\n  ")?;
        }
    } else if !paths.is_empty() {
        if multi_line {
            write!(f, " $\n  ")?;
        } else {
            write!(f, " ")?;
        }
    }
    for (index, path) in paths.iter().enumerate() {
        if index > 0 {
            write!(f, " $\n  ")?;
        }
        write!(f, "{path}")?;
    }
    Ok(())
}

impl Display for NinjaBuild {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let multi_line = self.outputs.len() + self.implicit_outputs.len() > 1
            || self.inputs.len() + self.implicit_deps.len() > 1;

        write!(f, "build")?;
        write_group(f, &self.outputs, multi_line, false)?;
        write_group(f, &self.implicit_outputs, multi_line, true)?;
        write!(f, ": {}", self.rule)?;
        write_group(f, &self.inputs, multi_line, false)?;
        write_group(f, &self.implicit_deps, multi_line, true)?;
        writeln!(f)?;

        for (key, value) in self
            .variables
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
        {
            writeln!(f, "  {key} = {value}")?;
        }
        if let Some(pool) = &self.pool {
            writeln!(f, "  pool = {pool}")?;
        }
        Ok(())
    }
}

impl Display for NinjaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.variables {
            writeln!(f, "{key} = {value}")?;
        }
        if !self.variables.is_empty() {
            writeln!(f)?;
        }
        for (index, rule) in self.rules.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(f, "{rule}")?;
        }
        if !self.rules.is_empty() {
            writeln!(f)?;
        }
        for build in &self.builds {
            writeln!(f, "{build}")?;
        }
        Ok(())
    }
}

/// Generate a Ninja build file for every executable and static-library
/// target in the graph.
///
/// # Errors
///
/// Returns [`GraphError`] when attribute resolution fails, for example on a
/// cyclic config chain.
pub fn generate(graph: &Graph, env: &Environment) -> Result<String, GraphError> {
    let mut file = NinjaFile::default();
    file.add_variable("builddir", env.out_dir.as_str());

    file.add_rule(NinjaRule {
        name: "compile".into(),
        command: "clang -MMD -MF $out.d $defines $include_dirs $cflags -c $in -o $out".into(),
        description: Some("CC $out".into()),
        deps: Some("gcc".into()),
        depfile: Some("$out.d".into()),
    });
    file.add_rule(NinjaRule {
        name: "link".into(),
        command: "clang $in $ldflags -o $out".into(),
        description: Some("LINK $out".into()),
        ..NinjaRule::default()
    });
    file.add_rule(NinjaRule {
        name: "archive".into(),
        command: "ar -rc $out $in".into(),
        description: Some("AR $out".into()),
        ..NinjaRule::default()
    });

    let mut defaults: Vec<Utf8PathBuf> = Vec::new();
    for id in graph.ids() {
        let node = graph.node(id);
        match node.kind {
            OutputKind::Executable => {
                let objects = compile_sources(graph, id, env, &mut file)?;
                let output = executable_path(env, &node.name);
                if graph.roots().contains(&id) {
                    defaults.push(output.clone());
                }
                file.add_build(link_build(graph, id, env, objects, output)?);
            }
            OutputKind::StaticLibrary => {
                let objects = compile_sources(graph, id, env, &mut file)?;
                let output = archive_path(env, &node.name);
                if graph.roots().contains(&id) {
                    defaults.push(output.clone());
                }
                file.add_build(archive_build(graph, id, env, objects, output));
            }
            OutputKind::Unknown | OutputKind::DynamicLibrary => {}
        }
    }

    let mut out = file.to_string();
    if !defaults.is_empty() {
        out.push_str("default ");
        out.push_str(&defaults.iter().map(|p| p.as_str()).join(" "));
        out.push('\n');
    }
    Ok(out)
}

/// Emit one compile statement per classified source of `id`, returning the
/// object file paths in source order. Unrecognised extensions are skipped.
fn compile_sources(
    graph: &Graph,
    id: NodeId,
    env: &Environment,
    file: &mut NinjaFile,
) -> Result<Vec<Utf8PathBuf>, GraphError> {
    let include_dirs = graph.include_dirs(id, env)?;
    let defines = graph.defines(id, env)?;
    let generic_flags = graph.compiler_flags(id, env)?;
    let c_flags = graph.compiler_flags_c(id, env)?;
    let cxx_flags = graph.compiler_flags_cxx(id, env)?;

    let mut objects = Vec::new();
    for source in graph.sources(id, env)? {
        let lang_flags = match SourceKind::of(&source) {
            SourceKind::CSource => &c_flags,
            SourceKind::CppSource => &cxx_flags,
            _ => continue,
        };

        let object = object_path(env, &source);
        objects.push(object.clone());

        let mut variables = IndexMap::new();
        if !include_dirs.is_empty() {
            variables.insert(
                "include_dirs".into(),
                prefixed(include_dirs.iter().map(|p| p.as_str()), "-I"),
            );
        }
        if !defines.is_empty() {
            variables.insert(
                "defines".into(),
                prefixed(defines.iter().map(String::as_str), "-D"),
            );
        }
        let cflags = generic_flags.iter().chain(lang_flags).join(" ");
        if !cflags.is_empty() {
            variables.insert("cflags".into(), cflags);
        }

        file.add_build(NinjaBuild {
            rule: "compile".into(),
            outputs: vec![object],
            inputs: vec![source],
            variables,
            ..NinjaBuild::default()
        });
    }
    Ok(objects)
}

fn link_build(
    graph: &Graph,
    id: NodeId,
    env: &Environment,
    objects: Vec<Utf8PathBuf>,
    output: Utf8PathBuf,
) -> Result<NinjaBuild, GraphError> {
    let node = graph.node(id);
    let mut ldflags = graph.linker_flags(id, env)?;
    for dir in graph.lib_dirs(id, env)? {
        ldflags.push(format!("-L{dir}"));
    }
    ldflags.push(format!("-L{}", env.out_dir.join("bin")));

    let mut archives = Vec::new();
    for &dep in &node.deps {
        let dep_node = graph.node(dep);
        if dep_node.kind == OutputKind::StaticLibrary {
            archives.push(archive_path(env, &dep_node.name));
            ldflags.push(format!("-l{}", dep_node.name));
        }
    }

    let mut variables = IndexMap::new();
    variables.insert("ldflags".into(), ldflags.join(" "));
    Ok(NinjaBuild {
        rule: "link".into(),
        outputs: vec![output],
        inputs: objects,
        implicit_deps: archives,
        variables,
        ..NinjaBuild::default()
    })
}

/// Archive statement for a static library. Dependency archives are folded
/// into the inputs so nested static libraries flatten into the result.
fn archive_build(
    graph: &Graph,
    id: NodeId,
    env: &Environment,
    mut objects: Vec<Utf8PathBuf>,
    output: Utf8PathBuf,
) -> NinjaBuild {
    let node = graph.node(id);
    for &dep in &node.deps {
        let dep_node = graph.node(dep);
        if dep_node.kind == OutputKind::StaticLibrary {
            objects.push(archive_path(env, &dep_node.name));
        }
    }
    NinjaBuild {
        rule: "archive".into(),
        outputs: vec![output],
        inputs: objects,
        ..NinjaBuild::default()
    }
}

/// Object file path for a source: `<out>/obj/<source>.o`, with the source's
/// leading separators stripped so absolute paths nest under the output
/// directory.
fn object_path(env: &Environment, source: &Utf8Path) -> Utf8PathBuf {
    let trimmed = source.as_str().trim_start_matches('/');
    paths::clean(&env.out_dir.join("obj").join(format!("{trimmed}.o")))
}

fn executable_path(env: &Environment, name: &str) -> Utf8PathBuf {
    env.out_dir.join("bin").join(name)
}

fn archive_path(env: &Environment, name: &str) -> Utf8PathBuf {
    env.out_dir.join("bin").join(format!("lib{name}.a"))
}

fn prefixed<'a, I>(items: I, prefix: &str) -> String
where
    I: Iterator<Item = &'a str>,
{
    items.map(|item| format!("{prefix}{item}")).join(" ")
}
