//! Target graph structures.
//!
//! This module defines the backend-agnostic target graph built from decoded
//! manifest targets. Nodes represent build targets or reusable config
//! fragments; generators only ever read the graph, so it is constructed once
//! per invocation and immutable thereafter.
//!
//! Construction is two-pass: all nodes are created first, then dependency
//! and config names are link-resolved into direct node references. This
//! allows forward references within and across imported manifest files.

mod resolve;

use camino::Utf8PathBuf;
use indexmap::IndexMap;
use miette::Diagnostic;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::ast::{self, MsbuildProject, MsbuildSettings};

/// Errors raised while building or resolving the target graph.
#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    /// A dependency or config name did not resolve to any known target.
    #[error("target '{target}' references unknown target '{reference}'")]
    #[diagnostic(code(kanna::graph::unresolved_reference))]
    UnresolvedReference {
        /// The target declaring the reference.
        target: String,
        /// The name that failed to resolve.
        reference: String,
    },

    /// Two targets share one name within the same graph.
    #[error("duplicate target name '{name}'")]
    #[diagnostic(code(kanna::graph::duplicate_target))]
    DuplicateTarget {
        /// The name declared more than once.
        name: String,
    },

    /// Config composition loops back onto a node already being resolved.
    #[error("cyclic config involving target '{name}'")]
    #[diagnostic(code(kanna::graph::cyclic_config))]
    CyclicConfig {
        /// The node at which the cycle was detected.
        name: String,
    },
}

/// The output kind of a target.
///
/// Targets with an [`OutputKind::Unknown`] kind participate in attribute
/// composition as configs but are never emitted as build or IDE artefacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputKind {
    /// No recognised kind; the target is an abstract config fragment.
    #[default]
    Unknown,
    /// An executable.
    Executable,
    /// A static library.
    StaticLibrary,
    /// A dynamic library.
    DynamicLibrary,
}

impl OutputKind {
    /// Decode the manifest `type` string.
    ///
    /// Unrecognised non-empty values log a warning and map to
    /// [`OutputKind::Unknown`] so that abstract targets keep working.
    #[must_use]
    pub fn from_manifest(kind: &str) -> Self {
        match kind {
            "executable" => Self::Executable,
            "static_library" => Self::StaticLibrary,
            "dynamic_library" => Self::DynamicLibrary,
            "" => Self::Unknown,
            other => {
                tracing::warn!(kind = other, "unknown target type");
                Self::Unknown
            }
        }
    }
}

/// Index of a node within its [`Graph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Own-attribute lists of a node or overlay.
///
/// These are the values declared directly on one layer, as opposed to the
/// effective values computed by the resolver.
#[derive(Debug, Clone, Default)]
pub struct AttrLists {
    /// Header files.
    pub headers: Vec<Utf8PathBuf>,
    /// Source files.
    pub sources: Vec<Utf8PathBuf>,
    /// Include search directories.
    pub include_dirs: Vec<Utf8PathBuf>,
    /// Library search directories.
    pub lib_dirs: Vec<Utf8PathBuf>,
    /// Preprocessor definitions.
    pub defines: Vec<String>,
    /// Compiler flags for every language.
    pub compiler_flags: Vec<String>,
    /// C-only compiler flags.
    pub compiler_flags_c: Vec<String>,
    /// C++-only compiler flags.
    pub compiler_flags_cxx: Vec<String>,
    /// Linker flags.
    pub linker_flags: Vec<String>,
}

/// A tag-selected attribute overlay.
#[derive(Debug, Clone, Default)]
pub struct Overlay {
    /// Attribute lists contributed when the tag is active.
    pub lists: AttrLists,
    /// MSBuild settings contributed when the tag is active.
    pub settings: MsbuildSettings,
}

/// A build target or config fragment in the target graph.
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique name within the graph.
    pub name: String,
    /// Output kind.
    pub kind: OutputKind,
    /// Own-attribute lists.
    pub lists: AttrLists,
    /// Own MSBuild settings bag.
    pub settings: MsbuildSettings,
    /// Own MSBuild project configuration matrix.
    pub project: MsbuildProject,
    /// Targets this node links against.
    pub deps: Vec<NodeId>,
    /// Targets merged in as low-priority attribute defaults.
    pub configs: Vec<NodeId>,
    /// Tag-keyed overlays, in declaration order.
    pub tagged: IndexMap<String, Overlay>,
}

/// Ambient resolution context for one generator invocation.
///
/// Tag order is significant: it is the application order for tag overlays.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Directory receiving build outputs.
    pub out_dir: Utf8PathBuf,
    /// Directory receiving generated project files.
    pub project_dir: Utf8PathBuf,
    /// Active tags, in application order.
    pub tags: Vec<String>,
}

impl Environment {
    /// Derive a configuration-scoped environment with `extra` tags appended
    /// after the base tags.
    #[must_use]
    pub fn with_tags(&self, extra: &[String]) -> Self {
        let mut tags = self.tags.clone();
        tags.extend(extra.iter().cloned());
        Self {
            out_dir: self.out_dir.clone(),
            project_dir: self.project_dir.clone(),
            tags,
        }
    }
}

/// A fully linked target graph.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Graph {
    /// Build a graph from decoded manifest targets.
    ///
    /// Targets are expected to carry normalised absolute paths and bare
    /// (unqualified) dependency and config names, as produced by
    /// [`crate::manifest::load`].
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateTarget`] when two targets share a name
    /// and [`GraphError::UnresolvedReference`] when a dependency or config
    /// name is unknown.
    pub fn from_targets(targets: &[ast::Target]) -> Result<Self, GraphError> {
        let mut nodes = Vec::with_capacity(targets.len());
        let mut ids: HashMap<String, NodeId> = HashMap::new();

        for target in targets {
            let id = NodeId(nodes.len());
            if ids.insert(target.name.clone(), id).is_some() {
                return Err(GraphError::DuplicateTarget {
                    name: target.name.clone(),
                });
            }
            nodes.push(Node {
                name: target.name.clone(),
                kind: OutputKind::from_manifest(&target.kind),
                lists: lists_from_target(target),
                settings: target.msbuild_settings.clone(),
                project: target.msbuild_project.clone(),
                deps: Vec::new(),
                configs: Vec::new(),
                tagged: target
                    .tagged
                    .iter()
                    .map(|(tag, overlay)| (tag.clone(), overlay_from_tagged(overlay)))
                    .collect(),
            });
        }

        let mut referenced: HashSet<NodeId> = HashSet::new();
        for (index, target) in targets.iter().enumerate() {
            let deps = resolve_names(&ids, &target.name, &target.deps)?;
            referenced.extend(deps.iter().copied());
            let configs = resolve_names(&ids, &target.name, &target.configs)?;
            let node = &mut nodes[index];
            node.deps = deps;
            node.configs = configs;
        }

        let roots = (0..nodes.len())
            .map(NodeId)
            .filter(|id| !referenced.contains(id))
            .collect();

        Ok(Self { nodes, roots })
    }

    /// Look up a node by identifier.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Look up a node identifier by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|node| node.name == name)
            .map(NodeId)
    }

    /// Iterate over all nodes in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Nodes not referenced as a dependency by any other node, in
    /// declaration order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }
}

fn resolve_names(
    ids: &HashMap<String, NodeId>,
    target: &str,
    names: &[String],
) -> Result<Vec<NodeId>, GraphError> {
    names
        .iter()
        .map(|name| {
            ids.get(name)
                .copied()
                .ok_or_else(|| GraphError::UnresolvedReference {
                    target: target.to_owned(),
                    reference: name.clone(),
                })
        })
        .collect()
}

fn to_paths(list: &[String]) -> Vec<Utf8PathBuf> {
    list.iter().map(Utf8PathBuf::from).collect()
}

fn lists_from_target(target: &ast::Target) -> AttrLists {
    AttrLists {
        headers: to_paths(&target.headers),
        sources: to_paths(&target.sources),
        include_dirs: to_paths(&target.include_dirs),
        lib_dirs: to_paths(&target.lib_dirs),
        defines: target.defines.clone(),
        compiler_flags: target.cflags.clone(),
        compiler_flags_c: target.cflags_c.clone(),
        compiler_flags_cxx: target.cflags_cc.clone(),
        linker_flags: target.ldflags.clone(),
    }
}

fn overlay_from_tagged(tagged: &ast::Tagged) -> Overlay {
    Overlay {
        lists: AttrLists {
            headers: to_paths(&tagged.headers),
            sources: to_paths(&tagged.sources),
            include_dirs: to_paths(&tagged.include_dirs),
            lib_dirs: to_paths(&tagged.lib_dirs),
            defines: tagged.defines.clone(),
            compiler_flags: tagged.cflags.clone(),
            compiler_flags_c: tagged.cflags_c.clone(),
            compiler_flags_cxx: tagged.cflags_cc.clone(),
            linker_flags: tagged.ldflags.clone(),
        },
        settings: tagged.msbuild_settings.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str) -> ast::Target {
        ast::Target {
            name: name.to_owned(),
            ..ast::Target::default()
        }
    }

    #[test]
    fn from_targets_links_references() {
        let mut app = target("app");
        app.kind = "executable".into();
        app.deps = vec!["lib".into()];
        app.configs = vec!["common".into()];
        let mut lib = target("lib");
        lib.kind = "static_library".into();

        let graph = Graph::from_targets(&[app, lib, target("common")]).expect("graph");
        let app_id = graph.find("app").expect("app");
        let node = graph.node(app_id);
        assert_eq!(node.kind, OutputKind::Executable);
        assert_eq!(node.deps.len(), 1);
        assert_eq!(graph.node(node.deps[0]).name, "lib");
        assert_eq!(graph.node(node.configs[0]).name, "common");
    }

    #[test]
    fn roots_exclude_dependencies() {
        let mut app = target("app");
        app.deps = vec!["lib".into()];
        let graph = Graph::from_targets(&[app, target("lib"), target("other")]).expect("graph");

        let roots: Vec<_> = graph
            .roots()
            .iter()
            .map(|&id| graph.node(id).name.as_str())
            .collect();
        assert_eq!(roots, vec!["app", "other"]);
    }

    #[test]
    fn config_references_do_not_remove_roots() {
        let mut app = target("app");
        app.configs = vec!["common".into()];
        let graph = Graph::from_targets(&[app, target("common")]).expect("graph");
        let roots: Vec<_> = graph
            .roots()
            .iter()
            .map(|&id| graph.node(id).name.as_str())
            .collect();
        assert_eq!(roots, vec!["app", "common"]);
    }

    #[test]
    fn unresolved_reference_is_fatal() {
        let mut app = target("app");
        app.deps = vec!["missing".into()];
        let err = Graph::from_targets(&[app]).expect_err("unresolved");
        assert!(matches!(
            err,
            GraphError::UnresolvedReference { ref target, ref reference }
                if target == "app" && reference == "missing"
        ));
    }

    #[test]
    fn duplicate_name_is_fatal() {
        let err = Graph::from_targets(&[target("app"), target("app")]).expect_err("duplicate");
        assert!(matches!(err, GraphError::DuplicateTarget { ref name } if name == "app"));
    }

    #[test]
    fn unknown_kind_maps_to_unknown() {
        let mut odd = target("odd");
        odd.kind = "shared_object".into();
        let graph = Graph::from_targets(&[odd]).expect("graph");
        let id = graph.find("odd").expect("odd");
        assert_eq!(graph.node(id).kind, OutputKind::Unknown);
    }
}
