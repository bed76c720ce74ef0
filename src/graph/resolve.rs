//! Effective-attribute resolution.
//!
//! Every query here is a pure function of `(node, environment)`: the graph
//! is never mutated and results are recomputed on each call, so generators
//! may resolve the same node repeatedly and independently.
//!
//! All list attributes share one algorithm: the node's own values, then the
//! contribution of each active tag overlay in environment tag order, then
//! each config's effective values in declaration order, depth-first.
//! Concatenation is ordered and duplicate-preserving. The MSBuild settings
//! bag and project configuration list use dedicated merge semantics, see
//! [`Graph::msbuild_settings`] and [`Graph::msbuild_project`].
//!
//! Config edges are followed recursively, so a visited stack guards every
//! traversal and a cycle fails with [`GraphError::CyclicConfig`] instead of
//! recursing without bound.

use camino::Utf8PathBuf;
use std::collections::HashMap;

use super::{AttrLists, Environment, Graph, GraphError, Node, NodeId};
use crate::ast::{MsbuildProject, MsbuildSettings};

impl Graph {
    /// Walk `id` and its configs depth-first, invoking `visit` for each
    /// layer before descending into its configs.
    fn visit_layers<F>(
        &self,
        id: NodeId,
        stack: &mut Vec<NodeId>,
        visit: &mut F,
    ) -> Result<(), GraphError>
    where
        F: FnMut(&Node),
    {
        if stack.contains(&id) {
            return Err(GraphError::CyclicConfig {
                name: self.node(id).name.clone(),
            });
        }
        stack.push(id);
        let node = self.node(id);
        visit(node);
        for &config in &node.configs {
            self.visit_layers(config, stack, visit)?;
        }
        stack.pop();
        Ok(())
    }

    fn effective<T, F>(
        &self,
        id: NodeId,
        env: &Environment,
        select: F,
    ) -> Result<Vec<T>, GraphError>
    where
        T: Clone,
        F: Fn(&AttrLists) -> &[T],
    {
        let mut out = Vec::new();
        self.visit_layers(id, &mut Vec::new(), &mut |node| {
            out.extend_from_slice(select(&node.lists));
            for tag in &env.tags {
                if let Some(overlay) = node.tagged.get(tag) {
                    out.extend_from_slice(select(&overlay.lists));
                }
            }
        })?;
        Ok(out)
    }

    /// Effective header file paths.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn headers(&self, id: NodeId, env: &Environment) -> Result<Vec<Utf8PathBuf>, GraphError> {
        self.effective(id, env, |lists| lists.headers.as_slice())
    }

    /// Effective source file paths.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn sources(&self, id: NodeId, env: &Environment) -> Result<Vec<Utf8PathBuf>, GraphError> {
        self.effective(id, env, |lists| lists.sources.as_slice())
    }

    /// Effective include search directories.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn include_dirs(
        &self,
        id: NodeId,
        env: &Environment,
    ) -> Result<Vec<Utf8PathBuf>, GraphError> {
        self.effective(id, env, |lists| lists.include_dirs.as_slice())
    }

    /// Effective library search directories.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn lib_dirs(&self, id: NodeId, env: &Environment) -> Result<Vec<Utf8PathBuf>, GraphError> {
        self.effective(id, env, |lists| lists.lib_dirs.as_slice())
    }

    /// Effective preprocessor definitions.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn defines(&self, id: NodeId, env: &Environment) -> Result<Vec<String>, GraphError> {
        self.effective(id, env, |lists| lists.defines.as_slice())
    }

    /// Effective language-independent compiler flags.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn compiler_flags(&self, id: NodeId, env: &Environment) -> Result<Vec<String>, GraphError> {
        self.effective(id, env, |lists| lists.compiler_flags.as_slice())
    }

    /// Effective C-only compiler flags.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn compiler_flags_c(
        &self,
        id: NodeId,
        env: &Environment,
    ) -> Result<Vec<String>, GraphError> {
        self.effective(id, env, |lists| lists.compiler_flags_c.as_slice())
    }

    /// Effective C++-only compiler flags.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn compiler_flags_cxx(
        &self,
        id: NodeId,
        env: &Environment,
    ) -> Result<Vec<String>, GraphError> {
        self.effective(id, env, |lists| lists.compiler_flags_cxx.as_slice())
    }

    /// Effective linker flags.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn linker_flags(&self, id: NodeId, env: &Environment) -> Result<Vec<String>, GraphError> {
        self.effective(id, env, |lists| lists.linker_flags.as_slice())
    }

    /// Effective MSBuild settings bag.
    ///
    /// Categories merge with first-writer-wins precedence: the node's own
    /// values, then active tag overlays in tag order, then configs in
    /// declaration order, depth-first. The most specific declaration always
    /// wins; configs behave as low-priority defaults.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn msbuild_settings(
        &self,
        id: NodeId,
        env: &Environment,
    ) -> Result<MsbuildSettings, GraphError> {
        let mut result = MsbuildSettings::default();
        self.visit_layers(id, &mut Vec::new(), &mut |node| {
            result.merge_missing(&node.settings);
            for tag in &env.tags {
                if let Some(overlay) = node.tagged.get(tag) {
                    result.merge_missing(&overlay.settings);
                }
            }
        })?;
        Ok(result)
    }

    /// Effective MSBuild project configuration list.
    ///
    /// The node's own list seeds the result. Config contributions are keyed
    /// on `(configuration, platform)`: an existing entry accumulates the
    /// contributed tags, a new key appends the whole entry. Extension
    /// settings and targets imports concatenate across all layers.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CyclicConfig`] when config composition loops.
    pub fn msbuild_project(&self, id: NodeId) -> Result<MsbuildProject, GraphError> {
        let mut result = MsbuildProject::default();
        let mut index: HashMap<String, usize> = HashMap::new();
        self.visit_layers(id, &mut Vec::new(), &mut |node| {
            for conf in &node.project.configurations {
                let key = format!("{}|{}", conf.configuration, conf.platform);
                if let Some(&at) = index.get(&key) {
                    if let Some(existing) = result.configurations.get_mut(at) {
                        existing.tags.extend(conf.tags.iter().cloned());
                    }
                } else {
                    index.insert(key, result.configurations.len());
                    result.configurations.push(conf.clone());
                }
            }
            result
                .extension_settings
                .extend(node.project.extension_settings.iter().cloned());
            result
                .extension_targets
                .extend(node.project.extension_targets.iter().cloned());
        })?;
        Ok(result)
    }
}
