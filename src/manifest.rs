//! Manifest loading.
//!
//! The loader reads the root manifest plus every manifest reachable through
//! qualified references, producing one flat target list for graph
//! construction. A qualified reference names a target declared in another
//! manifest file as `path/to/manifest.toml:name`; the path part is resolved
//! against the directory of the file declaring the reference.
//!
//! Loading normalises all path lists to cleaned absolute paths and strips
//! reference qualifiers down to bare target names, so downstream stages
//! never deal with file-system layout.

use camino::{Utf8Path, Utf8PathBuf};
use miette::Diagnostic;
use std::collections::{HashSet, VecDeque};
use std::fs;
use thiserror::Error;

use crate::ast::{Manifest, Target};
use crate::paths;

/// Errors raised while loading manifest files.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    /// A referenced manifest file does not exist.
    #[error("manifest not found: {path}")]
    #[diagnostic(code(kanna::manifest::not_found))]
    NotFound {
        /// The missing file.
        path: Utf8PathBuf,
    },

    /// A manifest file could not be read.
    #[error("failed to read manifest: {path}")]
    #[diagnostic(code(kanna::manifest::io))]
    Io {
        /// The unreadable file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A manifest file is not valid TOML or does not match the schema.
    #[error("failed to parse manifest: {path}")]
    #[diagnostic(code(kanna::manifest::parse))]
    Parse {
        /// The malformed file.
        path: Utf8PathBuf,
        /// The decoding error.
        #[source]
        source: toml::de::Error,
    },

    /// The working directory is unavailable or not valid UTF-8.
    #[error("cannot determine the current directory")]
    #[diagnostic(code(kanna::manifest::current_dir))]
    CurrentDir,
}

/// Split a target reference into its optional manifest path and target name.
///
/// The name is everything after the last `:`; a reference without one is a
/// bare name local to the graph.
#[must_use]
pub fn split_target_ref(reference: &str) -> (Option<&str>, &str) {
    match reference.rsplit_once(':') {
        Some((file, name)) => (Some(file), name),
        None => (None, reference),
    }
}

/// Load `root` and every manifest it references, returning the combined
/// target list in encounter order.
///
/// # Errors
///
/// Returns [`ManifestError`] when a manifest is missing, unreadable, or
/// fails to parse.
pub fn load(root: &Utf8Path) -> Result<Vec<Target>, ManifestError> {
    let current_dir = std::env::current_dir()
        .ok()
        .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok())
        .ok_or(ManifestError::CurrentDir)?;

    let mut targets = Vec::new();
    let mut seen: HashSet<Utf8PathBuf> = HashSet::new();
    let mut queue: VecDeque<Utf8PathBuf> = VecDeque::new();
    queue.push_back(paths::join_clean(&current_dir, root));

    while let Some(file) = queue.pop_front() {
        if !seen.insert(file.clone()) {
            continue;
        }
        tracing::debug!(manifest = %file, "loading manifest");

        let manifest = read_manifest(&file)?;
        let base_dir = file.parent().unwrap_or(Utf8Path::new(".")).to_owned();

        let mut required = Vec::new();
        for target in manifest.targets {
            for reference in target.deps.iter().chain(target.configs.iter()) {
                if let (Some(path), _) = split_target_ref(reference) {
                    required.push(paths::join_clean(&base_dir, Utf8Path::new(path)));
                }
            }
            targets.push(normalize_target(target, &base_dir));
        }
        // Referenced manifests load before anything already queued, so
        // target order follows the reference chain.
        for path in required.into_iter().rev() {
            queue.push_front(path);
        }
    }

    Ok(targets)
}

fn read_manifest(path: &Utf8Path) -> Result<Manifest, ManifestError> {
    if !path.exists() {
        return Err(ManifestError::NotFound {
            path: path.to_owned(),
        });
    }
    let text = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_owned(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| ManifestError::Parse {
        path: path.to_owned(),
        source,
    })
}

fn normalize_path_list(base_dir: &Utf8Path, list: &mut Vec<String>) {
    for entry in list {
        *entry = paths::join_clean(base_dir, Utf8Path::new(entry.as_str())).into_string();
    }
}

fn strip_qualifiers(list: &mut Vec<String>) {
    for entry in list {
        let (_, name) = split_target_ref(entry);
        if name.len() != entry.len() {
            *entry = name.to_owned();
        }
    }
}

fn normalize_target(mut target: Target, base_dir: &Utf8Path) -> Target {
    normalize_path_list(base_dir, &mut target.headers);
    normalize_path_list(base_dir, &mut target.sources);
    normalize_path_list(base_dir, &mut target.include_dirs);
    normalize_path_list(base_dir, &mut target.lib_dirs);
    for overlay in target.tagged.values_mut() {
        normalize_path_list(base_dir, &mut overlay.headers);
        normalize_path_list(base_dir, &mut overlay.sources);
        normalize_path_list(base_dir, &mut overlay.include_dirs);
        normalize_path_list(base_dir, &mut overlay.lib_dirs);
    }
    strip_qualifiers(&mut target.deps);
    strip_qualifiers(&mut target.configs);
    target
}
