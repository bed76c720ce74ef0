//! Kanna manifest structures.
//!
//! This module defines the data structures used to represent a decoded
//! manifest file. They mirror the TOML schema and are deserialised with
//! `serde` + `toml`. Path lists are plain strings at this stage; the
//! manifest loader normalises them against the declaring file's directory
//! before the graph is built.
//!
//! ```rust
//! use kanna::ast::Manifest;
//!
//! let toml = r#"
//! [[targets]]
//! name = "hello"
//! type = "executable"
//! sources = ["main.cpp"]
//! "#;
//! let manifest: Manifest = toml::from_str(toml).expect("parse");
//! assert_eq!(manifest.targets[0].name, "hello");
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level manifest structure parsed from a manifest file.
///
/// A manifest holds a flat list of target declarations. Targets may refer to
/// targets declared in other manifest files; the loader follows those
/// references transitively.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Manifest {
    /// Build targets and reusable config fragments declared by this file.
    #[serde(default)]
    pub targets: Vec<Target>,
}

/// A build target or reusable config fragment declaration.
///
/// Every list defaults to empty so that config-only targets can omit most
/// fields. The `type` key selects the output kind; targets without one act
/// purely as attribute providers for other targets.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Target {
    /// Unique target name, referenced by `deps` and `configs`.
    pub name: String,

    /// Output kind: `executable`, `static_library`, or `dynamic_library`.
    #[serde(default, rename = "type")]
    pub kind: String,

    /// Header files belonging to the target.
    #[serde(default)]
    pub headers: Vec<String>,

    /// Source files compiled into the target.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Header/include search directories.
    #[serde(default)]
    pub include_dirs: Vec<String>,

    /// Library search directories.
    #[serde(default)]
    pub lib_dirs: Vec<String>,

    /// Preprocessor macro definitions.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Compiler flags applied to every source language.
    #[serde(default)]
    pub cflags: Vec<String>,

    /// Compiler flags applied to C sources only.
    #[serde(default)]
    pub cflags_c: Vec<String>,

    /// Compiler flags applied to C++ sources only.
    #[serde(default)]
    pub cflags_cc: Vec<String>,

    /// Linker flags.
    #[serde(default)]
    pub ldflags: Vec<String>,

    /// Targets this one links against. Entries may be qualified with a
    /// manifest path as `path/to/manifest.toml:name`.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Targets whose attributes are merged into this one as low-priority
    /// defaults. The same qualification syntax as `deps` applies.
    #[serde(default)]
    pub configs: Vec<String>,

    /// Attribute overlays applied only when the named tag is active.
    #[serde(default)]
    pub tagged: IndexMap<String, Tagged>,

    /// MSBuild settings bag for the project generator.
    #[serde(default)]
    pub msbuild_settings: MsbuildSettings,

    /// MSBuild project configuration matrix.
    #[serde(default)]
    pub msbuild_project: MsbuildProject,
}

/// An attribute overlay selected by an environment tag.
///
/// Overlays carry the same attribute shape as a target but no relations and
/// no project configuration matrix.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Tagged {
    /// Header files contributed by the overlay.
    #[serde(default)]
    pub headers: Vec<String>,

    /// Source files contributed by the overlay.
    #[serde(default)]
    pub sources: Vec<String>,

    /// Include directories contributed by the overlay.
    #[serde(default)]
    pub include_dirs: Vec<String>,

    /// Library search directories contributed by the overlay.
    #[serde(default)]
    pub lib_dirs: Vec<String>,

    /// Preprocessor definitions contributed by the overlay.
    #[serde(default)]
    pub defines: Vec<String>,

    /// Generic compiler flags contributed by the overlay.
    #[serde(default)]
    pub cflags: Vec<String>,

    /// C compiler flags contributed by the overlay.
    #[serde(default)]
    pub cflags_c: Vec<String>,

    /// C++ compiler flags contributed by the overlay.
    #[serde(default)]
    pub cflags_cc: Vec<String>,

    /// Linker flags contributed by the overlay.
    #[serde(default)]
    pub ldflags: Vec<String>,

    /// MSBuild settings contributed by the overlay.
    #[serde(default)]
    pub msbuild_settings: MsbuildSettings,
}

/// Grouped key/value settings consumed by the MSBuild project generator.
///
/// Each category maps to one settings scope of a `.vcxproj` file. Categories
/// merge with first-writer-wins semantics: a key already present in the
/// accumulator is never overwritten by a later layer.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MsbuildSettings {
    /// Compiler settings (`<ClCompile>` item definitions).
    #[serde(default, rename = "ClCompile")]
    pub cl_compile: IndexMap<String, String>,

    /// Linker settings (`<Link>` item definitions).
    #[serde(default, rename = "Link")]
    pub link: IndexMap<String, String>,

    /// Archiver settings (`<Lib>` item definitions).
    #[serde(default, rename = "Lib")]
    pub lib: IndexMap<String, String>,

    /// Global project properties.
    #[serde(default, rename = "Globals")]
    pub globals: IndexMap<String, String>,

    /// Per-configuration properties (`Label="Configuration"` groups).
    #[serde(default, rename = "Configuration")]
    pub configuration: IndexMap<String, String>,

    /// User macro properties.
    #[serde(default, rename = "User")]
    pub user: IndexMap<String, String>,

    /// General per-configuration properties (unlabelled groups).
    #[serde(default, rename = "General")]
    pub general: IndexMap<String, String>,
}

impl MsbuildSettings {
    /// Merge `other` into `self`, adding only keys not already present.
    pub fn merge_missing(&mut self, other: &Self) {
        merge_missing_map(&mut self.cl_compile, &other.cl_compile);
        merge_missing_map(&mut self.link, &other.link);
        merge_missing_map(&mut self.lib, &other.lib);
        merge_missing_map(&mut self.globals, &other.globals);
        merge_missing_map(&mut self.configuration, &other.configuration);
        merge_missing_map(&mut self.user, &other.user);
        merge_missing_map(&mut self.general, &other.general);
    }
}

fn merge_missing_map(acc: &mut IndexMap<String, String>, other: &IndexMap<String, String>) {
    for (key, value) in other {
        if !acc.contains_key(key) {
            acc.insert(key.clone(), value.clone());
        }
    }
}

/// One (configuration, platform) entry of the project configuration matrix.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfiguration {
    /// Configuration name, for example `Debug`.
    pub configuration: String,

    /// Platform name, for example `x64`.
    pub platform: String,

    /// Tags activated when generating under this configuration.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Override for the executable file suffix; defaults to `.exe`.
    #[serde(default)]
    pub executable_extension: Option<String>,

    /// Override for the static library file suffix; defaults to `.lib`.
    #[serde(default)]
    pub static_library_extension: Option<String>,

    /// Override for the dynamic library file suffix; defaults to `.dll`.
    #[serde(default)]
    pub dynamic_library_extension: Option<String>,
}

/// Configurations and extension imports for the MSBuild generator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MsbuildProject {
    /// The project's configuration matrix.
    #[serde(default)]
    pub configurations: Vec<ProjectConfiguration>,

    /// Property files imported into the `ExtensionSettings` group.
    #[serde(default, rename = "ExtensionSettings")]
    pub extension_settings: Vec<String>,

    /// Targets files imported into the `ExtensionTargets` group.
    #[serde(default, rename = "ExtensionTargets")]
    pub extension_targets: Vec<String>,
}
