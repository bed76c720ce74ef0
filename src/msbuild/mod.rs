//! MSBuild project generator.
//!
//! For every target with a known output kind this module produces a
//! `.vcxproj` project document, a companion `.vcxproj.filters` grouping
//! document, and the per-project data required by the solution assembler.
//!
//! Project identities are content-derived: the GUID is a SHA-256 digest of
//! the project file path shaped like an RFC 4122 identifier, so unchanged
//! inputs always yield the same project files.

mod solution;
mod xml;

pub use solution::{PROJECT_TYPE_GUID, render_solution};
pub use xml::{XML_HEADER, XmlElement};

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt::Write as _;

use crate::ast::MsbuildProject;
use crate::graph::{Environment, Graph, GraphError, NodeId, OutputKind};
use crate::paths;

const MSBUILD_XMLNS: &str = "http://schemas.microsoft.com/developer/msbuild/2003";
const TOOLS_VERSION: &str = "14.0";
const FILTERS_TOOLS_VERSION: &str = "4.0";
const SOURCE_FILTER: &str = "Source Files";
const HEADER_FILTER: &str = "Header Files";

/// A generated Visual Studio project: documents plus the identity and
/// configuration data consumed by the solution assembler.
#[derive(Debug)]
pub struct ProjectFile {
    /// Target name.
    pub name: String,
    /// Stable, content-derived project identifier (uppercase, unbraced).
    pub guid: String,
    /// Absolute or environment-relative path of the `.vcxproj` file.
    pub file_path: Utf8PathBuf,
    /// `Configuration|Platform` condition strings, sorted.
    pub conditions: Vec<String>,
    /// GUIDs of depended-on projects.
    pub depend_projects: Vec<String>,
    /// The `.vcxproj` document.
    pub project: XmlElement,
    /// The `.vcxproj.filters` document.
    pub filters: XmlElement,
}

impl ProjectFile {
    /// Render the `.vcxproj` document, including the XML declaration.
    #[must_use]
    pub fn project_document(&self) -> String {
        format!("{XML_HEADER}{}", self.project)
    }

    /// Render the `.vcxproj.filters` document, including the XML
    /// declaration.
    #[must_use]
    pub fn filters_document(&self) -> String {
        format!("{XML_HEADER}{}", self.filters)
    }
}

/// Derive the stable project GUID from the project file path.
#[must_use]
pub fn project_guid(path: &Utf8Path) -> String {
    let digest = Sha256::digest(path.as_str().as_bytes());
    let mut bytes = [0_u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    // Shape the digest like an RFC 4122 name-based identifier.
    bytes[6] = (bytes[6] & 0x0f) | 0x50;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    let mut hex = String::with_capacity(36);
    for (index, byte) in bytes.iter().enumerate() {
        if matches!(index, 4 | 6 | 8 | 10) {
            hex.push('-');
        }
        let _ = write!(hex, "{byte:02X}");
    }
    hex
}

/// Generate project and filters documents for every target with a known
/// output kind.
///
/// # Errors
///
/// Returns [`GraphError`] when attribute resolution fails, for example on a
/// cyclic config chain.
pub fn generate(graph: &Graph, env: &Environment) -> Result<Vec<ProjectFile>, GraphError> {
    let mut projects = Vec::new();
    let mut by_node: HashMap<NodeId, usize> = HashMap::new();

    for id in graph.ids() {
        let node = graph.node(id);
        if node.kind == OutputKind::Unknown {
            continue;
        }
        let file_path = paths::join_clean(
            &env.project_dir,
            Utf8Path::new(&format!("{}.vcxproj", node.name)),
        );
        let guid = project_guid(&file_path);
        by_node.insert(id, projects.len());
        projects.push(ProjectFile {
            name: node.name.clone(),
            guid,
            file_path,
            conditions: Vec::new(),
            depend_projects: Vec::new(),
            project: XmlElement::default(),
            filters: XmlElement::default(),
        });
    }

    for id in graph.ids() {
        let Some(&at) = by_node.get(&id) else {
            continue;
        };
        let mut depend = Vec::new();
        for dep in &graph.node(id).deps {
            if let Some(&dep_at) = by_node.get(dep) {
                depend.push(projects[dep_at].guid.clone());
            }
        }
        projects[at].depend_projects = depend;
    }

    for id in graph.ids() {
        let Some(&at) = by_node.get(&id) else {
            continue;
        };
        let resolved = graph.msbuild_project(id)?;
        let project = &mut projects[at];
        build_project(graph, id, env, &resolved, project)?;
    }

    Ok(projects)
}

fn configuration_type(kind: OutputKind) -> &'static str {
    match kind {
        OutputKind::StaticLibrary => "StaticLibrary",
        OutputKind::DynamicLibrary => "DynamicLibrary",
        OutputKind::Executable | OutputKind::Unknown => "Application",
    }
}

fn condition_attr(condition: &str) -> String {
    format!("'$(Configuration)|$(Platform)'=='{condition}'")
}

fn dirs_joined(dirs: &[Utf8PathBuf], out_dir: &Utf8Path) -> String {
    let mut joined = String::new();
    for dir in dirs {
        joined.push_str(paths::relative_to(dir, out_dir).as_str());
        joined.push(';');
    }
    joined
}

fn settings_group(element: &mut XmlElement, name: &str, map: &IndexMap<String, String>) {
    if map.is_empty() {
        return;
    }
    let group = element.child(name);
    for (key, value) in map {
        group.child(key.clone()).set_text(value.clone());
    }
    group.sort_children_by_name();
}

fn build_project(
    graph: &Graph,
    id: NodeId,
    env: &Environment,
    resolved: &MsbuildProject,
    project: &mut ProjectFile,
) -> Result<(), GraphError> {
    let node = graph.node(id);

    let mut configuration_groups = Vec::new();
    let mut general_groups = Vec::new();
    let mut item_definition_groups = Vec::new();

    for config in &resolved.configurations {
        let config_env = env.with_tags(&config.tags);
        let static_library_extension = config
            .static_library_extension
            .clone()
            .unwrap_or_else(|| ".lib".to_owned());

        let mut settings = graph.msbuild_settings(id, &config_env)?;
        settings.configuration.insert(
            "ConfigurationType".into(),
            configuration_type(node.kind).to_owned(),
        );

        let mut include_dirs = dirs_joined(&graph.include_dirs(id, &config_env)?, &env.out_dir);
        include_dirs.push_str("%(AdditionalIncludeDirectories)");
        settings
            .cl_compile
            .insert("AdditionalIncludeDirectories".into(), include_dirs);

        let mut defines = String::new();
        for define in graph.defines(id, &config_env)? {
            defines.push_str(&define);
            defines.push(';');
        }
        defines.push_str("%(PreprocessorDefinitions)");
        settings
            .cl_compile
            .insert("PreprocessorDefinitions".into(), defines);

        let mut lib_dirs = dirs_joined(&graph.lib_dirs(id, &config_env)?, &env.out_dir);
        lib_dirs.push_str("$(OutDir);%(AdditionalLibraryDirectories)");

        let mut dependencies = String::new();
        for &dep in &node.deps {
            let dep_node = graph.node(dep);
            if dep_node.kind == OutputKind::StaticLibrary {
                dependencies.push_str("$(OutDir)");
                dependencies.push_str(&dep_node.name);
                dependencies.push_str(&static_library_extension);
                dependencies.push(';');
            }
        }
        dependencies.push_str("%(AdditionalDependencies)");

        let linker = match node.kind {
            OutputKind::StaticLibrary => &mut settings.lib,
            _ => &mut settings.link,
        };
        linker.insert("AdditionalLibraryDirectories".into(), lib_dirs);
        linker.insert("AdditionalDependencies".into(), dependencies);

        let condition = format!("{}|{}", config.configuration, config.platform);
        project.conditions.push(condition.clone());

        let mut configuration_group = XmlElement::new("PropertyGroup")
            .attr("Condition", condition_attr(&condition))
            .attr("Label", "Configuration");
        for (key, value) in &settings.configuration {
            configuration_group.child(key.clone()).set_text(value.clone());
        }
        configuration_group.sort_children_by_name();
        configuration_groups.push(configuration_group);

        if !settings.general.is_empty() {
            let mut general_group =
                XmlElement::new("PropertyGroup").attr("Condition", condition_attr(&condition));
            for (key, value) in &settings.general {
                general_group.child(key.clone()).set_text(value.clone());
            }
            general_group.sort_children_by_name();
            general_groups.push(general_group);
        }

        let mut item_definition =
            XmlElement::new("ItemDefinitionGroup").attr("Condition", condition_attr(&condition));
        settings_group(&mut item_definition, "ClCompile", &settings.cl_compile);
        settings_group(&mut item_definition, "Link", &settings.link);
        settings_group(&mut item_definition, "Lib", &settings.lib);
        item_definition_groups.push(item_definition);
    }

    project.conditions.sort();

    let headers: Vec<Utf8PathBuf> = graph
        .headers(id, env)?
        .iter()
        .map(|header| paths::relative_to(header, &env.out_dir))
        .collect();
    let sources = compile_items(graph, id, env, resolved)?;

    project.project = project_document(
        project,
        resolved,
        configuration_groups,
        general_groups,
        item_definition_groups,
        &headers,
        &sources,
    );
    project.filters = filters_document(&headers, &sources);
    Ok(())
}

/// A source entry of the project's compile item group, together with its
/// per-configuration exclusion matrix.
#[derive(Debug)]
struct SourceItem {
    include: Utf8PathBuf,
    /// `(condition, excluded)` pairs; empty when the source belongs to
    /// every configuration.
    excluded: Vec<(String, bool)>,
}

/// Compute the per-source inclusion matrix.
///
/// Every distinct source appearing in any configuration's effective source
/// list is recorded with the subset of configurations including it. Sources
/// in every configuration get no exclusion entries; sources in a strict
/// subset get one explicit entry per configuration, so the project file
/// never relies on default inclusion.
fn compile_items(
    graph: &Graph,
    id: NodeId,
    env: &Environment,
    resolved: &MsbuildProject,
) -> Result<Vec<SourceItem>, GraphError> {
    let mut membership: IndexMap<Utf8PathBuf, Vec<String>> = IndexMap::new();
    let mut all_conditions = Vec::new();

    for config in &resolved.configurations {
        let config_env = env.with_tags(&config.tags);
        let condition = condition_attr(&format!("{}|{}", config.configuration, config.platform));
        all_conditions.push(condition.clone());
        for source in graph.sources(id, &config_env)? {
            let conditions = membership.entry(source).or_default();
            if !conditions.contains(&condition) {
                conditions.push(condition.clone());
            }
        }
    }

    let mut items = Vec::new();
    for (source, conditions) in &membership {
        let mut item = SourceItem {
            include: paths::relative_to(source, &env.out_dir),
            excluded: Vec::new(),
        };
        if resolved.configurations.len() > conditions.len() {
            for condition in conditions {
                item.excluded.push((condition.clone(), false));
            }
            for condition in &all_conditions {
                if !conditions.contains(condition) {
                    item.excluded.push((condition.clone(), true));
                }
            }
        }
        items.push(item);
    }
    Ok(items)
}

fn project_document(
    project: &ProjectFile,
    resolved: &MsbuildProject,
    configuration_groups: Vec<XmlElement>,
    general_groups: Vec<XmlElement>,
    item_definition_groups: Vec<XmlElement>,
    headers: &[Utf8PathBuf],
    sources: &[SourceItem],
) -> XmlElement {
    let mut vcxproj = XmlElement::new("Project")
        .attr("DefaultTargets", "Build")
        .attr("ToolsVersion", TOOLS_VERSION)
        .attr("xmlns", MSBUILD_XMLNS);

    {
        let configurations = vcxproj
            .child("ItemGroup")
            .set_attr("Label", "ProjectConfigurations");
        for config in &resolved.configurations {
            let include = format!("{}|{}", config.configuration, config.platform);
            let entry = configurations
                .child("ProjectConfiguration")
                .set_attr("Include", include);
            entry
                .child("Configuration")
                .set_text(config.configuration.clone());
            entry.child("Platform").set_text(config.platform.clone());
        }
    }
    {
        let globals = vcxproj.child("PropertyGroup").set_attr("Label", "Globals");
        globals
            .child("ProjectGuid")
            .set_text(format!("{{{}}}", project.guid));
        globals.child("Keyword").set_text("Win32Proj");
        globals.child("RootNamespace").set_text(project.name.clone());
        globals
            .child("WindowsTargetPlatformVersion")
            .set_text("8.1");
    }

    vcxproj
        .child("Import")
        .set_attr("Project", r"$(VCTargetsPath)\Microsoft.Cpp.Default.props");
    for group in configuration_groups {
        vcxproj.push(group);
    }
    vcxproj
        .child("Import")
        .set_attr("Project", r"$(VCTargetsPath)\Microsoft.Cpp.props");

    {
        let extension_settings = vcxproj
            .child("ImportGroup")
            .set_attr("Label", "ExtensionSettings");
        for import in &resolved.extension_settings {
            extension_settings
                .child("Import")
                .set_attr("Project", import.clone());
        }
    }
    vcxproj.child("ImportGroup").set_attr("Label", "Shared");

    for config in &resolved.configurations {
        let condition = format!("{}|{}", config.configuration, config.platform);
        vcxproj
            .child("ImportGroup")
            .set_attr("Label", "PropertySheets")
            .set_attr("Condition", condition_attr(&condition))
            .child("Import")
            .set_attr("Project", r"$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props")
            .set_attr(
                "Condition",
                r"exists('$(UserRootDir)\Microsoft.Cpp.$(Platform).user.props')",
            )
            .set_attr("Label", "LocalAppDataPlatform");
    }

    vcxproj.child("PropertyGroup").set_attr("Label", "UserMacros");
    if general_groups.is_empty() {
        vcxproj.child("PropertyGroup");
    } else {
        for group in general_groups {
            vcxproj.push(group);
        }
    }
    for group in item_definition_groups {
        vcxproj.push(group);
    }

    {
        let item_group = vcxproj.child("ItemGroup");
        for header in headers {
            item_group
                .child("ClInclude")
                .set_attr("Include", header.as_str());
        }
    }
    {
        let item_group = vcxproj.child("ItemGroup");
        for source in sources {
            let entry = item_group
                .child("ClCompile")
                .set_attr("Include", source.include.as_str());
            for (condition, excluded) in &source.excluded {
                entry
                    .child("ExcludedFromBuild")
                    .set_attr("Condition", condition.clone())
                    .set_text(if *excluded { "true" } else { "false" });
            }
        }
    }

    vcxproj
        .child("Import")
        .set_attr("Project", r"$(VCTargetsPath)\Microsoft.Cpp.targets");
    {
        let extension_targets = vcxproj
            .child("ImportGroup")
            .set_attr("Label", "ExtensionTargets");
        for import in &resolved.extension_targets {
            extension_targets
                .child("Import")
                .set_attr("Project", import.clone());
        }
    }

    vcxproj
}

fn filters_document(headers: &[Utf8PathBuf], sources: &[SourceItem]) -> XmlElement {
    let mut filters = XmlElement::new("Project")
        .attr("ToolsVersion", FILTERS_TOOLS_VERSION)
        .attr("xmlns", MSBUILD_XMLNS);

    {
        let item_group = filters.child("ItemGroup");
        let source_filter = item_group
            .child("Filter")
            .set_attr("Include", SOURCE_FILTER);
        source_filter
            .child("UniqueIdentifier")
            .set_text("{4FC737F1-C7A5-4376-A066-2A32D752A2FF}");
        source_filter
            .child("Extensions")
            .set_text("cpp;c;cc;cxx;def;odl;idl;hpj;bat;asm;asmx");
        let header_filter = item_group
            .child("Filter")
            .set_attr("Include", HEADER_FILTER);
        header_filter
            .child("UniqueIdentifier")
            .set_text("{93995380-89BD-4b04-88EB-625FBE52EBFB}");
        header_filter
            .child("Extensions")
            .set_text("h;hh;hpp;hxx;hm;inl;inc;xsd");
    }
    {
        let item_group = filters.child("ItemGroup");
        for header in headers {
            item_group
                .child("ClInclude")
                .set_attr("Include", header.as_str())
                .child("Filter")
                .set_text(HEADER_FILTER);
        }
    }
    {
        let item_group = filters.child("ItemGroup");
        for source in sources {
            item_group
                .child("ClCompile")
                .set_attr("Include", source.include.as_str())
                .child("Filter")
                .set_text(SOURCE_FILTER);
        }
    }

    filters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{self, ProjectConfiguration, Tagged};
    use rstest::rstest;

    fn env() -> Environment {
        Environment {
            out_dir: "/work/out".into(),
            project_dir: "/work/out/projects".into(),
            tags: Vec::new(),
        }
    }

    fn configuration(name: &str, platform: &str, tags: &[&str]) -> ProjectConfiguration {
        ProjectConfiguration {
            configuration: name.to_owned(),
            platform: platform.to_owned(),
            tags: tags.iter().map(|&t| t.to_owned()).collect(),
            ..ProjectConfiguration::default()
        }
    }

    fn app_with_configs() -> ast::Target {
        let mut app = ast::Target {
            name: "app".into(),
            kind: "executable".into(),
            ..ast::Target::default()
        };
        app.sources = vec!["/work/src/main.cpp".into()];
        app.msbuild_project
            .configurations
            .push(configuration("Debug", "x64", &[]));
        app.msbuild_project
            .configurations
            .push(configuration("Release", "x64", &["release"]));
        app
    }

    #[rstest]
    fn guid_is_stable_and_uppercase() {
        let a = project_guid(Utf8Path::new("/out/app.vcxproj"));
        let b = project_guid(Utf8Path::new("/out/app.vcxproj"));
        let other = project_guid(Utf8Path::new("/out/lib.vcxproj"));
        assert_eq!(a, b);
        assert_ne!(a, other);
        assert_eq!(a.len(), 36);
        assert_eq!(a, a.to_uppercase());
        assert_eq!(a.matches('-').count(), 4);
    }

    #[rstest]
    fn unknown_targets_are_skipped() {
        let graph =
            Graph::from_targets(&[app_with_configs(), ast::Target {
                name: "abstract".into(),
                ..ast::Target::default()
            }])
            .expect("graph");
        let projects = generate(&graph, &env()).expect("generate");
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "app");
    }

    #[rstest]
    fn dependencies_resolve_to_project_guids() {
        let mut app = app_with_configs();
        app.deps = vec!["core".into()];
        let mut core = ast::Target {
            name: "core".into(),
            kind: "static_library".into(),
            ..ast::Target::default()
        };
        core.msbuild_project
            .configurations
            .push(configuration("Debug", "x64", &[]));

        let graph = Graph::from_targets(&[app, core]).expect("graph");
        let projects = generate(&graph, &env()).expect("generate");
        let core_guid = &projects[1].guid;
        assert_eq!(projects[0].depend_projects, vec![core_guid.clone()]);
    }

    /// A source in only one of two configurations carries exactly two
    /// exclusion entries; a source in both carries none.
    #[rstest]
    fn source_inclusion_matrix_is_fully_explicit() {
        let mut app = app_with_configs();
        app.tagged.insert(
            "release".into(),
            Tagged {
                sources: vec!["/work/src/fast.cpp".into()],
                ..Tagged::default()
            },
        );
        let graph = Graph::from_targets(&[app]).expect("graph");
        let id = graph.find("app").expect("app");
        let resolved = graph.msbuild_project(id).expect("project");

        let items = compile_items(&graph, id, &env(), &resolved).expect("items");
        assert_eq!(items.len(), 2);

        let shared = &items[0];
        assert_eq!(shared.include, Utf8PathBuf::from("../src/main.cpp"));
        assert!(shared.excluded.is_empty());

        let release_only = &items[1];
        assert_eq!(release_only.include, Utf8PathBuf::from("../src/fast.cpp"));
        assert_eq!(release_only.excluded.len(), 2);
        assert_eq!(
            release_only.excluded[0],
            (
                "'$(Configuration)|$(Platform)'=='Release|x64'".to_owned(),
                false
            )
        );
        assert_eq!(
            release_only.excluded[1],
            (
                "'$(Configuration)|$(Platform)'=='Debug|x64'".to_owned(),
                true
            )
        );
    }

    #[rstest]
    fn project_document_carries_expected_sections() {
        let graph = Graph::from_targets(&[app_with_configs()]).expect("graph");
        let projects = generate(&graph, &env()).expect("generate");
        let document = projects[0].project_document();

        assert!(document.starts_with(XML_HEADER));
        assert!(document.contains("<ItemGroup Label=\"ProjectConfigurations\">"));
        assert!(document.contains(
            "<ProjectConfiguration Include=\"Debug|x64\">"
        ));
        assert!(document.contains(&format!("<ProjectGuid>{{{}}}</ProjectGuid>", projects[0].guid)));
        assert!(document.contains("<ConfigurationType>Application</ConfigurationType>"));
        assert!(document
            .contains(r#"<Import Project="$(VCTargetsPath)\Microsoft.Cpp.Default.props" />"#));
        assert!(document.contains("%(AdditionalIncludeDirectories)"));
        assert!(document.contains("<ClCompile Include=\"../src/main.cpp\" />"));
    }

    #[rstest]
    fn conditions_are_sorted() {
        let graph = Graph::from_targets(&[app_with_configs()]).expect("graph");
        let projects = generate(&graph, &env()).expect("generate");
        assert_eq!(projects[0].conditions, vec!["Debug|x64", "Release|x64"]);
    }

    #[rstest]
    fn filters_group_sources_and_headers() {
        let mut app = app_with_configs();
        app.headers = vec!["/work/src/app.h".into()];
        let graph = Graph::from_targets(&[app]).expect("graph");
        let projects = generate(&graph, &env()).expect("generate");
        let filters = projects[0].filters_document();

        assert!(filters.contains("<Filter Include=\"Source Files\">"));
        assert!(filters.contains("<ClInclude Include=\"../src/app.h\">"));
        assert!(filters.contains("<Filter>Header Files</Filter>"));
        assert!(filters.contains("<Filter>Source Files</Filter>"));
    }

    #[rstest]
    fn generation_is_idempotent() {
        let graph = Graph::from_targets(&[app_with_configs()]).expect("graph");
        let first: Vec<String> = generate(&graph, &env())
            .expect("generate")
            .iter()
            .map(ProjectFile::project_document)
            .collect();
        let second: Vec<String> = generate(&graph, &env())
            .expect("generate")
            .iter()
            .map(ProjectFile::project_document)
            .collect();
        assert_eq!(first, second);
    }
}
