//! Visual Studio solution rendering.
//!
//! A solution file is a line-oriented text index over the generated
//! projects: one `Project` block per target plus the global configuration
//! sections Visual Studio needs to map solution configurations onto project
//! configurations.

use camino::Utf8Path;
use itertools::Itertools;
use std::fmt::Write as _;

use super::ProjectFile;
use crate::paths;

/// Project type identifier marking each entry as a Visual C++ project.
pub const PROJECT_TYPE_GUID: &str = "{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}";

const SOLUTION_HEADER: &str = "Microsoft Visual Studio Solution File, Format Version 12.00\n\
                               # Visual Studio 14\n\
                               VisualStudioVersion = 14.0.24720.0\n\
                               MinimumVisualStudioVersion = 10.0.40219.1\n";

/// Render the solution document for `projects`.
///
/// Project paths are written relative to the solution file's directory.
/// Solution configurations are the union of every project's conditions,
/// deduplicated and sorted.
#[must_use]
pub fn render_solution(solution_path: &Utf8Path, projects: &[ProjectFile]) -> String {
    let solution_dir = solution_path.parent().unwrap_or(Utf8Path::new("."));
    let mut out = String::from(SOLUTION_HEADER);

    for project in projects {
        let path = paths::relative_to(&project.file_path, solution_dir);
        let _ = writeln!(
            out,
            "Project(\"{PROJECT_TYPE_GUID}\") = \"{}\", \"{path}\", \"{}\"",
            project.name, project.guid
        );
        if !project.depend_projects.is_empty() {
            out.push_str("\tProjectSection(ProjectDependencies) = postProject\n");
            for depend in &project.depend_projects {
                let _ = writeln!(out, "\t\t{{{depend}}} = {{{depend}}}");
            }
            out.push_str("\tEndProjectSection\n");
        }
        out.push_str("EndProject\n");
    }

    out.push_str("Global\n");
    out.push_str("\tGlobalSection(SolutionConfigurationPlatforms) = preSolution\n");
    let conditions = projects
        .iter()
        .flat_map(|project| project.conditions.iter())
        .unique()
        .sorted();
    for condition in conditions {
        let _ = writeln!(out, "\t\t{condition} = {condition}");
    }
    out.push_str("\tEndGlobalSection\n");

    out.push_str("\tGlobalSection(ProjectConfigurationPlatforms) = postSolution\n");
    for project in projects {
        for condition in &project.conditions {
            let _ = writeln!(
                out,
                "\t\t{}.{condition}.ActiveCfg = {condition}",
                project.guid
            );
            let _ = writeln!(out, "\t\t{}.{condition}.Build.0 = {condition}", project.guid);
        }
    }
    out.push_str("\tEndGlobalSection\n");

    out.push_str("\tGlobalSection(SolutionProperties) = preSolution\n");
    out.push_str("\t\tHideSolutionNode = FALSE\n");
    out.push_str("\tEndGlobalSection\n");
    out.push_str("EndGlobal\n");

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msbuild::XmlElement;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    fn project(name: &str, guid: &str, conditions: &[&str], depends: &[&str]) -> ProjectFile {
        ProjectFile {
            name: name.to_owned(),
            guid: guid.to_owned(),
            file_path: Utf8PathBuf::from(format!("/work/out/{name}.vcxproj")),
            conditions: conditions.iter().map(|&c| c.to_owned()).collect(),
            depend_projects: depends.iter().map(|&d| d.to_owned()).collect(),
            project: XmlElement::default(),
            filters: XmlElement::default(),
        }
    }

    #[rstest]
    fn renders_project_entries_with_relative_paths() {
        let projects = [project("app", "AAAA", &["Debug|x64"], &["BBBB"])];
        let rendered = render_solution(Utf8Path::new("/work/out/demo.sln"), &projects);

        assert!(rendered.starts_with("Microsoft Visual Studio Solution File"));
        assert!(rendered.contains(
            "Project(\"{8BC9CEB8-8B4A-11D0-8D11-00A0C91BC942}\") = \
             \"app\", \"app.vcxproj\", \"AAAA\"\n"
        ));
        assert!(rendered.contains("\tProjectSection(ProjectDependencies) = postProject\n"));
        assert!(rendered.contains("\t\t{BBBB} = {BBBB}\n"));
        assert!(rendered.ends_with("EndGlobal\n"));
    }

    #[rstest]
    fn dependency_section_is_omitted_when_empty() {
        let projects = [project("app", "AAAA", &["Debug|x64"], &[])];
        let rendered = render_solution(Utf8Path::new("/work/out/demo.sln"), &projects);
        assert!(!rendered.contains("ProjectSection"));
    }

    #[rstest]
    fn solution_configurations_are_deduplicated_and_sorted() {
        let projects = [
            project("app", "AAAA", &["Release|x64", "Debug|x64"], &[]),
            project("lib", "BBBB", &["Debug|x64"], &[]),
        ];
        let rendered = render_solution(Utf8Path::new("/work/out/demo.sln"), &projects);

        let pre = rendered
            .split("GlobalSection(SolutionConfigurationPlatforms) = preSolution\n")
            .nth(1)
            .and_then(|rest| rest.split("\tEndGlobalSection").next())
            .expect("preSolution section");
        assert_eq!(
            pre,
            "\t\tDebug|x64 = Debug|x64\n\t\tRelease|x64 = Release|x64\n"
        );
    }

    #[rstest]
    fn project_configurations_map_active_and_build() {
        let projects = [project("app", "AAAA", &["Debug|x64"], &[])];
        let rendered = render_solution(Utf8Path::new("/work/out/demo.sln"), &projects);
        assert!(rendered.contains("\t\tAAAA.Debug|x64.ActiveCfg = Debug|x64\n"));
        assert!(rendered.contains("\t\tAAAA.Debug|x64.Build.0 = Debug|x64\n"));
    }
}
