//! End-to-end generation tests: manifest text through the graph to both
//! backends.

use camino::Utf8PathBuf;
use kanna::graph::{Environment, Graph, GraphError};
use kanna::{manifest, msbuild, ninja_gen};
use rstest::rstest;
use std::fs;
use tempfile::TempDir;

fn load_targets(content: &str) -> Vec<kanna::ast::Target> {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("kanna.toml");
    fs::write(&path, content).expect("write manifest");
    let path = Utf8PathBuf::from_path_buf(path).expect("utf-8 path");
    manifest::load(&path).expect("load")
}

fn env(tags: &[&str]) -> Environment {
    Environment {
        out_dir: "out".into(),
        project_dir: "out".into(),
        tags: tags.iter().map(|&t| t.to_owned()).collect(),
    }
}

const MANIFEST: &str = r#"
    [[targets]]
    name = "app"
    type = "executable"
    sources = ["src/main.cpp"]
    deps = ["core"]
    configs = ["common"]

    [[targets.msbuild_project.configurations]]
    configuration = "Debug"
    platform = "x64"

    [[targets]]
    name = "core"
    type = "static_library"
    sources = ["core/core.cpp"]
    configs = ["common"]

    [[targets.msbuild_project.configurations]]
    configuration = "Debug"
    platform = "x64"

    [[targets]]
    name = "common"
    defines = ["COMMON"]

    [targets.tagged.strict]
    cflags = ["-Werror"]
"#;

#[rstest]
fn ninja_backend_covers_all_buildable_targets() {
    let targets = load_targets(MANIFEST);
    let graph = Graph::from_targets(&targets).expect("graph");
    let ninja = ninja_gen::generate(&graph, &env(&[])).expect("generate");

    assert!(ninja.contains(": link "));
    assert!(ninja.contains(": archive "));
    assert!(ninja.contains("  defines = -DCOMMON\n"));
    assert!(ninja.contains("default out/bin/app\n"));
}

#[rstest]
fn active_tags_reach_the_generated_output() {
    let targets = load_targets(MANIFEST);
    let graph = Graph::from_targets(&targets).expect("graph");

    let plain = ninja_gen::generate(&graph, &env(&[])).expect("generate");
    assert!(!plain.contains("-Werror"));

    let strict = ninja_gen::generate(&graph, &env(&["strict"])).expect("generate");
    assert!(strict.contains("  cflags = -Werror\n"));
}

#[rstest]
fn msbuild_backend_emits_projects_and_solution() {
    let targets = load_targets(MANIFEST);
    let graph = Graph::from_targets(&targets).expect("graph");
    let environment = env(&[]);
    let projects = msbuild::generate(&graph, &environment).expect("generate");

    // `common` has no output kind, so only two projects are produced.
    assert_eq!(projects.len(), 2);
    assert!(projects[0].project_document().contains("PreprocessorDefinitions"));
    assert!(
        projects[0]
            .project_document()
            .contains("COMMON;%(PreprocessorDefinitions)")
    );

    let solution = msbuild::render_solution(&environment.out_dir.join("demo.sln"), &projects);
    assert!(solution.contains("\"app\""));
    assert!(solution.contains("\"core\""));
    assert!(solution.contains("Debug|x64 = Debug|x64"));
}

#[rstest]
fn cyclic_configs_surface_as_errors_in_both_backends() {
    let targets = load_targets(
        r#"
            [[targets]]
            name = "a"
            type = "executable"
            sources = ["a.cpp"]
            configs = ["b"]

            [[targets]]
            name = "b"
            configs = ["a"]
        "#,
    );
    let graph = Graph::from_targets(&targets).expect("graph");
    let environment = env(&[]);

    let err = ninja_gen::generate(&graph, &environment).expect_err("cycle");
    assert!(matches!(err, GraphError::CyclicConfig { .. }));
    let err = msbuild::generate(&graph, &environment).expect_err("cycle");
    assert!(matches!(err, GraphError::CyclicConfig { .. }));
}
