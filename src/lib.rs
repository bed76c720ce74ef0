//! Kanna core library.
//!
//! Kanna compiles a declarative, multi-file description of build targets
//! into low-level build definitions for two downstream executors: a Ninja
//! build file and a set of MSBuild (Visual Studio) project and solution
//! files. The crate exposes the manifest AST, the target graph and its
//! attribute resolver, and the two generators, so they can be driven either
//! from the bundled CLI or programmatically.

pub mod ast;
pub mod cli;
pub mod graph;
pub mod manifest;
pub mod msbuild;
pub mod ninja_gen;
pub mod paths;
pub mod runner;
pub mod source_type;
