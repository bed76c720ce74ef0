//! Source file classification.
//!
//! Build statements are emitted per source file, so the Ninja generator
//! needs to know which language a file belongs to. Classification is purely
//! extension based; files with unrecognised extensions are skipped by the
//! generators rather than treated as errors.

use camino::Utf8Path;

/// The language a source file is associated with, derived from its
/// extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The extension is not recognised.
    Unknown,
    /// A C++ translation unit.
    CppSource,
    /// A C or C++ header.
    CppHeader,
    /// A C translation unit.
    CSource,
    /// An Objective-C translation unit.
    ObjC,
    /// An Objective-C++ translation unit.
    ObjCpp,
}

impl SourceKind {
    /// Classify a file by its extension.
    #[must_use]
    pub fn of(path: &Utf8Path) -> Self {
        match path.extension() {
            Some("cpp" | "cc" | "cxx" | "c++") => Self::CppSource,
            Some("c") => Self::CSource,
            Some("h" | "hh" | "hpp" | "hxx" | "inc" | "ipp") => Self::CppHeader,
            Some("m") => Self::ObjC,
            Some("mm") => Self::ObjCpp,
            _ => Self::Unknown,
        }
    }
}
