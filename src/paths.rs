//! Lexical path helpers.
//!
//! Graph resolution and generation never touch the filesystem, so every
//! path manipulation here is purely lexical: `.` and `..` components are
//! resolved without consulting symlinks or the working directory.

use camino::{Utf8Component, Utf8Path, Utf8PathBuf};

/// Lexically normalise a path, resolving `.` and `..` components.
///
/// Leading `..` components of a relative path are preserved because they
/// cannot be resolved without an anchor.
#[must_use]
pub fn clean(path: &Utf8Path) -> Utf8PathBuf {
    let mut out: Vec<Utf8Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Utf8Component::CurDir => {}
            Utf8Component::ParentDir => match out.last() {
                Some(Utf8Component::Normal(_)) => {
                    out.pop();
                }
                Some(Utf8Component::RootDir | Utf8Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return Utf8PathBuf::from(".");
    }
    out.iter().map(Utf8Component::as_str).collect()
}

/// Join `path` onto `base` and normalise the result.
///
/// Absolute paths are returned cleaned but otherwise untouched.
#[must_use]
pub fn join_clean(base: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        clean(path)
    } else {
        clean(&base.join(path))
    }
}

/// Compute a lexical relative path from `base` to `path`.
///
/// Both arguments must be either absolute or relative; when no relative
/// path can be derived, `path` is returned unchanged so callers always get
/// a usable path.
#[must_use]
pub fn relative_to(path: &Utf8Path, base: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() != base.is_absolute() {
        return path.to_owned();
    }
    let path = clean(path);
    let base = clean(base);
    let mut path_components = path.components().peekable();
    let mut base_components = base.components().peekable();
    while let (Some(p), Some(b)) = (path_components.peek(), base_components.peek()) {
        if p != b {
            break;
        }
        path_components.next();
        base_components.next();
    }
    let mut out = Utf8PathBuf::new();
    for component in base_components {
        match component {
            Utf8Component::CurDir => {}
            // Climbing out of an unresolved `..` is not representable.
            Utf8Component::ParentDir => return path.clone(),
            _ => out.push(".."),
        }
    }
    for component in path_components {
        out.push(component.as_str());
    }
    if out.as_str().is_empty() {
        return Utf8PathBuf::from(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/a/b/../c", "/a/c")]
    #[case("/a/./b//c", "/a/b/c")]
    #[case("a/../../b", "../b")]
    #[case("/..", "/")]
    #[case("a/..", ".")]
    fn clean_normalises(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(clean(Utf8Path::new(input)), Utf8PathBuf::from(expected));
    }

    #[rstest]
    #[case("/base", "src/main.cpp", "/base/src/main.cpp")]
    #[case("/base", "../main.cpp", "/main.cpp")]
    #[case("/base", "/abs/main.cpp", "/abs/main.cpp")]
    fn join_clean_anchors_relative_paths(
        #[case] base: &str,
        #[case] path: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(
            join_clean(Utf8Path::new(base), Utf8Path::new(path)),
            Utf8PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case("/a/b/c", "/a", "b/c")]
    #[case("/a/b", "/a/b", ".")]
    #[case("/x/y", "/a/b", "../../x/y")]
    #[case("src/lib.rs", "src", "lib.rs")]
    fn relative_to_derives_lexical_paths(
        #[case] path: &str,
        #[case] base: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(
            relative_to(Utf8Path::new(path), Utf8Path::new(base)),
            Utf8PathBuf::from(expected)
        );
    }

    #[rstest]
    fn relative_to_mixed_anchors_returns_path() {
        assert_eq!(
            relative_to(Utf8Path::new("/abs/file"), Utf8Path::new("rel")),
            Utf8PathBuf::from("/abs/file")
        );
    }
}
