//! Lexical path arithmetic.
//!
//! Nothing here touches the filesystem: paths are normalized by their
//! components only, so results are stable whether or not the files exist.

use std::path::{Component, Path, PathBuf};

/// Join URL-style path segments with `/` and normalize the result.
///
/// Empty segments and `.` are dropped, `..` pops the previous segment, and
/// repeated separators collapse. A leading `/` on the first segment keeps
/// the result absolute; `..` never climbs above an absolute root. A trailing
/// separator on the last segment is preserved.
///
/// ```
/// use esmap_util::path::posix_join;
/// assert_eq!(posix_join(&["/", "web_modules", "react.js"]), "/web_modules/react.js");
/// assert_eq!(posix_join(&["/", "/lib/", "./pkg/../x.js"]), "/lib/x.js");
/// ```
#[must_use]
pub fn posix_join(segments: &[&str]) -> String {
    let joined = segments
        .iter()
        .filter(|s| !s.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("/");
    posix_normalize(&joined)
}

/// Normalize a `/`-separated path string.
#[must_use]
pub fn posix_normalize(path: &str) -> String {
    if path.is_empty() {
        return ".".to_string();
    }

    let absolute = path.starts_with('/');
    let trailing = path.ends_with('/');
    let mut parts: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|last| *last != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let mut out = parts.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if out.is_empty() {
        return if trailing { "./" } else { "." }.to_string();
    }
    if trailing && !out.ends_with('/') {
        out.push('/');
    }
    out
}

/// Render a path with `/` separators regardless of platform.
#[must_use]
pub fn to_slash(path: &Path) -> String {
    let s = path.to_string_lossy();
    if cfg!(windows) {
        s.replace('\\', "/")
    } else {
        s.into_owned()
    }
}

/// Resolve `.` and `..` components without consulting the filesystem.
#[must_use]
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)))
                    && out.pop();
                if !popped && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute the path of `to` relative to the directory `from`.
///
/// Both paths are normalized lexically first. Identical paths yield an empty
/// path. Paths on different prefixes (Windows drives) yield `to` unchanged.
#[must_use]
pub fn relative_path(from: &Path, to: &Path) -> PathBuf {
    let from = normalize_lexically(from);
    let to = normalize_lexically(to);

    let from_parts: Vec<Component<'_>> = from.components().collect();
    let to_parts: Vec<Component<'_>> = to.components().collect();

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (from_parts.first(), to_parts.first())
    {
        if a != b {
            return to;
        }
    }

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }
    rel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_join_serving_root() {
        assert_eq!(
            posix_join(&["/", "web_modules", "react.js"]),
            "/web_modules/react.js"
        );
        assert_eq!(
            posix_join(&["/", "web_modules/", "/preact/hooks.js"]),
            "/web_modules/preact/hooks.js"
        );
        assert_eq!(
            posix_join(&["/", "web_modules", "./lodash.js"]),
            "/web_modules/lodash.js"
        );
    }

    #[test]
    fn test_posix_join_parent_segments() {
        assert_eq!(posix_join(&["/", "a/b", "../c.js"]), "/a/c.js");
        assert_eq!(posix_join(&["/", "..", "c.js"]), "/c.js");
        assert_eq!(posix_join(&["a", "../../c.js"]), "../c.js");
    }

    #[test]
    fn test_posix_normalize_edge_cases() {
        assert_eq!(posix_normalize(""), ".");
        assert_eq!(posix_normalize("/"), "/");
        assert_eq!(posix_normalize("./"), "./");
        assert_eq!(posix_normalize("a//b/"), "a/b/");
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(
            normalize_lexically(Path::new("/project/src/../lib/./a.js")),
            PathBuf::from("/project/lib/a.js")
        );
        assert_eq!(
            normalize_lexically(Path::new("../x/../y")),
            PathBuf::from("../y")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_relative_path_sibling_and_child() {
        assert_eq!(
            relative_path(Path::new("/p/src"), Path::new("/p/src/util.ts")),
            PathBuf::from("util.ts")
        );
        assert_eq!(
            relative_path(Path::new("/p/src/app"), Path::new("/p/src/lib/x.js")),
            PathBuf::from("../lib/x.js")
        );
        assert_eq!(
            relative_path(Path::new("/p/src"), Path::new("/p/src")),
            PathBuf::new()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_to_slash_unix_passthrough() {
        assert_eq!(to_slash(Path::new("a/b/c.js")), "a/b/c.js");
    }
}
