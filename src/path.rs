//! Path helpers shared by the virtual file store and the module resolver.
//!
//! Every path in the system is a `/`-rooted string. `normalize_path` is the
//! canonical form exposed to collaborators; `resolve_dot_segments` additionally
//! folds `.` and `..` for writes and relative import resolution.

/// Script extensions probed, in order, when an import omits its extension.
pub const PROBE_EXTENSIONS: [&str; 4] = ["jsx", "tsx", "js", "ts"];

/// Rewrites `path` to start with exactly one `/`, collapses `//` and drops any
/// trailing `/` (except for the root itself).
pub fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return "/".to_string();
    }
    format!("/{}", segments.join("/"))
}

/// Normalizes `path` and folds `.`/`..` segments.
///
/// Returns `None` when a `..` would climb above the root.
pub fn resolve_dot_segments(path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        Some("/".to_string())
    } else {
        Some(format!("/{}", stack.join("/")))
    }
}

/// Parent directory of a normalized path. The root has no parent.
pub fn parent(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// Last segment of a normalized path (`""` for the root).
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or("")
}

/// Joins a child segment onto a normalized directory path.
pub fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{}", name)
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Resolves a relative specifier (`./x`, `../x`) against the directory of
/// `importer`. Climbing above the root clamps at `/`, as URL resolution does.
pub fn join_relative(importer: &str, specifier: &str) -> String {
    let dir = parent(importer).unwrap_or("/");
    let mut stack: Vec<&str> = dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in specifier.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    format!("/{}", stack.join("/"))
}

/// Lower-cased extension of the last segment, without the dot.
pub fn extension(path: &str) -> Option<String> {
    let name = file_name(path);
    let idx = name.rfind('.')?;
    if idx == 0 || idx + 1 == name.len() {
        return None;
    }
    Some(name[idx + 1..].to_ascii_lowercase())
}

pub fn is_stylesheet(path: &str) -> bool {
    extension(path).as_deref() == Some("css")
}

pub fn is_script(path: &str) -> bool {
    matches!(
        extension(path).as_deref(),
        Some("js" | "mjs" | "jsx" | "ts" | "mts" | "tsx")
    )
}

/// Entry candidates must contain JSX.
pub fn is_component_file(path: &str) -> bool {
    matches!(extension(path).as_deref(), Some("jsx" | "tsx"))
}

/// `true` when `path` equals `ancestor` or lives somewhere below it.
pub fn is_within(path: &str, ancestor: &str) -> bool {
    if ancestor == "/" {
        return true;
    }
    path == ancestor
        || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(""), "/");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("App.jsx"), "/App.jsx");
        assert_eq!(normalize_path("//components//Button.jsx/"), "/components/Button.jsx");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "",
            "/",
            "a",
            "a/b/",
            "//a///b//c//",
            "/./x/../y",
            "  spaced /path ",
            "\\windows\\style",
            "/components/Button.jsx",
        ];
        for input in inputs {
            let once = normalize_path(input);
            assert_eq!(normalize_path(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_resolve_dot_segments() {
        assert_eq!(resolve_dot_segments("/a/./b/../c").as_deref(), Some("/a/c"));
        assert_eq!(resolve_dot_segments("/a/..").as_deref(), Some("/"));
        assert_eq!(resolve_dot_segments("/../etc"), None);
    }

    #[test]
    fn test_parent_and_name() {
        assert_eq!(parent("/"), None);
        assert_eq!(parent("/App.jsx"), Some("/"));
        assert_eq!(parent("/components/ui/Button.jsx"), Some("/components/ui"));
        assert_eq!(file_name("/components/ui/Button.jsx"), "Button.jsx");
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn test_join_relative() {
        assert_eq!(join_relative("/App.jsx", "./Button"), "/Button");
        assert_eq!(
            join_relative("/components/Card.jsx", "../lib/utils"),
            "/lib/utils"
        );
        assert_eq!(join_relative("/App.jsx", "../../x"), "/x");
    }

    #[test]
    fn test_extension_helpers() {
        assert_eq!(extension("/a/b.TSX").as_deref(), Some("tsx"));
        assert_eq!(extension("/a/.env"), None);
        assert_eq!(extension("/a/b"), None);
        assert!(is_stylesheet("/styles.css"));
        assert!(is_script("/lib/util.mjs"));
        assert!(is_component_file("/App.tsx"));
        assert!(!is_component_file("/App.ts"));
    }

    #[test]
    fn test_is_within() {
        assert!(is_within("/a/b", "/a"));
        assert!(is_within("/a", "/a"));
        assert!(!is_within("/ab", "/a"));
        assert!(is_within("/anything", "/"));
    }
}
