//! Canonical remote path handling.
//!
//! Remote paths are plain `/`-separated strings; the root is `"/"`. They are
//! used verbatim as cache keys, so construction must be canonical: no
//! doubled separators from joining at the root.

/// Joins a child name onto a remote directory path.
pub fn join_child(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}

/// The parent directory of a remote path, or `None` for the root.
pub fn parent_of(path: &str) -> Option<&str> {
    if path == "/" {
        return None;
    }
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(idx) => Some(&path[..idx]),
        None => None,
    }
}

/// The final path segment.
pub fn file_name(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_at_root_does_not_double_separator() {
        assert_eq!(join_child("/", "sdcard"), "/sdcard");
        assert_eq!(join_child("/sdcard", "DCIM"), "/sdcard/DCIM");
    }

    #[test]
    fn test_parent_of() {
        assert_eq!(parent_of("/"), None);
        assert_eq!(parent_of("/sdcard"), Some("/"));
        assert_eq!(parent_of("/sdcard/DCIM"), Some("/sdcard"));
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("/sdcard/DCIM"), "DCIM");
        assert_eq!(file_name("/sdcard"), "sdcard");
    }
}
