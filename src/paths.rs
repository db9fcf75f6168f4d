//! Path canonicalization and normalization utilities

use crate::error::StorageError;
use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a path that exists on disk
///
/// Uses dunce so Windows paths stay free of the `\\?\` prefix, then applies
/// the same normalization as [`normalize_path`].
pub fn canonicalize_path(path: &Path) -> Result<PathBuf, StorageError> {
    let canonical = dunce::canonicalize(path).map_err(|e| {
        StorageError::InvalidPath(format!("Failed to canonicalize {:?}: {}", path, e))
    })?;
    Ok(normalize_path(&canonical))
}

/// Resolve a path into a stable absolute identifier.
///
/// Outputs frequently do not exist yet on the first run. The deepest existing
/// ancestor is canonicalized and the missing tail is appended lexically, so
/// the identifier is the same before and after the file is created.
pub fn resolve_identifier(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let cleaned = lexical_clean(&absolute);

    for ancestor in cleaned.ancestors() {
        if ancestor.as_os_str().is_empty() || !ancestor.exists() {
            continue;
        }
        if let Ok(canonical) = canonicalize_path(ancestor) {
            let tail = cleaned.strip_prefix(ancestor).unwrap_or_else(|_| Path::new(""));
            let joined = if tail.as_os_str().is_empty() {
                canonical
            } else {
                canonical.join(tail)
            };
            return normalize_path(&joined);
        }
    }
    normalize_path(&cleaned)
}

/// Normalize a path into a stable identifier (no filesystem access)
///
/// UTF-8 paths are normalized to NFC. Trailing separators are dropped
/// except for the root. Non-UTF-8 paths keep their bytes unchanged.
pub fn normalize_path(path: &Path) -> PathBuf {
    let text = match path.to_str() {
        Some(text) => text,
        None => return path.components().collect(),
    };

    let mut result: String = text.nfc().collect();
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }
    PathBuf::from(result)
}

/// Bytes of a normalized identifier, used for hashing and persistence.
pub fn identifier_bytes(path: &Path) -> Vec<u8> {
    os_to_bytes(normalize_path(path).as_os_str())
}

/// Raw bytes of an OS string. Lossless on unix.
#[cfg(unix)]
pub fn os_to_bytes(s: &OsStr) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    s.as_bytes().to_vec()
}

#[cfg(not(unix))]
pub fn os_to_bytes(s: &OsStr) -> Vec<u8> {
    s.to_string_lossy().into_owned().into_bytes()
}

/// Inverse of [`os_to_bytes`].
#[cfg(unix)]
pub fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes)
}

#[cfg(not(unix))]
pub fn os_from_bytes(bytes: Vec<u8>) -> OsString {
    OsString::from(String::from_utf8_lossy(&bytes).into_owned())
}

/// Remove `.` components and fold `..` against preceding normal components.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let popped = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if popped {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Longest directory shared by every path's parent.
///
/// A single path yields its own parent directory. Returns an empty path when
/// the inputs share nothing (e.g. relative paths in different trees).
pub fn common_root(paths: &[PathBuf]) -> PathBuf {
    let mut iter = paths.iter();
    let first = match iter.next() {
        Some(p) => p.parent().map(Path::to_path_buf).unwrap_or_default(),
        None => return PathBuf::new(),
    };

    let mut root: Vec<Component<'_>> = first.components().collect();
    for path in iter {
        let parent = path.parent().unwrap_or_else(|| Path::new(""));
        let shared = root
            .iter()
            .zip(parent.components())
            .take_while(|(a, b)| *a == b)
            .count();
        root.truncate(shared);
    }

    root.iter().map(|c| c.as_os_str()).collect()
}
