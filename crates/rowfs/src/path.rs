//! Caller path parsing.
//!
//! Paths are slash-separated and relative to the store root. The same rules
//! apply to every operation:
//!
//! - a leading `/` is rejected
//! - empty segments and `.` are dropped, so `""`, `"."` and `"./"` name the root
//! - `..` drops the previous component and may not climb above the root

use crate::error::{FsError, FsResult};

/// Split `path` into the components walked from the root.
///
/// An empty result means the path names the root itself.
pub fn components(path: &str) -> FsResult<Vec<&str>> {
    if path.starts_with('/') {
        return Err(FsError::invalid_path(path));
    }

    let mut out = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if out.pop().is_none() {
                    return Err(FsError::invalid_path(path));
                }
            }
            name => out.push(name),
        }
    }
    Ok(out)
}

/// Like [`components`], but the path must name something below the root.
pub fn child_components(path: &str) -> FsResult<Vec<&str>> {
    let parts = components(path)?;
    if parts.is_empty() {
        return Err(FsError::invalid_path(path));
    }
    Ok(parts)
}

/// Join the first `len` components back into a display path.
pub fn prefix(components: &[&str], len: usize) -> String {
    components[..len].join("/")
}

/// Name reported for a path in metadata: its last component, or `.` for the root.
pub fn base_name(components: &[&str]) -> String {
    components.last().copied().unwrap_or(".").to_string()
}
