//! Request path normalization
//!
//! Paths are cleaned before they reach the tree: empty and `.` components go
//! away, `..` pops the previous component. A `..` with nothing left to pop
//! would escape the root and makes the whole path unroutable.

/// Clean an absolute request path
///
/// Returns `None` when `..` climbs above the root. The result always starts
/// with `/` and never ends with one, except for the root itself.
///
/// # Example
/// ```
/// use arbor_router::sanitize::clean;
///
/// assert_eq!(clean("/a//b/./c/../d/").as_deref(), Some("/a/b/d"));
/// assert_eq!(clean("/a/../../etc/passwd"), None);
/// assert_eq!(clean("/").as_deref(), Some("/"));
/// ```
pub fn clean(path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            _ => stack.push(part),
        }
    }

    let mut out = String::with_capacity(path.len());
    for part in &stack {
        out.push('/');
        out.push_str(part);
    }
    if out.is_empty() {
        out.push('/');
    }
    Some(out)
}

/// Join the segments taken by a wildcard into one capture
///
/// The capture is anchored at the segment where the wildcard began, so any
/// component that could step outside it (`.`, `..` or empty) refuses the
/// capture instead of resolving it. Paths reaching the matcher have already
/// been through [`clean`], so there the check never fires; it holds for
/// segments that did not come from `clean`.
pub fn join_capture(segments: &[&str]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    let mut out = String::new();
    for (i, part) in segments.iter().enumerate() {
        if matches!(*part, "" | "." | "..") {
            return None;
        }
        if i > 0 {
            out.push('/');
        }
        out.push_str(part);
    }
    Some(out)
}
