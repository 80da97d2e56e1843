//! Path normalization shared by route templates and request paths.
//!
//! A clean path starts with exactly one `/`, contains no empty segments and
//! has no trailing `/`. The root path is the single exception: it is exactly
//! `/`, and every path made only of separators (or nothing at all) collapses
//! to it.
//!
//! ```ignore
//!  ""            => "/"
//!  "a//b/"       => "/a/b"
//!  "/a/b"        => "/a/b"
//!  "///"         => "/"
//! ```
//!
//! Dot segments are kept as they are: `/a/../b` is matched literally.

use std::borrow::Cow;

/// Reports whether `path` is already in clean form.
pub fn is_clean(path: &str) -> bool {
    if path == "/" {
        return true;
    }

    path.starts_with('/') && !path.ends_with('/') && !path.contains("//")
}

/// Returns the clean form of `path`.
///
/// Already clean input is borrowed, so cleaning twice never allocates twice.
///
/// ```rust
/// use scoperoute::path::clean;
///
/// assert_eq!(clean("a//b/"), "/a/b");
/// assert_eq!(clean("/a/b"), "/a/b");
/// assert_eq!(clean(""), "/");
/// ```
pub fn clean(path: &str) -> Cow<'_, str> {
    if is_clean(path) {
        return Cow::Borrowed(path);
    }

    let mut buf = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        buf.push('/');
        buf.push_str(segment);
    }

    if buf.is_empty() {
        buf.push('/');
    }

    Cow::Owned(buf)
}

/// Cleans a route template.
///
/// Works like [`clean`], except that a `/` inside a `{...}` placeholder is
/// not a separator, so constraints such as `{url:https?://.+}` are kept as
/// written.
pub(crate) fn clean_template(template: &str) -> String {
    let mut buf = String::with_capacity(template.len() + 1);
    let mut depth = 0usize;
    let mut start = 0;

    let mut push = |segment: &str| {
        if !segment.is_empty() {
            buf.push('/');
            buf.push_str(segment);
        }
    };

    for (i, c) in template.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => {
                push(&template[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&template[start..]);

    if buf.is_empty() {
        buf.push('/');
    }

    buf
}

/// Joins a scope prefix and a relative template, then cleans the result.
pub(crate) fn join(prefix: &str, path: &str) -> String {
    clean_template(&format!("{}/{}", prefix, path))
}
