//! Slug normalization for article and category paths.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug is empty")]
    Empty,

    #[error("slug contains whitespace")]
    Whitespace,

    #[error("slug contains control characters")]
    Control,

    #[error("slug is a relative path segment")]
    DotSegment,
}

/// Normalize a stored slug into a single path segment
///
/// Rules:
/// - Strip any number of leading slashes
/// - Reject slugs that end up empty
/// - Reject whitespace and control characters (they cannot appear in a URL path)
/// - Reject `.` and `..`
///
/// Reserved characters are left alone; the slug is percent-encoded as a path
/// segment when its URL is built and XML-escaped when the document is written.
///
/// # Examples
///
/// ```
/// use bulletin_core::normalize_slug;
///
/// assert_eq!(normalize_slug("/foo").unwrap(), "foo");
/// assert_eq!(normalize_slug("///markets-today").unwrap(), "markets-today");
/// assert!(normalize_slug("/").is_err());
/// ```
pub fn normalize_slug(slug: &str) -> Result<&str, SlugError> {
    let stripped = slug.trim_start_matches('/');

    if stripped.is_empty() {
        return Err(SlugError::Empty);
    }
    if stripped.chars().any(char::is_control) {
        return Err(SlugError::Control);
    }
    if stripped.chars().any(char::is_whitespace) {
        return Err(SlugError::Whitespace);
    }
    if matches!(stripped, "." | "..") {
        return Err(SlugError::DotSegment);
    }

    Ok(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_slug() {
        assert_eq!(normalize_slug("budget-2024"), Ok("budget-2024"));
    }

    #[test]
    fn test_leading_slashes() {
        assert_eq!(normalize_slug("/foo"), Ok("foo"));
        assert_eq!(normalize_slug("//foo/bar"), Ok("foo/bar"));
    }

    #[test]
    fn test_empty_and_slash_only() {
        assert_eq!(normalize_slug(""), Err(SlugError::Empty));
        assert_eq!(normalize_slug("///"), Err(SlugError::Empty));
    }

    #[test]
    fn test_whitespace_and_control() {
        assert_eq!(normalize_slug("hello world"), Err(SlugError::Whitespace));
        assert_eq!(normalize_slug(" leading"), Err(SlugError::Whitespace));
        assert_eq!(normalize_slug("tab\u{7}"), Err(SlugError::Control));
    }

    #[test]
    fn test_escapable_characters_pass_through() {
        assert_eq!(normalize_slug("q&a"), Ok("q&a"));
        assert_eq!(normalize_slug("\"quoted\""), Ok("\"quoted\""));
    }

    #[test]
    fn test_dot_segments() {
        assert_eq!(normalize_slug("."), Err(SlugError::DotSegment));
        assert_eq!(normalize_slug("/.."), Err(SlugError::DotSegment));
        assert_eq!(normalize_slug("..."), Ok("..."));
        assert_eq!(normalize_slug("../admin"), Ok("../admin"));
    }
}
