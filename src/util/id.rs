//! Resource IDs.
//!
//! State IDs are strings. Most resources use the numeric API ID; resources
//! nested below another one use compound IDs such as
//! `<storage_box_id>/<snapshot_id>`.

use crate::error::ProviderError;

/// Parse a numeric ID.
pub fn parse(id: &str, what: &str) -> Result<i64, ProviderError> {
    id.trim()
        .parse::<i64>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ProviderError::InvalidRequest(format!("invalid {} ID '{}'", what, id)))
}

/// Format a numeric ID for state.
pub fn format(id: i64) -> String {
    id.to_string()
}

/// Split a compound ID into exactly `parts` non-empty segments.
pub fn split(id: &str, parts: usize, format_hint: &str) -> Result<Vec<String>, ProviderError> {
    let segments: Vec<String> = id.splitn(parts, '/').map(str::to_string).collect();
    if segments.len() != parts || segments.iter().any(String::is_empty) {
        return Err(ProviderError::InvalidRequest(format!(
            "invalid ID '{}', expected format {}",
            id, format_hint
        )));
    }
    Ok(segments)
}

/// Parse `<parent>/<child>` where both are numeric IDs.
pub fn parse_nested(id: &str, format_hint: &str) -> Result<(i64, i64), ProviderError> {
    let segments = split(id, 2, format_hint)?;
    Ok((parse(&segments[0], "parent")?, parse(&segments[1], "child")?))
}

/// Join segments into a compound ID.
pub fn join<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(parse("42", "zone").unwrap(), 42);
        assert!(parse("abc", "zone").is_err());
        assert!(parse("0", "zone").is_err());
        assert!(matches!(parse("", "zone"), Err(ProviderError::InvalidRequest(_))));
    }

    #[test]
    fn test_compound() {
        assert_eq!(parse_nested("3/17", "<a>/<b>").unwrap(), (3, 17));
        assert!(parse_nested("3", "<a>/<b>").is_err());
        assert!(parse_nested("3/", "<a>/<b>").is_err());
        assert!(parse_nested("x/1", "<a>/<b>").is_err());

        let parts = split("example.com/www/A", 3, "<zone>/<name>/<type>").unwrap();
        assert_eq!(parts, vec!["example.com", "www", "A"]);
        assert_eq!(join(&parts), "example.com/www/A");
        assert_eq!(format(7), "7");
    }
}
