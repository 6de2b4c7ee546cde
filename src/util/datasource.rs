//! Lookups shared by the data sources.

use crate::error::ProviderError;

/// Pick the single result of a label selector query.
pub fn one_result<T>(mut items: Vec<T>, what: &str, selector: &str) -> Result<T, ProviderError> {
    match items.len() {
        0 => Err(ProviderError::NotFound(format!(
            "no {} found for label selector '{}'",
            what, selector
        ))),
        1 => Ok(items.remove(0)),
        n => Err(ProviderError::InvalidRequest(format!(
            "more than one {} found for label selector '{}' ({} results)",
            what, selector, n
        ))),
    }
}

/// Error for a lookup by ID or name that found nothing.
pub fn not_found(what: &str, key: &str, value: impl std::fmt::Display) -> ProviderError {
    ProviderError::NotFound(format!("{} with {} '{}' not found", what, key, value))
}

/// ID of a list data source: the member IDs joined, or `empty` for none.
pub fn list_id(ids: impl IntoIterator<Item = i64>) -> String {
    let ids: Vec<String> = ids.into_iter().map(|id| id.to_string()).collect();
    if ids.is_empty() {
        "empty".to_string()
    } else {
        ids.join("-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_result() {
        assert_eq!(one_result(vec![1], "zone", "env=prod").unwrap(), 1);

        let err = one_result(Vec::<i32>::new(), "zone", "env=prod").unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));

        let err = one_result(vec![1, 2], "zone", "env=prod").unwrap_err();
        assert!(err.message().contains("more than one zone"));
    }

    #[test]
    fn test_list_id() {
        assert_eq!(list_id([3, 1]), "3-1");
        assert_eq!(list_id([]), "empty");
    }
}
