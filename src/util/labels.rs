//! Label maps between state and the API.
//!
//! State holds labels as an optional map; the API always wants a map and
//! always returns one. Unset and empty are the same thing: an object without
//! labels reads back as null, and removing `labels` from the configuration
//! clears them.

use std::collections::HashMap;

/// Labels to send to the API. Unset labels are an empty map.
pub fn to_api(labels: Option<&HashMap<String, String>>) -> HashMap<String, String> {
    labels.cloned().unwrap_or_default()
}

/// Labels to store in state. No labels is null.
pub fn from_api(labels: &HashMap<String, String>) -> Option<HashMap<String, String>> {
    (!labels.is_empty()).then(|| labels.clone())
}

/// Whether an update has to send `planned` labels.
pub fn changed(
    prior: Option<&HashMap<String, String>>,
    planned: Option<&HashMap<String, String>>,
) -> bool {
    to_api(prior) != to_api(planned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_to_api_defaults_to_empty() {
        assert!(to_api(None).is_empty());
        assert_eq!(to_api(Some(&map(&[("env", "prod")])))["env"], "prod");
    }

    #[test]
    fn test_from_api_maps_empty_to_null() {
        assert_eq!(from_api(&HashMap::new()), None);
        assert_eq!(from_api(&map(&[("env", "prod")])), Some(map(&[("env", "prod")])));
    }

    #[test]
    fn test_changed_treats_unset_as_empty() {
        let prod = map(&[("env", "prod")]);
        assert!(changed(Some(&prod), None));
        assert!(changed(None, Some(&prod)));
        assert!(!changed(Some(&HashMap::new()), None));
        assert!(!changed(Some(&prod), Some(&prod.clone())));
    }
}
