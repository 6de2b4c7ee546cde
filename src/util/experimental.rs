//! Warnings for experimental products.

use std::collections::HashSet;
use std::sync::{Mutex, OnceLock};

use tracing::warn;

use crate::schema::Diagnostic;

/// Experimental product: DNS zones and RRSets.
pub const DNS: &str = "DNS";
/// Experimental product: Storage Boxes.
pub const STORAGE_BOX: &str = "Storage Box";

fn summary(product: &str) -> String {
    format!("Experimental: {} support is experimental", product)
}

/// A warning diagnostic for `product`.
pub fn warning(product: &str) -> Diagnostic {
    Diagnostic::warning(summary(product))
        .with_detail("Breaking changes may occur within minor releases.")
}

/// Log the warning for `product` once per process.
pub fn log_once(product: &str) {
    static SEEN: OnceLock<Mutex<HashSet<String>>> = OnceLock::new();
    let seen = SEEN.get_or_init(|| Mutex::new(HashSet::new()));
    let first = seen
        .lock()
        .map(|mut set| set.insert(product.to_string()))
        .unwrap_or(false);
    if first {
        warn!(product, "{}", summary(product));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::DiagnosticSeverity;

    #[test]
    fn test_warning() {
        let diag = warning(DNS);
        assert_eq!(diag.severity, DiagnosticSeverity::Warning);
        assert!(diag.summary.contains("DNS"));
    }

    #[test]
    fn test_log_once_is_repeatable() {
        log_once(STORAGE_BOX);
        log_once(STORAGE_BOX);
    }
}
