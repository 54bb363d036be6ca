//! Label selector matching shared by sandbox and container listing.

use std::collections::HashMap;

/// Check whether `labels` satisfy `selector`.
///
/// Every selector key must be present in `labels` with an identical value.
/// Extra labels never cause a mismatch, and an empty selector matches
/// everything.
pub fn matches_labels(
    selector: &HashMap<String, String>,
    labels: &HashMap<String, String>,
) -> bool {
    selector
        .iter()
        .all(|(key, value)| labels.get(key) == Some(value))
}
