//! Layout warnings routed through the `log` facade.
//!
//! Provides deduplication to avoid spamming the same warning multiple times
//! while a document is paginated. Used when the engine meets malformed input
//! that it can degrade around (extra table cells, unsupported display types).

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};

/// Global set of warnings we've already emitted (to deduplicate).
static WARNED: Mutex<Option<HashSet<String>>> = Mutex::new(None);

/// Warn about malformed or unsupported input (emitted once per unique message).
///
/// The warning is logged at `warn` level with the component as log target
/// suffix, so `RUST_LOG=quire::table=warn` filters work as expected.
///
/// # Example
/// ```
/// quire_common::warning::warn_once("table", "row has more cells than columns");
/// ```
pub fn warn_once(component: &str, message: &str) {
    let key = format!("[{component}] {message}");
    let should_log = WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .get_or_insert_with(HashSet::new)
        .insert(key);

    if should_log {
        log::warn!(target: "quire", "[{component}] {message}");
    }
}

/// Returns true if `message` was already reported for `component`.
#[must_use]
pub fn was_warned(component: &str, message: &str) -> bool {
    let key = format!("[{component}] {message}");
    WARNED
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .is_some_and(|set| set.contains(&key))
}

/// Clear all recorded warnings (call before laying out a new document).
pub fn clear_warnings() {
    let mut guard = WARNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(set) = guard.as_mut() {
        set.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn_once_records_message() {
        warn_once("test", "first message");
        assert!(was_warned("test", "first message"));
        assert!(!was_warned("test", "never sent"));
    }
}
