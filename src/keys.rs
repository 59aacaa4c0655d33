//! Key construction for the shared key/value namespace.
//!
//! Every value the two clients exchange lives in one flat string namespace,
//! so the key spelling IS the protocol. All spellings are centralized here;
//! nothing else in the crate formats a storage key by hand.

use serde::{Deserialize, Serialize};

/// Key under which the per-browser/per-install device identifier is stored.
pub const DEVICE_ID_KEY: &str = "deviceId";

/// Which page's state a drawing surface belongs to. The start page and the
/// daily page keep fully separate drawings, statuses and archives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageScope {
    #[default]
    Main,
    Daily,
}

impl PageScope {
    pub fn suffix(self) -> &'static str {
        match self {
            PageScope::Main => "",
            PageScope::Daily => "_daily",
        }
    }
}

pub fn drawing_key(user: &str, scope: PageScope) -> String {
    format!("{}_drawing{}", user, scope.suffix())
}

pub fn status_key(user: &str, scope: PageScope) -> String {
    format!("{}_status{}", user, scope.suffix())
}

pub fn last_editor_key(user: &str, scope: PageScope) -> String {
    format!("{}_last_editor{}", user, scope.suffix())
}

/// Snapshot of the last successfully cloud-saved drawing; restored when the
/// user closes a surface without saving.
pub fn saved_snapshot_key(user: &str, scope: PageScope) -> String {
    format!("{}_saved_snapshot{}", user, scope.suffix())
}

pub fn text_key(user: &str) -> String {
    format!("{}_text", user)
}

pub fn archive_key(user: &str, scope: PageScope) -> String {
    format!("draw_archive{}_{}", scope.suffix(), user)
}

pub fn quiz_answer_key(user: &str, date_string: &str) -> String {
    format!("quiz_answer_{}_{}", user, date_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_suffixes() {
        assert_eq!(drawing_key("niklas", PageScope::Main), "niklas_drawing");
        assert_eq!(drawing_key("niklas", PageScope::Daily), "niklas_drawing_daily");
        assert_eq!(status_key("jovelyn", PageScope::Daily), "jovelyn_status_daily");
        assert_eq!(last_editor_key("jovelyn", PageScope::Main), "jovelyn_last_editor");
        assert_eq!(saved_snapshot_key("niklas", PageScope::Daily), "niklas_saved_snapshot_daily");
    }

    #[test]
    fn test_unscoped_keys() {
        assert_eq!(text_key("niklas"), "niklas_text");
        assert_eq!(archive_key("niklas", PageScope::Main), "draw_archive_niklas");
        assert_eq!(archive_key("niklas", PageScope::Daily), "draw_archive_daily_niklas");
        assert_eq!(
            quiz_answer_key("jovelyn", "Fri Oct 27 2023"),
            "quiz_answer_jovelyn_Fri Oct 27 2023"
        );
    }
}
