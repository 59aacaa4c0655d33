//! Per-user drawing archive.
//!
//! Archives live in the local cache only (they are per-device galleries, not
//! shared state): one JSON list per user and page scope, most recent first,
//! truncated to a fixed capacity on insert.

use chrono::{Local, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::keys::{self, PageScope};
use crate::store::LocalStore;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveItem {
    pub id: String,
    pub name: String,
    /// Unix milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
    #[serde(rename = "dataURL")]
    pub data_url: String,
}

impl ArchiveItem {
    /// Creation time formatted for display, e.g. `27.10.2023 14:05`.
    pub fn created_at_display(&self) -> String {
        match Utc.timestamp_millis_opt(self.created_at).single() {
            Some(dt) => dt.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string(),
            None => "?".to_string(),
        }
    }
}

/// Parse a user's archive list; unreadable or missing data reads as empty.
pub fn items(store: &LocalStore, user: &str, scope: PageScope) -> Vec<ArchiveItem> {
    let Some(raw) = store.read(&keys::archive_key(user, scope)) else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_default()
}

fn write_items(store: &mut LocalStore, user: &str, scope: PageScope, items: &[ArchiveItem]) {
    if let Ok(json) = serde_json::to_string(items) {
        store.write(&keys::archive_key(user, scope), &json);
    }
}

/// Insert a new item at the front, truncating to `cap` entries.
pub fn add_item(
    store: &mut LocalStore,
    user: &str,
    scope: PageScope,
    name: &str,
    data_url: &str,
    cap: usize,
) -> ArchiveItem {
    let name = name.trim();
    let item = ArchiveItem {
        id: Uuid::new_v4().to_string(),
        name: if name.is_empty() { default_name() } else { name.to_string() },
        created_at: Utc::now().timestamp_millis(),
        data_url: data_url.to_string(),
    };

    let mut list = items(store, user, scope);
    list.insert(0, item.clone());
    list.truncate(cap);
    write_items(store, user, scope, &list);
    item
}

pub fn find_item(store: &LocalStore, user: &str, scope: PageScope, id: &str) -> Option<ArchiveItem> {
    items(store, user, scope).into_iter().find(|item| item.id == id)
}

pub fn delete_item(store: &mut LocalStore, user: &str, scope: PageScope, id: &str) {
    let list: Vec<ArchiveItem> =
        items(store, user, scope).into_iter().filter(|item| item.id != id).collect();
    write_items(store, user, scope, &list);
}

/// Default archive name: `Bild <date> <time>`.
pub fn default_name() -> String {
    let now = Local::now();
    format!("Bild {} {}", now.format("%d.%m.%Y"), now.format("%H:%M"))
}

/// Default name on the daily page, carrying the day's motif when known.
pub fn default_name_with_motif(motif: Option<&str>) -> String {
    match motif {
        Some(motif) if !motif.trim().is_empty() => {
            let now = Local::now();
            format!("{} - {} {}", motif.trim(), now.format("%d.%m.%Y"), now.format("%H:%M"))
        }
        _ => default_name(),
    }
}

/// Make an archive name safe as a file name for export.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            c => c,
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() { "bild".to_string() } else { collapsed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_find() {
        let mut store = LocalStore::in_memory();
        let item = add_item(&mut store, "niklas", PageScope::Main, "Sonne", "data:...", 120);
        assert_eq!(item.name, "Sonne");

        let found = find_item(&store, "niklas", PageScope::Main, &item.id).unwrap();
        assert_eq!(found.data_url, "data:...");
        assert!(find_item(&store, "jovelyn", PageScope::Main, &item.id).is_none());
    }

    #[test]
    fn test_most_recent_first_and_cap() {
        let mut store = LocalStore::in_memory();
        for n in 0..125 {
            add_item(&mut store, "niklas", PageScope::Main, &format!("n{}", n), "d", 120);
        }
        let list = items(&store, "niklas", PageScope::Main);
        assert_eq!(list.len(), 120);
        assert_eq!(list[0].name, "n124");
        assert_eq!(list.last().unwrap().name, "n5");
    }

    #[test]
    fn test_delete() {
        let mut store = LocalStore::in_memory();
        let a = add_item(&mut store, "niklas", PageScope::Main, "a", "d", 120);
        let b = add_item(&mut store, "niklas", PageScope::Main, "b", "d", 120);
        delete_item(&mut store, "niklas", PageScope::Main, &a.id);

        let list = items(&store, "niklas", PageScope::Main);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, b.id);
    }

    #[test]
    fn test_blank_name_gets_default() {
        let mut store = LocalStore::in_memory();
        let item = add_item(&mut store, "niklas", PageScope::Daily, "   ", "d", 120);
        assert!(item.name.starts_with("Bild "));
    }

    #[test]
    fn test_corrupt_list_reads_as_empty() {
        let mut store = LocalStore::in_memory();
        store.write(&keys::archive_key("niklas", PageScope::Main), "{not json");
        assert!(items(&store, "niklas", PageScope::Main).is_empty());
    }

    #[test]
    fn test_serialization_field_names() {
        let item = ArchiveItem {
            id: "x".into(),
            name: "y".into(),
            created_at: 1_700_000_000_000,
            data_url: "data:image/png;base64,AA".into(),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"createdAt\""));
        assert!(json.contains("\"dataURL\""));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("Sonne/Mond: *?"), "Sonne-Mond- --");
        assert_eq!(sanitize_file_name("  viel   Platz  "), "viel Platz");
        assert_eq!(sanitize_file_name("///"), "---");
        assert_eq!(sanitize_file_name("   "), "bild");
    }

    #[test]
    fn test_scopes_are_separate() {
        let mut store = LocalStore::in_memory();
        add_item(&mut store, "niklas", PageScope::Main, "a", "d", 120);
        assert!(items(&store, "niklas", PageScope::Daily).is_empty());
    }
}
