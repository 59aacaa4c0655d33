//! Local persistence cache: the on-device key/value store that every piece
//! of UI state reads from and writes to.
//!
//! The cache is the single source of truth for the current view. Writes are
//! broadcast to per-key subscribers; subscribing replays the current value
//! first, so a late subscriber never misses state that already exists.
//! `reload()` covers values written by another process sharing the same
//! backing file (the cross-tab case).

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::PathBuf;

use crate::log_warn;

type Listener = Box<dyn FnMut(&str)>;

pub struct LocalStore {
    values: BTreeMap<String, String>,
    listeners: HashMap<String, Vec<Listener>>,
    /// Backing file; None keeps the store purely in memory.
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open (or create) a store backed by the given JSON file.
    pub fn open(path: PathBuf) -> Self {
        let values = Self::read_file(&path);
        Self { values, listeners: HashMap::new(), path: Some(path) }
    }

    /// Store in the default OS data location.
    pub fn open_default() -> Self {
        let mut path = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("PairPad");
        path.push("store.json");
        Self::open(path)
    }

    /// Purely in-memory store (tests, throwaway sessions).
    pub fn in_memory() -> Self {
        Self { values: BTreeMap::new(), listeners: HashMap::new(), path: None }
    }

    fn read_file(path: &PathBuf) -> BTreeMap<String, String> {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(values) => values,
                Err(e) => {
                    log_warn!("store file {} unreadable: {}", path.display(), e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        }
    }

    fn persist(&self) {
        let Some(path) = &self.path else {
            return;
        };
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string_pretty(&self.values) {
            Ok(json) => {
                if let Err(e) = fs::write(path, json) {
                    // Fail-soft: the in-memory view stays authoritative
                    log_warn!("store persist failed: {}", e);
                }
            }
            Err(e) => log_warn!("store serialize failed: {}", e),
        }
    }

    pub fn read(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Store a value and broadcast it to this key's subscribers.
    pub fn write(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
        self.persist();
        self.notify(key, value);
    }

    fn notify(&mut self, key: &str, value: &str) {
        if let Some(subscribers) = self.listeners.get_mut(key) {
            for callback in subscribers.iter_mut() {
                callback(value);
            }
        }
    }

    /// Register a per-key subscriber. The current value (if any) is replayed
    /// immediately; afterwards the callback fires on every write to `key`.
    pub fn subscribe<F>(&mut self, key: &str, mut callback: F)
    where
        F: FnMut(&str) + 'static,
    {
        if let Some(value) = self.values.get(key) {
            callback(value);
        }
        self.listeners.entry(key.to_string()).or_default().push(Box::new(callback));
    }

    /// Re-read the backing file and re-broadcast every key whose value was
    /// changed by another process. In-memory-only stores are unaffected.
    pub fn reload(&mut self) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let fresh = Self::read_file(&path);
        let mut changed = Vec::new();
        for (key, value) in &fresh {
            if self.values.get(key) != Some(value) {
                changed.push((key.clone(), value.clone()));
            }
        }
        for (key, value) in changed {
            self.values.insert(key.clone(), value.clone());
            self.notify(&key, &value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
