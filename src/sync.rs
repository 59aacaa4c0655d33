//! Cloud synchronization: local-first writes plus a periodic reconciling
//! pull against the remote key/value store.
//!
//! The merge policy is last-writer-wins with a short grace window. A local
//! write is applied and broadcast before any network traffic starts, then
//! tracked as a pending write until the remote store is known to hold it.
//! The grace window exists purely so the poll cycle can't visually "rewind"
//! a value in the instant between a local write and the server round-trip
//! confirming it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::RemoteError;
use crate::remote::RemoteStore;
use crate::store::LocalStore;
use crate::{log_info, log_warn};

/// A local mutation not yet confirmed absorbed by the remote store — or,
/// when `local_only`, a draft that pulls must never overwrite until the
/// caller commits or discards it.
#[derive(Clone, Debug)]
pub struct PendingWrite {
    pub value: String,
    pub enqueued_at: Instant,
    pub local_only: bool,
}

pub struct CloudSync {
    remote: Box<dyn RemoteStore>,
    pending: HashMap<String, PendingWrite>,
    /// How long a pending write outranks a differing remote value.
    fresh_window: Duration,
    reachable: bool,
}

impl CloudSync {
    pub fn new(remote: Box<dyn RemoteStore>, fresh_window: Duration) -> Self {
        Self { remote, pending: HashMap::new(), fresh_window, reachable: false }
    }

    /// Whether the last remote interaction succeeded.
    pub fn is_reachable(&self) -> bool {
        self.reachable
    }

    pub fn pending_for(&self, key: &str) -> Option<&PendingWrite> {
        self.pending.get(key)
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = (&String, &PendingWrite)> {
        self.pending.iter()
    }

    /// Local-first write: the cache update and subscriber broadcast happen
    /// before the transmit attempt, so the user always sees their own edit
    /// immediately, reachable server or not.
    pub fn push(&mut self, store: &mut LocalStore, key: &str, value: &str) {
        self.pending.insert(
            key.to_string(),
            PendingWrite {
                value: value.to_string(),
                enqueued_at: Instant::now(),
                local_only: false,
            },
        );
        store.write(key, value);

        match self.remote.put_value(key, value) {
            Ok(()) => {
                // Acknowledged — clear the pending entry unless a newer
                // write replaced it in the meantime.
                if self.pending.get(key).is_some_and(|p| p.value == value) {
                    self.pending.remove(key);
                }
                self.reachable = true;
            }
            Err(e) => {
                // Pending entry stays; the next push or a pull resolves it
                self.reachable = false;
                match &e {
                    RemoteError::Transport(_) => {
                        log_info!("push {}: remote unreachable ({})", key, e);
                    }
                    RemoteError::Rejected { .. } if e.is_rate_limited() => {
                        log_info!("push {}: rate limited, retrying later", key);
                    }
                    RemoteError::Rejected { status, message } => {
                        log_warn!("push {} rejected: {} {}", key, status, message);
                    }
                }
            }
        }
    }

    /// Stage an in-progress edit that pulls must leave alone (e.g. a drawing
    /// between "started editing" and "explicitly saved"). Does not touch the
    /// cache and does not transmit.
    pub fn hold_local_value(&mut self, key: &str, value: &str) {
        self.pending.insert(
            key.to_string(),
            PendingWrite {
                value: value.to_string(),
                enqueued_at: Instant::now(),
                local_only: true,
            },
        );
    }

    pub fn clear_pending(&mut self, key: &str) {
        self.pending.remove(key);
    }

    /// One reconciling pull: fetch the remote snapshot and merge it into the
    /// local cache without clobbering fresh or held local edits.
    pub fn pull(&mut self, store: &mut LocalStore) {
        self.pull_at(store, Instant::now());
    }

    /// [`pull`] with an explicit clock, so freshness decisions are testable.
    pub fn pull_at(&mut self, store: &mut LocalStore, now: Instant) {
        let state = match self.remote.fetch_state() {
            Ok(state) => state,
            Err(e) => {
                // Fail-soft: all local state stays untouched
                self.reachable = false;
                log_info!("pull failed: {}", e);
                return;
            }
        };

        for (key, remote_value) in &state {
            if let Some(pending) = self.pending.get(key) {
                if pending.local_only {
                    // A held draft is untouchable until committed or discarded
                    continue;
                }
                if pending.value == *remote_value {
                    // The write round-tripped — confirmed
                    self.pending.remove(key);
                } else if now.duration_since(pending.enqueued_at) < self.fresh_window {
                    // A slow echo of an older server state must not rewind a
                    // fresh local edit
                    continue;
                } else {
                    // Stale pending write: the push evidently never landed.
                    // Accept the remote as authoritative instead of keeping
                    // the key stuck forever.
                    self.pending.remove(key);
                }
            }

            if store.read(key).as_deref() != Some(remote_value) {
                store.write(key, remote_value);
            }
        }

        self.reachable = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRemote;
    use std::cell::RefCell;
    use std::rc::Rc;

    const WINDOW: Duration = Duration::from_secs(15);

    fn sync_with(remote: &FakeRemote) -> CloudSync {
        CloudSync::new(Box::new(remote.clone()), WINDOW)
    }

    fn subscribe_counter(store: &mut LocalStore, key: &str) -> Rc<RefCell<u32>> {
        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        store.subscribe(key, move |_| *sink.borrow_mut() += 1);
        count
    }

    #[test]
    fn test_local_first_visibility() {
        let remote = FakeRemote::default();
        remote.fail_puts(true); // server down: read must still work
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.push(&mut store, "niklas_text", "hallo");
        assert_eq!(store.read("niklas_text"), Some("hallo".to_string()));
        assert!(!sync.is_reachable());
        assert!(sync.pending_for("niklas_text").is_some());
    }

    #[test]
    fn test_successful_push_clears_pending() {
        let remote = FakeRemote::default();
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.push(&mut store, "k", "v");
        assert!(sync.pending_for("k").is_none());
        assert!(sync.is_reachable());
        assert_eq!(remote.puts(), vec![("k".to_string(), "v".to_string())]);
    }

    #[test]
    fn test_pull_applies_remote_values() {
        let remote = FakeRemote::default();
        remote.set_state("jovelyn_text", "hi");
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.pull(&mut store);
        assert_eq!(store.read("jovelyn_text"), Some("hi".to_string()));
        assert!(sync.is_reachable());
    }

    #[test]
    fn test_idempotent_pull_skips_notifications() {
        let remote = FakeRemote::default();
        remote.set_state("k", "v");
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        let count = subscribe_counter(&mut store, "k");
        sync.pull(&mut store);
        assert_eq!(*count.borrow(), 1);
        sync.pull(&mut store);
        assert_eq!(*count.borrow(), 1, "unchanged snapshot must not re-notify");
    }

    #[test]
    fn test_grace_window_protects_fresh_write() {
        let remote = FakeRemote::default();
        remote.fail_puts(true);
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        let t0 = Instant::now();
        sync.push(&mut store, "k", "v1");
        // The server still echoes the older state
        remote.fail_puts(false);
        remote.set_state("k", "v0");

        sync.pull_at(&mut store, t0 + Duration::from_secs(5));
        assert_eq!(store.read("k"), Some("v1".to_string()), "fresh local edit must win");
        assert!(sync.pending_for("k").is_some());
    }

    #[test]
    fn test_staleness_fallback_adopts_remote() {
        let remote = FakeRemote::default();
        remote.fail_puts(true);
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        let t0 = Instant::now();
        sync.push(&mut store, "k", "v1");
        remote.fail_puts(false);
        remote.set_state("k", "v0");

        sync.pull_at(&mut store, t0 + Duration::from_secs(16));
        assert_eq!(store.read("k"), Some("v0".to_string()), "stale pending yields to remote");
        assert!(sync.pending_for("k").is_none());
    }

    #[test]
    fn test_pull_confirms_matching_pending() {
        let remote = FakeRemote::default();
        remote.fail_puts(true);
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.push(&mut store, "k", "v1");
        // The push failed locally but the value is on the server anyway
        // (e.g. transmitted but the response was lost)
        remote.fail_puts(false);
        remote.set_state("k", "v1");

        let count = subscribe_counter(&mut store, "k");
        sync.pull(&mut store);
        assert!(sync.pending_for("k").is_none());
        assert_eq!(store.read("k"), Some("v1".to_string()));
        assert_eq!(*count.borrow(), 1, "confirmation must not rewrite the value");
    }

    #[test]
    fn test_local_only_hold_survives_pulls() {
        let remote = FakeRemote::default();
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        store.write("k", "draft");
        sync.hold_local_value("k", "draft");
        remote.set_state("k", "remote1");

        let t0 = Instant::now();
        // Any number of pulls, any remote value, arbitrarily far in the future
        sync.pull_at(&mut store, t0 + Duration::from_secs(60));
        remote.set_state("k", "remote2");
        sync.pull_at(&mut store, t0 + Duration::from_secs(3600));
        assert_eq!(store.read("k"), Some("draft".to_string()));

        // Until the hold is explicitly released
        sync.clear_pending("k");
        sync.pull(&mut store);
        assert_eq!(store.read("k"), Some("remote2".to_string()));
    }

    #[test]
    fn test_push_replaces_hold() {
        let remote = FakeRemote::default();
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.hold_local_value("k", "draft");
        sync.push(&mut store, "k", "final");
        // Push succeeded, so the hold (replaced by the pending write) is gone
        assert!(sync.pending_for("k").is_none());
        remote.set_state("k", "upstream");
        sync.pull(&mut store);
        assert_eq!(store.read("k"), Some("upstream".to_string()));
    }

    #[test]
    fn test_latest_pending_wins_per_key() {
        let remote = FakeRemote::default();
        remote.fail_puts(true);
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();

        sync.push(&mut store, "k", "v1");
        sync.push(&mut store, "k", "v2");
        assert_eq!(sync.pending_for("k").unwrap().value, "v2");
    }

    #[test]
    fn test_fetch_failure_is_fail_soft() {
        let remote = FakeRemote::default();
        remote.set_state("k", "remote");
        let mut sync = sync_with(&remote);
        let mut store = LocalStore::in_memory();
        store.write("k", "local");

        remote.fail_fetch(true);
        sync.pull(&mut store);
        assert_eq!(store.read("k"), Some("local".to_string()));
        assert!(!sync.is_reachable());
    }
}
