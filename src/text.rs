//! Debounced text notes.
//!
//! Every keystroke is written to the local cache immediately; the cloud push
//! is coalesced behind a quiescence window so a typing burst becomes one PUT
//! instead of sixty. An explicit flush bypasses the window for teardown
//! paths (blur, tab hidden, page hide) where durability beats batching.

use std::time::{Duration, Instant};

use crate::keys;
use crate::store::LocalStore;
use crate::sync::CloudSync;

pub struct NoteChannel {
    key: String,
    delay: Duration,
    /// Deadline of the scheduled cloud save; None when nothing is pending.
    deadline: Option<Instant>,
}

impl NoteChannel {
    pub fn new(user: &str, delay: Duration) -> Self {
        Self { key: keys::text_key(user), delay, deadline: None }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// A cloud save is scheduled but has not fired yet. While this holds,
    /// incoming remote values must not replace the text being typed.
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Record a keystroke: local write now, cloud push after the quiescence
    /// window. Each keystroke restarts the window.
    pub fn input(&mut self, store: &mut LocalStore, text: &str, now: Instant) {
        store.write(&self.key, text);
        self.deadline = Some(now + self.delay);
    }

    /// Fire the scheduled save if its window has elapsed. Returns true when
    /// a push happened.
    pub fn poll(&mut self, store: &mut LocalStore, sync: &mut CloudSync, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.push_current(store, sync);
                true
            }
            _ => false,
        }
    }

    /// Push immediately, cancelling any scheduled save.
    pub fn flush(&mut self, store: &mut LocalStore, sync: &mut CloudSync) {
        self.push_current(store, sync);
    }

    fn push_current(&mut self, store: &mut LocalStore, sync: &mut CloudSync) {
        self.deadline = None;
        let text = store.read(&self.key).unwrap_or_default();
        sync.push(store, &self.key, &text);
    }

    /// Whether a remote/stored value may be shown in the editor right now:
    /// not while the user's own burst is still within the debounce window.
    pub fn accepts_remote(&self) -> bool {
        !self.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::FakeRemote;

    fn fixture() -> (LocalStore, CloudSync, NoteChannel, FakeRemote) {
        let remote = FakeRemote::default();
        let sync = CloudSync::new(Box::new(remote.clone()), Duration::from_secs(15));
        let store = LocalStore::in_memory();
        let channel = NoteChannel::new("niklas", Duration::from_millis(1200));
        (store, sync, channel, remote)
    }

    #[test]
    fn test_keystrokes_are_local_first_and_coalesced() {
        let (mut store, mut sync, mut channel, remote) = fixture();
        let t0 = Instant::now();

        channel.input(&mut store, "h", t0);
        channel.input(&mut store, "ha", t0 + Duration::from_millis(300));
        channel.input(&mut store, "hallo", t0 + Duration::from_millis(600));

        // Locally visible at once, nothing pushed yet
        assert_eq!(store.read("niklas_text"), Some("hallo".to_string()));
        assert!(remote.puts().is_empty());
        assert!(channel.is_pending());

        // 600 ms after the last keystroke: still inside the window
        assert!(!channel.poll(&mut store, &mut sync, t0 + Duration::from_millis(1200)));

        // Window elapsed: exactly one push with the final text
        assert!(channel.poll(&mut store, &mut sync, t0 + Duration::from_millis(1801)));
        assert_eq!(remote.puts(), vec![("niklas_text".to_string(), "hallo".to_string())]);
        assert!(!channel.is_pending());
    }

    #[test]
    fn test_flush_bypasses_window() {
        let (mut store, mut sync, mut channel, remote) = fixture();
        let t0 = Instant::now();

        channel.input(&mut store, "bye", t0);
        channel.flush(&mut store, &mut sync);
        assert_eq!(remote.puts(), vec![("niklas_text".to_string(), "bye".to_string())]);
        assert!(!channel.is_pending());

        // The cancelled timer must not fire again
        assert!(!channel.poll(&mut store, &mut sync, t0 + Duration::from_secs(10)));
        assert_eq!(remote.puts().len(), 1);
    }

    #[test]
    fn test_remote_values_held_off_while_typing() {
        let (mut store, _sync, mut channel, _remote) = fixture();
        let t0 = Instant::now();
        assert!(channel.accepts_remote());
        channel.input(&mut store, "typing", t0);
        assert!(!channel.accepts_remote());
    }
}
