//! Shared test double for the remote key/value store.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RemoteError;
use crate::remote::RemoteStore;

#[derive(Default)]
struct FakeRemoteInner {
    state: RefCell<HashMap<String, String>>,
    puts: RefCell<Vec<(String, String)>>,
    fail_puts: Cell<bool>,
    fail_fetch: Cell<bool>,
}

/// In-memory remote store. Clones share state, so a test can keep a handle
/// after moving a clone into the sync service.
#[derive(Clone, Default)]
pub struct FakeRemote(Rc<FakeRemoteInner>);

impl FakeRemote {
    pub fn set_state(&self, key: &str, value: &str) {
        self.0.state.borrow_mut().insert(key.to_string(), value.to_string());
    }

    pub fn state_of(&self, key: &str) -> Option<String> {
        self.0.state.borrow().get(key).cloned()
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.0.puts.borrow().clone()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.0.fail_puts.set(fail);
    }

    pub fn fail_fetch(&self, fail: bool) {
        self.0.fail_fetch.set(fail);
    }
}

impl RemoteStore for FakeRemote {
    fn fetch_state(&self) -> Result<HashMap<String, String>, RemoteError> {
        if self.0.fail_fetch.get() {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        Ok(self.0.state.borrow().clone())
    }

    fn put_value(&self, key: &str, value: &str) -> Result<(), RemoteError> {
        if self.0.fail_puts.get() {
            return Err(RemoteError::Transport("connection refused".into()));
        }
        self.0.puts.borrow_mut().push((key.to_string(), value.to_string()));
        self.0.state.borrow_mut().insert(key.to_string(), value.to_string());
        Ok(())
    }
}
