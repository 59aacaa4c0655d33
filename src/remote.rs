//! Remote key/value store client.
//!
//! The wire protocol is one GET for the full state snapshot and one PUT per
//! key write, passcode-gated. Every call is a single attempt with an
//! explicit timeout; retrying is the caller's (scheduler's) job, never the
//! client's.

use serde::Deserialize;
use std::collections::HashMap;

use crate::config::PadConfig;
use crate::error::RemoteError;

pub trait RemoteStore {
    /// `GET {base}` → the full `key → value` snapshot. Must be a fresh read
    /// (no-cache) every time.
    fn fetch_state(&self) -> Result<HashMap<String, String>, RemoteError>;

    /// `PUT {base}/{key}` with the shared passcode.
    fn put_value(&self, key: &str, value: &str) -> Result<(), RemoteError>;
}

#[derive(Deserialize)]
struct StateResponse {
    #[serde(default)]
    state: HashMap<String, String>,
}

#[derive(serde::Serialize)]
struct PutBody<'a> {
    value: &'a str,
}

pub struct HttpRemote {
    base: String,
    passcode: String,
    timeout_secs: u64,
}

impl HttpRemote {
    pub fn new(base: String, passcode: String, timeout_secs: u64) -> Self {
        Self { base, passcode, timeout_secs }
    }

    pub fn from_config(config: &PadConfig) -> Self {
        Self::new(config.server_base.clone(), config.passcode.clone(), config.http_timeout_secs)
    }

    fn rejection(status: i32, body: &str) -> RemoteError {
        // Server errors carry `{"error": "..."}`; fall back to the raw body
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.error)
            .unwrap_or_else(|_| body.trim().to_string());
        RemoteError::Rejected { status, message }
    }
}

impl RemoteStore for HttpRemote {
    fn fetch_state(&self) -> Result<HashMap<String, String>, RemoteError> {
        let response = minreq::get(self.base.as_str())
            .with_header("Cache-Control", "no-cache")
            .with_timeout(self.timeout_secs)
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if response.status_code != 200 {
            let body = response.as_str().unwrap_or_default();
            return Err(Self::rejection(response.status_code, body));
        }

        let parsed: StateResponse =
            response.json().map_err(|e| RemoteError::Transport(format!("bad response: {}", e)))?;
        Ok(parsed.state)
    }

    fn put_value(&self, key: &str, value: &str) -> Result<(), RemoteError> {
        let url = format!("{}/{}", self.base, url_encode(key));
        let response = minreq::put(url)
            .with_header("x-app-passcode", &self.passcode)
            .with_timeout(self.timeout_secs)
            .with_json(&PutBody { value })
            .map_err(|e| RemoteError::Transport(e.to_string()))?
            .send()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        if response.status_code != 200 {
            let body = response.as_str().unwrap_or_default();
            return Err(Self::rejection(response.status_code, body));
        }
        Ok(())
    }
}

/// Percent-encode a key for use as a URL path segment (RFC 3986 unreserved
/// characters stay literal). Keys contain spaces, e.g. quiz answer keys.
fn url_encode(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}
