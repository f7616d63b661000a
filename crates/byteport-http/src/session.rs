//! Cookie-based session state
//!
//! The session owns an explicit cookie jar instead of delegating to the
//! HTTP stack, because the login flow has to read the `csrftoken` and
//! `sessionid` cookies by name. Every response feeds the jar; every request
//! replays it. A session lives and dies with its client instance and is
//! never persisted.

use std::collections::BTreeMap;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Login state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No login attempted
    #[default]
    Anonymous,

    /// CSRF cookie obtained, credentials not yet posted
    AwaitingCsrfToken,

    /// Post-login session cookie present
    Authenticated,
}

/// Cookie store plus login state, owned by one client instance
#[derive(Debug, Default)]
pub struct Session {
    cookies: BTreeMap<String, String>,
    state: SessionState,
}

impl Session {
    /// Current login state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Whether the login flow completed
    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    /// Look up a cookie value by name
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Capture cookies from a response
    ///
    /// Only the name/value pair is kept; attributes (path, expiry, domain)
    /// are irrelevant for a single-host, in-process session.
    pub(crate) fn absorb(&mut self, headers: &HeaderMap) {
        for header in headers.get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else {
                continue;
            };
            let pair = raw.split(';').next().unwrap_or_default();
            if let Some((name, value)) = pair.split_once('=') {
                let name = name.trim();
                if !name.is_empty() {
                    self.cookies.insert(name.to_string(), value.to_string());
                }
            }
        }
    }

    /// Render the `Cookie` request header, if any cookies are held
    pub(crate) fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}
