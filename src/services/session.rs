//! Admin session tokens.
//!
//! The router only talks to [`SessionValidator`]; the shared-secret scheme
//! below is a placeholder that can be swapped without touching handlers.

use base64::{Engine as _, engine::general_purpose};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// Session lifetime in seconds.
pub const SESSION_MAX_AGE: u64 = 86_400;

pub trait SessionValidator: Send + Sync {
    /// Token for a successful login, or `None` when the password is wrong.
    fn issue(&self, password: &str) -> Option<String>;

    /// Whether `token` grants admin access.
    fn validate(&self, token: &str) -> bool;
}

/// Token is the base64 of the configured admin password.
pub struct SharedSecretSession {
    password: String,
    token: String,
}

impl SharedSecretSession {
    pub fn new(password: impl Into<String>) -> Self {
        let password = password.into();
        let token = general_purpose::STANDARD.encode(&password);
        Self { password, token }
    }
}

impl SessionValidator for SharedSecretSession {
    fn issue(&self, password: &str) -> Option<String> {
        (password == self.password).then(|| self.token.clone())
    }

    fn validate(&self, token: &str) -> bool {
        !token.is_empty() && token == self.token
    }
}

/// Value of cookie `name` in a `Cookie` header.
pub fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}
