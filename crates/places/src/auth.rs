//! Credential exchange between engines and the application.
//!
//! An engine that needs credentials emits `authentication_required` with an
//! [`AuthChallenge`] and reads the answer once the emission returns. The
//! manager remembers the last credentials given and answers further
//! first-attempt challenges itself. A challenge marked as a retry means the
//! engine rejected those credentials: the manager forgets them and asks its
//! listeners again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A user name and password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl core::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A request for credentials, answered by whoever handles the signal.
#[derive(Debug)]
pub struct AuthChallenge {
    realm: String,
    retry: bool,
    response: Mutex<Option<Credentials>>,
}

impl AuthChallenge {
    /// First attempt for `realm`.
    pub fn new(realm: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            realm: realm.into(),
            retry: false,
            response: Mutex::new(None),
        })
    }

    /// The previous answer for `realm` was rejected.
    pub fn retry(realm: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            realm: realm.into(),
            retry: true,
            response: Mutex::new(None),
        })
    }

    pub fn realm(&self) -> &str {
        &self.realm
    }

    pub fn is_retry(&self) -> bool {
        self.retry
    }

    pub fn provide(&self, credentials: Credentials) {
        *self.lock() = Some(credentials);
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.lock().clone()
    }

    pub fn is_answered(&self) -> bool {
        self.lock().is_some()
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.response.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Last credentials handed to the engine.
#[derive(Debug, Default)]
pub(crate) struct CredentialCache {
    accepted: Mutex<Option<Credentials>>,
}

impl CredentialCache {
    pub(crate) fn get(&self) -> Option<Credentials> {
        self.lock().clone()
    }

    pub(crate) fn store(&self, credentials: Credentials) {
        *self.lock() = Some(credentials);
    }

    pub(crate) fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.accepted.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
