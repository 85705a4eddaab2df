//! Transient object URLs.
//!
//! Previews and in-memory artifacts are exposed through short-lived
//! `blob:` URLs. Each [`ObjectUrl`] is owned by exactly one item and is
//! revoked when released or dropped, so the pool's live count is the leak
//! detector for a session.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::trace;
use uuid::Uuid;

const URL_PREFIX: &str = "blob:convertino/";

/// Allocator and registry of live object URLs.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlPool {
    live: Arc<Mutex<HashSet<String>>>,
}

impl ObjectUrlPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh URL. It stays live until the handle is released or dropped.
    pub fn allocate(&self) -> ObjectUrl {
        let url = format!("{}{}", URL_PREFIX, Uuid::new_v4());
        self.lock().insert(url.clone());
        trace!(url = %url, "allocated object url");
        ObjectUrl {
            url,
            pool: self.clone(),
            revoked: false,
        }
    }

    /// Number of URLs allocated and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.lock().contains(url)
    }

    fn revoke(&self, url: &str) {
        if self.lock().remove(url) {
            trace!(url = %url, "revoked object url");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        // The set is never left half-updated, so a poisoned lock is still usable.
        self.live.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An owned, revocable object URL.
pub struct ObjectUrl {
    url: String,
    pool: ObjectUrlPool,
    revoked: bool,
}

impl ObjectUrl {
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Revokes the URL now instead of at drop.
    pub fn release(mut self) {
        self.revoke();
    }

    fn revoke(&mut self) {
        if !self.revoked {
            self.pool.revoke(&self.url);
            self.revoked = true;
        }
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        self.revoke();
    }
}

impl fmt::Debug for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectUrl").field(&self.url).finish()
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}
