//! Preview handle registry
//!
//! Each acquired image gets a locally-resolvable preview reference (a
//! `blob:`-style URI) so the presentation layer can show what was submitted.
//! Handles hold the image bytes alive until revoked; the session orchestrator
//! revokes the old handle whenever a candidate is superseded or the session is
//! cleared.
//!
//! [`PreviewRef`] is not `Clone` and revoking consumes it, so a handle is
//! released at most once.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// URI scheme prefix for preview handles
pub const PREVIEW_URI_PREFIX: &str = "blob:bva/";

/// Owned handle to a registered preview
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewRef {
    id: Uuid,
}

impl PreviewRef {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Locally-resolvable reference for the presentation layer
    pub fn uri(&self) -> String {
        format!("{}{}", PREVIEW_URI_PREFIX, self.id)
    }
}

/// Shared registry of live preview handles
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    entries: Arc<Mutex<HashMap<Uuid, Bytes>>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register image bytes and return the owning handle
    pub fn create(&self, data: Bytes) -> PreviewRef {
        let id = Uuid::new_v4();
        self.lock().insert(id, data);
        tracing::debug!(preview = %id, "Preview created");
        PreviewRef { id }
    }

    /// Resolve a preview URI back to its bytes (`None` once revoked)
    pub fn resolve(&self, uri: &str) -> Option<Bytes> {
        let id = uri.strip_prefix(PREVIEW_URI_PREFIX)?.parse::<Uuid>().ok()?;
        self.lock().get(&id).cloned()
    }

    /// Release a preview handle
    ///
    /// Returns false if the handle was not registered here.
    pub fn revoke(&self, preview: PreviewRef) -> bool {
        let removed = self.lock().remove(&preview.id).is_some();
        tracing::debug!(preview = %preview.id, removed, "Preview revoked");
        removed
    }

    /// Number of handles not yet revoked
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, Bytes>> {
        // The map stays consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
