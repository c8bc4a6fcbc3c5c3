//! Process-wide "who is logged in" state.
//!
//! A [`ViewerSession`] is created once per process and handed to every
//! profile screen that is mounted. It is filled on login (or lazily by the
//! first screen that needs it), overwritten by every resync, and cleared when
//! a profile screen is torn down so the next screen never shows a previous
//! viewer.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::user::{UserId, ViewerIdentity};

/// Cheap to clone; all clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct ViewerSession {
  viewer: Arc<RwLock<Option<ViewerIdentity>>>,
}

impl ViewerSession {
  pub fn new() -> Self { Self::default() }

  /// Start a session for `viewer`.
  pub fn login(&self, viewer: ViewerIdentity) {
    debug!(viewer = %viewer.id, "viewer session started");
    self.replace(viewer);
  }

  /// Snapshot of the current viewer, if any.
  pub fn current(&self) -> Option<ViewerIdentity> {
    self
      .viewer
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  pub fn current_id(&self) -> Option<UserId> {
    self
      .viewer
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .as_ref()
      .map(|v| v.id.clone())
  }

  pub fn is_empty(&self) -> bool {
    self
      .viewer
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .is_none()
  }

  /// Overwrite the viewer with a freshly fetched snapshot.
  pub fn replace(&self, viewer: ViewerIdentity) {
    *self.viewer.write().unwrap_or_else(PoisonError::into_inner) = Some(viewer);
  }

  /// Forget the viewer.
  pub fn reset(&self) {
    let previous = self
      .viewer
      .write()
      .unwrap_or_else(PoisonError::into_inner)
      .take();
    if let Some(v) = previous {
      debug!(viewer = %v.id, "viewer session reset");
    }
  }
}
