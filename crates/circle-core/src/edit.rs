//! The edit-profile modal's open/closed state.
//!
//! Only the state lives here. The form and the resync that must precede
//! closing are driven by [`crate::controller::ProfileController`].

use crate::{Error, Result, affordance::Affordance};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EditSession {
  #[default]
  Closed,
  Open,
}

impl EditSession {
  pub fn is_open(self) -> bool { matches!(self, Self::Open) }

  /// Closed → Open. Refused unless the viewer owns the profile.
  pub fn open(&mut self, affordance: Affordance) -> Result<()> {
    if !affordance.can_edit() {
      return Err(Error::NotOwnProfile);
    }
    *self = Self::Open;
    Ok(())
  }

  /// Open → Closed. Closing an already-closed session is a no-op.
  pub fn close(&mut self) { *self = Self::Closed; }
}
