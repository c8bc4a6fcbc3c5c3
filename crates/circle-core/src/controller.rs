//! The profile screen controller.
//!
//! A [`ProfileController`] is mounted for one route subject id. It owns the
//! subject snapshot and the edit session, shares the [`ViewerSession`] with
//! the rest of the process, and enforces one rule: after any committed follow,
//! unfollow, or profile edit, the subject and the viewer are re-fetched
//! together through [`ProfileController::resync_identities`]. Nothing is
//! patched locally.
//!
//! The controller is cheap to clone. Clones share state, so operations can be
//! spawned onto the runtime while the screen keeps reading
//! [`ProfileController::view`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  affordance::{Affordance, FollowAction},
  edit::EditSession,
  format::format_date,
  session::ViewerSession,
  source::{ProfileSource, RelationshipMutator},
  user::{FollowRequest, ProfileSubject, UserId},
};

// ─── Render model ────────────────────────────────────────────────────────────

/// Everything a renderer needs to draw a loaded profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileView {
  pub subject:       ProfileSubject,
  pub affordance:    Affordance,
  pub edit_open:     bool,
  /// A follow/unfollow is in flight; the button should be disabled.
  pub toggle_busy:   bool,
  /// `date_of_birth` formatted for display.
  pub date_of_birth: String,
}

/// Result of [`ProfileController::toggle_follow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
  /// The command succeeded and both snapshots were re-requested.
  Committed(FollowAction),
  /// No subject id; nothing was sent.
  Skipped,
  /// Another toggle is still in flight; nothing was sent.
  Busy,
  /// The command failed. The error was logged and the snapshot is unchanged.
  Failed,
  /// The screen was torn down before the command finished.
  Cancelled,
}

// ─── State ───────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct ScreenState {
  profile:   Option<ProfileSubject>,
  edit:      EditSession,
  toggling:  bool,
  /// Bumped each time a load or resync issues its fetches. Only the newest
  /// generation may write its results.
  fetch_gen: u64,
}

impl ScreenState {
  fn next_ticket(&mut self) -> u64 {
    self.fetch_gen += 1;
    self.fetch_gen
  }

  fn is_current(&self, ticket: u64) -> bool { self.fetch_gen == ticket }
}

/// Marks a toggle as in flight until dropped, including when the toggle
/// future itself is dropped half way.
struct InFlight {
  state: Arc<Mutex<ScreenState>>,
}

impl InFlight {
  fn acquire(state: &Arc<Mutex<ScreenState>>) -> Option<Self> {
    let mut guard = state.lock().unwrap_or_else(PoisonError::into_inner);
    if guard.toggling {
      return None;
    }
    guard.toggling = true;
    Some(Self {
      state: Arc::clone(state),
    })
  }
}

impl Drop for InFlight {
  fn drop(&mut self) {
    self
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .toggling = false;
  }
}

// ─── Controller ──────────────────────────────────────────────────────────────

pub struct ProfileController<S, M> {
  subject_id: Option<UserId>,
  source:     Arc<S>,
  mutator:    Arc<M>,
  session:    ViewerSession,
  state:      Arc<Mutex<ScreenState>>,
  cancel:     CancellationToken,
}

impl<S, M> Clone for ProfileController<S, M> {
  fn clone(&self) -> Self {
    Self {
      subject_id: self.subject_id.clone(),
      source:     Arc::clone(&self.source),
      mutator:    Arc::clone(&self.mutator),
      session:    self.session.clone(),
      state:      Arc::clone(&self.state),
      cancel:     self.cancel.clone(),
    }
  }
}

impl<S, M> ProfileController<S, M>
where
  S: ProfileSource,
  M: RelationshipMutator,
{
  /// Mount a controller for the route parameter `subject_id`.
  ///
  /// A blank id is kept as "no subject": the screen renders nothing and every
  /// operation that needs a subject becomes a no-op.
  pub fn new(
    subject_id: Option<UserId>,
    source: Arc<S>,
    mutator: Arc<M>,
    session: ViewerSession,
  ) -> Self {
    Self {
      subject_id: subject_id.filter(|id| !id.is_empty()),
      source,
      mutator,
      session,
      state: Arc::default(),
      cancel: CancellationToken::new(),
    }
  }

  pub fn subject_id(&self) -> Option<&UserId> { self.subject_id.as_ref() }

  pub fn session(&self) -> &ViewerSession { &self.session }

  pub fn is_torn_down(&self) -> bool { self.cancel.is_cancelled() }

  fn lock(&self) -> MutexGuard<'_, ScreenState> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }

  // ── Render decision ───────────────────────────────────────────────────────

  /// The render model, or `None` until the subject snapshot has loaded.
  pub fn view(&self) -> Option<ProfileView> {
    let subject_id = self.subject_id()?;
    let viewer_id = self.session.current_id();
    let state = self.lock();
    let subject = state.profile.clone()?;

    Some(ProfileView {
      affordance: Affordance::for_subject(
        subject_id,
        viewer_id.as_ref(),
        &subject,
      ),
      edit_open: state.edit.is_open(),
      toggle_busy: state.toggling,
      date_of_birth: format_date(subject.date_of_birth.as_deref()),
      subject,
    })
  }

  pub fn edit_session(&self) -> EditSession { self.lock().edit }

  pub fn is_toggling(&self) -> bool { self.lock().toggling }

  fn is_following(&self) -> bool {
    self
      .lock()
      .profile
      .as_ref()
      .is_some_and(|p| p.is_following)
  }

  // ── Loading ───────────────────────────────────────────────────────────────

  /// Mount-time fetch of the subject, plus the viewer if the session has
  /// none. Each snapshot is stored as soon as its own request succeeds.
  pub async fn load(&self) -> Result<()> {
    let subject_id = self.subject_id().ok_or(Error::EmptySubjectId)?;
    let need_viewer = self.session.is_empty();
    let ticket = self.lock().next_ticket();
    debug!(subject = %subject_id, need_viewer, ticket, "loading profile screen");

    let viewer = async {
      if need_viewer {
        self.source.fetch_viewer().await.map(Some)
      } else {
        Ok(None)
      }
    };
    let fetch = async {
      tokio::join!(self.source.fetch_profile(subject_id), viewer)
    };
    let (profile, viewer) = tokio::select! {
      _ = self.cancel.cancelled() => return Err(Error::Cancelled),
      pair = fetch => pair,
    };

    let mut state = self.lock();
    if self.cancel.is_cancelled() {
      return Err(Error::Cancelled);
    }
    if !state.is_current(ticket) {
      debug!(subject = %subject_id, ticket, "load superseded; discarding");
      return Ok(());
    }

    let viewer_result = match viewer {
      Ok(Some(v)) => {
        self.session.login(v);
        Ok(())
      }
      Ok(None) => Ok(()),
      Err(e) => {
        warn!(error = %e, "failed to load viewer");
        Err(Error::from_source(e))
      }
    };

    match profile {
      Ok(p) => {
        state.profile = Some(p);
        viewer_result
      }
      Err(e) => {
        warn!(subject = %subject_id, error = %e, "failed to load profile");
        Err(Error::from_source(e))
      }
    }
  }

  // ── Resync ────────────────────────────────────────────────────────────────

  /// Re-fetch the subject and the viewer together.
  ///
  /// Both requests run concurrently. The snapshots are replaced only if both
  /// succeed; otherwise both are left as they were. When resyncs overlap,
  /// only the most recently issued one writes; older results are dropped
  /// whenever they arrive.
  pub async fn resync_identities(&self) -> Result<()> {
    let subject_id = self.subject_id().ok_or(Error::EmptySubjectId)?;
    let ticket = self.lock().next_ticket();
    debug!(subject = %subject_id, ticket, "resyncing subject and viewer");

    let fetch = async {
      tokio::join!(
        self.source.fetch_profile(subject_id),
        self.source.fetch_viewer()
      )
    };
    let (profile, viewer) = tokio::select! {
      _ = self.cancel.cancelled() => return Err(Error::Cancelled),
      pair = fetch => pair,
    };
    let profile = profile.map_err(Error::from_source)?;
    let viewer = viewer.map_err(Error::from_source)?;

    // Teardown takes the same lock, so a resync can't refill the session
    // after it has been reset.
    let mut state = self.lock();
    if self.cancel.is_cancelled() {
      return Err(Error::Cancelled);
    }
    if !state.is_current(ticket) {
      debug!(subject = %subject_id, ticket, "resync superseded; discarding");
      return Ok(());
    }
    state.profile = Some(profile);
    self.session.replace(viewer);
    Ok(())
  }

  // ── Follow toggle ─────────────────────────────────────────────────────────

  /// Follow or unfollow the subject depending on the current snapshot, then
  /// resync. Failures are logged and otherwise swallowed.
  pub async fn toggle_follow(&self) -> ToggleOutcome {
    let Some(subject_id) = self.subject_id() else {
      debug!("follow toggle without a subject id; ignoring");
      return ToggleOutcome::Skipped;
    };
    let Some(_in_flight) = InFlight::acquire(&self.state) else {
      debug!(subject = %subject_id, "follow toggle already in flight");
      return ToggleOutcome::Busy;
    };

    let action = if self.is_following() {
      FollowAction::Unfollow
    } else {
      FollowAction::Follow
    };

    let command = async {
      match action {
        FollowAction::Follow => {
          self
            .mutator
            .follow(FollowRequest {
              following_id: subject_id.clone(),
            })
            .await
        }
        FollowAction::Unfollow => self.mutator.unfollow(subject_id).await,
      }
    };
    let result = tokio::select! {
      _ = self.cancel.cancelled() => return ToggleOutcome::Cancelled,
      result = command => result,
    };

    if let Err(e) = result {
      warn!(
        subject = %subject_id,
        action = action.label(),
        error = %e,
        "follow toggle failed"
      );
      return ToggleOutcome::Failed;
    }
    info!(subject = %subject_id, action = action.label(), "follow toggle committed");

    match self.resync_identities().await {
      Ok(()) => {}
      Err(Error::Cancelled) => return ToggleOutcome::Cancelled,
      Err(e) => warn!(subject = %subject_id, error = %e, "resync after toggle failed"),
    }
    ToggleOutcome::Committed(action)
  }

  // ── Edit session ──────────────────────────────────────────────────────────

  /// Closed → Open, only when the viewer is looking at their own profile.
  pub fn open_edit(&self) -> Result<()> {
    let subject_id = self.subject_id().ok_or(Error::EmptySubjectId)?;
    let viewer_id = self.session.current_id();
    let is_following = self.is_following();
    let affordance =
      Affordance::decide(subject_id, viewer_id.as_ref(), is_following);
    self.lock().edit.open(affordance)?;
    debug!(subject = %subject_id, "edit session opened");
    Ok(())
  }

  /// Resync, then Open → Closed.
  ///
  /// The session closes once both re-fetches have completed, whether or not
  /// they succeeded, so the modal never shows stale data while closing.
  pub async fn close_edit(&self) -> Result<()> {
    let subject_id = self.subject_id().ok_or(Error::EmptySubjectId)?;

    match self.resync_identities().await {
      Ok(()) => {}
      Err(Error::Cancelled) => return Err(Error::Cancelled),
      Err(e) => warn!(subject = %subject_id, error = %e, "resync on edit close failed"),
    }

    self.lock().edit.close();
    debug!(subject = %subject_id, "edit session closed");
    Ok(())
  }

  // ── Teardown ──────────────────────────────────────────────────────────────

  /// Leave the screen: cancel in-flight requests and forget the viewer.
  pub fn teardown(&self) {
    let mut state = self.lock();
    self.cancel.cancel();
    state.edit.close();
    self.session.reset();
    debug!(subject = ?self.subject_id, "profile screen torn down");
  }
}
