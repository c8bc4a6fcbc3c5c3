//! Controller tests against the in-memory stub backend.

use std::sync::{
  Arc,
  atomic::{AtomicBool, Ordering},
};

use tokio::sync::Notify;

use crate::{
  Error,
  affordance::{Affordance, FollowAction},
  controller::{ProfileController, ToggleOutcome},
  edit::EditSession,
  session::ViewerSession,
  source::ProfileSource,
  testing::{Call, StubBackend, StubError, viewer},
  user::{FollowRequest, ProfileSubject, UserId, ViewerIdentity},
};

type Controller = ProfileController<StubBackend, StubBackend>;

/// Graph with two users, `u1` (subject) and `u2`, logged in as `as_id`.
fn backend(as_id: &str) -> StubBackend {
  StubBackend::new()
    .with_user(viewer("u1"))
    .with_user(viewer("u2"))
    .logged_in_as(as_id)
}

fn controller(
  backend: &StubBackend,
  subject: Option<&str>,
  session: &ViewerSession,
) -> Controller {
  let shared = Arc::new(backend.clone());
  ProfileController::new(
    subject.map(UserId::new),
    Arc::clone(&shared),
    shared,
    session.clone(),
  )
}

async fn mounted(
  backend: &StubBackend,
  subject: &str,
  session: &ViewerSession,
) -> Controller {
  let c = controller(backend, Some(subject), session);
  c.load().await.expect("initial load");
  backend.clear_calls();
  c
}

fn fetches(backend: &StubBackend) -> (usize, usize) {
  (
    backend.count(|c| matches!(c, Call::FetchProfile(_))),
    backend.count(|c| matches!(c, Call::FetchViewer)),
  )
}

/// Let spawned tasks run until the backend has seen `n` calls.
async fn until_calls(backend: &StubBackend, n: usize) {
  while backend.calls().len() < n {
    tokio::task::yield_now().await;
  }
}

// ─── Rendering ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn renders_nothing_before_load() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = controller(&b, Some("u1"), &session);
  assert!(c.view().is_none());
  assert!(b.calls().is_empty());
}

#[tokio::test]
async fn load_fetches_viewer_only_when_session_is_empty() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = controller(&b, Some("u1"), &session);
  c.load().await.unwrap();
  assert_eq!(fetches(&b), (1, 1));
  assert_eq!(session.current_id(), Some(UserId::new("u2")));

  b.clear_calls();
  let again = controller(&b, Some("u1"), &session);
  again.load().await.unwrap();
  assert_eq!(fetches(&b), (1, 0));
}

#[tokio::test]
async fn own_profile_offers_edit_not_follow() {
  let b = backend("u1");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;

  let view = c.view().expect("loaded");
  assert_eq!(view.affordance, Affordance::SelfView);
  assert_eq!(view.affordance.follow_action(), None);

  c.open_edit().unwrap();
  assert_eq!(c.edit_session(), EditSession::Open);
  assert!(c.view().unwrap().edit_open);
}

#[tokio::test]
async fn other_profile_offers_follow_labelled_by_state() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;

  let view = c.view().unwrap();
  assert_eq!(view.affordance, Affordance::OtherView {
    is_following: false,
  });
  assert_eq!(view.affordance.follow_action(), Some(FollowAction::Follow));
  assert!(matches!(c.open_edit(), Err(Error::NotOwnProfile)));
  assert_eq!(c.edit_session(), EditSession::Closed);
}

// ─── Follow toggle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn follow_then_resync_both_snapshots() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;

  let outcome = c.toggle_follow().await;
  assert_eq!(outcome, ToggleOutcome::Committed(FollowAction::Follow));

  assert_eq!(b.calls()[0], Call::Follow(FollowRequest {
    following_id: UserId::new("u1"),
  }));
  assert_eq!(fetches(&b), (1, 1));

  let view = c.view().unwrap();
  assert!(view.subject.is_following);
  assert_eq!(view.subject.follower_count(), 1);
  assert_eq!(view.affordance.follow_action(), Some(FollowAction::Unfollow));
  assert!(session.current().unwrap().follows(&UserId::new("u1")));
}

#[tokio::test]
async fn unfollow_when_already_following() {
  let b = backend("u2");
  b.edit_user("u2", |u| u.following.push(UserId::new("u1")));
  b.edit_user("u1", |u| u.followers.push(UserId::new("u2")));
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  assert!(c.view().unwrap().subject.is_following);

  let outcome = c.toggle_follow().await;
  assert_eq!(outcome, ToggleOutcome::Committed(FollowAction::Unfollow));
  assert_eq!(b.calls()[0], Call::Unfollow(UserId::new("u1")));
  assert_eq!(fetches(&b), (1, 1));

  let view = c.view().unwrap();
  assert!(!view.subject.is_following);
  assert_eq!(view.subject.follower_count(), 0);
  assert!(session.current().unwrap().following.is_empty());
}

#[tokio::test]
async fn failed_command_is_swallowed_without_resync() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  let before = c.view().unwrap();

  b.fail_commands(true);
  assert_eq!(c.toggle_follow().await, ToggleOutcome::Failed);

  assert_eq!(b.calls().len(), 1);
  assert_eq!(fetches(&b), (0, 0));
  assert_eq!(c.view().unwrap(), before);
  assert!(!c.is_toggling());
}

#[tokio::test]
async fn missing_subject_id_sends_nothing() {
  let b = backend("u2");
  let session = ViewerSession::new();
  for subject in [None, Some(""), Some("   ")] {
    let c = controller(&b, subject, &session);
    assert_eq!(c.toggle_follow().await, ToggleOutcome::Skipped);
    assert!(matches!(
      c.resync_identities().await,
      Err(Error::EmptySubjectId)
    ));
    assert!(matches!(c.close_edit().await, Err(Error::EmptySubjectId)));
  }
  assert!(b.calls().is_empty());
}

#[tokio::test]
async fn second_toggle_while_in_flight_is_rejected() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;

  b.hold_commands(true);
  let first = tokio::spawn({
    let c = c.clone();
    async move { c.toggle_follow().await }
  });
  until_calls(&b, 1).await;

  assert!(c.is_toggling());
  assert!(c.view().unwrap().toggle_busy);
  assert_eq!(c.toggle_follow().await, ToggleOutcome::Busy);
  // Nothing is re-fetched until the command has finished.
  assert_eq!(fetches(&b), (0, 0));

  b.release_commands(1);
  assert_eq!(
    first.await.unwrap(),
    ToggleOutcome::Committed(FollowAction::Follow)
  );
  assert!(!c.is_toggling());
  assert_eq!(b.count(|c| matches!(c, Call::Follow(_))), 1);
}

#[tokio::test]
async fn held_command_that_fails_never_refetches() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;

  b.hold_commands(true);
  b.fail_commands(true);
  let toggle = tokio::spawn({
    let c = c.clone();
    async move { c.toggle_follow().await }
  });
  until_calls(&b, 1).await;
  assert_eq!(fetches(&b), (0, 0));

  b.release_commands(1);
  assert_eq!(toggle.await.unwrap(), ToggleOutcome::Failed);
  assert_eq!(fetches(&b), (0, 0));
  assert!(!c.is_toggling());
}

#[tokio::test]
async fn resync_failure_leaves_both_snapshots_untouched() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  let before = c.view().unwrap();
  let viewer_before = session.current();

  b.fail_viewer_fetch(true);
  assert_eq!(
    c.toggle_follow().await,
    ToggleOutcome::Committed(FollowAction::Follow)
  );
  assert_eq!(fetches(&b), (1, 1));

  assert_eq!(c.view().unwrap().subject, before.subject);
  assert_eq!(session.current(), viewer_before);
}

/// Reads the subject from `inner`, then, once armed, parks the first
/// `fetch_profile` until `release` is notified. The parked call returns what
/// the server said when it was issued.
#[derive(Clone)]
struct ParkFirstProfile {
  inner:   StubBackend,
  armed:   Arc<AtomicBool>,
  release: Arc<Notify>,
}

impl ProfileSource for ParkFirstProfile {
  type Error = StubError;

  async fn fetch_profile(
    &self,
    id: &UserId,
  ) -> Result<ProfileSubject, StubError> {
    let snapshot = self.inner.fetch_profile(id).await;
    if self.armed.swap(false, Ordering::SeqCst) {
      self.release.notified().await;
    }
    snapshot
  }

  async fn fetch_viewer(&self) -> Result<ViewerIdentity, StubError> {
    self.inner.fetch_viewer().await
  }
}

#[tokio::test]
async fn older_resync_finishing_last_is_discarded() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let source = ParkFirstProfile {
    inner:   b.clone(),
    armed:   Arc::default(),
    release: Arc::default(),
  };
  let c = ProfileController::new(
    Some(UserId::new("u1")),
    Arc::new(source.clone()),
    Arc::new(b.clone()),
    session.clone(),
  );
  c.load().await.unwrap();
  b.clear_calls();

  source.armed.store(true, Ordering::SeqCst);
  let older = tokio::spawn({
    let c = c.clone();
    async move { c.resync_identities().await }
  });
  until_calls(&b, 2).await;

  // The follow lands server-side while the first resync is still parked.
  b.edit_user("u2", |u| u.following.push(UserId::new("u1")));
  b.edit_user("u1", |u| u.followers.push(UserId::new("u2")));
  c.resync_identities().await.unwrap();
  assert!(c.view().unwrap().subject.is_following);

  source.release.notify_one();
  older.await.unwrap().unwrap();

  let view = c.view().unwrap();
  assert!(view.subject.is_following);
  assert_eq!(view.subject.follower_count(), 1);
  assert!(session.current().unwrap().follows(&UserId::new("u1")));
}

// ─── Edit session ────────────────────────────────────────────────────────────

#[tokio::test]
async fn closing_edit_resyncs_before_closing() {
  let b = backend("u1");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  c.open_edit().unwrap();

  b.edit_user("u1", |u| u.bio = Some("new bio".into()));
  b.hold_fetches(true);
  let closing = tokio::spawn({
    let c = c.clone();
    async move { c.close_edit().await }
  });
  until_calls(&b, 2).await;

  // Both re-fetches issued, neither complete: still open.
  assert_eq!(fetches(&b), (1, 1));
  assert_eq!(c.edit_session(), EditSession::Open);

  b.release_fetches(2);
  closing.await.unwrap().unwrap();

  assert_eq!(c.edit_session(), EditSession::Closed);
  assert_eq!(c.view().unwrap().subject.bio.as_deref(), Some("new bio"));
}

#[tokio::test]
async fn closing_edit_still_closes_when_resync_fails() {
  let b = backend("u1");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  c.open_edit().unwrap();

  b.fail_profile_fetch(true);
  c.close_edit().await.unwrap();
  assert_eq!(fetches(&b), (1, 1));
  assert_eq!(c.edit_session(), EditSession::Closed);
}

// ─── Teardown ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn teardown_resets_viewer() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  assert!(!session.is_empty());

  c.teardown();
  assert!(session.is_empty());
  assert!(c.is_torn_down());

  // The next screen starts without a viewer and fetches one.
  let next = controller(&b, Some("u2"), &session);
  next.load().await.unwrap();
  assert_eq!(fetches(&b), (1, 1));
}

#[tokio::test]
async fn teardown_discards_in_flight_resync() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = mounted(&b, "u1", &session).await;
  let before = c.view().unwrap();

  b.hold_fetches(true);
  let toggle = tokio::spawn({
    let c = c.clone();
    async move { c.toggle_follow().await }
  });
  // follow + both re-fetches
  until_calls(&b, 3).await;

  c.teardown();
  assert_eq!(toggle.await.unwrap(), ToggleOutcome::Cancelled);

  assert!(session.is_empty());
  assert_eq!(c.view().unwrap().subject, before.subject);
}

#[tokio::test]
async fn load_after_teardown_is_cancelled() {
  let b = backend("u2");
  let session = ViewerSession::new();
  let c = controller(&b, Some("u1"), &session);
  c.teardown();
  assert!(matches!(c.load().await, Err(Error::Cancelled)));
  assert!(c.view().is_none());
  assert!(session.is_empty());
}
