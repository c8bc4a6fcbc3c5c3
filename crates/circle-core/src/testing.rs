//! In-memory stand-in for the remote API, used by tests here and in
//! `circle-cli` (feature `testing`).
//!
//! The stub keeps a small follow graph as server truth and records every call
//! it receives, so tests can assert exactly which requests an operation made.

use std::{
  collections::BTreeMap,
  sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
};

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::{
  source::{ProfileEditor, ProfileSource, RelationshipMutator},
  user::{
    FollowRequest, ProfileSubject, ProfileUpdate, UserId, ViewerIdentity,
  },
};

// ─── Fixtures ────────────────────────────────────────────────────────────────

pub fn subject(id: &str, is_following: bool) -> ProfileSubject {
  ProfileSubject {
    id: UserId::new(id),
    name: Some(format!("User {id}")),
    avatar_url: Some(format!("/uploads/{id}.png")),
    email: Some(format!("{id}@example.com")),
    location: None,
    date_of_birth: None,
    bio: None,
    followers: Vec::new(),
    following: Vec::new(),
    is_following,
  }
}

pub fn viewer(id: &str) -> ViewerIdentity {
  ViewerIdentity {
    id:            UserId::new(id),
    name:          Some(format!("User {id}")),
    avatar_url:    None,
    email:         Some(format!("{id}@example.com")),
    location:      None,
    date_of_birth: None,
    bio:           None,
    followers:     Vec::new(),
    following:     Vec::new(),
  }
}

// ─── Calls ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
  FetchProfile(UserId),
  FetchViewer,
  Follow(FollowRequest),
  Unfollow(UserId),
  UpdateProfile(UserId),
}

#[derive(Debug, Error)]
pub enum StubError {
  #[error("injected failure in {0}")]
  Injected(&'static str),
  #[error("user not found: {0}")]
  NotFound(UserId),
  #[error("not logged in")]
  NoViewer,
}

// ─── Backend ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Inner {
  users:         BTreeMap<UserId, ViewerIdentity>,
  viewer_id:     Option<UserId>,
  calls:         Vec<Call>,
  fail_commands: bool,
  fail_profile:  bool,
  fail_viewer:   bool,
}

#[derive(Debug)]
struct Gates {
  hold_commands: AtomicBool,
  hold_fetches:  AtomicBool,
  commands:      Semaphore,
  fetches:       Semaphore,
}

impl Default for Gates {
  fn default() -> Self {
    Self {
      hold_commands: AtomicBool::new(false),
      hold_fetches:  AtomicBool::new(false),
      commands:      Semaphore::new(0),
      fetches:       Semaphore::new(0),
    }
  }
}

/// Cheap to clone; clones share the graph and the call log.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
  inner: Arc<Mutex<Inner>>,
  gates: Arc<Gates>,
}

impl StubBackend {
  pub fn new() -> Self { Self::default() }

  /// Add (or replace) a user in the server-side graph.
  pub fn with_user(self, user: ViewerIdentity) -> Self {
    self.lock().users.insert(user.id.clone(), user);
    self
  }

  /// Make `id` the logged-in viewer. The user must have been added.
  pub fn logged_in_as(self, id: &str) -> Self {
    self.lock().viewer_id = Some(UserId::new(id));
    self
  }

  /// Park follow/unfollow until [`StubBackend::release_commands`].
  pub fn hold_commands(&self, hold: bool) {
    self.gates.hold_commands.store(hold, Ordering::SeqCst);
  }

  /// Park profile and viewer fetches until [`StubBackend::release_fetches`].
  pub fn hold_fetches(&self, hold: bool) {
    self.gates.hold_fetches.store(hold, Ordering::SeqCst);
  }

  pub fn release_commands(&self, n: usize) { self.gates.commands.add_permits(n); }

  pub fn release_fetches(&self, n: usize) { self.gates.fetches.add_permits(n); }

  pub fn fail_commands(&self, fail: bool) { self.lock().fail_commands = fail; }

  pub fn fail_profile_fetch(&self, fail: bool) {
    self.lock().fail_profile = fail;
  }

  pub fn fail_viewer_fetch(&self, fail: bool) { self.lock().fail_viewer = fail; }

  /// Everything received so far, in arrival order.
  pub fn calls(&self) -> Vec<Call> { self.lock().calls.clone() }

  pub fn clear_calls(&self) { self.lock().calls.clear(); }

  pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
    self.lock().calls.iter().filter(|c| pred(c)).count()
  }

  /// Server truth for `id`, if present.
  pub fn user(&self, id: &str) -> Option<ViewerIdentity> {
    self.lock().users.get(&UserId::new(id)).cloned()
  }

  /// Change a user server-side without going through the client, as another
  /// device would.
  pub fn edit_user(&self, id: &str, edit: impl FnOnce(&mut ViewerIdentity)) {
    if let Some(user) = self.lock().users.get_mut(&UserId::new(id)) {
      edit(user);
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn record(&self, call: Call) { self.lock().calls.push(call); }

  async fn gate_command(&self) {
    if self.gates.hold_commands.load(Ordering::SeqCst) {
      if let Ok(permit) = self.gates.commands.acquire().await {
        permit.forget();
      }
    }
  }

  async fn gate_fetch(&self) {
    if self.gates.hold_fetches.load(Ordering::SeqCst) {
      if let Ok(permit) = self.gates.fetches.acquire().await {
        permit.forget();
      }
    }
  }

  fn set_edge(&self, to: &UserId, follow: bool) -> Result<(), StubError> {
    let mut inner = self.lock();
    let from = inner.viewer_id.clone().ok_or(StubError::NoViewer)?;
    if !inner.users.contains_key(to) {
      return Err(StubError::NotFound(to.clone()));
    }
    if let Some(me) = inner.users.get_mut(&from) {
      me.following.retain(|id| id != to);
      if follow {
        me.following.push(to.clone());
      }
    }
    if let Some(them) = inner.users.get_mut(to) {
      them.followers.retain(|id| *id != from);
      if follow {
        them.followers.push(from.clone());
      }
    }
    Ok(())
  }
}

// ─── Trait impls ─────────────────────────────────────────────────────────────

impl ProfileSource for StubBackend {
  type Error = StubError;

  async fn fetch_profile(
    &self,
    id: &UserId,
  ) -> Result<ProfileSubject, StubError> {
    self.record(Call::FetchProfile(id.clone()));
    self.gate_fetch().await;

    let inner = self.lock();
    if inner.fail_profile {
      return Err(StubError::Injected("fetch_profile"));
    }
    let user = inner
      .users
      .get(id)
      .ok_or_else(|| StubError::NotFound(id.clone()))?;
    let is_following = inner
      .viewer_id
      .as_ref()
      .and_then(|v| inner.users.get(v))
      .is_some_and(|v| v.follows(id));

    Ok(ProfileSubject {
      id: user.id.clone(),
      name: user.name.clone(),
      avatar_url: user.avatar_url.clone(),
      email: user.email.clone(),
      location: user.location.clone(),
      date_of_birth: user.date_of_birth.clone(),
      bio: user.bio.clone(),
      followers: user.followers.clone(),
      following: user.following.clone(),
      is_following,
    })
  }

  async fn fetch_viewer(&self) -> Result<ViewerIdentity, StubError> {
    self.record(Call::FetchViewer);
    self.gate_fetch().await;

    let inner = self.lock();
    if inner.fail_viewer {
      return Err(StubError::Injected("fetch_viewer"));
    }
    let id = inner.viewer_id.as_ref().ok_or(StubError::NoViewer)?;
    inner
      .users
      .get(id)
      .cloned()
      .ok_or_else(|| StubError::NotFound(id.clone()))
  }
}

impl RelationshipMutator for StubBackend {
  type Error = StubError;

  async fn follow(&self, request: FollowRequest) -> Result<(), StubError> {
    self.record(Call::Follow(request.clone()));
    self.gate_command().await;

    if self.lock().fail_commands {
      return Err(StubError::Injected("follow"));
    }
    self.set_edge(&request.following_id, true)
  }

  async fn unfollow(&self, following_id: &UserId) -> Result<(), StubError> {
    self.record(Call::Unfollow(following_id.clone()));
    self.gate_command().await;

    if self.lock().fail_commands {
      return Err(StubError::Injected("unfollow"));
    }
    self.set_edge(following_id, false)
  }
}

impl ProfileEditor for StubBackend {
  type Error = StubError;

  async fn update_profile(
    &self,
    id: &UserId,
    update: ProfileUpdate,
  ) -> Result<ProfileSubject, StubError> {
    self.record(Call::UpdateProfile(id.clone()));
    {
      let mut inner = self.lock();
      if inner.fail_commands {
        return Err(StubError::Injected("update_profile"));
      }
      let user = inner
        .users
        .get_mut(id)
        .ok_or_else(|| StubError::NotFound(id.clone()))?;
      if let Some(v) = update.name {
        user.name = Some(v);
      }
      if let Some(v) = update.email {
        user.email = Some(v);
      }
      if let Some(v) = update.location {
        user.location = Some(v);
      }
      if let Some(v) = update.date_of_birth {
        user.date_of_birth = Some(v);
      }
      if let Some(v) = update.bio {
        user.bio = Some(v);
      }
    }
    self.fetch_profile(id).await
  }
}
