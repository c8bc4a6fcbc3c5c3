//! Collaborator traits consumed by the profile controller.
//!
//! The traits are implemented by transport adapters (e.g. the HTTP client in
//! `circle-cli`) and by the stub backend in [`crate::testing`]. The controller
//! depends on these abstractions, never on a concrete transport.

use std::future::Future;

use crate::user::{
  FollowRequest, ProfileSubject, ProfileUpdate, UserId, ViewerIdentity,
};

/// Read side: fetches fresh snapshots of user records.
///
/// All methods return `Send` futures so controller operations can be spawned
/// onto a multi-threaded tokio runtime.
pub trait ProfileSource: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Fetch the profile of `id` as seen by the current viewer.
  fn fetch_profile<'a>(
    &'a self,
    id: &'a UserId,
  ) -> impl Future<Output = Result<ProfileSubject, Self::Error>> + Send + 'a;

  /// Fetch the identity of whoever is logged in.
  fn fetch_viewer(
    &self,
  ) -> impl Future<Output = Result<ViewerIdentity, Self::Error>> + Send + '_;
}

/// Write side: follow and unfollow commands.
pub trait RelationshipMutator: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Start following `request.following_id`.
  fn follow(
    &self,
    request: FollowRequest,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Stop following `following_id`.
  fn unfollow<'a>(
    &'a self,
    following_id: &'a UserId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Persists edits the owner made to their own profile.
pub trait ProfileEditor: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn update_profile<'a>(
    &'a self,
    id: &'a UserId,
    update: ProfileUpdate,
  ) -> impl Future<Output = Result<ProfileSubject, Self::Error>> + Send + 'a;
}
