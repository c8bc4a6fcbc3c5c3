//! User records as the client sees them.
//!
//! Both records are point-in-time snapshots fetched from the server. They are
//! never patched locally; every change is observed by fetching them again.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Opaque server-assigned user id.
#[derive(
  Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize,
  Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Route parameters can arrive blank; such an id names nobody.
  pub fn is_empty(&self) -> bool { self.0.trim().is_empty() }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for UserId {
  fn from(s: &str) -> Self { Self::new(s) }
}

impl From<String> for UserId {
  fn from(s: String) -> Self { Self(s) }
}

// ─── Snapshots ───────────────────────────────────────────────────────────────

/// The user whose profile is on screen, as seen by the current viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSubject {
  pub id:            UserId,
  #[serde(default)]
  pub name:          Option<String>,
  /// Server-relative path of the avatar image.
  #[serde(default)]
  pub avatar_url:    Option<String>,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub location:      Option<String>,
  /// Raw date as sent by the server; see [`crate::format::format_date`].
  #[serde(default)]
  pub date_of_birth: Option<String>,
  #[serde(default)]
  pub bio:           Option<String>,
  #[serde(default)]
  pub followers:     Vec<UserId>,
  #[serde(default)]
  pub following:     Vec<UserId>,
  /// `true` iff the viewer followed this subject when it was fetched.
  #[serde(default)]
  pub is_following:  bool,
}

impl ProfileSubject {
  pub fn follower_count(&self) -> usize { self.followers.len() }

  pub fn following_count(&self) -> usize { self.following.len() }

  pub fn display_name(&self) -> &str {
    self.name.as_deref().unwrap_or(self.id.as_str())
  }

  /// Absolute avatar URL for a server at `base_url`.
  pub fn avatar_href(&self, base_url: &str) -> Option<String> {
    self
      .avatar_url
      .as_deref()
      .map(|path| format!("{}{}", base_url.trim_end_matches('/'), path))
  }
}

/// Whoever is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerIdentity {
  pub id:            UserId,
  #[serde(default)]
  pub name:          Option<String>,
  #[serde(default)]
  pub avatar_url:    Option<String>,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub location:      Option<String>,
  #[serde(default)]
  pub date_of_birth: Option<String>,
  #[serde(default)]
  pub bio:           Option<String>,
  #[serde(default)]
  pub followers:     Vec<UserId>,
  #[serde(default)]
  pub following:     Vec<UserId>,
}

impl ViewerIdentity {
  /// Whether the viewer's own following list contains `id`.
  pub fn follows(&self, id: &UserId) -> bool { self.following.contains(id) }
}

// ─── Commands ────────────────────────────────────────────────────────────────

/// Body of a follow command: `{"followingId": "<id>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
  pub following_id: UserId,
}

/// Fields the owner may change from the edit form. `None` leaves a field as
/// it is on the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name:          Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:         Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub location:      Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub date_of_birth: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub bio:           Option<String>,
}

impl ProfileUpdate {
  /// Pre-fill an update with the subject's current values.
  pub fn from_subject(subject: &ProfileSubject) -> Self {
    Self {
      name:          subject.name.clone(),
      email:         subject.email.clone(),
      location:      subject.location.clone(),
      date_of_birth: subject.date_of_birth.clone(),
      bio:           subject.bio.clone(),
    }
  }

  pub fn is_empty(&self) -> bool { *self == Self::default() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn blank_ids_are_empty() {
    assert!(UserId::new("").is_empty());
    assert!(UserId::new("  ").is_empty());
    assert!(!UserId::new("u1").is_empty());
  }

  #[test]
  fn subject_deserialises_from_camel_case() {
    let raw = r#"{
      "id": "u1",
      "name": "Alice",
      "avatarUrl": "/uploads/a.png",
      "dateOfBirth": "1990-04-02T00:00:00.000Z",
      "followers": ["u2", "u3"],
      "following": [],
      "isFollowing": true
    }"#;
    let subject: ProfileSubject = serde_json::from_str(raw).unwrap();
    assert_eq!(subject.id, UserId::new("u1"));
    assert_eq!(subject.follower_count(), 2);
    assert_eq!(subject.following_count(), 0);
    assert!(subject.is_following);
    assert!(subject.bio.is_none());
    assert_eq!(
      subject.avatar_href("http://localhost:3000/").as_deref(),
      Some("http://localhost:3000/uploads/a.png")
    );
  }

  #[test]
  fn follow_request_wire_shape() {
    let body = FollowRequest {
      following_id: UserId::new("u1"),
    };
    assert_eq!(
      serde_json::to_value(&body).unwrap(),
      serde_json::json!({ "followingId": "u1" })
    );
  }

  #[test]
  fn update_skips_untouched_fields() {
    let update = ProfileUpdate {
      bio: Some("hi".into()),
      ..ProfileUpdate::default()
    };
    assert_eq!(
      serde_json::to_value(&update).unwrap(),
      serde_json::json!({ "bio": "hi" })
    );
  }
}
