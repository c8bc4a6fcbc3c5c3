//! What the viewer can do on a profile: edit it or (un)follow its owner.

use crate::user::{ProfileSubject, UserId};

/// The action offered on someone else's profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowAction {
  Follow,
  Unfollow,
}

impl FollowAction {
  pub fn label(self) -> &'static str {
    match self {
      Self::Follow => "Follow",
      Self::Unfollow => "Unfollow",
    }
  }

  /// Single-glyph icon drawn next to the label.
  pub fn icon(self) -> &'static str {
    match self {
      Self::Follow => "+",
      Self::Unfollow => "-",
    }
  }
}

/// Decided once per render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affordance {
  /// The viewer is looking at their own profile.
  SelfView,
  /// Someone else's profile.
  OtherView { is_following: bool },
}

impl Affordance {
  /// Compare the route's subject id with the viewer's id.
  ///
  /// With no viewer loaded the profile is treated as someone else's.
  pub fn decide(
    subject_id: &UserId,
    viewer_id: Option<&UserId>,
    is_following: bool,
  ) -> Self {
    if viewer_id == Some(subject_id) {
      Self::SelfView
    } else {
      Self::OtherView { is_following }
    }
  }

  pub fn for_subject(
    subject_id: &UserId,
    viewer_id: Option<&UserId>,
    subject: &ProfileSubject,
  ) -> Self {
    Self::decide(subject_id, viewer_id, subject.is_following)
  }

  pub fn can_edit(self) -> bool { matches!(self, Self::SelfView) }

  /// The follow button's action, or `None` on one's own profile.
  pub fn follow_action(self) -> Option<FollowAction> {
    match self {
      Self::SelfView => None,
      Self::OtherView { is_following: true } => Some(FollowAction::Unfollow),
      Self::OtherView {
        is_following: false,
      } => Some(FollowAction::Follow),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testing::subject;

  #[test]
  fn own_profile_offers_edit_only() {
    let s = subject("u1", false);
    let id = UserId::new("u1");
    let a = Affordance::for_subject(&id, Some(&id), &s);
    assert_eq!(a, Affordance::SelfView);
    assert!(a.can_edit());
    assert_eq!(a.follow_action(), None);
  }

  #[test]
  fn other_profile_label_tracks_is_following() {
    let viewer = UserId::new("u2");
    let id = UserId::new("u1");

    let a = Affordance::for_subject(&id, Some(&viewer), &subject("u1", false));
    assert!(!a.can_edit());
    assert_eq!(a.follow_action(), Some(FollowAction::Follow));
    assert_eq!(FollowAction::Follow.label(), "Follow");

    let a = Affordance::for_subject(&id, Some(&viewer), &subject("u1", true));
    assert_eq!(a.follow_action(), Some(FollowAction::Unfollow));
    assert_eq!(FollowAction::Unfollow.label(), "Unfollow");
  }

  #[test]
  fn missing_viewer_is_treated_as_other() {
    let id = UserId::new("u1");
    let a = Affordance::decide(&id, None, false);
    assert_eq!(a, Affordance::OtherView {
      is_following: false,
    });
  }
}
