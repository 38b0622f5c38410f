//! Rater identity — supplied by configuration or an external auth
//! collaborator, never negotiated here.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The current rater. Guests browse; only provider-backed raters may
/// submit ratings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rater {
  pub id:   Uuid,
  pub name: Option<String>,
  /// True for guest sessions with no linked sign-in provider.
  pub anonymous: bool,
}

/// Session state consumed by the UI: who is rating, and whether rating is
/// permitted at all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
  rater: Option<Rater>,
}

impl Session {
  pub fn new(rater: Option<Rater>) -> Self {
    Self { rater }
  }

  pub fn rater(&self) -> Option<&Rater> {
    self.rater.as_ref()
  }

  pub fn rater_id(&self) -> Option<Uuid> {
    self.rater.as_ref().map(|r| r.id)
  }

  /// Rating is permitted only for signed-in, non-anonymous raters. Absent
  /// auth disables the rating controls; it is never an error.
  pub fn can_rate(&self) -> bool {
    matches!(&self.rater, Some(r) if !r.anonymous)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn guest_and_anonymous_sessions_cannot_rate() {
    assert!(!Session::new(None).can_rate());

    let guest = Rater {
      id: Uuid::new_v4(),
      name: None,
      anonymous: true,
    };
    assert!(!Session::new(Some(guest)).can_rate());
  }

  #[test]
  fn provider_backed_rater_can_rate() {
    let rater = Rater {
      id: Uuid::new_v4(),
      name: Some("alice".into()),
      anonymous: false,
    };
    let session = Session::new(Some(rater));
    assert!(session.can_rate());
    assert!(session.rater_id().is_some());
  }
}
