//! Error types for `circle-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("no profile subject id")]
  EmptySubjectId,

  #[error("profile belongs to someone else; only the owner can edit it")]
  NotOwnProfile,

  #[error("operation cancelled by screen teardown")]
  Cancelled,

  /// A collaborator failed. Display and `source()` forward to the inner
  /// error so a printed chain names each cause once.
  #[error(transparent)]
  Source(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Box a collaborator error into [`Error::Source`].
  pub fn from_source<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Source(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
