// Copyright 2025 Kore Ledger, SL
// SPDX-License-Identifier: Apache-2.0

//! # Engine errors
//!
//! Every failure the engine returns is an [`Error`] tagged with an [`ErrorKind`]. Callers
//! branch on [`Error::category`] and never on the message text.
//!

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use std::{error::Error as StdError, fmt, sync::Arc};

/// What went wrong.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    InvalidInput,
    Unauthorized,
    InsufficientKarma,
    Database,
    /// A dependency actor did not answer in time or is gone. The operation was not applied.
    ActorTimeout,
}

/// Coarse class of a failure, stable for callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum Category {
    NotFound,
    Conflict,
    BadInput,
    Unauthorized,
    Threshold,
    Transient,
}

impl ErrorKind {
    pub fn category(&self) -> Category {
        match self {
            ErrorKind::NotFound => Category::NotFound,
            ErrorKind::Duplicate => Category::Conflict,
            ErrorKind::InvalidInput => Category::BadInput,
            ErrorKind::Unauthorized => Category::Unauthorized,
            ErrorKind::InsufficientKarma => Category::Threshold,
            ErrorKind::Database | ErrorKind::ActorTimeout => {
                Category::Transient
            }
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Duplicate => "duplicate",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::InsufficientKarma => "insufficient karma",
            ErrorKind::Database => "database",
            ErrorKind::ActorTimeout => "actor timeout",
        };
        f.write_str(name)
    }
}

/// Engine error.
#[derive(Debug, Clone, ThisError)]
#[error("{kind}: {message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    #[source]
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    /// Attaches the underlying failure.
    pub fn with_cause<E>(mut self, cause: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.cause = Some(Arc::new(cause));
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Duplicate, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn insufficient_karma(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientKarma, message)
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn category(&self) -> Category {
        self.kind.category()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<store::Error> for Error {
    fn from(error: store::Error) -> Self {
        let kind = match &error {
            store::Error::EntryNotFound(_) => ErrorKind::NotFound,
            store::Error::Duplicate(_) => ErrorKind::Duplicate,
            _ => ErrorKind::Database,
        };
        Error::new(kind, error.to_string()).with_cause(error)
    }
}

impl From<actor::Error> for Error {
    fn from(error: actor::Error) -> Self {
        Error::new(ErrorKind::ActorTimeout, error.to_string()).with_cause(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actor::ActorPath;

    use std::time::Duration;

    #[test]
    fn test_store_errors_are_classified() {
        let error: Error = store::Error::EntryNotFound("posts/1".to_owned()).into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.category(), Category::NotFound);

        let error: Error = store::Error::Duplicate("name".to_owned()).into();
        assert_eq!(error.category(), Category::Conflict);

        let error: Error = store::Error::Store("disk full".to_owned()).into();
        assert_eq!(error.kind(), ErrorKind::Database);
        assert_eq!(error.category(), Category::Transient);
        assert!(error.source().is_some());
    }

    #[test]
    fn test_actor_errors_are_timeouts() {
        let error: Error = actor::Error::Timeout(
            ActorPath::from("/user/posts"),
            Duration::from_secs(5),
        )
        .into();
        assert_eq!(error.kind(), ErrorKind::ActorTimeout);
        assert_eq!(error.category(), Category::Transient);

        let error: Error = actor::Error::Send("closed".to_owned()).into();
        assert_eq!(error.kind(), ErrorKind::ActorTimeout);
    }

    #[test]
    fn test_categories_are_deterministic() {
        assert_eq!(ErrorKind::InvalidInput.category(), Category::BadInput);
        assert_eq!(ErrorKind::Unauthorized.category(), Category::Unauthorized);
        assert_eq!(
            ErrorKind::InsufficientKarma.category(),
            Category::Threshold
        );
        let error = Error::insufficient_karma("karma 20 is below 100");
        assert_eq!(error.to_string(), "insufficient karma: karma 20 is below 100");
    }
}
