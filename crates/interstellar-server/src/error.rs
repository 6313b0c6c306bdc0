//! Service and storage errors.

use std::path::PathBuf;

use interstellar_core::{ErrorKind, GameError, GameId};

/// Failure inside a [`GameRepository`](crate::repository::GameRepository).
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("game {0} already exists")]
    AlreadyExists(GameId),
    #[error("game {0} not found")]
    NotFound(GameId),
    #[error("game {id} is at version {actual}, expected {expected}")]
    Conflict {
        id: GameId,
        expected: u64,
        actual: u64,
    },
    #[error("game id {0:?} cannot be used as a storage key")]
    InvalidId(GameId),
    #[error("failed to decode game {id}")]
    Decode {
        id: GameId,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode game {id}")]
    Encode {
        id: GameId,
        #[source]
        source: serde_json::Error,
    },
    #[error("storage task failed")]
    Blocking(#[source] tokio::task::JoinError),
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything a caller of [`GameService`](crate::GameService) can get back.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Rule(#[from] GameError),
    #[error("game {0} not found")]
    GameNotFound(GameId),
    #[error("game {0} was modified concurrently; retry the move")]
    StorageConflict(GameId),
    #[error("stored game {id} is corrupt: {reason}")]
    CorruptState { id: GameId, reason: String },
    #[error("storage failure")]
    Storage(#[source] RepositoryError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Rule(e) => e.kind(),
            Self::GameNotFound(_) => ErrorKind::GameNotFound,
            Self::StorageConflict(_) => ErrorKind::StorageConflict,
            Self::CorruptState { .. } => ErrorKind::CorruptState,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => Self::GameNotFound(id),
            RepositoryError::Conflict { id, .. } => Self::StorageConflict(id),
            RepositoryError::Decode { id, source } => Self::CorruptState {
                id,
                reason: source.to_string(),
            },
            other => Self::Storage(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_errors_map_to_kinds() {
        let id = GameId::from("g1");
        let conflict: ServiceError = RepositoryError::Conflict {
            id: id.clone(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert_eq!(conflict.kind(), ErrorKind::StorageConflict);

        let missing: ServiceError = RepositoryError::NotFound(id.clone()).into();
        assert_eq!(missing.kind(), ErrorKind::GameNotFound);

        let io: ServiceError = RepositoryError::Io {
            path: PathBuf::from("/nowhere"),
            source: std::io::Error::other("disk gone"),
        }
        .into();
        assert_eq!(io.kind(), ErrorKind::Storage);
    }
}
