//! Repositories - durable storage of game documents.

mod file;
mod memory;

use async_trait::async_trait;
use interstellar_core::{GameId, GameState};

use crate::error::RepositoryError;

pub use file::FileRepository;
pub use memory::InMemoryRepository;

/// A stored value together with its optimistic-concurrency version.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub version: u64,
    pub value: T,
}

/// Storage for game documents, keyed by game id.
///
/// Versions start at 1 on `create` and increase by one on every successful
/// `update`. An `update` whose expected version is stale fails with
/// [`RepositoryError::Conflict`] and stores nothing.
#[async_trait]
pub trait GameRepository: Send + Sync {
    /// Store a new game at version 1.
    async fn create(&self, game: &GameState) -> Result<(), RepositoryError>;

    /// Load a game, or `None` if the id is unknown.
    async fn read(&self, id: &GameId) -> Result<Option<Versioned<GameState>>, RepositoryError>;

    /// Replace a game if it is still at `expected_version`. Returns the new version.
    async fn update(&self, game: &GameState, expected_version: u64)
        -> Result<u64, RepositoryError>;

    /// Ids of every stored game.
    async fn list(&self) -> Result<Vec<GameId>, RepositoryError>;
}
