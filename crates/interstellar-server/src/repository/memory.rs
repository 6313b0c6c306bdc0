use std::collections::HashMap;

use async_trait::async_trait;
use interstellar_core::{GameId, GameState};
use tokio::sync::RwLock;

use super::{GameRepository, Versioned};
use crate::error::RepositoryError;

/// Process-local repository. Useful for tests and single-process servers.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    games: RwLock<HashMap<GameId, Versioned<GameState>>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameRepository for InMemoryRepository {
    async fn create(&self, game: &GameState) -> Result<(), RepositoryError> {
        let mut games = self.games.write().await;
        if games.contains_key(&game.id) {
            return Err(RepositoryError::AlreadyExists(game.id.clone()));
        }
        games.insert(
            game.id.clone(),
            Versioned {
                version: 1,
                value: game.clone(),
            },
        );
        Ok(())
    }

    async fn read(&self, id: &GameId) -> Result<Option<Versioned<GameState>>, RepositoryError> {
        Ok(self.games.read().await.get(id).cloned())
    }

    async fn update(
        &self,
        game: &GameState,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let mut games = self.games.write().await;
        let stored = games
            .get_mut(&game.id)
            .ok_or_else(|| RepositoryError::NotFound(game.id.clone()))?;

        if stored.version != expected_version {
            return Err(RepositoryError::Conflict {
                id: game.id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }

        stored.version += 1;
        stored.value = game.clone();
        Ok(stored.version)
    }

    async fn list(&self) -> Result<Vec<GameId>, RepositoryError> {
        let mut ids: Vec<GameId> = self.games.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use interstellar_core::{generate_game, GalaxyConfig, GameRng};

    use super::*;

    fn game(id: &str) -> GameState {
        generate_game(
            GameId::from(id),
            &["A".to_string(), "B".to_string()],
            &GalaxyConfig::default(),
            &mut GameRng::seed_from_u64(1),
            DateTime::<Utc>::UNIX_EPOCH,
        )
        .unwrap()
    }

    #[test]
    fn versions_advance_and_stale_writes_conflict() {
        tokio_test::block_on(async {
            let repo = InMemoryRepository::new();
            let mut g = game("g1");
            repo.create(&g).await.unwrap();
            assert!(matches!(
                repo.create(&g).await,
                Err(RepositoryError::AlreadyExists(_))
            ));

            g.time_limit = 48;
            assert_eq!(repo.update(&g, 1).await.unwrap(), 2);

            g.time_limit = 72;
            assert!(matches!(
                repo.update(&g, 1).await,
                Err(RepositoryError::Conflict {
                    expected: 1,
                    actual: 2,
                    ..
                })
            ));

            let stored = repo.read(&g.id).await.unwrap().unwrap();
            assert_eq!(stored.version, 2);
            assert_eq!(stored.value.time_limit, 48);
        });
    }

    #[test]
    fn unknown_games_read_as_none() {
        tokio_test::block_on(async {
            let repo = InMemoryRepository::new();
            assert_eq!(repo.read(&GameId::from("missing")).await.unwrap(), None);
            assert!(matches!(
                repo.update(&game("missing"), 1).await,
                Err(RepositoryError::NotFound(_))
            ));
            assert!(repo.list().await.unwrap().is_empty());
        });
    }
}
