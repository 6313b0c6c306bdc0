//! Game service: the public operations, each run as a read-validate-apply-write
//! cycle serialized per game.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use interstellar_core::{
    generate_game, ErrorKind, GameError, GameId, GameRandom, GameRng, GameState, MoveOrder,
    MoveReport, PlayerId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{RepositoryError, ServiceError};
use crate::journal::{GameEvent, MoveJournal};
use crate::repository::{GameRepository, Versioned};

type SharedRng = Box<dyn GameRandom + Send>;
type LockTable = Mutex<HashMap<GameId, Arc<AsyncMutex<()>>>>;

/// A claim on one game's entry in the lock table. The entry is removed when
/// its last claim is dropped, so the table only holds games in flight.
struct GameLock<'a> {
    table: &'a LockTable,
    id: GameId,
    mutex: Arc<AsyncMutex<()>>,
}

impl<'a> GameLock<'a> {
    fn claim(table: &'a LockTable, id: &GameId) -> Self {
        let mut locks = table.lock().unwrap_or_else(PoisonError::into_inner);
        // Two claims released at once can both miss the removal below.
        locks.retain(|_, mutex| Arc::strong_count(mutex) > 1);
        let mutex = Arc::clone(locks.entry(id.clone()).or_default());
        Self {
            table,
            id: id.clone(),
            mutex,
        }
    }
}

impl Drop for GameLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Held only by the table and this claim.
        if Arc::strong_count(&self.mutex) == 2 {
            locks.remove(&self.id);
        }
    }
}

/// A successful move and the game as stored afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveApplied {
    pub report: MoveReport,
    pub game: GameState,
    pub version: u64,
}

/// Wire shape of a move result: `{success: true, game}` or
/// `{success: false, reason}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<GameState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<MoveReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MoveResponse {
    pub fn accepted(applied: MoveApplied) -> Self {
        Self {
            success: true,
            game: Some(applied.game),
            report: Some(applied.report),
            reason: None,
            message: None,
        }
    }

    pub fn rejected(err: &ServiceError) -> Self {
        Self {
            success: false,
            game: None,
            report: None,
            reason: Some(err.kind()),
            message: Some(err.to_string()),
        }
    }
}

/// Owns a repository and runs every game operation against it.
///
/// Operations on the same game are serialized by an in-process lock, and
/// every write is a compare-and-swap on the stored version. Repositories
/// make that swap atomic for every writer sharing their storage, so another
/// service or process on the same store cannot land a stale write either.
/// Different games never contend.
pub struct GameService<R> {
    repo: R,
    config: ServerConfig,
    rng: Mutex<SharedRng>,
    locks: LockTable,
    journal: Option<MoveJournal>,
}

impl<R: GameRepository> GameService<R> {
    pub fn new(repo: R, config: ServerConfig) -> Self {
        let rng = match config.galaxy.seed {
            Some(seed) => GameRng::seed_from_u64(seed),
            None => GameRng::from_entropy(),
        };
        Self {
            repo,
            config,
            rng: Mutex::new(Box::new(rng)),
            locks: Mutex::new(HashMap::new()),
            journal: None,
        }
    }

    /// Replace the random source used for galaxy generation and combat.
    pub fn with_rng(mut self, rng: impl GameRandom + Send + 'static) -> Self {
        self.rng = Mutex::new(Box::new(rng));
        self
    }

    pub fn with_journal(mut self, journal: MoveJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn journal(&self) -> Option<&MoveJournal> {
        self.journal.as_ref()
    }

    /// Generate a galaxy for `player_names` and store it as a new game.
    pub async fn create_game(&self, player_names: &[String]) -> Result<GameId, ServiceError> {
        let id = GameId::generate();
        let game = {
            let mut rng = self.rng();
            generate_game(
                id.clone(),
                player_names,
                &self.config.galaxy,
                &mut **rng,
                Utc::now(),
            )?
        };

        self.repo.create(&game).await?;

        info!(
            game_id = %id,
            players = game.players.len(),
            systems = game.map.systems.len(),
            wormholes = game.map.wormholes.len(),
            "Game created"
        );
        let players: Vec<PlayerId> = game.players.iter().map(|p| p.id.clone()).collect();
        self.record(GameEvent::game_created(&id, &players)).await;

        Ok(id)
    }

    /// Read-only snapshot of a game.
    pub async fn get_game(&self, id: &GameId) -> Result<GameState, ServiceError> {
        Ok(self.load(id).await?.value)
    }

    pub async fn list_games(&self) -> Result<Vec<GameId>, ServiceError> {
        Ok(self.repo.list().await?)
    }

    /// Apply one move. Rule failures come back as [`ServiceError::Rule`] and
    /// leave the stored game untouched.
    pub async fn move_fleet(
        &self,
        id: &GameId,
        order: MoveOrder,
    ) -> Result<MoveApplied, ServiceError> {
        let now = Utc::now();
        let result = self
            .mutate(id, |game, rng| {
                game.apply_move(&order, rng, now).map(|report| (report, true))
            })
            .await;

        let (report, stored) = match result {
            Ok(applied) => applied,
            Err(err) => {
                debug!(
                    game_id = %id,
                    player = %order.player,
                    from = %order.from,
                    to = %order.to,
                    fleets = order.fleets,
                    reason = ?err.kind(),
                    "Move rejected"
                );
                return Err(err);
            }
        };

        info!(
            game_id = %id,
            player = %order.player,
            from = %order.from,
            to = %order.to,
            fleets = order.fleets,
            next_turn = %report.next_turn,
            version = stored.version,
            "Move applied"
        );
        self.record(GameEvent::from_move(id, &report)).await;

        Ok(MoveApplied {
            report,
            game: stored.value,
            version: stored.version,
        })
    }

    /// [`move_fleet`](Self::move_fleet) folded into the wire response.
    pub async fn submit_move(&self, id: &GameId, order: MoveOrder) -> MoveResponse {
        match self.move_fleet(id, order).await {
            Ok(applied) => MoveResponse::accepted(applied),
            Err(err) => MoveResponse::rejected(&err),
        }
    }

    /// Skip the current player if their time is up. Returns who was skipped.
    pub async fn expire_turn(
        &self,
        id: &GameId,
        now: DateTime<Utc>,
    ) -> Result<Option<PlayerId>, ServiceError> {
        let (skipped, stored) = self
            .mutate(id, |game, _| {
                let skipped = game.expire_turn(now);
                let changed = skipped.is_some();
                Ok((skipped, changed))
            })
            .await?;

        if let Some(skipped) = &skipped {
            let next = &stored.value.current_turn;
            info!(game_id = %id, skipped = %skipped, next_turn = %next, "Turn expired");
            self.record(GameEvent::turn_expired(id, skipped, next)).await;
        }

        Ok(skipped)
    }

    /// Journal entries, newest last. Empty when no journal is attached.
    pub async fn history(&self, game: Option<&GameId>, limit: usize) -> Vec<GameEvent> {
        match &self.journal {
            Some(journal) => journal.read_recent(game, limit).await,
            None => Vec::new(),
        }
    }

    /// Load a game and check its invariants.
    async fn load(&self, id: &GameId) -> Result<Versioned<GameState>, ServiceError> {
        let stored = self
            .repo
            .read(id)
            .await?
            .ok_or_else(|| ServiceError::GameNotFound(id.clone()))?;

        if stored.value.id != *id {
            return Err(ServiceError::CorruptState {
                id: id.clone(),
                reason: format!("document is for game {}", stored.value.id),
            });
        }
        stored
            .value
            .validate()
            .map_err(|violation| ServiceError::CorruptState {
                id: id.clone(),
                reason: violation.to_string(),
            })?;

        Ok(stored)
    }

    /// Run `apply` against the latest stored game and write the result back.
    ///
    /// `apply` returns its result and whether it changed the game; unchanged
    /// games are not written. A lost version race re-reads and re-applies,
    /// up to `max_move_retries` times.
    async fn mutate<T, F>(
        &self,
        id: &GameId,
        mut apply: F,
    ) -> Result<(T, Versioned<GameState>), ServiceError>
    where
        F: FnMut(&mut GameState, &mut (dyn GameRandom + Send)) -> Result<(T, bool), GameError>,
    {
        let claim = GameLock::claim(&self.locks, id);
        let _guard = claim.mutex.lock().await;

        let mut attempt = 0;
        loop {
            let Versioned {
                version,
                value: mut game,
            } = self.load(id).await?;

            let (outcome, changed) = {
                let mut rng = self.rng();
                apply(&mut game, &mut **rng)?
            };
            if !changed {
                return Ok((
                    outcome,
                    Versioned {
                        version,
                        value: game,
                    },
                ));
            }

            match self.repo.update(&game, version).await {
                Ok(new_version) => {
                    return Ok((
                        outcome,
                        Versioned {
                            version: new_version,
                            value: game,
                        },
                    ))
                }
                Err(RepositoryError::Conflict {
                    expected, actual, ..
                }) if attempt < self.config.max_move_retries => {
                    attempt += 1;
                    debug!(game_id = %id, expected, actual, attempt, "Version conflict, retrying");
                }
                Err(RepositoryError::Conflict { .. }) => {
                    warn!(
                        game_id = %id,
                        attempts = attempt + 1,
                        "Giving up after repeated version conflicts"
                    );
                    return Err(ServiceError::StorageConflict(id.clone()));
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn rng(&self) -> MutexGuard<'_, SharedRng> {
        self.rng.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn record(&self, event: GameEvent) {
        if let Some(journal) = &self.journal {
            if let Err(err) = journal.emit(&event).await {
                warn!(game_id = %event.game_id, error = %err, "Failed to write journal entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::future::join_all;

    use super::*;
    use crate::repository::InMemoryRepository;

    fn lock_entries<R>(service: &GameService<R>) -> usize {
        service.locks.lock().unwrap().len()
    }

    fn any_move() -> MoveOrder {
        MoveOrder::new("A", "system1", "system2", 1)
    }

    #[tokio::test]
    async fn lock_table_only_holds_games_in_flight() {
        let service = GameService::new(InMemoryRepository::new(), ServerConfig::default());

        for i in 0..200 {
            let err = service
                .move_fleet(&GameId::new(format!("bogus-{i}")), any_move())
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::GameNotFound);
        }
        assert_eq!(lock_entries(&service), 0);

        let bogus: Vec<GameId> = (0..50).map(|i| GameId::new(format!("bogus-{}", i % 5))).collect();
        let results = join_all(bogus.iter().map(|id| service.move_fleet(id, any_move()))).await;
        assert!(results.iter().all(Result::is_err));
        assert_eq!(lock_entries(&service), 0);

        let id = service
            .create_game(&["A".to_string(), "B".to_string()])
            .await
            .unwrap();
        assert_eq!(service.expire_turn(&id, Utc::now()).await.unwrap(), None);
        assert_eq!(lock_entries(&service), 0);
    }
}
