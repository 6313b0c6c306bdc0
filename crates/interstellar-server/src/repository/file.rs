use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use interstellar_core::{GameId, GameState};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{GameRepository, Versioned};
use crate::error::RepositoryError;

/// One pretty-printed JSON document per game, `<dir>/<game id>.json`.
///
/// Writes go to a temporary file that is then renamed over the document, so a
/// reader never sees a half-written game. The version check and the write
/// run under an exclusive advisory lock on `<dir>/<game id>.lock`, which
/// every repository instance and process opening the same directory honours.
#[derive(Debug)]
pub struct FileRepository {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

/// On-disk shape: the game document plus its version.
#[derive(Serialize, Deserialize)]
struct StoredGame {
    version: u64,
    #[serde(flatten)]
    game: GameState,
}

/// Files belonging to one game.
struct GameFiles {
    id: GameId,
    document: PathBuf,
    lock: PathBuf,
}

impl GameFiles {
    fn load(&self) -> Result<Option<StoredGame>, RepositoryError> {
        let content = match std::fs::read_to_string(&self.document) {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(RepositoryError::Io {
                    path: self.document.clone(),
                    source,
                })
            }
        };
        let stored = serde_json::from_str(&content).map_err(|source| RepositoryError::Decode {
            id: self.id.clone(),
            source,
        })?;
        Ok(Some(stored))
    }

    fn store(&self, game: &GameState, version: u64) -> Result<(), RepositoryError> {
        let tmp = self.document.with_extension("json.tmp");
        let doc = StoredGame {
            version,
            game: game.clone(),
        };
        let json = serde_json::to_string_pretty(&doc).map_err(|source| RepositoryError::Encode {
            id: self.id.clone(),
            source,
        })?;

        std::fs::write(&tmp, json).map_err(|source| RepositoryError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &self.document).map_err(|source| RepositoryError::Io {
            path: self.document.clone(),
            source,
        })
    }

    /// Run `f` while holding the game's exclusive file lock. Blocks until the
    /// lock is free; the OS drops it if the holder dies.
    fn locked<T>(
        &self,
        f: impl FnOnce() -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        let io_err = |source| RepositoryError::Io {
            path: self.lock.clone(),
            source,
        };
        let file = std::fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock)
            .map_err(io_err)?;
        let mut lock = fd_lock::RwLock::new(file);
        let _held = lock.write().map_err(io_err)?;
        f()
    }
}

/// Run blocking file work off the async executor.
async fn blocking<T, F>(f: F) -> Result<T, RepositoryError>
where
    F: FnOnce() -> Result<T, RepositoryError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(RepositoryError::Blocking)?
}

impl FileRepository {
    /// Open (creating if needed) a repository rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| RepositoryError::Io {
                path: dir.clone(),
                source,
            })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn files_for(&self, id: &GameId) -> Result<GameFiles, RepositoryError> {
        let raw = id.as_str();
        let safe = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(RepositoryError::InvalidId(id.clone()));
        }
        Ok(GameFiles {
            id: id.clone(),
            document: self.dir.join(format!("{raw}.json")),
            lock: self.dir.join(format!("{raw}.lock")),
        })
    }
}

#[async_trait]
impl GameRepository for FileRepository {
    async fn create(&self, game: &GameState) -> Result<(), RepositoryError> {
        let files = self.files_for(&game.id)?;
        let game = game.clone();

        let _guard = self.write_lock.lock().await;
        blocking(move || {
            files.locked(|| {
                if files.load()?.is_some() {
                    return Err(RepositoryError::AlreadyExists(files.id.clone()));
                }
                files.store(&game, 1)
            })
        })
        .await
    }

    async fn read(&self, id: &GameId) -> Result<Option<Versioned<GameState>>, RepositoryError> {
        let files = self.files_for(id)?;
        let stored = blocking(move || files.load()).await?;
        Ok(stored.map(|stored| Versioned {
            version: stored.version,
            value: stored.game,
        }))
    }

    async fn update(
        &self,
        game: &GameState,
        expected_version: u64,
    ) -> Result<u64, RepositoryError> {
        let files = self.files_for(&game.id)?;
        let game = game.clone();

        let _guard = self.write_lock.lock().await;
        blocking(move || {
            files.locked(|| {
                let current = files
                    .load()?
                    .ok_or_else(|| RepositoryError::NotFound(files.id.clone()))?;

                if current.version != expected_version {
                    return Err(RepositoryError::Conflict {
                        id: files.id.clone(),
                        expected: expected_version,
                        actual: current.version,
                    });
                }

                let next = expected_version + 1;
                files.store(&game, next)?;
                Ok(next)
            })
        })
        .await
    }

    async fn list(&self) -> Result<Vec<GameId>, RepositoryError> {
        let io_err = |source| RepositoryError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;

        let mut ids = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(GameId::from(stem));
            }
        }
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Utc};
    use interstellar_core::{generate_game, GalaxyConfig, GameRng};

    use super::*;

    fn game(id: &str) -> GameState {
        generate_game(
            GameId::from(id),
            &["A".to_string(), "B".to_string()],
            &GalaxyConfig::default(),
            &mut GameRng::seed_from_u64(4),
            DateTime::<Utc>::UNIX_EPOCH,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn documents_roundtrip_with_versions() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).await.unwrap();
        let mut g = game("game-1");

        repo.create(&g).await.unwrap();
        let loaded = repo.read(&g.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.value, g);

        g.current_turn = "B".into();
        assert_eq!(repo.update(&g, 1).await.unwrap(), 2);
        assert!(matches!(
            repo.update(&g, 1).await,
            Err(RepositoryError::Conflict { actual: 2, .. })
        ));

        let loaded = repo.read(&g.id).await.unwrap().unwrap();
        assert_eq!(loaded.version, 2);
        assert_eq!(loaded.value.current_turn.as_str(), "B");
        assert_eq!(repo.list().await.unwrap(), vec![GameId::from("game-1")]);
    }

    #[tokio::test]
    async fn document_uses_the_persisted_schema() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).await.unwrap();
        repo.create(&game("game-2")).await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join("game-2.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in [
            "id",
            "players",
            "map",
            "currentTurn",
            "timeLimit",
            "lastMoveTimestamp",
            "version",
        ] {
            assert!(doc.get(key).is_some(), "missing {key}");
        }
        assert!(doc["map"]["asteroids"].is_array());
    }

    #[tokio::test]
    async fn malformed_documents_fail_to_decode() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), r#"{"version": 1, "id": 3}"#).unwrap();

        assert!(matches!(
            repo.read(&GameId::from("broken")).await,
            Err(RepositoryError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn path_like_ids_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FileRepository::open(dir.path()).await.unwrap();
        assert!(matches!(
            repo.read(&GameId::from("../etc/passwd")).await,
            Err(RepositoryError::InvalidId(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn instances_sharing_a_directory_never_both_win_a_version() {
        let dir = tempfile::tempdir().unwrap();
        let first = Arc::new(FileRepository::open(dir.path()).await.unwrap());
        let second = Arc::new(FileRepository::open(dir.path()).await.unwrap());
        let g = game("shared");
        first.create(&g).await.unwrap();

        for round in 0..25u64 {
            let expected = round + 1;
            let racers = [Arc::clone(&first), Arc::clone(&second)].map(|repo| {
                let g = g.clone();
                tokio::spawn(async move { repo.update(&g, expected).await })
            });

            let mut wins = 0;
            for racer in racers {
                match racer.await.unwrap() {
                    Ok(version) => {
                        assert_eq!(version, expected + 1);
                        wins += 1;
                    }
                    Err(RepositoryError::Conflict { actual, .. }) => {
                        assert_eq!(actual, expected + 1)
                    }
                    Err(other) => panic!("unexpected error: {other}"),
                }
            }
            assert_eq!(wins, 1, "round {round}");
        }

        let stored = second.read(&g.id).await.unwrap().unwrap();
        assert_eq!(stored.version, 26);
        assert_eq!(first.list().await.unwrap(), vec![GameId::from("shared")]);
    }
}
