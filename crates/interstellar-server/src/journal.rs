//! Move journal - an append-only JSONL record of what happened in each game.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use interstellar_core::{GameId, MoveOutcome, MoveReport, PlayerId};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

/// One journal line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub game_id: GameId,
    pub player: Option<PlayerId>,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl GameEvent {
    pub fn game_created(game_id: &GameId, players: &[PlayerId]) -> Self {
        let names: Vec<&str> = players.iter().map(PlayerId::as_str).collect();
        Self {
            timestamp: Utc::now(),
            event_type: "game_created".to_string(),
            game_id: game_id.clone(),
            player: None,
            message: format!("Game created for {}", names.join(", ")),
            metadata: serde_json::json!({ "players": names }),
        }
    }

    pub fn from_move(game_id: &GameId, report: &MoveReport) -> Self {
        let order = &report.order;
        let (event_type, message) = match &report.outcome {
            MoveOutcome::Reinforced { stationed } | MoveOutcome::Claimed { stationed } => (
                "fleet_moved",
                format!(
                    "{} moved {} fleets from {} to {} ({} stationed)",
                    order.player, order.fleets, order.from, order.to, stationed
                ),
            ),
            MoveOutcome::Captured {
                defender,
                survivors,
                ..
            } => (
                "system_captured",
                format!(
                    "{} captured {} from {} with {} surviving fleets",
                    order.player, order.to, defender, survivors
                ),
            ),
            MoveOutcome::Repelled { defender, lost, .. } => (
                "attack_repelled",
                format!(
                    "{} repelled {} at {}; {} fleets lost",
                    defender, order.player, order.to, lost
                ),
            ),
        };

        Self {
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            game_id: game_id.clone(),
            player: Some(order.player.clone()),
            message,
            metadata: serde_json::to_value(report).unwrap_or_default(),
        }
    }

    pub fn turn_expired(game_id: &GameId, skipped: &PlayerId, next: &PlayerId) -> Self {
        Self {
            timestamp: Utc::now(),
            event_type: "turn_expired".to_string(),
            game_id: game_id.clone(),
            player: Some(skipped.clone()),
            message: format!("{skipped} ran out of time; {next} to move"),
            metadata: serde_json::Value::Null,
        }
    }
}

/// Append-only event log shared by every game in a data directory.
#[derive(Debug, Clone)]
pub struct MoveJournal {
    events_path: PathBuf,
}

impl MoveJournal {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            events_path: data_dir.join("events.jsonl"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.events_path
    }

    /// Append an event.
    pub async fn emit(&self, event: &GameEvent) -> Result<()> {
        if let Some(parent) = self.events_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.events_path)
            .await
            .with_context(|| format!("Failed to open {}", self.events_path.display()))?;

        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Last `limit` events, optionally for one game only. Unreadable lines are skipped.
    pub async fn read_recent(&self, game: Option<&GameId>, limit: usize) -> Vec<GameEvent> {
        let content = match tokio::fs::read_to_string(&self.events_path).await {
            Ok(c) => c,
            Err(_) => return Vec::new(),
        };

        let mut events: Vec<GameEvent> = content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .filter(|e: &GameEvent| game.map_or(true, |id| &e.game_id == id))
            .collect();

        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}
