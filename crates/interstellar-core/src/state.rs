//! The game aggregate and its invariants.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvariantViolation;
use crate::galaxy::GalaxyMap;
use crate::ids::{GameId, PlayerId, SystemId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Systems currently owned, including ones with no fleets stationed.
    pub systems: BTreeSet<SystemId>,
    /// Stationed fleets. Never holds a zero count.
    pub fleets: BTreeMap<SystemId, u32>,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: PlayerId::new(name.clone()),
            name,
            systems: BTreeSet::new(),
            fleets: BTreeMap::new(),
        }
    }

    pub fn fleets_at(&self, system: &SystemId) -> u32 {
        self.fleets.get(system).copied().unwrap_or(0)
    }

    pub fn owns(&self, system: &SystemId) -> bool {
        self.systems.contains(system)
    }

    pub fn total_fleets(&self) -> u64 {
        self.fleets.values().map(|&n| u64::from(n)).sum()
    }

    /// Add fleets to a system. Adding zero stores nothing.
    pub(crate) fn station(&mut self, system: &SystemId, count: u32) {
        if count == 0 {
            return;
        }
        let entry = self.fleets.entry(system.clone()).or_insert(0);
        *entry = entry.saturating_add(count);
    }

    /// Remove fleets from a system, dropping the entry once it is empty.
    pub(crate) fn withdraw(&mut self, system: &SystemId, count: u32) {
        if let Some(stationed) = self.fleets.get_mut(system) {
            *stationed = stationed.saturating_sub(count);
            if *stationed == 0 {
                self.fleets.remove(system);
            }
        }
    }

    pub(crate) fn cede(&mut self, system: &SystemId) {
        self.fleets.remove(system);
        self.systems.remove(system);
    }
}

/// Root aggregate for one game. All nested entities are reached through it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub id: GameId,
    pub players: Vec<Player>,
    pub map: GalaxyMap,
    pub current_turn: PlayerId,
    /// Hours a player may hold the turn before it can be expired.
    pub time_limit: u32,
    pub last_move_timestamp: DateTime<Utc>,
}

impl GameState {
    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_index(&self, id: &PlayerId) -> Option<usize> {
        self.players.iter().position(|p| &p.id == id)
    }

    pub fn owner_of(&self, system: &SystemId) -> Option<&PlayerId> {
        self.map.system(system).and_then(|s| s.owner.as_ref())
    }

    /// Player that moves after the current one, wrapping after the last.
    pub fn next_player(&self) -> Option<&PlayerId> {
        let current = self.player_index(&self.current_turn).unwrap_or(0);
        let len = self.players.len();
        if len == 0 {
            return None;
        }
        self.players.get((current + 1) % len).map(|p| &p.id)
    }

    /// Hand the turn to the next player and stamp the time.
    pub(crate) fn advance_turn(&mut self, now: DateTime<Utc>) {
        if let Some(next) = self.next_player().cloned() {
            self.current_turn = next;
        }
        self.last_move_timestamp = now;
    }

    /// When the current turn runs out, or `None` if that lies past the
    /// representable calendar.
    pub fn turn_deadline(&self) -> Option<DateTime<Utc>> {
        self.last_move_timestamp
            .checked_add_signed(Duration::hours(i64::from(self.time_limit)))
    }

    pub fn is_turn_expired(&self, now: DateTime<Utc>) -> bool {
        self.turn_deadline().is_some_and(|deadline| now >= deadline)
    }

    /// Check every aggregate invariant. Run on anything read back from storage.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        if self.players.is_empty() {
            return Err(InvariantViolation::NoPlayers);
        }

        let mut player_ids = HashSet::with_capacity(self.players.len());
        for player in &self.players {
            if !player_ids.insert(&player.id) {
                return Err(InvariantViolation::DuplicatePlayer(player.id.clone()));
            }
        }

        if !player_ids.contains(&self.current_turn) {
            return Err(InvariantViolation::UnknownCurrentTurn(
                self.current_turn.clone(),
            ));
        }

        if self.turn_deadline().is_none() {
            return Err(InvariantViolation::DeadlineOutOfRange(
                self.last_move_timestamp,
            ));
        }

        self.map.validate()?;

        for player in &self.players {
            for system_id in &player.systems {
                let Some(system) = self.map.system(system_id) else {
                    return Err(InvariantViolation::UnknownSystem {
                        player: player.id.clone(),
                        system: system_id.clone(),
                    });
                };
                if system.owner.as_ref() != Some(&player.id) {
                    return Err(InvariantViolation::OwnerMismatch {
                        player: player.id.clone(),
                        system: system_id.clone(),
                        owner: system.owner.clone(),
                    });
                }
            }

            for (system_id, &count) in &player.fleets {
                if !player.systems.contains(system_id) {
                    return Err(InvariantViolation::FleetsOutsideTerritory {
                        player: player.id.clone(),
                        system: system_id.clone(),
                    });
                }
                if count == 0 {
                    return Err(InvariantViolation::EmptyFleet {
                        player: player.id.clone(),
                        system: system_id.clone(),
                    });
                }
            }
        }

        for system in &self.map.systems {
            let Some(owner) = &system.owner else { continue };
            let recorded = self.player(owner).is_some_and(|p| p.owns(&system.id));
            if !recorded {
                return Err(InvariantViolation::UnrecordedOwnership {
                    system: system.id.clone(),
                    owner: owner.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::galaxy::{Position, System, Wormhole};

    fn two_system_game() -> GameState {
        let systems = (0..2)
            .map(|n| System {
                id: SystemId::numbered(n),
                position: Position::new(0.0, 0.0, 0.0),
                sun_size: 1.5,
                planets: Vec::new(),
                owner: None,
            })
            .collect();
        let mut state = GameState {
            id: GameId::from("g"),
            players: vec![Player::new("A"), Player::new("B")],
            map: GalaxyMap {
                systems,
                wormholes: vec![Wormhole::new(SystemId::numbered(0), SystemId::numbered(1))],
                asteroids: Vec::new(),
            },
            current_turn: PlayerId::from("A"),
            time_limit: 24,
            last_move_timestamp: DateTime::<Utc>::UNIX_EPOCH,
        };
        for (i, player) in state.players.iter_mut().enumerate() {
            let id = SystemId::numbered(i);
            player.systems.insert(id.clone());
            player.station(&id, 5);
            state.map.systems[i].owner = Some(player.id.clone());
        }
        state
    }

    #[test]
    fn consistent_state_validates() {
        assert_eq!(two_system_game().validate(), Ok(()));
    }

    #[test]
    fn owned_system_missing_from_player_is_rejected() {
        let mut state = two_system_game();
        state.players[1].cede(&SystemId::numbered(1));
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::UnrecordedOwnership { .. })
        ));
    }

    #[test]
    fn zero_fleet_entries_are_rejected() {
        let mut state = two_system_game();
        state.players[0].fleets.insert(SystemId::numbered(0), 0);
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::EmptyFleet { .. })
        ));
    }

    #[test]
    fn withdraw_drops_empty_entries_but_keeps_ownership() {
        let mut player = Player::new("A");
        let home = SystemId::numbered(0);
        player.systems.insert(home.clone());
        player.station(&home, 2);

        player.withdraw(&home, 2);
        assert_eq!(player.fleets_at(&home), 0);
        assert!(!player.fleets.contains_key(&home));
        assert!(player.owns(&home));
    }

    #[test]
    fn turn_deadline_uses_time_limit_in_hours() {
        let state = two_system_game();
        let now = DateTime::<Utc>::UNIX_EPOCH + Duration::hours(23);
        assert!(!state.is_turn_expired(now));
        assert!(state.is_turn_expired(now + Duration::hours(1)));
        assert_eq!(
            state.turn_deadline(),
            Some(DateTime::<Utc>::UNIX_EPOCH + Duration::hours(24))
        );
    }

    #[test]
    fn far_future_timestamp_is_invalid_not_a_panic() {
        let mut state = two_system_game();
        state.last_move_timestamp = DateTime::<Utc>::MAX_UTC;

        assert_eq!(state.turn_deadline(), None);
        assert!(!state.is_turn_expired(DateTime::<Utc>::MAX_UTC));
        assert_eq!(
            state.validate(),
            Err(InvariantViolation::DeadlineOutOfRange(DateTime::<Utc>::MAX_UTC))
        );
    }

    #[test]
    fn serializes_with_document_field_names() {
        let json = serde_json::to_value(two_system_game()).unwrap();
        assert!(json.get("currentTurn").is_some());
        assert!(json.get("timeLimit").is_some());
        assert!(json.get("lastMoveTimestamp").is_some());
        assert!(json["map"]["systems"][0].get("sunSize").is_some());
        assert_eq!(json["players"][0]["fleets"]["system1"], 5);
    }
}
