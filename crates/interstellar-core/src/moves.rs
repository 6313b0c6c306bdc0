//! Move engine: validates and applies fleet orders, and rotates the turn.
//!
//! Every check runs before any mutation, so a rejected order leaves the
//! aggregate untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::combat::{resolve_combat, CombatResult};
use crate::error::GameError;
use crate::ids::{PlayerId, SystemId};
use crate::rng::GameRandom;
use crate::state::GameState;

/// A player's order to send fleets through a wormhole.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOrder {
    pub player: PlayerId,
    pub from: SystemId,
    pub to: SystemId,
    pub fleets: u32,
}

impl MoveOrder {
    pub fn new(
        player: impl Into<PlayerId>,
        from: impl Into<SystemId>,
        to: impl Into<SystemId>,
        fleets: u32,
    ) -> Self {
        Self {
            player: player.into(),
            from: from.into(),
            to: to.into(),
            fleets,
        }
    }
}

/// What happened at the destination.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// Fleets joined the mover's own garrison.
    Reinforced { stationed: u32 },
    /// An unclaimed system was taken without a fight.
    Claimed { stationed: u32 },
    /// Enemy system taken; one attacking fleet is lost in the assault.
    Captured {
        defender: PlayerId,
        survivors: u32,
        combat: CombatResult,
    },
    /// Attack failed and every moving fleet was destroyed.
    Repelled {
        defender: PlayerId,
        lost: u32,
        combat: CombatResult,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveReport {
    pub order: MoveOrder,
    pub outcome: MoveOutcome,
    pub next_turn: PlayerId,
}

/// Indices resolved during validation, so applying cannot fail.
struct CheckedMove {
    mover: usize,
    destination: usize,
    defender: Option<usize>,
}

impl GameState {
    /// Run the move preconditions in order: turn, route, fleets.
    pub fn check_move(&self, order: &MoveOrder) -> Result<(), GameError> {
        self.checked_move(order).map(|_| ())
    }

    fn checked_move(&self, order: &MoveOrder) -> Result<CheckedMove, GameError> {
        if order.player != self.current_turn {
            return Err(GameError::NotPlayersTurn {
                player: order.player.clone(),
                current: self.current_turn.clone(),
            });
        }

        let no_route = || GameError::NoDirectRoute {
            from: order.from.clone(),
            to: order.to.clone(),
        };
        if !self.map.has_route(&order.from, &order.to) {
            return Err(no_route());
        }
        let destination = self.map.system_index(&order.to).ok_or_else(no_route)?;

        let mover = self.player_index(&order.player);
        let available = mover
            .map(|i| &self.players[i])
            .filter(|p| p.owns(&order.from))
            .map_or(0, |p| p.fleets_at(&order.from));
        let mover = match mover {
            Some(i) if order.fleets >= 1 && available >= order.fleets => i,
            _ => {
                return Err(GameError::InsufficientFleet {
                    player: order.player.clone(),
                    system: order.from.clone(),
                    requested: order.fleets,
                    available,
                })
            }
        };

        let defender = self.map.systems[destination]
            .owner
            .as_ref()
            .and_then(|owner| self.player_index(owner));

        Ok(CheckedMove {
            mover,
            destination,
            defender,
        })
    }

    /// Validate and apply one order, resolving combat when the destination is
    /// enemy-held, then pass the turn on.
    pub fn apply_move<R: GameRandom + ?Sized>(
        &mut self,
        order: &MoveOrder,
        rng: &mut R,
        now: DateTime<Utc>,
    ) -> Result<MoveReport, GameError> {
        let checked = self.checked_move(order)?;
        let CheckedMove {
            mover,
            destination,
            defender,
        } = checked;
        let count = order.fleets;

        self.players[mover].withdraw(&order.from, count);

        let outcome = match defender {
            Some(d) if d != mover => {
                let defending = self.players[d].fleets_at(&order.to);
                let combat = resolve_combat(count, defending, rng);
                let defender_id = self.players[d].id.clone();

                if combat.attacker_wins {
                    self.players[d].cede(&order.to);
                    let survivors = count.saturating_sub(1);
                    let attacker = &mut self.players[mover];
                    attacker.systems.insert(order.to.clone());
                    attacker.station(&order.to, survivors);
                    self.map.systems[destination].owner = Some(order.player.clone());

                    tracing::info!(
                        game_id = %self.id,
                        attacker = %order.player,
                        defender = %defender_id,
                        system = %order.to,
                        survivors,
                        "System captured"
                    );
                    MoveOutcome::Captured {
                        defender: defender_id,
                        survivors,
                        combat,
                    }
                } else {
                    tracing::info!(
                        game_id = %self.id,
                        attacker = %order.player,
                        defender = %defender_id,
                        system = %order.to,
                        lost = count,
                        "Attack repelled"
                    );
                    MoveOutcome::Repelled {
                        defender: defender_id,
                        lost: count,
                        combat,
                    }
                }
            }
            owner => {
                let player = &mut self.players[mover];
                player.station(&order.to, count);
                let stationed = player.fleets_at(&order.to);
                if owner.is_some() {
                    MoveOutcome::Reinforced { stationed }
                } else {
                    player.systems.insert(order.to.clone());
                    self.map.systems[destination].owner = Some(order.player.clone());
                    MoveOutcome::Claimed { stationed }
                }
            }
        };

        self.advance_turn(now);

        Ok(MoveReport {
            order: order.clone(),
            outcome,
            next_turn: self.current_turn.clone(),
        })
    }

    /// Skip the current player's turn if the time limit has run out.
    /// Returns the skipped player.
    pub fn expire_turn(&mut self, now: DateTime<Utc>) -> Option<PlayerId> {
        if !self.is_turn_expired(now) {
            return None;
        }
        let skipped = self.current_turn.clone();
        self.advance_turn(now);
        Some(skipped)
    }
}
