//! Rule errors and the wire-level error taxonomy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{PlayerId, SystemId};

/// Discriminant reported to callers when an operation is rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    GameNotFound,
    NotPlayersTurn,
    NoDirectRoute,
    InsufficientFleet,
    InvalidPlayerList,
    StorageConflict,
    CorruptState,
    Storage,
}

/// A move or game creation rejected by the rules. Never leaves state mutated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("invalid player list: {0}")]
    InvalidPlayerList(PlayerListError),
    #[error("it is {current}'s turn, not {player}'s")]
    NotPlayersTurn { player: PlayerId, current: PlayerId },
    #[error("no wormhole connects {from} and {to}")]
    NoDirectRoute { from: SystemId, to: SystemId },
    #[error("{player} cannot move {requested} fleets from {system} ({available} stationed)")]
    InsufficientFleet {
        player: PlayerId,
        system: SystemId,
        requested: u32,
        available: u32,
    },
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPlayerList(_) => ErrorKind::InvalidPlayerList,
            Self::NotPlayersTurn { .. } => ErrorKind::NotPlayersTurn,
            Self::NoDirectRoute { .. } => ErrorKind::NoDirectRoute,
            Self::InsufficientFleet { .. } => ErrorKind::InsufficientFleet,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PlayerListError {
    #[error("no players given")]
    Empty,
    #[error("player {0} listed more than once")]
    Duplicate(String),
    #[error("player name must not be blank")]
    BlankName,
    #[error("{players} players cannot each get a starting system (at most {max})")]
    TooMany { players: usize, max: usize },
}

/// A broken aggregate invariant, found when validating a loaded game.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("game has no players")]
    NoPlayers,
    #[error("player {0} appears more than once")]
    DuplicatePlayer(PlayerId),
    #[error("current turn belongs to unknown player {0}")]
    UnknownCurrentTurn(PlayerId),
    #[error("system {0} appears more than once")]
    DuplicateSystem(SystemId),
    #[error("wormhole references unknown system {0}")]
    DanglingWormhole(SystemId),
    #[error("wormhole loops from {0} to itself")]
    SelfLoop(SystemId),
    #[error("galaxy is not connected: {0} is unreachable")]
    Disconnected(SystemId),
    #[error("player {player} lists unknown system {system}")]
    UnknownSystem { player: PlayerId, system: SystemId },
    #[error("player {player} lists {system} but its owner is {owner:?}")]
    OwnerMismatch {
        player: PlayerId,
        system: SystemId,
        owner: Option<PlayerId>,
    },
    #[error("player {player} has fleets at {system} without owning it")]
    FleetsOutsideTerritory { player: PlayerId, system: SystemId },
    #[error("player {player} stores an empty fleet at {system}")]
    EmptyFleet { player: PlayerId, system: SystemId },
    #[error("turn started at {0} has no representable deadline")]
    DeadlineOutOfRange(DateTime<Utc>),
    #[error("system {system} is owned by {owner} but missing from that player's systems")]
    UnrecordedOwnership { system: SystemId, owner: PlayerId },
}
