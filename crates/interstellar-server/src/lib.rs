//! Interstellar Domination game service.
//!
//! Wraps the rules in `interstellar-core` with storage and concurrency:
//! - [`GameService`] runs create, read, move and turn-expiry operations
//! - [`repository`] holds game documents behind a versioned compare-and-swap
//! - [`journal`] appends game events to a JSONL log
//! - [`config`] loads `.interstellar/config.yaml`

pub mod config;
pub mod error;
pub mod journal;
pub mod repository;
pub mod service;

pub use config::ServerConfig;
pub use error::{RepositoryError, ServiceError};
pub use journal::{GameEvent, MoveJournal};
pub use repository::{FileRepository, GameRepository, InMemoryRepository, Versioned};
pub use service::{GameService, MoveApplied, MoveResponse};
