//! Interstellar Domination game engine.
//!
//! Pure, synchronous rules: galaxy generation with a connectivity guarantee,
//! the move engine that owns every mutation of a [`GameState`], and dice
//! combat. Storage and transport live elsewhere.

mod combat;
mod config;
mod error;
mod galaxy;
mod ids;
pub mod mapgen;
mod moves;
mod rng;
mod state;

pub use crate::combat::*;
pub use crate::config::*;
pub use crate::error::*;
pub use crate::galaxy::*;
pub use crate::ids::*;
pub use crate::mapgen::{generate_galaxy, generate_game};
pub use crate::moves::*;
pub use crate::rng::*;
pub use crate::state::*;
