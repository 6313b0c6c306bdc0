//! Procedural galaxy generation.
//!
//! Connectivity holds by construction: every system after the first is wired
//! to one already-connected system, giving a random spanning tree of N−1
//! wormholes. A handful of extra edges then adds alternative routes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::config::GalaxyConfig;
use crate::error::{GameError, PlayerListError};
use crate::galaxy::{Asteroid, GalaxyMap, Planet, Position, System, Wormhole};
use crate::ids::{GameId, SystemId};
use crate::rng::GameRandom;
use crate::state::{GameState, Player};

/// Planet colors, cycled by planet index within a system.
pub const PLANET_COLORS: [&str; 3] = ["#ff9999", "#99ccff", "#ccff99"];

/// Generate a galaxy with at least `min_systems` systems (clamped to the
/// configured range).
pub fn generate_galaxy<R: GameRandom + ?Sized>(
    config: &GalaxyConfig,
    min_systems: u32,
    rng: &mut R,
) -> GalaxyMap {
    let low = config.min_systems.max(min_systems).min(config.max_systems);
    let system_count = rng.gen_range_inclusive(low..=config.max_systems) as usize;

    let systems: Vec<System> = (0..system_count)
        .map(|i| generate_system(config, i, rng))
        .collect();

    let mut wormholes = spanning_wormholes(&systems, rng);
    add_extra_wormholes(config, &systems, &mut wormholes, rng);

    let asteroids = (0..config.asteroid_count as usize)
        .map(|i| Asteroid {
            id: format!("asteroid{}", i + 1),
            position: random_position(config.extent, rng),
            size: rng.gen_range_f64(1.0..3.0),
        })
        .collect();

    GalaxyMap {
        systems,
        wormholes,
        asteroids,
    }
}

/// Build the initial state of a game: a fresh galaxy with each player on a
/// distinct starting system.
pub fn generate_game<R: GameRandom + ?Sized>(
    id: GameId,
    player_names: &[String],
    config: &GalaxyConfig,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<GameState, GameError> {
    validate_player_names(player_names, config.max_systems as usize)
        .map_err(GameError::InvalidPlayerList)?;

    let mut map = generate_galaxy(config, player_names.len() as u32, rng);

    let mut players = Vec::with_capacity(player_names.len());
    for (name, system) in player_names.iter().zip(map.systems.iter_mut()) {
        let mut player = Player::new(name.as_str());
        system.owner = Some(player.id.clone());
        player.systems.insert(system.id.clone());
        player.station(&system.id, config.initial_fleets);
        players.push(player);
    }

    let current_turn = players[0].id.clone();
    tracing::debug!(
        game_id = %id,
        systems = map.systems.len(),
        wormholes = map.wormholes.len(),
        players = players.len(),
        "Generated galaxy"
    );

    Ok(GameState {
        id,
        players,
        map,
        current_turn,
        time_limit: config.time_limit_hours,
        last_move_timestamp: now,
    })
}

fn validate_player_names(names: &[String], max_players: usize) -> Result<(), PlayerListError> {
    if names.is_empty() {
        return Err(PlayerListError::Empty);
    }
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            return Err(PlayerListError::BlankName);
        }
        if !seen.insert(name.as_str()) {
            return Err(PlayerListError::Duplicate(name.clone()));
        }
    }
    if names.len() > max_players {
        return Err(PlayerListError::TooMany {
            players: names.len(),
            max: max_players,
        });
    }
    Ok(())
}

fn generate_system<R: GameRandom + ?Sized>(
    config: &GalaxyConfig,
    index: usize,
    rng: &mut R,
) -> System {
    let planet_count = rng.gen_range_inclusive(config.min_planets..=config.max_planets) as usize;
    let planets = (0..planet_count)
        .map(|j| Planet {
            id: format!("planet{index}-{j}"),
            size: rng.gen_range_f64(0.3..0.8),
            distance: (j + 1) as f64 * 2.0,
            color: PLANET_COLORS[j % PLANET_COLORS.len()].to_string(),
        })
        .collect();

    System {
        id: SystemId::numbered(index),
        position: random_position(config.extent, rng),
        sun_size: rng.gen_range_f64(1.0..2.0),
        planets,
        owner: None,
    }
}

fn random_position<R: GameRandom + ?Sized>(extent: f64, rng: &mut R) -> Position {
    let half = extent / 2.0;
    Position::new(
        rng.gen_range_f64(-half..half),
        rng.gen_range_f64(-half..half),
        rng.gen_range_f64(-half..half),
    )
}

/// Random spanning tree: system `i` links to a uniformly chosen system among
/// `0..i`, all of which are already connected.
fn spanning_wormholes<R: GameRandom + ?Sized>(systems: &[System], rng: &mut R) -> Vec<Wormhole> {
    (1..systems.len())
        .map(|i| {
            let j = rng.gen_range_u32(0..i as u32) as usize;
            Wormhole::new(systems[i].id.clone(), systems[j].id.clone())
        })
        .collect()
}

fn add_extra_wormholes<R: GameRandom + ?Sized>(
    config: &GalaxyConfig,
    systems: &[System],
    wormholes: &mut Vec<Wormhole>,
    rng: &mut R,
) {
    if systems.len() < 2 {
        return;
    }
    let attempts =
        rng.gen_range_inclusive(config.min_extra_wormholes..=config.max_extra_wormholes);
    let count = systems.len() as u32;
    for _ in 0..attempts {
        let a = &systems[rng.gen_range_u32(0..count) as usize].id;
        let b = &systems[rng.gen_range_u32(0..count) as usize].id;
        if a == b || wormholes.iter().any(|w| w.connects(a, b)) {
            continue;
        }
        wormholes.push(Wormhole::new(a.clone(), b.clone()));
    }
}
