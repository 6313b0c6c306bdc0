//! Interstellar CLI - play Interstellar Domination from a terminal.
//!
//! Single binary that provides:
//! - `interstellar new A B` - start a game
//! - `interstellar show <game>` - print a game
//! - `interstellar move <game>` - send fleets through a wormhole
//! - `interstellar expire <game>` - skip a player whose time ran out
//! - `interstellar history` - recent journal entries

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use interstellar_core::{GameId, GameState, MoveOrder, MoveOutcome};
use interstellar_server::{FileRepository, GameService, MoveJournal, ServerConfig};

#[derive(Parser)]
#[command(name = "interstellar")]
#[command(about = "Turn-based galactic conquest", version)]
struct Cli {
    /// Project root directory
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    /// Config file (defaults to <project>/.interstellar/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding game documents
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a game; players move in the order given
    New {
        #[arg(required = true)]
        players: Vec<String>,
    },

    /// Print a game
    Show {
        game_id: String,

        /// Print the stored JSON document
        #[arg(long)]
        json: bool,
    },

    /// List stored games
    List,

    /// Move fleets along a wormhole
    Move {
        game_id: String,

        #[arg(long)]
        player: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,

        #[arg(long)]
        fleets: u32,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Skip the current player if their time limit has passed
    Expire {
        game_id: String,

        /// Evaluate the deadline at this RFC 3339 time instead of now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show recent game events
    History {
        /// Only events for this game
        game_id: Option<String>,

        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Write a default .interstellar/config.yaml
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let project_root = match cli.project {
        Some(root) => root,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Commands::Init = cli.command {
        return init_project(&project_root);
    }

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ServerConfig::load(path)?;
            config.resolve_paths(&project_root);
            config
        }
        None => ServerConfig::load_from_dir(&project_root)?,
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let service = open_service(config).await?;

    match cli.command {
        Commands::New { players } => new_game(&service, &players).await,
        Commands::Show { game_id, json } => show_game(&service, &GameId::new(game_id), json).await,
        Commands::List => list_games(&service).await,
        Commands::Move {
            game_id,
            player,
            from,
            to,
            fleets,
            json,
        } => {
            let order = MoveOrder::new(player, from, to, fleets);
            move_fleet(&service, &GameId::new(game_id), order, json).await
        }
        Commands::Expire { game_id, at } => {
            expire_turn(&service, &GameId::new(game_id), at.unwrap_or_else(Utc::now)).await
        }
        Commands::History { game_id, limit } => {
            show_history(&service, game_id.map(GameId::new).as_ref(), limit).await
        }
        Commands::Init => Ok(()),
    }
}

async fn open_service(config: ServerConfig) -> Result<GameService<FileRepository>> {
    let repo = FileRepository::open(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open game store {}", config.data_dir.display()))?;
    tracing::debug!(data_dir = %config.data_dir.display(), "Opened game store");

    let journal = config.journal.then(|| MoveJournal::new(&config.data_dir));
    let mut service = GameService::new(repo, config);
    if let Some(journal) = journal {
        service = service.with_journal(journal);
    }
    Ok(service)
}

async fn new_game(service: &GameService<FileRepository>, players: &[String]) -> Result<()> {
    let id = service.create_game(players).await?;
    let game = service.get_game(&id).await?;

    println!("Created game {id}");
    println!();
    print_game(&game);
    Ok(())
}

async fn show_game(service: &GameService<FileRepository>, id: &GameId, json: bool) -> Result<()> {
    let game = service.get_game(id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&game)?);
    } else {
        print_game(&game);
    }
    Ok(())
}

async fn list_games(service: &GameService<FileRepository>) -> Result<()> {
    let ids = service.list_games().await?;
    println!("Games: {}", ids.len());
    for id in ids {
        match service.get_game(&id).await {
            Ok(game) => println!("  {} - {} players, {} to move", id, game.players.len(), game.current_turn),
            Err(err) => println!("  {id} - unreadable: {err}"),
        }
    }
    Ok(())
}

async fn move_fleet(
    service: &GameService<FileRepository>,
    id: &GameId,
    order: MoveOrder,
    json: bool,
) -> Result<()> {
    let response = service.submit_move(id, order).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let Some(report) = response.report.filter(|_| response.success) else {
        let reason = response
            .reason
            .map(|r| format!("{r:?}"))
            .unwrap_or_else(|| "unknown".to_string());
        bail!(
            "Move rejected ({reason}): {}",
            response.message.unwrap_or_default()
        );
    };

    let order = &report.order;
    match &report.outcome {
        MoveOutcome::Reinforced { stationed } => {
            println!("Reinforced {}: {} fleets stationed", order.to, stationed)
        }
        MoveOutcome::Claimed { stationed } => {
            println!("Claimed {} with {} fleets", order.to, stationed)
        }
        MoveOutcome::Captured {
            defender,
            survivors,
            combat,
        } => println!(
            "Captured {} from {} (rolled {} vs {}), {} fleets remain",
            order.to, defender, combat.attacker_roll, combat.defender_roll, survivors
        ),
        MoveOutcome::Repelled {
            defender,
            lost,
            combat,
        } => println!(
            "{} held {} (rolled {} vs {}), {} fleets lost",
            defender, order.to, combat.defender_roll, combat.attacker_roll, lost
        ),
    }
    println!("Next turn: {}", report.next_turn);
    Ok(())
}

async fn expire_turn(
    service: &GameService<FileRepository>,
    id: &GameId,
    now: DateTime<Utc>,
) -> Result<()> {
    match service.expire_turn(id, now).await? {
        Some(skipped) => {
            let game = service.get_game(id).await?;
            println!("{skipped} ran out of time; {} to move", game.current_turn);
        }
        None => {
            let game = service.get_game(id).await?;
            println!(
                "{} still has until {}",
                game.current_turn,
                deadline_label(&game)
            );
        }
    }
    Ok(())
}

async fn show_history(
    service: &GameService<FileRepository>,
    game: Option<&GameId>,
    limit: usize,
) -> Result<()> {
    if service.journal().is_none() {
        println!("Journal is disabled in the configuration");
        return Ok(());
    }

    let events = service.history(game, limit).await;
    println!("Recent events: {}", events.len());
    for event in &events {
        println!(
            "  {} [{}] {} {}",
            event.timestamp.format("%Y-%m-%d %H:%M:%S"),
            event.event_type,
            event.game_id,
            event.message
        );
    }
    Ok(())
}

fn print_game(game: &GameState) {
    println!("Game {}", game.id);
    println!("=====");
    println!(
        "Galaxy: {} systems, {} wormholes, {} asteroids",
        game.map.systems.len(),
        game.map.wormholes.len(),
        game.map.asteroids.len()
    );
    println!(
        "Turn: {} (deadline {})",
        game.current_turn,
        deadline_label(game)
    );
    println!();
    for player in &game.players {
        println!(
            "{} - {} systems, {} fleets",
            player.name,
            player.systems.len(),
            player.total_fleets()
        );
        for system in &player.systems {
            let links: Vec<String> = game
                .map
                .neighbours(system)
                .into_iter()
                .map(|n| n.to_string())
                .collect();
            println!(
                "  {} [{} fleets] -> {}",
                system,
                player.fleets_at(system),
                links.join(", ")
            );
        }
    }
}

fn deadline_label(game: &GameState) -> String {
    game.turn_deadline()
        .map(|deadline| deadline.to_rfc3339())
        .unwrap_or_else(|| "never".to_string())
}

fn init_project(project_root: &Path) -> Result<()> {
    let dir = project_root.join(".interstellar");
    std::fs::create_dir_all(&dir)?;

    let config_path = dir.join("config.yaml");
    if !config_path.exists() {
        let default_config = r#"# Interstellar Domination configuration

data_dir: .interstellar/games
max_move_retries: 3
journal: true

galaxy:
  min_systems: 20
  max_systems: 30
  min_planets: 1
  max_planets: 3
  min_extra_wormholes: 10
  max_extra_wormholes: 15
  asteroid_count: 50
  initial_fleets: 5
  extent: 1000.0
  time_limit_hours: 24
"#;
        std::fs::write(&config_path, default_config)?;
    }

    println!("Initialized Interstellar project at {}", project_root.display());
    println!();
    println!("Created:");
    println!("  .interstellar/config.yaml - game configuration");
    println!();
    println!("Next steps:");
    println!("  1. Run: interstellar new Alice Bob");
    println!("  2. Run: interstellar show <game id>");

    Ok(())
}
