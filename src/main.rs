use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use morris_core::engine::agent::{Agent, Variant};
use morris_core::engine::config::{Difficulty, EngineConfig};
use morris_core::engine::ChosenMove;
use morris_core::logic::board::Player;
use morris_core::logic::game::{GameState, GameStatus};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    /// Placement only, first line wins.
    Simple,
    /// Nine Men's Morris with mills and removals.
    Classic,
}

impl From<VariantArg> for Variant {
    fn from(arg: VariantArg) -> Self {
        match arg {
            VariantArg::Simple => Self::Simple,
            VariantArg::Classic => Self::Classic,
        }
    }
}

/// Plays the engine against itself and prints the games.
#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, value_enum, default_value = "classic")]
    variant: VariantArg,

    /// Difficulty of the first player.
    #[arg(long, default_value = "deep")]
    one: Difficulty,

    /// Difficulty of the second player.
    #[arg(long, default_value = "basic")]
    two: Difficulty,

    #[arg(long, default_value = "1")]
    games: u32,

    /// Stop a game after this many plies and call it a draw.
    #[arg(long, default_value = "200")]
    max_plies: usize,

    #[arg(long)]
    seed: Option<u64>,

    /// Engine configuration as JSON; defaults apply to missing fields.
    #[arg(long, value_name = "FILE", value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    quiet: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    EngineConfig::load_from_json(&text).map_err(|e| format!("bad config {}: {e}", path.display()))
}

fn make_agent(config: &Arc<EngineConfig>, seed: Option<u64>) -> Agent {
    match seed {
        Some(seed) => Agent::with_seed(config.clone(), seed),
        None => Agent::new(config.clone()),
    }
}

fn play_game(cli: &Cli, agents: &mut [Agent; 2]) -> GameStatus {
    let mut game = GameState::new(cli.variant.into());
    while game.status == GameStatus::Playing {
        if game.history.len() >= cli.max_plies {
            log::info!("ply limit {} reached", cli.max_plies);
            return GameStatus::Draw;
        }

        let difficulty = match game.turn {
            Player::One => cli.one,
            Player::Two => cli.two,
        };
        let [one, two] = &mut *agents;
        let agent = match game.turn {
            Player::One => one,
            Player::Two => two,
        };
        let mv = agent.choose_move(&game.to_request(difficulty));
        if mv == ChosenMove::NoMove {
            log::warn!("{:?} has no move", game.turn);
            break;
        }
        if let Some(stats) = agent.last_stats() {
            log::debug!(
                "depth {} nodes {} time {}ms score {}",
                stats.depth,
                stats.nodes,
                stats.time_ms,
                stats.score
            );
        }

        let player = game.turn;
        if let Err(e) = game.make_move(mv) {
            log::error!("{player:?} chose an illegal move {mv:?}: {e}");
            return GameStatus::Won(player.opposite());
        }
        if !cli.quiet {
            println!("{player:?}: {mv:?}\n{}", game.board);
        }
    }
    game.status
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_ref()) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    let mut agents = [
        make_agent(&config, cli.seed),
        make_agent(&config, cli.seed.map(|s| s.wrapping_add(1))),
    ];

    let (mut one_wins, mut two_wins, mut draws) = (0u32, 0u32, 0u32);
    for round in 1..=cli.games {
        let status = play_game(&cli, &mut agents);
        println!("game {round}: {status:?}");
        match status {
            GameStatus::Won(Player::One) => one_wins += 1,
            GameStatus::Won(Player::Two) => two_wins += 1,
            GameStatus::Draw | GameStatus::Playing => draws += 1,
        }
    }
    println!(
        "one ({:?}) {one_wins} / two ({:?}) {two_wins} / draws {draws}",
        cli.one, cli.two
    );
}
