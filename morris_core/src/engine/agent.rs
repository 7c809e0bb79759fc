use crate::engine::config::{Difficulty, EngineConfig};
use crate::engine::eval::MorrisEvaluator;
use crate::engine::move_list::MoveList;
use crate::engine::parallel::ParallelCoordinator;
use crate::engine::search::{now, AlphaBetaEngine};
use crate::engine::{
    ChosenMove, ClassicMove, EngineError, Evaluator, Position, SearchStats, Searcher, SimpleMove,
};
use crate::logic::board::{
    Board, Cell, Player, ADJACENCY, LINES_THROUGH, MILLS, NUM_CELLS, PREFERRED_CELLS,
};
use crate::logic::generator::{counts_consistent, ClassicPosition, Phase, PieceCounts, SimplePosition};
use crate::logic::rules::{adjacency_matches_standard, lines_match_standard, removable_pieces};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Variant {
    Simple,
    Classic,
}

/// Everything the engine needs to pick one move, as a host sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub variant: Variant,
    pub cells: Vec<Option<Player>>,
    pub to_move: Player,
    #[serde(default)]
    pub lines: Option<Vec<[Cell; 3]>>,
    #[serde(default)]
    pub adjacency: Option<Vec<Vec<Cell>>>,
    #[serde(default)]
    pub counts: Option<[PieceCounts; 2]>,
    #[serde(default)]
    pub phase: Option<Phase>,
    pub difficulty: Difficulty,
}

impl MoveRequest {
    pub fn simple(board: &Board, to_move: Player, difficulty: Difficulty) -> Self {
        Self {
            variant: Variant::Simple,
            cells: board.cells().to_vec(),
            to_move,
            lines: Some(MILLS.to_vec()),
            adjacency: None,
            counts: None,
            phase: None,
            difficulty,
        }
    }

    pub fn classic(position: &ClassicPosition, difficulty: Difficulty) -> Self {
        Self {
            variant: Variant::Classic,
            cells: position.board.cells().to_vec(),
            to_move: position.turn,
            lines: Some(MILLS.to_vec()),
            adjacency: Some(ADJACENCY.iter().map(|n| n.to_vec()).collect()),
            counts: Some(position.counts),
            phase: Some(position.phase()),
            difficulty,
        }
    }

    fn board(&self) -> Result<Board, EngineError> {
        let cells: [Option<Player>; NUM_CELLS] = self
            .cells
            .as_slice()
            .try_into()
            .map_err(|_| EngineError::BoardSize(self.cells.len()))?;
        let lines = self.lines.as_deref().ok_or(EngineError::MissingLines)?;
        if !lines_match_standard(lines) {
            return Err(EngineError::UnsupportedLines);
        }
        Ok(Board::from_cells(cells))
    }

    pub fn to_simple(&self) -> Result<SimplePosition, EngineError> {
        Ok(SimplePosition::new(self.board()?, self.to_move))
    }

    pub fn to_classic(&self) -> Result<ClassicPosition, EngineError> {
        let board = self.board()?;
        if let Some(adjacency) = &self.adjacency {
            if !adjacency_matches_standard(adjacency) {
                return Err(EngineError::UnsupportedAdjacency);
            }
        }
        let counts = self.counts.ok_or(EngineError::MissingCounts)?;
        counts_consistent(&board, &counts).map_err(EngineError::InvalidCounts)?;
        let position = ClassicPosition::new(board, counts, self.to_move);
        if let Some(declared) = self.phase {
            let derived = position.phase();
            if declared != derived {
                return Err(EngineError::PhaseMismatch { declared, derived });
            }
        }
        Ok(position)
    }
}

/// Per-model pieces the facade needs beyond searching.
trait Facade: Position {
    fn destination(mv: Self::Move) -> Cell;
    /// The same position with `player` to move.
    fn with_turn(&self, player: Player) -> Self;
    /// Picks the removal for a mill move chosen outside the search.
    fn finalize(&self, mv: Self::Move) -> Self::Move;
}

impl Facade for SimplePosition {
    fn destination(mv: SimpleMove) -> Cell {
        mv.to
    }

    fn with_turn(&self, player: Player) -> Self {
        Self::new(self.board, player)
    }

    fn finalize(&self, mv: SimpleMove) -> SimpleMove {
        mv
    }
}

impl Facade for ClassicPosition {
    fn destination(mv: ClassicMove) -> Cell {
        mv.to()
    }

    fn with_turn(&self, player: Player) -> Self {
        Self::new(self.board, self.counts, player)
    }

    fn finalize(&self, mv: ClassicMove) -> ClassicMove {
        if mv.remove().is_none() {
            return mv;
        }
        mv.with_remove(choose_removal(&self.board, self.turn.opposite()).or(mv.remove()))
    }
}

/// The removable piece of `victim` that takes part in the most of the
/// victim's two-in-a-row lines, lowest cell on ties.
pub fn choose_removal(board: &Board, victim: Player) -> Option<Cell> {
    let threat = |cell: Cell| {
        LINES_THROUGH[usize::from(cell)]
            .iter()
            .filter(|&&l| board.line_counts(&MILLS[l], victim) == (2, 0, 1))
            .count()
    };
    let mut best: Option<(Cell, usize)> = None;
    for cell in removable_pieces(board, victim) {
        let t = threat(cell);
        if best.map_or(true, |(_, bt)| t > bt) {
            best = Some((cell, t));
        }
    }
    best.map(|(cell, _)| cell)
}

fn legal_moves<P: Position>(position: &P) -> MoveList<P::Move> {
    let mut moves = MoveList::new();
    position.generate_moves(&mut moves);
    moves
}

/// A move after which the side to move has won.
fn immediate_win<P: Facade>(position: &P) -> Option<P::Move> {
    let mover = position.side_to_move();
    let mut scratch = position.clone();
    legal_moves(position).into_iter().find(|&mv| {
        scratch.apply(mv);
        let wins = scratch.winner() == Some(mover);
        scratch.undo(mv);
        wins
    })
}

/// A move onto a cell where the opponent, moving next, would win.
fn forced_block<P: Facade>(position: &P) -> Option<P::Move> {
    let opponent = position.side_to_move().opposite();
    let threats: Vec<Cell> = {
        let theirs = position.with_turn(opponent);
        let mut scratch = theirs.clone();
        legal_moves(&theirs)
            .into_iter()
            .filter(|&mv| {
                scratch.apply(mv);
                let wins = scratch.winner() == Some(opponent);
                scratch.undo(mv);
                wins
            })
            .map(P::destination)
            .collect()
    };
    if threats.is_empty() {
        return None;
    }
    legal_moves(position)
        .into_iter()
        .find(|&mv| threats.contains(&P::destination(mv)))
        .map(|mv| position.finalize(mv))
}

/// Search engines and worker pool for one game model, created on first use.
struct Tier<P: Position> {
    engine: Option<AlphaBetaEngine<P>>,
    pool: Option<ParallelCoordinator<P>>,
    pool_unavailable: bool,
}

impl<P: Position> Default for Tier<P> {
    fn default() -> Self {
        Self {
            engine: None,
            pool: None,
            pool_unavailable: false,
        }
    }
}

/// Picks moves for a host. Every entry point returns a move or the inert
/// `ChosenMove::NoMove`; nothing propagates as an error.
pub struct Agent {
    config: Arc<EngineConfig>,
    rng: StdRng,
    simple: Tier<SimplePosition>,
    classic: Tier<ClassicPosition>,
    last_stats: Option<SearchStats>,
}

impl Agent {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Reproducible random choices for the rule-based tiers.
    pub fn with_seed(config: Arc<EngineConfig>, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: Arc<EngineConfig>, rng: StdRng) -> Self {
        Self {
            config,
            rng,
            simple: Tier::default(),
            classic: Tier::default(),
            last_stats: None,
        }
    }

    /// Statistics of the last search, if the last move came from one.
    pub const fn last_stats(&self) -> Option<SearchStats> {
        self.last_stats
    }

    pub fn choose_move(&mut self, request: &MoveRequest) -> ChosenMove {
        self.last_stats = None;
        let result = match request.variant {
            Variant::Simple => request.to_simple().map(|position| {
                decide(
                    &mut self.simple,
                    &self.config,
                    &mut self.rng,
                    &mut self.last_stats,
                    &position,
                    request.difficulty,
                )
            }),
            Variant::Classic => request.to_classic().map(|position| {
                decide(
                    &mut self.classic,
                    &self.config,
                    &mut self.rng,
                    &mut self.last_stats,
                    &position,
                    request.difficulty,
                )
            }),
        };
        result.unwrap_or_else(|e| {
            log::warn!("rejected move request: {e}");
            ChosenMove::NoMove
        })
    }
}

fn decide<P>(
    tier: &mut Tier<P>,
    config: &Arc<EngineConfig>,
    rng: &mut StdRng,
    stats: &mut Option<SearchStats>,
    position: &P,
    difficulty: Difficulty,
) -> ChosenMove
where
    P: Facade,
    MorrisEvaluator: Evaluator<P>,
{
    if position.winner().is_some() || position.is_draw() {
        return ChosenMove::NoMove;
    }

    let picked = match difficulty {
        Difficulty::Trivial => None,
        Difficulty::Basic => basic_move(position, rng),
        Difficulty::Deep | Difficulty::Maximal => {
            let tactical = immediate_win(position).or_else(|| forced_block(position));
            if tactical.is_some() {
                log::debug!("playing the immediate tactic without search");
                tactical
            } else {
                match search_move(tier, config, position, difficulty) {
                    Ok((mv, found)) => {
                        *stats = Some(found);
                        Some(mv)
                    }
                    Err(e) => {
                        log::warn!("search failed ({e}), playing a random move");
                        None
                    }
                }
            }
        }
    };

    picked
        .or_else(|| random_move(position, rng))
        .map_or(ChosenMove::NoMove, Into::into)
}

fn search_move<P>(
    tier: &mut Tier<P>,
    config: &Arc<EngineConfig>,
    position: &P,
    difficulty: Difficulty,
) -> Result<(P::Move, SearchStats), EngineError>
where
    P: Facade,
    MorrisEvaluator: Evaluator<P>,
{
    let profile = config.profile(difficulty).ok_or(EngineError::NoMoveFound)?;
    let started = now();
    let mut plan = profile.plan();

    if difficulty == Difficulty::Maximal && !tier.pool_unavailable {
        if tier.pool.is_none() {
            match ParallelCoordinator::new(config.clone()) {
                Ok(pool) => tier.pool = Some(pool),
                Err(e) => {
                    log::warn!("parallel search unavailable: {e}");
                    tier.pool_unavailable = true;
                }
            }
        }
        if let Some(pool) = tier.pool.as_mut() {
            match pool.search(position, plan, profile.worker_timeout_ms) {
                Ok(found) => {
                    log_search("parallel", &found.1);
                    return Ok(found);
                }
                Err(e) => {
                    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                    let spent = (now() - started).max(0.0) as u64;
                    plan = profile.remaining_plan(spent);
                    log::warn!("parallel search failed ({e}), {spent}ms spent, searching on one thread");
                }
            }
        }
    }

    let engine = tier
        .engine
        .get_or_insert_with(|| AlphaBetaEngine::new(config.clone()));
    let found = engine
        .search(position, plan)
        .ok_or(EngineError::NoMoveFound)?;
    log_search("sequential", &found.1);
    Ok(found)
}

fn log_search(kind: &str, stats: &SearchStats) {
    log::info!(
        "{kind} search: depth {} score {} nodes {} in {}ms",
        stats.depth,
        stats.score,
        stats.nodes,
        stats.time_ms
    );
}

/// Win, block, setup, preferred cell, in that order.
fn basic_move<P: Facade>(position: &P, rng: &mut StdRng) -> Option<P::Move> {
    let moves = legal_moves(position).to_vec();
    let first_with = |pick: fn(&crate::logic::rules::MoveTactics) -> bool| {
        moves
            .iter()
            .copied()
            .find(|&mv| pick(&position.tactics(mv)))
            .map(|mv| position.finalize(mv))
    };

    first_with(|t| t.completes_mill)
        .or_else(|| first_with(|t| t.blocks_mill))
        .or_else(|| first_with(|t| t.creates_setup))
        .or_else(|| {
            let preferred: Vec<P::Move> = moves
                .iter()
                .copied()
                .filter(|&mv| PREFERRED_CELLS.contains(&P::destination(mv)))
                .collect();
            preferred.choose(rng).map(|&mv| position.finalize(mv))
        })
}

fn random_move<P: Facade>(position: &P, rng: &mut StdRng) -> Option<P::Move> {
    legal_moves(position).to_vec().choose(rng).copied()
}
