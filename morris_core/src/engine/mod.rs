use crate::engine::move_list::MoveList;
use crate::logic::board::{Board, Cell, Player};
use crate::logic::rules::MoveTactics;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod agent;
pub mod config;
pub mod eval;
pub mod move_list;
pub mod order;
pub mod parallel;
pub mod search;
pub mod tt;

/// A placement in the simple (placement-only) model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SimpleMove {
    pub to: Cell,
}

/// A move in the classic model. `remove` is set exactly when the move
/// completes a mill and the opponent has a piece to lose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClassicMove {
    Place {
        to: Cell,
        remove: Option<Cell>,
    },
    Shift {
        from: Cell,
        to: Cell,
        remove: Option<Cell>,
    },
}

impl Default for ClassicMove {
    fn default() -> Self {
        Self::Place { to: 0, remove: None }
    }
}

impl ClassicMove {
    pub const fn from(self) -> Option<Cell> {
        match self {
            Self::Place { .. } => None,
            Self::Shift { from, .. } => Some(from),
        }
    }

    pub const fn to(self) -> Cell {
        match self {
            Self::Place { to, .. } | Self::Shift { to, .. } => to,
        }
    }

    pub const fn remove(self) -> Option<Cell> {
        match self {
            Self::Place { remove, .. } | Self::Shift { remove, .. } => remove,
        }
    }

    #[must_use]
    pub const fn with_remove(self, remove: Option<Cell>) -> Self {
        match self {
            Self::Place { to, .. } => Self::Place { to, remove },
            Self::Shift { from, to, .. } => Self::Shift { from, to, remove },
        }
    }
}

/// What the engine hands back to the host. `NoMove` is the inert signal for
/// "nothing sensible to play" (game over, invalid input, exhausted fallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChosenMove {
    Simple {
        to: Cell,
    },
    Classic {
        from: Option<Cell>,
        to: Cell,
        remove: Option<Cell>,
    },
    NoMove,
}

impl ChosenMove {
    pub const fn is_move(&self) -> bool {
        !matches!(self, Self::NoMove)
    }

    pub const fn to(&self) -> Option<Cell> {
        match self {
            Self::Simple { to } | Self::Classic { to, .. } => Some(*to),
            Self::NoMove => None,
        }
    }
}

impl From<SimpleMove> for ChosenMove {
    fn from(mv: SimpleMove) -> Self {
        Self::Simple { to: mv.to }
    }
}

impl From<ClassicMove> for ChosenMove {
    fn from(mv: ClassicMove) -> Self {
        Self::Classic {
            from: mv.from(),
            to: mv.to(),
            remove: mv.remove(),
        }
    }
}

/// Depth schedule and time budget of one iterative-deepening search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub start_depth: u8,
    pub depth_step: u8,
    pub max_depth: u8,
    pub time_limit_ms: Option<u64>,
}

impl SearchPlan {
    /// Deepen one ply at a time up to `depth`, without a clock.
    pub const fn fixed_depth(depth: u8) -> Self {
        Self {
            start_depth: 1,
            depth_step: 1,
            max_depth: depth,
            time_limit_ms: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub depth: u8,
    pub nodes: u64,
    pub time_ms: u64,
    pub score: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult<M> {
    pub best_move: Option<M>,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("board must have 24 cells, got {0}")]
    BoardSize(usize),
    #[error("winning-line set is missing")]
    MissingLines,
    #[error("winning-line set does not describe the standard board")]
    UnsupportedLines,
    #[error("adjacency map does not describe the standard board")]
    UnsupportedAdjacency,
    #[error("piece counts are required for the classic model")]
    MissingCounts,
    #[error("piece counts of {0:?} are inconsistent with the board")]
    InvalidCounts(Player),
    #[error("declared phase {declared:?} disagrees with the piece counts ({derived:?})")]
    PhaseMismatch {
        declared: crate::logic::generator::Phase,
        derived: crate::logic::generator::Phase,
    },
    #[error("no parallel search worker is alive")]
    NoWorkers,
    #[error("every parallel search worker failed or timed out")]
    WorkersFailed,
    #[error("search finished without a move")]
    NoMoveFound,
}

/// A game model the search engine can explore. Implementations own their
/// board; `apply` and `undo` must be exact inverses.
pub trait Position: Clone + Send + Serialize + DeserializeOwned + 'static {
    type Move: Copy
        + Default
        + PartialEq
        + std::fmt::Debug
        + Send
        + Serialize
        + DeserializeOwned
        + Into<ChosenMove>
        + 'static;

    fn board(&self) -> &Board;
    fn side_to_move(&self) -> Player;
    /// Exact, collision-free key of everything the search result depends on.
    fn key(&self) -> u64;
    /// The player who has won in this position, if the game is decided.
    fn winner(&self) -> Option<Player>;
    fn is_draw(&self) -> bool;
    fn generate_moves(&self, moves: &mut MoveList<Self::Move>);
    fn tactics(&self, mv: Self::Move) -> MoveTactics;
    fn apply(&mut self, mv: Self::Move);
    fn undo(&mut self, mv: Self::Move);
}

pub trait Evaluator<P> {
    /// Static score of `position`, positive when good for `perspective`.
    fn evaluate(&self, position: &P, perspective: Player) -> i32;
}

pub trait Searcher<P: Position> {
    fn search(&mut self, position: &P, plan: SearchPlan) -> Option<(P::Move, SearchStats)>;
}
