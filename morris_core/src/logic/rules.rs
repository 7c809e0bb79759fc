use crate::logic::board::{
    is_strategic, Board, Cell, Player, ADJACENCY, LINES_THROUGH, MILLS, NUM_CELLS,
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("cell {0} is not on the board")]
    OutOfBounds(Cell),
    #[error("the game is already over")]
    GameOver,
    #[error("cell {0} is occupied")]
    TargetOccupied(Cell),
    #[error("cell {0} holds no piece of the player to move")]
    NoPieceAtSource(Cell),
    #[error("{from} is not adjacent to {to}")]
    NotAdjacent { from: Cell, to: Cell },
    #[error("the player to move has no pieces left to place")]
    NothingToPlace,
    #[error("pieces must be placed before any can move")]
    StillPlacing,
    #[error("the move completes a mill and must remove a piece")]
    RemovalRequired,
    #[error("the move does not complete a mill and cannot remove a piece")]
    RemovalNotAllowed,
    #[error("cell {0} cannot be removed")]
    IllegalRemoval(Cell),
    #[error("the move does not match the game variant")]
    WrongVariant,
}

/// Tactical features of a single move, computed without touching the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoveTactics {
    pub completes_mill: bool,
    pub blocks_mill: bool,
    pub creates_setup: bool,
    pub blocks_setup: bool,
    pub strategic: bool,
    /// Lines through the destination that hold no opponent piece.
    pub open_lines: u8,
}

impl MoveTactics {
    pub const fn is_tactical(&self) -> bool {
        self.completes_mill || self.blocks_mill || self.creates_setup
    }
}

/// Looks at the two lines through `to` as they would be after `player` moves
/// there, with `from` (if any) already vacated.
#[must_use]
pub fn analyze_move(board: &Board, player: Player, from: Option<Cell>, to: Cell) -> MoveTactics {
    let owner = |c: Cell| {
        if Some(c) == from {
            None
        } else {
            board.get(c)
        }
    };

    let mut tactics = MoveTactics {
        strategic: is_strategic(to),
        ..MoveTactics::default()
    };

    let Some(lines) = LINES_THROUGH.get(usize::from(to)) else {
        return tactics;
    };

    for &line_idx in lines {
        let line = &MILLS[line_idx];
        let mut own = 0;
        let mut opp = 0;
        let mut empty = 0;
        for &c in line.iter().filter(|&&c| c != to) {
            match owner(c) {
                Some(p) if p == player => own += 1,
                Some(_) => opp += 1,
                None => empty += 1,
            }
        }
        match (own, opp, empty) {
            (2, 0, 0) => tactics.completes_mill = true,
            (0, 2, 0) => tactics.blocks_mill = true,
            (1, 0, 1) => tactics.creates_setup = true,
            (0, 1, 1) => tactics.blocks_setup = true,
            _ => {}
        }
        if opp == 0 {
            tactics.open_lines += 1;
        }
    }
    tactics
}

/// True when `cell` belongs to a line fully owned by its occupant.
#[must_use]
pub fn is_in_mill(board: &Board, cell: Cell) -> bool {
    let Some(owner) = board.get(cell) else {
        return false;
    };
    LINES_THROUGH
        .get(usize::from(cell))
        .is_some_and(|lines| {
            lines
                .iter()
                .any(|&l| board.line_owner(&MILLS[l]) == Some(owner))
        })
}

/// Pieces of `victim` that may be taken after a mill: those outside any of
/// the victim's mills, or every piece when all of them stand in mills.
#[must_use]
pub fn removable_pieces(board: &Board, victim: Player) -> Vec<Cell> {
    let free: Vec<Cell> = board
        .cells_of(victim)
        .filter(|&c| !is_in_mill(board, c))
        .collect();
    if free.is_empty() {
        board.cells_of(victim).collect()
    } else {
        free
    }
}

#[must_use]
pub fn is_adjacent(from: Cell, to: Cell) -> bool {
    ADJACENCY
        .get(usize::from(from))
        .is_some_and(|n| n.contains(&to))
}

/// Checks a host-supplied winning-line set against the board topology the
/// engine is built for. Line orientation and order do not matter.
#[must_use]
pub fn lines_match_standard(lines: &[[Cell; 3]]) -> bool {
    if lines.len() != MILLS.len() {
        return false;
    }
    let normalize = |line: &[Cell; 3]| {
        let mut l = *line;
        l.sort_unstable();
        l
    };
    let mut ours: Vec<[Cell; 3]> = MILLS.iter().map(normalize).collect();
    let mut theirs: Vec<[Cell; 3]> = lines.iter().map(normalize).collect();
    ours.sort_unstable();
    theirs.sort_unstable();
    ours == theirs
}

#[must_use]
pub fn adjacency_matches_standard(adjacency: &[Vec<Cell>]) -> bool {
    adjacency.len() == NUM_CELLS
        && adjacency.iter().zip(ADJACENCY.iter()).all(|(given, ours)| {
            let mut g = given.clone();
            let mut o = ours.to_vec();
            g.sort_unstable();
            o.sort_unstable();
            g == o
        })
}
