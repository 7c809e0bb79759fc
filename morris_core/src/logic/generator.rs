use crate::engine::move_list::MoveList;
use crate::engine::{ClassicMove, Position, SimpleMove};
use crate::logic::board::{Board, Cell, Player, ADJACENCY, NUM_CELLS, PIECES_PER_PLAYER};
use crate::logic::rules::{analyze_move, removable_pieces, MoveTactics};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Placing,
    Moving,
    Flying,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PieceCounts {
    pub left_to_place: u8,
    pub on_board: u8,
}

impl PieceCounts {
    pub const fn fresh() -> Self {
        Self {
            left_to_place: PIECES_PER_PLAYER,
            on_board: 0,
        }
    }

    pub const fn is_valid(&self) -> bool {
        self.left_to_place as u16 + self.on_board as u16 <= PIECES_PER_PLAYER as u16
    }
}

// ---------------------------------------------------------------------------
// Simple model
// ---------------------------------------------------------------------------

/// Placement-only game: first complete line wins, nine pieces each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplePosition {
    pub board: Board,
    pub turn: Player,
}

impl SimplePosition {
    pub const fn new(board: Board, turn: Player) -> Self {
        Self { board, turn }
    }

    fn can_place(&self, player: Player) -> bool {
        self.board.count(player) < PIECES_PER_PLAYER && !self.board.is_full()
    }
}

impl Position for SimplePosition {
    type Move = SimpleMove;

    fn board(&self) -> &Board {
        &self.board
    }

    fn side_to_move(&self) -> Player {
        self.turn
    }

    fn key(&self) -> u64 {
        self.board.key() | ((self.turn.index() as u64) << 48)
    }

    fn winner(&self) -> Option<Player> {
        self.board.winner()
    }

    fn is_draw(&self) -> bool {
        self.board.winner().is_none() && !self.can_place(self.turn)
    }

    fn generate_moves(&self, moves: &mut MoveList<SimpleMove>) {
        if !self.can_place(self.turn) {
            return;
        }
        for to in self.board.empty_cells() {
            moves.push(SimpleMove { to });
        }
    }

    fn tactics(&self, mv: SimpleMove) -> MoveTactics {
        analyze_move(&self.board, self.turn, None, mv.to)
    }

    fn apply(&mut self, mv: SimpleMove) {
        self.board.set(mv.to, Some(self.turn));
        self.turn = self.turn.opposite();
    }

    fn undo(&mut self, mv: SimpleMove) {
        self.turn = self.turn.opposite();
        self.board.set(mv.to, None);
    }
}

// ---------------------------------------------------------------------------
// Classic model
// ---------------------------------------------------------------------------

/// Full rules: placing, then moving (flying on three pieces), with a removal
/// after every mill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicPosition {
    pub board: Board,
    pub counts: [PieceCounts; 2],
    pub turn: Player,
}

impl ClassicPosition {
    pub const fn new(board: Board, counts: [PieceCounts; 2], turn: Player) -> Self {
        Self {
            board,
            counts,
            turn,
        }
    }

    /// Derives the counters from the board, assuming `placed` pieces were
    /// placed by each player so far.
    pub fn from_board(board: Board, placed: [u8; 2], turn: Player) -> Self {
        let counts = [Player::One, Player::Two].map(|p| PieceCounts {
            left_to_place: PIECES_PER_PLAYER.saturating_sub(placed[p.index()]),
            on_board: board.count(p),
        });
        Self::new(board, counts, turn)
    }

    pub const fn counts_of(&self, player: Player) -> PieceCounts {
        self.counts[player.index()]
    }

    /// Global phase: placing until both players have placed everything.
    pub fn phase(&self) -> Phase {
        if self.counts.iter().any(|c| c.left_to_place > 0) {
            Phase::Placing
        } else {
            self.phase_of(self.turn)
        }
    }

    /// What `player` may do on their turn.
    pub fn phase_of(&self, player: Player) -> Phase {
        let counts = self.counts_of(player);
        if counts.left_to_place > 0 {
            Phase::Placing
        } else if counts.on_board == 3 {
            Phase::Flying
        } else {
            Phase::Moving
        }
    }

    fn has_lost(&self, player: Player) -> bool {
        let counts = self.counts_of(player);
        if counts.left_to_place == 0 && counts.on_board < 3 {
            return true;
        }
        player == self.turn && !self.has_any_move()
    }

    fn has_any_move(&self) -> bool {
        match self.phase_of(self.turn) {
            Phase::Placing | Phase::Flying => self.board.empty_cells().next().is_some(),
            Phase::Moving => self.board.cells_of(self.turn).any(|from| {
                ADJACENCY[usize::from(from)]
                    .iter()
                    .any(|&to| self.board.get(to).is_none())
            }),
        }
    }

    /// True when `mv` lines up three pieces of the mover.
    pub fn completes_mill(&self, mv: ClassicMove) -> bool {
        analyze_move(&self.board, self.turn, mv.from(), mv.to()).completes_mill
    }

    fn push_with_removals(
        &self,
        moves: &mut MoveList<ClassicMove>,
        base: ClassicMove,
        removals: &[Cell],
    ) {
        if removals.is_empty() || !self.completes_mill(base) {
            moves.push(base);
            return;
        }
        for &victim in removals {
            moves.push(base.with_remove(Some(victim)));
        }
    }

    fn counts_mut(&mut self, player: Player) -> &mut PieceCounts {
        &mut self.counts[player.index()]
    }
}

impl Position for ClassicPosition {
    type Move = ClassicMove;

    fn board(&self) -> &Board {
        &self.board
    }

    fn side_to_move(&self) -> Player {
        self.turn
    }

    fn key(&self) -> u64 {
        let left = |p: Player| u64::from(self.counts_of(p).left_to_place & 0x0f);
        self.board.key()
            | (left(Player::One) << 48)
            | (left(Player::Two) << 52)
            | ((self.turn.index() as u64) << 56)
    }

    fn winner(&self) -> Option<Player> {
        [Player::One, Player::Two]
            .into_iter()
            .find(|&p| self.has_lost(p))
            .map(Player::opposite)
    }

    fn is_draw(&self) -> bool {
        false
    }

    fn generate_moves(&self, moves: &mut MoveList<ClassicMove>) {
        let mover = self.turn;
        // The mover only changes their own pieces, so the victim's mills and
        // hence the legal removals are the same for every candidate.
        let removals = removable_pieces(&self.board, mover.opposite());

        match self.phase_of(mover) {
            Phase::Placing => {
                for to in self.board.empty_cells() {
                    self.push_with_removals(moves, ClassicMove::Place { to, remove: None }, &removals);
                }
            }
            Phase::Moving => {
                for from in self.board.cells_of(mover) {
                    for &to in ADJACENCY[usize::from(from)] {
                        if self.board.get(to).is_none() {
                            let base = ClassicMove::Shift {
                                from,
                                to,
                                remove: None,
                            };
                            self.push_with_removals(moves, base, &removals);
                        }
                    }
                }
            }
            Phase::Flying => {
                for from in self.board.cells_of(mover) {
                    for to in self.board.empty_cells() {
                        let base = ClassicMove::Shift {
                            from,
                            to,
                            remove: None,
                        };
                        self.push_with_removals(moves, base, &removals);
                    }
                }
            }
        }
    }

    fn tactics(&self, mv: ClassicMove) -> MoveTactics {
        analyze_move(&self.board, self.turn, mv.from(), mv.to())
    }

    fn apply(&mut self, mv: ClassicMove) {
        let mover = self.turn;
        match mv {
            ClassicMove::Place { to, .. } => {
                self.board.set(to, Some(mover));
                let counts = self.counts_mut(mover);
                counts.left_to_place = counts.left_to_place.saturating_sub(1);
                counts.on_board += 1;
            }
            ClassicMove::Shift { from, to, .. } => {
                self.board.set(from, None);
                self.board.set(to, Some(mover));
            }
        }
        if let Some(victim) = mv.remove() {
            self.board.set(victim, None);
            let counts = self.counts_mut(mover.opposite());
            counts.on_board = counts.on_board.saturating_sub(1);
        }
        self.turn = mover.opposite();
    }

    fn undo(&mut self, mv: ClassicMove) {
        let mover = self.turn.opposite();
        self.turn = mover;
        if let Some(victim) = mv.remove() {
            self.board.set(victim, Some(mover.opposite()));
            self.counts_mut(mover.opposite()).on_board += 1;
        }
        match mv {
            ClassicMove::Place { to, .. } => {
                self.board.set(to, None);
                let counts = self.counts_mut(mover);
                counts.left_to_place += 1;
                counts.on_board = counts.on_board.saturating_sub(1);
            }
            ClassicMove::Shift { from, to, .. } => {
                self.board.set(to, None);
                self.board.set(from, Some(mover));
            }
        }
    }
}

/// Pieces on the board must agree with the counters, and no player may own
/// more than nine pieces in total.
pub fn counts_consistent(board: &Board, counts: &[PieceCounts; 2]) -> Result<(), Player> {
    for player in [Player::One, Player::Two] {
        let c = counts[player.index()];
        if !c.is_valid() || c.on_board != board.count(player) {
            return Err(player);
        }
    }
    Ok(())
}

#[must_use]
pub fn cell_in_range(cell: Cell) -> bool {
    usize::from(cell) < NUM_CELLS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::board::MILLS;
    use crate::logic::rules::is_in_mill;

    fn generate<P: Position>(pos: &P) -> Vec<P::Move> {
        let mut list = MoveList::new();
        pos.generate_moves(&mut list);
        list.to_vec()
    }

    #[test]
    fn test_simple_moves_are_empty_cells() {
        let board = Board::from_diagram("12...... ........ .......2").unwrap();
        let pos = SimplePosition::new(board, Player::One);
        let moves = generate(&pos);
        assert_eq!(moves.len(), 21);
        assert!(moves.iter().all(|m| board.get(m.to).is_none()));
    }

    #[test]
    fn test_simple_draw_when_all_pieces_placed() {
        // 9 pieces each, no line.
        let board = Board::from_diagram("12121212 21212121 12......").unwrap();
        assert_eq!(board.count(Player::One), 9);
        assert_eq!(board.count(Player::Two), 9);
        let pos = SimplePosition::new(board, Player::One);
        assert_eq!(pos.winner(), None);
        assert!(pos.is_draw());
        assert!(generate(&pos).is_empty());
    }

    #[test]
    fn test_classic_placing_generates_removals_for_mills() {
        let board = Board::from_diagram("11...... 2.2..... ..2.....").unwrap();
        let pos = ClassicPosition::from_board(board, [2, 3], Player::One);
        let moves = generate(&pos);
        let mill_moves: Vec<_> = moves.iter().filter(|m| m.to() == 2).collect();
        // Three removable opponent pieces, one generated move per removal.
        assert_eq!(mill_moves.len(), 3);
        assert!(mill_moves.iter().all(|m| m.remove().is_some()));
        assert!(moves.iter().filter(|m| m.to() != 2).all(|m| m.remove().is_none()));
    }

    #[test]
    fn test_classic_moving_uses_adjacency() {
        let board = Board::from_diagram("1.2.1.2. 1.2.1.2. 12......").unwrap();
        let pos = ClassicPosition::from_board(board, [9, 9], Player::One);
        assert_eq!(pos.phase(), Phase::Moving);
        for mv in generate(&pos) {
            let from = mv.from().unwrap();
            assert!(ADJACENCY[usize::from(from)].contains(&mv.to()));
            assert_eq!(board.get(from), Some(Player::One));
        }
    }

    #[test]
    fn test_classic_flying_reaches_every_empty_cell() {
        let board = Board::from_diagram("1...1... 1....... 22.2.2..").unwrap();
        let pos = ClassicPosition::from_board(board, [9, 9], Player::One);
        assert_eq!(pos.phase_of(Player::One), Phase::Flying);
        let moves = generate(&pos);
        let empties = board.empty_cells().count();
        let plain = moves.iter().filter(|m| m.remove().is_none()).count();
        let mills = moves.iter().filter(|m| m.remove().is_some()).count();
        // No flying move of these three pieces can line them up.
        assert_eq!(mills, 0);
        assert_eq!(plain, 3 * empties);
    }

    #[test]
    fn test_generated_moves_change_one_cell_and_flag_mills() {
        let positions = [
            ClassicPosition::from_board(
                Board::from_diagram("11.2.... 2.1..... ..2.....").unwrap(),
                [3, 3],
                Player::One,
            ),
            ClassicPosition::from_board(
                Board::from_diagram("1.12.2.. 1.2.1.2. 12.1.2..").unwrap(),
                [9, 9],
                Player::One,
            ),
        ];
        for pos in positions {
            for mv in generate(&pos) {
                let mut after = pos;
                after.apply(mv);
                let mover = pos.turn;
                let completes = MILLS
                    .iter()
                    .any(|l| l.contains(&mv.to()) && after.board.line_owner(l) == Some(mover));
                assert_eq!(pos.completes_mill(mv), completes, "{mv:?}");
                assert_eq!(mv.remove().is_some(), completes, "{mv:?}");

                let changed: Vec<Cell> = (0..NUM_CELLS as Cell)
                    .filter(|&c| pos.board.get(c) != after.board.get(c))
                    .filter(|&c| Some(c) != mv.remove())
                    .collect();
                match mv {
                    ClassicMove::Place { to, .. } => assert_eq!(changed, vec![to]),
                    ClassicMove::Shift { from, to, .. } => {
                        let mut expected = vec![from, to];
                        expected.sort_unstable();
                        assert_eq!(changed, expected);
                    }
                }
                if let Some(victim) = mv.remove() {
                    let others_free = pos
                        .board
                        .cells_of(mover.opposite())
                        .any(|c| !is_in_mill(&pos.board, c));
                    assert!(!others_free || !is_in_mill(&pos.board, victim));
                }

                after.undo(mv);
                assert_eq!(after, pos);
            }
        }
    }

    #[test]
    fn test_classic_loss_below_three_pieces() {
        let board = Board::from_diagram("11.1.... 22...... ........").unwrap();
        let pos = ClassicPosition::from_board(board, [9, 9], Player::Two);
        assert_eq!(pos.winner(), Some(Player::One));
    }

    #[test]
    fn test_classic_blocked_player_loses() {
        // Every corner piece of player two is boxed in by the outer mid-points.
        let board = Board::from_diagram("21212121 ........ ........").unwrap();
        let pos = ClassicPosition::from_board(board, [9, 9], Player::Two);
        assert_eq!(pos.phase_of(Player::Two), Phase::Moving);
        assert!(generate(&pos).is_empty());
        assert_eq!(pos.winner(), Some(Player::One));
    }
}
