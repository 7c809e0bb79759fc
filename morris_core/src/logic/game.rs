use crate::engine::agent::{MoveRequest, Variant};
use crate::engine::config::Difficulty;
use crate::engine::move_list::MoveList;
use crate::engine::{ChosenMove, ClassicMove, Position, SimpleMove};
use crate::logic::board::{Board, Player};
use crate::logic::generator::{cell_in_range, ClassicPosition, Phase, PieceCounts, SimplePosition};
use crate::logic::rules::{analyze_move, is_adjacent, removable_pieces, MoveError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    Playing,
    Won(Player),
    Draw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    pub player: Player,
    pub mv: ChosenMove,
}

/// The authoritative game a host plays on. Only committed moves change it;
/// the engine works on copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub variant: Variant,
    pub board: Board,
    pub counts: [PieceCounts; 2],
    pub turn: Player,
    pub status: GameStatus,
    pub history: Vec<MoveRecord>,
}

impl GameState {
    #[must_use]
    pub fn new(variant: Variant) -> Self {
        Self {
            variant,
            board: Board::new(),
            counts: [PieceCounts::fresh(); 2],
            turn: Player::One,
            status: GameStatus::Playing,
            history: Vec::new(),
        }
    }

    pub fn simple_position(&self) -> SimplePosition {
        SimplePosition::new(self.board, self.turn)
    }

    pub fn classic_position(&self) -> ClassicPosition {
        ClassicPosition::new(self.board, self.counts, self.turn)
    }

    /// The request a host sends to the engine for the player to move.
    pub fn to_request(&self, difficulty: Difficulty) -> MoveRequest {
        match self.variant {
            Variant::Simple => MoveRequest::simple(&self.board, self.turn, difficulty),
            Variant::Classic => MoveRequest::classic(&self.classic_position(), difficulty),
        }
    }

    pub fn phase(&self) -> Phase {
        match self.variant {
            Variant::Simple => Phase::Placing,
            Variant::Classic => self.classic_position().phase(),
        }
    }

    pub fn make_move(&mut self, mv: ChosenMove) -> Result<(), MoveError> {
        if self.status != GameStatus::Playing {
            return Err(MoveError::GameOver);
        }

        match (self.variant, mv) {
            (Variant::Simple, ChosenMove::Simple { to }) => self.place_simple(to)?,
            (Variant::Classic, ChosenMove::Classic { from, to, remove }) => {
                let checked = self.validate_classic(from, to, remove)?;
                let mut position = self.classic_position();
                position.apply(checked);
                // Covers the opponent dropping below three and being blocked.
                self.board = position.board;
                self.counts = position.counts;
                self.status = position
                    .winner()
                    .map_or(GameStatus::Playing, GameStatus::Won);
            }
            _ => return Err(MoveError::WrongVariant),
        }

        let player = self.turn;
        self.history.push(MoveRecord { player, mv });
        self.turn = player.opposite();
        log::debug!("{player:?} played {mv:?}, status {:?}", self.status);
        Ok(())
    }

    fn place_simple(&mut self, to: u8) -> Result<(), MoveError> {
        if !cell_in_range(to) {
            return Err(MoveError::OutOfBounds(to));
        }
        if !self.board.is_empty_cell(to) {
            return Err(MoveError::TargetOccupied(to));
        }
        let mut position = self.simple_position();
        let mut moves = MoveList::new();
        position.generate_moves(&mut moves);
        if moves.is_empty() {
            return Err(MoveError::NothingToPlace);
        }

        position.apply(SimpleMove { to });
        self.board = position.board;
        let counts = &mut self.counts[self.turn.index()];
        counts.left_to_place = counts.left_to_place.saturating_sub(1);
        counts.on_board += 1;

        self.status = match position.winner() {
            Some(winner) => GameStatus::Won(winner),
            None if position.is_draw() => GameStatus::Draw,
            None => GameStatus::Playing,
        };
        Ok(())
    }

    fn validate_classic(
        &self,
        from: Option<u8>,
        to: u8,
        remove: Option<u8>,
    ) -> Result<ClassicMove, MoveError> {
        let position = self.classic_position();
        let mover = self.turn;

        for cell in [Some(to), from, remove].into_iter().flatten() {
            if !cell_in_range(cell) {
                return Err(MoveError::OutOfBounds(cell));
            }
        }
        if !self.board.is_empty_cell(to) {
            return Err(MoveError::TargetOccupied(to));
        }

        let base = match (position.phase_of(mover), from) {
            (Phase::Placing, None) => ClassicMove::Place { to, remove: None },
            (Phase::Placing, Some(_)) => return Err(MoveError::StillPlacing),
            (_, None) => return Err(MoveError::NothingToPlace),
            (phase, Some(from)) => {
                if self.board.get(from) != Some(mover) {
                    return Err(MoveError::NoPieceAtSource(from));
                }
                if phase == Phase::Moving && !is_adjacent(from, to) {
                    return Err(MoveError::NotAdjacent { from, to });
                }
                ClassicMove::Shift {
                    from,
                    to,
                    remove: None,
                }
            }
        };

        let victims = removable_pieces(&self.board, mover.opposite());
        let completes = analyze_move(&self.board, mover, from, to).completes_mill;
        match (completes && !victims.is_empty(), remove) {
            (true, None) => Err(MoveError::RemovalRequired),
            (true, Some(cell)) if !victims.contains(&cell) => Err(MoveError::IllegalRemoval(cell)),
            (true, Some(cell)) => Ok(base.with_remove(Some(cell))),
            (false, Some(_)) => Err(MoveError::RemovalNotAllowed),
            (false, None) => Ok(base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic(moves: &[(Option<u8>, u8, Option<u8>)]) -> GameState {
        let mut game = GameState::new(Variant::Classic);
        for &(from, to, remove) in moves {
            game.make_move(ChosenMove::Classic { from, to, remove }).unwrap();
        }
        game
    }

    fn place(to: u8) -> (Option<u8>, u8, Option<u8>) {
        (None, to, None)
    }

    #[test]
    fn test_simple_line_wins() {
        let mut game = GameState::new(Variant::Simple);
        for to in [0, 8, 1, 9] {
            game.make_move(ChosenMove::Simple { to }).unwrap();
        }
        assert_eq!(game.status, GameStatus::Playing);
        game.make_move(ChosenMove::Simple { to: 2 }).unwrap();
        assert_eq!(game.status, GameStatus::Won(Player::One));
        assert_eq!(
            game.make_move(ChosenMove::Simple { to: 10 }),
            Err(MoveError::GameOver)
        );
    }

    #[test]
    fn test_simple_rejects_bad_moves() {
        let mut game = GameState::new(Variant::Simple);
        game.make_move(ChosenMove::Simple { to: 4 }).unwrap();
        assert_eq!(game.make_move(ChosenMove::Simple { to: 4 }), Err(MoveError::TargetOccupied(4)));
        assert_eq!(game.make_move(ChosenMove::Simple { to: 30 }), Err(MoveError::OutOfBounds(30)));
        assert_eq!(
            game.make_move(ChosenMove::Classic { from: None, to: 5, remove: None }),
            Err(MoveError::WrongVariant)
        );
        assert_eq!(game.turn, Player::Two);
    }

    #[test]
    fn test_classic_mill_requires_legal_removal() {
        let mut game = classic(&[place(0), place(8), place(1), place(9)]);
        assert_eq!(
            game.make_move(ChosenMove::Classic { from: None, to: 2, remove: None }),
            Err(MoveError::RemovalRequired)
        );
        assert_eq!(
            game.make_move(ChosenMove::Classic { from: None, to: 2, remove: Some(0) }),
            Err(MoveError::IllegalRemoval(0))
        );
        game.make_move(ChosenMove::Classic { from: None, to: 2, remove: Some(9) }).unwrap();
        assert_eq!(game.board.get(9), None);
        assert_eq!(game.counts[Player::Two.index()].on_board, 1);
        assert_eq!(game.counts[Player::One.index()].left_to_place, 6);
        assert_eq!(
            game.make_move(ChosenMove::Classic { from: None, to: 3, remove: Some(0) }),
            Err(MoveError::RemovalNotAllowed)
        );
    }

    #[test]
    fn test_classic_moving_phase_rules() {
        let mut game = GameState::new(Variant::Classic);
        game.board = Board::from_diagram("1.2.1.2. 1.2.1.2. 12......").unwrap();
        game.counts = [PieceCounts { left_to_place: 0, on_board: 5 }; 2];
        assert_eq!(game.phase(), Phase::Moving);

        let shift = |from, to| ChosenMove::Classic { from, to, remove: None };
        assert_eq!(game.make_move(shift(None, 1)), Err(MoveError::NothingToPlace));
        assert_eq!(game.make_move(shift(Some(2), 1)), Err(MoveError::NoPieceAtSource(2)));
        assert_eq!(
            game.make_move(shift(Some(0), 3)),
            Err(MoveError::NotAdjacent { from: 0, to: 3 })
        );
        game.make_move(shift(Some(0), 1)).unwrap();
        assert_eq!(game.board.get(1), Some(Player::One));
        assert_eq!(game.turn, Player::Two);
    }

    #[test]
    fn test_classic_loss_when_reduced_to_two() {
        let mut game = GameState::new(Variant::Classic);
        game.board = Board::from_diagram("11...1.. 22.2.... ........").unwrap();
        game.counts = [
            PieceCounts { left_to_place: 0, on_board: 3 },
            PieceCounts { left_to_place: 0, on_board: 3 },
        ];
        // Player one flies 5 -> 2 and completes 0-1-2.
        game.make_move(ChosenMove::Classic { from: Some(5), to: 2, remove: Some(11) }).unwrap();
        assert_eq!(game.status, GameStatus::Won(Player::One));
    }

    #[test]
    fn test_request_round_trips_position() {
        let game = classic(&[place(0), place(8), place(1)]);
        let request = game.to_request(Difficulty::Deep);
        assert_eq!(request.to_classic().unwrap(), game.classic_position());
    }
}
