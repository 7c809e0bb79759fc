use crate::engine::config::EngineConfig;
use crate::engine::Evaluator;
use crate::logic::board::{Board, Cell, Player, ADJACENCY, LINES_THROUGH, MILLS, STRATEGIC_CELLS};
use crate::logic::generator::{ClassicPosition, Phase, SimplePosition};
use std::sync::Arc;

pub struct MorrisEvaluator {
    config: Arc<EngineConfig>,
}

/// Per-side line statistics gathered in one pass over the winning lines.
#[derive(Default)]
struct LineStats {
    setups: [i32; 2],
    singles: [i32; 2],
    mills: [i32; 2],
}

impl MorrisEvaluator {
    pub const fn new(config: Arc<EngineConfig>) -> Self {
        Self { config }
    }

    /// Score of a decided game. `depth` is the remaining search depth when
    /// the result was seen (negative inside quiescence), so a win found with
    /// more depth left, i.e. sooner, is worth strictly more and a loss found
    /// sooner strictly less.
    pub fn terminal_score(&self, winner: Player, perspective: Player, depth: i32) -> i32 {
        let magnitude = self.config.win_score + depth * self.config.depth_bonus;
        if winner == perspective {
            magnitude
        } else {
            -magnitude
        }
    }

    pub fn draw_score(&self) -> i32 {
        self.config.draw_score
    }

    /// A score that can only come from a decided game inside the nominal
    /// search depth.
    pub fn is_forced_win(&self, score: i32) -> bool {
        score >= self.config.win_score
    }

    fn line_stats(board: &Board) -> LineStats {
        let mut stats = LineStats::default();
        for line in &MILLS {
            let (one, two, empty) = board.line_counts(line, Player::One);
            match (one, two, empty) {
                (3, 0, 0) => stats.mills[0] += 1,
                (0, 3, 0) => stats.mills[1] += 1,
                (2, 0, 1) => stats.setups[0] += 1,
                (0, 2, 1) => stats.setups[1] += 1,
                (1, 0, 2) => stats.singles[0] += 1,
                (0, 1, 2) => stats.singles[1] += 1,
                _ => {}
            }
        }
        stats
    }

    /// Setups, open singles, setup edge and double setups from `me`'s view.
    fn line_score(&self, board: &Board, stats: &LineStats, me: Player) -> i32 {
        let cfg = &self.config;
        let (m, o) = (me.index(), me.opposite().index());

        let mut score = stats.setups[m] * cfg.setup_score - stats.setups[o] * cfg.opponent_setup_score;
        score += (stats.singles[m] - stats.singles[o]) * cfg.open_single_score / 3;
        score += (stats.setups[m] - stats.setups[o]) * cfg.setup_edge_score;

        for cell in board.empty_cells() {
            let mine = Self::setups_through(board, cell, me);
            let theirs = Self::setups_through(board, cell, me.opposite());
            if mine >= 2 {
                score += cfg.double_setup_score * mine;
            }
            if theirs >= 2 {
                score -= cfg.double_setup_score * theirs;
            }
        }
        score
    }

    /// Two-in-a-row lines of `player` that the empty `cell` would complete.
    fn setups_through(board: &Board, cell: Cell, player: Player) -> i32 {
        LINES_THROUGH[usize::from(cell)]
            .iter()
            .filter(|&&l| board.line_counts(&MILLS[l], player) == (2, 0, 1))
            .count() as i32
    }

    /// Lines through `cell` that hold no piece of `player`'s opponent.
    fn open_lines(board: &Board, cell: Cell, player: Player) -> i32 {
        LINES_THROUGH[usize::from(cell)]
            .iter()
            .filter(|&&l| board.line_counts(&MILLS[l], player).1 == 0)
            .count() as i32
    }

    fn strategic_score(&self, board: &Board, me: Player) -> i32 {
        STRATEGIC_CELLS
            .iter()
            .map(|&c| match board.get(c) {
                Some(p) if p == me => self.config.strategic_score,
                Some(_) => -self.config.strategic_score,
                None => 0,
            })
            .sum()
    }

    /// Empty cells `player` can reach, weighted by their open lines.
    fn mobility(board: &Board, player: Player, adjacent_only: bool) -> (i32, i32) {
        let mut reach = 0;
        let mut blocked = 0;
        if adjacent_only {
            for from in board.cells_of(player) {
                let mut free = 0;
                for &to in ADJACENCY[usize::from(from)] {
                    if board.get(to).is_none() {
                        free += 1;
                        reach += Self::open_lines(board, to, player);
                    }
                }
                if free == 0 {
                    blocked += 1;
                }
            }
        } else {
            for cell in board.empty_cells() {
                reach += Self::open_lines(board, cell, player);
            }
        }
        (reach, blocked)
    }

    /// Amplifies the accumulated score as the board empties.
    fn phase_scale(&self, score: i32, pieces_on_board: i32) -> i32 {
        let cfg = &self.config;
        let max_pieces = 18;
        let missing = (max_pieces - pieces_on_board.min(max_pieces)).max(0);
        let permille = 1000 + cfg.phase_base_permille + cfg.phase_growth_permille * missing / max_pieces;
        score.saturating_mul(permille) / 1000
    }

    fn endgame_bonus(&self, pieces_on_board: i32, material_edge: i32) -> i32 {
        if pieces_on_board <= i32::from(self.config.endgame_threshold) && material_edge != 0 {
            material_edge * self.config.endgame_bonus
        } else {
            0
        }
    }

    /// Keeps heuristic scores well away from decided-game scores.
    fn clamp(&self, score: i32) -> i32 {
        let cap = self.config.win_score / 2;
        score.clamp(-cap, cap)
    }
}

impl Evaluator<SimplePosition> for MorrisEvaluator {
    fn evaluate(&self, position: &SimplePosition, me: Player) -> i32 {
        let board = &position.board;
        let cfg = &self.config;
        let stats = Self::line_stats(board);

        let mut score = self.line_score(board, &stats, me);

        let mine = i32::from(board.count(me));
        let theirs = i32::from(board.count(me.opposite()));
        score += (mine - theirs) * cfg.material_score;
        score += self.strategic_score(board, me);

        let (my_reach, _) = Self::mobility(board, me, false);
        let (their_reach, _) = Self::mobility(board, me.opposite(), false);
        score += (my_reach - their_reach) * cfg.mobility_score;

        let on_board = mine + theirs;
        score = self.phase_scale(score, on_board);
        score += self.endgame_bonus(on_board, mine - theirs);
        self.clamp(score)
    }
}

impl Evaluator<ClassicPosition> for MorrisEvaluator {
    fn evaluate(&self, position: &ClassicPosition, me: Player) -> i32 {
        let board = &position.board;
        let cfg = &self.config;
        let stats = Self::line_stats(board);
        let (m, o) = (me.index(), me.opposite().index());

        let mut score = self.line_score(board, &stats, me);
        score += (stats.mills[m] - stats.mills[o]) * cfg.mill_score;

        let mine = position.counts_of(me);
        let theirs = position.counts_of(me.opposite());
        let material = i32::from(mine.on_board + mine.left_to_place)
            - i32::from(theirs.on_board + theirs.left_to_place);
        score += material * cfg.classic_material_score;
        score += self.strategic_score(board, me);

        let adjacent = |p: Player| position.phase_of(p) == Phase::Moving;
        let (my_reach, my_blocked) = Self::mobility(board, me, adjacent(me));
        let (their_reach, their_blocked) = Self::mobility(board, me.opposite(), adjacent(me.opposite()));
        score += (my_reach - their_reach) * cfg.mobility_score;
        score -= (my_blocked - their_blocked) * cfg.blocked_piece_score;

        let on_board = i32::from(mine.on_board) + i32::from(theirs.on_board);
        score = self.phase_scale(score, on_board);
        if position.phase() != Phase::Placing {
            score += self.endgame_bonus(on_board, i32::from(mine.on_board) - i32::from(theirs.on_board));
        }
        self.clamp(score)
    }
}
