use crate::engine::config::EngineConfig;
use crate::engine::eval::MorrisEvaluator;
use crate::engine::move_list::MoveList;
use crate::engine::order::order_moves;
use crate::engine::tt::{TTFlag, TranspositionTable};
use crate::engine::{Evaluator, Position, SearchPlan, SearchResult, SearchStats, Searcher};
use crate::logic::board::Player;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const INFINITY: i32 = i32::MAX / 2;

/// Milliseconds on a monotonic-enough clock.
pub fn now() -> f64 {
    #[cfg(target_arch = "wasm32")]
    {
        use wasm_bindgen::JsCast;
        if let Some(window) = web_sys::window() {
            return window.performance().map(|p| p.now()).unwrap_or(0.0);
        }
        let global = js_sys::global();
        if let Ok(worker) = global.dyn_into::<web_sys::WorkerGlobalScope>() {
            return worker.performance().map(|p| p.now()).unwrap_or(0.0);
        }
        0.0
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        use std::time::{SystemTime, UNIX_EPOCH};
        let since_the_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        #[allow(clippy::cast_precision_loss)]
        let time_ms = (since_the_epoch.as_secs() as f64).mul_add(
            1000.0,
            f64::from(since_the_epoch.subsec_nanos()) / 1_000_000.0,
        );
        time_ms
    }
}

/// A searched root move. `index` is its position in the root ordering and
/// breaks ties between equal scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCandidate<M> {
    pub mv: M,
    pub score: i32,
    pub index: usize,
}

impl<M> RootCandidate<M> {
    /// Higher score wins, then the earlier root move.
    pub fn beats(&self, other: &Self) -> bool {
        self.score > other.score || (self.score == other.score && self.index < other.index)
    }
}

/// Result of searching a batch of root moves. `completed` is false when the
/// clock ran out before every move was searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootOutcome<M> {
    pub best: Option<RootCandidate<M>>,
    pub completed: bool,
    pub nodes: u64,
}

pub struct AlphaBetaEngine<P: Position> {
    config: Arc<EngineConfig>,
    evaluator: MorrisEvaluator,
    tt: TranspositionTable<P::Move>,
    root_player: Player,
    nodes_searched: u64,
    seldepth: u32,
    start_time: f64,
    time_limit: Option<f64>,
}

impl<P> AlphaBetaEngine<P>
where
    P: Position,
    MorrisEvaluator: Evaluator<P>,
{
    pub fn new(config: Arc<EngineConfig>) -> Self {
        Self {
            evaluator: MorrisEvaluator::new(config.clone()),
            tt: TranspositionTable::new(config.tt_size_mb),
            config,
            root_player: Player::One,
            nodes_searched: 0,
            seldepth: 0,
            start_time: 0.0,
            time_limit: None,
        }
    }

    pub const fn evaluator(&self) -> &MorrisEvaluator {
        &self.evaluator
    }

    pub const fn nodes_searched(&self) -> u64 {
        self.nodes_searched
    }

    /// Starts a new decision: fresh cache, fresh counters, new clock.
    pub fn reset(&mut self, root_player: Player, time_limit_ms: Option<u64>) {
        self.tt.clear();
        self.root_player = root_player;
        self.nodes_searched = 0;
        self.seldepth = 0;
        self.start_time = now();
        #[allow(clippy::cast_precision_loss)]
        {
            self.time_limit = time_limit_ms.map(|t| t as f64);
        }
    }

    pub fn elapsed_ms(&self) -> f64 {
        now() - self.start_time
    }

    #[allow(clippy::manual_is_multiple_of)]
    fn check_time(&self) -> bool {
        if let Some(limit) = self.time_limit {
            if self.nodes_searched % 1024 == 0 && self.elapsed_ms() > limit {
                return true;
            }
        }
        false
    }

    /// Root moves in search order: ordered for the side to move, with
    /// `previous_best` first when it is among them.
    pub fn root_moves(&self, position: &P, previous_best: Option<P::Move>) -> Vec<P::Move> {
        let mut moves = MoveList::new();
        position.generate_moves(&mut moves);
        order_moves(position, &mut moves, &self.evaluator, true, &self.config);
        if let Some(mv) = previous_best {
            moves.move_to_front(mv);
        }
        moves.to_vec()
    }

    /// Score of a position whose game is over, if it is.
    fn terminal(&self, position: &P, depth: i32) -> Option<i32> {
        if let Some(winner) = position.winner() {
            return Some(self.evaluator.terminal_score(winner, self.root_player, depth));
        }
        position.is_draw().then(|| self.evaluator.draw_score())
    }

    /// Alpha-beta minimax. Scores are from the root player's point of view.
    /// Returns `None` once the clock has run out; the position is restored
    /// either way.
    pub fn minimax(
        &mut self,
        position: &mut P,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        is_maximizing: bool,
        ply: u32,
    ) -> Option<i32> {
        self.nodes_searched += 1;
        self.seldepth = self.seldepth.max(ply);
        if self.check_time() {
            return None;
        }

        let key = position.key();
        let stored_depth = u8::try_from(depth.max(0)).unwrap_or(u8::MAX);
        let use_tt = self.config.use_transposition && depth > 0;
        if use_tt {
            if let Some(entry) = self.tt.probe(key) {
                if let Some(score) = entry.cutoff(stored_depth, alpha, beta) {
                    return Some(score);
                }
            }
        }

        if let Some(score) = self.terminal(position, depth) {
            return Some(score);
        }

        if depth <= 0 {
            return self.quiescence(position, depth, alpha, beta, is_maximizing, ply);
        }

        let mut moves = MoveList::new();
        position.generate_moves(&mut moves);
        if moves.is_empty() {
            return Some(self.evaluator.draw_score());
        }
        order_moves(position, &mut moves, &self.evaluator, is_maximizing, &self.config);
        if use_tt {
            if let Some(mv) = self.tt.get_move(key) {
                moves.move_to_front(mv);
            }
        }

        let alpha_orig = alpha;
        let beta_orig = beta;
        let mut best_score = if is_maximizing { -INFINITY } else { INFINITY };
        let mut best_move = None;

        for mv in moves {
            position.apply(mv);
            let result = self.minimax(position, depth - 1, alpha, beta, !is_maximizing, ply + 1);
            position.undo(mv);
            let score = result?;

            if is_maximizing {
                if score > best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                alpha = alpha.max(score);
            } else {
                if score < best_score {
                    best_score = score;
                    best_move = Some(mv);
                }
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }

        if use_tt {
            let flag = if best_score <= alpha_orig {
                TTFlag::UpperBound
            } else if best_score >= beta_orig {
                TTFlag::LowerBound
            } else {
                TTFlag::Exact
            };
            self.tt.store(key, best_move, best_score, stored_depth, flag);
        }

        Some(best_score)
    }

    /// Tactical extension past the horizon. `depth` keeps counting down
    /// below zero so decided games found here still prefer the quicker win,
    /// and at most `quiescence_depth` plies are added.
    fn quiescence(
        &mut self,
        position: &mut P,
        depth: i32,
        mut alpha: i32,
        mut beta: i32,
        is_maximizing: bool,
        ply: u32,
    ) -> Option<i32> {
        self.seldepth = self.seldepth.max(ply);
        let quiet_plies = i32::from(self.config.quiescence_depth) + depth;
        let stand_pat = self.evaluator.evaluate(position, self.root_player);
        if quiet_plies <= 0 {
            return Some(stand_pat);
        }

        if is_maximizing {
            if stand_pat >= beta {
                return Some(stand_pat);
            }
            alpha = alpha.max(stand_pat);
        } else {
            if stand_pat <= alpha {
                return Some(stand_pat);
            }
            beta = beta.min(stand_pat);
        }

        let mut moves = MoveList::new();
        position.generate_moves(&mut moves);
        moves.retain(|&mv| position.tactics(mv).is_tactical());
        order_moves(position, &mut moves, &self.evaluator, is_maximizing, &self.config);

        let mut best_score = stand_pat;
        for mv in moves {
            position.apply(mv);
            self.nodes_searched += 1;
            let result = if self.check_time() {
                None
            } else if let Some(score) = self.terminal(position, depth - 1) {
                Some(score)
            } else {
                self.quiescence(position, depth - 1, alpha, beta, !is_maximizing, ply + 1)
            };
            position.undo(mv);
            let score = result?;

            if is_maximizing {
                best_score = best_score.max(score);
                alpha = alpha.max(score);
            } else {
                best_score = best_score.min(score);
                beta = beta.min(score);
            }
            if beta <= alpha {
                break;
            }
        }
        Some(best_score)
    }

    /// Searches `moves` (each tagged with its root order index) from a
    /// shared window. The first move reaching the best score is kept, so
    /// ties go to the lowest index.
    pub fn search_root(
        &mut self,
        position: &mut P,
        moves: &[(usize, P::Move)],
        depth: u8,
        mut alpha: i32,
        mut beta: i32,
        is_maximizing: bool,
    ) -> RootOutcome<P::Move> {
        let start_nodes = self.nodes_searched;
        let mut best: Option<RootCandidate<P::Move>> = None;
        let mut completed = true;

        for &(index, mv) in moves {
            position.apply(mv);
            let result = self.minimax(
                position,
                i32::from(depth) - 1,
                alpha,
                beta,
                !is_maximizing,
                1,
            );
            position.undo(mv);

            let Some(score) = result else {
                completed = false;
                break;
            };
            let improves = best.map_or(true, |b| {
                if is_maximizing {
                    score > b.score
                } else {
                    score < b.score
                }
            });
            if improves {
                best = Some(RootCandidate { mv, score, index });
            }
            if is_maximizing {
                alpha = alpha.max(score);
            } else {
                beta = beta.min(score);
            }
        }

        RootOutcome {
            best,
            completed,
            nodes: self.nodes_searched - start_nodes,
        }
    }

    /// One full-width root search at `depth` with a fresh window.
    pub fn search_depth(&mut self, position: &P, depth: u8) -> SearchResult<P::Move> {
        self.reset(position.side_to_move(), None);
        let moves: Vec<(usize, P::Move)> = self.root_moves(position, None).into_iter().enumerate().collect();
        let mut scratch = position.clone();
        let outcome = self.search_root(&mut scratch, &moves, depth, -INFINITY, INFINITY, true);
        SearchResult {
            best_move: outcome.best.map(|b| b.mv),
            score: outcome.best.map_or(self.evaluator.draw_score(), |b| b.score),
        }
    }
}

impl<P> Searcher<P> for AlphaBetaEngine<P>
where
    P: Position,
    MorrisEvaluator: Evaluator<P>,
{
    fn search(&mut self, position: &P, plan: SearchPlan) -> Option<(P::Move, SearchStats)> {
        self.reset(position.side_to_move(), plan.time_limit_ms);
        let soft_limit = self.time_limit.map(|t| t * f64::from(self.config.soft_time_ratio));

        let mut scratch = position.clone();
        let mut root = self.root_moves(position, None);
        let fallback = root.first().copied()?;

        let mut best: Option<RootCandidate<P::Move>> = None;
        let mut final_depth = 0;
        let step = plan.depth_step.max(1);
        let mut depth = plan.start_depth.max(1);

        while depth <= plan.max_depth {
            // Check soft limit before starting new depth
            if let Some(sl) = soft_limit {
                if best.is_some() && self.elapsed_ms() > sl {
                    break;
                }
            }

            if let Some(prev) = best {
                if let Some(pos) = root.iter().position(|&m| m == prev.mv) {
                    root[..=pos].rotate_right(1);
                }
            }
            let tagged: Vec<(usize, P::Move)> = root.iter().copied().enumerate().collect();
            let outcome = self.search_root(&mut scratch, &tagged, depth, -INFINITY, INFINITY, true);

            if !outcome.completed {
                // Partial rounds only count when nothing completed before.
                if best.is_none() && outcome.best.is_some() {
                    best = outcome.best;
                    final_depth = depth;
                }
                log::debug!("depth {depth} timed out after {} nodes", self.nodes_searched);
                break;
            }

            if let Some(found) = outcome.best {
                log::debug!(
                    "depth {depth}/{}: best {:?} score {} nodes {} time {:.0}ms",
                    self.seldepth,
                    found.mv,
                    found.score,
                    self.nodes_searched,
                    self.elapsed_ms()
                );
                best = Some(found);
                final_depth = depth;
                if self.evaluator.is_forced_win(found.score) {
                    break;
                }
            }

            std::thread::yield_now();
            match depth.checked_add(step) {
                Some(next) => depth = next,
                None => break,
            }
        }

        let (mv, score) = match best {
            Some(b) => (b.mv, b.score),
            None => {
                log::warn!("no search round finished, playing the top ordered move");
                (fallback, self.evaluator.evaluate(position, position.side_to_move()))
            }
        };
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let time_ms = self.elapsed_ms() as u64;
        Some((
            mv,
            SearchStats {
                depth: final_depth,
                nodes: self.nodes_searched,
                time_ms,
                score,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ClassicMove, SimpleMove};
    use crate::logic::board::Board;
    use crate::logic::generator::{ClassicPosition, SimplePosition};

    fn config(quiescence_depth: u8, use_transposition: bool) -> Arc<EngineConfig> {
        Arc::new(EngineConfig {
            quiescence_depth,
            use_transposition,
            tt_size_mb: 1,
            ..EngineConfig::default()
        })
    }

    fn simple(diagram: &str, turn: Player) -> SimplePosition {
        SimplePosition::new(Board::from_diagram(diagram).unwrap(), turn)
    }

    /// Plain minimax over the same tree, no pruning and no cache.
    fn brute_force<P: Position>(
        eval: &MorrisEvaluator,
        pos: &mut P,
        depth: i32,
        is_maximizing: bool,
        root: Player,
    ) -> i32
    where
        MorrisEvaluator: Evaluator<P>,
    {
        if let Some(winner) = pos.winner() {
            return eval.terminal_score(winner, root, depth);
        }
        if pos.is_draw() {
            return eval.draw_score();
        }
        if depth == 0 {
            return eval.evaluate(pos, root);
        }
        let mut moves = MoveList::new();
        pos.generate_moves(&mut moves);
        if moves.is_empty() {
            return eval.draw_score();
        }
        let mut best = if is_maximizing { -INFINITY } else { INFINITY };
        for mv in moves {
            pos.apply(mv);
            let score = brute_force(eval, pos, depth - 1, !is_maximizing, root);
            pos.undo(mv);
            best = if is_maximizing { best.max(score) } else { best.min(score) };
        }
        best
    }

    fn assert_matches_brute_force<P: Position + PartialEq + std::fmt::Debug>(pos: &P, depth: u8)
    where
        MorrisEvaluator: Evaluator<P>,
    {
        for use_tt in [false, true] {
            let mut engine: AlphaBetaEngine<P> = AlphaBetaEngine::new(config(0, use_tt));
            let result = engine.search_depth(pos, depth);
            let mut scratch = pos.clone();
            let expected = brute_force(
                engine.evaluator(),
                &mut scratch,
                i32::from(depth),
                true,
                pos.side_to_move(),
            );
            assert_eq!(result.score, expected, "tt={use_tt} depth={depth}");
            assert_eq!(&scratch, pos);
        }
    }

    #[test]
    fn test_alpha_beta_matches_minimax_simple() {
        let p2_to_block = simple("1.2.1.2. .21..2.. 11.2....", Player::Two);
        let p1_to_win = simple("1.2.1.2. .21..2.. 11.2....", Player::One);
        let late = simple("12121212 2121212. ........", Player::One);
        for depth in 1..=3 {
            assert_matches_brute_force(&p2_to_block, depth);
            assert_matches_brute_force(&p1_to_win, depth);
        }
        assert_matches_brute_force(&late, 4);
    }

    #[test]
    fn test_alpha_beta_matches_minimax_classic() {
        let moving = ClassicPosition::from_board(
            Board::from_diagram("1.2.1.2. 1.2.1.2. 12......").unwrap(),
            [9, 9],
            Player::One,
        );
        let placing = ClassicPosition::from_board(
            Board::from_diagram("11...... 2.2..... ..2.....").unwrap(),
            [2, 3],
            Player::One,
        );
        for depth in 1..=3 {
            assert_matches_brute_force(&moving, depth);
        }
        assert_matches_brute_force(&placing, 2);
    }

    #[test]
    fn test_immediate_win_at_every_depth() {
        let pos = simple("22...... 1....... 1.......", Player::Two);
        for depth in 1..=4 {
            let mut engine = AlphaBetaEngine::new(config(3, true));
            let (mv, stats) = engine.search(&pos, SearchPlan::fixed_depth(depth)).unwrap();
            assert_eq!(mv, SimpleMove { to: 2 }, "depth {depth}");
            assert!(engine.evaluator().is_forced_win(stats.score));
        }
    }

    #[test]
    fn test_forced_block() {
        let pos = simple("11...... 2....... ........", Player::Two);
        for depth in 2..=4 {
            let mut engine = AlphaBetaEngine::new(config(3, true));
            let (mv, _) = engine.search(&pos, SearchPlan::fixed_depth(depth)).unwrap();
            assert_eq!(mv, SimpleMove { to: 2 }, "depth {depth}");
        }
    }

    #[test]
    fn test_quicker_win_is_preferred() {
        // Cell 2 wins now. Other moves keep threats that only win later.
        let pos = simple("22...... 1...2... 1.......", Player::Two);
        let mut engine = AlphaBetaEngine::new(config(3, true));
        let (mv, _) = engine.search(&pos, SearchPlan::fixed_depth(5)).unwrap();
        assert_eq!(mv, SimpleMove { to: 2 });
    }

    #[test]
    fn test_exhausted_placement_scores_as_draw() {
        let mut pos = simple("12121212 21212121 12......", Player::One);
        let mut engine: AlphaBetaEngine<SimplePosition> = AlphaBetaEngine::new(config(3, true));
        engine.reset(Player::One, None);
        assert_eq!(engine.minimax(&mut pos, 4, -INFINITY, INFINITY, true, 0), Some(0));
        assert!(engine.search(&pos, SearchPlan::fixed_depth(3)).is_none());
    }

    #[test]
    fn test_minimax_restores_position() {
        let before = ClassicPosition::from_board(
            Board::from_diagram("11.2.... 2.1..... ..2.....").unwrap(),
            [3, 3],
            Player::One,
        );
        let mut pos = before;
        let mut engine: AlphaBetaEngine<ClassicPosition> = AlphaBetaEngine::new(config(3, true));
        engine.reset(Player::One, None);
        assert!(engine.minimax(&mut pos, 3, -INFINITY, INFINITY, true, 0).is_some());
        assert_eq!(pos, before);

        // A search cut short by the clock must restore the position too.
        engine.reset(Player::One, Some(0));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let _ = engine.minimax(&mut pos, 6, -INFINITY, INFINITY, true, 0);
        assert_eq!(pos, before);
    }

    #[test]
    fn test_tt_hits_agree_with_fresh_search() {
        let pos = simple("1.2.1.2. .21..2.. 11.2....", Player::Two);
        let mut cached = AlphaBetaEngine::new(config(2, true));
        let mut fresh = AlphaBetaEngine::new(config(2, false));
        for depth in 1..=4 {
            let a = cached.search_depth(&pos, depth);
            let b = fresh.search_depth(&pos, depth);
            assert_eq!(a.score, b.score, "depth {depth}");
        }
    }

    #[test]
    fn test_tiny_budget_still_returns_legal_move() {
        let pos = simple("........ ........ ........", Player::One);
        let mut engine = AlphaBetaEngine::new(config(3, true));
        let plan = SearchPlan {
            start_depth: 1,
            depth_step: 1,
            max_depth: 12,
            time_limit_ms: Some(1),
        };
        let (mv, _) = engine.search(&pos, plan).unwrap();
        assert!(pos.board.is_empty_cell(mv.to));
    }

    #[test]
    fn test_classic_search_takes_the_mill() {
        let pos = ClassicPosition::from_board(
            Board::from_diagram("11...... 2.2..... ..2.....").unwrap(),
            [2, 3],
            Player::One,
        );
        let mut engine = AlphaBetaEngine::new(config(3, true));
        let (mv, _) = engine.search(&pos, SearchPlan::fixed_depth(2)).unwrap();
        assert_eq!(mv.to(), 2);
        assert!(matches!(mv, ClassicMove::Place { remove: Some(_), .. }));
    }

    #[test]
    fn test_quiescence_sees_mill_past_horizon() {
        // Player two threatens both 0-1-2 and 4-5-6; one placement cannot stop both.
        let pos = simple("22..22.. .1...1.. ...1...1", Player::One);
        let defaults = EngineConfig::default();

        let mut flat = AlphaBetaEngine::new(config(0, false));
        let flat_score = flat.search_depth(&pos, 1).score;
        assert!(flat_score >= -defaults.win_score / 2);
        assert_eq!(flat.seldepth, 1);

        let mut extended = AlphaBetaEngine::new(config(2, false));
        let extended_score = extended.search_depth(&pos, 1).score;
        assert_eq!(extended_score, -(defaults.win_score - defaults.depth_bonus));
        assert!(extended.seldepth >= 2);
    }

    #[test]
    fn test_quiescence_stands_pat_without_tactics() {
        // After any first placement the reply has nothing tactical to play.
        let pos = simple("........ ........ ........", Player::One);
        let flat = AlphaBetaEngine::new(config(0, false)).search_depth(&pos, 1);
        let extended = AlphaBetaEngine::new(config(3, false)).search_depth(&pos, 1);
        assert_eq!(flat.score, extended.score);
    }

    #[test]
    fn test_timed_out_round_keeps_last_completed_depth() {
        let cfg = Arc::new(EngineConfig {
            quiescence_depth: 2,
            use_transposition: false,
            soft_time_ratio: 1.0,
            tt_size_mb: 1,
            ..EngineConfig::default()
        });
        let pos = simple("1....... ........ .......2", Player::One);
        let plan = SearchPlan {
            start_depth: 1,
            depth_step: 1,
            max_depth: 30,
            time_limit_ms: Some(60),
        };
        let mut engine = AlphaBetaEngine::new(cfg.clone());
        let (mv, stats) = engine.search(&pos, plan).unwrap();
        assert!(stats.depth >= 1 && stats.depth < 30);
        assert!(pos.board.is_empty_cell(mv.to));

        // The reported score is the exact value of the deepest finished round,
        // not whatever the interrupted round had seen.
        let reference = AlphaBetaEngine::new(cfg).search_depth(&pos, stats.depth);
        assert_eq!(stats.score, reference.score);
    }
}
