#[cfg(test)]
mod tests {
    use morris_core::engine::agent::{choose_removal, Agent, MoveRequest};
    use morris_core::engine::config::{Difficulty, EngineConfig};
    use morris_core::engine::parallel::ParallelCoordinator;
    use morris_core::engine::search::AlphaBetaEngine;
    use morris_core::engine::{ChosenMove, SearchPlan, Searcher};
    use morris_core::logic::board::{Board, Player};
    use morris_core::logic::generator::{ClassicPosition, PieceCounts, SimplePosition};
    use std::sync::Arc;

    const SEARCHING: [Difficulty; 3] = [Difficulty::Basic, Difficulty::Deep, Difficulty::Maximal];

    fn board(diagram: &str) -> Board {
        Board::from_diagram(diagram).unwrap()
    }

    #[test]
    fn test_every_tier_takes_an_immediate_win() {
        let mut agent = Agent::with_seed(Arc::new(EngineConfig::default()), 1);
        for difficulty in SEARCHING {
            let request = MoveRequest::simple(&board("11...... 22...... ........"), Player::One, difficulty);
            assert_eq!(agent.choose_move(&request), ChosenMove::Simple { to: 2 }, "{difficulty:?}");
        }
    }

    #[test]
    fn test_every_tier_blocks_a_threat() {
        let mut agent = Agent::with_seed(Arc::new(EngineConfig::default()), 2);
        for difficulty in SEARCHING {
            let request = MoveRequest::simple(&board("11...... 2....... ........"), Player::Two, difficulty);
            assert_eq!(agent.choose_move(&request), ChosenMove::Simple { to: 2 }, "{difficulty:?}");
        }
    }

    #[test]
    fn test_classic_flying_win_with_removal() {
        // Player one has three pieces left and may fly 5 -> 2 to close 0-1-2.
        let position = ClassicPosition::new(
            board("11...1.. 22.2.... ........"),
            [PieceCounts { left_to_place: 0, on_board: 3 }; 2],
            Player::One,
        );
        let mut agent = Agent::with_seed(Arc::new(EngineConfig::default()), 3);
        for difficulty in SEARCHING {
            let mv = agent.choose_move(&MoveRequest::classic(&position, difficulty));
            let ChosenMove::Classic { from, to, remove } = mv else {
                panic!("expected a classic move, got {mv:?}");
            };
            assert_eq!((from, to), (Some(5), 2), "{difficulty:?}");
            assert!(matches!(remove, Some(8 | 9 | 11)), "{difficulty:?}");
        }
    }

    #[test]
    fn test_removal_prefers_setup_pieces() {
        // 8 and 9 both sit in player two's setup on 8-9-10; the lower cell
        // wins the tie and the loose piece on 20 is never chosen.
        let b = board("11...... 22...... ....2...");
        assert_eq!(choose_removal(&b, Player::Two), Some(8));
    }

    #[test]
    fn test_finished_game_yields_no_move() {
        let mut agent = Agent::new(Arc::new(EngineConfig::default()));
        let won = board("111..... 22...... 2.......");
        for difficulty in [Difficulty::Trivial, Difficulty::Deep] {
            let request = MoveRequest::simple(&won, Player::Two, difficulty);
            assert_eq!(agent.choose_move(&request), ChosenMove::NoMove);
        }
    }

    #[test]
    fn test_malformed_request_yields_no_move() {
        let mut agent = Agent::new(Arc::new(EngineConfig::default()));
        let mut request = MoveRequest::simple(&Board::new(), Player::One, Difficulty::Deep);
        request.cells.truncate(20);
        assert_eq!(agent.choose_move(&request), ChosenMove::NoMove);

        let mut request = MoveRequest::simple(&Board::new(), Player::One, Difficulty::Deep);
        request.lines = None;
        assert_eq!(agent.choose_move(&request), ChosenMove::NoMove);
    }

    #[test]
    fn test_request_survives_json() {
        let position = ClassicPosition::from_board(board("1.2..... .1...... ..2....."), [2, 2], Player::One);
        let request = MoveRequest::classic(&position, Difficulty::Maximal);
        let json = serde_json::to_string(&request).unwrap();
        let back: MoveRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
        assert_eq!(back.to_classic().unwrap(), position);
    }

    #[test]
    fn test_parallel_search_matches_sequential() {
        let config = Arc::new(EngineConfig {
            use_transposition: false,
            ..EngineConfig::default()
        });
        let pos = SimplePosition::new(board("1.2..1.. .2....1. ..2....."), Player::One);
        let plan = SearchPlan::fixed_depth(3);

        let mut engine = AlphaBetaEngine::new(config.clone());
        let (seq_move, seq_stats) = engine.search(&pos, plan).unwrap();

        let mut pool = ParallelCoordinator::with_workers(config, 3).unwrap();
        let (par_move, par_stats) = pool.search(&pos, plan, 10_000).unwrap();

        assert_eq!(par_move, seq_move);
        assert_eq!(par_stats.score, seq_stats.score);
        assert_eq!(par_stats.depth, 3);
    }

    #[test]
    fn test_config_file_overrides_profiles() {
        let json = r#"{
            "mill_score": 2.0,
            "use_transposition": false,
            "deep_profile": {
                "start_depth": 2,
                "depth_step": 2,
                "max_depth": 4,
                "time_limit_ms": 500,
                "worker_timeout_ms": 500
            }
        }"#;
        let config = EngineConfig::load_from_json(json).unwrap();
        let defaults = EngineConfig::default();
        assert_eq!(config.mill_score, defaults.mill_score * 2);
        assert!(!config.use_transposition);
        assert_eq!(config.deep_profile.max_depth, 4);
        assert_eq!(config.maximal_profile, defaults.maximal_profile);

        let mut agent = Agent::with_seed(Arc::new(config), 4);
        let request = MoveRequest::simple(&Board::new(), Player::One, Difficulty::Deep);
        assert!(matches!(agent.choose_move(&request), ChosenMove::Simple { .. }));
        assert!(agent.last_stats().is_some());
    }
}
