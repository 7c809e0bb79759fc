use crate::engine::config::EngineConfig;
use crate::engine::move_list::MoveList;
use crate::engine::{Evaluator, Position};

/// Priority of `mv` for the side to move in `scratch`. The position is
/// stepped into and back out of the move for the shallow evaluation.
pub fn move_priority<P, E>(scratch: &mut P, mv: P::Move, evaluator: &E, config: &EngineConfig) -> i32
where
    P: Position,
    E: Evaluator<P>,
{
    let mover = scratch.side_to_move();
    let tactics = scratch.tactics(mv);

    let mut priority = 0;
    if tactics.completes_mill {
        priority += config.order_mill;
    }
    if tactics.blocks_mill {
        priority += config.order_block;
    }
    if tactics.creates_setup {
        priority += config.order_setup;
    }
    if tactics.blocks_setup {
        priority += config.order_block_setup;
    }
    if tactics.strategic {
        priority += config.order_strategic;
    }
    priority += i32::from(tactics.open_lines) * config.order_open_line;

    scratch.apply(mv);
    let shallow = evaluator.evaluate(scratch, mover) / config.order_eval_divisor.max(1);
    scratch.undo(mv);

    priority + shallow.clamp(-config.order_eval_cap, config.order_eval_cap)
}

/// Sorts `moves` best-first for the side to move. Keys are kept from the
/// root player's point of view: maximizing nodes sort them descending,
/// minimizing nodes ascending. The sort is stable.
pub fn order_moves<P, E>(
    position: &P,
    moves: &mut MoveList<P::Move>,
    evaluator: &E,
    is_maximizing: bool,
    config: &EngineConfig,
) where
    P: Position,
    E: Evaluator<P>,
{
    if moves.len() < 2 {
        return;
    }
    let mut scratch = position.clone();
    moves.score_with(|mv| {
        let priority = move_priority(&mut scratch, mv, evaluator, config);
        if is_maximizing {
            priority
        } else {
            -priority
        }
    });
    if is_maximizing {
        moves.sort_by(|a, b| b.cmp(&a));
    } else {
        moves.sort_by(|a, b| a.cmp(&b));
    }
}
