use crate::engine::SearchPlan;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Uniformly random legal move.
    Trivial,
    /// One-ply rule cascade.
    Basic,
    /// Single-threaded iterative deepening.
    Deep,
    /// Parallel root split with the largest budget.
    Maximal,
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trivial" | "easy" => Ok(Self::Trivial),
            "basic" | "medium" => Ok(Self::Basic),
            "deep" | "hard" => Ok(Self::Deep),
            "maximal" | "expert" => Ok(Self::Maximal),
            other => Err(format!("unknown difficulty '{other}'")),
        }
    }
}

/// Depth schedule and clock of one difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub start_depth: u8,
    pub depth_step: u8,
    pub max_depth: u8,
    pub time_limit_ms: u64,
    /// How long the coordinator waits for one worker in one depth round.
    pub worker_timeout_ms: u64,
}

impl DifficultyProfile {
    pub const fn plan(&self) -> SearchPlan {
        SearchPlan {
            start_depth: self.start_depth,
            depth_step: self.depth_step,
            max_depth: self.max_depth,
            time_limit_ms: Some(self.time_limit_ms),
        }
    }

    /// The plan for what is left after `spent_ms` of the budget went
    /// elsewhere. Deepening restarts at one ply so a round can still finish.
    pub fn remaining_plan(&self, spent_ms: u64) -> SearchPlan {
        SearchPlan {
            start_depth: 1,
            time_limit_ms: Some(self.time_limit_ms.saturating_sub(spent_ms).max(1)),
            ..self.plan()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // Terminal scoring
    pub win_score: i32,
    pub depth_bonus: i32, // Points added per remaining ply on a decided game
    pub draw_score: i32,

    // Evaluation Parameters
    pub mill_score: i32,
    pub setup_score: i32,
    pub opponent_setup_score: i32,
    pub open_single_score: i32,
    pub double_setup_score: i32,
    pub setup_edge_score: i32,
    pub material_score: i32,
    pub classic_material_score: i32,
    pub strategic_score: i32,
    pub mobility_score: i32,
    pub blocked_piece_score: i32,
    pub endgame_threshold: u8,
    pub endgame_bonus: i32,
    pub phase_base_permille: i32,
    pub phase_growth_permille: i32,

    // Move Ordering
    pub order_mill: i32,
    pub order_block: i32,
    pub order_setup: i32,
    pub order_block_setup: i32,
    pub order_strategic: i32,
    pub order_open_line: i32,
    pub order_eval_divisor: i32,
    pub order_eval_cap: i32,

    // Search Parameters
    pub quiescence_depth: u8,
    pub tt_size_mb: usize,
    pub use_transposition: bool,
    pub soft_time_ratio: f32,

    // Parallel Dispatch
    pub max_workers: usize,
    pub moves_per_worker: usize,
    pub ping_timeout_ms: u64,
    pub worker_grace_ms: u64,
    pub worker_stack_kb: usize,

    // Difficulty tiers
    pub deep_profile: DifficultyProfile,
    pub maximal_profile: DifficultyProfile,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            win_score: 1_000_000,
            depth_bonus: 1_000,
            draw_score: 0,

            mill_score: 600,
            setup_score: 500,
            opponent_setup_score: 600,
            open_single_score: 160,
            double_setup_score: 200,
            setup_edge_score: 50,
            material_score: 5,
            classic_material_score: 400,
            strategic_score: 15,
            mobility_score: 2,
            blocked_piece_score: 20,
            endgame_threshold: 8,
            endgame_bonus: 150,
            phase_base_permille: 100,
            phase_growth_permille: 500,

            order_mill: 1_000_000,
            order_block: 500_000,
            order_setup: 50_000,
            order_block_setup: 25_000,
            order_strategic: 3_000,
            order_open_line: 1_000,
            order_eval_divisor: 16,
            order_eval_cap: 900,

            quiescence_depth: 3,
            tt_size_mb: 8,
            use_transposition: true,
            soft_time_ratio: 0.6,

            max_workers: 8,
            moves_per_worker: 2,
            ping_timeout_ms: 250,
            worker_grace_ms: 200,
            worker_stack_kb: 8 * 1024,

            deep_profile: DifficultyProfile {
                start_depth: 2,
                depth_step: 1,
                max_depth: 8,
                time_limit_ms: 2_000,
                worker_timeout_ms: 2_000,
            },
            maximal_profile: DifficultyProfile {
                start_depth: 2,
                depth_step: 1,
                max_depth: 12,
                time_limit_ms: 5_000,
                worker_timeout_ms: 5_000,
            },
        }
    }
}

#[derive(Deserialize)]
struct EngineConfigJson {
    win_score: Option<i32>,
    depth_bonus: Option<i32>,
    draw_score: Option<i32>,

    mill_score: Option<f32>,
    setup_score: Option<f32>,
    opponent_setup_score: Option<f32>,
    open_single_score: Option<f32>,
    double_setup_score: Option<f32>,
    setup_edge_score: Option<f32>,
    material_score: Option<f32>,
    classic_material_score: Option<f32>,
    strategic_score: Option<f32>,
    mobility_score: Option<f32>,
    blocked_piece_score: Option<f32>,
    endgame_threshold: Option<u8>,
    endgame_bonus: Option<f32>,
    phase_base_permille: Option<i32>,
    phase_growth_permille: Option<i32>,

    order_mill: Option<f32>,
    order_block: Option<f32>,
    order_setup: Option<f32>,
    order_block_setup: Option<f32>,
    order_strategic: Option<f32>,
    order_open_line: Option<f32>,
    order_eval_divisor: Option<i32>,
    order_eval_cap: Option<i32>,

    quiescence_depth: Option<u8>,
    tt_size_mb: Option<usize>,
    use_transposition: Option<bool>,
    soft_time_ratio: Option<f32>,

    max_workers: Option<usize>,
    moves_per_worker: Option<usize>,
    ping_timeout_ms: Option<u64>,
    worker_grace_ms: Option<u64>,
    worker_stack_kb: Option<usize>,

    deep_profile: Option<DifficultyProfile>,
    maximal_profile: Option<DifficultyProfile>,
}

impl EngineConfig {
    /// Reads a tuning file. Evaluation and ordering weights are scale
    /// factors applied to the defaults; everything else is absolute.
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        let json: EngineConfigJson = serde_json::from_str(json_str)?;
        let d = Self::default();

        Ok(Self {
            win_score: json.win_score.unwrap_or(d.win_score),
            depth_bonus: json.depth_bonus.unwrap_or(d.depth_bonus),
            draw_score: json.draw_score.unwrap_or(d.draw_score),

            mill_score: apply_scale(d.mill_score, json.mill_score),
            setup_score: apply_scale(d.setup_score, json.setup_score),
            opponent_setup_score: apply_scale(d.opponent_setup_score, json.opponent_setup_score),
            open_single_score: apply_scale(d.open_single_score, json.open_single_score),
            double_setup_score: apply_scale(d.double_setup_score, json.double_setup_score),
            setup_edge_score: apply_scale(d.setup_edge_score, json.setup_edge_score),
            material_score: apply_scale(d.material_score, json.material_score),
            classic_material_score: apply_scale(
                d.classic_material_score,
                json.classic_material_score,
            ),
            strategic_score: apply_scale(d.strategic_score, json.strategic_score),
            mobility_score: apply_scale(d.mobility_score, json.mobility_score),
            blocked_piece_score: apply_scale(d.blocked_piece_score, json.blocked_piece_score),
            endgame_threshold: json.endgame_threshold.unwrap_or(d.endgame_threshold),
            endgame_bonus: apply_scale(d.endgame_bonus, json.endgame_bonus),
            phase_base_permille: json.phase_base_permille.unwrap_or(d.phase_base_permille),
            phase_growth_permille: json
                .phase_growth_permille
                .unwrap_or(d.phase_growth_permille),

            order_mill: apply_scale(d.order_mill, json.order_mill),
            order_block: apply_scale(d.order_block, json.order_block),
            order_setup: apply_scale(d.order_setup, json.order_setup),
            order_block_setup: apply_scale(d.order_block_setup, json.order_block_setup),
            order_strategic: apply_scale(d.order_strategic, json.order_strategic),
            order_open_line: apply_scale(d.order_open_line, json.order_open_line),
            order_eval_divisor: json.order_eval_divisor.unwrap_or(d.order_eval_divisor).max(1),
            order_eval_cap: json.order_eval_cap.unwrap_or(d.order_eval_cap),

            quiescence_depth: json.quiescence_depth.unwrap_or(d.quiescence_depth),
            tt_size_mb: json.tt_size_mb.unwrap_or(d.tt_size_mb),
            use_transposition: json.use_transposition.unwrap_or(d.use_transposition),
            soft_time_ratio: json.soft_time_ratio.unwrap_or(d.soft_time_ratio),

            max_workers: json.max_workers.unwrap_or(d.max_workers),
            moves_per_worker: json.moves_per_worker.unwrap_or(d.moves_per_worker).max(1),
            ping_timeout_ms: json.ping_timeout_ms.unwrap_or(d.ping_timeout_ms),
            worker_grace_ms: json.worker_grace_ms.unwrap_or(d.worker_grace_ms),
            worker_stack_kb: json.worker_stack_kb.unwrap_or(d.worker_stack_kb),

            deep_profile: json.deep_profile.unwrap_or(d.deep_profile),
            maximal_profile: json.maximal_profile.unwrap_or(d.maximal_profile),
        })
    }

    /// Search budget of a tier; the rule-based tiers never search.
    pub const fn profile(&self, difficulty: Difficulty) -> Option<DifficultyProfile> {
        match difficulty {
            Difficulty::Trivial | Difficulty::Basic => None,
            Difficulty::Deep => Some(self.deep_profile),
            Difficulty::Maximal => Some(self.maximal_profile),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn apply_scale(default_val: i32, scale: Option<f32>) -> i32 {
    scale.map_or(default_val, |s| (default_val as f32 * s) as i32)
}
