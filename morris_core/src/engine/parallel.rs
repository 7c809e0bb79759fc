use crate::engine::config::EngineConfig;
use crate::engine::eval::MorrisEvaluator;
use crate::engine::search::{now, AlphaBetaEngine, RootCandidate, INFINITY};
use crate::engine::{EngineError, Evaluator, Position, SearchPlan, SearchStats};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// One batch of root moves for a worker. Each move carries its index in the
/// root ordering so results merge with the same tie-break as a sequential
/// search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchJob<P, M> {
    pub request_id: u64,
    pub position: P,
    pub moves: Vec<(usize, M)>,
    pub depth: u8,
    pub alpha: i32,
    pub beta: i32,
    pub is_maximizing: bool,
    pub time_limit_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum WorkerRequest<P, M> {
    Search(SearchJob<P, M>),
    Ping { request_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerReport<M> {
    pub request_id: u64,
    pub worker_id: usize,
    pub best: Option<RootCandidate<M>>,
    pub completed: bool,
    pub nodes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerResponse<M> {
    Result(WorkerReport<M>),
    Pong { request_id: u64, worker_id: usize },
}

/// Answers one request with a worker-local engine. Shared by the native
/// worker threads and the browser worker.
pub fn handle_request<P>(
    engine: &mut AlphaBetaEngine<P>,
    worker_id: usize,
    request: WorkerRequest<P, P::Move>,
) -> WorkerResponse<P::Move>
where
    P: Position,
    MorrisEvaluator: Evaluator<P>,
{
    match request {
        WorkerRequest::Ping { request_id } => WorkerResponse::Pong {
            request_id,
            worker_id,
        },
        WorkerRequest::Search(mut job) => {
            let mover = job.position.side_to_move();
            let root_player = if job.is_maximizing { mover } else { mover.opposite() };
            engine.reset(root_player, job.time_limit_ms);
            let outcome = engine.search_root(
                &mut job.position,
                &job.moves,
                job.depth,
                job.alpha,
                job.beta,
                job.is_maximizing,
            );
            WorkerResponse::Result(WorkerReport {
                request_id: job.request_id,
                worker_id,
                best: outcome.best,
                completed: outcome.completed,
                nodes: outcome.nodes,
            })
        }
    }
}

/// Splits `len` root moves into contiguous chunks for at most `workers`
/// workers, giving each about `per_worker` moves.
pub fn split_chunks(len: usize, workers: usize, per_worker: usize) -> Vec<Range<usize>> {
    if len == 0 || workers == 0 {
        return Vec::new();
    }
    let wanted = len.div_ceil(per_worker.max(1));
    let count = wanted.clamp(1, workers);
    let size = len.div_ceil(count);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

struct WorkerHandle<P: Position> {
    id: usize,
    requests: Sender<WorkerRequest<P, P::Move>>,
    connected: bool,
    alive: bool,
}

struct RoundResult<M> {
    best: Option<RootCandidate<M>>,
    completed: bool,
    reported: usize,
    nodes: u64,
}

/// Distributes root moves over a pool of worker threads. Workers own their
/// engine and cache; only messages cross thread boundaries.
pub struct ParallelCoordinator<P: Position> {
    config: Arc<EngineConfig>,
    workers: Vec<WorkerHandle<P>>,
    responses: Receiver<WorkerResponse<P::Move>>,
    planner: AlphaBetaEngine<P>,
    next_request: u64,
}

impl<P> ParallelCoordinator<P>
where
    P: Position,
    MorrisEvaluator: Evaluator<P>,
{
    /// Pool sized by the configured cap and the available CPUs.
    pub fn new(config: Arc<EngineConfig>) -> Result<Self, EngineError> {
        let count = config.max_workers.min(num_cpus::get());
        Self::with_workers(config, count)
    }

    pub fn with_workers(config: Arc<EngineConfig>, count: usize) -> Result<Self, EngineError> {
        let (response_tx, responses) = channel();
        let mut workers = Vec::with_capacity(count);

        for id in 0..count {
            let (request_tx, request_rx) = channel::<WorkerRequest<P, P::Move>>();
            let tx = response_tx.clone();
            let worker_config = config.clone();
            let spawned = thread::Builder::new()
                .name(format!("morris-worker-{id}"))
                .stack_size(config.worker_stack_kb * 1024)
                .spawn(move || {
                    let mut engine = AlphaBetaEngine::new(worker_config);
                    while let Ok(request) = request_rx.recv() {
                        let response = handle_request(&mut engine, id, request);
                        if tx.send(response).is_err() {
                            break;
                        }
                    }
                    log::debug!("worker {id} stopped");
                });
            match spawned {
                Ok(_) => workers.push(WorkerHandle {
                    id,
                    requests: request_tx,
                    connected: true,
                    alive: true,
                }),
                Err(e) => log::warn!("could not start search worker {id}: {e}"),
            }
        }

        if workers.is_empty() {
            return Err(EngineError::NoWorkers);
        }
        log::info!("started {} search workers", workers.len());

        Ok(Self {
            planner: AlphaBetaEngine::new(config.clone()),
            config,
            workers,
            responses,
            next_request: 0,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.iter().filter(|w| w.connected).count()
    }

    fn next_id(&mut self) -> u64 {
        self.next_request += 1;
        self.next_request
    }

    /// Pings every connected worker and marks the ones that answer in time
    /// as alive. Returns the number of live workers.
    pub fn ping(&mut self) -> usize {
        let request_id = self.next_id();
        let mut pending = 0;
        for worker in &mut self.workers {
            worker.alive = false;
            if !worker.connected {
                continue;
            }
            if worker.requests.send(WorkerRequest::Ping { request_id }).is_ok() {
                pending += 1;
            } else {
                log::warn!("worker {} is gone", worker.id);
                worker.connected = false;
            }
        }

        #[allow(clippy::cast_precision_loss)]
        let deadline = now() + self.config.ping_timeout_ms as f64;
        while pending > 0 {
            let Some(wait) = remaining(deadline) else {
                break;
            };
            match self.responses.recv_timeout(wait) {
                Ok(WorkerResponse::Pong {
                    request_id: id,
                    worker_id,
                }) if id == request_id => {
                    if let Some(w) = self.workers.iter_mut().find(|w| w.id == worker_id) {
                        w.alive = true;
                    }
                    pending -= 1;
                }
                Ok(_) => {} // stale
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let live = self.workers.iter().filter(|w| w.alive).count();
        if live < self.worker_count() {
            log::warn!(
                "{} of {} workers did not answer the ping",
                self.worker_count() - live,
                self.worker_count()
            );
        }
        live
    }

    /// Sends one depth round to the live workers and merges what comes
    /// back before `round_timeout_ms` (plus a grace period) has passed.
    fn run_round(
        &mut self,
        position: &P,
        root: &[P::Move],
        depth: u8,
        round_timeout_ms: u64,
    ) -> RoundResult<P::Move> {
        let request_id = self.next_id();
        let live: Vec<usize> = (0..self.workers.len()).filter(|&i| self.workers[i].alive).collect();
        let chunks = split_chunks(root.len(), live.len(), self.config.moves_per_worker);

        let mut pending = 0;
        let mut completed = true;
        let mut assigned = Vec::with_capacity(chunks.len());
        for (chunk, &slot) in chunks.iter().zip(&live) {
            let job = SearchJob {
                request_id,
                position: position.clone(),
                moves: chunk.clone().map(|i| (i, root[i])).collect(),
                depth,
                alpha: -INFINITY,
                beta: INFINITY,
                is_maximizing: true,
                time_limit_ms: Some(round_timeout_ms),
            };
            let worker = &mut self.workers[slot];
            if worker.requests.send(WorkerRequest::Search(job)).is_ok() {
                pending += 1;
                assigned.push(worker.id);
            } else {
                log::warn!("worker {} is gone", worker.id);
                worker.connected = false;
                worker.alive = false;
                completed = false;
            }
        }

        let mut round = RoundResult {
            best: None,
            completed,
            reported: 0,
            nodes: 0,
        };
        #[allow(clippy::cast_precision_loss)]
        let deadline = now() + (round_timeout_ms + self.config.worker_grace_ms) as f64;
        let mut answered = Vec::with_capacity(pending);

        while round.reported < pending {
            let Some(wait) = remaining(deadline) else {
                break;
            };
            match self.responses.recv_timeout(wait) {
                Ok(WorkerResponse::Result(report)) if report.request_id == request_id => {
                    round.reported += 1;
                    round.nodes += report.nodes;
                    answered.push(report.worker_id);
                    if !report.completed {
                        round.completed = false;
                    }
                    if let Some(candidate) = report.best {
                        if round.best.map_or(true, |b| candidate.beats(&b)) {
                            round.best = Some(candidate);
                        }
                    }
                }
                Ok(other) => log::trace!("dropping stale response {other:?}"),
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if round.reported < pending {
            round.completed = false;
            // Late workers sit out the rest of this decision.
            for worker in &mut self.workers {
                if assigned.contains(&worker.id) && !answered.contains(&worker.id) {
                    worker.alive = false;
                }
            }
            log::warn!("{} workers missed the depth {depth} round", pending - round.reported);
        }
        round
    }

    /// Iterative deepening over parallel root rounds. Only fully reported
    /// rounds advance the result, except when nothing has been committed.
    pub fn search(
        &mut self,
        position: &P,
        plan: SearchPlan,
        round_timeout_ms: u64,
    ) -> Result<(P::Move, SearchStats), EngineError> {
        let start = now();
        #[allow(clippy::cast_precision_loss)]
        let time_limit = plan.time_limit_ms.map(|t| t as f64);
        let soft_limit = time_limit.map(|t| t * f64::from(self.config.soft_time_ratio));

        if self.ping() == 0 {
            return Err(EngineError::NoWorkers);
        }

        self.planner.reset(position.side_to_move(), None);
        let mut root = self.planner.root_moves(position, None);
        if root.is_empty() {
            return Err(EngineError::NoMoveFound);
        }

        let mut best: Option<RootCandidate<P::Move>> = None;
        let mut final_depth = 0;
        let mut nodes = 0;
        let step = plan.depth_step.max(1);
        let mut depth = plan.start_depth.max(1);

        while depth <= plan.max_depth {
            let elapsed = now() - start;
            if let Some(sl) = soft_limit {
                if best.is_some() && elapsed > sl {
                    break;
                }
            }
            if self.workers.iter().all(|w| !w.alive) {
                break;
            }

            // Clip the round to what is left of the overall budget.
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let timeout = time_limit.map_or(round_timeout_ms, |limit| {
                round_timeout_ms.min((limit - elapsed).max(0.0) as u64)
            });

            if let Some(prev) = best {
                if let Some(pos) = root.iter().position(|&m| m == prev.mv) {
                    root[..=pos].rotate_right(1);
                }
            }

            let round = self.run_round(position, &root, depth, timeout);
            nodes += round.nodes;

            if !round.completed {
                if best.is_none() && round.best.is_some() {
                    best = round.best;
                    final_depth = depth;
                }
                log::debug!(
                    "parallel depth {depth} incomplete ({} reports)",
                    round.reported
                );
                break;
            }

            if let Some(found) = round.best {
                log::debug!(
                    "parallel depth {depth}: best {:?} score {} nodes {nodes}",
                    found.mv,
                    found.score
                );
                best = Some(found);
                final_depth = depth;
                if self.planner.evaluator().is_forced_win(found.score) {
                    break;
                }
            }

            std::thread::yield_now();
            match depth.checked_add(step) {
                Some(next) => depth = next,
                None => break,
            }
        }

        let found = best.ok_or(EngineError::WorkersFailed)?;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let time_ms = (now() - start) as u64;
        Ok((
            found.mv,
            SearchStats {
                depth: final_depth,
                nodes,
                time_ms,
                score: found.score,
            },
        ))
    }
}

/// Time left until `deadline`, or `None` once it has passed.
fn remaining(deadline: f64) -> Option<Duration> {
    let left = deadline - now();
    (left > 0.0).then(|| Duration::from_secs_f64(left / 1000.0))
}
