use crate::engine::agent::{Agent, MoveRequest};
use crate::engine::config::EngineConfig;
use crate::engine::parallel::{handle_request, WorkerRequest, WorkerResponse};
use crate::engine::search::AlphaBetaEngine;
use crate::engine::{ChosenMove, ClassicMove, SearchStats, SimpleMove};
use crate::logic::generator::{ClassicPosition, SimplePosition};
use gloo_worker::{HandlerId, Worker, WorkerScope};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Serialize, Deserialize)]
pub enum Input {
    /// Replaces the configuration; engines are rebuilt on the next request.
    Configure {
        config: EngineConfig,
        worker_id: usize,
    },
    ChooseMove(MoveRequest),
    SimpleSearch(WorkerRequest<SimplePosition, SimpleMove>),
    ClassicSearch(WorkerRequest<ClassicPosition, ClassicMove>),
}

#[derive(Serialize, Deserialize)]
pub enum Output {
    MoveChosen(ChosenMove, Option<SearchStats>),
    Simple(WorkerResponse<SimpleMove>),
    Classic(WorkerResponse<ClassicMove>),
}

/// Browser counterpart of a pool thread. Threads are not available on the
/// main wasm target, so a page runs one of these per worker and each keeps
/// its own engines and caches.
pub struct SearchWorker {
    worker_id: usize,
    config: Arc<EngineConfig>,
    agent: Option<Agent>,
    simple: Option<AlphaBetaEngine<SimplePosition>>,
    classic: Option<AlphaBetaEngine<ClassicPosition>>,
}

impl Worker for SearchWorker {
    type Input = Input;
    type Message = ();
    type Output = Output;

    fn create(_scope: &WorkerScope<Self>) -> Self {
        Self {
            worker_id: 0,
            config: Arc::new(EngineConfig::default()),
            agent: None,
            simple: None,
            classic: None,
        }
    }

    fn update(&mut self, _scope: &WorkerScope<Self>, _msg: Self::Message) {}

    fn received(&mut self, scope: &WorkerScope<Self>, msg: Self::Input, id: HandlerId) {
        let worker_id = self.worker_id;
        match msg {
            Input::Configure { config, worker_id } => {
                self.worker_id = worker_id;
                self.config = Arc::new(config);
                self.agent = None;
                self.simple = None;
                self.classic = None;
            }
            Input::ChooseMove(request) => {
                let config = &self.config;
                let agent = self.agent.get_or_insert_with(|| Agent::new(config.clone()));
                let mv = agent.choose_move(&request);
                scope.respond(id, Output::MoveChosen(mv, agent.last_stats()));
            }
            Input::SimpleSearch(request) => {
                let config = &self.config;
                let engine = self
                    .simple
                    .get_or_insert_with(|| AlphaBetaEngine::new(config.clone()));
                scope.respond(id, Output::Simple(handle_request(engine, worker_id, request)));
            }
            Input::ClassicSearch(request) => {
                let config = &self.config;
                let engine = self
                    .classic
                    .get_or_insert_with(|| AlphaBetaEngine::new(config.clone()));
                scope.respond(id, Output::Classic(handle_request(engine, worker_id, request)));
            }
        }
    }
}
