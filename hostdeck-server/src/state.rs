use crate::config::ServerConfig;
use crate::health::HealthTracker;
use hostdeck_agent::{
    CommandRunner, ContainerController, CounterStore, HostSampler, ProcessRanker, RateComputer,
    SpeedtestProbe,
};
use std::sync::Arc;

/// État unique partagé par tous les handlers Axum
#[derive(Clone)]
pub struct AppState {
    pub sampler: HostSampler,
    pub ranker: Arc<ProcessRanker>,
    pub containers: ContainerController,
    pub speedtest: SpeedtestProbe,
    pub counters: CounterStore,
    pub health_tracker: HealthTracker,
}

impl AppState {
    /// Un seul CounterStore pour tout le process, injecté dans le sampler
    pub fn new(cfg: &ServerConfig, runner: Arc<dyn CommandRunner>) -> Self {
        let counters = CounterStore::new();
        let sampler = HostSampler::new(
            &cfg.telemetry,
            RateComputer::new(counters.clone()),
            runner.clone(),
        );
        Self {
            sampler,
            ranker: Arc::new(ProcessRanker::new(&cfg.telemetry)),
            containers: ContainerController::new(cfg.runtime.clone(), runner.clone()),
            speedtest: SpeedtestProbe::new(cfg.speedtest.clone(), runner.clone()),
            counters,
            health_tracker: HealthTracker::new(runner),
        }
    }
}
