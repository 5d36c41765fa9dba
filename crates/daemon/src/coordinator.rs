// SPDX-License-Identifier: MIT

//! The Coordinator: the single value that owns every subcomponent and all
//! shared state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use sw_adapters::{RealSsh, SshAdapter};
use sw_core::SystemClock;
use sw_engine::{escalation_channel, HealthMonitor, PayloadRegistry, ReleaseEngine, Scheduler, SelfHealer};
use sw_store::{EventLog, ProtocolLog, Store};
use tokio::sync::Mutex as AsyncMutex;

use crate::config::Config;
use crate::error::DaemonError;

pub struct Coordinator {
    pub store: Arc<Store>,
    pub events: Arc<EventLog>,
    pub protocol: Arc<ProtocolLog>,
    pub scheduler: Arc<Scheduler<SystemClock>>,
    pub health: Arc<HealthMonitor<SystemClock>>,
    pub selfheal: Arc<SelfHealer<SystemClock>>,
    pub release: Arc<ReleaseEngine<SystemClock>>,
    pub registry: Arc<PayloadRegistry<SystemClock>>,
    pub config: AsyncMutex<Config>,
    pub clock: SystemClock,
    started_at: Instant,
    shutting_down: AtomicBool,
}

pub type AppState = Arc<Coordinator>;

impl Coordinator {
    pub fn new(config: Config) -> Result<Arc<Self>, DaemonError> {
        let store = Arc::new(Store::open(&config.db_path)?);
        let events_path = config.db_path.with_file_name("events.log");
        let protocol_path = config.db_path.with_file_name("protocol.log");
        let events = Arc::new(EventLog::open(events_path)?);
        let protocol = Arc::new(ProtocolLog::open(protocol_path)?);

        let ssh: Arc<dyn SshAdapter> = Arc::new(RealSsh);
        let clock = SystemClock;

        let (escalate_tx, escalate_rx) = escalation_channel();
        let health = Arc::new(HealthMonitor::new(
            store.clone(),
            events.clone(),
            ssh.clone(),
            escalate_tx,
            config.health_config(),
            clock,
        ));
        let scheduler = Arc::new(Scheduler::new(store.clone(), events.clone(), health.clone(), config.scheduler_config(), clock));
        let selfheal = Arc::new(SelfHealer::new(store.clone(), events.clone(), ssh.clone(), escalate_rx, config.selfheal_config(), clock));
        let release = Arc::new(ReleaseEngine::new(
            store.clone(),
            events.clone(),
            config.releases_base.clone(),
            config.binhost_path.clone(),
            config.staging_path.clone(),
            clock,
        ));
        let registry = Arc::new(PayloadRegistry::new(store.clone(), config.payload_dir.clone(), clock));

        Ok(Arc::new(Self {
            store,
            events,
            protocol,
            scheduler,
            health,
            selfheal,
            release,
            registry,
            config: AsyncMutex::new(config),
            clock,
            started_at: Instant::now(),
            shutting_down: AtomicBool::new(false),
        }))
    }

    pub fn uptime_secs(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    pub fn request_shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}
