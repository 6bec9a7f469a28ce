use std::sync::Arc;
use std::time::Instant;

use crate::config::EngineConfig;
use crate::db::DatabaseProxy;
use crate::workers::{JobConfig, ScheduleDispatcher};

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db: DatabaseProxy,
    engine: Arc<EngineConfig>,
    dispatcher: ScheduleDispatcher,
}

impl AppState {
    pub fn new(db: DatabaseProxy, engine: EngineConfig, jobs: JobConfig) -> Self {
        let engine = Arc::new(engine);
        let dispatcher = ScheduleDispatcher::new(db.clone(), Arc::clone(&engine), jobs);
        Self {
            started_at: Instant::now(),
            db,
            engine,
            dispatcher,
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn db(&self) -> &DatabaseProxy {
        &self.db
    }

    pub fn engine(&self) -> &EngineConfig {
        &self.engine
    }

    pub fn dispatcher(&self) -> &ScheduleDispatcher {
        &self.dispatcher
    }
}
