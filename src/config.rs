//! Scheduler configuration, loadable from JSON.

use std::path::Path;

use crate::error::KernelError;

/// Default number of events between full recomputations of the total propensity.
pub const DEFAULT_RECOMPUTE_INTERVAL: u64 = 1024;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Seed of the replicate's random stream.
    pub seed: u64,
    /// Events between full recomputations of every propensity, bounding
    /// floating-point drift of the running total. Must be at least 1.
    pub recompute_interval: u64,
    /// Keep a log of every fired event.
    pub record_events: bool,
    /// Upper bound on events fired by a single `run_until` call.
    pub max_events_per_run: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            seed: 0,
            recompute_interval: DEFAULT_RECOMPUTE_INTERVAL,
            record_events: false,
            max_events_per_run: None,
        }
    }
}

impl SchedulerConfig {
    pub fn with_seed(seed: u64) -> Self {
        SchedulerConfig { seed, ..Default::default() }
    }

    pub fn from_json_str(s: &str) -> Result<Self, KernelError> {
        let config: SchedulerConfig = serde_json::from_str(s).map_err(|e| KernelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| KernelError::Config(format!("reading {}: {}", path.display(), e)))?;
        Self::from_json_str(&text)
    }

    pub fn to_json_string(&self) -> Result<String, KernelError> {
        serde_json::to_string_pretty(self).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), KernelError> {
        if self.recompute_interval == 0 {
            return Err(KernelError::Config("recompute_interval must be at least 1".into()));
        }
        if self.max_events_per_run == Some(0) {
            return Err(KernelError::Config("max_events_per_run must be at least 1 when set".into()));
        }
        Ok(())
    }
}
