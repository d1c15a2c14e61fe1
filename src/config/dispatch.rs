//! Dispatch setup: who runs, how much queue capacity, how long to wait.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::error::{Error, Result};

/// Roster, capacity and timing for one run.
///
/// Hints are in abstract units; the simulator scales them by
/// `time_unit_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub workers: Vec<String>,
    pub producers: Vec<String>,
    /// Maximum pending requests in the queue.
    pub capacity: usize,
    /// Successful cycles each producer must complete.
    pub target: u32,
    /// Per-attempt submission deadline. `0` waits forever.
    pub deadline_ms: u64,
    pub time_unit_ms: u64,
    pub service_hint: u32,
    pub consume_hint: u32,
    pub give_up_hint: u32,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            workers: names(&["Remy", "Linguini", "Colette"]),
            producers: names(&[
                "Ani", "Bai", "Cat", "Dao", "Eve", "Fay", "Gus", "Hua", "Iza", "Jai",
            ]),
            capacity: 3,
            target: 5,
            deadline_ms: 7_000,
            time_unit_ms: 500,
            service_hint: 10,
            consume_hint: 2,
            give_up_hint: 5,
        }
    }
}

impl DispatchConfig {
    /// Read and validate a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read dispatch config {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("bad dispatch config {}: {e}", path.display())))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Other(format!("serialize config: {e}")))
    }

    pub fn deadline(&self) -> Option<Duration> {
        (self.deadline_ms > 0).then(|| Duration::from_millis(self.deadline_ms))
    }

    pub fn time_unit(&self) -> Duration {
        Duration::from_millis(self.time_unit_ms)
    }

    /// Check the preconditions a run relies on.
    ///
    /// At least one worker is required: with none, accepted requests are
    /// never answered and producers wait forever.
    pub fn validate(&self) -> Result<()> {
        if self.workers.is_empty() {
            return Err(Error::Config(
                "at least one worker is required for producers to make progress".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(Error::Config("capacity must be at least 1".to_string()));
        }
        unique("worker", &self.workers)?;
        unique("producer", &self.producers)?;
        Ok(())
    }
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn unique(role: &str, list: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    for name in list {
        if name.trim().is_empty() {
            return Err(Error::Config(format!("{role} name must not be empty")));
        }
        if !seen.insert(name.as_str()) {
            return Err(Error::Config(format!("duplicate {role} name: {name}")));
        }
    }
    Ok(())
}
