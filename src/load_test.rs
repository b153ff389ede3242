//! Load generator that fires a batch of concurrent inventory updates and
//! aggregates latency and throughput.

mod report;
mod target;

pub use report::LoadTestReport;
pub use target::{HttpTarget, UpdateTarget};

use crate::config::{KeyDistribution, LoadTestConfig};
use crate::core::{InventoryError, Key, Result};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    Idle,
    Running,
    Complete,
}

/// Live counters for a run, readable from other tasks while it executes.
#[derive(Debug, Default)]
pub struct LoadProgress {
    phase: AtomicU8,
    launched: AtomicU64,
    succeeded: AtomicU64,
    rejected: AtomicU64,
    failed: AtomicU64,
}

impl LoadProgress {
    pub fn phase(&self) -> LoadPhase {
        match self.phase.load(Ordering::Acquire) {
            0 => LoadPhase::Idle,
            1 => LoadPhase::Running,
            _ => LoadPhase::Complete,
        }
    }

    pub fn launched(&self) -> u64 {
        self.launched.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.succeeded() + self.rejected() + self.failed()
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    fn start(&self) {
        self.launched.store(0, Ordering::Relaxed);
        self.succeeded.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.phase.store(1, Ordering::Release);
    }

    fn finish(&self) {
        self.phase.store(2, Ordering::Release);
    }

    fn record(&self, outcome: &Result<bool>) {
        let counter = match outcome {
            Ok(true) => &self.succeeded,
            Ok(false) => &self.rejected,
            Err(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Keys for each of `request_count` operations, in launch order.
pub fn plan_keys(distribution: &KeyDistribution, request_count: usize) -> Vec<Key> {
    match distribution {
        KeyDistribution::Fixed(key) => vec![key.clone(); request_count],
        KeyDistribution::RoundRobin { key_count } => (0..request_count)
            .map(|i| (1 + i % key_count).to_string())
            .collect(),
        KeyDistribution::Random { key_count, seed } => {
            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(*seed),
                None => StdRng::from_entropy(),
            };
            (0..request_count)
                .map(|_| rng.gen_range(1..=*key_count).to_string())
                .collect()
        }
    }
}

/// Informational description of the executing runtime.
pub fn runtime_description() -> String {
    let workers = tokio::runtime::Handle::try_current()
        .map(|handle| handle.metrics().num_workers())
        .unwrap_or(0);
    format!(
        "{} {} (tokio, {} workers)",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        workers
    )
}

pub struct LoadGenerator {
    config: LoadTestConfig,
    progress: Arc<LoadProgress>,
}

impl LoadGenerator {
    pub fn new(config: LoadTestConfig) -> Result<Self> {
        config.validate().map_err(InventoryError::Config)?;
        Ok(Self {
            config,
            progress: Arc::new(LoadProgress::default()),
        })
    }

    pub fn config(&self) -> &LoadTestConfig {
        &self.config
    }

    /// Shared handle on the live counters.
    pub fn progress(&self) -> Arc<LoadProgress> {
        Arc::clone(&self.progress)
    }

    /// Launch every operation at once, wait for all of them, and report.
    ///
    /// Individual failures (target errors, panicked tasks) are counted and
    /// never abort the batch. When `max_wait` elapses first the remaining
    /// operations are aborted and the report is marked stalled.
    pub async fn run(&self, target: Arc<dyn UpdateTarget>) -> Result<LoadTestReport> {
        let config = &self.config;
        let keys = plan_keys(&config.distribution, config.request_count);
        let distinct_keys = keys.iter().collect::<HashSet<_>>().len();
        let limiter = config
            .concurrency_limit
            .map(|limit| Arc::new(Semaphore::new(limit)));

        info!(
            requests = config.request_count,
            distinct_keys,
            distribution = config.distribution.name(),
            via = %target.describe(),
            "starting load test"
        );

        self.progress.start();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut tasks = JoinSet::new();

        for key in keys {
            let target = Arc::clone(&target);
            let progress = Arc::clone(&self.progress);
            let limiter = limiter.clone();
            let delta = config.delta;

            tasks.spawn(async move {
                let _permit = match limiter {
                    Some(limiter) => Some(limiter.acquire_owned().await.map_err(|err| {
                        progress.record(&Err(InventoryError::Task(err.to_string())));
                    })?),
                    None => None,
                };

                let op_start = Instant::now();
                let outcome = target.update(&key, delta).await;
                let latency = op_start.elapsed();
                if let Err(err) = &outcome {
                    debug!(key = %key, error = %err, "load test update failed");
                }
                progress.record(&outcome);
                Ok::<Duration, ()>(latency)
            });
            self.progress.launched.fetch_add(1, Ordering::Relaxed);
        }

        let deadline = config.max_wait.map(|wait| start + wait);
        let mut latencies = Vec::with_capacity(config.request_count.min(config.sample_max));
        let mut stalled = false;

        loop {
            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        stalled = true;
                        break;
                    }
                },
                None => tasks.join_next().await,
            };

            let Some(joined) = next else {
                break;
            };

            match joined {
                Ok(Ok(latency)) => {
                    if latencies.len() < config.sample_max {
                        latencies.push(latency.as_micros() as u64);
                    }
                }
                Ok(Err(())) => {}
                Err(err) => {
                    warn!(error = %err, "load test task did not finish");
                    self.progress.failed.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        let elapsed = start.elapsed();
        let outstanding = tasks.len();
        if stalled {
            warn!(
                outstanding,
                completed = self.progress.completed(),
                "load test stalled; aborting outstanding operations"
            );
            tasks.abort_all();
        }
        self.progress.finish();

        latencies.sort_unstable();
        let report = LoadTestReport {
            runtime: runtime_description(),
            target: target.describe(),
            distribution: config.distribution.name().to_string(),
            started_at,
            request_count: config.request_count,
            distinct_keys,
            elapsed,
            succeeded: self.progress.succeeded(),
            rejected: self.progress.rejected(),
            failed: self.progress.failed(),
            outstanding,
            stalled,
            latency_p50: percentile(&latencies, 0.50),
            latency_p95: percentile(&latencies, 0.95),
            latency_p99: percentile(&latencies, 0.99),
        };

        info!(
            elapsed_ms = report.elapsed.as_millis() as u64,
            rps = report.requests_per_second(),
            succeeded = report.succeeded,
            rejected = report.rejected,
            failed = report.failed,
            "load test complete"
        );

        Ok(report)
    }
}

/// Build a generator from `config` and run it once against `target`.
pub async fn run_load_test(
    target: Arc<dyn UpdateTarget>,
    config: LoadTestConfig,
) -> Result<LoadTestReport> {
    LoadGenerator::new(config)?.run(target).await
}

fn percentile(sorted: &[u64], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    Duration::from_micros(sorted[idx])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_robin_keys() {
        let keys = plan_keys(&KeyDistribution::RoundRobin { key_count: 3 }, 7);
        assert_eq!(keys, vec!["1", "2", "3", "1", "2", "3", "1"]);
    }

    #[test]
    fn test_fixed_keys() {
        let keys = plan_keys(&KeyDistribution::Fixed("sku".to_string()), 3);
        assert_eq!(keys, vec!["sku", "sku", "sku"]);
    }

    #[test]
    fn test_random_keys_in_range_and_seeded() {
        let distribution = KeyDistribution::Random {
            key_count: 3,
            seed: Some(42),
        };
        let first = plan_keys(&distribution, 500);
        let second = plan_keys(&distribution, 500);
        assert_eq!(first, second);

        let distinct: HashSet<&str> = first.iter().map(String::as_str).collect();
        assert_eq!(distinct, HashSet::from(["1", "2", "3"]));
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(&[], 0.5), Duration::ZERO);
        let sorted: Vec<u64> = (1..=100).collect();
        assert_eq!(percentile(&sorted, 0.50), Duration::from_micros(51));
        assert_eq!(percentile(&sorted, 0.99), Duration::from_micros(99));
    }

    #[test]
    fn test_generator_rejects_invalid_config() {
        let config = LoadTestConfig::new(0, KeyDistribution::default());
        assert!(matches!(
            LoadGenerator::new(config),
            Err(InventoryError::Config(_))
        ));
    }

    #[test]
    fn test_progress_starts_idle() {
        let generator = LoadGenerator::new(LoadTestConfig::default()).unwrap();
        let progress = generator.progress();
        assert_eq!(progress.phase(), LoadPhase::Idle);
        assert_eq!(progress.completed(), 0);
    }
}
