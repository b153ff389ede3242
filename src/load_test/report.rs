use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::time::Duration;

const LABEL_WIDTH: usize = 22;
const VALUE_WIDTH: usize = 44;
const INNER_WIDTH: usize = LABEL_WIDTH + VALUE_WIDTH + 3;

/// Aggregate statistics for one load generator run.
#[derive(Debug, Clone)]
pub struct LoadTestReport {
    /// Informational runtime description
    pub runtime: String,
    pub target: String,
    pub distribution: String,
    pub started_at: DateTime<Utc>,
    pub request_count: usize,
    pub distinct_keys: usize,
    pub elapsed: Duration,
    pub succeeded: u64,
    pub rejected: u64,
    pub failed: u64,
    /// Operations still running when the batch was declared stalled
    pub outstanding: usize,
    pub stalled: bool,
    pub latency_p50: Duration,
    pub latency_p95: Duration,
    pub latency_p99: Duration,
}

impl LoadTestReport {
    pub fn total_seconds(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }

    /// Requests the throughput figures are based on: the whole batch, or
    /// only the finished operations when the run stalled.
    pub fn measured_requests(&self) -> u64 {
        if self.stalled {
            self.completed()
        } else {
            self.request_count as u64
        }
    }

    pub fn avg_ms_per_request(&self) -> f64 {
        let measured = self.measured_requests();
        if measured == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1000.0 / measured as f64
    }

    pub fn requests_per_second(&self) -> f64 {
        self.measured_requests() as f64 / self.total_seconds().max(0.001)
    }

    /// Operations that finished, whatever their outcome.
    pub fn completed(&self) -> u64 {
        self.succeeded + self.rejected + self.failed
    }
}

fn row(f: &mut fmt::Formatter<'_>, label: &str, value: impl fmt::Display) -> fmt::Result {
    let label = format!("{}:", label);
    let value = value.to_string();
    writeln!(
        f,
        "║ {:<lw$} {:<vw$} ║",
        label,
        value,
        lw = LABEL_WIDTH,
        vw = VALUE_WIDTH
    )
}

fn millis(duration: Duration) -> String {
    format!("{:.3} ms", duration.as_secs_f64() * 1000.0)
}

impl fmt::Display for LoadTestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔{:═^w$}╗", " BENCHMARK RESULTS ", w = INNER_WIDTH)?;
        row(f, "Runtime", &self.runtime)?;
        row(f, "Target", &self.target)?;
        row(
            f,
            "Started",
            self.started_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        row(f, "Distribution", &self.distribution)?;
        row(f, "Total Requests", self.request_count)?;
        row(f, "Unique Keys", self.distinct_keys)?;
        row(f, "Succeeded", self.succeeded)?;
        row(f, "Rejected", self.rejected)?;
        row(f, "Failed", self.failed)?;
        row(f, "Total Time", format!("{:.3} seconds", self.total_seconds()))?;
        row(f, "Avg Time Per Request", format!("{:.3} ms", self.avg_ms_per_request()))?;
        row(f, "Requests Per Second", format!("{:.1}", self.requests_per_second()))?;
        row(f, "Latency p50", millis(self.latency_p50))?;
        row(f, "Latency p95", millis(self.latency_p95))?;
        row(f, "Latency p99", millis(self.latency_p99))?;
        if self.stalled {
            row(f, "Stalled", format!("yes ({} outstanding)", self.outstanding))?;
        }
        writeln!(f, "╚{:═<w$}╝", "", w = INNER_WIDTH)
    }
}
