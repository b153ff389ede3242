use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use inventory_bench::{
    AppState, HttpTarget, InventoryService, KeyDistribution, LoadGenerator, LoadTestConfig,
    LoadTestReport, LockGranularity, ServerConfig, ServiceConfig, StoreMode, UpdateTarget,
    build_router,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "inventory-bench")]
#[command(about = "Per-key locking inventory service and lock contention benchmark")]
struct Cli {
    /// Tokio worker threads (defaults to one per core)
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the inventory HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        #[command(flatten)]
        service: ServiceArgs,
    },
    /// Run one benchmark and print the report
    Bench {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        service: ServiceArgs,
        /// Drive a running server instead of an in-process service
        #[arg(long)]
        target_url: Option<String>,
    },
    /// Run the same workload for every lock granularity and store mode
    Compare {
        #[command(flatten)]
        load: LoadArgs,
        #[arg(long, default_value_t = 100)]
        latency_ms: u64,
    },
}

#[derive(Args)]
struct ServiceArgs {
    /// Simulated store latency
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    granularity: Option<LockGranularity>,
    #[arg(long)]
    store_mode: Option<StoreMode>,
}

impl ServiceArgs {
    fn apply(&self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(latency_ms) = self.latency_ms {
            config = config.store_latency(Duration::from_millis(latency_ms));
        }
        if let Some(granularity) = self.granularity {
            config = config.lock_granularity(granularity);
        }
        if let Some(mode) = self.store_mode {
            config = config.store_mode(mode);
        }
        config
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DistributionArg {
    RoundRobin,
    Random,
    Fixed,
}

#[derive(Args)]
struct LoadArgs {
    #[arg(long, default_value_t = 10_000)]
    requests: usize,
    #[arg(long, default_value_t = 1_000)]
    keys: usize,
    #[arg(long, value_enum, default_value_t = DistributionArg::RoundRobin)]
    distribution: DistributionArg,
    /// Key used by the fixed distribution
    #[arg(long, default_value = "1")]
    key: String,
    /// Seed for the random distribution
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 1)]
    delta: i64,
    /// Maximum in-flight operations
    #[arg(long)]
    concurrency_limit: Option<usize>,
    /// Declare the batch stalled after this many seconds
    #[arg(long)]
    max_wait_secs: Option<u64>,
}

impl LoadArgs {
    fn to_config(&self) -> LoadTestConfig {
        let distribution = match self.distribution {
            DistributionArg::RoundRobin => KeyDistribution::RoundRobin {
                key_count: self.keys,
            },
            DistributionArg::Random => KeyDistribution::Random {
                key_count: self.keys,
                seed: self.seed,
            },
            DistributionArg::Fixed => KeyDistribution::Fixed(self.key.clone()),
        };

        let mut config = LoadTestConfig::new(self.requests, distribution).delta(self.delta);
        if let Some(limit) = self.concurrency_limit {
            config = config.concurrency_limit(limit);
        }
        if let Some(secs) = self.max_wait_secs {
            config = config.max_wait(Duration::from_secs(secs));
        }
        config
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = cli.workers {
        builder.worker_threads(workers.max(1));
    }
    let runtime = builder.build().context("failed to build tokio runtime")?;

    runtime.block_on(async move {
        match cli.command {
            Command::Serve {
                host,
                port,
                service,
            } => serve(host, port, service).await,
            Command::Bench {
                load,
                service,
                target_url,
            } => bench(load, service, target_url).await,
            Command::Compare { load, latency_ms } => compare(load, latency_ms).await,
        }
    })
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("inventory_bench=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn serve(host: Option<String>, port: Option<u16>, args: ServiceArgs) -> Result<()> {
    let mut config = ServerConfig::from_env().context("failed to load server configuration")?;
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }
    config.service = args.apply(config.service);

    let service = Arc::new(InventoryService::from_config(&config.service));
    let app = build_router(AppState::new(service, config.random_key_pool.clone()));

    let addr = config.address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        address = %addr,
        granularity = %config.service.lock_granularity,
        store_mode = %config.service.store_mode,
        latency_ms = config.service.store_latency.as_millis() as u64,
        "inventory server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn bench(load: LoadArgs, args: ServiceArgs, target_url: Option<String>) -> Result<()> {
    let target: Arc<dyn UpdateTarget> = match target_url {
        Some(url) => Arc::new(HttpTarget::new(url).context("failed to build HTTP target")?),
        None => Arc::new(InventoryService::from_config(&args.apply(ServiceConfig::new()))),
    };

    let report = run_once(load.to_config(), target).await?;
    println!("\n=== LOCK CONTENTION BENCHMARK ===");
    println!("{}", report);
    Ok(())
}

async fn compare(load: LoadArgs, latency_ms: u64) -> Result<()> {
    let mut rows = Vec::new();

    for granularity in [LockGranularity::Global, LockGranularity::PerKey] {
        for mode in [StoreMode::Pinning, StoreMode::Yielding] {
            let config = ServiceConfig::new()
                .store_latency(Duration::from_millis(latency_ms))
                .store_mode(mode)
                .lock_granularity(granularity);
            let service = Arc::new(InventoryService::from_config(&config));
            let report = run_once(load.to_config(), service).await?;
            rows.push((granularity, mode, report));
        }
    }

    println!("\n=== LOCK GRANULARITY COMPARISON ===");
    println!(
        "{:<12} {:<10} {:>12} {:>12} {:>10} {:>8}",
        "locks", "store", "total (s)", "avg (ms)", "req/s", "failed"
    );
    for (granularity, mode, report) in rows {
        println!(
            "{:<12} {:<10} {:>12.3} {:>12.3} {:>10.1} {:>8}",
            granularity.to_string(),
            mode.to_string(),
            report.total_seconds(),
            report.avg_ms_per_request(),
            report.requests_per_second(),
            report.failed
        );
    }
    Ok(())
}

async fn run_once(config: LoadTestConfig, target: Arc<dyn UpdateTarget>) -> Result<LoadTestReport> {
    let generator = LoadGenerator::new(config).context("invalid load test configuration")?;
    let report = generator.run(target).await.context("load test failed")?;
    Ok(report)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to install Ctrl+C signal handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
