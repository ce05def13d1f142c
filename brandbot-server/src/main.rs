use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use brandbot_core::auth::TenantStrategy;
use brandbot_core::training::TrainingConfig;

mod api;
mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "brandbot")]
#[command(author, version, about = "BrandBot - multi-tenant branded chatbot backend")]
pub struct Args {
    /// Postgres connection URL.
    #[arg(long, env = "BRANDBOT_DATABASE_URL", default_value = "postgres://brandbot@localhost:5432/brandbot")]
    database_url: String,

    /// Maximum pooled Postgres connections.
    #[arg(long, env = "BRANDBOT_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Address the HTTP API binds to.
    #[arg(long, env = "BRANDBOT_BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: String,

    /// How a request is mapped to its company: first | header | session.
    #[arg(long, env = "BRANDBOT_TENANT_STRATEGY", default_value = "first")]
    tenant_strategy: String,

    /// Keep all data in process memory instead of Postgres.
    #[arg(long, env = "BRANDBOT_MEMORY", default_value_t = false)]
    memory: bool,

    #[arg(long, env = "BRANDBOT_TRAINING_WORKERS", default_value_t = 4)]
    training_workers: usize,

    #[arg(long, env = "BRANDBOT_TRAINING_QUEUE", default_value_t = 64)]
    training_queue: usize,

    #[arg(long, env = "BRANDBOT_TRAINING_MIN_DELAY_MS", default_value_t = 3000)]
    training_min_delay_ms: u64,

    #[arg(long, env = "BRANDBOT_TRAINING_MAX_DELAY_MS", default_value_t = 5000)]
    training_max_delay_ms: u64,

    /// Probability in [0, 1] that a simulated run fails.
    #[arg(long, env = "BRANDBOT_TRAINING_FAILURE_RATE", default_value_t = 0.0)]
    training_failure_rate: f64,

    /// Seconds before an unreleased training lease may be taken over.
    #[arg(long, env = "BRANDBOT_TRAINING_LEASE_SECS", default_value_t = 300)]
    training_lease_secs: u64,
}

impl Args {
    pub fn training_config(&self) -> Result<TrainingConfig, brandbot_core::Error> {
        if !(0.0..=1.0).contains(&self.training_failure_rate) {
            return Err(brandbot_core::Error::Config(format!(
                "training failure rate must be within [0, 1], got {}",
                self.training_failure_rate
            )));
        }
        Ok(TrainingConfig {
            workers: self.training_workers,
            queue_capacity: self.training_queue,
            min_delay: Duration::from_millis(self.training_min_delay_ms),
            max_delay: Duration::from_millis(self.training_max_delay_ms),
            failure_rate: self.training_failure_rate,
            lease_ttl: Duration::from_secs(self.training_lease_secs),
        })
    }

    pub fn tenant_strategy(&self) -> Result<TenantStrategy, brandbot_core::Error> {
        self.tenant_strategy
            .parse::<TenantStrategy>()
            .map_err(brandbot_core::Error::Config)
    }
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("brandbot=info".parse().unwrap_or_default())
        .add_directive("brandbot_core=info".parse().unwrap_or_default())
        .add_directive("brandbot_server=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global tracing subscriber: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn training_config_rejects_out_of_range_failure_rate() {
        for rate in ["NaN", "inf", "-0.5", "1.5"] {
            let flag = format!("--training-failure-rate={rate}");
            let args = Args::parse_from(["brandbot", flag.as_str()]);
            assert!(
                matches!(args.training_config(), Err(brandbot_core::Error::Config(_))),
                "{rate}"
            );
        }
        let args = Args::parse_from(["brandbot", "--training-failure-rate=0.25"]);
        assert_eq!(args.training_config().unwrap().failure_rate, 0.25);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!(
        "BrandBot starting. bind_addr={}, tenant_strategy={}, memory={}",
        args.bind_addr, args.tenant_strategy, args.memory
    );

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
