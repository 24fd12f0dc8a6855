use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use dine4fit_client::Dine4FitClient;
use foodcrawl_common::Config;
use foodcrawl_harvester::{
    cache::DedupCache,
    feed::load_feeds,
    pipeline::{HarvestPipeline, PipelineOptions},
    sink::CsvBatchSink,
};

#[derive(Parser)]
#[command(name = "foodcrawl", about = "Harvest Dine4Fit food details into CSV batches")]
struct Cli {
    /// Input feed files (`{"data": [{"id": ...}]}`), processed in order
    inputs: Vec<PathBuf>,

    #[arg(long)]
    output_dir: Option<PathBuf>,

    #[arg(long)]
    batch_size: Option<usize>,

    /// Number of concurrent fetch workers
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long)]
    max_attempts: Option<u32>,

    /// Base backoff in milliseconds; attempt k waits k × this
    #[arg(long)]
    backoff_ms: Option<u64>,

    #[arg(long)]
    queue_factor: Option<usize>,

    /// Stop dispatching and wind down after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Load the dedup cache from this file at start and save it back at exit
    #[arg(long)]
    cache_snapshot: Option<PathBuf>,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn apply(self, config: &mut Config) {
        if !self.inputs.is_empty() {
            config.inputs = self.inputs;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(n) = self.batch_size {
            config.batch_size = n;
        }
        if let Some(n) = self.workers {
            config.worker_count = n;
        }
        if let Some(n) = self.max_attempts {
            config.max_attempts = n;
        }
        if let Some(ms) = self.backoff_ms {
            config.backoff_base = Duration::from_millis(ms);
        }
        if let Some(n) = self.queue_factor {
            config.queue_factor = n;
        }
        if let Some(secs) = self.deadline_secs {
            config.deadline = Some(Duration::from_secs(secs));
        }
        if let Some(path) = self.cache_snapshot {
            config.cache_snapshot = Some(path);
        }
    }
}

fn init_logging(json: bool) -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("foodcrawl=info".parse()?);
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

/// Layer CLI flags over the env config, then range-check the result.
fn resolve_config(cli: Cli, mut config: Config) -> Result<Config> {
    cli.apply(&mut config);
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json)?;

    info!("Foodcrawl harvester starting...");

    let config = resolve_config(cli, Config::from_env()?)?;
    config.log_redacted();

    let ids = load_feeds(&config.inputs)?;

    let cache = Arc::new(match &config.cache_snapshot {
        Some(path) => DedupCache::load_snapshot(path),
        None => DedupCache::new(),
    });

    let client = Dine4FitClient::new(
        &config.base_url,
        &config.lang,
        &config.access_key,
        config.request_timeout,
    )
    .context("Failed to build Dine4Fit client")?;

    let sink = CsvBatchSink::new(&config.output_dir)?;

    let cancel = CancellationToken::new();
    spawn_shutdown_triggers(cancel.clone(), config.deadline);

    let pipeline = HarvestPipeline::new(
        Arc::new(client),
        cache.clone(),
        PipelineOptions::from(&config),
    );
    let outcome = pipeline.run(ids, sink, cancel.clone()).await;
    cancel.cancel();

    if let Some(path) = &config.cache_snapshot {
        if let Err(e) = cache.save_snapshot(path) {
            warn!(error = %e, "Failed to save cache snapshot");
        }
    }

    let mut stats = outcome?;
    stats.batch_files = (1..=stats.batches() as u32)
        .map(|i| CsvBatchSink::batch_path(&config.output_dir, i))
        .collect();

    info!("{stats}");
    Ok(())
}

/// Cancel the run on Ctrl-C or once `deadline` elapses.
fn spawn_shutdown_triggers(cancel: CancellationToken, deadline: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = on_signal.cancelled() => {}
            res = tokio::signal::ctrl_c() => {
                if res.is_ok() {
                    warn!("Interrupt received, finishing in-flight work");
                    on_signal.cancel();
                }
            }
        }
    });

    if let Some(deadline) = deadline {
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(deadline) => {
                    warn!(secs = deadline.as_secs(), "Deadline reached, finishing in-flight work");
                    cancel.cancel();
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_config(pairs: &[(&str, &str)]) -> Config {
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    #[test]
    fn flag_overrides_out_of_range_env_value() {
        let env = env_config(&[("DINE4FIT_PID", "secret"), ("FOODCRAWL_BATCH_SIZE", "0")]);
        let cli = Cli::try_parse_from(["foodcrawl", "--batch-size", "5"]).unwrap();

        let config = resolve_config(cli, env).unwrap();
        assert_eq!(config.batch_size, 5);
    }

    #[test]
    fn out_of_range_env_value_without_flag_is_rejected() {
        let env = env_config(&[("DINE4FIT_PID", "secret"), ("FOODCRAWL_WORKERS", "0")]);
        let cli = Cli::try_parse_from(["foodcrawl"]).unwrap();

        let err = resolve_config(cli, env).unwrap_err();
        assert!(err.to_string().contains("worker_count"));
    }

    #[test]
    fn positional_inputs_replace_env_inputs() {
        let env = env_config(&[("DINE4FIT_PID", "secret"), ("FOODCRAWL_INPUTS", "env.json")]);
        let cli = Cli::try_parse_from(["foodcrawl", "a.json", "b.json", "--workers", "2"]).unwrap();

        let config = resolve_config(cli, env).unwrap();
        assert_eq!(config.inputs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(config.worker_count, 2);
    }
}
