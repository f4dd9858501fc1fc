use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use config::{File, FileFormat};
use tokio::sync::mpsc;
use tracing::{info, warn};

use phi_detector::config::PhiAccrualConfig;
use phi_detector::ext::init_logger_with_filter;
use phi_detector::failure_detector::PhiAccrualFailureDetector;

/// Detector tuning for the simulated peer, tight enough that the outage is noticed.
const PLAYGROUND_PRESET: &str = r#"
threshold = 8.0
max_sample_size = 10
min_std_deviation_ms = 10
acceptable_heartbeat_pause_ms = 0
first_heartbeat_estimate_ms = 100
"#;

/// Watches a simulated peer that heartbeats, goes silent for a while, then comes back.
#[derive(Parser, Debug)]
struct Args {
    /// TOML file layered over the playground preset
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long)]
    threshold: Option<f64>,
    #[arg(long)]
    max_sample_size: Option<i32>,
    #[arg(long)]
    min_std_deviation_ms: Option<i64>,
    #[arg(long)]
    acceptable_heartbeat_pause_ms: Option<i64>,
    #[arg(long)]
    first_heartbeat_estimate_ms: Option<i64>,
    /// Heartbeat cadence of the simulated peer
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,
    /// Heartbeats sent before and after the outage
    #[arg(long, default_value_t = 5)]
    rounds: usize,
    /// Silence of the simulated peer
    #[arg(long, default_value_t = 400)]
    outage_ms: u64,
    /// Print the effective detector config and exit
    #[arg(long)]
    print_config: bool,
}

impl Args {
    fn detector_config(&self) -> anyhow::Result<PhiAccrualConfig> {
        let mut loader = PhiAccrualConfig::loader()
            .add_source(File::from_str(PLAYGROUND_PRESET, FileFormat::Toml));
        if let Some(path) = &self.config {
            loader = loader.add_source(File::from(path.as_path()));
        }
        let mut config = loader.build()?;
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(max_sample_size) = self.max_sample_size {
            config.max_sample_size = max_sample_size;
        }
        if let Some(min_std_deviation_ms) = self.min_std_deviation_ms {
            config.min_std_deviation_ms = min_std_deviation_ms;
        }
        if let Some(acceptable_heartbeat_pause_ms) = self.acceptable_heartbeat_pause_ms {
            config.acceptable_heartbeat_pause_ms = acceptable_heartbeat_pause_ms;
        }
        if let Some(first_heartbeat_estimate_ms) = self.first_heartbeat_estimate_ms {
            config.first_heartbeat_estimate_ms = first_heartbeat_estimate_ms;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Copy, Clone)]
struct Heartbeat {
    seq: usize,
}

async fn simulate_peer(tx: mpsc::Sender<Heartbeat>, tick: Duration, rounds: usize, outage: Duration) {
    let mut seq = 0;
    for phase in 0..2 {
        if phase == 1 {
            info!("peer goes silent for {:?}", outage);
            tokio::time::sleep(outage).await;
            info!("peer is back");
        }
        let mut interval = tokio::time::interval(tick);
        for _ in 0..rounds {
            interval.tick().await;
            seq += 1;
            if tx.send(Heartbeat { seq }).await.is_err() {
                warn!("monitor stopped, peer exits");
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logger_with_filter("phi_detector=info,monitor=info");
    let config = args.detector_config()?;
    if args.print_config {
        println!("{}", toml::to_string(&config)?);
        return Ok(());
    }
    info!("monitoring with {:?}", config);
    let detector = Arc::new(PhiAccrualFailureDetector::new(config)?);

    let tick = Duration::from_millis(args.tick_ms);
    let (tx, mut rx) = mpsc::channel(16);
    let peer = tokio::spawn(simulate_peer(tx, tick, args.rounds, Duration::from_millis(args.outage_ms)));

    let mut check = tokio::time::interval(tick);
    let mut last_verdict = true;
    loop {
        tokio::select! {
            heartbeat = rx.recv() => {
                match heartbeat {
                    Some(Heartbeat { seq }) => {
                        detector.heartbeat();
                        info!("heartbeat #{} received", seq);
                    }
                    None => break,
                }
            }
            _ = check.tick() => {
                let phi = detector.phi();
                let available = detector.is_available();
                if available != last_verdict {
                    warn!("peer availability changed to {}", available);
                    last_verdict = available;
                }
                info!("phi {:.3} available? {}", phi, available);
            }
        }
    }
    peer.await?;
    info!("final verdict: available? {} ({:?})", detector.is_available(), detector);
    Ok(())
}
