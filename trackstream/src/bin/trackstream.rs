use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tracing::info;

use trackstream::pipeline::{run_loop, TrackStreamPipeline};
use trackstream::player::replay_batches;
use trackstream::sink::{AnomalySink, InMemoryBroker, StorageSink};
use trackstream::stats::LoopStats;
use trackstream::TrackStreamConfig;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// JSON configuration file (§6 "Configuration"); defaults used for any
    /// option it omits.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    /// Newline-delimited JSON file to replay as the ingress (§6
    /// "File-replay mode").
    #[arg(long)]
    replay_file: std::path::PathBuf,

    /// Shift replay timestamps so the first record starts "now".
    #[arg(long)]
    live: bool,
}

/// Logs anomaly events and storage writes instead of reaching a real
/// message bus / wide-column store, since neither is in this crate's
/// dependency set; see DESIGN.md.
struct LoggingAnomalySink;

impl AnomalySink for LoggingAnomalySink {
    fn publish(&self, record: &track_types::DetectionRecord) {
        info!(
            tracker_id = %record.object.tracker_id,
            event_type = %record.event.event_type,
            "anomaly"
        );
    }
}

struct LoggingStorageSink;

impl StorageSink for LoggingStorageSink {
    fn write_objectmarker(&self, record: &track_types::DetectionRecord) {
        tracing::debug!(message_id = %record.place.message_id(), "objectmarker write");
    }

    fn write_flowrate_entry(&self, location: &str, rate_per_hour: f64, timestamp: chrono::DateTime<chrono::Utc>) {
        info!(location, rate_per_hour, %timestamp, "flowrate entry");
    }

    fn write_flowrate_exit(&self, location: &str, rate_per_hour: f64, timestamp: chrono::DateTime<chrono::Utc>) {
        info!(location, rate_per_hour, %timestamp, "flowrate exit");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "trackstream=info,mctrack=info,statetrack=info,warn");
    }
    let _tracing_guard = env_tracing_logger::init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => TrackStreamConfig::from_file(path)?,
        None => TrackStreamConfig::default(),
    };

    let batches = replay_batches(&cli.replay_file, cfg.replay_batch_mode(), cli.live, chrono::Utc::now())?;
    info!(num_batches = batches.len(), "loaded replay file");
    let num_batches = batches.len();

    let mut broker = InMemoryBroker::new();
    for batch in batches {
        broker.push_batch(batch);
    }

    let pipeline = TrackStreamPipeline::new(cfg, Instant::now());
    let anomaly_sink: Arc<dyn AnomalySink> = Arc::new(LoggingAnomalySink);
    let storage_sink: Arc<dyn StorageSink> = Arc::new(LoggingStorageSink);
    let mut stats = LoopStats::new();

    // Stop once the finite replay file is drained (one extra poll past
    // the last batch to observe the empty broker), whichever comes first
    // against a Ctrl-C (§5 "Cancellation").
    let iterations_done = Arc::new(AtomicUsize::new(0));
    let should_stop = {
        let iterations_done = iterations_done.clone();
        move || iterations_done.fetch_add(1, Ordering::Relaxed) > num_batches
    };

    tokio::select! {
        _ = run_loop(pipeline, broker, anomaly_sink, storage_sink, &mut stats, should_stop) => {
            info!("replay file drained");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("received interrupt signal");
        }
    }

    stats.dump();
    Ok(())
}
