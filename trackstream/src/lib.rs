//! Streaming pipeline wrapper: configuration, external collaborator traits,
//! the file-replay player, and the poll/process/write/sleep loop (§5, §6).

pub mod config;
pub mod error;
pub mod pipeline;
pub mod player;
pub mod sink;
pub mod stats;

pub use config::TrackStreamConfig;
pub use error::TrackStreamError;
pub use pipeline::{run_loop, BatchOutcome, TrackStreamPipeline};
pub use stats::LoopStats;
