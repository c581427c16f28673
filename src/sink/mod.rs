//! Downstream boundary of the pipeline
//!
//! A [`CommandSink`] receives exactly one [`ResolvedCommand`] per consumed
//! sample. Rendering and actuation live behind this trait.

pub mod channel_sink;
pub mod log_sink;

pub use channel_sink::{log_command_changes, ChannelSink, WatchSink};
pub use log_sink::{LogSink, StdoutSink};

use crate::config::{SinkConfig, SinkKind};
use crate::resolver::ResolvedCommand;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("Sink receiver is closed")]
    Closed,

    #[error("Sink buffer is full")]
    Full,

    #[error("Failed to write command: {0}")]
    WriteError(String),
}

pub trait CommandSink: Send + 'static {
    fn emit(&mut self, command: &ResolvedCommand) -> Result<(), SinkError>;

    fn name(&self) -> &str;
}

/// Builds the sink selected by the `[sink]` config section.
///
/// The watch sink spawns its change logger, so it needs a tokio runtime.
pub fn build_sink(config: &SinkConfig) -> Box<dyn CommandSink> {
    match config.kind {
        SinkKind::Log => Box::new(LogSink::new()),
        SinkKind::Stdout => Box::new(StdoutSink::new()),
        SinkKind::Watch => {
            let (sink, receiver) = WatchSink::new();
            tokio::spawn(log_command_changes(receiver));
            Box::new(sink)
        }
    }
}
