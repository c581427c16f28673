use super::{CommandSink, SinkError};
use crate::resolver::ResolvedCommand;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

/// Forwards every command into an mpsc channel without waiting
pub struct ChannelSink {
    sender: mpsc::Sender<ResolvedCommand>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::Sender<ResolvedCommand>) -> Self {
        Self { sender }
    }
}

impl CommandSink for ChannelSink {
    fn emit(&mut self, command: &ResolvedCommand) -> Result<(), SinkError> {
        self.sender.try_send(*command).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    fn name(&self) -> &str {
        "channel"
    }
}

/// Publishes the latest command; readers always see the most recent one
pub struct WatchSink {
    sender: watch::Sender<Option<ResolvedCommand>>,
}

impl WatchSink {
    pub fn new() -> (Self, watch::Receiver<Option<ResolvedCommand>>) {
        let (sender, receiver) = watch::channel(None);
        (Self { sender }, receiver)
    }
}

impl CommandSink for WatchSink {
    fn emit(&mut self, command: &ResolvedCommand) -> Result<(), SinkError> {
        self.sender
            .send(Some(*command))
            .map_err(|_| SinkError::Closed)
    }

    fn name(&self) -> &str {
        "watch"
    }
}

/// Logs each distinct command published on `receiver` until the sink is dropped
pub async fn log_command_changes(
    mut receiver: watch::Receiver<Option<ResolvedCommand>>,
) -> u64 {
    let mut last: Option<ResolvedCommand> = None;
    let mut changes: u64 = 0;

    while receiver.changed().await.is_ok() {
        let current = *receiver.borrow_and_update();
        if current != last {
            if let Some(command) = current {
                info!("Command changed: {}", command);
                changes += 1;
            }
            last = current;
        }
    }

    debug!("Watch sink closed after {} command changes", changes);
    changes
}
