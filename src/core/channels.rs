//! Inter-task channels
//!
//! Inbound commands flow through one bounded mpsc queue into a single
//! consumer, so concurrent submitters are applied strictly one at a time in
//! arrival order. Shutdown is a broadcast fanned out to every task.

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::adapters::InboundCommand;

/// Default channel capacity for bounded channels
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

/// The command consumer has stopped
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Command queue closed")]
pub struct QueueClosed;

/// Cloneable submit handle for the command queue
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::Sender<InboundCommand>,
}

impl CommandQueue {
    /// Enqueue a command. Returns as soon as the command is queued; the
    /// reply arrives later through the notifier.
    ///
    /// When the queue is full this waits for a free slot instead of dropping
    /// the command. The only producer is the inbound feed, which then stops
    /// polling until the consumer catches up.
    pub async fn submit(&self, command: InboundCommand) -> Result<(), QueueClosed> {
        self.tx.send(command).await.map_err(|_| QueueClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Bundle of all inter-task communication channels
#[derive(Debug)]
pub struct ChannelBundle {
    /// Feed and callers -> command task
    pub command_queue: CommandQueue,
    pub command_rx: mpsc::Receiver<InboundCommand>,

    /// Shutdown broadcast: main -> all tasks
    pub shutdown_tx: broadcast::Sender<()>,
}

impl ChannelBundle {
    pub fn new(capacity: usize) -> Self {
        let (tx, command_rx) = mpsc::channel(capacity.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            command_queue: CommandQueue { tx },
            command_rx,
            shutdown_tx,
        }
    }

    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }
}

impl Default for ChannelBundle {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
