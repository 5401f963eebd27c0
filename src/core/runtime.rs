//! Runtime tasks
//!
//! The command task is the single consumer of the command queue. The inbound
//! feed task long-polls the chat transport and submits every command line it
//! returns. Both exit on the shutdown broadcast.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::adapters::{CommandTransport, InboundCommand, Notifier};
use crate::core::channels::CommandQueue;
use crate::core::commands::CommandProcessor;

/// Apply queued commands one at a time, in arrival order
pub async fn command_task<N>(
    mut command_rx: mpsc::Receiver<InboundCommand>,
    processor: CommandProcessor<N>,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    N: Notifier,
{
    info!("Command task started");
    let mut processed: u64 = 0;

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!(processed = processed, "Command task shutting down");
                break;
            }
            next = command_rx.recv() => {
                let Some(command) = next else {
                    info!(processed = processed, "Command queue closed");
                    break;
                };
                processed += 1;
                debug!(chat_id = %command.chat_id, text = %command.text, "Processing command");
                processor.handle(command).await;
            }
        }
    }
}

/// Forward commands from the chat transport into the queue
///
/// Transport errors are logged and retried after `backoff`.
pub async fn inbound_feed_task<T>(
    transport: Arc<T>,
    queue: CommandQueue,
    backoff: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) where
    T: CommandTransport,
{
    info!("Inbound feed started");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Inbound feed shutting down");
                break;
            }
            polled = transport.next_commands() => {
                match polled {
                    Ok(commands) => {
                        for command in commands {
                            if queue.submit(command).await.is_err() {
                                warn!("Command queue closed, stopping inbound feed");
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        error!(error = %e, backoff_secs = backoff.as_secs(), "Failed to poll commands");
                        tokio::select! {
                            _ = shutdown_rx.recv() => {
                                info!("Inbound feed shutting down");
                                break;
                            }
                            _ = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            }
        }
    }
}
