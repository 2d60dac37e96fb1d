//! Audit journal of resource events.
//!
//! [`EventJournal`] subscribes to the [`EventBus`](crate::bus::EventBus)
//! broadcast channel and appends every received [`ResourceEvent`] as one
//! JSON line to a writer. It runs as a long-lived background task and shuts
//! down gracefully when the bus sender is dropped.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::broadcast;

use crate::bus::ResourceEvent;

/// Error type for journal writes.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("Journal write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Background service that writes resource events to a line-oriented sink.
pub struct EventJournal;

impl EventJournal {
    /// Run the journal loop.
    ///
    /// Writes every event received on `receiver` to `writer` and returns the
    /// number of events written once the channel is closed (i.e. the
    /// [`EventBus`](crate::bus::EventBus) is dropped).
    pub async fn run<W>(mut writer: W, mut receiver: broadcast::Receiver<ResourceEvent>) -> u64
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0;
        loop {
            match receiver.recv().await {
                Ok(event) => match Self::append(&mut writer, &event).await {
                    Ok(()) => written += 1,
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to journal event"
                        );
                    }
                },
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(
                        skipped = n,
                        "Event journal lagged, some events were not recorded"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!(written, "Event bus closed, journal shutting down");
                    break;
                }
            }
        }
        written
    }

    /// Write a single event as a JSON line and flush.
    pub async fn append<W>(writer: &mut W, event: &ResourceEvent) -> Result<(), JournalError>
    where
        W: AsyncWrite + Unpin,
    {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
