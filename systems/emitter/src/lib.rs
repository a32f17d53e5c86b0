#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Change emitter that turns engine events into outbound host notifications.
//!
//! Exactly one `stateChanges` notification is produced per non-empty change
//! batch; empty batches produce nothing so a quiescent simulation stays
//! silent. Rejections and scheduler halts are surfaced as error
//! notifications.

use std::{io, sync::mpsc::Sender};

use sparse_life_core::{CellChange, Event, Notification};
use thiserror::Error;
use tracing::{trace, warn};

/// Failures raised while delivering a notification to the host.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The receiving side of the transport has gone away.
    #[error("notification receiver disconnected")]
    Disconnected,
    /// Writing the encoded notification failed.
    #[error("failed to write notification: {0}")]
    Io(#[from] io::Error),
    /// The notification could not be encoded for the wire.
    #[error("failed to encode notification: {message}")]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },
}

/// Outbound channel that carries notifications to the host.
pub trait Transport {
    /// Delivers a single notification.
    fn deliver(&mut self, notification: Notification) -> Result<(), TransportError>;
}

impl Transport for Vec<Notification> {
    fn deliver(&mut self, notification: Notification) -> Result<(), TransportError> {
        self.push(notification);
        Ok(())
    }
}

impl Transport for Sender<Notification> {
    fn deliver(&mut self, notification: Notification) -> Result<(), TransportError> {
        self.send(notification).map_err(|_| TransportError::Disconnected)
    }
}

/// Maps engine events to host notifications and counts deliveries.
#[derive(Debug, Default)]
pub struct ChangeEmitter {
    delivered: u64,
}

impl ChangeEmitter {
    /// Creates a new emitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of notifications delivered so far.
    #[must_use]
    pub const fn delivered(&self) -> u64 {
        self.delivered
    }

    /// Forwards the notifications derived from `events` to the transport.
    ///
    /// Delivery stops at the first failure, which is returned to the caller.
    /// Returns the number of notifications delivered.
    pub fn handle<T>(
        &mut self,
        events: &[Event],
        transport: &mut T,
    ) -> Result<usize, TransportError>
    where
        T: Transport + ?Sized,
    {
        let mut sent = 0;
        for event in events {
            let Some(notification) = notification_for(event) else {
                continue;
            };

            if let Err(error) = transport.deliver(notification) {
                warn!(%error, "notification delivery failed");
                return Err(error);
            }
            sent += 1;
            self.delivered += 1;
        }

        if sent > 0 {
            trace!(sent, "notifications delivered");
        }
        Ok(sent)
    }
}

fn notification_for(event: &Event) -> Option<Notification> {
    match event {
        Event::GenerationAdvanced {
            generation,
            changes,
        } => state_changes(Some(*generation), changes),
        Event::CellsEdited { changes } => state_changes(None, changes),
        Event::CommandRejected { command, reason } => Some(Notification::Error {
            message: format!("{command} rejected: {reason}"),
        }),
        Event::SchedulerHalted { reason } => Some(Notification::Error {
            message: format!("simulation halted: {reason}"),
        }),
        Event::Initialized { .. }
        | Event::ProtocolStateChanged { .. }
        | Event::TickIntervalChanged { .. } => None,
    }
}

fn state_changes(generation: Option<u64>, changes: &[CellChange]) -> Option<Notification> {
    if changes.is_empty() {
        return None;
    }
    Some(Notification::StateChanges {
        generation,
        changes: changes.to_vec(),
    })
}
