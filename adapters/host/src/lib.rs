#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Engine host that runs the protocol processor on a dedicated thread.
//!
//! The host side only ever holds an [`EngineHandle`]; all grid state lives on
//! the engine thread and is reached exclusively through messages. Outbound
//! notifications leave through the [`Transport`] handed to
//! [`EngineHandle::spawn`].
//!
//! The engine thread runs a single loop that waits for the next message or
//! the next due tick, whichever comes first. Elapsed time is applied before
//! the received message, so a `stop` can never be overtaken by a step that
//! was already queued behind it.

use std::{
    io, slice,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender},
    thread::{self, JoinHandle},
    time::Instant,
};

use sparse_life_core::{Command, CommandKind, Event, HaltReason};
use sparse_life_system_emitter::{ChangeEmitter, Transport};
use sparse_life_system_protocol::Processor;
use sparse_life_world::query;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const ENGINE_THREAD_NAME: &str = "sparse-life-engine";

/// Messages accepted by the engine thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostMessage {
    /// A decoded protocol command.
    Command(Command),
    /// A host message for a known command whose payload failed to decode.
    Malformed {
        /// Command the message was meant to carry.
        command: CommandKind,
    },
    /// Ends the engine loop.
    Shutdown,
}

/// Failures raised while talking to the engine thread.
#[derive(Debug, Error)]
pub enum HostError {
    /// The engine thread could not be started.
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] io::Error),
    /// The engine thread is no longer receiving messages.
    #[error("engine thread is not running")]
    Disconnected,
    /// The engine thread panicked.
    #[error("engine thread panicked")]
    Panicked,
}

/// Owning handle to a running engine thread.
///
/// Dropping the handle shuts the engine down and waits for the thread.
#[derive(Debug)]
pub struct EngineHandle {
    sender: Sender<HostMessage>,
    thread: Option<JoinHandle<()>>,
}

impl EngineHandle {
    /// Starts an engine thread that delivers notifications through `transport`.
    pub fn spawn<T>(transport: T) -> Result<Self, HostError>
    where
        T: Transport + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(ENGINE_THREAD_NAME.to_owned())
            .spawn(move || run(receiver, transport))?;
        info!(thread = ENGINE_THREAD_NAME, "engine thread started");

        Ok(Self {
            sender,
            thread: Some(thread),
        })
    }

    /// Queues a command for the engine.
    pub fn send(&self, command: Command) -> Result<(), HostError> {
        self.post(HostMessage::Command(command))
    }

    /// Reports a host message that named a command but could not be decoded.
    pub fn report_malformed(&self, command: CommandKind) -> Result<(), HostError> {
        self.post(HostMessage::Malformed { command })
    }

    /// Stops the engine after it has handled every queued message.
    pub fn shutdown(mut self) -> Result<(), HostError> {
        self.join()
    }

    fn post(&self, message: HostMessage) -> Result<(), HostError> {
        self.sender.send(message).map_err(|_| HostError::Disconnected)
    }

    fn join(&mut self) -> Result<(), HostError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        // The thread may already have exited; joining still reports a panic.
        let _ = self.sender.send(HostMessage::Shutdown);
        thread.join().map_err(|_| HostError::Panicked)?;
        info!(thread = ENGINE_THREAD_NAME, "engine thread stopped");
        Ok(())
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Err(error) = self.join() {
            error!(%error, "engine thread did not shut down cleanly");
        }
    }
}

fn run<T: Transport>(receiver: Receiver<HostMessage>, mut transport: T) {
    let mut processor = Processor::new();
    let mut emitter = ChangeEmitter::new();
    let mut events: Vec<Event> = Vec::new();
    let mut last = Instant::now();

    loop {
        let message = match processor.time_until_tick() {
            Some(wait) => match receiver.recv_timeout(wait) {
                Ok(message) => Some(message),
                Err(RecvTimeoutError::Timeout) => None,
                Err(RecvTimeoutError::Disconnected) => break,
            },
            None => match receiver.recv() {
                Ok(message) => Some(message),
                Err(_) => break,
            },
        };

        let now = Instant::now();
        processor.advance(now.duration_since(last), &mut events);
        last = now;

        let shutdown = match message {
            Some(HostMessage::Command(command)) => {
                processor.handle(command, &mut events);
                false
            }
            Some(HostMessage::Malformed { command }) => {
                processor.reject_malformed(command, &mut events);
                false
            }
            Some(HostMessage::Shutdown) => true,
            None => false,
        };

        flush(&mut processor, &mut emitter, &mut events, &mut transport);
        if shutdown {
            break;
        }
    }

    debug!(
        delivered = emitter.delivered(),
        generation = query::generation(processor.engine()),
        "engine loop finished"
    );
}

fn flush<T: Transport>(
    processor: &mut Processor,
    emitter: &mut ChangeEmitter,
    events: &mut Vec<Event>,
    transport: &mut T,
) {
    let failed = events.iter().position(|event| {
        let result = emitter.handle(slice::from_ref(event), transport);
        if let Err(error) = &result {
            error!(%error, "notification transport failed; halting scheduler");
        }
        result.is_err()
    });
    let Some(index) = failed else {
        events.clear();
        return;
    };

    // The halt notice goes first, then whatever the failed batch still held.
    let remaining = events.split_off(index + 1);
    events.clear();
    processor.halt(HaltReason::TransportFailed, events);
    events.extend(remaining);

    let undelivered = events
        .iter()
        .filter(|event| emitter.handle(slice::from_ref(*event), transport).is_err())
        .count();
    if undelivered > 0 {
        warn!(undelivered, "notifications lost after transport failure");
    }
    events.clear();
}

#[cfg(test)]
mod tests {
    use super::flush;
    use sparse_life_core::{
        CellChange, CellCoord, CommandKind, Event, Notification, RejectionReason,
    };
    use sparse_life_system_emitter::{ChangeEmitter, Transport, TransportError};
    use sparse_life_system_protocol::Processor;

    #[derive(Default)]
    struct FirstChangeFails {
        failed: bool,
        delivered: Vec<Notification>,
    }

    impl Transport for FirstChangeFails {
        fn deliver(&mut self, notification: Notification) -> Result<(), TransportError> {
            if matches!(notification, Notification::StateChanges { .. }) && !self.failed {
                self.failed = true;
                return Err(TransportError::Disconnected);
            }
            self.delivered.push(notification);
            Ok(())
        }
    }

    #[test]
    fn events_after_a_failed_delivery_still_reach_the_host() {
        let mut processor = Processor::new();
        let mut emitter = ChangeEmitter::new();
        let mut transport = FirstChangeFails::default();
        let mut events = vec![
            Event::GenerationAdvanced {
                generation: 1,
                changes: vec![CellChange::new(CellCoord::new(1, 1), true)],
            },
            Event::CommandRejected {
                command: CommandKind::Start,
                reason: RejectionReason::NotInitialized,
            },
        ];

        flush(&mut processor, &mut emitter, &mut events, &mut transport);

        assert!(events.is_empty());
        assert_eq!(
            transport.delivered,
            vec![
                Notification::Error {
                    message: "simulation halted: state change delivery failed".to_owned(),
                },
                Notification::Error {
                    message: "start rejected: engine is not initialized".to_owned(),
                },
            ]
        );
    }
}
