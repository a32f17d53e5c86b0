use std::io::Write;

use sparse_life_core::Notification;
use sparse_life_system_emitter::{Transport, TransportError};

/// Writes each notification as one JSON line and flushes immediately.
#[derive(Debug)]
pub(crate) struct LineTransport<W> {
    writer: W,
}

impl<W: Write> LineTransport<W> {
    pub(crate) const fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> Transport for LineTransport<W> {
    fn deliver(&mut self, notification: Notification) -> Result<(), TransportError> {
        let line = sparse_life_wire::encode(&notification).map_err(|error| {
            TransportError::Encoding {
                message: error.to_string(),
            }
        })?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}
