//! MIDI output port

use crate::transport::{Callback, Capability, Port, Subscription, TransportError};
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub struct MidirOutputPort {
    client_name: String,
    port: MidiOutputPort,
    name: String,
    connection: Mutex<Option<MidiOutputConnection>>,
}

impl MidirOutputPort {
    pub fn new(client_name: &str, port: MidiOutputPort, name: String) -> Self {
        Self {
            client_name: client_name.to_string(),
            port,
            name,
            connection: Mutex::new(None),
        }
    }

    fn connection(&self) -> MutexGuard<'_, Option<MidiOutputConnection>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Port for MidirOutputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Write
    }

    fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    fn connect(&self) -> Result<(), TransportError> {
        let mut connection = self.connection();
        if connection.is_some() {
            return Ok(());
        }

        let unavailable = |reason: String| TransportError::EndpointUnavailable {
            name: self.name.clone(),
            reason,
        };
        let midi_out = MidiOutput::new(&self.client_name).map_err(|e| unavailable(e.to_string()))?;
        let opened = midi_out
            .connect(&self.port, &format!("{}-out", self.client_name))
            .map_err(|e| unavailable(e.to_string()))?;

        *connection = Some(opened);
        log::info!("MIDI: Connected to output '{}'", self.name);
        Ok(())
    }

    fn disconnect(&self) {
        let closed = self.connection().take();
        if let Some(connection) = closed {
            connection.close();
            log::info!("MIDI: Disconnected output '{}'", self.name);
        }
    }

    /// midir has no scheduled output, so a timestamp is honored by waiting
    fn send(&self, bytes: &[u8], at: Option<Instant>) -> Result<(), TransportError> {
        if let Some(wait) = at.and_then(|at| at.checked_duration_since(Instant::now())) {
            std::thread::sleep(wait);
        }

        let mut connection = self.connection();
        let connection = connection
            .as_mut()
            .ok_or_else(|| TransportError::Closed(self.name.clone()))?;

        if log::log_enabled!(log::Level::Trace) {
            log::trace!("[MIDI OUT] {} {:02X?}", self.name, bytes);
        }
        connection
            .send(bytes)
            .map_err(|e| TransportError::SendFailed {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }

    fn subscribe(&self, _callback: Callback) -> Result<Subscription, TransportError> {
        Err(TransportError::NotReadable(self.name.clone()))
    }
}

impl Drop for MidirOutputPort {
    fn drop(&mut self) {
        self.disconnect();
    }
}
