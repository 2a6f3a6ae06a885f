//! MIDI input port
//!
//! midir only hands out a connection together with its callback, so the
//! port keeps a fixed callback that forwards every message to its
//! subscriber list. Subscribing never touches the device connection.

use crate::transport::{
    Callback, Capability, Delivery, Port, SubscriberList, Subscription, TransportError,
};
use midir::{Ignore, MidiInput, MidiInputConnection, MidiInputPort};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

pub struct MidirInputPort {
    client_name: String,
    port: MidiInputPort,
    name: String,
    connection: Mutex<Option<MidiInputConnection<()>>>,
    subscribers: Arc<SubscriberList>,
}

impl MidirInputPort {
    pub fn new(client_name: &str, port: MidiInputPort, name: String) -> Self {
        Self {
            client_name: client_name.to_string(),
            port,
            name,
            connection: Mutex::new(None),
            subscribers: SubscriberList::new(),
        }
    }

    fn connection(&self) -> MutexGuard<'_, Option<MidiInputConnection<()>>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn unavailable(&self, reason: impl ToString) -> TransportError {
        TransportError::EndpointUnavailable {
            name: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl Port for MidirInputPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> Capability {
        Capability::Read
    }

    fn is_connected(&self) -> bool {
        self.connection().is_some()
    }

    fn connect(&self) -> Result<(), TransportError> {
        let mut connection = self.connection();
        if connection.is_some() {
            return Ok(());
        }

        let mut midi_in = MidiInput::new(&self.client_name).map_err(|e| self.unavailable(e))?;
        // SysEx is filtered by default
        midi_in.ignore(Ignore::None);

        let subscribers = self.subscribers.clone();
        let port_label = format!("{}-in", self.client_name);
        let opened = midi_in
            .connect(
                &self.port,
                &port_label,
                move |_timestamp, message, _| {
                    log::trace!("[MIDI IN] {} bytes", message.len());
                    subscribers.deliver(Delivery::Data(message));
                },
                (),
            )
            .map_err(|e| self.unavailable(e))?;

        *connection = Some(opened);
        log::info!("MIDI: Connected to input '{}'", self.name);
        Ok(())
    }

    fn disconnect(&self) {
        let closed = self.connection().take();
        if let Some(connection) = closed {
            connection.close();
            log::info!("MIDI: Disconnected input '{}'", self.name);
            self.subscribers.deliver(Delivery::Closed);
        }
    }

    fn send(&self, _bytes: &[u8], _at: Option<Instant>) -> Result<(), TransportError> {
        Err(TransportError::NotWritable(self.name.clone()))
    }

    fn subscribe(&self, callback: Callback) -> Result<Subscription, TransportError> {
        Ok(self.subscribers.subscribe(callback))
    }
}

impl Drop for MidirInputPort {
    fn drop(&mut self) {
        self.disconnect();
    }
}
