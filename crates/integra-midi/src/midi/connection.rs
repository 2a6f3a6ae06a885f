//! MIDI port enumeration

use super::{MidirInputPort, MidirOutputPort};
use crate::endpoint::Endpoint;
use crate::transport::{Transport, TransportError};
use midir::{MidiInput, MidiOutput};
use std::sync::Arc;

/// Transport over every MIDI port midir can see
#[derive(Debug, Clone)]
pub struct MidirTransport {
    /// Client name shown to other MIDI applications
    client_name: String,
    /// Case-insensitive substring a port name must contain
    port_filter: Option<String>,
}

impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
            port_filter: None,
        }
    }

    /// Only expose ports whose name contains `pattern` (case-insensitive)
    pub fn with_port_filter(mut self, pattern: Option<String>) -> Self {
        self.port_filter = pattern.map(|p| p.to_lowercase());
        self
    }

    fn accepts(&self, port_name: &str) -> bool {
        self.port_filter
            .as_deref()
            .map_or(true, |pattern| port_name.to_lowercase().contains(pattern))
    }

    /// Names of all MIDI input ports
    pub fn list_input_ports(&self) -> Result<Vec<String>, TransportError> {
        let midi_in = MidiInput::new(&format!("{}-list", self.client_name))
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        Ok(midi_in
            .ports()
            .iter()
            .filter_map(|port| midi_in.port_name(port).ok())
            .collect())
    }

    /// Names of all MIDI output ports
    pub fn list_output_ports(&self) -> Result<Vec<String>, TransportError> {
        let midi_out = MidiOutput::new(&format!("{}-list", self.client_name))
            .map_err(|e| TransportError::Backend(e.to_string()))?;

        Ok(midi_out
            .ports()
            .iter()
            .filter_map(|port| midi_out.port_name(port).ok())
            .collect())
    }
}

impl Transport for MidirTransport {
    fn endpoints(&self) -> Result<Vec<Endpoint>, TransportError> {
        let mut endpoints = Vec::new();

        let midi_in = MidiInput::new(&format!("{}-scan", self.client_name))
            .map_err(|e| TransportError::Backend(e.to_string()))?;
        for port in midi_in.ports() {
            let name = match midi_in.port_name(&port) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("MIDI: Skipping input port without a name: {}", e);
                    continue;
                }
            };
            if !self.accepts(&name) {
                log::trace!("MIDI: Filtered out input '{}'", name);
                continue;
            }
            log::debug!("MIDI: Found input port: {}", name);
            let port = MidirInputPort::new(&self.client_name, port, name);
            endpoints.push(Endpoint::new(Arc::new(port)));
        }

        let midi_out = MidiOutput::new(&format!("{}-scan", self.client_name))
            .map_err(|e| TransportError::Backend(e.to_string()))?;
        for port in midi_out.ports() {
            let name = match midi_out.port_name(&port) {
                Ok(name) => name,
                Err(e) => {
                    log::warn!("MIDI: Skipping output port without a name: {}", e);
                    continue;
                }
            };
            if !self.accepts(&name) {
                log::trace!("MIDI: Filtered out output '{}'", name);
                continue;
            }
            log::debug!("MIDI: Found output port: {}", name);
            let port = MidirOutputPort::new(&self.client_name, port, name);
            endpoints.push(Endpoint::new(Arc::new(port)));
        }

        Ok(endpoints)
    }
}
