//! midir backend
//!
//! Exposes the host's MIDI ports (ALSA on Linux, CoreMIDI on macOS, WinMM on
//! Windows) as transport endpoints. MIDI inputs are readable, outputs
//! writable; the two directions of one device are separate endpoints.

pub mod connection;
pub mod input;
pub mod output;

pub use connection::MidirTransport;
pub use input::MidirInputPort;
pub use output::MidirOutputPort;
