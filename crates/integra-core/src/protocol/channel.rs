//! Channel voice messages passed straight through to the tone generator

use crate::int::{Byte7, Nibble};

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;

/// `9n kk vv`
pub fn note_on(channel: Nibble, note: Byte7, velocity: Byte7) -> [u8; 3] {
    [NOTE_ON | channel.value(), note.value(), velocity.value()]
}

/// `8n kk vv`
pub fn note_off(channel: Nibble, note: Byte7, velocity: Byte7) -> [u8; 3] {
    [NOTE_OFF | channel.value(), note.value(), velocity.value()]
}
