//! Status byte classification for MIDI 1.0 bytestreams.

pub const SYSEX_START: u8 = 0xF0;
pub const SYSEX_END: u8 = 0xF7;
pub const ACTIVE_SENSING: u8 = 0xFE;

#[inline]
pub fn is_status(byte: u8) -> bool {
    byte & 0x80 != 0
}

/// System real-time bytes may appear anywhere, even inside other messages.
#[inline]
pub fn is_realtime(byte: u8) -> bool {
    byte >= 0xF8
}

/// Channel voice/mode statuses are the only ones that set running status.
#[inline]
pub fn is_channel_status(byte: u8) -> bool {
    (0x80..=0xEF).contains(&byte)
}

/// Data bytes carried by a channel status (program change and channel pressure take one).
#[inline]
pub fn channel_data_length(status: u8) -> usize {
    match status & 0xF0 {
        0xC0 | 0xD0 => 1,
        _ => 2,
    }
}

/// Data bytes following `status`, or `None` for bytes that never start a
/// message on their own (sysex delimiters, undefined statuses, data bytes).
pub fn data_length(status: u8) -> Option<usize> {
    match status {
        0x80..=0xEF => Some(channel_data_length(status)),
        0xF1 | 0xF3 => Some(1),
        0xF2 => Some(2),
        0xF6 => Some(0),
        0xF8..=0xFF => Some(0),
        _ => None,
    }
}
