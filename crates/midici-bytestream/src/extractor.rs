//! Bytestream to message extraction with running status and sysex tracking.

use smallvec::SmallVec;
use tracing::trace;

use crate::status::{
    channel_data_length, data_length, is_channel_status, is_realtime, is_status, SYSEX_END,
    SYSEX_START,
};

/// What a chunk passed to the [`BytestreamSysexExtractor::push`] callback contains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SysexExtractorCallbackKind {
    /// Part of a sysex that is still open at the end of this call.
    OngoingSysex,
    /// The final part of a sysex, ended by `0xF7` or cut short by another status byte.
    LastSysex,
    /// A complete non-sysex message, status byte included.
    NotSysex,
}

/// Splits a MIDI 1.0 bytestream into messages across arbitrary chunk boundaries.
///
/// One extractor represents one continuous stream. State (running status,
/// a partially received channel message, an open sysex) carries over between
/// calls to [`push`](Self::push); construct a new extractor to reset it.
#[derive(Debug, Default)]
pub struct BytestreamSysexExtractor {
    running_status: Option<u8>,
    /// Non-sysex message under construction, status byte first.
    pending: SmallVec<[u8; 3]>,
    expected_len: usize,
    in_sysex: bool,
}

impl BytestreamSysexExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn is_sysex_in_progress(&self) -> bool {
        self.in_sysex
    }

    #[inline]
    pub fn running_status(&self) -> Option<u8> {
        self.running_status
    }

    /// Consume `bytes`, reporting every finished or still-open chunk to `callback`.
    ///
    /// Sysex chunks borrow from `bytes`; a sysex spanning several calls is
    /// reported once per call. Every call that leaves a sysex open ends with an
    /// [`OngoingSysex`](SysexExtractorCallbackKind::OngoingSysex) chunk, which is
    /// empty when no sysex bytes followed the last realtime byte (or for an empty push).
    pub fn push<F>(&mut self, bytes: &[u8], mut callback: F)
    where
        F: FnMut(SysexExtractorCallbackKind, &[u8]),
    {
        if bytes.is_empty() {
            if self.in_sysex {
                callback(SysexExtractorCallbackKind::OngoingSysex, &[]);
            }
            return;
        }

        let mut sysex_start = self.in_sysex.then_some(0);

        for (index, byte) in bytes.iter().enumerate() {
            let byte = *byte;

            if is_realtime(byte) {
                if let Some(start) = sysex_start {
                    if start < index {
                        callback(
                            SysexExtractorCallbackKind::OngoingSysex,
                            &bytes[start..index],
                        );
                    }
                    sysex_start = Some(index + 1);
                }
                callback(
                    SysexExtractorCallbackKind::NotSysex,
                    &bytes[index..index + 1],
                );
                continue;
            }

            if let Some(start) = sysex_start {
                if !is_status(byte) {
                    continue;
                }

                if byte == SYSEX_END {
                    callback(SysexExtractorCallbackKind::LastSysex, &bytes[start..=index]);
                    sysex_start = None;
                    continue;
                }

                trace!(status = byte, "sysex truncated by status byte");
                callback(SysexExtractorCallbackKind::LastSysex, &bytes[start..index]);
                sysex_start = None;
            }

            if byte == SYSEX_START {
                self.discard_pending();
                self.running_status = None;
                sysex_start = Some(index);
            } else if is_status(byte) {
                self.begin_message(byte, &mut callback);
            } else {
                self.push_data(byte, &mut callback);
            }
        }

        self.in_sysex = sysex_start.is_some();

        // An open sysex is always reported, even with nothing new after a realtime byte.
        if let Some(start) = sysex_start {
            callback(SysexExtractorCallbackKind::OngoingSysex, &bytes[start..]);
        }
    }

    fn begin_message<F>(&mut self, status: u8, callback: &mut F)
    where
        F: FnMut(SysexExtractorCallbackKind, &[u8]),
    {
        self.discard_pending();

        let Some(len) = data_length(status) else {
            trace!(status, "dropping undefined or stray status byte");
            self.running_status = None;
            return;
        };

        self.running_status = is_channel_status(status).then_some(status);
        self.pending.push(status);
        self.expected_len = len + 1;
        self.flush_if_complete(callback);
    }

    fn push_data<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(SysexExtractorCallbackKind, &[u8]),
    {
        if self.pending.is_empty() {
            let Some(status) = self.running_status else {
                trace!(byte, "dropping data byte without running status");
                return;
            };
            self.pending.push(status);
            self.expected_len = channel_data_length(status) + 1;
        }

        self.pending.push(byte);
        self.flush_if_complete(callback);
    }

    fn flush_if_complete<F>(&mut self, callback: &mut F)
    where
        F: FnMut(SysexExtractorCallbackKind, &[u8]),
    {
        if self.pending.len() == self.expected_len {
            callback(SysexExtractorCallbackKind::NotSysex, self.pending.as_slice());
            self.pending.clear();
        }
    }

    fn discard_pending(&mut self) {
        if !self.pending.is_empty() {
            trace!(bytes = ?self.pending.as_slice(), "discarding incomplete message");
            self.pending.clear();
        }
    }
}
