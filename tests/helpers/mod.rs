//! Test helpers and fixtures for midici integration tests.
//!
//! [`LoopbackDevice`] is a transport that frames every subscription request as
//! a sysex message (`F0`, destination MUID, JSON header, `F7`) on a simulated
//! MIDI 1.0 wire, so tests can run the bytes back through a
//! [`BytestreamSysexExtractor`] and answer them like a responder would.

#![allow(dead_code)]

use std::collections::BTreeMap;

use midici::prelude::*;

/// Manufacturer-free framing used on the simulated wire.
pub fn frame_request(muid: Muid, header: &PropertySubscriptionHeader) -> Result<Vec<u8>> {
    let mut frame = vec![0xF0];
    frame.extend_from_slice(&muid.to_bytes());
    frame.extend_from_slice(header.to_json()?.as_bytes());
    frame.push(0xF7);
    Ok(frame)
}

/// Inverse of [`frame_request`] for a complete sysex message.
pub fn parse_request(sysex: &[u8]) -> Result<(Muid, PropertySubscriptionHeader)> {
    assert!(sysex.len() >= 6, "frame too short: {sysex:02X?}");
    assert_eq!(sysex[0], 0xF0);
    assert_eq!(sysex[sysex.len() - 1], 0xF7);

    let muid = Muid::from_bytes([sysex[1], sysex[2], sysex[3], sysex[4]])?;
    let json = std::str::from_utf8(&sysex[5..sysex.len() - 1]).expect("header is ASCII JSON");
    Ok((muid, PropertySubscriptionHeader::from_json(json)?))
}

#[derive(Debug, Default)]
pub struct LoopbackDevice {
    /// Bytes written to the simulated wire, in send order.
    pub wire: Vec<u8>,
    pending: BTreeMap<RequestKey, ReplyHandle>,
    pub changed: Vec<(SubscriptionKey, Option<String>)>,
    pub busy: bool,
    last_request: u64,
}

impl LoopbackDevice {
    /// A device that refuses every send until `busy` is cleared.
    pub fn busy() -> Self {
        Self {
            busy: true,
            ..Self::default()
        }
    }

    pub fn take_wire(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.wire)
    }

    pub fn pending_requests(&self) -> Vec<RequestKey> {
        self.pending.keys().copied().collect()
    }

    /// Complete every outstanding request with the result `respond` picks for it.
    pub fn respond_all<F>(&mut self, mut respond: F)
    where
        F: FnMut(&ReplyHandle) -> PropertyExchangeResult,
    {
        for (_, handle) in std::mem::take(&mut self.pending) {
            let result = respond(&handle);
            handle.resolve(result);
        }
    }
}

impl SubscriptionManagerDelegate for LoopbackDevice {
    fn send_property_subscribe(
        &mut self,
        muid: Muid,
        header: &PropertySubscriptionHeader,
        on_result: ReplyHandle,
    ) -> Option<RequestKey> {
        if self.busy {
            return None;
        }
        let frame = frame_request(muid, header).ok()?;
        self.wire.extend_from_slice(&frame);

        self.last_request += 1;
        let request = RequestKey::new(muid, Token64::new(self.last_request));
        self.pending.insert(request, on_result);
        Some(request)
    }

    fn abort_property_request(&mut self, request: RequestKey) {
        self.pending.remove(&request);
    }

    fn property_subscription_changed(&mut self, key: SubscriptionKey, subscribe_id: Option<&str>) {
        self.changed.push((key, subscribe_id.map(str::to_string)));
    }
}

/// Reassemble complete sysex messages from `wire`, fed in chunks of `chunk_len`.
pub fn extract_sysex(wire: &[u8], chunk_len: usize) -> Vec<Vec<u8>> {
    let mut extractor = BytestreamSysexExtractor::new();
    let mut messages = Vec::new();
    let mut current = Vec::new();

    for chunk in wire.chunks(chunk_len.max(1)) {
        extractor.push(chunk, |kind, bytes| match kind {
            SysexExtractorCallbackKind::OngoingSysex => current.extend_from_slice(bytes),
            SysexExtractorCallbackKind::LastSysex => {
                current.extend_from_slice(bytes);
                messages.push(std::mem::take(&mut current));
            }
            SysexExtractorCallbackKind::NotSysex => {}
        });
    }
    messages
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
