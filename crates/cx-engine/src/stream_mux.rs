// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream Multiplexer (SPEC_FULL.md §4.E): turns demuxed `OutputFrame`s from
//! the container runtime adapter into `ExecutionEvent::Output` events,
//! preserving frame boundaries and never splitting a UTF-8 code point across
//! events when avoidable. Both `execute` and `execute_stream` drive the same
//! demux (SPEC_FULL.md §4.E, resolving the "simplified" partition ambiguity
//! in §9).

use cx_adapters::OutputFrame;
use cx_core::{Encoding, OutputChannel};
use std::collections::HashMap;

/// One decoded chunk ready to become an `ExecutionEvent::Output`.
pub struct DecodedChunk {
    pub channel: OutputChannel,
    pub text: String,
    pub encoding: Option<Encoding>,
}

/// Per-channel UTF-8 boundary tracker. A chunk that ends mid-codepoint holds
/// its trailing bytes until the next frame on the same channel completes the
/// sequence, so well-formed text is never torn across two events.
#[derive(Default)]
pub struct Demuxer {
    carry: HashMap<OutputChannel, Vec<u8>>,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame, producing zero or one decoded chunk (zero only when
    /// the whole frame is a carried-over partial codepoint with nothing new
    /// to flush, which cannot happen for a non-empty frame but is handled for
    /// completeness).
    pub fn push(&mut self, frame: OutputFrame) -> Option<DecodedChunk> {
        if frame.bytes.is_empty() {
            return None;
        }
        let mut buf = self.carry.remove(&frame.channel).unwrap_or_default();
        buf.extend_from_slice(&frame.bytes);

        match std::str::from_utf8(&buf) {
            Ok(text) => Some(DecodedChunk {
                channel: frame.channel,
                text: text.to_string(),
                encoding: None,
            }),
            Err(e) => {
                let valid_up_to = e.valid_up_to();
                if e.error_len().is_some() {
                    // Genuinely invalid bytes, not just a truncated tail: emit
                    // the whole frame as hex rather than silently dropping it.
                    Some(DecodedChunk {
                        channel: frame.channel,
                        text: hex_encode(&buf),
                        encoding: Some(Encoding::Hex),
                    })
                } else {
                    // Truncated multi-byte sequence at the end: flush what's
                    // valid, carry the remainder for the next frame.
                    let (valid, rest) = buf.split_at(valid_up_to);
                    self.carry.insert(frame.channel, rest.to_vec());
                    if valid.is_empty() {
                        None
                    } else {
                        Some(DecodedChunk {
                            channel: frame.channel,
                            // Safe: `valid` is exactly the bytes validated above.
                            text: String::from_utf8_lossy(valid).into_owned(),
                            encoding: None,
                        })
                    }
                }
            }
        }
    }

    /// Flush any carried partial bytes at stream end, tagged hex since they
    /// never completed a valid codepoint.
    pub fn flush(&mut self) -> Vec<DecodedChunk> {
        self.carry
            .drain()
            .filter(|(_, bytes)| !bytes.is_empty())
            .map(|(channel, bytes)| DecodedChunk {
                channel,
                text: hex_encode(&bytes),
                encoding: Some(Encoding::Hex),
            })
            .collect()
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
