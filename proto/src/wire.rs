// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Wire messages and 64-byte report framing
//!
//! ## Encoding
//!
//! The first report of each message carries the header, followed by as much
//! of the payload as fits:
//!
//! ```text
//!  0       1       2       3       4       5       6       7       8       9
//! +-------+-------+-------+-------+-------+-------+-------+-------+-------+----------
//! |  '?'  |  '#'  |  '#'  |  KIND (u16 BE) |       PAYLOAD_LEN (u32 BE)    | PAYLOAD...
//! +-------+-------+-------+-------+-------+-------+-------+-------+-------+----------
//! ```
//!
//! Remaining payload is carried in continuation reports of a single `'?'`
//! followed by up to 63 payload bytes. Unused report bytes are zero.

use byteorder::{BigEndian, ByteOrder};

use crate::{MessageKind, ProtoError};

/// Transport report length
pub const REPORT_LEN: usize = 64;

/// Maximum accepted payload length (firmware images are the largest messages)
pub const MAX_PAYLOAD_LEN: usize = 2 * 1024 * 1024;

const HEADER_MAGIC: &[u8; 3] = b"?##";
const HEADER_LEN: usize = 9;
const CONTINUATION_MARKER: u8 = b'?';

/// A single protocol message, a numeric kind and an opaque payload
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct WireMessage {
    /// Raw message kind, see [MessageKind]
    pub kind: u16,
    /// Protobuf encoded payload
    pub payload: Vec<u8>,
}

impl WireMessage {
    /// Create a message from a kind and a pre-encoded payload
    pub fn new(kind: MessageKind, payload: Vec<u8>) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// Create a message with an empty payload
    pub fn empty(kind: MessageKind) -> Self {
        Self::new(kind, vec![])
    }

    /// Encode a protobuf payload structure into a message of the provided kind
    pub fn encode<M: prost::Message>(kind: MessageKind, m: &M) -> Self {
        Self::new(kind, m.encode_to_vec())
    }

    /// Resolve the message kind, `None` for kinds outside [MessageKind]
    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::try_from(self.kind).ok()
    }

    /// Check whether this message is of the provided kind
    pub fn is(&self, kind: MessageKind) -> bool {
        self.kind == kind
    }

    /// Decode the payload as `M`, checking the message kind first
    pub fn decode<M: prost::Message + Default>(
        &self,
        expected: MessageKind,
    ) -> Result<M, ProtoError> {
        if !self.is(expected) {
            return Err(ProtoError::UnexpectedKind {
                actual: self.kind,
                expected,
            });
        }

        M::decode(self.payload.as_slice()).map_err(ProtoError::from)
    }
}

impl std::fmt::Display for WireMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Some(k) => write!(f, "{} ({} bytes)", k, self.payload.len()),
            None => write!(f, "Unknown({}) ({} bytes)", self.kind, self.payload.len()),
        }
    }
}

/// Split a message into transport reports
///
/// An empty payload still produces a single (header only) report.
pub fn encode_frames(msg: &WireMessage) -> Vec<[u8; REPORT_LEN]> {
    let mut reports = Vec::with_capacity(1 + msg.payload.len() / (REPORT_LEN - 1));

    let mut first = [0u8; REPORT_LEN];
    first[..3].copy_from_slice(HEADER_MAGIC);
    BigEndian::write_u16(&mut first[3..5], msg.kind);
    BigEndian::write_u32(&mut first[5..HEADER_LEN], msg.payload.len() as u32);

    let n = msg.payload.len().min(REPORT_LEN - HEADER_LEN);
    first[HEADER_LEN..][..n].copy_from_slice(&msg.payload[..n]);
    reports.push(first);

    for chunk in msg.payload[n..].chunks(REPORT_LEN - 1) {
        let mut r = [0u8; REPORT_LEN];
        r[0] = CONTINUATION_MARKER;
        r[1..][..chunk.len()].copy_from_slice(chunk);
        reports.push(r);
    }

    reports
}

/// Incremental report decoder, reassembles messages from transport reports
#[derive(Clone, Debug, Default)]
pub struct FrameDecoder {
    header: Option<(u16, usize)>,
    payload: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a received report, returning the message once complete
    ///
    /// On error the decoder is reset and expects a new header report.
    pub fn push(&mut self, report: &[u8; REPORT_LEN]) -> Result<Option<WireMessage>, ProtoError> {
        let r = self.push_inner(report);
        if r.is_err() {
            self.reset();
        }
        r
    }

    /// Discard any partially received message
    pub fn reset(&mut self) {
        self.header = None;
        self.payload.clear();
    }

    fn push_inner(&mut self, report: &[u8; REPORT_LEN]) -> Result<Option<WireMessage>, ProtoError> {
        let (kind, len, data) = match self.header {
            None => {
                if &report[..3] != HEADER_MAGIC {
                    return Err(ProtoError::InvalidHeader);
                }

                let kind = BigEndian::read_u16(&report[3..5]);
                let len = BigEndian::read_u32(&report[5..HEADER_LEN]) as usize;
                if len > MAX_PAYLOAD_LEN {
                    return Err(ProtoError::PayloadTooLong(len));
                }

                self.header = Some((kind, len));
                self.payload.reserve(len);

                (kind, len, &report[HEADER_LEN..])
            }
            Some((kind, len)) => {
                if report[0] != CONTINUATION_MARKER {
                    return Err(ProtoError::InvalidContinuation);
                }
                (kind, len, &report[1..])
            }
        };

        let missing = len - self.payload.len();
        self.payload.extend_from_slice(&data[..missing.min(data.len())]);

        if self.payload.len() < len {
            return Ok(None);
        }

        self.header = None;
        Ok(Some(WireMessage {
            kind,
            payload: std::mem::take(&mut self.payload),
        }))
    }
}
