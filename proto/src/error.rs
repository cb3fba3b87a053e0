// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Protocol encoding / decoding errors

use crate::MessageKind;

/// Skywallet protocol error type
#[derive(Debug, thiserror::Error)]
pub enum ProtoError {
    /// First report of a message is missing the `?##` magic
    #[error("invalid message header")]
    InvalidHeader,

    /// Continuation report is missing the `?` marker
    #[error("invalid continuation report")]
    InvalidContinuation,

    /// Declared payload length exceeds [MAX_PAYLOAD_LEN][crate::wire::MAX_PAYLOAD_LEN]
    #[error("payload length {0} exceeds maximum")]
    PayloadTooLong(usize),

    /// Message kind does not match the expected payload
    #[error("unexpected message kind (actual: {actual}, expected: {expected})")]
    UnexpectedKind { actual: u16, expected: MessageKind },

    /// Protobuf payload could not be decoded
    #[error("payload decode failed: {0}")]
    Decode(#[from] prost::DecodeError),

    /// Protobuf payload could not be encoded
    #[error("payload encode failed: {0}")]
    Encode(#[from] prost::EncodeError),
}
