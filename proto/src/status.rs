// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Universal status messages and their decoders

use crate::{MessageKind, ProtoError, WireMessage};

/// Operation completed, with an optional human readable message
#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Success {
    #[prost(string, optional, tag = "1")]
    pub message: Option<String>,
}

/// Failure reason reported by the device
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum FailureType {
    UnexpectedMessage = 1,
    ButtonExpected = 2,
    DataError = 3,
    ActionCancelled = 4,
    PinExpected = 5,
    PinCancelled = 6,
    PinInvalid = 7,
    InvalidSignature = 8,
    ProcessError = 9,
    NotEnoughFunds = 10,
    NotInitialized = 11,
    PinMismatch = 12,
    AddressGeneration = 13,
    FirmwareError = 99,
}

/// Device declined or failed an operation
#[derive(Clone, PartialEq, Eq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Failure {
    #[prost(enumeration = "FailureType", optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub message: Option<String>,
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code.and_then(FailureType::from_i32) {
            Some(c) => write!(f, "{} ({:?})", self.message(), c),
            None => write!(f, "{}", self.message()),
        }
    }
}

/// Decode the text of a [MessageKind::Success] message
///
/// A Success without a message decodes to an empty string.
pub fn decode_success(msg: &WireMessage) -> Result<String, ProtoError> {
    let s: Success = msg.decode(MessageKind::Success)?;
    Ok(s.message.unwrap_or_default())
}

/// Decode a [MessageKind::Failure] message
pub fn decode_failure(msg: &WireMessage) -> Result<Failure, ProtoError> {
    msg.decode(MessageKind::Failure)
}

/// Decode either status message into display text, as used by commands
/// whose response is just a status (eg. `Cancel`)
pub fn decode_status(msg: &WireMessage) -> Result<String, ProtoError> {
    match msg.kind() {
        Some(MessageKind::Failure) => decode_failure(msg).map(|f| f.to_string()),
        _ => decode_success(msg),
    }
}
