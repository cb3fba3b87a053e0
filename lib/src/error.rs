// Copyright (c) 2022-2023 The FiberCrypto Developers

use skywallet_proto::{Failure, MessageKind, ProtoError, WireMessage};

use crate::DeviceType;

/// Skywallet API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Underlying send / receive failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Device response did not follow the protocol
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Device reported `Failure`, the round-trip succeeded but the
    /// device declined the operation
    #[error("Device failure: {0}")]
    DeviceFailure(Failure),

    /// Operation unavailable for the connected device type
    #[error("Operation not supported by {0} devices")]
    WrongDeviceType(DeviceType),

    /// Firmware image does not fit in a single upload message
    #[error("Firmware image too large: {0} bytes")]
    FirmwareTooLarge(usize),

    /// No matching device could be found
    #[error("No device found")]
    NoDevice,

    /// Reading PIN / passphrase / word input failed
    #[error("Interaction input failed: {0}")]
    Interaction(#[source] std::io::Error),
}

/// Protocol level errors, fatal to the command in progress
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Message kind not valid at this point of the command
    #[error("Unexpected response from device: {}", kind_name(.kind))]
    UnexpectedMessage { kind: u16 },

    /// Status or terminal payload could not be decoded
    #[error("Malformed payload: {0}")]
    Decode(#[from] ProtoError),
}

/// Transport errors, never retried
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "transport_hid")]
    #[error("HID error: {0}")]
    Hid(#[from] hidapi::HidError),

    /// Received reports could not be reassembled
    #[error("Framing error: {0}")]
    Codec(#[source] ProtoError),

    /// Device sent fewer bytes than a full report
    #[error("Short report ({0} bytes)")]
    ShortReport(usize),
}

impl Error {
    /// Build an [ProtocolError::UnexpectedMessage] for the provided message
    pub fn unexpected(msg: &WireMessage) -> Self {
        Error::Protocol(ProtocolError::UnexpectedMessage { kind: msg.kind })
    }

    /// Check whether this error was reported by the device itself
    pub fn is_device_failure(&self) -> bool {
        matches!(self, Error::DeviceFailure(_))
    }
}

impl From<ProtoError> for Error {
    fn from(e: ProtoError) -> Self {
        Error::Protocol(ProtocolError::Decode(e))
    }
}

fn kind_name(kind: &u16) -> String {
    match MessageKind::try_from(*kind) {
        Ok(k) => k.to_string(),
        Err(_) => format!("Unknown({kind})"),
    }
}
