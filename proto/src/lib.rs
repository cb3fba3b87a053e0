// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Protocol / wire message definitions for Skywallet communication
//!
//! Every exchange with the device is a [WireMessage]: a numeric [MessageKind]
//! plus a protobuf-encoded payload, split into fixed 64-byte reports for
//! transport (see [wire]).
//!
//! Payload structures are declared by hand with `prost` derives rather than
//! generated from `.proto` files, the driver only needs a small subset of the
//! firmware message set and this keeps the crate free of build-time tooling.
//!

use strum::{Display, EnumIter, EnumString, EnumVariantNames};

pub mod error;
pub use error::ProtoError;

pub mod features;
pub mod messages;
pub mod skycoin;
pub mod status;
pub mod wallet;
pub mod wire;

pub use status::{decode_failure, decode_success, Failure, FailureType};
pub use wallet::WalletType;
pub use wire::{encode_frames, FrameDecoder, WireMessage, REPORT_LEN};

/// Skywallet message kinds
///
/// Discriminants match the firmware message type enumeration and are sent
/// big-endian in the first report header of each message.
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Debug,
    Display,
    EnumString,
    EnumVariantNames,
    EnumIter,
    num_enum::TryFromPrimitive,
)]
#[repr(u16)]
pub enum MessageKind {
    Initialize = 0,
    Ping = 1,
    Success = 2,
    Failure = 3,
    ChangePin = 4,
    WipeDevice = 5,
    FirmwareErase = 6,
    FirmwareUpload = 7,
    FirmwareRequest = 8,
    GetEntropy = 9,
    Entropy = 10,
    LoadDevice = 13,
    ResetDevice = 14,
    Features = 17,
    PinMatrixRequest = 18,
    PinMatrixAck = 19,
    Cancel = 20,
    ApplySettings = 25,
    ButtonRequest = 26,
    ButtonAck = 27,
    BackupDevice = 34,
    EntropyRequest = 35,
    EntropyAck = 36,
    PassphraseRequest = 41,
    PassphraseAck = 42,
    RecoveryDevice = 45,
    WordRequest = 46,
    WordAck = 47,
    GetFeatures = 55,

    /// Emulator-only debug message, presses a button on the emulated device
    SimulateButton = 69,

    // Skycoin specific messages
    SetMnemonic = 113,
    SkycoinAddress = 114,
    ResponseSkycoinAddress = 115,
    SkycoinCheckMessageSignature = 116,
    SkycoinSignMessage = 117,
    ResponseSkycoinSignMessage = 118,
    GenerateMnemonic = 119,
    TransactionSign = 120,
    ResponseTransactionSign = 121,
}

impl MessageKind {
    /// Messages the device sends when it needs the host to acknowledge
    /// or supply user input before it will continue
    pub const fn is_interaction(&self) -> bool {
        matches!(
            self,
            MessageKind::ButtonRequest
                | MessageKind::PinMatrixRequest
                | MessageKind::PassphraseRequest
                | MessageKind::WordRequest
        )
    }

    /// Universal status messages, valid as a response to any request
    pub const fn is_status(&self) -> bool {
        matches!(self, MessageKind::Success | MessageKind::Failure)
    }
}

impl From<MessageKind> for u16 {
    fn from(k: MessageKind) -> u16 {
        k as u16
    }
}

impl PartialEq<MessageKind> for u16 {
    fn eq(&self, other: &MessageKind) -> bool {
        *self == *other as u16
    }
}
