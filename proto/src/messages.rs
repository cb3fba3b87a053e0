// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Device management and user interaction messages

use strum::{Display, EnumString, EnumVariantNames};

/// Reset device to default state and ask for device details
#[derive(Clone, PartialEq, prost::Message)]
pub struct Initialize {}

/// Ask for device details (without resetting session state)
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetFeatures {}

/// Abort the in-progress operation
#[derive(Clone, PartialEq, prost::Message)]
pub struct Cancel {}

/// Reason the device is waiting for a button press
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ButtonRequestType {
    Other = 1,
    FeeOverThreshold = 2,
    ConfirmOutput = 3,
    ResetDevice = 4,
    ConfirmWord = 5,
    WipeDevice = 6,
    ProtectCall = 7,
    SignTx = 8,
    FirmwareCheck = 9,
    Address = 10,
    PublicKey = 11,
}

/// Device is waiting for user confirmation on the device
#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonRequest {
    #[prost(enumeration = "ButtonRequestType", optional, tag = "1")]
    pub code: Option<i32>,
    #[prost(string, optional, tag = "2")]
    pub data: Option<String>,
}

/// Host acknowledges it is waiting on the user
#[derive(Clone, PartialEq, prost::Message)]
pub struct ButtonAck {}

/// Which PIN the device is asking for
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Display,
)]
#[repr(i32)]
pub enum PinMatrixRequestType {
    Current = 1,
    NewFirst = 2,
    NewSecond = 3,
}

/// Device asks for the PIN, entered via the scrambled matrix on its screen
#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixRequest {
    #[prost(enumeration = "PinMatrixRequestType", optional, tag = "1")]
    pub pin_type: Option<i32>,
}

/// Matrix-position encoded PIN
#[derive(Clone, PartialEq, prost::Message)]
pub struct PinMatrixAck {
    #[prost(string, required, tag = "1")]
    pub pin: String,
}

/// Device asks for the wallet passphrase
#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct PassphraseAck {
    #[prost(string, required, tag = "1")]
    pub passphrase: String,
}

/// Device asks for the next recovery word
#[derive(Clone, PartialEq, prost::Message)]
pub struct WordRequest {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct WordAck {
    #[prost(string, required, tag = "1")]
    pub word: String,
}

/// Change device language, label or passphrase protection
#[derive(Clone, PartialEq, prost::Message)]
pub struct ApplySettings {
    #[prost(string, optional, tag = "1")]
    pub language: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "3")]
    pub use_passphrase: Option<bool>,
}

/// Set, change or remove the device PIN
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChangePin {
    #[prost(bool, optional, tag = "1")]
    pub remove: Option<bool>,
}

/// Erase all device configuration
#[derive(Clone, PartialEq, prost::Message)]
pub struct WipeDevice {}

/// Display the seed for backup
#[derive(Clone, PartialEq, prost::Message)]
pub struct BackupDevice {}

/// Generate a new mnemonic on the device
#[derive(Clone, PartialEq, prost::Message)]
pub struct GenerateMnemonic {
    #[prost(uint32, optional, tag = "1")]
    pub word_count: Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub use_passphrase: Option<bool>,
}

/// Start seed recovery, the device follows up with word requests
#[derive(Clone, PartialEq, prost::Message)]
pub struct RecoveryDevice {
    #[prost(uint32, optional, tag = "1")]
    pub word_count: Option<u32>,
    #[prost(bool, optional, tag = "2")]
    pub passphrase_protection: Option<bool>,
    #[prost(bool, optional, tag = "3")]
    pub dry_run: Option<bool>,
}

/// Load a mnemonic supplied by the host
#[derive(Clone, PartialEq, prost::Message)]
pub struct SetMnemonic {
    #[prost(string, required, tag = "1")]
    pub mnemonic: String,
}

/// Erase firmware in preparation for an upload
#[derive(Clone, PartialEq, prost::Message)]
pub struct FirmwareErase {
    #[prost(uint32, optional, tag = "1")]
    pub length: Option<u32>,
}

/// Firmware image and its SHA-256 digest
#[derive(Clone, PartialEq, prost::Message)]
pub struct FirmwareUpload {
    #[prost(bytes = "vec", required, tag = "1")]
    pub payload: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub hash: Option<Vec<u8>>,
}

/// Emulated device button
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    prost::Enumeration,
    Display,
    EnumString,
    EnumVariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[repr(i32)]
pub enum SimulateButtonType {
    Left = 0,
    Right = 1,
    Both = 2,
}

/// Press a button on the emulator (ignored by physical devices)
#[derive(Clone, PartialEq, prost::Message)]
pub struct SimulateButton {
    #[prost(enumeration = "SimulateButtonType", required, tag = "1")]
    pub button: i32,
}
