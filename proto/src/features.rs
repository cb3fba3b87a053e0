// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Device feature report

/// Device details, returned in response to `Initialize` / `GetFeatures`
#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Features {
    #[prost(string, optional, tag = "1")]
    pub vendor: Option<String>,
    #[prost(uint32, optional, tag = "2")]
    pub major_version: Option<u32>,
    #[prost(uint32, optional, tag = "3")]
    pub minor_version: Option<u32>,
    #[prost(uint32, optional, tag = "4")]
    pub patch_version: Option<u32>,
    #[prost(bool, optional, tag = "5")]
    pub bootloader_mode: Option<bool>,
    #[prost(string, optional, tag = "6")]
    pub device_id: Option<String>,
    #[prost(bool, optional, tag = "7")]
    pub pin_protection: Option<bool>,
    #[prost(bool, optional, tag = "8")]
    pub passphrase_protection: Option<bool>,
    #[prost(string, optional, tag = "9")]
    pub language: Option<String>,
    #[prost(string, optional, tag = "10")]
    pub label: Option<String>,
    #[prost(bool, optional, tag = "12")]
    pub initialized: Option<bool>,
    #[prost(bytes = "vec", optional, tag = "14")]
    pub bootloader_hash: Option<Vec<u8>>,
    #[prost(bool, optional, tag = "16")]
    pub pin_cached: Option<bool>,
    #[prost(bool, optional, tag = "17")]
    pub passphrase_cached: Option<bool>,
    #[prost(bool, optional, tag = "18")]
    pub firmware_present: Option<bool>,
    #[prost(bool, optional, tag = "19")]
    pub needs_backup: Option<bool>,
    #[prost(string, optional, tag = "21")]
    pub model: Option<String>,
    #[prost(uint32, optional, tag = "22")]
    pub fw_major: Option<u32>,
    #[prost(uint32, optional, tag = "23")]
    pub fw_minor: Option<u32>,
    #[prost(uint32, optional, tag = "24")]
    pub fw_patch: Option<u32>,
    #[prost(uint64, optional, tag = "27")]
    pub firmware_features: Option<u64>,
}

bitflags::bitflags! {
    /// Firmware capability flags, packed into [Features::firmware_features]
    pub struct FirmwareFeatures: u64 {
        /// Entropy requests must be confirmed on the device
        const REQUIRE_GET_ENTROPY_CONFIRM = 1 << 0;

        /// Firmware supports entropy request confirmation
        const IS_GET_ENTROPY_CONFIRM_AVAILABLE = 1 << 1;

        /// Firmware can render QR codes
        const IS_QR_CODE_GENERATION_AVAILABLE = 1 << 2;
    }
}

/// Bit offset of the two-bit flash read-protection level
const RDP_LEVEL_SHIFT: u64 = 3;
const RDP_LEVEL_MASK: u64 = 0b11 << RDP_LEVEL_SHIFT;

impl FirmwareFeatures {
    /// Flash read-out protection level (0-2)
    pub fn rdp_level(raw: u64) -> u8 {
        ((raw & RDP_LEVEL_MASK) >> RDP_LEVEL_SHIFT) as u8
    }
}

impl Features {
    /// Firmware capability flags, if reported
    pub fn capabilities(&self) -> Option<(FirmwareFeatures, u8)> {
        self.firmware_features.map(|raw| {
            (
                FirmwareFeatures::from_bits_truncate(raw),
                FirmwareFeatures::rdp_level(raw),
            )
        })
    }

    /// Firmware version as `major.minor.patch`
    pub fn firmware_version(&self) -> Option<String> {
        match (self.fw_major, self.fw_minor, self.fw_patch) {
            (Some(a), Some(b), Some(c)) => Some(format!("{a}.{b}.{c}")),
            _ => None,
        }
    }
}

impl std::fmt::Display for FirmwareFeatures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = [
            (Self::REQUIRE_GET_ENTROPY_CONFIRM, "RequireGetEntropyConfirm"),
            (
                Self::IS_GET_ENTROPY_CONFIRM_AVAILABLE,
                "IsGetEntropyConfirmAvailable",
            ),
            (
                Self::IS_QR_CODE_GENERATION_AVAILABLE,
                "IsQrCodeGenerationAvailable",
            ),
        ];

        for (flag, name) in flags {
            writeln!(f, "{}: {}", name, self.contains(flag))?;
        }

        Ok(())
    }
}
