// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Wallet derivation schemes

use strum::{Display, EnumString, EnumVariantNames};

/// Key derivation scheme used by address and signing requests
#[derive(
    Copy, Clone, PartialEq, Eq, Debug, Default, Display, EnumString, EnumVariantNames,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum WalletType {
    /// Legacy Skycoin deterministic wallet
    #[default]
    Deterministic,
    /// BIP-0044 hierarchical wallet
    Bip44,
}
