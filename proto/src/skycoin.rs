// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Skycoin address, message signing and transaction signing messages

use crate::WalletType;

/// Request `address_n` addresses starting at `start_index`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinAddress {
    #[prost(uint32, required, tag = "1")]
    pub address_n: u32,
    #[prost(uint32, optional, tag = "2")]
    pub start_index: Option<u32>,
    #[prost(bool, optional, tag = "3")]
    pub confirm_address: Option<bool>,
    #[prost(string, optional, tag = "4")]
    pub wallet_type: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResponseSkycoinAddress {
    #[prost(string, repeated, tag = "1")]
    pub addresses: Vec<String>,
}

/// Verify `signature` over `message` was produced by `address`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinCheckMessageSignature {
    #[prost(string, required, tag = "1")]
    pub address: String,
    #[prost(string, required, tag = "2")]
    pub message: String,
    #[prost(string, required, tag = "3")]
    pub signature: String,
}

/// Sign `message` with the key at `address_n`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SkycoinSignMessage {
    #[prost(uint32, required, tag = "1")]
    pub address_n: u32,
    #[prost(string, required, tag = "2")]
    pub message: String,
    #[prost(string, optional, tag = "3")]
    pub wallet_type: Option<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResponseSkycoinSignMessage {
    #[prost(string, required, tag = "1")]
    pub signed_message: String,
}

/// Transaction input, an unspent output hash and the index of its owning address
#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkycoinTransactionInput {
    #[prost(string, required, tag = "1")]
    pub hash_in: String,
    #[prost(uint32, optional, tag = "2")]
    pub index: Option<u32>,
}

/// Transaction output, `address_index` marks change returned to the wallet
#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkycoinTransactionOutput {
    #[prost(string, required, tag = "1")]
    pub address: String,
    #[prost(uint64, required, tag = "2")]
    pub coin: u64,
    #[prost(uint64, required, tag = "3")]
    pub hour: u64,
    #[prost(uint32, optional, tag = "4")]
    pub address_index: Option<u32>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TransactionSign {
    #[prost(uint32, required, tag = "1")]
    pub nb_in: u32,
    #[prost(message, repeated, tag = "2")]
    pub transaction_in: Vec<SkycoinTransactionInput>,
    #[prost(uint32, required, tag = "3")]
    pub nb_out: u32,
    #[prost(message, repeated, tag = "4")]
    pub transaction_out: Vec<SkycoinTransactionOutput>,
    #[prost(string, optional, tag = "5")]
    pub wallet_type: Option<String>,
}

impl TransactionSign {
    pub fn new(
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
        wallet_type: WalletType,
    ) -> Self {
        Self {
            nb_in: inputs.len() as u32,
            transaction_in: inputs,
            nb_out: outputs.len() as u32,
            transaction_out: outputs,
            wallet_type: Some(wallet_type.to_string()),
        }
    }
}

/// One signature per transaction input, in input order
#[derive(Clone, PartialEq, prost::Message)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResponseTransactionSign {
    #[prost(string, repeated, tag = "1")]
    pub signatures: Vec<String>,
    #[prost(bool, optional, tag = "2")]
    pub padding: Option<bool>,
}
