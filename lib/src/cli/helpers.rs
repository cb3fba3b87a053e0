// Copyright (c) 2022-2023 The FiberCrypto Developers

use std::path::Path;

use log::debug;
use serde::de::DeserializeOwned;

use skywallet::proto::{
    features::Features,
    skycoin::{
        ResponseSkycoinAddress, ResponseSkycoinSignMessage, ResponseTransactionSign,
        SkycoinTransactionInput, SkycoinTransactionOutput,
    },
    status::decode_status,
    MessageKind, WireMessage,
};

/// Transaction file contents for `transaction-sign`
#[derive(Clone, PartialEq, Debug, serde::Deserialize)]
pub struct TransactionFile {
    pub inputs: Vec<SkycoinTransactionInput>,
    pub outputs: Vec<SkycoinTransactionOutput>,
}

/// Helper to read input files where required
pub async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Print status text (Success or Failure)
pub fn print_status(msg: &WireMessage) -> anyhow::Result<()> {
    println!("{}", decode_status(msg)?);
    Ok(())
}

/// Print features as JSON, followed by firmware capabilities
pub fn print_features(msg: &WireMessage) -> anyhow::Result<()> {
    let f: Features = msg.decode(MessageKind::Features)?;

    println!("{}", serde_json::to_string_pretty(&f)?);

    if let Some((flags, rdp_level)) = f.capabilities() {
        print!("{flags}");
        println!("RdpLevel: {rdp_level}");
    }

    Ok(())
}

pub fn print_addresses(msg: &WireMessage) -> anyhow::Result<()> {
    let r: ResponseSkycoinAddress = msg.decode(MessageKind::ResponseSkycoinAddress)?;
    println!("{}", serde_json::to_string(&r.addresses)?);
    Ok(())
}

pub fn print_signed_message(msg: &WireMessage) -> anyhow::Result<()> {
    let r: ResponseSkycoinSignMessage = msg.decode(MessageKind::ResponseSkycoinSignMessage)?;
    println!("{}", r.signed_message);
    Ok(())
}

pub fn print_signatures(msg: &WireMessage) -> anyhow::Result<()> {
    let r: ResponseTransactionSign = msg.decode(MessageKind::ResponseTransactionSign)?;
    println!("{}", serde_json::to_string(&r.signatures)?);
    Ok(())
}
