// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Command line utility for interacting with Skywallet devices

use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use log::{debug, info, warn, LevelFilter};
use sha2::{Digest, Sha256};

use skywallet::{
    interaction::Prompt,
    proto::{messages::SimulateButtonType, WalletType},
    transport::EMULATOR_ADDR,
    DeviceType, GenericHandle, Sequencer,
};

mod helpers;
use helpers::*;

/// Skywallet command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Device type to send instructions to
    #[clap(long, value_enum, ignore_case = true, env = "DEVICE_TYPE", default_value = "usb")]
    device_type: DeviceType,

    /// Emulator UDP address
    #[clap(long, env = "EMULATOR_ADDR", default_value_t = EMULATOR_ADDR)]
    emulator_addr: SocketAddr,

    /// Press emulator buttons automatically following button requests
    #[clap(long, env = "AUTO_PRESS_BUTTONS", value_parser = clap::builder::BoolishValueParser::new())]
    auto_press_buttons: bool,

    /// Emulator button to press when auto-pressing
    #[clap(long, default_value = "right")]
    auto_press_button: SimulateButtonType,

    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Fetch device features
    Features,

    /// Generate addresses
    AddressGen {
        /// Number of addresses to generate
        #[clap(long, default_value = "1")]
        address_n: u32,

        /// Index key generation starts from
        #[clap(long, default_value = "0")]
        start_index: u32,

        /// Require on-device confirmation (single address only)
        #[clap(long)]
        confirm_address: bool,

        /// Wallet type (deterministic | bip44)
        #[clap(long)]
        wallet_type: WalletType,
    },

    /// Apply device settings
    ApplySettings {
        /// Enable or disable passphrase protection (true | false)
        #[clap(long)]
        use_passphrase: Option<bool>,

        /// Device label
        #[clap(long)]
        label: Option<String>,

        /// Device language
        #[clap(long)]
        language: Option<String>,
    },

    /// Back up the device seed
    Backup,

    /// Cancel the in-progress device operation
    Cancel,

    /// Check a message signature
    CheckMessageSignature {
        /// Address that issued the signature
        #[clap(long)]
        address: String,

        /// Message that was signed
        #[clap(long)]
        message: String,

        /// Signature to check
        #[clap(long)]
        signature: String,
    },

    /// Set or change the device PIN
    SetPin,

    /// Remove the device PIN
    RemovePin,

    /// Generate a new seed on the device
    GenerateMnemonic {
        /// Number of seed words (12 | 24)
        #[clap(long, default_value = "12")]
        word_count: u32,

        /// Enable passphrase protection
        #[clap(long)]
        use_passphrase: bool,
    },

    /// Recover a seed by entering words on request
    Recovery {
        /// Number of seed words (12 | 24)
        #[clap(long, default_value = "12")]
        word_count: u32,

        /// Enable or disable passphrase protection (true | false)
        #[clap(long)]
        use_passphrase: Option<bool>,

        /// Validate the seed without changing device state
        #[clap(long)]
        dry_run: bool,
    },

    /// Load a seed supplied on the command line
    SetMnemonic {
        #[clap(long)]
        mnemonic: String,
    },

    /// Sign a message with the key at the provided index
    SignMessage {
        /// Index of the signing address
        #[clap(long, default_value = "0")]
        address_index: u32,

        /// Message to sign
        #[clap(long)]
        message: String,

        /// Wallet type (deterministic | bip44)
        #[clap(long, default_value = "deterministic")]
        wallet_type: WalletType,
    },

    /// Sign a transaction loaded from a JSON file
    TransactionSign {
        /// Transaction file (`{ "inputs": [..], "outputs": [..] }`)
        #[clap(long)]
        input: String,

        /// Wallet type (deterministic | bip44)
        #[clap(long, default_value = "deterministic")]
        wallet_type: WalletType,
    },

    /// Wipe the device
    Wipe,

    /// Update device firmware (USB only)
    FirmwareUpdate {
        /// Firmware image file
        #[clap(long)]
        file: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let _ = simplelog::SimpleLogger::init(args.log_level, simplelog::Config::default());

    debug!("Using device type: {}", args.device_type);

    // Setup device handle, connected on first use
    let handle = GenericHandle::open(args.device_type, args.emulator_addr)?;
    let s = Sequencer::with_interaction(handle, Arc::new(Prompt));

    if args.auto_press_buttons {
        match args.device_type {
            DeviceType::Emulator => {
                s.set_auto_press_button(true, args.auto_press_button)
                    .await?
            }
            _ => warn!("Auto button press is only available for the emulator"),
        }
    }

    // Execute command
    let r = execute(&s, args.cmd).await;

    s.close().await;

    r
}

/// Execute a command with the provided sequencer
async fn execute(s: &Sequencer<GenericHandle>, cmd: Actions) -> anyhow::Result<()> {
    debug!("Executing command: {:?}", cmd);

    match cmd {
        Actions::Features => {
            let msg = s.get_features().await?;
            print_features(&msg)?;
        }
        Actions::AddressGen {
            address_n,
            start_index,
            confirm_address,
            wallet_type,
        } => {
            let msg = s
                .address_gen(address_n, start_index, confirm_address, wallet_type)
                .await?;
            print_addresses(&msg)?;
        }
        Actions::ApplySettings {
            use_passphrase,
            label,
            language,
        } => {
            let msg = s
                .apply_settings(use_passphrase, label.as_deref(), language.as_deref())
                .await?;
            print_status(&msg)?;
        }
        Actions::Backup => {
            let msg = s.backup().await?;
            print_status(&msg)?;
        }
        Actions::Cancel => {
            let msg = s.cancel().await?;
            print_status(&msg)?;
        }
        Actions::CheckMessageSignature {
            address,
            message,
            signature,
        } => {
            let msg = s
                .check_message_signature(&message, &signature, &address)
                .await?;
            print_status(&msg)?;
        }
        Actions::SetPin => {
            s.change_pin(None).await?;
            println!("PIN changed");
        }
        Actions::RemovePin => {
            s.change_pin(Some(true)).await?;
            println!("PIN removed");
        }
        Actions::GenerateMnemonic {
            word_count,
            use_passphrase,
        } => {
            let msg = s.generate_mnemonic(word_count, use_passphrase).await?;
            print_status(&msg)?;
        }
        Actions::Recovery {
            word_count,
            use_passphrase,
            dry_run,
        } => {
            let msg = s.recovery(word_count, use_passphrase, dry_run).await?;
            print_status(&msg)?;
        }
        Actions::SetMnemonic { mnemonic } => {
            let msg = s.set_mnemonic(&mnemonic).await?;
            print_status(&msg)?;
        }
        Actions::SignMessage {
            address_index,
            message,
            wallet_type,
        } => {
            let msg = s.sign_message(address_index, &message, wallet_type).await?;
            print_signed_message(&msg)?;
        }
        Actions::TransactionSign { input, wallet_type } => {
            let tx: TransactionFile = read_input(&input).await?;

            info!(
                "Signing transaction with {} inputs and {} outputs",
                tx.inputs.len(),
                tx.outputs.len()
            );

            let msg = s
                .transaction_sign(tx.inputs, tx.outputs, wallet_type)
                .await?;
            print_signatures(&msg)?;
        }
        Actions::Wipe => {
            let msg = s.wipe().await?;
            print_status(&msg)?;
        }
        Actions::FirmwareUpdate { file } => {
            debug!("Loading firmware from '{}'", file);
            let payload = tokio::fs::read(&file).await?;

            let hash: [u8; 32] = Sha256::digest(&payload).into();
            info!("Firmware hash: {}", hex::encode(hash));

            s.firmware_upload(&payload, hash).await?;
            println!("Firmware upload complete");
        }
    }

    Ok(())
}
