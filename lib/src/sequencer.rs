// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Command sequencer
//!
//! Drives each high-level command to completion over a [Device], answering
//! the interaction requests (button, PIN, passphrase, recovery word) the
//! device issues mid-command until a terminal response is received.
//!
//! Commands are serialised: the device is held for the whole of a command
//! including every interaction round-trip, so concurrent callers never
//! interleave messages on the wire.
//!
//! ```text
//!  host                                  device
//!   | --- request (eg. TransactionSign) --> |
//!   | <-- PinMatrixRequest ---------------- |
//!   | --- PinMatrixAck -------------------> |
//!   | <-- ButtonRequest ------------------- |
//!   | --- ButtonAck ----------------------> |
//!   | <-- ResponseTransactionSign --------- |
//! ```
//!
//! A `Failure` at any point ends the command with [Error::DeviceFailure],
//! any other message not valid for the command ends it with
//! [ProtocolError::UnexpectedMessage](crate::error::ProtocolError).

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use skywallet_proto::{
    decode_failure, decode_success,
    features::Features,
    messages::{PinMatrixRequest, PinMatrixRequestType, SimulateButtonType},
    skycoin::{
        ResponseSkycoinAddress, ResponseSkycoinSignMessage, ResponseTransactionSign,
        SkycoinTransactionInput, SkycoinTransactionOutput,
    },
    MessageKind::{self, ButtonRequest, PassphraseRequest, PinMatrixRequest as PinRequest},
    ProtoError, WalletType, WireMessage,
};

use crate::{
    device::Device,
    interaction::{Interaction, Unattended},
    Error,
};

/// Sequencer, serialises and completes commands over a [Device]
pub struct Sequencer<D: Device> {
    device: Mutex<D>,
    interaction: Arc<dyn Interaction>,
}

/// Result of answering a single interaction request
enum Outcome {
    /// Device responded with a further message
    Continue(WireMessage),
    /// Device responded with `Success`, accepted only where the command
    /// terminates with `Success`
    Success(WireMessage),
}

/// Accepted interactions and terminal response for a command
struct Flow {
    name: &'static str,
    interactions: &'static [MessageKind],
    terminal: MessageKind,
    /// Decode the terminal payload, returning any status text
    validate: fn(&WireMessage) -> Result<Option<String>, ProtoError>,
}

const ADDRESS_GEN: Flow = Flow {
    name: "address_gen",
    interactions: &[ButtonRequest, PinRequest, PassphraseRequest],
    terminal: MessageKind::ResponseSkycoinAddress,
    validate: decodes::<ResponseSkycoinAddress>,
};

const APPLY_SETTINGS: Flow = Flow {
    name: "apply_settings",
    interactions: &[ButtonRequest, PinRequest],
    terminal: MessageKind::Success,
    validate: success,
};

// PIN is handled once before the loop
const BACKUP: Flow = Flow {
    name: "backup",
    interactions: &[ButtonRequest, PassphraseRequest],
    terminal: MessageKind::Success,
    validate: success,
};

const CHANGE_PIN: Flow = Flow {
    name: "change_pin",
    interactions: &[ButtonRequest, PinRequest, PassphraseRequest],
    terminal: MessageKind::Success,
    validate: success,
};

const GET_FEATURES: Flow = Flow {
    name: "get_features",
    interactions: &[ButtonRequest, PinRequest, PassphraseRequest],
    terminal: MessageKind::Features,
    validate: decodes::<Features>,
};

// Single-shot confirmations handled before the terminal check
const GENERATE_MNEMONIC: Flow = Flow {
    name: "generate_mnemonic",
    interactions: &[],
    terminal: MessageKind::Success,
    validate: success,
};

const SET_MNEMONIC: Flow = Flow {
    name: "set_mnemonic",
    interactions: &[],
    terminal: MessageKind::Success,
    validate: success,
};

const RECOVERY: Flow = Flow {
    name: "recovery",
    interactions: &[],
    terminal: MessageKind::Success,
    validate: success,
};

const SIGN_MESSAGE: Flow = Flow {
    name: "sign_message",
    interactions: &[ButtonRequest, PinRequest, PassphraseRequest],
    terminal: MessageKind::ResponseSkycoinSignMessage,
    validate: decodes::<ResponseSkycoinSignMessage>,
};

const TRANSACTION_SIGN: Flow = Flow {
    name: "transaction_sign",
    interactions: &[ButtonRequest, PinRequest, PassphraseRequest],
    terminal: MessageKind::ResponseTransactionSign,
    validate: decodes::<ResponseTransactionSign>,
};

const WIPE: Flow = Flow {
    name: "wipe",
    interactions: &[],
    terminal: MessageKind::Success,
    validate: success,
};

/// Check a terminal payload decodes as `M`
fn decodes<M: prost::Message + Default>(msg: &WireMessage) -> Result<Option<String>, ProtoError> {
    M::decode(msg.payload.as_slice())?;
    Ok(None)
}

fn success(msg: &WireMessage) -> Result<Option<String>, ProtoError> {
    decode_success(msg).map(Some)
}

/// Complete a command on a `Success` returned by an interaction
fn settle(flow: &Flow, msg: WireMessage) -> Result<WireMessage, Error> {
    if flow.terminal != MessageKind::Success {
        return Err(unexpected(flow.name, &msg));
    }

    let text = decode_success(&msg)?;
    info!("{}: {}", flow.name, text);
    Ok(msg)
}

/// Convert a `Failure` message to an error
fn failure(name: &str, msg: &WireMessage) -> Error {
    match decode_failure(msg) {
        Ok(f) => {
            error!("{}: device failure: {}", name, f);
            Error::DeviceFailure(f)
        }
        Err(e) => e.into(),
    }
}

fn unexpected(name: &str, msg: &WireMessage) -> Error {
    error!("{}: unexpected response from device: {}", name, msg);
    Error::unexpected(msg)
}

impl<D: Device> Sequencer<D> {
    /// Create a sequencer answering interaction requests with empty input
    pub fn new(device: D) -> Self {
        Self::with_interaction(device, Arc::new(Unattended))
    }

    /// Create a sequencer with the provided [Interaction] handler
    pub fn with_interaction(device: D, interaction: Arc<dyn Interaction>) -> Self {
        Self {
            device: Mutex::new(device),
            interaction,
        }
    }

    /// Consume the sequencer, returning the device
    pub fn into_inner(self) -> D {
        self.device.into_inner()
    }

    /// Answer a single interaction request
    async fn interact(&self, dev: &mut D, msg: &WireMessage) -> Result<Outcome, Error> {
        let resp = match msg.kind() {
            Some(MessageKind::ButtonRequest) => {
                debug!("Button request, waiting on user confirmation");
                dev.button_ack().await?
            }
            Some(MessageKind::PinMatrixRequest) => {
                // A missing or malformed type is treated as a request for the current PIN
                let request = msg
                    .decode::<PinMatrixRequest>(MessageKind::PinMatrixRequest)
                    .map(|r| r.pin_type())
                    .unwrap_or(PinMatrixRequestType::Current);

                debug!("PIN matrix request ({})", request);

                let pin = self.interaction.pin_matrix(request).await?;
                dev.pin_matrix_ack(&pin).await?
            }
            Some(MessageKind::PassphraseRequest) => {
                debug!("Passphrase request");

                let passphrase = self.interaction.passphrase().await?;
                dev.passphrase_ack(&passphrase).await?
            }
            Some(MessageKind::WordRequest) => {
                let word = self.interaction.word().await?;
                dev.word_ack(&word).await?
            }
            _ => return Err(Error::unexpected(msg)),
        };

        match resp.kind() {
            Some(MessageKind::Success) => Ok(Outcome::Success(resp)),
            Some(MessageKind::Failure) => Err(failure("interaction", &resp)),
            _ => Ok(Outcome::Continue(resp)),
        }
    }

    /// Answer `msg` if it is an interaction request of `kind`, otherwise
    /// pass it through
    async fn once(&self, dev: &mut D, kind: MessageKind, msg: WireMessage) -> Result<Outcome, Error> {
        if !msg.is(kind) {
            return Ok(Outcome::Continue(msg));
        }

        self.interact(dev, &msg).await
    }

    /// Continue a command from an interaction outcome
    async fn resume(&self, dev: &mut D, flow: &Flow, outcome: Outcome) -> Result<WireMessage, Error> {
        match outcome {
            Outcome::Continue(msg) => self.drive(dev, flow, msg).await,
            Outcome::Success(msg) => settle(flow, msg),
        }
    }

    /// Answer accepted interactions until the terminal response
    async fn drive(&self, dev: &mut D, flow: &Flow, mut msg: WireMessage) -> Result<WireMessage, Error> {
        loop {
            match msg.kind() {
                Some(k) if k == flow.terminal => {
                    match (flow.validate)(&msg)? {
                        Some(text) => info!("{}: {}", flow.name, text),
                        None => debug!("{}: complete ({})", flow.name, msg),
                    }
                    return Ok(msg);
                }
                Some(MessageKind::Failure) => return Err(failure(flow.name, &msg)),
                Some(k) if flow.interactions.contains(&k) => {
                    match self.interact(dev, &msg).await? {
                        Outcome::Continue(next) => msg = next,
                        Outcome::Success(m) => return settle(flow, m),
                    }
                }
                _ => return Err(unexpected(flow.name, &msg)),
            }
        }
    }

    /// Generate `address_n` addresses from `start_index`,
    /// returns `ResponseSkycoinAddress`
    pub async fn address_gen(
        &self,
        address_n: u32,
        start_index: u32,
        confirm_address: bool,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        debug!(
            "address_gen: {} addresses from {} ({})",
            address_n, start_index, wallet_type
        );

        let msg = dev
            .address_gen(address_n, start_index, confirm_address, wallet_type)
            .await?;
        self.drive(&mut dev, &ADDRESS_GEN, msg).await
    }

    /// Apply device settings, returns `Success`
    pub async fn apply_settings(
        &self,
        use_passphrase: Option<bool>,
        label: Option<&str>,
        language: Option<&str>,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.apply_settings(use_passphrase, label, language).await?;
        self.drive(&mut dev, &APPLY_SETTINGS, msg).await
    }

    /// Back up the device seed, returns `Success`
    pub async fn backup(&self) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.backup().await?;
        let outcome = self.once(&mut dev, PinRequest, msg).await?;
        self.resume(&mut dev, &BACKUP, outcome).await
    }

    /// Cancel the in-progress device operation
    pub async fn cancel(&self) -> Result<WireMessage, Error> {
        self.device.lock().await.cancel().await
    }

    /// Verify a message signature, returns `Success` (with the signing
    /// address) or `Failure` as reported by the device
    pub async fn check_message_signature(
        &self,
        message: &str,
        signature: &str,
        address: &str,
    ) -> Result<WireMessage, Error> {
        self.device
            .lock()
            .await
            .check_message_signature(message, signature, address)
            .await
    }

    /// Set, change or remove the device PIN
    ///
    /// Returns an empty `Success` message on completion.
    pub async fn change_pin(&self, remove_pin: Option<bool>) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.change_pin(remove_pin).await?;
        self.drive(&mut dev, &CHANGE_PIN, msg).await?;

        Ok(WireMessage::empty(MessageKind::Success))
    }

    pub async fn connected(&self) -> bool {
        self.device.lock().await.connected().await
    }

    pub async fn available(&self) -> bool {
        self.device.lock().await.available().await
    }

    /// Upload firmware, `hash` is the SHA-256 digest of `payload`
    pub async fn firmware_upload(&self, payload: &[u8], hash: [u8; 32]) -> Result<(), Error> {
        self.device
            .lock()
            .await
            .firmware_upload(payload, hash)
            .await
    }

    /// Fetch device features, returns `Features`
    pub async fn get_features(&self) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.get_features().await?;
        self.drive(&mut dev, &GET_FEATURES, msg).await
    }

    /// Generate a new seed on the device, returns `Success`
    pub async fn generate_mnemonic(
        &self,
        word_count: u32,
        use_passphrase: bool,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.generate_mnemonic(word_count, use_passphrase).await?;
        let outcome = self.once(&mut dev, ButtonRequest, msg).await?;
        self.resume(&mut dev, &GENERATE_MNEMONIC, outcome).await
    }

    /// Recover a seed by entering words on request, returns `Success`
    pub async fn recovery(
        &self,
        word_count: u32,
        use_passphrase: Option<bool>,
        dry_run: bool,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.recovery(word_count, use_passphrase, dry_run).await?;

        let mut msg = match self.once(&mut dev, ButtonRequest, msg).await? {
            Outcome::Continue(m) => m,
            outcome => return self.resume(&mut dev, &RECOVERY, outcome).await,
        };

        // The device decides how many words it asks for
        let mut words = 0usize;
        while msg.is(MessageKind::WordRequest) {
            words += 1;
            debug!("recovery: word {}", words);

            msg = match self.interact(&mut dev, &msg).await? {
                Outcome::Continue(m) => m,
                outcome => return self.resume(&mut dev, &RECOVERY, outcome).await,
            };
        }

        let outcome = self.once(&mut dev, ButtonRequest, msg).await?;
        self.resume(&mut dev, &RECOVERY, outcome).await
    }

    /// Load the provided seed, returns `Success`
    pub async fn set_mnemonic(&self, mnemonic: &str) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.set_mnemonic(mnemonic).await?;
        let outcome = self.once(&mut dev, ButtonRequest, msg).await?;
        self.resume(&mut dev, &SET_MNEMONIC, outcome).await
    }

    /// Sign a transaction, returns `ResponseTransactionSign`
    pub async fn transaction_sign(
        &self,
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        debug!(
            "transaction_sign: {} inputs, {} outputs ({})",
            inputs.len(),
            outputs.len(),
            wallet_type
        );

        let msg = dev.transaction_sign(inputs, outputs, wallet_type).await?;
        self.drive(&mut dev, &TRANSACTION_SIGN, msg).await
    }

    /// Sign a message, returns `ResponseSkycoinSignMessage`
    pub async fn sign_message(
        &self,
        address_index: u32,
        message: &str,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.sign_message(address_index, message, wallet_type).await?;
        self.drive(&mut dev, &SIGN_MESSAGE, msg).await
    }

    /// Wipe the device, returns `Success`
    pub async fn wipe(&self) -> Result<WireMessage, Error> {
        let mut dev = self.device.lock().await;

        let msg = dev.wipe().await?;
        let msg = match self.once(&mut dev, ButtonRequest, msg).await? {
            Outcome::Continue(m) => m,
            outcome => return self.resume(&mut dev, &WIPE, outcome).await,
        };

        // Still waiting on confirmation, reset the session and confirm once more
        if msg.is(ButtonRequest) {
            warn!("wipe: device still waiting on confirmation, resetting session");
            dev.initialize().await?;

            let outcome = self.once(&mut dev, ButtonRequest, msg).await?;
            return self.resume(&mut dev, &WIPE, outcome).await;
        }

        self.drive(&mut dev, &WIPE, msg).await
    }

    pub async fn pin_matrix_ack(&self, pin: &str) -> Result<WireMessage, Error> {
        self.device.lock().await.pin_matrix_ack(pin).await
    }

    pub async fn word_ack(&self, word: &str) -> Result<WireMessage, Error> {
        self.device.lock().await.word_ack(word).await
    }

    pub async fn passphrase_ack(&self, passphrase: &str) -> Result<WireMessage, Error> {
        self.device.lock().await.passphrase_ack(passphrase).await
    }

    pub async fn button_ack(&self) -> Result<WireMessage, Error> {
        self.device.lock().await.button_ack().await
    }

    /// Enable or disable emulator auto button presses
    pub async fn set_auto_press_button(
        &self,
        enable: bool,
        button: SimulateButtonType,
    ) -> Result<(), Error> {
        self.device
            .lock()
            .await
            .set_auto_press_button(enable, button)
            .await
    }

    pub async fn connect(&self) -> Result<(), Error> {
        self.device.lock().await.connect().await
    }

    pub async fn disconnect(&self) -> Result<(), Error> {
        self.device.lock().await.disconnect().await
    }

    pub async fn close(&self) {
        self.device.lock().await.close().await
    }
}
