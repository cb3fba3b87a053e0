// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Device operations, one request / response round-trip per call
//!
//! [Device] is the seam between the [Sequencer](crate::Sequencer) and the
//! hardware. Each method sends a single request and returns the first
//! response (the device layer never loops on interaction requests), with
//! the exception of the compound operations noted on each method.

use async_trait::async_trait;
use log::{debug, info};
use prost::Message;

use skywallet_proto::{
    decode_failure,
    messages::{
        ApplySettings, BackupDevice, ButtonAck, Cancel, ChangePin, FirmwareErase,
        FirmwareUpload, GenerateMnemonic, GetFeatures, Initialize, PassphraseAck, PinMatrixAck,
        RecoveryDevice, SetMnemonic, SimulateButton, SimulateButtonType, WipeDevice, WordAck,
    },
    skycoin::{
        SkycoinAddress, SkycoinCheckMessageSignature, SkycoinSignMessage,
        SkycoinTransactionInput, SkycoinTransactionOutput, TransactionSign,
    },
    wire::MAX_PAYLOAD_LEN,
    MessageKind, WalletType, WireMessage,
};

use crate::{driver::Driver, transport::Transport, DeviceType, Error};

/// Single round-trip device operations
#[async_trait]
pub trait Device: Send {
    /// Request `address_n` addresses starting from `start_index`
    async fn address_gen(
        &mut self,
        address_n: u32,
        start_index: u32,
        confirm_address: bool,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error>;

    /// Update device settings, `None` fields are left unchanged
    async fn apply_settings(
        &mut self,
        use_passphrase: Option<bool>,
        label: Option<&str>,
        language: Option<&str>,
    ) -> Result<WireMessage, Error>;

    /// Start a seed backup (resets the session first)
    async fn backup(&mut self) -> Result<WireMessage, Error>;

    async fn cancel(&mut self) -> Result<WireMessage, Error>;

    async fn check_message_signature(
        &mut self,
        message: &str,
        signature: &str,
        address: &str,
    ) -> Result<WireMessage, Error>;

    /// Set or change the PIN, or remove it with `remove_pin = Some(true)`
    async fn change_pin(&mut self, remove_pin: Option<bool>) -> Result<WireMessage, Error>;

    /// Check an open transport exists and the device is reachable
    async fn connected(&mut self) -> bool;

    /// Check a device is reachable
    async fn available(&mut self) -> bool;

    /// Erase then upload firmware (USB only)
    async fn firmware_upload(&mut self, payload: &[u8], hash: [u8; 32]) -> Result<(), Error>;

    async fn get_features(&mut self) -> Result<WireMessage, Error>;

    async fn generate_mnemonic(
        &mut self,
        word_count: u32,
        use_passphrase: bool,
    ) -> Result<WireMessage, Error>;

    async fn recovery(
        &mut self,
        word_count: u32,
        use_passphrase: Option<bool>,
        dry_run: bool,
    ) -> Result<WireMessage, Error>;

    async fn set_mnemonic(&mut self, mnemonic: &str) -> Result<WireMessage, Error>;

    async fn transaction_sign(
        &mut self,
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error>;

    async fn sign_message(
        &mut self,
        address_index: u32,
        message: &str,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error>;

    /// Wipe the device (resets the session first)
    async fn wipe(&mut self) -> Result<WireMessage, Error>;

    async fn pin_matrix_ack(&mut self, pin: &str) -> Result<WireMessage, Error>;

    async fn word_ack(&mut self, word: &str) -> Result<WireMessage, Error>;

    async fn passphrase_ack(&mut self, passphrase: &str) -> Result<WireMessage, Error>;

    async fn button_ack(&mut self) -> Result<WireMessage, Error>;

    /// Reset the device session, returns the device `Features`
    async fn initialize(&mut self) -> Result<WireMessage, Error>;

    /// Press `button` on the emulator following every button request
    async fn set_auto_press_button(
        &mut self,
        enable: bool,
        button: SimulateButtonType,
    ) -> Result<(), Error>;

    /// Open a transport, replacing any existing one
    async fn connect(&mut self) -> Result<(), Error>;

    /// Drop the current transport
    async fn disconnect(&mut self) -> Result<(), Error>;

    /// Release all device resources
    async fn close(&mut self);
}

/// Device handle, implements [Device] over a [Driver]
///
/// The transport is opened on first use and dropped on transport errors,
/// the next operation will attempt to re-open it.
pub struct DeviceHandle<D: Driver> {
    driver: D,
    transport: Option<D::Transport>,
    auto_press: Option<SimulateButtonType>,
}

impl<D: Driver> From<D> for DeviceHandle<D> {
    fn from(driver: D) -> Self {
        Self {
            driver,
            transport: None,
            auto_press: None,
        }
    }
}

impl<D: Driver> DeviceHandle<D> {
    /// Type of the underlying device
    pub fn device_type(&self) -> DeviceType {
        self.driver.device_type()
    }

    /// Fetch the open transport, opening one if required
    async fn transport(&mut self) -> Result<&mut D::Transport, Error> {
        let t = match self.transport.take() {
            Some(t) => t,
            None => {
                debug!("Opening {} transport", self.driver.device_type());
                self.driver.open().await?
            }
        };

        Ok(self.transport.insert(t))
    }

    /// Send a request and wait for the response
    async fn request(&mut self, msg: WireMessage) -> Result<WireMessage, Error> {
        let t = self.transport().await?;

        match t.exchange(&msg).await {
            Ok(r) => Ok(r),
            Err(e) => {
                self.transport = None;
                Err(e.into())
            }
        }
    }

    /// Send a request without reading a response
    async fn send(&mut self, msg: WireMessage) -> Result<(), Error> {
        let t = self.transport().await?;

        if let Err(e) = t.send(&msg).await {
            self.transport = None;
            return Err(e.into());
        }

        Ok(())
    }

    /// Receive a single response
    async fn receive(&mut self) -> Result<WireMessage, Error> {
        let t = self.transport().await?;

        match t.receive().await {
            Ok(r) => Ok(r),
            Err(e) => {
                self.transport = None;
                Err(e.into())
            }
        }
    }
}

/// Fail on a `Failure` response, otherwise discard it
fn check_failure(step: &str, resp: &WireMessage) -> Result<(), Error> {
    if resp.is(MessageKind::Failure) {
        let f = decode_failure(resp)?;
        return Err(Error::DeviceFailure(f));
    }

    debug!("{}: {}", step, resp);
    Ok(())
}

#[async_trait]
impl<D: Driver> Device for DeviceHandle<D> {
    async fn address_gen(
        &mut self,
        address_n: u32,
        start_index: u32,
        confirm_address: bool,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let req = SkycoinAddress {
            address_n,
            start_index: Some(start_index),
            confirm_address: Some(confirm_address),
            wallet_type: Some(wallet_type.to_string()),
        };

        self.request(WireMessage::encode(MessageKind::SkycoinAddress, &req))
            .await
    }

    async fn apply_settings(
        &mut self,
        use_passphrase: Option<bool>,
        label: Option<&str>,
        language: Option<&str>,
    ) -> Result<WireMessage, Error> {
        let req = ApplySettings {
            language: language.map(String::from),
            label: label.map(String::from),
            use_passphrase,
        };

        self.request(WireMessage::encode(MessageKind::ApplySettings, &req))
            .await
    }

    async fn backup(&mut self) -> Result<WireMessage, Error> {
        self.initialize().await?;

        self.request(WireMessage::encode(
            MessageKind::BackupDevice,
            &BackupDevice {},
        ))
        .await
    }

    async fn cancel(&mut self) -> Result<WireMessage, Error> {
        self.request(WireMessage::encode(MessageKind::Cancel, &Cancel {}))
            .await
    }

    async fn check_message_signature(
        &mut self,
        message: &str,
        signature: &str,
        address: &str,
    ) -> Result<WireMessage, Error> {
        let req = SkycoinCheckMessageSignature {
            address: address.to_string(),
            message: message.to_string(),
            signature: signature.to_string(),
        };

        self.request(WireMessage::encode(
            MessageKind::SkycoinCheckMessageSignature,
            &req,
        ))
        .await
    }

    async fn change_pin(&mut self, remove_pin: Option<bool>) -> Result<WireMessage, Error> {
        let req = ChangePin { remove: remove_pin };

        self.request(WireMessage::encode(MessageKind::ChangePin, &req))
            .await
    }

    async fn connected(&mut self) -> bool {
        self.transport.is_some() && self.driver.available().await
    }

    async fn available(&mut self) -> bool {
        self.driver.available().await
    }

    async fn firmware_upload(&mut self, payload: &[u8], hash: [u8; 32]) -> Result<(), Error> {
        let upload = FirmwareUpload {
            payload: payload.to_vec(),
            hash: Some(hash.to_vec()),
        };
        if upload.encoded_len() > MAX_PAYLOAD_LEN {
            return Err(Error::FirmwareTooLarge(payload.len()));
        }

        let device_type = self.driver.device_type();
        if device_type != DeviceType::Usb {
            return Err(Error::WrongDeviceType(device_type));
        }

        self.initialize().await?;

        // Bounded by MAX_PAYLOAD_LEN above
        let erase = FirmwareErase {
            length: Some(payload.len() as u32),
        };
        let resp = self
            .request(WireMessage::encode(MessageKind::FirmwareErase, &erase))
            .await?;
        check_failure("firmware erase", &resp)?;

        info!("Uploading firmware ({} bytes)", payload.len());

        let resp = self
            .request(WireMessage::encode(MessageKind::FirmwareUpload, &upload))
            .await?;
        check_failure("firmware upload", &resp)?;

        // Bootloader reboots into the new firmware, no response follows
        self.send(WireMessage::encode(MessageKind::ButtonAck, &ButtonAck {}))
            .await
    }

    async fn get_features(&mut self) -> Result<WireMessage, Error> {
        self.request(WireMessage::encode(MessageKind::GetFeatures, &GetFeatures {}))
            .await
    }

    async fn generate_mnemonic(
        &mut self,
        word_count: u32,
        use_passphrase: bool,
    ) -> Result<WireMessage, Error> {
        let req = GenerateMnemonic {
            word_count: Some(word_count),
            use_passphrase: Some(use_passphrase),
        };

        self.request(WireMessage::encode(MessageKind::GenerateMnemonic, &req))
            .await
    }

    async fn recovery(
        &mut self,
        word_count: u32,
        use_passphrase: Option<bool>,
        dry_run: bool,
    ) -> Result<WireMessage, Error> {
        let req = RecoveryDevice {
            word_count: Some(word_count),
            passphrase_protection: use_passphrase,
            dry_run: Some(dry_run),
        };

        self.request(WireMessage::encode(MessageKind::RecoveryDevice, &req))
            .await
    }

    async fn set_mnemonic(&mut self, mnemonic: &str) -> Result<WireMessage, Error> {
        let req = SetMnemonic {
            mnemonic: mnemonic.to_string(),
        };

        self.request(WireMessage::encode(MessageKind::SetMnemonic, &req))
            .await
    }

    async fn transaction_sign(
        &mut self,
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let req = TransactionSign::new(inputs, outputs, wallet_type);

        self.request(WireMessage::encode(MessageKind::TransactionSign, &req))
            .await
    }

    async fn sign_message(
        &mut self,
        address_index: u32,
        message: &str,
        wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        let req = SkycoinSignMessage {
            address_n: address_index,
            message: message.to_string(),
            wallet_type: Some(wallet_type.to_string()),
        };

        self.request(WireMessage::encode(MessageKind::SkycoinSignMessage, &req))
            .await
    }

    async fn wipe(&mut self) -> Result<WireMessage, Error> {
        self.initialize().await?;

        self.request(WireMessage::encode(MessageKind::WipeDevice, &WipeDevice {}))
            .await
    }

    async fn pin_matrix_ack(&mut self, pin: &str) -> Result<WireMessage, Error> {
        let req = PinMatrixAck {
            pin: pin.to_string(),
        };

        self.request(WireMessage::encode(MessageKind::PinMatrixAck, &req))
            .await
    }

    async fn word_ack(&mut self, word: &str) -> Result<WireMessage, Error> {
        let req = WordAck {
            word: word.to_string(),
        };

        self.request(WireMessage::encode(MessageKind::WordAck, &req))
            .await
    }

    async fn passphrase_ack(&mut self, passphrase: &str) -> Result<WireMessage, Error> {
        let req = PassphraseAck {
            passphrase: passphrase.to_string(),
        };

        self.request(WireMessage::encode(MessageKind::PassphraseAck, &req))
            .await
    }

    async fn button_ack(&mut self) -> Result<WireMessage, Error> {
        self.send(WireMessage::encode(MessageKind::ButtonAck, &ButtonAck {}))
            .await?;

        if let Some(button) = self.auto_press {
            debug!("Simulating {} button press", button);

            let press = SimulateButton {
                button: button as i32,
            };
            self.send(WireMessage::encode(MessageKind::SimulateButton, &press))
                .await?;
        }

        self.receive().await
    }

    async fn initialize(&mut self) -> Result<WireMessage, Error> {
        self.request(WireMessage::encode(MessageKind::Initialize, &Initialize {}))
            .await
    }

    async fn set_auto_press_button(
        &mut self,
        enable: bool,
        button: SimulateButtonType,
    ) -> Result<(), Error> {
        let device_type = self.driver.device_type();
        if device_type != DeviceType::Emulator {
            return Err(Error::WrongDeviceType(device_type));
        }

        self.auto_press = enable.then_some(button);

        Ok(())
    }

    async fn connect(&mut self) -> Result<(), Error> {
        self.transport = None;
        self.transport().await?;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.transport = None;
        Ok(())
    }

    async fn close(&mut self) {
        self.transport = None;
        self.auto_press = None;
    }
}
