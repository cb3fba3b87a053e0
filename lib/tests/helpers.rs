// Copyright (c) 2022-2023 The FiberCrypto Developers

use std::{
    collections::VecDeque,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, LevelFilter};
use simplelog::SimpleLogger;

use skywallet::{
    error::TransportError,
    proto::{
        features::Features,
        messages::{PinMatrixRequest, PinMatrixRequestType, SimulateButtonType},
        skycoin::{
            ResponseSkycoinAddress, ResponseSkycoinSignMessage, ResponseTransactionSign,
            SkycoinTransactionInput, SkycoinTransactionOutput,
        },
        status::{Failure, FailureType, Success},
        MessageKind, WalletType, WireMessage,
    },
    Device, Error, Sequencer,
};

/// Setup logging for tests (best-effort, may already be installed)
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let _ = SimpleLogger::init(log_level, simplelog::Config::default());
}

/// Scripted device response
#[derive(Debug)]
pub enum Reply {
    /// Respond with a message
    Msg(WireMessage),
    /// Fail with a transport error
    TransportError,
    /// Never respond
    Hang,
}

/// Device call, recorded in order of issue
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    AddressGen { address_n: u32, start_index: u32 },
    ApplySettings,
    Backup,
    Cancel,
    CheckMessageSignature,
    ChangePin(Option<bool>),
    Connected,
    Available,
    FirmwareUpload(usize),
    GetFeatures,
    GenerateMnemonic,
    Recovery(u32),
    SetMnemonic,
    TransactionSign { inputs: usize, outputs: usize },
    SignMessage,
    Wipe,
    PinMatrixAck(String),
    WordAck(String),
    PassphraseAck(String),
    ButtonAck,
    Initialize,
    SetAutoPressButton(bool),
    Connect,
    Disconnect,
    Close,
}

impl Call {
    /// Calls that begin a new command
    pub fn starts_command(&self) -> bool {
        !matches!(
            self,
            Call::PinMatrixAck(_)
                | Call::WordAck(_)
                | Call::PassphraseAck(_)
                | Call::ButtonAck
                | Call::Initialize
        )
    }
}

/// Calls issued against a [FakeDevice]
#[derive(Debug, Default)]
pub struct Record {
    pub calls: Vec<Call>,
    /// A command is waiting on an interaction response
    pub in_flight: bool,
    /// Commands started while another was in flight
    pub interleaved: usize,
}

pub type Recorder = Arc<Mutex<Record>>;

/// Fake device, replays a script of responses and records every call
pub struct FakeDevice {
    script: VecDeque<Reply>,
    record: Recorder,
    delay: Option<Duration>,
}

impl FakeDevice {
    pub fn new(script: Vec<Reply>) -> (Self, Recorder) {
        let record = Recorder::default();

        let d = Self {
            script: script.into(),
            record: record.clone(),
            delay: None,
        };

        (d, record)
    }

    /// Delay each response, widening the window for concurrent callers
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn log(&self, call: Call, reply: Option<&Reply>) {
        let mut r = self.record.lock().unwrap();

        if call.starts_command() && r.in_flight {
            r.interleaved += 1;
        }

        r.in_flight = matches!(
            reply,
            Some(Reply::Msg(m)) if m.kind().map_or(false, |k| k.is_interaction())
        );

        r.calls.push(call);
    }

    async fn reply(&mut self, call: Call) -> Result<WireMessage, Error> {
        let reply = self.script.pop_front();

        debug!("fake device: {:?} -> {:?}", call, reply);
        self.log(call, reply.as_ref());

        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }

        match reply {
            Some(Reply::Msg(m)) => Ok(m),
            Some(Reply::TransportError) | None => Err(transport_error()),
            Some(Reply::Hang) => std::future::pending().await,
        }
    }
}

#[allow(unused)]
pub fn transport_error() -> Error {
    Error::Transport(TransportError::Io(std::io::Error::new(
        std::io::ErrorKind::BrokenPipe,
        "device disconnected",
    )))
}

#[async_trait]
impl Device for FakeDevice {
    async fn address_gen(
        &mut self,
        address_n: u32,
        start_index: u32,
        _confirm_address: bool,
        _wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::AddressGen {
            address_n,
            start_index,
        })
        .await
    }

    async fn apply_settings(
        &mut self,
        _use_passphrase: Option<bool>,
        _label: Option<&str>,
        _language: Option<&str>,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::ApplySettings).await
    }

    async fn backup(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::Backup).await
    }

    async fn cancel(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::Cancel).await
    }

    async fn check_message_signature(
        &mut self,
        _message: &str,
        _signature: &str,
        _address: &str,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::CheckMessageSignature).await
    }

    async fn change_pin(&mut self, remove_pin: Option<bool>) -> Result<WireMessage, Error> {
        self.reply(Call::ChangePin(remove_pin)).await
    }

    async fn connected(&mut self) -> bool {
        self.log(Call::Connected, None);
        true
    }

    async fn available(&mut self) -> bool {
        self.log(Call::Available, None);
        true
    }

    async fn firmware_upload(&mut self, payload: &[u8], _hash: [u8; 32]) -> Result<(), Error> {
        self.log(Call::FirmwareUpload(payload.len()), None);
        Ok(())
    }

    async fn get_features(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::GetFeatures).await
    }

    async fn generate_mnemonic(
        &mut self,
        _word_count: u32,
        _use_passphrase: bool,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::GenerateMnemonic).await
    }

    async fn recovery(
        &mut self,
        word_count: u32,
        _use_passphrase: Option<bool>,
        _dry_run: bool,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::Recovery(word_count)).await
    }

    async fn set_mnemonic(&mut self, _mnemonic: &str) -> Result<WireMessage, Error> {
        self.reply(Call::SetMnemonic).await
    }

    async fn transaction_sign(
        &mut self,
        inputs: Vec<SkycoinTransactionInput>,
        outputs: Vec<SkycoinTransactionOutput>,
        _wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::TransactionSign {
            inputs: inputs.len(),
            outputs: outputs.len(),
        })
        .await
    }

    async fn sign_message(
        &mut self,
        _address_index: u32,
        _message: &str,
        _wallet_type: WalletType,
    ) -> Result<WireMessage, Error> {
        self.reply(Call::SignMessage).await
    }

    async fn wipe(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::Wipe).await
    }

    async fn pin_matrix_ack(&mut self, pin: &str) -> Result<WireMessage, Error> {
        self.reply(Call::PinMatrixAck(pin.to_string())).await
    }

    async fn word_ack(&mut self, word: &str) -> Result<WireMessage, Error> {
        self.reply(Call::WordAck(word.to_string())).await
    }

    async fn passphrase_ack(&mut self, passphrase: &str) -> Result<WireMessage, Error> {
        self.reply(Call::PassphraseAck(passphrase.to_string()))
            .await
    }

    async fn button_ack(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::ButtonAck).await
    }

    async fn initialize(&mut self) -> Result<WireMessage, Error> {
        self.reply(Call::Initialize).await
    }

    async fn set_auto_press_button(
        &mut self,
        enable: bool,
        _button: SimulateButtonType,
    ) -> Result<(), Error> {
        self.log(Call::SetAutoPressButton(enable), None);
        Ok(())
    }

    async fn connect(&mut self) -> Result<(), Error> {
        self.log(Call::Connect, None);
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), Error> {
        self.log(Call::Disconnect, None);
        Ok(())
    }

    async fn close(&mut self) {
        self.log(Call::Close, None);
    }
}

/// Fetch a copy of the recorded calls
#[allow(unused)]
pub fn calls(r: &Recorder) -> Vec<Call> {
    r.lock().unwrap().calls.clone()
}

#[allow(unused)]
pub fn button_request() -> Reply {
    Reply::Msg(WireMessage::empty(MessageKind::ButtonRequest))
}

#[allow(unused)]
pub fn pin_request(pin_type: PinMatrixRequestType) -> Reply {
    let m = PinMatrixRequest {
        pin_type: Some(pin_type as i32),
    };
    Reply::Msg(WireMessage::encode(MessageKind::PinMatrixRequest, &m))
}

#[allow(unused)]
pub fn passphrase_request() -> Reply {
    Reply::Msg(WireMessage::empty(MessageKind::PassphraseRequest))
}

#[allow(unused)]
pub fn word_request() -> Reply {
    Reply::Msg(WireMessage::empty(MessageKind::WordRequest))
}

#[allow(unused)]
pub fn success(text: &str) -> Reply {
    let m = Success {
        message: Some(text.to_string()),
    };
    Reply::Msg(WireMessage::encode(MessageKind::Success, &m))
}

#[allow(unused)]
pub fn failure(code: FailureType, text: &str) -> Reply {
    let m = Failure {
        code: Some(code as i32),
        message: Some(text.to_string()),
    };
    Reply::Msg(WireMessage::encode(MessageKind::Failure, &m))
}

#[allow(unused)]
pub fn addresses(addresses: &[&str]) -> Reply {
    let m = ResponseSkycoinAddress {
        addresses: addresses.iter().map(|a| a.to_string()).collect(),
    };
    Reply::Msg(WireMessage::encode(MessageKind::ResponseSkycoinAddress, &m))
}

#[allow(unused)]
pub fn signed_message(signature: &str) -> Reply {
    let m = ResponseSkycoinSignMessage {
        signed_message: signature.to_string(),
    };
    Reply::Msg(WireMessage::encode(
        MessageKind::ResponseSkycoinSignMessage,
        &m,
    ))
}

#[allow(unused)]
pub fn signatures(n: usize) -> Reply {
    let m = ResponseTransactionSign {
        signatures: (0..n).map(|i| format!("{i:0>130}")).collect(),
        padding: None,
    };
    Reply::Msg(WireMessage::encode(MessageKind::ResponseTransactionSign, &m))
}

#[allow(unused)]
pub fn features() -> Reply {
    let m = Features {
        vendor: Some("Skycoin Foundation".to_string()),
        initialized: Some(true),
        ..Default::default()
    };
    Reply::Msg(WireMessage::encode(MessageKind::Features, &m))
}

#[allow(unused)]
pub fn tx_inputs(n: usize) -> Vec<SkycoinTransactionInput> {
    (0..n)
        .map(|i| SkycoinTransactionInput {
            hash_in: format!("{i:064x}"),
            index: Some(i as u32),
        })
        .collect()
}

#[allow(unused)]
pub fn tx_outputs(n: usize) -> Vec<SkycoinTransactionOutput> {
    (0..n)
        .map(|i| SkycoinTransactionOutput {
            address: "2M755W9o7933roLASK9PZTmqRsjQUsVen9y".to_string(),
            coin: 1_000_000 * (i as u64 + 1),
            hour: 2,
            address_index: None,
        })
        .collect()
}

/// Every sequencer command that issues a device request
#[allow(unused)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Command {
    AddressGen,
    ApplySettings,
    Backup,
    ChangePin,
    GetFeatures,
    GenerateMnemonic,
    Recovery,
    SetMnemonic,
    SignMessage,
    TransactionSign,
    Wipe,
}

#[allow(unused)]
pub const LOOPING_COMMANDS: &[Command] = &[
    Command::AddressGen,
    Command::ApplySettings,
    Command::Backup,
    Command::ChangePin,
    Command::GetFeatures,
    Command::GenerateMnemonic,
    Command::Recovery,
    Command::SetMnemonic,
    Command::SignMessage,
    Command::TransactionSign,
    Command::Wipe,
];

/// Run a command with default arguments
#[allow(unused)]
pub async fn run<D: Device>(s: &Sequencer<D>, c: Command) -> Result<WireMessage, Error> {
    match c {
        Command::AddressGen => s.address_gen(2, 0, false, WalletType::Deterministic).await,
        Command::ApplySettings => s.apply_settings(Some(true), Some("test"), None).await,
        Command::Backup => s.backup().await,
        Command::ChangePin => s.change_pin(None).await,
        Command::GetFeatures => s.get_features().await,
        Command::GenerateMnemonic => s.generate_mnemonic(12, false).await,
        Command::Recovery => s.recovery(12, None, false).await,
        Command::SetMnemonic => {
            s.set_mnemonic("cloud flower upset remain green metal below cup stem infant art thank")
                .await
        }
        Command::SignMessage => s.sign_message(0, "hello", WalletType::Deterministic).await,
        Command::TransactionSign => {
            s.transaction_sign(tx_inputs(1), tx_outputs(2), WalletType::Bip44)
                .await
        }
        Command::Wipe => s.wipe().await,
    }
}
