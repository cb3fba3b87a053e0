// Copyright (c) 2022-2023 The FiberCrypto Developers

//! User interaction (PIN, passphrase and recovery word entry)

use std::io::{BufRead, Write};

use async_trait::async_trait;
use zeroize::Zeroizing;

use skywallet_proto::messages::PinMatrixRequestType;

use crate::Error;

/// Source of secrets requested by the device during a command
#[async_trait]
pub trait Interaction: Send + Sync {
    /// Matrix-position encoded PIN
    async fn pin_matrix(&self, request: PinMatrixRequestType) -> Result<Zeroizing<String>, Error>;

    async fn passphrase(&self) -> Result<Zeroizing<String>, Error>;

    /// Next recovery word
    async fn word(&self) -> Result<Zeroizing<String>, Error>;
}

/// Answers every request with an empty string
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Unattended;

#[async_trait]
impl Interaction for Unattended {
    async fn pin_matrix(&self, _request: PinMatrixRequestType) -> Result<Zeroizing<String>, Error> {
        Ok(Zeroizing::new(String::new()))
    }

    async fn passphrase(&self) -> Result<Zeroizing<String>, Error> {
        Ok(Zeroizing::new(String::new()))
    }

    async fn word(&self) -> Result<Zeroizing<String>, Error> {
        Ok(Zeroizing::new(String::new()))
    }
}

/// Prompt on stderr and read responses from stdin
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Prompt;

const PIN_MATRIX_LEGEND: &str = "\
Enter the positions of your PIN digits as shown on the device screen:
    7 8 9
    4 5 6
    1 2 3
";

#[async_trait]
impl Interaction for Prompt {
    async fn pin_matrix(&self, request: PinMatrixRequestType) -> Result<Zeroizing<String>, Error> {
        let title = match request {
            PinMatrixRequestType::Current => "Current PIN",
            PinMatrixRequestType::NewFirst => "New PIN",
            PinMatrixRequestType::NewSecond => "Confirm new PIN",
        };

        read_line(format!("{title}\n{PIN_MATRIX_LEGEND}> ")).await
    }

    async fn passphrase(&self) -> Result<Zeroizing<String>, Error> {
        read_line("Passphrase: ".to_string()).await
    }

    async fn word(&self) -> Result<Zeroizing<String>, Error> {
        read_line("Word: ".to_string()).await
    }
}

/// Print `prompt` and read a single line from stdin
async fn read_line(prompt: String) -> Result<Zeroizing<String>, Error> {
    let r = tokio::task::spawn_blocking(move || -> std::io::Result<Zeroizing<String>> {
        let mut stderr = std::io::stderr();
        stderr.write_all(prompt.as_bytes())?;
        stderr.flush()?;

        let mut line = Zeroizing::new(String::new());
        std::io::stdin().lock().read_line(&mut line)?;

        Ok(Zeroizing::new(line.trim_end_matches(['\r', '\n']).to_string()))
    })
    .await
    .map_err(|e| Error::Interaction(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

    r.map_err(Error::Interaction)
}
