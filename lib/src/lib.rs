// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Skywallet hardware wallet API Library (and CLI)
//!
//! Commands are issued through a [Sequencer], which serialises access to a
//! [Device] and answers the interaction requests (button confirmation, PIN,
//! passphrase, recovery words) the device raises until each command
//! completes.
//!
//! ```no_run
//! use skywallet::{DeviceType, GenericHandle, Sequencer, transport::EMULATOR_ADDR};
//!
//! # async fn example() -> Result<(), skywallet::Error> {
//! let handle = GenericHandle::open(DeviceType::Emulator, EMULATOR_ADDR)?;
//! let s = Sequencer::new(handle);
//!
//! let features = s.get_features().await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;

/// Re-export `skywallet-proto` for consumers
pub use skywallet_proto::{self as proto};

pub mod transport;

pub mod driver;
use driver::GenericDriver;

mod device;
pub use device::{Device, DeviceHandle};

pub mod error;
pub use error::Error;

pub mod interaction;

mod sequencer;
pub use sequencer::Sequencer;

/// Device type selector
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum DeviceType {
    /// Firmware emulator, via UDP
    Emulator,
    /// Physical device, via USB HID
    Usb,
}

/// Generic device handle (abstract over device types)
pub type GenericHandle = DeviceHandle<GenericDriver>;

impl GenericHandle {
    /// Create a handle for the provided device type, the transport is
    /// opened on first use
    pub fn open(device_type: DeviceType, emulator_addr: SocketAddr) -> Result<Self, Error> {
        let d = GenericDriver::new(device_type, emulator_addr)?;
        Ok(Self::from(d))
    }
}
