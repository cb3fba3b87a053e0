// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Device drivers, locating devices and opening transports to them

use std::net::SocketAddr;

use async_trait::async_trait;
use log::debug;

#[cfg(feature = "transport_hid")]
use std::sync::{Arc, Mutex};

#[cfg(feature = "transport_hid")]
use hidapi::HidApi;

use crate::{
    transport::{GenericTransport, Transport, UdpTransport, EMULATOR_ADDR},
    DeviceType, Error,
};

#[cfg(feature = "transport_hid")]
use crate::{error::TransportError, transport::HidTransport};

/// Driver for a class of devices
#[async_trait]
pub trait Driver: Send + Sync {
    type Transport: Transport;

    /// Device type handled by this driver
    fn device_type(&self) -> DeviceType;

    /// Open a transport to the first available device
    async fn open(&self) -> Result<Self::Transport, Error>;

    /// Check whether a device is reachable
    async fn available(&self) -> bool;
}

/// Emulator driver, connects via UDP
#[derive(Clone, Debug, PartialEq)]
pub struct EmulatorDriver {
    pub addr: SocketAddr,
}

impl Default for EmulatorDriver {
    fn default() -> Self {
        Self {
            addr: EMULATOR_ADDR,
        }
    }
}

#[async_trait]
impl Driver for EmulatorDriver {
    type Transport = UdpTransport;

    fn device_type(&self) -> DeviceType {
        DeviceType::Emulator
    }

    async fn open(&self) -> Result<Self::Transport, Error> {
        let t = UdpTransport::connect(self.addr).await?;
        Ok(t)
    }

    async fn available(&self) -> bool {
        match UdpTransport::connect(self.addr).await {
            Ok(t) => t.ping().await,
            Err(e) => {
                debug!("Emulator unavailable: {}", e);
                false
            }
        }
    }
}

/// USB driver, connects to the first Skywallet found via HID
///
/// Only one [HidApi] context may exist per process and open devices keep
/// it alive, so the context is created once and shared by clones of the
/// driver.
#[cfg(feature = "transport_hid")]
#[derive(Clone, Default)]
pub struct UsbDriver {
    api: Arc<Mutex<Option<HidApi>>>,
}

#[cfg(feature = "transport_hid")]
impl UsbDriver {
    /// Run `f` against a freshly enumerated device list, creating the
    /// shared context on first use
    fn with_api<R>(&self, f: impl FnOnce(&HidApi) -> R) -> Result<R, TransportError> {
        let mut api = self.api.lock().map_err(|_| {
            TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "HID context poisoned",
            ))
        })?;

        match api.as_mut() {
            Some(a) => {
                a.refresh_devices()?;
                Ok(f(a))
            }
            None => Ok(f(api.insert(HidApi::new()?))),
        }
    }
}

#[cfg(feature = "transport_hid")]
impl std::fmt::Debug for UsbDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsbDriver").finish_non_exhaustive()
    }
}

#[cfg(feature = "transport_hid")]
impl PartialEq for UsbDriver {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.api, &other.api)
    }
}

#[cfg(feature = "transport_hid")]
#[async_trait]
impl Driver for UsbDriver {
    type Transport = HidTransport;

    fn device_type(&self) -> DeviceType {
        DeviceType::Usb
    }

    async fn open(&self) -> Result<Self::Transport, Error> {
        let t = self.with_api(|api| match HidTransport::list(api).next() {
            Some(info) => HidTransport::open(api, info).map_err(Error::from),
            None => Err(Error::NoDevice),
        })??;

        Ok(t)
    }

    async fn available(&self) -> bool {
        match self.with_api(|api| HidTransport::list(api).next().is_some()) {
            Ok(v) => v,
            Err(e) => {
                debug!("HID unavailable: {}", e);
                false
            }
        }
    }
}

/// Generic driver, selects emulator or USB at runtime
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum GenericDriver {
    Emulator(EmulatorDriver),
    #[cfg(feature = "transport_hid")]
    Usb(UsbDriver),
}

impl GenericDriver {
    /// Create a driver for the provided device type
    pub fn new(device_type: DeviceType, emulator_addr: SocketAddr) -> Result<Self, Error> {
        match device_type {
            DeviceType::Emulator => Ok(Self::Emulator(EmulatorDriver {
                addr: emulator_addr,
            })),
            #[cfg(feature = "transport_hid")]
            DeviceType::Usb => Ok(Self::Usb(UsbDriver::default())),
            #[cfg(not(feature = "transport_hid"))]
            DeviceType::Usb => Err(Error::WrongDeviceType(DeviceType::Usb)),
        }
    }
}

#[async_trait]
impl Driver for GenericDriver {
    type Transport = GenericTransport;

    fn device_type(&self) -> DeviceType {
        match self {
            Self::Emulator(d) => d.device_type(),
            #[cfg(feature = "transport_hid")]
            Self::Usb(d) => d.device_type(),
        }
    }

    async fn open(&self) -> Result<Self::Transport, Error> {
        match self {
            Self::Emulator(d) => d.open().await.map(GenericTransport::from),
            #[cfg(feature = "transport_hid")]
            Self::Usb(d) => d.open().await.map(GenericTransport::from),
        }
    }

    async fn available(&self) -> bool {
        match self {
            Self::Emulator(d) => d.available().await,
            #[cfg(feature = "transport_hid")]
            Self::Usb(d) => d.available().await,
        }
    }
}
