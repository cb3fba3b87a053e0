// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Transport abstraction and the emulator / USB implementations

use std::{
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4},
    time::Duration,
};

use async_trait::async_trait;
use log::{debug, trace};
use strum::Display;
use tokio::net::UdpSocket;

use skywallet_proto::{encode_frames, FrameDecoder, WireMessage, REPORT_LEN};

use crate::error::TransportError;

/// Default emulator address
pub const EMULATOR_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 21324));

/// Emulator liveness probe datagrams
const PING: &[u8; 8] = b"PINGPING";
const PONG: &[u8; 8] = b"PONGPONG";

/// Wait for a probe response, this bounds only the liveness check
const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

/// Report based duplex channel to a device
#[async_trait]
pub trait Transport: Send {
    /// Write a single report
    async fn write_report(&mut self, report: &[u8; REPORT_LEN]) -> Result<(), TransportError>;

    /// Block until a single report is received
    async fn read_report(&mut self) -> Result<[u8; REPORT_LEN], TransportError>;

    /// Send a message without waiting for a response
    async fn send(&mut self, msg: &WireMessage) -> Result<(), TransportError> {
        debug!("send: {}", msg);

        for r in encode_frames(msg) {
            self.write_report(&r).await?;
        }

        Ok(())
    }

    /// Receive the next complete message
    async fn receive(&mut self) -> Result<WireMessage, TransportError> {
        let mut decoder = FrameDecoder::new();

        loop {
            let r = self.read_report().await?;
            if let Some(msg) = decoder.push(&r).map_err(TransportError::Codec)? {
                debug!("receive: {}", msg);
                return Ok(msg);
            }
        }
    }

    /// Send a message and wait for exactly one response
    async fn exchange(&mut self, msg: &WireMessage) -> Result<WireMessage, TransportError> {
        self.send(msg).await?;
        self.receive().await
    }
}

/// UDP transport for the firmware emulator
pub struct UdpTransport {
    socket: UdpSocket,
}

impl UdpTransport {
    /// Bind a local socket and connect it to the emulator at `addr`
    pub async fn connect(addr: SocketAddr) -> Result<Self, TransportError> {
        let local: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(addr).await?;

        debug!("UDP transport connected to {}", addr);

        Ok(Self { socket })
    }

    /// Check the emulator is listening
    pub async fn ping(&self) -> bool {
        if let Err(e) = self.socket.send(PING).await {
            trace!("emulator ping failed: {}", e);
            return false;
        }

        let mut buff = [0u8; REPORT_LEN];
        match tokio::time::timeout(PROBE_TIMEOUT, self.socket.recv(&mut buff)).await {
            Ok(Ok(n)) => &buff[..n] == PONG,
            Ok(Err(e)) => {
                trace!("emulator ping failed: {}", e);
                false
            }
            Err(_) => false,
        }
    }
}

#[async_trait]
impl Transport for UdpTransport {
    async fn write_report(&mut self, report: &[u8; REPORT_LEN]) -> Result<(), TransportError> {
        let n = self.socket.send(report).await?;
        if n < REPORT_LEN {
            return Err(TransportError::ShortReport(n));
        }
        Ok(())
    }

    async fn read_report(&mut self) -> Result<[u8; REPORT_LEN], TransportError> {
        let mut buff = [0u8; REPORT_LEN];
        let n = self.socket.recv(&mut buff).await?;
        if n < REPORT_LEN {
            return Err(TransportError::ShortReport(n));
        }
        Ok(buff)
    }
}

#[cfg(feature = "transport_hid")]
pub use hid::*;

#[cfg(feature = "transport_hid")]
mod hid {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use hidapi::{DeviceInfo, HidApi, HidDevice};
    use log::debug;

    use skywallet_proto::REPORT_LEN;

    use super::Transport;
    use crate::error::TransportError;

    /// Skywallet USB vendor ID
    pub const SKYWALLET_VID: u16 = 0x313a;
    /// Skywallet USB product ID
    pub const SKYWALLET_PID: u16 = 0x0001;

    /// USB HID transport
    pub struct HidTransport {
        device: Arc<Mutex<HidDevice>>,
    }

    impl HidTransport {
        /// List connected Skywallet devices
        pub fn list(api: &HidApi) -> impl Iterator<Item = &DeviceInfo> {
            api.device_list()
                .filter(|d| d.vendor_id() == SKYWALLET_VID && d.product_id() == SKYWALLET_PID)
        }

        /// Open the provided device
        pub fn open(api: &HidApi, info: &DeviceInfo) -> Result<Self, TransportError> {
            let device = info.open_device(api)?;

            debug!(
                "HID transport opened {:04x}:{:04x} ({})",
                info.vendor_id(),
                info.product_id(),
                info.path().to_string_lossy()
            );

            Ok(Self {
                device: Arc::new(Mutex::new(device)),
            })
        }
    }

    /// Run a blocking call against a shared handle on the blocking thread
    /// pool, usable from any runtime flavour
    async fn blocking<T, R, E, F>(shared: &Arc<Mutex<T>>, f: F) -> Result<R, TransportError>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Send + 'static,
        TransportError: From<E>,
        F: FnOnce(&mut T) -> Result<R, E> + Send + 'static,
    {
        let shared = shared.clone();

        tokio::task::spawn_blocking(move || match shared.lock() {
            Ok(mut d) => f(&mut *d).map_err(TransportError::from),
            Err(_) => Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "HID device poisoned",
            ))),
        })
        .await
        .map_err(|e| TransportError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }

    #[async_trait]
    impl Transport for HidTransport {
        async fn write_report(&mut self, report: &[u8; REPORT_LEN]) -> Result<(), TransportError> {
            // Prefix with the (unused) report ID
            let mut buff = [0u8; REPORT_LEN + 1];
            buff[1..].copy_from_slice(report);

            let n = blocking(&self.device, move |d: &mut HidDevice| d.write(&buff)).await?;
            if n < REPORT_LEN {
                return Err(TransportError::ShortReport(n));
            }
            Ok(())
        }

        async fn read_report(&mut self) -> Result<[u8; REPORT_LEN], TransportError> {
            let (n, buff) = blocking(&self.device, |d: &mut HidDevice| {
                let mut buff = [0u8; REPORT_LEN];
                d.read(&mut buff).map(|n| (n, buff))
            })
            .await?;
            if n < REPORT_LEN {
                return Err(TransportError::ShortReport(n));
            }
            Ok(buff)
        }
    }

}

/// Generic transport (abstract over transport types)
#[derive(Display)]
#[non_exhaustive]
pub enum GenericTransport {
    Udp(UdpTransport),
    #[cfg(feature = "transport_hid")]
    Hid(HidTransport),
}

/// Convert a UDP transport into a generic transport
impl From<UdpTransport> for GenericTransport {
    fn from(t: UdpTransport) -> Self {
        Self::Udp(t)
    }
}

/// Convert a HID transport into a generic transport
#[cfg(feature = "transport_hid")]
impl From<HidTransport> for GenericTransport {
    fn from(t: HidTransport) -> Self {
        Self::Hid(t)
    }
}

#[async_trait]
impl Transport for GenericTransport {
    async fn write_report(&mut self, report: &[u8; REPORT_LEN]) -> Result<(), TransportError> {
        match self {
            Self::Udp(t) => t.write_report(report).await,
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.write_report(report).await,
        }
    }

    async fn read_report(&mut self) -> Result<[u8; REPORT_LEN], TransportError> {
        match self {
            Self::Udp(t) => t.read_report().await,
            #[cfg(feature = "transport_hid")]
            Self::Hid(t) => t.read_report().await,
        }
    }
}
