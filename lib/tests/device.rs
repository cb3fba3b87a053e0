// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Device handle against a fake UDP emulator

use std::net::{Ipv4Addr, SocketAddr};

use tokio::{net::UdpSocket, task::JoinHandle};

use skywallet::{
    driver::EmulatorDriver,
    proto::{
        decode_success, encode_frames,
        messages::{SimulateButton, SimulateButtonType},
        skycoin::ResponseSkycoinAddress,
        wire::MAX_PAYLOAD_LEN,
        FrameDecoder, MessageKind, WalletType, WireMessage, REPORT_LEN,
    },
    DeviceHandle, DeviceType, Error, Sequencer,
};

#[cfg(feature = "transport_hid")]
use skywallet::GenericHandle;

mod helpers;
use helpers::*;

/// Expected request kind and the response to send (if any)
type Step = (MessageKind, Option<WireMessage>);

/// Fake emulator, checks each request against the script and returns
/// every message received once the script completes
async fn emulator(script: Vec<Step>) -> (SocketAddr, JoinHandle<Vec<WireMessage>>) {
    let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
    let addr = socket.local_addr().unwrap();

    let h = tokio::spawn(async move {
        let mut decoder = FrameDecoder::new();
        let mut buff = [0u8; REPORT_LEN];
        let mut received = vec![];

        for (kind, reply) in script {
            let (req, peer) = loop {
                let (_n, peer) = socket.recv_from(&mut buff).await.unwrap();
                if let Some(m) = decoder.push(&buff).unwrap() {
                    break (m, peer);
                }
            };

            assert!(req.is(kind), "expected {kind}, received {req}");
            received.push(req);

            if let Some(r) = reply {
                for f in encode_frames(&r) {
                    socket.send_to(&f, peer).await.unwrap();
                }
            }
        }

        received
    });

    (addr, h)
}

fn msg(kind: MessageKind) -> Option<WireMessage> {
    Some(WireMessage::empty(kind))
}

#[tokio::test]
async fn backup_initializes_first() {
    setup();

    let done = WireMessage::encode(
        MessageKind::Success,
        &skywallet::proto::status::Success {
            message: Some("Device backed up!".to_string()),
        },
    );

    let (addr, h) = emulator(vec![
        (MessageKind::Initialize, msg(MessageKind::Features)),
        (MessageKind::BackupDevice, Some(done)),
    ])
    .await;

    let s = Sequencer::new(DeviceHandle::from(EmulatorDriver { addr }));

    let resp = s.backup().await.unwrap();
    assert_eq!(decode_success(&resp).unwrap(), "Device backed up!");

    let received = h.await.unwrap();
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn auto_press_follows_button_ack() {
    setup();

    let response = WireMessage::encode(
        MessageKind::ResponseSkycoinAddress,
        &ResponseSkycoinAddress {
            addresses: vec!["2EU3JbveHdkxW6z5tdhbbB2kRAWvXC2pLzw".to_string()],
        },
    );

    let (addr, h) = emulator(vec![
        (MessageKind::SkycoinAddress, msg(MessageKind::ButtonRequest)),
        (MessageKind::ButtonAck, None),
        (MessageKind::SimulateButton, Some(response)),
    ])
    .await;

    let s = Sequencer::new(DeviceHandle::from(EmulatorDriver { addr }));
    s.set_auto_press_button(true, SimulateButtonType::Right)
        .await
        .unwrap();

    let resp = s
        .address_gen(1, 0, true, WalletType::Deterministic)
        .await
        .unwrap();
    assert!(resp.is(MessageKind::ResponseSkycoinAddress));

    let received = h.await.unwrap();
    let press: SimulateButton = received[2].decode(MessageKind::SimulateButton).unwrap();
    assert_eq!(press.button(), SimulateButtonType::Right);
}

#[tokio::test]
async fn firmware_upload_requires_usb() {
    setup();

    let s = Sequencer::new(DeviceHandle::from(EmulatorDriver::default()));

    let e = s.firmware_upload(&[0u8; 64], [0u8; 32]).await.unwrap_err();
    assert!(
        matches!(e, Error::WrongDeviceType(DeviceType::Emulator)),
        "{e:?}"
    );
}

#[tokio::test]
async fn firmware_upload_rejects_oversized_image() {
    setup();

    let (addr, h) = emulator(vec![(MessageKind::Initialize, msg(MessageKind::Features))]).await;
    let s = Sequencer::new(DeviceHandle::from(EmulatorDriver { addr }));

    let image = vec![0xffu8; MAX_PAYLOAD_LEN];
    let e = s.firmware_upload(&image, [0u8; 32]).await.unwrap_err();
    assert!(
        matches!(e, Error::FirmwareTooLarge(n) if n == MAX_PAYLOAD_LEN),
        "{e:?}"
    );

    // Rejected before anything reached the device
    let received = tokio::time::timeout(std::time::Duration::from_millis(100), h).await;
    assert!(received.is_err());
}

#[cfg(feature = "transport_hid")]
#[tokio::test]
async fn auto_press_requires_emulator() {
    setup();

    let h = GenericHandle::open(DeviceType::Usb, skywallet::transport::EMULATOR_ADDR).unwrap();
    assert_eq!(h.device_type(), DeviceType::Usb);

    let s = Sequencer::new(h);

    let e = s
        .set_auto_press_button(true, SimulateButtonType::Both)
        .await
        .unwrap_err();
    assert!(matches!(e, Error::WrongDeviceType(DeviceType::Usb)), "{e:?}");
}

#[tokio::test]
async fn emulator_available() {
    setup();

    let (addr, h) = emulator(vec![]).await;
    h.await.unwrap();

    let s = Sequencer::new(DeviceHandle::from(EmulatorDriver { addr }));

    // Nothing is listening once the emulator exits
    assert!(!s.available().await);
    assert!(!s.connected().await);
}
