// Copyright (c) 2022-2023 The FiberCrypto Developers

//! Command exclusion across concurrent callers

use std::{sync::Arc, time::Duration};

use futures::future::join_all;

use skywallet::{
    proto::{FailureType, MessageKind, WalletType},
    Error, Sequencer,
};

mod helpers;
use helpers::*;

const TASKS: usize = 8;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_commands_do_not_interleave() {
    setup();

    // Each command sees two confirmations before completing
    let mut script = vec![];
    for _ in 0..TASKS {
        script.push(button_request());
        script.push(button_request());
        script.push(addresses(&["2EU3JbveHdkxW6z5tdhbbB2kRAWvXC2pLzw"]));
    }

    let (d, r) = FakeDevice::new(script);
    let s = Arc::new(Sequencer::new(d.with_delay(Duration::from_millis(2))));

    let tasks = (0..TASKS).map(|i| {
        let s = s.clone();
        tokio::spawn(async move {
            s.address_gen(1, i as u32, false, WalletType::Deterministic)
                .await
        })
    });

    for res in join_all(tasks).await {
        let resp = res.unwrap().unwrap();
        assert!(resp.is(MessageKind::ResponseSkycoinAddress));
    }

    let record = r.lock().unwrap();
    assert_eq!(record.interleaved, 0);
    assert_eq!(record.calls.len(), TASKS * 3);

    for c in record.calls.chunks(3) {
        assert!(matches!(c[0], Call::AddressGen { .. }), "{c:?}");
        assert_eq!(&c[1..], &[Call::ButtonAck, Call::ButtonAck]);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pass_through_waits_for_command() {
    setup();

    let (d, r) = FakeDevice::new(vec![
        button_request(),
        button_request(),
        features(),
        success("Address used to sign is: 2EU3JbveHdkxW6z5tdhbbB2kRAWvXC2pLzw"),
    ]);
    let s = Arc::new(Sequencer::new(d.with_delay(Duration::from_millis(20))));

    let s1 = s.clone();
    let features = tokio::spawn(async move { s1.get_features().await });

    // Issue once the first command holds the device
    while calls(&r).is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    let resp = s.check_message_signature("hello", "sig", "addr").await.unwrap();
    assert!(resp.is(MessageKind::Success));

    features.await.unwrap().unwrap();

    let record = r.lock().unwrap();
    assert_eq!(record.interleaved, 0);
    assert_eq!(
        record.calls,
        vec![
            Call::GetFeatures,
            Call::ButtonAck,
            Call::ButtonAck,
            Call::CheckMessageSignature,
        ]
    );
}

#[tokio::test]
async fn exclusion_released_after_errors() {
    setup();

    let (d, r) = FakeDevice::new(vec![
        // Transport error
        Reply::TransportError,
        // Protocol error
        button_request(),
        word_request(),
        // Device failure
        failure(FailureType::PinInvalid, "Invalid PIN"),
        // Success
        features(),
    ]);
    let s = Sequencer::new(d);

    let e = run(&s, Command::GetFeatures).await.unwrap_err();
    assert!(matches!(e, Error::Transport(_)), "{e:?}");

    let e = run(&s, Command::GetFeatures).await.unwrap_err();
    assert!(matches!(e, Error::Protocol(_)), "{e:?}");

    let e = run(&s, Command::GetFeatures).await.unwrap_err();
    assert!(e.is_device_failure(), "{e:?}");

    let next = tokio::time::timeout(Duration::from_secs(1), s.get_features()).await;
    assert!(next.expect("sequencer deadlocked").is_ok());

    assert_eq!(calls(&r).len(), 5);
}

#[tokio::test]
async fn exclusion_released_on_cancellation() {
    setup();

    let (d, r) = FakeDevice::new(vec![button_request(), Reply::Hang, features()]);
    let s = Sequencer::new(d);

    // Caller-side timeout drops the command mid-interaction
    let timed_out = tokio::time::timeout(Duration::from_millis(50), s.get_features()).await;
    assert!(timed_out.is_err());

    let next = tokio::time::timeout(Duration::from_secs(1), s.get_features()).await;
    assert!(next.expect("sequencer deadlocked").is_ok());

    assert_eq!(
        calls(&r),
        vec![Call::GetFeatures, Call::ButtonAck, Call::GetFeatures]
    );
}
