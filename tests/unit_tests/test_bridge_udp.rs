// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::UdpSocket as StdUdpSocket;

use spdu_safety_mapper::bridge::{NsBridge, udp::UdpLoopbackBridge};

fn ephemeral_addr() -> std::net::SocketAddr {
    let socket = StdUdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

#[tokio::test]
async fn send_spdu_is_visible_to_the_configured_peer() {
    let a_addr = ephemeral_addr();
    let b_addr = ephemeral_addr();

    let mut a = UdpLoopbackBridge::new(a_addr, b_addr);
    let mut b = UdpLoopbackBridge::new(b_addr, a_addr);
    a.initialize().unwrap();
    b.initialize().unwrap();

    a.send_spdu(b"spdu-payload").unwrap();

    let mut got = None;
    for _ in 0..100 {
        if let Some(bytes) = b.receive_spdu().unwrap() {
            got = Some(bytes);
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    assert_eq!(got.unwrap().as_ref(), b"spdu-payload");
}

#[tokio::test]
async fn clear_then_initialize_reopens_the_socket() {
    let a_addr = ephemeral_addr();
    let b_addr = ephemeral_addr();

    let mut bridge = UdpLoopbackBridge::new(a_addr, b_addr);
    bridge.initialize().unwrap();
    bridge.clear().unwrap();
    assert!(bridge.send_spdu(b"x").is_err());
    bridge.initialize().unwrap();
    assert!(bridge.send_spdu(b"x").is_ok());
}
