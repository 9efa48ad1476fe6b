// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::net::{SocketAddr, UdpSocket as StdUdpSocket};

use bytes::{Bytes, BytesMut};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::error::{Error, Result};

const MAX_DATAGRAM: usize = 1500;

/// A loopback (or LAN) UDP transport for one provider/consumer peer: one
/// socket per instance, writes are fire-and-forget, reads never block the
/// caller. One datagram carries exactly one SPDU, so no length-prefix
/// framing is needed on top of the codec's own length fields.
pub struct UdpLoopbackBridge {
    bind_addr: SocketAddr,
    peer_addr: SocketAddr,
    socket: Option<UdpSocket>,
}

impl UdpLoopbackBridge {
    pub fn new(bind_addr: SocketAddr, peer_addr: SocketAddr) -> Self {
        Self { bind_addr, peer_addr, socket: None }
    }

    fn socket(&self) -> Result<&UdpSocket> {
        self.socket.as_ref().ok_or_else(|| Error::InvalidState("bridge not initialized".into()))
    }
}

impl super::NsBridge for UdpLoopbackBridge {
    fn initialize(&mut self) -> Result<()> {
        let std_socket = StdUdpSocket::bind(self.bind_addr)
            .map_err(|e| Error::InvalidParameter(format!("bind {}: {e}", self.bind_addr)))?;
        std_socket
            .set_nonblocking(true)
            .map_err(|e| Error::InvalidParameter(format!("set_nonblocking: {e}")))?;
        let socket = UdpSocket::from_std(std_socket)
            .map_err(|e| Error::InvalidParameter(format!("from_std: {e}")))?;
        self.socket = Some(socket);
        debug!(bind = %self.bind_addr, peer = %self.peer_addr, "bridge initialized");
        Ok(())
    }

    fn send_spdu(&mut self, bytes: &[u8]) -> Result<()> {
        let peer = self.peer_addr;
        match self.socket()?.try_send_to(bytes, peer) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                warn!("send buffer full, dropping datagram");
                Ok(())
            },
            Err(e) => Err(Error::InvalidParameter(format!("send_spdu: {e}"))),
        }
    }

    fn receive_spdu(&mut self) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::zeroed(MAX_DATAGRAM);
        match self.socket()?.try_recv_from(&mut buf) {
            Ok((n, from)) => {
                if from != self.peer_addr {
                    warn!(from = %from, expected = %self.peer_addr, "discarding datagram from unexpected peer");
                    return Ok(None);
                }
                buf.truncate(n);
                Ok(Some(buf.freeze()))
            },
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::InvalidParameter(format!("receive_spdu: {e}"))),
        }
    }

    fn clear(&mut self) -> Result<()> {
        self.socket = None;
        Ok(())
    }
}
