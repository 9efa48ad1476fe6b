// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! An in-memory [`NsBridge`] pair with fault injection, standing in for the
//! link-layer faults (corruption, loss, replay, misrouting) that a plain
//! loopback socket in `tests/integration_tests/scenarios.rs` cannot trigger
//! on command (§9, scenarios S1-S6).

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use bytes::Bytes;

use super::NsBridge;
use crate::error::Result;

/// One-shot or sticky fault to apply to the next outgoing datagram(s).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Flip a bit in the first byte before delivery.
    Corrupt,
    /// Swallow the datagram; the peer never sees it.
    Drop,
    /// Deliver the datagram twice.
    Replay,
    /// Deliver nothing to the intended peer, as if routed elsewhere.
    Misroute,
}

struct Shared {
    queue: Mutex<VecDeque<Bytes>>,
}

/// One end of a fault-injecting in-memory link. Construct a connected pair
/// with [`LossyBridge::pair`].
pub struct LossyBridge {
    inbound: Arc<Shared>,
    outbound: Arc<Shared>,
    pending_faults: VecDeque<Fault>,
    initialized: bool,
}

impl LossyBridge {
    /// Builds two bridges wired to each other: `a`'s sends land in `b`'s
    /// receive queue and vice versa.
    pub fn pair() -> (Self, Self) {
        let a_to_b = Arc::new(Shared { queue: Mutex::new(VecDeque::new()) });
        let b_to_a = Arc::new(Shared { queue: Mutex::new(VecDeque::new()) });
        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
            pending_faults: VecDeque::new(),
            initialized: false,
        };
        let b = Self { inbound: a_to_b, outbound: b_to_a, pending_faults: VecDeque::new(), initialized: false };
        (a, b)
    }

    /// Queues a fault to apply to the next `send_spdu` call. Faults are
    /// consumed in FIFO order, one per send.
    pub fn inject(&mut self, fault: Fault) {
        self.pending_faults.push_back(fault);
    }
}

impl NsBridge for LossyBridge {
    fn initialize(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn send_spdu(&mut self, bytes: &[u8]) -> Result<()> {
        let mut payload = Bytes::copy_from_slice(bytes);

        match self.pending_faults.pop_front() {
            Some(Fault::Drop) | Some(Fault::Misroute) => return Ok(()),
            Some(Fault::Corrupt) => {
                let mut corrupted = payload.to_vec();
                if let Some(first) = corrupted.first_mut() {
                    *first ^= 0xff;
                }
                payload = Bytes::from(corrupted);
            },
            Some(Fault::Replay) => {
                self.outbound.queue.lock().unwrap().push_back(payload.clone());
            },
            None => {},
        }

        self.outbound.queue.lock().unwrap().push_back(payload);
        Ok(())
    }

    fn receive_spdu(&mut self) -> Result<Option<Bytes>> {
        Ok(self.inbound.queue.lock().unwrap().pop_front())
    }

    fn clear(&mut self) -> Result<()> {
        self.inbound.queue.lock().unwrap().clear();
        self.pending_faults.clear();
        self.initialized = false;
        Ok(())
    }
}
