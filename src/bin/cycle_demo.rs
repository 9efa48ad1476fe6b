// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Ambient demo binary: loads a configuration document describing at most
//! one provider and one consumer instance, wires them into a [`Mapper`]
//! behind one [`UdpLoopbackBridge`], and drives the safety cycle on a fixed
//! period until interrupted. Hosting more than one instance per role needs a
//! demultiplexing scheme on top of the bridge's bare datagrams, which is
//! left to a real deployment's transport layer rather than this demo.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result, bail};
use spdu_safety_mapper::{
    bridge::{NsBridge, udp::UdpLoopbackBridge},
    cfg::{Config, logger::init_logger},
    codec::{ExtensionObject, Registry, ResponseLengths},
    crc::{Crc32IsoHdlc, SharedCrc},
    uam::Mapper,
};
use tokio::time::{Instant, interval};
use tracing::{info, warn};

fn tagged_bytes(type_tag: u32, body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&type_tag.to_le_bytes());
    out.extend_from_slice(body);
    out
}

/// Demultiplexes inbound datagrams into the registry slot for `numeric_id`.
/// The demo hosts one instance per role, so there is no ambiguity about
/// which slot a decoded object belongs to.
fn pump_bridge(bridge: &mut dyn NsBridge, registry: &Registry, numeric_id: u32) -> Result<()> {
    while let Some(datagram) = bridge.receive_spdu()? {
        if datagram.len() < 4 {
            warn!("short datagram, dropping");
            continue;
        }
        let tag = u32::from_le_bytes(datagram[..4].try_into().expect("length checked above"));
        let body = &datagram[4..];
        match ExtensionObject::decode(tag, body)? {
            ExtensionObject::Request(req) => registry.set_request(numeric_id, req),
            ExtensionObject::Response(resp) => registry.set_response(numeric_id, resp)?,
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = init_logger("config/logger.yaml").context("failed to initialize logging")?;

    let cfg = Config::load_from_file("config/safety.yaml").context("failed to load configuration")?;
    if cfg.providers.len() > 1 || cfg.consumers.len() > 1 {
        bail!("cycle_demo hosts at most one provider and one consumer instance");
    }

    let registry = Arc::new(Registry::new());
    let mut mapper = Mapper::new(Arc::clone(&registry));
    mapper.initialise()?;

    let crc: SharedCrc = Arc::new(Crc32IsoHdlc::new());

    let provider_id = cfg.providers.first().map(|p| p.numeric_id);
    let consumer_id = cfg.consumers.first().map(|c| c.numeric_id);

    for p in &cfg.providers {
        let lengths = ResponseLengths { n_s: p.safety_data_length as usize, n_ns: p.non_safety_data_length as usize };
        mapper.init_safety_provider(
            p.numeric_id,
            p.to_safety_config(),
            p.identity.clone(),
            lengths,
            Arc::clone(&crc),
            Box::new(|_, _| {}),
        )?;
        let identity = mapper.identity_of(p.numeric_id)?;
        info!(numeric_id = p.numeric_id, safety_base_id = %identity.safety_base_id, safety_provider_id = identity.safety_provider_id, "provider identity cached");
    }
    for c in &cfg.consumers {
        let lengths = ResponseLengths { n_s: c.safety_data_length as usize, n_ns: c.non_safety_data_length as usize };
        mapper.init_safety_consumer(
            c.numeric_id,
            c.to_safety_config(),
            c.identity.clone(),
            c.redundancy,
            lengths,
            Arc::clone(&crc),
            Box::new(|_, _| {}),
        )?;
        let identity = mapper.identity_of(c.numeric_id)?;
        info!(numeric_id = c.numeric_id, safety_base_id = %identity.safety_base_id, safety_provider_id = identity.safety_provider_id, "consumer identity cached");
    }

    mapper.start_safety()?;

    let bind_addr = cfg.runtime.bridge_bind_addr.parse().context("invalid BridgeBindAddr")?;
    let peer_addr = cfg.runtime.bridge_peer_addr.parse().context("invalid BridgePeerAddr")?;
    let mut bridge = UdpLoopbackBridge::new(bind_addr, peer_addr);
    bridge.initialize()?;

    info!(cycle_period_ms = cfg.runtime.cycle_period_ms, "starting safety cycle");

    let start = Instant::now();
    let mut ticker = interval(Duration::from_millis(cfg.runtime.cycle_period_ms as u64));
    loop {
        ticker.tick().await;

        if let Some(id) = consumer_id {
            pump_bridge(&mut bridge, &registry, id)?;
            mapper.mark_consumer_comm_done(
                mapper
                    .handle_of_consumer(id)
                    .expect("consumer registered above"),
            );
        }
        if let Some(id) = provider_id {
            pump_bridge(&mut bridge, &registry, id)?;
            mapper.mark_provider_comm_done(
                mapper
                    .handle_of_provider(id)
                    .expect("provider registered above"),
            );
        }

        let now_ms = start.elapsed().as_millis() as u64;
        let report = mapper.cycle(now_ms)?;

        for p in &report.providers {
            if p.published
                && let Ok(response) = registry.get_response(p.numeric_id)
            {
                bridge.send_spdu(&tagged_bytes(ExtensionObject::Response(response.clone()).type_tag(), &response.encode()))?;
            }
        }
        for c in &report.consumers {
            if let Ok(request) = registry.get_request(c.numeric_id) {
                bridge.send_spdu(&tagged_bytes(ExtensionObject::Request(request.clone()).type_tag(), &request.to_bytes()))?;
            }
        }
    }
}
