// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! The UAM mapper (§4.4): registry of provider/consumer instances and the
//! per-cycle executor.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    cache::{Cache, DataValue, NodeId, Scalar},
    cfg::{Redundancy, SafetyIdentity},
    codec::{Registry, ResponseLengths},
    crc::SharedCrc,
    error::{Error, Result},
    safety::{
        Consumer, ConsumerConfig, ConsumerInputSapi, ConsumerOutcome, ConsumerOutputSapi,
        Provider, ProviderConfig, ProviderInputSapi, ProviderOutputSapi,
    },
};

/// Identity cache keys live in a namespace of their own, separate from
/// anything a real node-id address space would assign (§4.1).
const IDENTITY_NAMESPACE: u16 = 0;

fn base_id_node(numeric_id: u32) -> NodeId {
    NodeId::string(IDENTITY_NAMESPACE, format!("{numeric_id}/safetyBaseId"))
}

fn provider_id_node(numeric_id: u32) -> NodeId {
    NodeId::string(IDENTITY_NAMESPACE, format!("{numeric_id}/safetyProviderId"))
}

/// Compile-time bound on the number of provider/consumer instances a
/// process may register, mirroring the source stack's fixed-size safety
/// arrays (§4.4 State: "bounds are compile-time constants").
pub const MAX_INSTANCES: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProviderHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerHandle(pub u32);

pub type ProviderAppCycle = Box<dyn FnMut(&mut ProviderInputSapi, &ProviderOutputSapi) + Send>;
pub type ConsumerAppCycle = Box<dyn FnMut(&mut ConsumerInputSapi, &ConsumerOutputSapi) + Send>;

struct ProviderSlot {
    handle: ProviderHandle,
    provider: Provider,
    input: ProviderInputSapi,
    output: ProviderOutputSapi,
    comm_done: bool,
    app_cycle: ProviderAppCycle,
}

struct ConsumerSlot {
    handle: ConsumerHandle,
    consumer: Consumer,
    input: ConsumerInputSapi,
    output: ConsumerOutputSapi,
    comm_done: bool,
    app_cycle: ConsumerAppCycle,
}

/// Per-cycle outcome for one instance, collected into a [`CycleReport`] so
/// one consumer's fault does not stop the others from running (§7).
#[derive(Debug)]
pub struct ProviderCycleResult {
    pub handle: ProviderHandle,
    pub numeric_id: u32,
    pub published: bool,
}

#[derive(Debug)]
pub struct ConsumerCycleResult {
    pub handle: ConsumerHandle,
    pub numeric_id: u32,
    pub outcome: ConsumerOutcome,
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub providers: Vec<ProviderCycleResult>,
    pub consumers: Vec<ConsumerCycleResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Uninitialised,
    Setup,
    Running,
}

/// Process-wide registry of provider/consumer instances and the per-cycle
/// executor (§4.4). `cycle`/`clear` take `&mut self`, so the borrow checker
/// forbids calling them concurrently from safe code (§5).
pub struct Mapper {
    phase: Phase,
    registry: Arc<Registry>,
    cache: Arc<Cache>,
    providers: Vec<ProviderSlot>,
    consumers: Vec<ConsumerSlot>,
    next_provider_handle: u32,
    next_consumer_handle: u32,
}

impl Mapper {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            phase: Phase::Uninitialised,
            registry,
            cache: Arc::new(Cache::new()),
            providers: Vec::new(),
            consumers: Vec::new(),
            next_provider_handle: 1,
            next_consumer_handle: 1,
        }
    }

    /// The process-wide cache backing `SafetyBaseId`/`SafetyProviderId`
    /// identity lookups (§4.1, C1). Exposed so a host process can read the
    /// same entries `init_safety_provider`/`init_safety_consumer` seed, or
    /// store further out-of-band fields alongside them.
    pub fn cache(&self) -> &Arc<Cache> {
        &self.cache
    }

    /// `initialise()` — idempotent-forbidden (§4.4).
    pub fn initialise(&mut self) -> Result<()> {
        if self.phase != Phase::Uninitialised {
            return Err(Error::InvalidState("mapper is already initialised".into()));
        }
        self.providers.clear();
        self.consumers.clear();
        self.phase = Phase::Setup;
        Ok(())
    }

    fn require_setup_phase(&self) -> Result<()> {
        if self.phase != Phase::Setup {
            return Err(Error::InvalidState(
                "instances can only be registered between initialise() and start_safety()".into(),
            ));
        }
        Ok(())
    }

    pub fn init_safety_provider(
        &mut self,
        numeric_id: u32,
        config: ProviderConfig,
        identity: SafetyIdentity,
        response_lengths: ResponseLengths,
        crc: SharedCrc,
        app_cycle: ProviderAppCycle,
    ) -> Result<ProviderHandle> {
        self.require_setup_phase()?;
        if self.providers.len() >= MAX_INSTANCES {
            return Err(Error::OutOfMemory);
        }
        self.registry.register_response_lengths(numeric_id, response_lengths);
        self.cache.set(base_id_node(numeric_id), DataValue::String(identity.safety_base_id.to_string()))?;
        self.cache.set(provider_id_node(numeric_id), DataValue::Scalar(Scalar::U32(identity.safety_provider_id)))?;
        let handle = ProviderHandle(self.next_provider_handle);
        self.next_provider_handle += 1;
        self.providers.push(ProviderSlot {
            handle,
            provider: Provider::new(numeric_id, config, crc),
            input: ProviderInputSapi::default(),
            output: ProviderOutputSapi::default(),
            comm_done: false,
            app_cycle,
        });
        Ok(handle)
    }

    /// Registers a consumer instance. Rejects `Redundancy::Dual`: two-state-
    /// machine agreement logic is an application-layer concern this mapper
    /// does not implement.
    pub fn init_safety_consumer(
        &mut self,
        numeric_id: u32,
        config: ConsumerConfig,
        identity: SafetyIdentity,
        redundancy: Redundancy,
        response_lengths: ResponseLengths,
        crc: SharedCrc,
        app_cycle: ConsumerAppCycle,
    ) -> Result<ConsumerHandle> {
        self.require_setup_phase()?;
        if redundancy == Redundancy::Dual {
            return Err(Error::InvalidParameter(
                "dual-channel redundancy is not implemented by this mapper".into(),
            ));
        }
        if self.consumers.len() >= MAX_INSTANCES {
            return Err(Error::OutOfMemory);
        }
        self.registry.register_response_lengths(numeric_id, response_lengths);
        self.cache.set(base_id_node(numeric_id), DataValue::String(identity.safety_base_id.to_string()))?;
        self.cache.set(provider_id_node(numeric_id), DataValue::Scalar(Scalar::U32(identity.safety_provider_id)))?;
        let handle = ConsumerHandle(self.next_consumer_handle);
        self.next_consumer_handle += 1;
        let output = ConsumerOutputSapi::fail_safe(config.safety_data_length, config.non_safety_data_length);
        self.consumers.push(ConsumerSlot {
            handle,
            consumer: Consumer::new(numeric_id, config, crc),
            input: ConsumerInputSapi::default(),
            output,
            comm_done: false,
            app_cycle,
        });
        Ok(handle)
    }

    /// Marks that a fresh peer SPDU has been retrieved into the registry
    /// for the given instance this cycle; the next `cycle()` call consumes
    /// and clears the flag.
    pub fn mark_provider_comm_done(&mut self, handle: ProviderHandle) {
        if let Some(slot) = self.providers.iter_mut().find(|s| s.handle == handle) {
            slot.comm_done = true;
        }
    }

    pub fn mark_consumer_comm_done(&mut self, handle: ConsumerHandle) {
        if let Some(slot) = self.consumers.iter_mut().find(|s| s.handle == handle) {
            slot.comm_done = true;
        }
    }

    /// Looks up the handle a given `numeric_id` was registered under, for
    /// callers that only know the configuration-level id (e.g. a demo
    /// binary demultiplexing bridge traffic by numeric id).
    pub fn handle_of_provider(&self, numeric_id: u32) -> Option<ProviderHandle> {
        self.providers.iter().find(|s| s.provider.numeric_id == numeric_id).map(|s| s.handle)
    }

    pub fn handle_of_consumer(&self, numeric_id: u32) -> Option<ConsumerHandle> {
        self.consumers.iter().find(|s| s.consumer.numeric_id == numeric_id).map(|s| s.handle)
    }

    /// Reads back the `SafetyBaseId`/`SafetyProviderId` pair an instance was
    /// registered with, regardless of whether `numeric_id` names a provider
    /// or a consumer slot (§4.1: the identity cache is addressed by numeric
    /// id alone, not by role).
    pub fn identity_of(&self, numeric_id: u32) -> Result<SafetyIdentity> {
        let corrupt = || Error::InvalidState("identity cache entry has an unexpected shape".into());
        let safety_base_id = match self.cache.get(&base_id_node(numeric_id))? {
            DataValue::String(s) => Uuid::parse_str(&s).map_err(|_| corrupt())?,
            _ => return Err(corrupt()),
        };
        let safety_provider_id = match self.cache.get(&provider_id_node(numeric_id))? {
            DataValue::Scalar(Scalar::U32(n)) => n,
            _ => return Err(corrupt()),
        };
        Ok(SafetyIdentity { safety_base_id, safety_provider_id })
    }

    /// `start_safety()` — setup → running, locks the registry (§4.4).
    pub fn start_safety(&mut self) -> Result<()> {
        if self.phase != Phase::Setup {
            return Err(Error::InvalidState("start_safety requires the setup phase".into()));
        }
        for slot in &mut self.providers {
            slot.provider.start();
        }
        self.phase = Phase::Running;
        info!(
            providers = self.providers.len(),
            consumers = self.consumers.len(),
            "safety core started"
        );
        Ok(())
    }

    /// One cycle (§4.4, Invariant 4): all providers run to completion
    /// before any consumer runs.
    pub fn cycle(&mut self, now_ms: u64) -> Result<CycleReport> {
        if self.phase != Phase::Running {
            return Err(Error::InvalidState("cycle called before start_safety".into()));
        }

        let mut report = CycleReport::default();

        for slot in &mut self.providers {
            (slot.app_cycle)(&mut slot.input, &slot.output);
            let published = slot.provider.cycle(&self.registry, &slot.input, &mut slot.output, slot.comm_done)?;
            slot.comm_done = false;
            debug!(numeric_id = slot.provider.numeric_id, published, "provider cycle complete");
            report.providers.push(ProviderCycleResult {
                handle: slot.handle,
                numeric_id: slot.provider.numeric_id,
                published,
            });
        }

        for slot in &mut self.consumers {
            (slot.app_cycle)(&mut slot.input, &slot.output);
            let outcome =
                slot.consumer.cycle(&self.registry, &slot.input, &mut slot.output, slot.comm_done, now_ms)?;
            slot.comm_done = false;
            report.consumers.push(ConsumerCycleResult {
                handle: slot.handle,
                numeric_id: slot.consumer.numeric_id,
                outcome,
            });
        }

        Ok(report)
    }

    /// `clear()` — stops everything and releases every instance's buffers
    /// (§4.4).
    pub fn clear(&mut self) -> Result<()> {
        self.providers.clear();
        self.consumers.clear();
        self.registry.clear();
        self.phase = Phase::Uninitialised;
        Ok(())
    }
}
