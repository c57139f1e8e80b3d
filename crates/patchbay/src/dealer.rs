// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound facade: named dealer endpoints with lazy, connect-once sends.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::config::{is_valid_tcp_address, EndpointConfig};
use crate::context::Context;
use crate::endpoint::{Endpoint, Inproc, Ipc, Role, Tcp, Transport, TransportKind};
use crate::{Error, Result};

/// A dealer-role endpoint plus its connect-once guard.
///
/// The guard is set only after a successful connect; a failed connect is
/// retried by the next send to the same name.
struct Outbound<K: Transport> {
    endpoint: Endpoint<K>,
    connected: bool,
}

/// Outbound fire-and-forget facade.
///
/// Owns named dealer-role endpoints across the three transport kinds.
/// [`Dealer::send`] resolves a name by fixed kind priority, connects the
/// matching endpoint on first use, and writes one dealer-shaped message.
/// Nothing is ever received through this facade; replies addressed back to
/// a dealer identity are read through the endpoint primitive.
pub struct Dealer {
    tcp: Mutex<HashMap<String, Outbound<Tcp>>>,
    ipc: Mutex<HashMap<String, Outbound<Ipc>>>,
    inproc: Mutex<HashMap<String, Outbound<Inproc>>>,
    // Declared after the registries so every socket closes before the
    // context tears down.
    ctx: Context,
}

impl Dealer {
    /// Start building a dealer.
    pub fn builder() -> DealerBuilder {
        DealerBuilder::new()
    }

    /// Send `message` to the endpoint registered as `name`.
    ///
    /// Resolution is by fixed priority: networked first, then local, then
    /// in-process. The first kind that knows the name consumes the send,
    /// successful or not. Transport failures are logged and swallowed; an
    /// unknown name is a silent no-op.
    pub fn send(&self, name: &str, message: &[u8]) {
        if Self::send_on(&self.tcp, name, message) {
            return;
        }
        if Self::send_on(&self.ipc, name, message) {
            return;
        }
        if Self::send_on(&self.inproc, name, message) {
            return;
        }
        log::debug!(
            "[dealer] no endpoint named '{}', dropping {} byte(s)",
            name,
            message.len()
        );
    }

    /// Try one kind's registry. Returns true when the name was found there,
    /// even if the transport failed, so the caller stops falling through.
    fn send_on<K: Transport>(
        registry: &Mutex<HashMap<String, Outbound<K>>>,
        name: &str,
        message: &[u8],
    ) -> bool {
        let qualified = K::qualified(name);
        let mut registry = registry.lock();
        let Some(outbound) = registry.get_mut(&qualified) else {
            return false;
        };

        if !outbound.connected {
            match outbound.endpoint.connect() {
                Ok(()) => outbound.connected = true,
                Err(err) => {
                    log::warn!(
                        "[dealer] connect failed for '{}' at '{}': {}",
                        qualified,
                        outbound.endpoint.address(),
                        err
                    );
                    return true;
                }
            }
        }

        // The payload is addressed by the socket identity pinned at
        // connect; the peer argument mirrors the endpoint's own address.
        let peer = outbound.endpoint.address().as_bytes().to_vec();
        if let Err(err) = outbound.endpoint.send(&peer, message) {
            log::warn!("[dealer] send failed for '{}': {}", qualified, err);
        }
        true
    }
}

impl std::fmt::Debug for Dealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dealer")
            .field("tcp", &self.tcp.lock().len())
            .field("ipc", &self.ipc.lock().len())
            .field("inproc", &self.inproc.lock().len())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Consuming builder for [`Dealer`].
#[derive(Debug, Default)]
pub struct DealerBuilder {
    tcp: Vec<EndpointConfig>,
    ipc: Vec<EndpointConfig>,
    inproc: Vec<EndpointConfig>,
    io_threads: Option<i32>,
}

impl DealerBuilder {
    fn new() -> Self {
        Self::default()
    }

    /// Add a networked endpoint (`IPV4:PORT` address, validated at build).
    pub fn tcp(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.tcp.push(EndpointConfig::new(name, address));
        self
    }

    /// Add a local (socket-file) endpoint.
    pub fn ipc(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.ipc.push(EndpointConfig::new(name, address));
        self
    }

    /// Add an in-process endpoint.
    pub fn inproc(mut self, name: impl Into<String>, address: impl Into<String>) -> Self {
        self.inproc.push(EndpointConfig::new(name, address));
        self
    }

    /// Tune the context's background I/O thread count.
    pub fn io_threads(mut self, count: i32) -> Self {
        self.io_threads = Some(count);
        self
    }

    /// Validate descriptors and construct the facade.
    ///
    /// Incomplete descriptors (empty name or address) are skipped with a
    /// debug log; an invalid networked address aborts construction.
    pub fn build(self) -> Result<Dealer> {
        let ctx = match self.io_threads {
            Some(count) => Context::with_io_threads(count)?,
            None => Context::new(),
        };
        let dealer = Dealer {
            tcp: Mutex::new(HashMap::new()),
            ipc: Mutex::new(HashMap::new()),
            inproc: Mutex::new(HashMap::new()),
            ctx,
        };
        Self::populate(&dealer.ctx, &dealer.tcp, &self.tcp)?;
        Self::populate(&dealer.ctx, &dealer.ipc, &self.ipc)?;
        Self::populate(&dealer.ctx, &dealer.inproc, &self.inproc)?;
        Ok(dealer)
    }

    fn populate<K: Transport>(
        ctx: &Context,
        registry: &Mutex<HashMap<String, Outbound<K>>>,
        configs: &[EndpointConfig],
    ) -> Result<()> {
        let mut registry = registry.lock();
        for config in configs {
            if !config.is_complete() {
                log::debug!(
                    "[dealer] skipping incomplete {} descriptor (name='{}')",
                    K::KIND,
                    config.name
                );
                continue;
            }
            if K::KIND == TransportKind::Tcp && !is_valid_tcp_address(&config.address) {
                return Err(Error::InvalidAddress(config.address.clone()));
            }
            let endpoint = Endpoint::<K>::new(ctx, &config.name, &config.address, Role::Dealer)?;
            registry.insert(K::qualified(&config.name), Outbound { endpoint, connected: false });
        }
        Ok(())
    }
}
