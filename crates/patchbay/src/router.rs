// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound facade: named router endpoints, handler multimaps, and the
//! per-kind polling engine.
//!
//! [`Router::listen`] drives one poll unit per transport kind. A unit with
//! an empty registry returns immediately; otherwise it claims its kind
//! (once per facade lifetime), binds every endpoint, then polls with a
//! bounded timeout and dispatches each complete message to the handlers
//! registered under the firing endpoint's qualified name. A bad peer or a
//! panicking handler never stops a unit; failures are counted in
//! [`RouterMetrics`] and logged.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::{is_valid_tcp_address, EndpointConfig};
use crate::context::Context;
use crate::endpoint::{Endpoint, Frame, Inproc, Ipc, Role, Tcp, Transport, TransportKind};
use crate::status::{ListenState, RouterStatus};
use crate::{Error, Result};

/// Default bounded wait per poll iteration. Also the worst-case latency for
/// a unit to observe [`RouterHandle::stop`].
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Handler invoked for every message received on a subscribed endpoint.
///
/// Frames arrive router-shaped as `[peer, payload..]`; the borrowed
/// endpoint lets a handler address a reply with [`Endpoint::send`].
pub type Handler<K> = Box<dyn FnMut(&Endpoint<K>, &[Frame]) + Send + 'static>;

// ============================================================================
// Metrics
// ============================================================================

/// Counters for the engine's steady-state behavior.
///
/// Poll, receive, and handler failures are swallowed so one bad peer can
/// never stop the loops; these counters keep the swallowed failures
/// observable.
#[derive(Debug, Default)]
pub struct RouterMetrics {
    /// Complete messages drained from endpoints.
    pub messages_received: AtomicU64,
    /// Handler invocations (one message may invoke several handlers).
    pub callbacks_invoked: AtomicU64,
    /// Endpoints that failed to bind during a unit's bind phase.
    pub bind_failures: AtomicU64,
    /// Poll calls that returned an error.
    pub poll_errors: AtomicU64,
    /// Receives that failed or produced a malformed frame shape.
    pub receive_errors: AtomicU64,
    /// Handler invocations that panicked.
    pub callback_panics: AtomicU64,
}

impl RouterMetrics {
    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> RouterMetricsSnapshot {
        RouterMetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            callbacks_invoked: self.callbacks_invoked.load(Ordering::Relaxed),
            bind_failures: self.bind_failures.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            callback_panics: self.callback_panics.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of [`RouterMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterMetricsSnapshot {
    pub messages_received: u64,
    pub callbacks_invoked: u64,
    pub bind_failures: u64,
    pub poll_errors: u64,
    pub receive_errors: u64,
    pub callback_panics: u64,
}

// ============================================================================
// Per-kind state
// ============================================================================

/// Registry and handler multimap for one transport kind, keyed by
/// qualified name.
struct KindState<K: Transport> {
    endpoints: Mutex<HashMap<String, Endpoint<K>>>,
    handlers: Mutex<HashMap<String, Vec<Handler<K>>>>,
}

impl<K: Transport> KindState<K> {
    fn new() -> Self {
        KindState {
            endpoints: Mutex::new(HashMap::new()),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Append `handler` under `name` if the registry knows the qualified
    /// name; unknown names are dropped.
    fn register(&self, name: &str, handler: Handler<K>) {
        let qualified = K::qualified(name);
        if !self.endpoints.lock().contains_key(&qualified) {
            log::debug!(
                "[router] dropping handler for unknown {} endpoint '{}'",
                K::KIND,
                name
            );
            return;
        }
        self.handlers.lock().entry(qualified).or_default().push(handler);
    }
}

struct RouterInner {
    tcp: KindState<Tcp>,
    ipc: KindState<Ipc>,
    inproc: KindState<Inproc>,
    state: ListenState,
    stop: AtomicBool,
    poll_interval: Duration,
    metrics: RouterMetrics,
    // Declared after the registries so every socket closes before the
    // context tears down.
    ctx: Context,
}

// ============================================================================
// Poll engine
// ============================================================================

fn poll_unit<K: Transport>(inner: &RouterInner, kind: &KindState<K>) {
    // Take the registry for the unit's tenure; it is restored on exit.
    // Registration against this kind while the unit runs degrades to the
    // unknown-name no-op.
    let endpoints = std::mem::take(&mut *kind.endpoints.lock());
    if endpoints.is_empty() {
        return;
    }
    if !inner.state.try_claim(K::KIND) {
        log::debug!("[router] {} unit already active, backing off", K::KIND);
        *kind.endpoints.lock() = endpoints;
        return;
    }

    // Bind phase. A failed endpoint is left unready but stays registered;
    // its siblings keep serving.
    for (qualified, endpoint) in &endpoints {
        if let Err(err) = endpoint.bind() {
            inner.metrics.bind_failures.fetch_add(1, Ordering::Relaxed);
            log::warn!(
                "[router] bind failed for '{}' at '{}': {}",
                qualified,
                endpoint.address(),
                err
            );
        }
    }
    inner.state.mark_listening(K::KIND);
    log::debug!(
        "[router] {} unit listening over {} endpoint(s), status={}",
        K::KIND,
        endpoints.len(),
        inner.state.status()
    );

    // Poll set plus a parallel index-to-name list, built in one pass so
    // readiness results resolve back to endpoints by position.
    let mut names = Vec::with_capacity(endpoints.len());
    let mut items = Vec::with_capacity(endpoints.len());
    for (qualified, endpoint) in &endpoints {
        names.push(qualified.clone());
        items.push(endpoint.as_poll_item());
    }

    let timeout = i64::try_from(inner.poll_interval.as_millis()).unwrap_or(i64::MAX);
    while !inner.stop.load(Ordering::Relaxed) {
        match zmq::poll(&mut items, timeout) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(err) => {
                inner.metrics.poll_errors.fetch_add(1, Ordering::Relaxed);
                log::debug!("[router] {} poll failed: {}", K::KIND, err);
                continue;
            }
        }
        for (index, item) in items.iter().enumerate() {
            if !item.is_readable() {
                continue;
            }
            let qualified = &names[index];
            let Some(endpoint) = endpoints.get(qualified) else {
                continue;
            };
            let frames = match endpoint.receive() {
                Ok(frames) => frames,
                Err(err) => {
                    inner.metrics.receive_errors.fetch_add(1, Ordering::Relaxed);
                    log::debug!("[router] receive failed on '{}': {}", qualified, err);
                    continue;
                }
            };
            inner.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
            dispatch(inner, kind, endpoint, qualified, &frames);
        }
    }

    drop(items);
    *kind.endpoints.lock() = endpoints;
    log::debug!("[router] {} unit stopped", K::KIND);
}

/// Invoke every handler registered under `qualified`, in registration
/// order, isolating panics so the unit survives a bad handler.
fn dispatch<K: Transport>(
    inner: &RouterInner,
    kind: &KindState<K>,
    endpoint: &Endpoint<K>,
    qualified: &str,
    frames: &[Frame],
) {
    let mut handlers = kind.handlers.lock();
    let Some(list) = handlers.get_mut(qualified) else {
        return;
    };
    for handler in list.iter_mut() {
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(endpoint, frames)));
        inner.metrics.callbacks_invoked.fetch_add(1, Ordering::Relaxed);
        if outcome.is_err() {
            inner.metrics.callback_panics.fetch_add(1, Ordering::Relaxed);
            log::debug!("[router] handler for '{}' panicked", qualified);
        }
    }
}

// ============================================================================
// Facade
// ============================================================================

/// Inbound message-routing facade.
///
/// Owns named router-role endpoints across the three transport kinds and
/// the handlers subscribed to them, and drives one poll unit per non-empty
/// kind from [`Router::listen`].
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Start building a router.
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Subscribe `handler` to the networked endpoint registered as `name`.
    ///
    /// Unknown names are silently dropped. Handlers accumulate: one
    /// received message invokes every handler for the name, in
    /// registration order.
    pub fn register_tcp_callback<F>(&self, name: &str, handler: F)
    where
        F: FnMut(&Endpoint<Tcp>, &[Frame]) + Send + 'static,
    {
        self.inner.tcp.register(name, Box::new(handler));
    }

    /// Subscribe `handler` to the local endpoint registered as `name`.
    /// Same accumulation rules as [`Router::register_tcp_callback`].
    pub fn register_ipc_callback<F>(&self, name: &str, handler: F)
    where
        F: FnMut(&Endpoint<Ipc>, &[Frame]) + Send + 'static,
    {
        self.inner.ipc.register(name, Box::new(handler));
    }

    /// Subscribe `handler` to the in-process endpoint registered as `name`.
    /// Same accumulation rules as [`Router::register_tcp_callback`].
    pub fn register_inproc_callback<F>(&self, name: &str, handler: F)
    where
        F: FnMut(&Endpoint<Inproc>, &[Frame]) + Send + 'static,
    {
        self.inner.inproc.register(name, Box::new(handler));
    }

    /// Bind every registered endpoint and poll until stopped.
    ///
    /// Spawns one named unit per transport kind and blocks until all of
    /// them return. Calling this twice is harmless: a kind already claimed
    /// by a live unit backs off without re-binding or duplicating
    /// delivery. Returns after [`RouterHandle::stop`] (or [`Router::stop`])
    /// once every unit has observed the flag, within one poll interval.
    pub fn listen(&self) -> Result<()> {
        let units = [
            spawn_unit::<Tcp>(&self.inner, "patchbay-tcp-poll", |inner| &inner.tcp)?,
            spawn_unit::<Ipc>(&self.inner, "patchbay-ipc-poll", |inner| &inner.ipc)?,
            spawn_unit::<Inproc>(&self.inner, "patchbay-inproc-poll", |inner| &inner.inproc)?,
        ];
        for unit in units {
            if unit.join().is_err() {
                log::error!("[router] poll unit panicked");
            }
        }
        Ok(())
    }

    /// Control surface usable while `listen` blocks another thread.
    pub fn handle(&self) -> RouterHandle {
        RouterHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Current derived status.
    pub fn status(&self) -> RouterStatus {
        self.inner.state.status()
    }

    /// Point-in-time copy of the engine counters.
    pub fn metrics(&self) -> RouterMetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Ask every poll unit to wind down. Terminal: a stopped router does
    /// not restart.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

fn spawn_unit<K: Transport>(
    inner: &Arc<RouterInner>,
    thread_name: &str,
    project: fn(&RouterInner) -> &KindState<K>,
) -> Result<thread::JoinHandle<()>> {
    let inner = Arc::clone(inner);
    let handle = thread::Builder::new()
        .name(thread_name.to_string())
        .spawn(move || poll_unit(&inner, project(&inner)))?;
    Ok(handle)
}

/// Cheap-to-clone control surface for a router whose [`Router::listen`]
/// call is blocking another thread.
#[derive(Clone)]
pub struct RouterHandle {
    inner: Arc<RouterInner>,
}

impl RouterHandle {
    /// Ask every poll unit to wind down. See [`Router::stop`].
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::Relaxed);
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.inner.stop.load(Ordering::Relaxed)
    }

    /// Current derived status.
    pub fn status(&self) -> RouterStatus {
        self.inner.state.status()
    }

    /// Point-in-time copy of the engine counters.
    pub fn metrics(&self) -> RouterMetricsSnapshot {
        self.inner.metrics.snapshot()
    }
}

impl std::fmt::Debug for RouterHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterHandle")
            .field("status", &self.status())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Consuming builder for [`Router`].
#[derive(Debug)]
pub struct RouterBuilder {
    tcp: Vec<EndpointConfig>,
    ipc: Vec<EndpointConfig>,
    inproc: Vec<EndpointConfig>,
    io_threads: Option<i32>,
    poll_interval: Duration,
}

impl RouterBuilder {
    fn new() -> Self {
        RouterBuilder {
            tcp: Vec::new(),
            ipc: Vec::new(),
            inproc: Vec::new(),
            io_threads: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
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

    /// Bounded wait per poll iteration; also the upper bound on stop
    /// latency. Defaults to [`DEFAULT_POLL_INTERVAL`].
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Validate descriptors and construct the facade.
    ///
    /// Incomplete descriptors (empty name or address) are skipped with a
    /// debug log; an invalid networked address aborts construction.
    pub fn build(self) -> Result<Router> {
        let ctx = match self.io_threads {
            Some(count) => Context::with_io_threads(count)?,
            None => Context::new(),
        };
        let inner = RouterInner {
            tcp: KindState::new(),
            ipc: KindState::new(),
            inproc: KindState::new(),
            state: ListenState::new(),
            stop: AtomicBool::new(false),
            poll_interval: self.poll_interval,
            metrics: RouterMetrics::default(),
            ctx,
        };
        populate(&inner.ctx, &inner.tcp, &self.tcp)?;
        populate(&inner.ctx, &inner.ipc, &self.ipc)?;
        populate(&inner.ctx, &inner.inproc, &self.inproc)?;
        Ok(Router {
            inner: Arc::new(inner),
        })
    }
}

/// Build router-role endpoints from `configs` into `kind`'s registry.
fn populate<K: Transport>(
    ctx: &Context,
    kind: &KindState<K>,
    configs: &[EndpointConfig],
) -> Result<()> {
    let mut registry = kind.endpoints.lock();
    for config in configs {
        if !config.is_complete() {
            log::debug!(
                "[router] skipping incomplete {} descriptor (name='{}')",
                K::KIND,
                config.name
            );
            continue;
        }
        if K::KIND == TransportKind::Tcp && !is_valid_tcp_address(&config.address) {
            return Err(Error::InvalidAddress(config.address.clone()));
        }
        let endpoint = Endpoint::<K>::new(ctx, &config.name, &config.address, Role::Router)?;
        registry.insert(K::qualified(&config.name), endpoint);
    }
    Ok(())
}
