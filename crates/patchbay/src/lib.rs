// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # Patchbay - transport-agnostic router/dealer messaging facades
//!
//! A thin routing layer over ZeroMQ-style sockets. Inbound traffic is
//! multiplexed by a [`Router`] that binds named endpoints across three
//! transport kinds and dispatches every received message to registered
//! handlers; outbound traffic goes through a [`Dealer`] with lazy,
//! fire-and-forget sends. Payloads are opaque bytes; framing per socket
//! role is handled by the [`Endpoint`] primitive.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patchbay::{Dealer, Router, Result};
//!
//! fn main() -> Result<()> {
//!     let router = Router::builder()
//!         .ipc("echo", "/tmp/patchbay/svc1")
//!         .build()?;
//!
//!     // frames arrive as [peer, payload..]; reply via the endpoint
//!     router.register_ipc_callback("echo", |endpoint, frames| {
//!         let _ = endpoint.send(&frames[0], &frames[1]);
//!     });
//!
//!     let handle = router.handle();
//!     std::thread::spawn(move || {
//!         let dealer = Dealer::builder()
//!             .ipc("echo", "/tmp/patchbay/svc1")
//!             .build()
//!             .expect("Failed to build dealer");
//!         dealer.send("echo", b"ping");
//!         handle.stop();
//!     });
//!
//!     router.listen()?; // blocks until stopped
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------+
//! |                         Application                           |
//! |      handler callbacks            send(name, message)         |
//! +---------------------------------------------------------------+
//! |        Router facade              Dealer facade               |
//! |  registries + handler multimaps   registries + connect guards |
//! |  one poll unit per kind           priority name resolution    |
//! +---------------------------------------------------------------+
//! |                      Endpoint primitive                       |
//! |     role-shaped framing: router / dealer / request / reply    |
//! +---------------------------------------------------------------+
//! |             Transport kinds: tcp | ipc | inproc               |
//! +---------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Router`] | Inbound facade: binds endpoints, polls, dispatches to handlers |
//! | [`Dealer`] | Outbound facade: fire-and-forget `send(name, message)` |
//! | [`RouterHandle`] | Stop/status/metrics surface while `listen` blocks |
//! | [`Endpoint`] | Named, role-shaped socket over one transport kind |
//! | [`RouterStatus`] | Derived listening status across the three kinds |
//!
//! ## Modules Overview
//!
//! - [`router`] - Inbound facade and the per-kind polling engine
//! - [`dealer`] - Outbound facade
//! - [`endpoint`] - Socket primitive, roles, and transport markers
//! - [`config`] - Endpoint descriptors and address validation
//! - [`status`] - Listening-status derivation
//! - [`context`] - Socket context ownership

/// Endpoint descriptors and networked-address validation.
pub mod config;
/// Socket context ownership.
pub mod context;
/// Outbound fire-and-forget facade.
pub mod dealer;
/// Socket primitive: roles, transport markers, role-shaped framing.
pub mod endpoint;
/// Crate-wide error type.
pub mod error;
/// Inbound routing facade and polling engine.
pub mod router;
/// Listening-status bitset and derived view.
pub mod status;

pub use config::{is_valid_tcp_address, EndpointConfig};
pub use context::Context;
pub use dealer::{Dealer, DealerBuilder};
pub use endpoint::{Endpoint, Frame, Inproc, Ipc, Role, Tcp, Transport, TransportKind};
pub use error::{Error, Result};
pub use router::{
    Handler, Router, RouterBuilder, RouterHandle, RouterMetrics, RouterMetricsSnapshot,
    DEFAULT_POLL_INTERVAL,
};
pub use status::RouterStatus;

/// Patchbay version string.
pub const VERSION: &str = "0.3.2";
