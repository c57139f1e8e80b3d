// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The socket primitive: role-shaped framing over three transport kinds.
//!
//! An [`Endpoint`] pairs an application-chosen name with a transport address
//! and a [`Role`]. The role fixes both the underlying socket type and the
//! frame shape used on the wire, so callers never assemble or strip
//! delimiter frames themselves. The transport kind is a compile-time marker
//! ([`Tcp`], [`Ipc`], [`Inproc`]) selecting the URI scheme and the qualified
//! name used as registry key.

use std::fmt;
use std::marker::PhantomData;

use crate::context::Context;
use crate::{Error, Result};

/// One unit of a (possibly multi-part) message.
pub type Frame = Vec<u8>;

// ============================================================================
// Role
// ============================================================================

/// Socket role. Fixes the underlying socket type and the frame shape used
/// by [`Endpoint::send`] and [`Endpoint::receive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Request side of a strict request/reply pair.
    Request,
    /// Reply side of a strict request/reply pair.
    Reply,
    /// Outbound side of the asynchronous pattern; sends without waiting.
    Dealer,
    /// Inbound multiplexer; addresses replies to a specific peer.
    Router,
}

impl Role {
    pub(crate) fn socket_type(self) -> zmq::SocketType {
        match self {
            Role::Request => zmq::REQ,
            Role::Reply => zmq::REP,
            Role::Dealer => zmq::DEALER,
            Role::Router => zmq::ROUTER,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Request => "request",
            Role::Reply => "reply",
            Role::Dealer => "dealer",
            Role::Router => "router",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Transport kinds
// ============================================================================

/// Runtime tag for the three transport kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// Networked (`tcp://`), addressed as validated `IPV4:PORT`.
    Tcp,
    /// Local (`ipc://`), addressed as a same-host socket file path.
    Ipc,
    /// In-process (`inproc://`), addressed as a free-form string; reaches
    /// only peers sharing the same [`Context`].
    Inproc,
}

impl TransportKind {
    /// Lowercase tag used in logs.
    pub fn label(self) -> &'static str {
        match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Ipc => "ipc",
            TransportKind::Inproc => "inproc",
        }
    }

    /// Bit assigned to this kind in the listening-status bitset.
    pub(crate) fn bit(self) -> u8 {
        match self {
            TransportKind::Tcp => 0b001,
            TransportKind::Ipc => 0b010,
            TransportKind::Inproc => 0b100,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Compile-time transport marker.
///
/// The marker suffix keeps identical names (and, for the file/in-process
/// kinds, identical address strings) from colliding across kinds.
pub trait Transport: Send + Sync + 'static {
    /// Runtime tag for this kind.
    const KIND: TransportKind;
    /// URI scheme understood by the socket library.
    const SCHEME: &'static str;
    /// Suffix appended to names to form registry keys.
    const MARKER: &'static str;

    /// Registry key for `name` under this kind.
    fn qualified(name: &str) -> String {
        format!("{}{}", name, Self::MARKER)
    }

    /// Bind/connect URI for `address`.
    fn uri(address: &str) -> String;
}

/// Networked transport kind.
#[derive(Debug, Clone, Copy)]
pub struct Tcp;

impl Transport for Tcp {
    const KIND: TransportKind = TransportKind::Tcp;
    const SCHEME: &'static str = "tcp";
    const MARKER: &'static str = ".tcp";

    /// `IPV4:PORT` is already unambiguous, no suffix on the wire.
    fn uri(address: &str) -> String {
        format!("tcp://{address}")
    }
}

/// Local (socket file) transport kind.
#[derive(Debug, Clone, Copy)]
pub struct Ipc;

impl Transport for Ipc {
    const KIND: TransportKind = TransportKind::Ipc;
    const SCHEME: &'static str = "ipc";
    const MARKER: &'static str = ".ipc";

    fn uri(address: &str) -> String {
        format!("ipc://{}{}", address, Self::MARKER)
    }
}

/// In-process transport kind.
#[derive(Debug, Clone, Copy)]
pub struct Inproc;

impl Transport for Inproc {
    const KIND: TransportKind = TransportKind::Inproc;
    const SCHEME: &'static str = "inproc";
    const MARKER: &'static str = ".inproc";

    fn uri(address: &str) -> String {
        format!("inproc://{}{}", address, Self::MARKER)
    }
}

// ============================================================================
// Endpoint
// ============================================================================

/// A named, role-shaped socket over one transport kind.
///
/// The facades own endpoints; handlers borrow them to address replies back
/// to the firing peer.
pub struct Endpoint<K: Transport> {
    name: String,
    address: String,
    role: Role,
    socket: zmq::Socket,
    _kind: PhantomData<K>,
}

impl<K: Transport> Endpoint<K> {
    /// Create the underlying socket. No network activity yet; see
    /// [`Endpoint::bind`] and [`Endpoint::connect`].
    pub(crate) fn new(ctx: &Context, name: &str, address: &str, role: Role) -> Result<Self> {
        let socket = ctx.socket(role)?;
        Ok(Endpoint {
            name: name.to_string(),
            address: address.to_string(),
            role,
            socket,
            _kind: PhantomData,
        })
    }

    /// Application-chosen registry name (unqualified).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Transport address as supplied at construction.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Role fixed at construction.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Transport kind of this endpoint.
    pub fn kind(&self) -> TransportKind {
        K::KIND
    }

    /// Registry key: name plus kind marker.
    pub fn qualified_name(&self) -> String {
        K::qualified(&self.name)
    }

    /// Bind to this endpoint's kind URI. Router role only; for any other
    /// role this is a no-op.
    pub(crate) fn bind(&self) -> Result<()> {
        if self.role != Role::Router {
            return Ok(());
        }
        self.socket.bind(&K::uri(&self.address))?;
        Ok(())
    }

    /// Connect to this endpoint's kind URI. Dealer role only; for any other
    /// role this is a no-op.
    ///
    /// The socket identity is pinned to the address bytes before connecting
    /// so a paired router can address replies back to this exact peer.
    pub(crate) fn connect(&self) -> Result<()> {
        if self.role != Role::Dealer {
            return Ok(());
        }
        self.socket.set_identity(self.address.as_bytes())?;
        self.socket.connect(&K::uri(&self.address))?;
        Ok(())
    }

    /// Send one message with this role's frame shape.
    ///
    /// - router: `[peer, empty, payload]`, the reply addressed to `peer`
    /// - dealer: `[empty, payload]`, `peer` carried by the socket identity
    /// - request/reply: `[payload]`
    pub fn send(&self, peer: &[u8], payload: &[u8]) -> Result<()> {
        match self.role {
            Role::Router => self.socket.send_multipart([peer, &[][..], payload], 0)?,
            Role::Dealer => self.socket.send_multipart([&[][..], payload], 0)?,
            Role::Request | Role::Reply => self.socket.send(payload, 0)?,
        }
        Ok(())
    }

    /// Receive one complete message, inverting this role's frame shape.
    ///
    /// - router: `[peer, payload..]` with the empty delimiter removed
    /// - dealer: `[payload..]` with the empty delimiter removed
    /// - request/reply: the frames as read
    ///
    /// A message too short for the role's shape is an
    /// [`Error::IncompleteMessage`]; the engine counts and skips those.
    pub fn receive(&self) -> Result<Vec<Frame>> {
        let mut frames = self.socket.recv_multipart(0)?;
        match self.role {
            Role::Router => {
                if frames.len() < 3 {
                    return Err(Error::IncompleteMessage {
                        role: self.role,
                        frames: frames.len(),
                    });
                }
                frames.remove(1);
            }
            Role::Dealer => {
                if frames.len() < 2 {
                    return Err(Error::IncompleteMessage {
                        role: self.role,
                        frames: frames.len(),
                    });
                }
                frames.remove(0);
            }
            Role::Request | Role::Reply => {}
        }
        Ok(frames)
    }

    /// Readable-readiness registration for the engine's poll set.
    pub(crate) fn as_poll_item(&self) -> zmq::PollItem<'_> {
        self.socket.as_poll_item(zmq::POLLIN)
    }
}

impl<K: Transport> fmt::Debug for Endpoint<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("role", &self.role)
            .field("kind", &K::KIND)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_names_carry_kind_marker() {
        assert_eq!(Tcp::qualified("echo"), "echo.tcp");
        assert_eq!(Ipc::qualified("echo"), "echo.ipc");
        assert_eq!(Inproc::qualified("echo"), "echo.inproc");
    }

    #[test]
    fn test_uri_shapes_per_kind() {
        assert_eq!(Tcp::uri("127.0.0.1:5555"), "tcp://127.0.0.1:5555");
        assert_eq!(Ipc::uri("/tmp/svc1"), "ipc:///tmp/svc1.ipc");
        assert_eq!(Inproc::uri("control"), "inproc://control.inproc");
    }

    #[test]
    fn test_same_address_maps_to_distinct_uris() {
        assert_ne!(Ipc::uri("bus"), Inproc::uri("bus"));
        assert_ne!(Ipc::qualified("bus"), Inproc::qualified("bus"));
    }

    #[test]
    fn test_dealer_to_router_framing_in_process() {
        let ctx = Context::new();
        let server = Endpoint::<Inproc>::new(&ctx, "echo", "framing", Role::Router)
            .expect("Failed to create router endpoint");
        let client = Endpoint::<Inproc>::new(&ctx, "echo", "framing", Role::Dealer)
            .expect("Failed to create dealer endpoint");

        server.bind().expect("Failed to bind");
        client.connect().expect("Failed to connect");

        client.send(b"", b"hello").expect("Failed to send");
        let frames = server.receive().expect("Failed to receive");
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], b"framing");
        assert_eq!(frames[1], b"hello");
    }

    #[test]
    fn test_router_reply_reaches_dealer() {
        let ctx = Context::new();
        let server = Endpoint::<Inproc>::new(&ctx, "echo", "reply", Role::Router)
            .expect("Failed to create router endpoint");
        let client = Endpoint::<Inproc>::new(&ctx, "echo", "reply", Role::Dealer)
            .expect("Failed to create dealer endpoint");

        server.bind().expect("Failed to bind");
        client.connect().expect("Failed to connect");

        client.send(b"", b"ping").expect("Failed to send");
        let request = server.receive().expect("Failed to receive");
        server.send(&request[0], b"pong").expect("Failed to reply");

        let reply = client.receive().expect("Failed to receive reply");
        assert_eq!(reply, vec![b"pong".to_vec()]);
    }

    #[test]
    fn test_request_reply_single_frame() {
        let ctx = Context::new();
        let responder = Endpoint::<Inproc>::new(&ctx, "rpc", "reqrep", Role::Reply)
            .expect("Failed to create reply endpoint");
        let requester = Endpoint::<Inproc>::new(&ctx, "rpc", "reqrep", Role::Request)
            .expect("Failed to create request endpoint");

        // Reply role never binds through the router path; drive the raw
        // socket for the pairing.
        responder.socket.bind("inproc://reqrep").expect("Failed to bind");
        requester.socket.connect("inproc://reqrep").expect("Failed to connect");

        requester.send(b"", b"question").expect("Failed to send");
        let question = responder.receive().expect("Failed to receive");
        assert_eq!(question, vec![b"question".to_vec()]);

        responder.send(b"", b"answer").expect("Failed to reply");
        let answer = requester.receive().expect("Failed to receive reply");
        assert_eq!(answer, vec![b"answer".to_vec()]);
    }

    #[test]
    fn test_short_router_message_is_incomplete() {
        let ctx = Context::new();
        let server = Endpoint::<Inproc>::new(&ctx, "echo", "short", Role::Router)
            .expect("Failed to create router endpoint");
        let client = Endpoint::<Inproc>::new(&ctx, "echo", "short", Role::Dealer)
            .expect("Failed to create dealer endpoint");

        server.bind().expect("Failed to bind");
        client.connect().expect("Failed to connect");

        // Bypass dealer framing: a single frame arrives at the router as
        // [identity, payload] with no delimiter.
        client.socket.send("stray", 0).expect("Failed to send");
        match server.receive() {
            Err(Error::IncompleteMessage { role, frames }) => {
                assert_eq!(role, Role::Router);
                assert_eq!(frames, 2);
            }
            other => panic!("expected IncompleteMessage, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_is_noop_for_dealer_role() {
        let ctx = Context::new();
        let client = Endpoint::<Inproc>::new(&ctx, "echo", "noop", Role::Dealer)
            .expect("Failed to create dealer endpoint");
        client.bind().expect("bind must be a no-op for dealer role");

        let server = Endpoint::<Inproc>::new(&ctx, "echo", "noop", Role::Router)
            .expect("Failed to create router endpoint");
        server.connect().expect("connect must be a no-op for router role");
    }
}
