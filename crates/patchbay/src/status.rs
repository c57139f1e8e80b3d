// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Listening-status bitset and its derived public view.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use crate::endpoint::TransportKind;

// ============================================================================
// Internal bitset
// ============================================================================

/// Lifecycle state shared by the three per-kind poll units.
///
/// Two bit groups, one bit per transport kind. A claim bit is taken exactly
/// once by the unit that will service a kind, so re-entering `listen` can
/// never double-bind. A listening bit is set after the unit's bind phase
/// and forms a monotonic union; bits are never cleared while the facade
/// lives. Stop intent is signalled separately.
#[derive(Debug, Default)]
pub(crate) struct ListenState {
    claimed: AtomicU8,
    listening: AtomicU8,
}

impl ListenState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Take the claim bit for `kind`. Returns false when a unit already
    /// holds it, in which case the caller backs off without binding.
    pub(crate) fn try_claim(&self, kind: TransportKind) -> bool {
        let previous = self.claimed.fetch_or(kind.bit(), Ordering::AcqRel);
        previous & kind.bit() == 0
    }

    /// Record that `kind`'s bind phase completed.
    pub(crate) fn mark_listening(&self, kind: TransportKind) {
        self.listening.fetch_or(kind.bit(), Ordering::AcqRel);
    }

    pub(crate) fn is_listening(&self, kind: TransportKind) -> bool {
        self.listening.load(Ordering::Acquire) & kind.bit() != 0
    }

    /// Derive the public status from the two bit groups.
    pub(crate) fn status(&self) -> RouterStatus {
        RouterStatus::from_bits(
            self.claimed.load(Ordering::Acquire),
            self.listening.load(Ordering::Acquire),
        )
    }
}

// ============================================================================
// Public status
// ============================================================================

/// Externally visible router lifecycle status.
///
/// Derived from the per-kind listening bits; any union of bits maps to
/// exactly one variant regardless of the order the poll units reached it.
/// An empty transport kind never contributes its bit, so a router serving
/// only the local kind peaks at [`RouterStatus::ListeningOnIpc`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouterStatus {
    /// No poll unit has claimed a transport kind yet.
    Initialized,
    /// At least one unit is between claiming its kind and finishing binds.
    Bound,
    ListeningOnTcp,
    ListeningOnIpc,
    ListeningOnInproc,
    ListeningOnTcpAndIpc,
    ListeningOnTcpAndInproc,
    ListeningOnIpcAndInproc,
    /// All three kinds are being polled.
    Listening,
}

impl RouterStatus {
    fn from_bits(claimed: u8, listening: u8) -> Self {
        let tcp = listening & TransportKind::Tcp.bit() != 0;
        let ipc = listening & TransportKind::Ipc.bit() != 0;
        let inproc = listening & TransportKind::Inproc.bit() != 0;
        match (tcp, ipc, inproc) {
            (false, false, false) => {
                if claimed == 0 {
                    RouterStatus::Initialized
                } else {
                    RouterStatus::Bound
                }
            }
            (true, false, false) => RouterStatus::ListeningOnTcp,
            (false, true, false) => RouterStatus::ListeningOnIpc,
            (false, false, true) => RouterStatus::ListeningOnInproc,
            (true, true, false) => RouterStatus::ListeningOnTcpAndIpc,
            (true, false, true) => RouterStatus::ListeningOnTcpAndInproc,
            (false, true, true) => RouterStatus::ListeningOnIpcAndInproc,
            (true, true, true) => RouterStatus::Listening,
        }
    }

    /// True once at least one kind's bind phase has completed.
    pub fn is_listening(self) -> bool {
        !matches!(self, RouterStatus::Initialized | RouterStatus::Bound)
    }
}

impl fmt::Display for RouterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RouterStatus::Initialized => "initialized",
            RouterStatus::Bound => "bound",
            RouterStatus::ListeningOnTcp => "listening(tcp)",
            RouterStatus::ListeningOnIpc => "listening(ipc)",
            RouterStatus::ListeningOnInproc => "listening(inproc)",
            RouterStatus::ListeningOnTcpAndIpc => "listening(tcp+ipc)",
            RouterStatus::ListeningOnTcpAndInproc => "listening(tcp+inproc)",
            RouterStatus::ListeningOnIpcAndInproc => "listening(ipc+inproc)",
            RouterStatus::Listening => "listening(tcp+ipc+inproc)",
        };
        f.write_str(label)
    }
}
