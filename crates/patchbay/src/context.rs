// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Socket context ownership.

use crate::endpoint::Role;
use crate::Result;

/// Handle to the socket library's background I/O machinery.
///
/// Each facade owns exactly one `Context`, created by its builder and held
/// for the facade's whole lifetime so sockets never outlive it. Cloning is
/// cheap (handle semantics); clones refer to the same underlying context.
///
/// In-process endpoints only reach peers created from the *same* context,
/// so in-process traffic cannot cross facade boundaries.
#[derive(Clone)]
pub struct Context {
    inner: zmq::Context,
}

impl Context {
    /// Context with the library default of one background I/O thread.
    pub fn new() -> Self {
        Context {
            inner: zmq::Context::new(),
        }
    }

    /// Context with a tuned background I/O thread count.
    pub fn with_io_threads(count: i32) -> Result<Self> {
        let inner = zmq::Context::new();
        inner.set_io_threads(count)?;
        Ok(Context { inner })
    }

    /// Current background I/O thread count.
    pub fn io_threads(&self) -> Result<i32> {
        Ok(self.inner.get_io_threads()?)
    }

    /// Create a raw socket for `role`.
    ///
    /// Linger is zeroed so dropping a facade with queued output never
    /// blocks context teardown.
    pub(crate) fn socket(&self, role: Role) -> Result<zmq::Socket> {
        let socket = self.inner.socket(role.socket_type())?;
        socket.set_linger(0)?;
        Ok(socket)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context").finish_non_exhaustive()
    }
}
