// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type and `Result` alias.

use thiserror::Error;

use crate::endpoint::Role;

/// Errors surfaced by facade construction and the endpoint primitive.
///
/// Only construction-time problems are fatal to callers; transport errors
/// hit at runtime are logged and counted by the facades instead of being
/// returned (see [`crate::RouterMetrics`]).
#[derive(Error, Debug)]
pub enum Error {
    /// A networked endpoint address failed `IPV4:PORT` validation.
    #[error("invalid tcp address '{0}' (expected IPV4:PORT)")]
    InvalidAddress(String),

    /// Error reported by the socket library.
    #[error("socket error: {0}")]
    Socket(#[from] zmq::Error),

    /// I/O error (poll thread spawn).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A multipart message shorter than the receiving role's frame shape.
    #[error("incomplete multipart message on {role} socket ({frames} frame(s))")]
    IncompleteMessage {
        /// Role of the receiving endpoint.
        role: Role,
        /// Number of frames actually read off the wire.
        frames: usize,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
