// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint descriptors and networked-address validation.

use std::sync::OnceLock;

use regex::Regex;

/// Declarative description of one endpoint: a registry name plus a
/// transport address.
///
/// The facade builders skip descriptors with an empty name or address; the
/// networked kind additionally validates the address shape at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Application-chosen registry name.
    pub name: String,
    /// Transport address; `IPV4:PORT` for the networked kind, a socket-file
    /// path for the local kind, a free-form string for the in-process kind.
    pub address: String,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        EndpointConfig {
            name: name.into(),
            address: address.into(),
        }
    }

    /// Both fields non-empty. Incomplete descriptors never reach a registry.
    pub fn is_complete(&self) -> bool {
        !self.name.is_empty() && !self.address.is_empty()
    }
}

/// `IPV4:PORT` shape check for networked endpoint addresses.
///
/// Octets are range-checked (0 to 255, no leading zeros); the port is one
/// or more digits with no further range check.
pub fn is_valid_tcp_address(address: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(
            r"^(([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5])\.){3}([0-9]|[1-9][0-9]|1[0-9]{2}|2[0-4][0-9]|25[0-5]):[0-9]+$",
        )
        .expect("tcp address pattern compiles")
    });
    pattern.is_match(address)
}
