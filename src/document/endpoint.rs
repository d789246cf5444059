use super::error::{DocumentError, Result};
use serde::Serialize;
use std::fmt;
use std::net::Ipv6Addr;

/// Characters that would change the meaning of a pf rule if they leaked into one
const FORBIDDEN_ADDRESS_CHARS: &[char] = &[
    '{', '}', '(', ')', '#', '"', '\'', '<', '>', ';', ',', '$', '\\', '!', '=',
];

/// pf address family keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Inet,
    Inet6,
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressFamily::Inet => write!(f, "inet"),
            AddressFamily::Inet6 => write!(f, "inet6"),
        }
    }
}

/// Manager address and port the host must stay reachable to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Endpoint {
    address: String,
    port: u16,
}

impl Endpoint {
    /// Validate raw field values taken from the configuration document
    pub fn parse(address: &str, port: &str) -> Result<Self> {
        let address = address.trim();
        let port = port.trim();

        if address.is_empty() {
            return Err(DocumentError::field_not_found("address"));
        }
        if port.is_empty() {
            return Err(DocumentError::field_not_found("port"));
        }

        if address.chars().any(char::is_whitespace) {
            return Err(DocumentError::malformed_address(
                address,
                "address must be a single token without whitespace",
            ));
        }
        if let Some(c) = address.chars().find(|c| FORBIDDEN_ADDRESS_CHARS.contains(c)) {
            return Err(DocumentError::malformed_address(
                address,
                format!("character '{}' is not allowed in an address", c),
            ));
        }

        Ok(Self {
            address: address.to_string(),
            port: parse_port(port)?,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn family(&self) -> AddressFamily {
        if self.address.parse::<Ipv6Addr>().is_ok() {
            AddressFamily::Inet6
        } else {
            AddressFamily::Inet
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.family() {
            AddressFamily::Inet6 => write!(f, "[{}]:{}", self.address, self.port),
            AddressFamily::Inet => write!(f, "{}:{}", self.address, self.port),
        }
    }
}

fn parse_port(value: &str) -> Result<u16> {
    // u16::from_str accepts a leading '+', pf does not
    if !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(DocumentError::malformed_port(
            value,
            "port must contain only decimal digits",
        ));
    }

    let port = value
        .parse::<u32>()
        .ok()
        .filter(|p| (1..=u32::from(u16::MAX)).contains(p))
        .ok_or_else(|| DocumentError::malformed_port(value, "port must be in range 1-65535"))?;

    Ok(port as u16)
}
