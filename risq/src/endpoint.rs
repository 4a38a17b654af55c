//! Controller endpoint addressing.
//!
//! Controllers are addressed by bare `host:port` strings, no URL scheme:
//!
//! - `10.0.0.5:13555`
//! - `10.0.0.5` (port defaults to 0)
//! - `[::1]:13555`
//! - `[::1]`
//!
//! Only numeric addresses are accepted; name resolution is the
//! application's concern.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// A parsed controller address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    addr: IpAddr,
    port: u16,
}

impl Endpoint {
    /// Parse an endpoint from one of the supported string forms.
    pub fn parse(s: &str) -> Result<Self, EndpointError> {
        s.parse()
    }

    #[must_use]
    pub const fn addr(&self) -> IpAddr {
        self.addr
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The socket address to connect to.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.addr, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(EndpointError::Empty);
        }

        // Bracketed IPv6, with or without a port.
        if let Some(rest) = s.strip_prefix('[') {
            let Some((host, tail)) = rest.split_once(']') else {
                return Err(EndpointError::UnbalancedBracket(s.to_string()));
            };
            let addr: IpAddr = host
                .parse()
                .map_err(|_| EndpointError::InvalidAddress(host.to_string()))?;
            let port = match tail.strip_prefix(':') {
                Some(p) => parse_port(p)?,
                None if tail.is_empty() => 0,
                None => return Err(EndpointError::TrailingGarbage(s.to_string())),
            };
            return Ok(Self { addr, port });
        }

        // Unbracketed IPv6 (more than one colon), no port possible.
        if s.matches(':').count() > 1 {
            let addr: IpAddr = s
                .parse()
                .map_err(|_| EndpointError::InvalidAddress(s.to_string()))?;
            return Ok(Self { addr, port: 0 });
        }

        // IPv4, with or without a port.
        let (host, port) = match s.split_once(':') {
            Some((host, port)) => (host, parse_port(port)?),
            None => (s, 0),
        };
        let addr: IpAddr = host
            .parse()
            .map_err(|_| EndpointError::InvalidAddress(host.to_string()))?;
        Ok(Self { addr, port })
    }
}

fn parse_port(s: &str) -> Result<u16, EndpointError> {
    s.parse()
        .map_err(|_| EndpointError::InvalidPort(s.to_string()))
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.addr {
            IpAddr::V4(v4) => write!(f, "{}:{}", v4, self.port),
            IpAddr::V6(v6) => write!(f, "[{}]:{}", v6, self.port),
        }
    }
}

/// Errors from parsing a controller address.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("empty endpoint string")]
    Empty,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("unbalanced bracket in endpoint: {0}")]
    UnbalancedBracket(String),

    #[error("unexpected characters after address: {0}")]
    TrailingGarbage(String),
}
