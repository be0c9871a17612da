//! Broker address parsing
//!
//! Addresses look like `ws://host:port[/path]`. Host and port are cut out by
//! splitting on `://`, `:` and `/` rather than by a general URL parser:
//! the host runs from after `://` to the next `:`, and the port runs from
//! after the last `:` to the next `/`.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Path used when the address carries none (the broker's WebSocket endpoint)
pub const DEFAULT_WS_PATH: &str = "/mqtt";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("broker address '{0}' has no scheme (expected ws:// or wss://)")]
    MissingScheme(String),
    #[error("unsupported broker scheme '{0}' (expected ws or wss)")]
    UnsupportedScheme(String),
    #[error("broker address '{0}' has no host")]
    MissingHost(String),
    #[error("broker address '{0}' has no port")]
    MissingPort(String),
    #[error("invalid broker port '{port}' in '{address}'")]
    InvalidPort { address: String, port: String },
}

/// WebSocket flavour, selecting plain or encrypted transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Ws,
    Wss,
}

impl Scheme {
    pub fn is_secure(self) -> bool {
        matches!(self, Scheme::Wss)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scheme::Ws => "ws",
            Scheme::Wss => "wss",
        }
    }
}

/// A parsed broker address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub scheme: Scheme,
    pub host: String,
    pub port: u16,
    pub path: Option<String>,
}

impl BrokerAddress {
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let input = input.trim();

        let (scheme, rest) = input
            .split_once("://")
            .ok_or_else(|| AddressError::MissingScheme(input.to_string()))?;

        let scheme = match scheme.to_ascii_lowercase().as_str() {
            "ws" => Scheme::Ws,
            "wss" => Scheme::Wss,
            other => return Err(AddressError::UnsupportedScheme(other.to_string())),
        };

        let (host, after_host) = rest
            .split_once(':')
            .ok_or_else(|| AddressError::MissingPort(input.to_string()))?;
        if host.is_empty() {
            return Err(AddressError::MissingHost(input.to_string()));
        }

        // Port is taken after the LAST ':' of the whole address
        let port_text = input
            .rsplit(':')
            .next()
            .and_then(|tail| tail.split('/').next())
            .unwrap_or_default();
        if port_text.is_empty() {
            return Err(AddressError::MissingPort(input.to_string()));
        }
        let port = port_text.parse::<u16>().map_err(|_| AddressError::InvalidPort {
            address: input.to_string(),
            port: port_text.to_string(),
        })?;

        let path = after_host
            .find('/')
            .map(|idx| after_host[idx..].to_string())
            .filter(|p| p != "/");

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
            path,
        })
    }

    /// Full WebSocket URL, falling back to [`DEFAULT_WS_PATH`]
    pub fn ws_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme.as_str(),
            self.host,
            self.port,
            self.path.as_deref().unwrap_or(DEFAULT_WS_PATH)
        )
    }
}

impl FromStr for BrokerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ws_url())
    }
}
