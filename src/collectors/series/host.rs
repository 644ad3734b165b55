//! Host tokens of the form `[alias@]host[:port]`.

use super::error::CollectError;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;
use std::str::FromStr;

/// Port used when a host token carries none.
pub const DEFAULT_PORT: u16 = 8086;

/// A parsed host token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostSpec {
    /// Prefix segment for every metric published for this host.
    pub alias: Option<String>,
    pub hostname: String,
    pub port: Option<u16>,
}

fn host_token_regex() -> &'static Regex {
    static RE: OnceCell<Regex> = OnceCell::new();
    RE.get_or_init(|| {
        // alias is greedy so it ends at the last '@'
        #[allow(clippy::expect_used)]
        Regex::new(r"^(?:(?P<alias>.+)@)?(?P<host>[^:@\s/]+)(?::(?P<port>\d+))?$")
            .expect("Invalid regex")
    })
}

impl HostSpec {
    /// Parse a single host token.
    ///
    /// # Errors
    ///
    /// Returns `CollectError::MalformedHost` if the token is empty, has no hostname,
    /// or carries a port outside `1..=65535`.
    pub fn parse(token: &str) -> Result<Self, CollectError> {
        let malformed = || CollectError::MalformedHost {
            token: token.to_string(),
        };

        let caps = host_token_regex()
            .captures(token.trim())
            .ok_or_else(malformed)?;

        let hostname = caps
            .name("host")
            .map(|m| m.as_str().to_string())
            .filter(|h| !h.is_empty())
            .ok_or_else(malformed)?;

        let port = match caps.name("port") {
            Some(m) => match m.as_str().parse::<u16>() {
                Ok(port) if port > 0 => Some(port),
                _ => return Err(malformed()),
            },
            None => None,
        };

        Ok(Self {
            alias: caps.name("alias").map(|m| m.as_str().to_string()),
            hostname,
            port,
        })
    }

    #[must_use]
    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    /// `host:port` as used to reach the server.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.hostname, self.port_or_default())
    }

    /// Name identifying the host in labels and logs: the alias when set.
    #[must_use]
    pub fn label(&self) -> String {
        self.alias.clone().unwrap_or_else(|| self.endpoint())
    }
}

impl FromStr for HostSpec {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(alias) = &self.alias {
            write!(f, "{alias}@")?;
        }
        write!(f, "{}", self.hostname)?;
        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }
        Ok(())
    }
}
