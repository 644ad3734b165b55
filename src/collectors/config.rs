use secrecy::SecretString;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost:8086";
pub const DEFAULT_LOGIN: &str = "root";
pub const DEFAULT_PASSWORD: &str = "root";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    pub enabled_collectors: HashSet<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled_collectors = collectors.iter().cloned().collect();
        self
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.contains(name)
    }
}

/// Login/password pair used for every host of a run.
pub struct Credentials {
    pub login: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(login: impl Into<String>, password: SecretString) -> Self {
        Self {
            login: login.into(),
            password,
        }
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_LOGIN, SecretString::from(DEFAULT_PASSWORD.to_string()))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Everything a collection cycle needs, built once at startup.
#[derive(Debug)]
pub struct InfluxConfig {
    /// `[alias@]host[:port]` tokens, parsed at the start of every cycle.
    pub hosts: Vec<String>,
    pub credentials: Credentials,
    /// Databases to collect; empty means every database of the host.
    pub databases: Vec<String>,
    /// Connect and request timeout for every call to a host.
    pub timeout: Duration,
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOST.to_string()],
            credentials: Credentials::default(),
            databases: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl InfluxConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_hosts(mut self, hosts: Vec<String>) -> Self {
        self.hosts = normalize_list(hosts);
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_databases(mut self, databases: Vec<String>) -> Self {
        self.databases = normalize_list(databases);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Trim entries, drop empty ones and duplicates, keep the first occurrence order.
#[must_use]
pub fn normalize_list<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for value in values {
        let value = value.as_ref().trim();
        if !value.is_empty() && !out.iter().any(|v| v == value) {
            out.push(value.to_string());
        }
    }
    out
}
