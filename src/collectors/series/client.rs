//! `InfluxDB` HTTP API client (0.8 `/db` endpoints).
//!
//! Clients are created per host and per cycle; nothing is pooled. Creating a client
//! does not touch the network, failures surface on the first request.

use super::error::CollectError;
use super::host::HostSpec;
use crate::collectors::config::Credentials;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Statement enumerating every series of the selected database.
pub const LIST_SERIES: &str = "list series";

/// One block of a query response.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct ResultBlock {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub points: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct DatabaseEntry {
    name: String,
}

/// Operations the collection cycle needs from a server connection.
pub trait InfluxClient: Send {
    /// Set the database used by subsequent queries. Not validated locally.
    fn select_database(&mut self, name: &str);

    fn list_databases(&self) -> BoxFuture<'_, Result<Vec<String>, CollectError>>;

    fn query<'a>(&'a self, statement: &'a str)
    -> BoxFuture<'a, Result<Vec<ResultBlock>, CollectError>>;
}

/// Creates one client per host.
pub trait Connector: Send + Sync {
    type Client: InfluxClient;

    /// # Errors
    ///
    /// Returns `CollectError::Connect` if the client cannot be built.
    fn connect(
        &self,
        host: &HostSpec,
        credentials: &Credentials,
    ) -> Result<Self::Client, CollectError>;
}

/// Builds [`HttpClient`]s sharing one request timeout.
#[derive(Clone, Copy, Debug)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Connector for HttpConnector {
    type Client = HttpClient;

    fn connect(
        &self,
        host: &HostSpec,
        credentials: &Credentials,
    ) -> Result<HttpClient, CollectError> {
        HttpClient::new(host, credentials, self.timeout)
    }
}

pub struct HttpClient {
    http: reqwest::Client,
    base: Url,
    endpoint: String,
    login: String,
    password: SecretString,
    database: Option<String>,
}

impl HttpClient {
    /// # Errors
    ///
    /// Returns `CollectError::Connect` if the base URL or the HTTP client cannot be built.
    pub fn new(
        host: &HostSpec,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self, CollectError> {
        let endpoint = host.endpoint();
        let connect_error = |reason: String| CollectError::Connect {
            host: endpoint.clone(),
            reason,
        };

        let base =
            Url::parse(&format!("http://{endpoint}/")).map_err(|e| connect_error(e.to_string()))?;

        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(|e| connect_error(e.to_string()))?;

        debug!(
            host = %endpoint,
            login = %credentials.login,
            "created influxdb client"
        );

        Ok(Self {
            http,
            base,
            login: credentials.login.clone(),
            password: SecretString::from(credentials.password.expose_secret().to_owned()),
            endpoint,
            database: None,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    fn url(&self, segments: &[&str], statement: Option<&str>) -> Result<Url, CollectError> {
        let mut url = self.base.clone();

        url.path_segments_mut()
            .map_err(|()| CollectError::Query {
                reason: format!("cannot build request url for {}", self.endpoint),
            })?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("u", &self.login);
            pairs.append_pair("p", self.password.expose_secret());
            if let Some(q) = statement {
                pairs.append_pair("q", q);
            }
        }

        Ok(url)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        database: Option<&str>,
    ) -> Result<T, CollectError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(|e| CollectError::Query {
                reason: format!(
                    "malformed response from {}: {}",
                    self.endpoint,
                    e.without_url()
                ),
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.status_error(status, &body, database))
    }

    // reqwest errors carry the url, which holds the password.
    // Only failing to connect (refused, unresolvable, connect timeout) abandons the host;
    // a request that times out after connecting fails that request alone.
    fn transport_error(&self, err: reqwest::Error) -> CollectError {
        let err = err.without_url();
        if err.is_connect() {
            CollectError::Connect {
                host: self.endpoint.clone(),
                reason: err.to_string(),
            }
        } else if err.is_timeout() {
            CollectError::Query {
                reason: format!("request to {} timed out", self.endpoint),
            }
        } else {
            CollectError::Query {
                reason: format!("request to {} failed: {err}", self.endpoint),
            }
        }
    }

    fn status_error(&self, status: StatusCode, body: &str, database: Option<&str>) -> CollectError {
        let body = body.trim();
        match (status, database) {
            (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => CollectError::Query {
                reason: format!(
                    "authentication failed on {} as user {} ({status})",
                    self.endpoint, self.login
                ),
            },
            (StatusCode::NOT_FOUND, Some(db)) => CollectError::UnknownDatabase {
                database: db.to_string(),
            },
            (StatusCode::BAD_REQUEST, Some(db))
                if body.contains("doesn't exist") || body.contains("does not exist") =>
            {
                CollectError::UnknownDatabase {
                    database: db.to_string(),
                }
            }
            _ => CollectError::Query {
                reason: format!("{} answered {status}: {body}", self.endpoint),
            },
        }
    }
}

impl InfluxClient for HttpClient {
    fn select_database(&mut self, name: &str) {
        self.database = Some(name.to_string());
    }

    fn list_databases(&self) -> BoxFuture<'_, Result<Vec<String>, CollectError>> {
        Box::pin(async move {
            let url = self.url(&["db"], None)?;
            let entries: Vec<DatabaseEntry> = self.get(url, None).await?;
            Ok(entries.into_iter().map(|entry| entry.name).collect())
        })
    }

    fn query<'a>(
        &'a self,
        statement: &'a str,
    ) -> BoxFuture<'a, Result<Vec<ResultBlock>, CollectError>> {
        Box::pin(async move {
            let database = self.database.as_deref().ok_or_else(|| CollectError::Query {
                reason: format!("no database selected on {}", self.endpoint),
            })?;

            let url = self.url(&["db", database, "series"], Some(statement))?;
            self.get(url, Some(database)).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(token: &str) -> HttpClient {
        let Ok(host) = HostSpec::parse(token) else {
            unreachable!("valid token");
        };
        let Ok(client) = HttpClient::new(&host, &Credentials::default(), Duration::from_secs(1))
        else {
            unreachable!("client builds without network access");
        };
        client
    }

    #[test]
    fn test_connect_is_lazy() {
        // nothing listens on this port, creation must still succeed
        let client = client("prod@127.0.0.1:1");
        assert_eq!(client.endpoint(), "127.0.0.1:1");
        assert_eq!(client.database(), None);
    }

    #[test]
    fn test_default_port_in_endpoint() {
        assert_eq!(client("influx").endpoint(), "influx:8086");
    }

    #[test]
    fn test_series_url() {
        let mut client = client("influx:8086");
        client.select_database("my db");

        let url = client.url(&["db", "my db", "series"], Some(LIST_SERIES));
        assert!(matches!(
            url,
            Ok(ref u) if u.as_str() == "http://influx:8086/db/my%20db/series?u=root&p=root&q=list+series"
        ));
    }

    #[test]
    fn test_database_list_url() {
        let client = client("influx:8086");
        let url = client.url(&["db"], None);
        assert!(matches!(
            url,
            Ok(ref u) if u.as_str() == "http://influx:8086/db?u=root&p=root"
        ));
    }

    #[test]
    fn test_status_mapping() {
        let client = client("influx");

        assert!(matches!(
            client.status_error(StatusCode::UNAUTHORIZED, "Invalid username/password", None),
            CollectError::Query { .. }
        ));
        assert!(matches!(
            client.status_error(StatusCode::NOT_FOUND, "", Some("metrics")),
            CollectError::UnknownDatabase { ref database } if database == "metrics"
        ));
        assert!(matches!(
            client.status_error(StatusCode::BAD_REQUEST, "Database metrics doesn't exist", Some("metrics")),
            CollectError::UnknownDatabase { .. }
        ));
        assert!(matches!(
            client.status_error(StatusCode::NOT_FOUND, "", None),
            CollectError::Query { .. }
        ));
        assert!(matches!(
            client.status_error(StatusCode::INTERNAL_SERVER_ERROR, "oops", Some("metrics")),
            CollectError::Query { ref reason } if reason.contains("oops")
        ));
    }

    #[test]
    fn test_result_block_decodes_without_columns() {
        let block: Result<Vec<ResultBlock>, _> =
            serde_json::from_str(r#"[{"name":"list_series_result","points":[[0,"cpu"],[0,"mem"]]}]"#);
        assert!(matches!(
            block,
            Ok(ref blocks) if blocks.len() == 1 && blocks.first().is_some_and(|b| b.points.len() == 2)
        ));
    }
}
