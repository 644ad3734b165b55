use anyhow::Result;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::json;
use std::collections::HashMap;
use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;

/// In-process server speaking the `InfluxDB` 0.8 `/db` endpoints.
#[derive(Clone)]
pub struct MockInflux {
    databases: Vec<(String, Option<usize>)>,
    delays: Vec<(String, Duration)>,
    login: String,
    password: String,
}

impl MockInflux {
    pub fn new() -> Self {
        Self {
            databases: Vec::new(),
            delays: Vec::new(),
            login: "root".to_string(),
            password: "root".to_string(),
        }
    }

    /// Add a database holding `series` series.
    pub fn with_database(mut self, name: &str, series: usize) -> Self {
        self.databases.push((name.to_string(), Some(series)));
        self
    }

    /// Add a database whose series query answers with zero result blocks.
    #[allow(dead_code)]
    pub fn with_empty_database(mut self, name: &str) -> Self {
        self.databases.push((name.to_string(), None));
        self
    }

    /// Add a database whose series query answers only after `delay`.
    #[allow(dead_code)]
    pub fn with_slow_database(mut self, name: &str, series: usize, delay: Duration) -> Self {
        self.delays.push((name.to_string(), delay));
        self.with_database(name, series)
    }

    /// Serve on an ephemeral port and return it.
    pub async fn start(self) -> Result<u16> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();

        let app = Router::new()
            .route("/db", get(list_databases))
            .route("/db/{db}/series", get(query_series))
            .with_state(Arc::new(self));

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(port)
    }

    fn authorized(&self, params: &HashMap<String, String>) -> bool {
        params.get("u") == Some(&self.login) && params.get("p") == Some(&self.password)
    }
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, "Invalid username/password").into_response()
}

async fn list_databases(
    State(mock): State<Arc<MockInflux>>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !mock.authorized(&params) {
        return unauthorized();
    }

    let names: Vec<_> = mock
        .databases
        .iter()
        .map(|(name, _)| json!({ "name": name }))
        .collect();

    Json(names).into_response()
}

async fn query_series(
    State(mock): State<Arc<MockInflux>>,
    Path(db): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !mock.authorized(&params) {
        return unauthorized();
    }

    if params.get("q").map(String::as_str) != Some("list series") {
        return (StatusCode::BAD_REQUEST, "unsupported query").into_response();
    }

    if let Some((_, delay)) = mock.delays.iter().find(|(name, _)| *name == db) {
        sleep(*delay).await;
    }

    match mock.databases.iter().find(|(name, _)| *name == db) {
        None => (StatusCode::BAD_REQUEST, format!("Database {db} doesn't exist")).into_response(),
        Some((_, None)) => Json(json!([])).into_response(),
        Some((_, Some(count))) => {
            let points: Vec<_> = (0..*count)
                .map(|i| json!([0, format!("series_{i}")]))
                .collect();
            Json(json!([{
                "name": "list_series_result",
                "columns": ["time", "name"],
                "points": points,
            }]))
            .into_response()
        }
    }
}

/// Get an available port for testing
#[allow(dead_code)]
pub fn get_available_port() -> u16 {
    StdTcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// A port nothing listens on
#[allow(dead_code)]
pub fn get_closed_port() -> u16 {
    get_available_port()
}

/// Build test URL for HTTP requests
#[allow(dead_code)]
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Wait for server to be ready
#[allow(dead_code)]
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}
