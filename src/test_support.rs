// Helpers for tests that need a real HTTP peer.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;

use crate::config::{AuthConfig, Config, DatabaseConfig, Environment, HttpConfig, ScoringConfig, StorageConfig};

/// One request seen by a fake upstream.
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<Recorded>>>);

impl Recorder {
    pub fn push(&self, call: Recorded) {
        self.0.lock().unwrap().push(call);
    }

    pub fn take(&self) -> Vec<Recorded> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

/// Serves `router` on an ephemeral localhost port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}

/// Settings for router tests. Storage and both graders live under
/// `upstream`. The HS256 secret is fixed so tests can mint tokens.
pub fn config(database: DatabaseConfig, upstream: &str) -> Config {
    Config {
        port: 0,
        environment: Environment::Local,
        database,
        auth: AuthConfig {
            secret: "router-test-secret-value".to_string(),
            token_ttl: Duration::from_secs(3600),
            bcrypt_cost: 4,
        },
        storage: StorageConfig {
            bucket: "lingo-test".to_string(),
            key_file: None,
            access_token: Some("static-token".to_string()),
            upload_endpoint: upstream.to_string(),
            public_url: upstream.to_string(),
        },
        scoring: ScoringConfig {
            spelling_url: format!("{}/spelling", upstream),
            pronunciation_url: format!("{}/pronunciation", upstream),
            timeout: Duration::from_secs(5),
        },
        http: HttpConfig {
            cors_origins: vec!["http://127.0.0.1:8091".to_string()],
            request_timeout: Duration::from_secs(10),
        },
    }
}

/// Nothing listens on port 1, so every query and upstream call fails fast.
pub fn offline_config() -> Config {
    config(
        DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            database: "lingo".to_string(),
            username: "lingo".to_string(),
            password: "lingo".to_string(),
            ssl_mode: "disable".to_string(),
            max_connections: 1,
            connection_timeout: Duration::from_secs(1),
            connection_string: None,
        },
        "http://127.0.0.1:1",
    )
}
