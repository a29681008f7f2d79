//! Test server harness for E2E testing
//!
//! Provides `TestValidatorServer` for spawning real token validator instances
//! in tests.

use common::secret::ExposeSecret;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use token_validator::auth::KeySet;
use token_validator::config::Config;
use token_validator::observability::metrics::init_metrics_recorder;
use token_validator::routes::{self, AppState};

/// Global metrics handle shared by every server in the test process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the token validator in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let keypair = TestKeypair::new(1, "key-1");
///     let server = TestValidatorServer::spawn(&jwks_json(&[keypair.jwk_json()])).await?;
///
///     let response = reqwest::get(format!("{}/v1/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestValidatorServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestValidatorServer {
    /// Spawn a server trusting the given key-set document.
    ///
    /// The server binds to a random available port (127.0.0.1:0) and runs
    /// until the harness is dropped.
    pub async fn spawn(jwks: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks, HashMap::new()).await
    }

    /// Spawn with extra environment-style configuration (e.g. `CORS_ORIGINS`).
    pub async fn spawn_with_vars(
        jwks: &str,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("JWTKS".to_string(), jwks.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_set = KeySet::from_json(config.key_set.expose_secret())
            .map_err(|e| anyhow::anyhow!("Failed to load key set: {}", e))?;

        let state = Arc::new(AppState::new(Arc::new(key_set), config.clone()));
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Full URL of the validation endpoint.
    pub fn validate_url(&self) -> String {
        format!("{}{}", self.url(), token_validator::handlers::VALIDATE_PATH)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestValidatorServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
