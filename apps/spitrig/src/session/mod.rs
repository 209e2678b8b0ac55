use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub mod retry;
pub use retry::RetryPolicy;

/// Start statuses the broker is known to send.
const STATUS_OK: &str = "OK";
const STATUS_ERROR: &str = "ERROR";

#[derive(Clone, Debug)]
pub struct SessionConfig {
    base_url: Url,
    app_id: String,
    extra_query: Option<String>,
}

impl SessionConfig {
    pub fn new(
        server_base_url: impl AsRef<str>,
        app_id: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let mut base = server_base_url.as_ref().trim().to_string();
        if base.is_empty() {
            return Err(SessionError::InvalidConfig(
                "session broker base url cannot be empty".into(),
            ));
        }
        if !base.contains("://") {
            let inferred_scheme = infer_scheme(&base);
            base = format!("{inferred_scheme}{base}");
        }
        let parsed = Url::parse(&base)
            .map_err(|err| SessionError::InvalidConfig(format!("invalid broker url: {err}")))?;
        Ok(Self {
            base_url: parsed,
            app_id: app_id.into(),
            extra_query: None,
        })
    }

    /// Query string forwarded verbatim to the start endpoint, the way the
    /// panel page forwards its own query string.
    pub fn with_extra_query(mut self, query: Option<String>) -> Self {
        self.extra_query = query.filter(|q| !q.is_empty());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// The bazaar start endpoint: `<base>/bazaar?start=<app_id>`, with any
    /// pass-through query appended after a second `?`.
    pub fn start_url(&self) -> Result<Url, SessionError> {
        let mut url = self.base_url.join("bazaar").map_err(|err| {
            SessionError::InvalidConfig(format!("invalid bazaar endpoint: {err}"))
        })?;
        let mut query = format!("start={}", self.app_id);
        if let Some(extra) = &self.extra_query {
            query.push('?');
            query.push_str(extra);
        }
        url.set_query(Some(&query));
        Ok(url)
    }
}

fn infer_scheme(base: &str) -> &'static str {
    let host_part = base.split('/').next().unwrap_or(base);
    let host_lower = host_part.to_ascii_lowercase();
    if host_lower.starts_with("localhost")
        || host_lower.starts_with("127.")
        || host_lower.starts_with("10.")
        || host_lower.starts_with("192.168.")
        || host_lower
            .strip_prefix("172.")
            .and_then(|rest| rest.split('.').next())
            .and_then(|octet| octet.parse::<u8>().ok())
            .map(|octet| (16..32).contains(&octet))
            .unwrap_or(false)
    {
        "http://"
    } else {
        "https://"
    }
}

/// Broker reply to a start request. Anything other than `status == "OK"`
/// keeps the sequencer retrying.
#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    pub status: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
    #[error("session start gave up after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn start_session(&self, url: &Url) -> Result<StartResponse, SessionError>;
}

pub struct ReqwestSessionBackend {
    client: reqwest::Client,
}

impl ReqwestSessionBackend {
    pub fn new() -> Result<Self, SessionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(8))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SessionBackend for ReqwestSessionBackend {
    async fn start_session(&self, url: &Url) -> Result<StartResponse, SessionError> {
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(SessionError::HttpStatus(response.status()));
        }
        Ok(response.json::<StartResponse>().await?)
    }
}

/// Runs start attempts against the broker until one succeeds.
///
/// Invoked once at startup; the caller treats it as fire-and-forget. Every
/// failure is logged and retried under the [`RetryPolicy`], and only a
/// bounded policy can make `run` return an error.
pub struct BootstrapSequencer {
    config: Arc<SessionConfig>,
    backend: Arc<dyn SessionBackend>,
    policy: RetryPolicy,
}

impl BootstrapSequencer {
    pub fn new(config: SessionConfig) -> Result<Self, SessionError> {
        let backend = Arc::new(ReqwestSessionBackend::new()?);
        Ok(Self {
            config: Arc::new(config),
            backend,
            policy: RetryPolicy::default(),
        })
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[cfg(test)]
    fn with_backend(
        config: SessionConfig,
        backend: Arc<dyn SessionBackend>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            policy,
        }
    }

    /// Resolves once the broker reports the session started. This is the
    /// connect-now signal for the channel manager.
    pub async fn run(&self) -> Result<(), SessionError> {
        let url = self.config.start_url()?;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.backend.start_session(&url).await {
                Ok(response) if response.status == STATUS_OK => {
                    tracing::debug!(
                        target: "spitrig::session",
                        app_id = %self.config.app_id(),
                        attempt,
                        "session started"
                    );
                    return Ok(());
                }
                Ok(response) if response.status == STATUS_ERROR => {
                    let reason = response
                        .reason
                        .unwrap_or_else(|| "could not start the application".to_string());
                    tracing::warn!(target: "spitrig::session", %reason, "broker rejected start");
                }
                Ok(response) => {
                    tracing::warn!(
                        target: "spitrig::session",
                        status = %response.status,
                        "unrecognized start status"
                    );
                }
                Err(err) => {
                    tracing::warn!(target: "spitrig::session", error = %err, "start request failed");
                }
            }

            match self.policy.next_delay(attempt) {
                // Fresh attempt on the next loop tick, never a tight loop.
                Some(delay) if delay.is_zero() => tokio::task::yield_now().await,
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(SessionError::RetriesExhausted { attempts: attempt }),
            }
        }
    }
}
