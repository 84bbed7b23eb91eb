use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::assessment::types::LevelProbabilities;
use crate::services::circuit_breaker::{CircuitBreaker, CircuitState};

const DEFAULT_BASE_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 1_000;
const MAX_BACKOFF_MS: u64 = 10_000;
const BACKOFF_JITTER_RATIO: f64 = 0.1;
const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
const DEFAULT_RESET_TIMEOUT_MS: u64 = 60_000;
const DEFAULT_CACHE_TTL_MS: u64 = 300_000;
const ASSESS_COMPETENCY_PATH: &str = "/ml/assess-competency";

#[derive(Debug, Clone)]
pub struct MlServiceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Deadline for one competency prediction, retries included.
    pub timeout: Duration,
    /// Total POST attempts per prediction, the first one included.
    pub max_attempts: u32,
    pub retry_backoff: Duration,
    pub failure_threshold: u32,
    pub reset_timeout: Duration,
    pub cache_ttl: Duration,
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            reset_timeout: Duration::from_millis(DEFAULT_RESET_TIMEOUT_MS),
            cache_ttl: Duration::from_millis(DEFAULT_CACHE_TTL_MS),
        }
    }
}

impl MlServiceConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env_string("ML_SERVICE_URL").unwrap_or(defaults.base_url),
            api_key: env_string("ML_API_KEY"),
            timeout: env_millis("ML_SERVICE_TIMEOUT").unwrap_or(defaults.timeout),
            max_attempts: env_u64("ML_MAX_RETRIES")
                .map(|v| v as u32)
                .unwrap_or(defaults.max_attempts),
            retry_backoff: env_millis("ML_RETRY_BACKOFF").unwrap_or(defaults.retry_backoff),
            failure_threshold: env_u64("ML_FAILURE_THRESHOLD")
                .map(|v| v as u32)
                .unwrap_or(defaults.failure_threshold),
            reset_timeout: env_millis("ML_RESET_TIMEOUT").unwrap_or(defaults.reset_timeout),
            cache_ttl: env_millis("ML_CACHE_TTL").unwrap_or(defaults.cache_ttl),
        }
    }
}

#[derive(Debug, Error)]
pub enum MlServiceError {
    #[error("ML service not configured: {0}")]
    NotConfigured(&'static str),
    #[error("ML service circuit breaker is OPEN")]
    CircuitOpen,
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: reqwest::StatusCode, body: String },
    #[error("JSON decode failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Correctness of one answer, tagged with its skill category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSignal {
    pub correct: bool,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetencyRequest {
    pub user_id: String,
    pub responses: Vec<ResponseSignal>,
    pub timings: Vec<f64>,
    pub confidence: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<CompetencyReplyData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetencyReplyData {
    /// Ordinal 1..4 from the service; level names are tolerated too.
    pub competency_level: serde_json::Value,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probabilities: Option<LevelProbabilities>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
}

/// The external competency-assessment capability.
#[async_trait]
pub trait CompetencyModel: Send + Sync {
    async fn assess_competency(
        &self,
        request: &CompetencyRequest,
    ) -> Result<CompetencyReply, MlServiceError>;
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MlHealth {
    pub available: bool,
    pub circuit_state: CircuitState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

struct CachedReply {
    reply: CompetencyReply,
    stored_at: Instant,
}

/// HTTP client for the Python ML microservice.
pub struct MlServiceClient {
    config: MlServiceConfig,
    client: reqwest::Client,
    breaker: CircuitBreaker,
    cache: Mutex<HashMap<String, CachedReply>>,
}

impl MlServiceClient {
    pub fn new(config: MlServiceConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        let breaker = CircuitBreaker::new(config.failure_threshold, config.reset_timeout);

        Self {
            config,
            client,
            breaker,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(MlServiceConfig::from_env())
    }

    pub fn config(&self) -> &MlServiceConfig {
        &self.config
    }

    pub fn is_available(&self) -> bool {
        !self.config.base_url.trim().is_empty()
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub async fn check_health(&self) -> MlHealth {
        let circuit_state = self.breaker.state();
        let url = format!("{}/health", self.config.base_url.trim_end_matches('/'));

        let result = async {
            let resp = self.authorized(self.client.get(&url)).send().await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(MlServiceError::HttpStatus { status, body });
            }
            Ok::<_, MlServiceError>(resp.json::<serde_json::Value>().await?)
        }
        .await;

        match result {
            Ok(detail) => MlHealth {
                available: true,
                circuit_state,
                detail: Some(detail),
                error: None,
            },
            Err(e) => MlHealth {
                available: false,
                circuit_state,
                detail: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => builder.header("X-API-Key", key),
            None => builder,
        }
    }

    fn cached(&self, key: &str) -> Option<CompetencyReply> {
        let cache = self.cache.lock();
        let entry = cache.get(key)?;
        if entry.stored_at.elapsed() < self.config.cache_ttl {
            debug!("competency cache hit");
            Some(entry.reply.clone())
        } else {
            None
        }
    }

    fn store(&self, key: String, reply: &CompetencyReply) {
        if self.config.cache_ttl.is_zero() {
            return;
        }
        let ttl = self.config.cache_ttl;
        let mut cache = self.cache.lock();
        cache.retain(|_, entry| entry.stored_at.elapsed() < ttl);
        cache.insert(
            key,
            CachedReply {
                reply: reply.clone(),
                stored_at: Instant::now(),
            },
        );
    }

    async fn post_with_retry(&self, payload: &CompetencyRequest) -> Result<CompetencyReply, MlServiceError> {
        if !self.breaker.allow_request() {
            return Err(MlServiceError::CircuitOpen);
        }

        let url = format!(
            "{}{}",
            self.config.base_url.trim_end_matches('/'),
            ASSESS_COMPETENCY_PATH
        );

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1_u32;
        loop {
            let err = match self.authorized(self.client.post(&url)).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let bytes = resp.bytes().await?;
                        return match serde_json::from_slice::<CompetencyReply>(&bytes) {
                            Ok(reply) => {
                                self.breaker.record_success();
                                Ok(reply)
                            }
                            Err(e) => {
                                self.breaker.record_failure();
                                tracing::error!(error = %e, "failed to parse ML service response");
                                Err(MlServiceError::Json(e))
                            }
                        };
                    }
                    let body = resp.text().await.unwrap_or_default();
                    let retryable = is_retryable(status);
                    let err = MlServiceError::HttpStatus { status, body };
                    if !retryable {
                        self.breaker.record_failure();
                        return Err(err);
                    }
                    err
                }
                Err(e) => MlServiceError::Request(e),
            };

            self.breaker.record_failure();
            if attempt >= max_attempts || self.breaker.state() == CircuitState::Open {
                return Err(err);
            }

            let backoff = backoff_for(self.config.retry_backoff, attempt - 1);
            warn!(attempt, max_attempts, backoff_ms = backoff.as_millis() as u64, error = %err, "ML service request failed, retrying");
            sleep(backoff).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl CompetencyModel for MlServiceClient {
    async fn assess_competency(
        &self,
        request: &CompetencyRequest,
    ) -> Result<CompetencyReply, MlServiceError> {
        if !self.is_available() {
            return Err(MlServiceError::NotConfigured("ML_SERVICE_URL"));
        }

        let key = serde_json::to_string(request)?;
        if let Some(reply) = self.cached(&key) {
            return Ok(reply);
        }

        let reply = self.post_with_retry(request).await?;
        if reply.success {
            self.store(key, &reply);
        }
        Ok(reply)
    }
}

fn backoff_for(base: Duration, retry: u32) -> Duration {
    let exp = base.as_millis() as u64 * (1_u64 << retry.min(16));
    let capped = exp.min(MAX_BACKOFF_MS);
    let jitter = (capped as f64 * rand::rng().random_range(0.0..=BACKOFF_JITTER_RATIO)) as u64;
    Duration::from_millis(capped + jitter)
}

fn is_retryable(status: reqwest::StatusCode) -> bool {
    status == reqwest::StatusCode::TOO_MANY_REQUESTS
        || status == reqwest::StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u64(key: &str) -> Option<u64> {
    env_string(key)?.parse().ok()
}

fn env_millis(key: &str) -> Option<Duration> {
    env_u64(key).map(Duration::from_millis)
}
