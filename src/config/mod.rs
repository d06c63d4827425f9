//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `BIOMATCH_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::constants::{
    DEFAULT_BATCH_TIMEOUT, DEFAULT_COMPARE_TIMEOUT, DEFAULT_FACE_DISTANCE_THRESHOLD,
    DEFAULT_FACE_MIN_CONFIDENCE, DEFAULT_FINGERPRINT_MIN_CONFIDENCE, DEFAULT_MATCH_CONCURRENCY,
    DEFAULT_REMOTE_FACE_MIN_CONFIDENCE, DEFAULT_WAKE_DELAY, FACE_DESCRIPTOR_DIM,
    MAX_MATCH_CONCURRENCY,
};
use crate::decision::DecisionPolicy;
use crate::fallback::FallbackConfig;
use crate::matcher::MatchOptions;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `BIOMATCH_*` overrides on top of defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Template store base URL. Default: `http://localhost:8090`.
    pub store_url: String,

    /// Sent as `X-Api-Key` to the template store.
    pub store_api_key: Option<String>,

    /// Remote face comparator. Unset means local descriptor matching.
    pub face_service_url: Option<String>,

    /// Remote fingerprint comparator. Default: `http://localhost:8081`.
    pub fingerprint_service_url: String,

    /// Audit sink endpoint. Unset disables auditing.
    pub audit_url: Option<String>,

    /// Maximum descriptor distance counted as a face match. Default: `0.5`.
    pub face_distance_threshold: f64,

    pub face_min_confidence: f64,
    pub remote_face_min_confidence: f64,
    pub fingerprint_min_confidence: f64,

    /// Face descriptor length. Default: `128`.
    pub descriptor_dim: usize,

    /// Comparisons in flight per request. Default: `1` (sequential).
    pub match_concurrency: usize,

    pub compare_timeout: Duration,
    pub batch_timeout: Duration,

    /// Pause after waking a sleeping comparator. Default: 4 s.
    pub wake_delay: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("store_url", &self.store_url)
            .field(
                "store_api_key",
                &self.store_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("face_service_url", &self.face_service_url)
            .field("fingerprint_service_url", &self.fingerprint_service_url)
            .field("audit_url", &self.audit_url)
            .field("face_distance_threshold", &self.face_distance_threshold)
            .field("face_min_confidence", &self.face_min_confidence)
            .field("remote_face_min_confidence", &self.remote_face_min_confidence)
            .field("fingerprint_min_confidence", &self.fingerprint_min_confidence)
            .field("descriptor_dim", &self.descriptor_dim)
            .field("match_concurrency", &self.match_concurrency)
            .field("compare_timeout", &self.compare_timeout)
            .field("batch_timeout", &self.batch_timeout)
            .field("wake_delay", &self.wake_delay)
            .finish()
    }
}

/// Default template store URL used when `BIOMATCH_STORE_URL` is not set.
pub const DEFAULT_STORE_URL: &str = "http://localhost:8090";

/// Default fingerprint service URL used when `BIOMATCH_FINGERPRINT_SERVICE_URL` is not set.
pub const DEFAULT_FINGERPRINT_SERVICE_URL: &str = "http://localhost:8081";

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            store_url: DEFAULT_STORE_URL.to_string(),
            store_api_key: None,
            face_service_url: None,
            fingerprint_service_url: DEFAULT_FINGERPRINT_SERVICE_URL.to_string(),
            audit_url: None,
            face_distance_threshold: DEFAULT_FACE_DISTANCE_THRESHOLD,
            face_min_confidence: DEFAULT_FACE_MIN_CONFIDENCE,
            remote_face_min_confidence: DEFAULT_REMOTE_FACE_MIN_CONFIDENCE,
            fingerprint_min_confidence: DEFAULT_FINGERPRINT_MIN_CONFIDENCE,
            descriptor_dim: FACE_DESCRIPTOR_DIM,
            match_concurrency: DEFAULT_MATCH_CONCURRENCY,
            compare_timeout: DEFAULT_COMPARE_TIMEOUT,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            wake_delay: DEFAULT_WAKE_DELAY,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "BIOMATCH_PORT";
    const ENV_BIND_ADDR: &'static str = "BIOMATCH_BIND_ADDR";
    const ENV_STORE_URL: &'static str = "BIOMATCH_STORE_URL";
    const ENV_STORE_API_KEY: &'static str = "BIOMATCH_STORE_API_KEY";
    const ENV_FACE_SERVICE_URL: &'static str = "BIOMATCH_FACE_SERVICE_URL";
    const ENV_FINGERPRINT_SERVICE_URL: &'static str = "BIOMATCH_FINGERPRINT_SERVICE_URL";
    const ENV_AUDIT_URL: &'static str = "BIOMATCH_AUDIT_URL";
    const ENV_FACE_DISTANCE_THRESHOLD: &'static str = "BIOMATCH_FACE_DISTANCE_THRESHOLD";
    const ENV_FACE_MIN_CONFIDENCE: &'static str = "BIOMATCH_FACE_MIN_CONFIDENCE";
    const ENV_REMOTE_FACE_MIN_CONFIDENCE: &'static str = "BIOMATCH_REMOTE_FACE_MIN_CONFIDENCE";
    const ENV_FINGERPRINT_MIN_CONFIDENCE: &'static str = "BIOMATCH_FINGERPRINT_MIN_CONFIDENCE";
    const ENV_DESCRIPTOR_DIM: &'static str = "BIOMATCH_DESCRIPTOR_DIM";
    const ENV_MATCH_CONCURRENCY: &'static str = "BIOMATCH_MATCH_CONCURRENCY";
    const ENV_COMPARE_TIMEOUT_SECS: &'static str = "BIOMATCH_COMPARE_TIMEOUT_SECS";
    const ENV_BATCH_TIMEOUT_SECS: &'static str = "BIOMATCH_BATCH_TIMEOUT_SECS";
    const ENV_WAKE_DELAY_MS: &'static str = "BIOMATCH_WAKE_DELAY_MS";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            store_url: Self::parse_string_from_env(Self::ENV_STORE_URL, defaults.store_url),
            store_api_key: Self::parse_optional_string_from_env(Self::ENV_STORE_API_KEY),
            face_service_url: Self::parse_optional_string_from_env(Self::ENV_FACE_SERVICE_URL),
            fingerprint_service_url: Self::parse_string_from_env(
                Self::ENV_FINGERPRINT_SERVICE_URL,
                defaults.fingerprint_service_url,
            ),
            audit_url: Self::parse_optional_string_from_env(Self::ENV_AUDIT_URL),
            face_distance_threshold: Self::parse_from_env(
                Self::ENV_FACE_DISTANCE_THRESHOLD,
                defaults.face_distance_threshold,
            )?,
            face_min_confidence: Self::parse_from_env(
                Self::ENV_FACE_MIN_CONFIDENCE,
                defaults.face_min_confidence,
            )?,
            remote_face_min_confidence: Self::parse_from_env(
                Self::ENV_REMOTE_FACE_MIN_CONFIDENCE,
                defaults.remote_face_min_confidence,
            )?,
            fingerprint_min_confidence: Self::parse_from_env(
                Self::ENV_FINGERPRINT_MIN_CONFIDENCE,
                defaults.fingerprint_min_confidence,
            )?,
            descriptor_dim: Self::parse_from_env(Self::ENV_DESCRIPTOR_DIM, defaults.descriptor_dim)?,
            match_concurrency: Self::parse_from_env(
                Self::ENV_MATCH_CONCURRENCY,
                defaults.match_concurrency,
            )?,
            compare_timeout: Duration::from_secs(Self::parse_from_env(
                Self::ENV_COMPARE_TIMEOUT_SECS,
                defaults.compare_timeout.as_secs(),
            )?),
            batch_timeout: Duration::from_secs(Self::parse_from_env(
                Self::ENV_BATCH_TIMEOUT_SECS,
                defaults.batch_timeout.as_secs(),
            )?),
            wake_delay: Duration::from_millis(Self::parse_from_env(
                Self::ENV_WAKE_DELAY_MS,
                defaults.wake_delay.as_millis() as u64,
            )?),
        })
    }

    /// Checks URLs and numeric ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Self::check_url(Self::ENV_STORE_URL, &self.store_url)?;
        Self::check_url(
            Self::ENV_FINGERPRINT_SERVICE_URL,
            &self.fingerprint_service_url,
        )?;
        if let Some(ref url) = self.face_service_url {
            Self::check_url(Self::ENV_FACE_SERVICE_URL, url)?;
        }
        if let Some(ref url) = self.audit_url {
            Self::check_url(Self::ENV_AUDIT_URL, url)?;
        }

        if !(self.face_distance_threshold.is_finite() && self.face_distance_threshold > 0.0) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_FACE_DISTANCE_THRESHOLD,
                reason: format!("{} must be a positive number", self.face_distance_threshold),
            });
        }

        for (name, value) in [
            (Self::ENV_FACE_MIN_CONFIDENCE, self.face_min_confidence),
            (
                Self::ENV_REMOTE_FACE_MIN_CONFIDENCE,
                self.remote_face_min_confidence,
            ),
            (
                Self::ENV_FINGERPRINT_MIN_CONFIDENCE,
                self.fingerprint_min_confidence,
            ),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    name,
                    reason: format!("{} is not a percentage", value),
                });
            }
        }

        if self.descriptor_dim == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_DESCRIPTOR_DIM,
                reason: "must be at least 1".to_string(),
            });
        }

        if !(1..=MAX_MATCH_CONCURRENCY).contains(&self.match_concurrency) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_MATCH_CONCURRENCY,
                reason: format!("must be between 1 and {}", MAX_MATCH_CONCURRENCY),
            });
        }

        if self.compare_timeout.is_zero() || self.batch_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_COMPARE_TIMEOUT_SECS,
                reason: "timeouts must be non-zero".to_string(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn match_options(&self) -> MatchOptions {
        MatchOptions::default()
            .with_concurrency(self.match_concurrency)
            .with_call_timeout(self.compare_timeout)
            .with_descriptor_dim(self.descriptor_dim)
    }

    pub fn fallback_config(&self) -> FallbackConfig {
        FallbackConfig::default()
            .with_wake_delay(self.wake_delay)
            .with_batch_timeout(self.batch_timeout)
    }

    /// Acceptance policy for face, which depends on where comparison runs.
    pub fn face_policy(&self) -> DecisionPolicy {
        match self.face_service_url {
            Some(_) => DecisionPolicy::new(self.remote_face_min_confidence),
            None => DecisionPolicy::new(self.face_min_confidence),
        }
    }

    pub fn fingerprint_policy(&self) -> DecisionPolicy {
        DecisionPolicy::new(self.fingerprint_min_confidence)
    }

    fn check_url(name: &'static str, value: &str) -> Result<(), ConfigError> {
        if value.starts_with("http://") || value.starts_with("https://") {
            Ok(())
        } else {
            Err(ConfigError::InvalidUrl {
                name,
                value: value.to_string(),
            })
        }
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: e.to_string(),
                }),
            Err(_) => Ok(default),
        }
    }
}
