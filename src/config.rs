//! Configuration types for background removal operations

use crate::error::{PureBgError, Result};
use crate::services::MatteFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";

/// Generative Language API base URL
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Environment variable holding the access credential
pub const API_KEY_ENV: &str = "API_KEY";

/// Channels strictly above this value in all of R, G and B become transparent
pub const DEFAULT_WHITE_THRESHOLD: u8 = 245;

/// Transport timeout for a single isolation call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Values that stand in for a real key in templates and deployment docs
const PLACEHOLDER_KEYS: &[&str] = &[
    "undefined",
    "null",
    "api_key",
    "placeholder_api_key",
    "your_api_key",
    "your-api-key",
    "sua_chave",
];

/// Where the access credential comes from
///
/// Exactly one source is consulted per call; there is no fallback chain.
/// The credential is resolved at call time, so changing the environment
/// between calls takes effect on the next call.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read the named environment variable
    Env(String),
    /// Use an explicit key supplied by the caller
    Static(String),
}

impl Default for CredentialSource {
    fn default() -> Self {
        Self::Env(API_KEY_ENV.to_string())
    }
}

// Keys must never end up in logs.
impl std::fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Env(var) => f.debug_tuple("Env").field(var).finish(),
            Self::Static(_) => f.debug_tuple("Static").field(&"<redacted>").finish(),
        }
    }
}

impl CredentialSource {
    /// Resolve the credential, treating missing and placeholder values as absent
    ///
    /// # Errors
    /// - `PureBgError::Config` when the key is absent, empty or a placeholder
    pub fn resolve(&self) -> Result<String> {
        let (value, origin) = match self {
            Self::Env(var) => (std::env::var(var).ok(), format!("environment variable {}", var)),
            Self::Static(key) => (Some(key.clone()), "explicit API key".to_string()),
        };

        match value {
            Some(key) if !is_placeholder_key(&key) => Ok(key.trim().to_string()),
            Some(_) => Err(PureBgError::config(format!(
                "The {} holds a placeholder value, not a real API key",
                origin
            ))),
            None => Err(PureBgError::config(format!("The {} is not set", origin))),
        }
    }
}

/// Whether a key is empty or an obvious template value
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    if key.is_empty() {
        return true;
    }
    let wrapped = (key.starts_with('<') && key.ends_with('>'))
        || (key.starts_with('[') && key.ends_with(']'))
        || (key.starts_with("${") && key.ends_with('}'));
    if wrapped {
        return true;
    }
    let lowered = key.to_ascii_lowercase();
    PLACEHOLDER_KEYS.contains(&lowered.as_str())
}

/// Configuration for background removal operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PureBgConfig {
    /// Remote model performing subject isolation
    pub model: String,

    /// API base URL, without trailing slash
    pub endpoint: String,

    /// Credential source; never serialized
    #[serde(skip)]
    pub credential: CredentialSource,

    /// White-key threshold for the alpha matte
    pub white_threshold: u8,

    /// Encoding of the matted result
    pub output_format: MatteFormat,

    /// Transport timeout for the remote call
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl Default for PureBgConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            credential: CredentialSource::default(),
            white_threshold: DEFAULT_WHITE_THRESHOLD,
            output_format: MatteFormat::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl PureBgConfig {
    /// Create a new configuration builder
    ///
    /// # Examples
    /// ```rust
    /// use purebg::PureBgConfig;
    ///
    /// let config = PureBgConfig::builder()
    ///     .white_threshold(242)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(config.white_threshold, 242);
    /// ```
    #[must_use]
    pub fn builder() -> PureBgConfigBuilder {
        PureBgConfigBuilder::new()
    }

    /// Validate configuration values
    ///
    /// # Errors
    /// - Empty model name
    /// - Endpoint that is not an http(s) URL
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(PureBgError::config("Model name must not be empty"));
        }
        if !(self.endpoint.starts_with("https://") || self.endpoint.starts_with("http://")) {
            return Err(PureBgError::config(format!(
                "Endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(PureBgError::config("Request timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for `PureBgConfig`
#[derive(Debug, Default)]
pub struct PureBgConfigBuilder {
    config: PureBgConfig,
}

impl PureBgConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn model<S: Into<String>>(mut self, model: S) -> Self {
        self.config.model = model.into();
        self
    }

    #[must_use]
    pub fn endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.config.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn credential(mut self, credential: CredentialSource) -> Self {
        self.config.credential = credential;
        self
    }

    /// Use an explicit key instead of the environment
    #[must_use]
    pub fn api_key<S: Into<String>>(self, key: S) -> Self {
        self.credential(CredentialSource::Static(key.into()))
    }

    #[must_use]
    pub fn white_threshold(mut self, threshold: u8) -> Self {
        self.config.white_threshold = threshold;
        self
    }

    #[must_use]
    pub fn output_format(mut self, format: MatteFormat) -> Self {
        self.config.output_format = format;
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Build the configuration
    ///
    /// The credential is not checked here; it is resolved on every call.
    ///
    /// # Errors
    /// - See [`PureBgConfig::validate`]
    pub fn build(self) -> Result<PureBgConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(crate) fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
