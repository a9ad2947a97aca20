//! Engine configuration.
//!
//! Configuration is an explicit value passed to the engine constructor. It can
//! be built in code with the typed builder, parsed from a JSON document, or
//! loaded from environment variables for the single-store case.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::error::{CoreError, CoreResult};
use crate::types::{ThrottleCategory, ThrottleProfile, ThrottleProfiles, ThrottleScope};

/// Default service endpoint (North America).
pub const DEFAULT_ENDPOINT: &str = "https://mws.amazonservices.com";
/// Default signing algorithm.
pub const DEFAULT_SIGNATURE_ALGORITHM: &str = "HmacSHA256";
/// Default application name reported in the `User-Agent` header.
pub const DEFAULT_APPLICATION_NAME: &str = "rustmws";
/// Default HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Credentials and endpoint of one seller account.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Name the store is looked up by.
    #[builder(setter(into))]
    pub name: String,
    /// Seller (merchant) id.
    #[builder(setter(into))]
    pub merchant_id: String,
    /// Access key id.
    #[builder(setter(into))]
    pub access_key_id: String,
    /// Secret key used for signing.
    #[builder(setter(into))]
    pub secret_key: String,
    /// Default marketplace id.
    #[builder(default, setter(into))]
    #[serde(default)]
    pub marketplace_id: String,
    /// Endpoint override; falls back to [`EngineConfig::default_endpoint`].
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Delegated authorization token, sent as `MWSAuthToken`.
    #[builder(default, setter(strip_option, into))]
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("merchant_id", &self.merchant_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"***")
            .field("marketplace_id", &self.marketplace_id)
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Engine configuration.
///
/// # Examples
///
/// ```
/// use rustmws_core::{EngineConfig, StoreConfig, ThrottleScope};
///
/// let config = EngineConfig::builder()
///     .stores(vec![
///         StoreConfig::builder()
///             .name("main")
///             .merchant_id("M1")
///             .access_key_id("AK1")
///             .secret_key("SEC1")
///             .build(),
///     ])
///     .throttle_scope(ThrottleScope::Shared)
///     .build();
///
/// assert_eq!(config.default_endpoint, "https://mws.amazonservices.com");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Seller accounts available to this engine.
    #[builder(default)]
    pub stores: Vec<StoreConfig>,

    /// Endpoint used by stores that do not set their own.
    #[builder(default = String::from(DEFAULT_ENDPOINT), setter(into))]
    pub default_endpoint: String,

    /// `HmacSHA256` or `HmacSHA1`.
    #[builder(default = String::from(DEFAULT_SIGNATURE_ALGORITHM), setter(into))]
    pub signature_algorithm: String,

    /// Add one token and one second to every throttle profile.
    #[builder(default = false)]
    pub safe_mode: bool,

    /// Whether requests share throttle buckets.
    #[builder(default)]
    pub throttle_scope: ThrottleScope,

    /// Per-category replacements for the built-in profiles.
    #[builder(default)]
    pub throttle_overrides: HashMap<ThrottleCategory, ThrottleProfile>,

    /// Application name reported in the `User-Agent` header.
    #[builder(default = String::from(DEFAULT_APPLICATION_NAME), setter(into))]
    pub application_name: String,

    /// Application version reported in the `User-Agent` header.
    #[builder(default = String::from(env!("CARGO_PKG_VERSION")), setter(into))]
    pub application_version: String,

    /// HTTP request timeout.
    #[builder(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,

    /// Directory that file-backed mock fixtures are resolved against.
    #[builder(default, setter(strip_option, into))]
    pub mock_fixture_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stores: Vec::new(),
            default_endpoint: String::from(DEFAULT_ENDPOINT),
            signature_algorithm: String::from(DEFAULT_SIGNATURE_ALGORITHM),
            safe_mode: false,
            throttle_scope: ThrottleScope::default(),
            throttle_overrides: HashMap::new(),
            application_name: String::from(DEFAULT_APPLICATION_NAME),
            application_version: String::from(env!("CARGO_PKG_VERSION")),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            mock_fixture_dir: None,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON configuration document.
    pub fn from_json_str(document: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded engine configuration");
        Self::from_json_str(&document)
    }

    /// Load a single-store configuration from environment variables.
    ///
    /// | Variable | Meaning |
    /// |----------|---------|
    /// | `MWS_STORE` | store name (default `default`) |
    /// | `MWS_MERCHANT_ID` | seller id |
    /// | `MWS_ACCESS_KEY_ID` | access key id |
    /// | `MWS_SECRET_KEY` | secret key |
    /// | `MWS_MARKETPLACE_ID` | marketplace id |
    /// | `MWS_AUTH_TOKEN` | delegated auth token |
    /// | `MWS_ENDPOINT` | default endpoint |
    /// | `MWS_SAFE_MODE` | `1`/`true` enables safe mode |
    /// | `MWS_THROTTLE_SCOPE` | `per-request` or `shared` |
    ///
    /// No store is registered when the three credential variables are unset.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CoreResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("MWS_ENDPOINT") {
            config.default_endpoint = v;
        }
        if let Some(v) = lookup("MWS_SAFE_MODE") {
            config.safe_mode = parse_bool(&v);
        }
        if let Some(v) = lookup("MWS_THROTTLE_SCOPE") {
            config.throttle_scope = v.parse()?;
        }

        let merchant = lookup("MWS_MERCHANT_ID");
        let access_key = lookup("MWS_ACCESS_KEY_ID");
        let secret = lookup("MWS_SECRET_KEY");
        match (merchant, access_key, secret) {
            (Some(merchant_id), Some(access_key_id), Some(secret_key)) => {
                config.stores.push(StoreConfig {
                    name: lookup("MWS_STORE").unwrap_or_else(|| "default".to_owned()),
                    merchant_id,
                    access_key_id,
                    secret_key,
                    marketplace_id: lookup("MWS_MARKETPLACE_ID").unwrap_or_default(),
                    endpoint: None,
                    auth_token: lookup("MWS_AUTH_TOKEN"),
                });
            }
            (None, None, None) => {}
            _ => {
                return Err(CoreError::Config(
                    "MWS_MERCHANT_ID, MWS_ACCESS_KEY_ID and MWS_SECRET_KEY must be set together"
                        .to_owned(),
                ));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the engine cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.default_endpoint.trim().is_empty() {
            return Err(CoreError::Config("default endpoint must not be empty".to_owned()));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request timeout must be greater than zero".to_owned(),
            ));
        }
        if self.application_name.trim().is_empty() {
            return Err(CoreError::Config("application name must not be empty".to_owned()));
        }
        for (category, profile) in &self.throttle_overrides {
            if profile.max_tokens == 0 {
                return Err(CoreError::Config(format!(
                    "throttle profile for {category} must allow at least one request"
                )));
            }
        }
        Ok(())
    }

    /// Effective throttle profiles.
    #[must_use]
    pub fn throttle_profiles(&self) -> ThrottleProfiles {
        ThrottleProfiles::new(self.throttle_overrides.clone(), self.safe_mode)
    }

    /// Value of the `User-Agent` header.
    #[must_use]
    pub fn user_agent(&self) -> String {
        format!(
            "{}/{} (Language=Rust)",
            self.application_name, self.application_version
        )
    }
}

fn parse_bool(s: &str) -> bool {
    matches!(s, "1" | "true" | "yes" | "TRUE" | "YES")
}
