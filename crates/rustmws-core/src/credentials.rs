//! Credential provider trait and the configuration-backed store.
//!
//! A [`Credential`] bundles everything needed to sign and address a request on
//! behalf of one seller account. Many can coexist in one process; they are
//! looked up by store name and never mutated after load.

use std::collections::HashMap;
use std::fmt;

use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};

/// Resolved credentials of one seller account.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    /// Store name this credential was registered under.
    pub store_id: String,
    /// Seller (merchant) id.
    pub merchant_id: String,
    /// Access key id.
    pub access_key_id: String,
    /// Secret key used for signing.
    pub secret_key: String,
    /// Default marketplace id.
    pub marketplace_id: String,
    /// Base URL requests are sent to (scheme and host, no trailing slash).
    pub endpoint: String,
    /// Delegated authorization token.
    pub auth_token: Option<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("store_id", &self.store_id)
            .field("merchant_id", &self.merchant_id)
            .field("access_key_id", &self.access_key_id)
            .field("secret_key", &"***")
            .field("marketplace_id", &self.marketplace_id)
            .field("endpoint", &self.endpoint)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Trait for resolving a store name to its credential.
///
/// Implementations may back this with a secrets manager, a database, or any
/// other source; [`CredentialStore`] is the in-memory table built from
/// [`EngineConfig`].
pub trait CredentialProvider: Send + Sync + fmt::Debug {
    /// Resolve a store name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] for an empty id and
    /// [`CoreError::StoreNotFound`] for an unknown one.
    fn resolve(&self, store_id: &str) -> CoreResult<Credential>;
}

/// Immutable credential table keyed by store name.
///
/// # Examples
///
/// ```
/// use rustmws_core::{CredentialProvider, CredentialStore, EngineConfig, StoreConfig};
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
///     .build();
///
/// let store = CredentialStore::from_config(&config).unwrap();
/// let credential = store.resolve("main").unwrap();
/// assert_eq!(credential.endpoint, "https://mws.amazonservices.com");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: HashMap<String, Credential>,
}

impl CredentialStore {
    /// Build a store from already-resolved credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Config`] if a credential is incomplete or two
    /// credentials share a store name.
    pub fn new(credentials: impl IntoIterator<Item = Credential>) -> CoreResult<Self> {
        let mut table = HashMap::new();
        for credential in credentials {
            validate_credential(&credential)?;
            let id = credential.store_id.clone();
            if table.insert(id.clone(), credential).is_some() {
                return Err(CoreError::Config(format!("duplicate store: {id}")));
            }
        }
        Ok(Self { credentials: table })
    }

    /// Build a store from every store in `config`.
    pub fn from_config(config: &EngineConfig) -> CoreResult<Self> {
        let credentials = config.stores.iter().map(|store| Credential {
            store_id: store.name.clone(),
            merchant_id: store.merchant_id.clone(),
            access_key_id: store.access_key_id.clone(),
            secret_key: store.secret_key.clone(),
            marketplace_id: store.marketplace_id.clone(),
            endpoint: normalize_endpoint(
                store
                    .endpoint
                    .as_deref()
                    .unwrap_or(&config.default_endpoint),
            ),
            auth_token: store.auth_token.clone().filter(|t| !t.is_empty()),
        });
        let store = Self::new(credentials)?;
        tracing::debug!(stores = store.len(), "loaded credential store");
        Ok(store)
    }

    /// Registered store names, sorted.
    #[must_use]
    pub fn store_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.credentials.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Number of registered stores.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    /// Whether no store is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }
}

impl CredentialProvider for CredentialStore {
    fn resolve(&self, store_id: &str) -> CoreResult<Credential> {
        if store_id.trim().is_empty() {
            return Err(CoreError::Config("store id must not be empty".to_owned()));
        }
        self.credentials
            .get(store_id)
            .cloned()
            .ok_or_else(|| CoreError::StoreNotFound(store_id.to_owned()))
    }
}

fn normalize_endpoint(endpoint: &str) -> String {
    endpoint.trim().trim_end_matches('/').to_owned()
}

fn validate_credential(credential: &Credential) -> CoreResult<()> {
    let required = [
        ("name", &credential.store_id),
        ("merchant id", &credential.merchant_id),
        ("access key id", &credential.access_key_id),
        ("secret key", &credential.secret_key),
        ("endpoint", &credential.endpoint),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(CoreError::Config(format!(
                "store {:?} is missing its {field}",
                credential.store_id
            )));
        }
    }
    if !(credential.endpoint.starts_with("https://") || credential.endpoint.starts_with("http://"))
    {
        return Err(CoreError::Config(format!(
            "store {} has an endpoint without http(s) scheme: {}",
            credential.store_id, credential.endpoint
        )));
    }
    Ok(())
}
