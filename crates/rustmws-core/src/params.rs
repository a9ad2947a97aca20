//! Request parameter map.
//!
//! Parameters are kept in a [`BTreeMap`], so iteration is always in byte-wise
//! key order, which is the order the canonical query string needs.

use std::collections::BTreeMap;

/// Well-known parameter names.
pub mod keys {
    /// Caller's access key.
    pub const ACCESS_KEY_ID: &str = "AWSAccessKeyId";
    /// Operation name.
    pub const ACTION: &str = "Action";
    /// Merchant id for most APIs.
    pub const SELLER_ID: &str = "SellerId";
    /// Merchant id for the feeds and reports APIs.
    pub const MERCHANT: &str = "Merchant";
    /// Delegated authorization token.
    pub const AUTH_TOKEN: &str = "MWSAuthToken";
    /// HMAC algorithm name.
    pub const SIGNATURE_METHOD: &str = "SignatureMethod";
    /// Signature scheme version.
    pub const SIGNATURE_VERSION: &str = "SignatureVersion";
    /// Computed signature.
    pub const SIGNATURE: &str = "Signature";
    /// Request timestamp.
    pub const TIMESTAMP: &str = "Timestamp";
    /// API version.
    pub const VERSION: &str = "Version";
    /// Continuation token.
    pub const NEXT_TOKEN: &str = "NextToken";
}

/// Keys that survive the switch to a `-ByNextToken` operation.
///
/// Every business filter from the first page is dropped; the service rejects
/// continuation calls that repeat them.
pub const CONTINUATION_ALLOWLIST: &[&str] = &[
    keys::ACCESS_KEY_ID,
    keys::ACTION,
    keys::SELLER_ID,
    keys::MERCHANT,
    keys::AUTH_TOKEN,
    keys::SIGNATURE_METHOD,
    keys::SIGNATURE_VERSION,
    keys::NEXT_TOKEN,
    keys::TIMESTAMP,
    keys::VERSION,
];

/// Ordered string-to-string parameter map with narrow mutation methods.
///
/// # Examples
///
/// ```
/// use rustmws_core::RequestParameters;
///
/// let mut params = RequestParameters::new();
/// params
///     .set("CreatedAfter", "2024-01-01T00:00:00Z")
///     .set_list("MarketplaceId.Id", ["ATVPDKIKX0DER", "A2EUQ1WTGCTBG2"]);
///
/// assert_eq!(params.get("MarketplaceId.Id.2"), Some("A2EUQ1WTGCTBG2"));
/// params.reset_to_allowlist();
/// assert!(params.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParameters {
    inner: BTreeMap<String, String>,
}

impl RequestParameters {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.inner.insert(key.into(), value.into());
        self
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove a parameter, returning its previous value.
    pub fn unset(&mut self, key: &str) -> Option<String> {
        self.inner.remove(key)
    }

    /// Look up a parameter.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.inner.get(key).map(String::as_str)
    }

    /// Whether a parameter is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.inner.contains_key(key)
    }

    /// Set an indexed list (`Prefix.1`, `Prefix.2`, ...), replacing any
    /// previous entries under the same prefix.
    pub fn set_list<I, V>(&mut self, prefix: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.remove_prefix(prefix);
        for (i, value) in values.into_iter().enumerate() {
            self.inner.insert(format!("{prefix}.{}", i + 1), value.into());
        }
        self
    }

    /// Remove every `Prefix.*` entry.
    pub fn remove_prefix(&mut self, prefix: &str) -> &mut Self {
        let dotted = format!("{prefix}.");
        self.inner.retain(|k, _| !k.starts_with(&dotted));
        self
    }

    /// Keep only the listed keys.
    pub fn retain_allowed(&mut self, allowed: &[&str]) -> &mut Self {
        self.inner.retain(|k, _| allowed.contains(&k.as_str()));
        self
    }

    /// Narrow to [`CONTINUATION_ALLOWLIST`].
    pub fn reset_to_allowlist(&mut self) -> &mut Self {
        self.retain_allowed(CONTINUATION_ALLOWLIST)
    }

    /// Iterate in byte-wise key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over keys in byte-wise order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(String::as_str)
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RequestParameters {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
