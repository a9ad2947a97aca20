//! HMAC signature computation.
//!
//! `Signature = Base64(HMAC(SecretKey, StringToSign))` where the HMAC digest is
//! SHA-1 for `HmacSHA1` and SHA-256 for `HmacSHA256`.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, KeyInit, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{build_canonical_query, build_string_to_sign};
use crate::error::SignError;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Supported HMAC algorithms, named as they appear in `SignatureMethod`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// `HmacSHA1`.
    HmacSha1,
    /// `HmacSHA256`.
    #[default]
    HmacSha256,
}

impl SignatureAlgorithm {
    /// Wire name of the algorithm.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha1 => "HmacSHA1",
            Self::HmacSha256 => "HmacSHA256",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SignError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HmacSHA1" => Ok(Self::HmacSha1),
            "HmacSHA256" => Ok(Self::HmacSha256),
            other => Err(SignError::UnsupportedAlgorithm(other.to_owned())),
        }
    }
}

/// Sign a request.
///
/// The parameters are taken in any order; they are sorted as part of
/// canonicalization. Any `Signature` entry must already be excluded by the
/// caller.
///
/// # Errors
///
/// Returns [`SignError::InvalidKey`] if the secret cannot key the HMAC.
pub fn sign<'a, I>(
    method: &str,
    host: &str,
    path: &str,
    params: I,
    secret_key: &str,
    algorithm: SignatureAlgorithm,
) -> Result<String, SignError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let query = build_canonical_query(params);
    let string_to_sign = build_string_to_sign(method, host, path, &query);

    debug!(string_to_sign = ?string_to_sign, %algorithm, "Built SigV2 string to sign");

    compute_signature(secret_key, &string_to_sign, algorithm)
}

/// Sign with an algorithm given by its wire name.
///
/// # Errors
///
/// Returns [`SignError::UnsupportedAlgorithm`] for any name other than
/// `HmacSHA1` or `HmacSHA256`.
pub fn sign_with<'a, I>(
    method: &str,
    host: &str,
    path: &str,
    params: I,
    secret_key: &str,
    algorithm: &str,
) -> Result<String, SignError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let algorithm = algorithm.parse()?;
    sign(method, host, path, params, secret_key, algorithm)
}

/// Check a provided signature against the expected one in constant time.
///
/// # Errors
///
/// Propagates signing failures; a mismatch is reported as `Ok(false)`.
pub fn verify<'a, I>(
    method: &str,
    host: &str,
    path: &str,
    params: I,
    secret_key: &str,
    algorithm: SignatureAlgorithm,
    provided: &str,
) -> Result<bool, SignError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let expected = sign(method, host, path, params, secret_key, algorithm)?;
    Ok(provided.as_bytes().ct_eq(expected.as_bytes()).into())
}

/// Compute `Base64(HMAC(secret, string_to_sign))`.
fn compute_signature(
    secret_key: &str,
    string_to_sign: &str,
    algorithm: SignatureAlgorithm,
) -> Result<String, SignError> {
    let digest = match algorithm {
        SignatureAlgorithm::HmacSha1 => {
            let mut mac =
                HmacSha1::new_from_slice(secret_key.as_bytes()).map_err(|_| SignError::InvalidKey)?;
            mac.update(string_to_sign.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
        SignatureAlgorithm::HmacSha256 => {
            let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
                .map_err(|_| SignError::InvalidKey)?;
            mac.update(string_to_sign.as_bytes());
            mac.finalize().into_bytes().to_vec()
        }
    };
    Ok(BASE64.encode(digest))
}
