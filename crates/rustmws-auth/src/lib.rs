//! Signature Version 2 request signing for RustMWS.
//!
//! Every call to the marketplace service carries a `Signature` parameter
//! computed over a canonical form of the request:
//!
//! ```text
//! StringToSign = HTTP-Verb + "\n" +
//!                Host + "\n" +
//!                CanonicalPath + "\n" +
//!                CanonicalQueryString
//! ```
//!
//! `Signature = Base64(HMAC(SecretKey, StringToSign))` with SHA-1 or SHA-256.
//! The service validates the signature byte for byte, so the canonical form
//! must be reproduced exactly.
//!
//! # Usage
//!
//! ```rust
//! use rustmws_auth::{SignatureAlgorithm, sign};
//!
//! let params = [("Action", "ListOrders"), ("AWSAccessKeyId", "AK1")];
//! let signature = sign(
//!     "POST",
//!     "mws.amazonservices.com",
//!     "/Orders/2013-09-01",
//!     params,
//!     "SEC1",
//!     SignatureAlgorithm::HmacSha256,
//! )
//! .unwrap();
//! assert_eq!(signature.len(), 44);
//! ```
//!
//! # Modules
//!
//! - [`canonical`] - Canonical path, query string, and string-to-sign construction
//! - [`error`] - Signing error types
//! - [`signer`] - HMAC signature computation and verification

pub mod canonical;
pub mod error;
pub mod signer;

pub use error::SignError;
pub use signer::{SignatureAlgorithm, sign, sign_with, verify};
