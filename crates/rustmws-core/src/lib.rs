//! Core types, configuration, and credential lookup for RustMWS.
//!
//! This crate provides the foundational building blocks shared by the signer
//! and the request engine: explicit engine configuration (no ambient globals),
//! the multi-store credential table, operation descriptors, throttle profiles,
//! and the request parameter map that every operation builds on.

mod config;
mod credentials;
mod error;
pub mod operations;
mod params;
mod types;

pub use config::{EngineConfig, StoreConfig};
pub use credentials::{Credential, CredentialProvider, CredentialStore};
pub use error::{CoreError, CoreResult};
pub use params::{CONTINUATION_ALLOWLIST, RequestParameters, keys};
pub use types::{
    NEXT_TOKEN_SUFFIX, OperationDescriptor, ThrottleCategory, ThrottleProfile, ThrottleProfiles,
    ThrottleScope,
};
