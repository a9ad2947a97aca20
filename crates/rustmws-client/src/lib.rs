//! Signed request engine for the Amazon Marketplace Web Service.
//!
//! Every outbound call goes through the same pipeline: resolve the store's
//! credentials, inject the managed parameters, wait for throttle budget, sign
//! with Signature Version 2, then send over HTTP or serve from the mock
//! harness. List operations are driven through their `-ByNextToken`
//! continuation pages by the [`ContinuationDriver`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use rustmws_client::{MwsClient, ParsedPage, xml};
//! use rustmws_core::{EngineConfig, operations};
//!
//! # async fn run() -> Result<(), rustmws_client::MwsError> {
//! let client = MwsClient::new(EngineConfig::from_env()?)?;
//! let mut request = client
//!     .request("default", operations::LIST_ORDERS)?
//!     .param("CreatedAfter", "2024-01-01T00:00:00Z");
//! request.set_default_marketplace("MarketplaceId.Id.1");
//!
//! let orders = request
//!     .paginate(|response| {
//!         Ok(ParsedPage::new(
//!             xml::element_texts(&response.body, "AmazonOrderId")?,
//!             xml::next_token(&response.body)?,
//!         ))
//!     })
//!     .await?;
//! println!("{} orders", orders.items.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`client`] - Engine entry point and per-call request objects
//! - [`error`] - Engine error types
//! - [`executor`] - Parameter injection, signing, and HTTP transport
//! - [`mock`] - Offline response harness
//! - [`pagination`] - Continuation driver for list operations
//! - [`throttle`] - Token buckets per operation category
//! - [`xml`] - Helpers for reading XML response bodies

pub mod client;
pub mod error;
pub mod executor;
pub mod mock;
pub mod pagination;
pub mod throttle;
pub mod xml;

pub use client::{MwsClient, Request};
pub use error::{MwsError, MwsResult};
pub use executor::{
    Call, FORM_CONTENT_TYPE, RawResponse, RequestExecutor, ResponseMetadata, SignedRequest,
};
pub use mock::{MockFixture, MockHarness, MockResponse};
pub use pagination::{ContinuationDriver, FetchResult, PageSource, PaginationError, ParsedPage};
pub use throttle::{ThrottleBucket, ThrottleRegistry};
pub use xml::ServiceFault;
