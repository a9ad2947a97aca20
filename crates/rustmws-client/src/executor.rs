//! Request execution: inject the managed parameters, throttle, sign, send.
//!
//! # Flow
//!
//! 1. Inject `AWSAccessKeyId`, `Action`, the seller key, `SignatureMethod`,
//!    `SignatureVersion`, `Version` and (when present) `MWSAuthToken`.
//! 2. Take a token from the operation's throttle bucket, stalling if needed.
//! 3. Stamp `Timestamp` (two minutes in the past) and sign a sorted snapshot
//!    of the parameters.
//! 4. Route the snapshot to the mock harness, or POST it as a form body.
//! 5. Hand back status, body and metadata untouched; non-2xx is an error.
//!
//! The body is rendered from the same snapshot that was signed, so nothing can
//! change between signing and sending.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use http::{HeaderMap, Uri};
use rustmws_auth::SignatureAlgorithm;
use rustmws_auth::canonical::{build_canonical_query, encode_component};
use rustmws_core::{Credential, EngineConfig, OperationDescriptor, RequestParameters, keys};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::{MwsError, MwsResult};
use crate::mock::MockHarness;
use crate::throttle::ThrottleRegistry;
use crate::xml;

/// Form content type of every call.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

const SIGNATURE_VERSION: &str = "2";
const TIMESTAMP_SKEW_SECS: i64 = 120;

/// Source of the current time.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// A fully signed call, ready to transmit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    /// Always `POST`.
    pub method: &'static str,
    /// Absolute URL the request is sent to.
    pub url: String,
    /// Host that was signed, lowercase, with port when non-default.
    pub host: String,
    /// Path that was signed.
    pub path: String,
    /// Sorted parameter snapshot that was signed, without `Signature`.
    pub parameters: Vec<(String, String)>,
    /// Base64 signature.
    pub signature: String,
}

impl SignedRequest {
    /// Value of a signed parameter.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `Action`.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.parameter(keys::ACTION)
    }

    /// Names of the signed parameters, in canonical order.
    pub fn parameter_names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|(k, _)| k.as_str())
    }

    /// Form body: the canonical query followed by the encoded signature.
    #[must_use]
    pub fn body(&self) -> String {
        let query = build_canonical_query(
            self.parameters
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        let signature = encode_component(&self.signature);
        if query.is_empty() {
            format!("{}={signature}", keys::SIGNATURE)
        } else {
            format!("{query}&{}={signature}", keys::SIGNATURE)
        }
    }
}

/// Request id and quota headers of a response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMetadata {
    /// `x-mws-request-id`.
    pub request_id: Option<String>,
    /// `x-mws-quota-max`.
    pub quota_max: Option<f64>,
    /// `x-mws-quota-remaining`.
    pub quota_remaining: Option<f64>,
    /// `x-mws-quota-resetsOn`.
    pub quota_resets_on: Option<String>,
}

impl ResponseMetadata {
    /// Extract the known headers; anything missing or malformed is `None`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let number = |name: &str| text(name).and_then(|v| v.trim().parse::<f64>().ok());

        Self {
            request_id: text("x-mws-request-id"),
            quota_max: number("x-mws-quota-max"),
            quota_remaining: number("x-mws-quota-remaining"),
            quota_resets_on: text("x-mws-quota-resetson"),
        }
    }
}

/// Status, body and metadata of one call, uninterpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: String,
    /// Header metadata.
    pub metadata: ResponseMetadata,
}

impl RawResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Everything one call needs, borrowed from its owner.
#[derive(Debug)]
pub struct Call<'a> {
    /// Operation to invoke.
    pub descriptor: &'a OperationDescriptor,
    /// Parameters; managed keys are written back into this map.
    pub parameters: &'a mut RequestParameters,
    /// Account to sign for.
    pub credential: &'a Credential,
    /// Budget to draw from.
    pub throttle: &'a ThrottleRegistry,
    /// Route to this harness instead of the network.
    pub mock: Option<&'a mut MockHarness>,
    /// Aborts a throttle stall or an in-flight HTTP call.
    pub cancel: Option<&'a CancellationToken>,
}

/// Signs and sends calls.
#[derive(Clone)]
pub struct RequestExecutor {
    http: reqwest::Client,
    algorithm: SignatureAlgorithm,
    clock: Clock,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Build an executor from the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::UnsupportedAlgorithm`] for an unknown signature
    /// algorithm and [`MwsError::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(config: &EngineConfig) -> MwsResult<Self> {
        let algorithm: SignatureAlgorithm = config.signature_algorithm.parse()?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MwsError::Configuration(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            algorithm,
            clock: Arc::new(Utc::now),
        })
    }

    /// Replace the clock used for `Timestamp`.
    #[must_use]
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Configured signature algorithm.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// `Timestamp` value for a call made now.
    #[must_use]
    pub fn timestamp(&self) -> String {
        let at = (self.clock)() - TimeDelta::seconds(TIMESTAMP_SKEW_SECS);
        at.to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Write the managed parameters of `descriptor` into `parameters`.
    ///
    /// A stale `Signature` is removed. `Timestamp` is written separately by
    /// [`stamp`](Self::stamp) so it reflects the moment after any throttle
    /// stall.
    pub fn prepare(
        &self,
        descriptor: &OperationDescriptor,
        parameters: &mut RequestParameters,
        credential: &Credential,
    ) {
        parameters
            .set(keys::ACCESS_KEY_ID, credential.access_key_id.as_str())
            .set(keys::ACTION, descriptor.name())
            .set(descriptor.seller_key, credential.merchant_id.as_str())
            .set(keys::SIGNATURE_METHOD, self.algorithm.as_str())
            .set(keys::SIGNATURE_VERSION, SIGNATURE_VERSION)
            .set(keys::VERSION, descriptor.api_version);
        if let Some(token) = &credential.auth_token {
            parameters.set(keys::AUTH_TOKEN, token.as_str());
        }
        parameters.unset(keys::SIGNATURE);
    }

    /// Set `Timestamp` to the current time minus the clock skew allowance.
    pub fn stamp(&self, parameters: &mut RequestParameters) {
        parameters.set(keys::TIMESTAMP, self.timestamp());
    }

    /// Sign a snapshot of `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::Configuration`] if the credential endpoint is not a
    /// usable URL.
    pub fn sign(
        &self,
        descriptor: &OperationDescriptor,
        parameters: &RequestParameters,
        credential: &Credential,
    ) -> MwsResult<SignedRequest> {
        let target = Target::resolve(&credential.endpoint, descriptor.url_path)?;
        let snapshot: Vec<(String, String)> = parameters
            .iter()
            .filter(|(k, _)| *k != keys::SIGNATURE)
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();

        let signature = rustmws_auth::sign(
            "POST",
            &target.host,
            &target.path,
            snapshot.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &credential.secret_key,
            self.algorithm,
        )?;

        debug!(
            store = %credential.store_id,
            operation = %descriptor,
            host = %target.host,
            path = %target.path,
            "Signed request"
        );

        Ok(SignedRequest {
            method: "POST",
            url: target.url,
            host: target.host,
            path: target.path,
            parameters: snapshot,
            signature,
        })
    }

    /// Run one call end to end.
    ///
    /// # Errors
    ///
    /// Fails with [`MwsError::Cancelled`] or [`MwsError::ThrottleTimeout`] on
    /// cancellation, [`MwsError::Transport`] when the HTTP call fails,
    /// [`MwsError::MockExhausted`] in mock mode with nothing queued, and
    /// [`MwsError::RemoteRequest`] for any non-2xx status.
    pub async fn execute(&self, call: Call<'_>) -> MwsResult<RawResponse> {
        let Call {
            descriptor,
            parameters,
            credential,
            throttle,
            mock,
            cancel,
        } = call;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return Err(MwsError::Cancelled);
        }

        self.prepare(descriptor, parameters, credential);
        throttle.consume(descriptor.throttle, cancel).await?;
        self.stamp(parameters);
        let request = self.sign(descriptor, parameters, credential)?;

        let response = match mock {
            Some(harness) => {
                let canned = harness.next_response().await?;
                harness.record(request);
                RawResponse {
                    status: canned.status,
                    body: canned.body,
                    metadata: ResponseMetadata::default(),
                }
            }
            None => self.transmit(&request, cancel).await?,
        };

        if !response.is_success() {
            let fault = xml::parse_fault(&response.body);
            warn!(
                store = %credential.store_id,
                operation = %descriptor,
                status = response.status,
                code = fault.as_ref().map(|f| f.code.as_str()),
                "Remote request failed"
            );
            return Err(MwsError::RemoteRequest {
                status: response.status,
                body: response.body,
                fault,
            });
        }

        Ok(response)
    }

    async fn transmit(
        &self,
        request: &SignedRequest,
        cancel: Option<&CancellationToken>,
    ) -> MwsResult<RawResponse> {
        let send = self
            .http
            .post(&request.url)
            .header(http::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.body())
            .send();

        let result = match cancel {
            Some(cancel) => tokio::select! {
                result = send => result,
                () = cancel.cancelled() => return Err(MwsError::Cancelled),
            },
            None => send.await,
        };

        let response = result.map_err(|e| {
            error!(url = %request.url, error = %e, "HTTP request failed");
            MwsError::Transport(e)
        })?;

        let status = response.status().as_u16();
        let metadata = ResponseMetadata::from_headers(response.headers());
        let body = response.text().await.map_err(|e| {
            error!(url = %request.url, error = %e, "Failed to read response body");
            MwsError::Transport(e)
        })?;

        debug!(
            url = %request.url,
            status,
            request_id = metadata.request_id.as_deref(),
            "Received response"
        );

        Ok(RawResponse {
            status,
            body,
            metadata,
        })
    }
}

/// Where a call goes and what gets signed for it.
#[derive(Debug)]
struct Target {
    url: String,
    host: String,
    path: String,
}

impl Target {
    fn resolve(endpoint: &str, url_path: &str) -> MwsResult<Self> {
        let uri: Uri = endpoint
            .parse()
            .map_err(|e| MwsError::Configuration(format!("invalid endpoint {endpoint}: {e}")))?;
        let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
            return Err(MwsError::Configuration(format!(
                "endpoint must be an absolute URL: {endpoint}"
            )));
        };

        let base = uri.path().trim_end_matches('/');
        let path = if url_path.starts_with('/') {
            format!("{base}{url_path}")
        } else {
            format!("{base}/{url_path}")
        };

        let default_port = match scheme {
            "https" => Some(443),
            "http" => Some(80),
            _ => None,
        };
        let host = match authority.port_u16() {
            Some(port) if Some(port) != default_port => {
                format!("{}:{port}", authority.host())
            }
            _ => authority.host().to_owned(),
        }
        .to_ascii_lowercase();

        Ok(Self {
            url: format!("{scheme}://{host}{path}"),
            host,
            path,
        })
    }
}
