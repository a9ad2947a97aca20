//! Engine entry point and per-call request objects.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rustmws_core::{
    Credential, CredentialProvider, CredentialStore, EngineConfig, OperationDescriptor,
    RequestParameters, ThrottleScope,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::MwsResult;
use crate::executor::{Call, RawResponse, RequestExecutor};
use crate::mock::MockHarness;
use crate::pagination::{ContinuationDriver, FetchResult, PageSource, PaginationError, ParsedPage};
use crate::throttle::ThrottleRegistry;

/// Request engine bound to one configuration.
///
/// # Examples
///
/// ```
/// use rustmws_client::{MockFixture, MockHarness, MwsClient};
/// use rustmws_core::{EngineConfig, StoreConfig, operations};
///
/// let config = EngineConfig::builder()
///     .stores(vec![
///         StoreConfig::builder()
///             .name("us")
///             .merchant_id("M1")
///             .access_key_id("AK1")
///             .secret_key("SEC1")
///             .marketplace_id("ATVPDKIKX0DER")
///             .build(),
///     ])
///     .build();
/// let client = MwsClient::new(config).unwrap();
///
/// let request = client
///     .request("us", operations::GET_ORDERS_SERVICE_STATUS)
///     .unwrap()
///     .with_mock(MockHarness::new().with(MockFixture::inline("status", "<Status>GREEN</Status>")));
/// assert_eq!(request.descriptor().name(), "GetServiceStatus");
/// ```
#[derive(Debug, Clone)]
pub struct MwsClient {
    config: Arc<EngineConfig>,
    credentials: Arc<dyn CredentialProvider>,
    executor: RequestExecutor,
    shared_throttle: Arc<ThrottleRegistry>,
}

impl MwsClient {
    /// Build a client whose stores come from `config`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration, invalid stores, or an unsupported
    /// signature algorithm.
    pub fn new(config: EngineConfig) -> MwsResult<Self> {
        config.validate()?;
        let store = CredentialStore::from_config(&config)?;
        Self::with_credential_provider(config, Arc::new(store))
    }

    /// Build a client that resolves stores through `credentials`.
    ///
    /// # Errors
    ///
    /// Fails on invalid configuration or an unsupported signature algorithm.
    pub fn with_credential_provider(
        config: EngineConfig,
        credentials: Arc<dyn CredentialProvider>,
    ) -> MwsResult<Self> {
        config.validate()?;
        let executor = RequestExecutor::new(&config)?;
        let shared_throttle = Arc::new(ThrottleRegistry::new(config.throttle_profiles()));

        debug!(
            scope = ?config.throttle_scope,
            safe_mode = config.safe_mode,
            algorithm = %executor.algorithm(),
            "Created MWS client"
        );

        Ok(Self {
            config: Arc::new(config),
            credentials,
            executor,
            shared_throttle,
        })
    }

    /// Replace the clock used for `Timestamp`.
    #[must_use]
    pub fn with_clock(
        mut self,
        clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static,
    ) -> Self {
        self.executor = self.executor.with_clock(clock);
        self
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Executor shared by every request of this client.
    #[must_use]
    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Resolve a store name.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::Configuration`](crate::MwsError::Configuration) for
    /// an empty or unknown store name.
    pub fn credential(&self, store_id: &str) -> MwsResult<Credential> {
        Ok(self.credentials.resolve(store_id)?)
    }

    /// Registry used by requests in [`ThrottleScope::Shared`].
    #[must_use]
    pub fn shared_throttle(&self) -> &Arc<ThrottleRegistry> {
        &self.shared_throttle
    }

    /// Empty harness rooted at the configured fixture directory.
    #[must_use]
    pub fn mock_harness(&self) -> MockHarness {
        match &self.config.mock_fixture_dir {
            Some(dir) => MockHarness::with_fixture_dir(dir.clone()),
            None => MockHarness::new(),
        }
    }

    /// Start a request for `descriptor` on behalf of `store_id`.
    ///
    /// In [`ThrottleScope::PerRequest`] the request gets its own buckets; in
    /// [`ThrottleScope::Shared`] it draws from the client-wide registry.
    ///
    /// # Errors
    ///
    /// Returns [`MwsError::Configuration`](crate::MwsError::Configuration) if
    /// the store cannot be resolved.
    pub fn request(
        &self,
        store_id: &str,
        descriptor: OperationDescriptor,
    ) -> MwsResult<Request<'_>> {
        let credential = self.credential(store_id)?;
        let throttle = match self.config.throttle_scope {
            ThrottleScope::PerRequest => {
                Arc::new(ThrottleRegistry::new(self.config.throttle_profiles()))
            }
            ThrottleScope::Shared => Arc::clone(&self.shared_throttle),
        };

        Ok(Request {
            client: self,
            credential,
            descriptor,
            parameters: RequestParameters::new(),
            throttle,
            mock: None,
            cancel: None,
            auto_continue: true,
        })
    }
}

/// One operation against one store.
///
/// Parameters persist across [`execute`](Self::execute) calls, including the
/// managed keys the executor writes back.
#[derive(Debug)]
pub struct Request<'c> {
    client: &'c MwsClient,
    credential: Credential,
    descriptor: OperationDescriptor,
    parameters: RequestParameters,
    throttle: Arc<ThrottleRegistry>,
    mock: Option<MockHarness>,
    cancel: Option<CancellationToken>,
    auto_continue: bool,
}

impl Request<'_> {
    /// Set a parameter, builder style.
    #[must_use]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.set(key, value);
        self
    }

    /// Set a parameter.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.parameters.set(key, value);
        self
    }

    /// Replace a `Prefix.N` list parameter.
    pub fn set_list<I, V>(&mut self, prefix: &str, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.parameters.set_list(prefix, values);
        self
    }

    /// Remove a parameter.
    pub fn unset(&mut self, key: &str) -> &mut Self {
        self.parameters.unset(key);
        self
    }

    /// Set `key` to the store's marketplace id unless already present.
    ///
    /// The key differs by API (`MarketplaceId.Id.1`, `MarketplaceId`, ...).
    pub fn set_default_marketplace(&mut self, key: &str) -> &mut Self {
        if !self.parameters.contains(key) {
            self.parameters
                .set(key, self.credential.marketplace_id.as_str());
        }
        self
    }

    /// Route calls to `harness` instead of the network.
    #[must_use]
    pub fn with_mock(mut self, harness: MockHarness) -> Self {
        self.mock = Some(harness);
        self
    }

    /// Abort throttle stalls and in-flight calls when `token` fires.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Whether [`paginate`](Self::paginate) follows continuation tokens
    /// (default `true`).
    #[must_use]
    pub fn auto_continue(mut self, enabled: bool) -> Self {
        self.auto_continue = enabled;
        self
    }

    /// Operation this request invokes.
    #[must_use]
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Resolved credential.
    #[must_use]
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Current parameters.
    #[must_use]
    pub fn parameters(&self) -> &RequestParameters {
        &self.parameters
    }

    /// Throttle registry this request draws from.
    #[must_use]
    pub fn throttle(&self) -> &ThrottleRegistry {
        &self.throttle
    }

    /// Attached mock harness.
    #[must_use]
    pub fn mock_harness(&self) -> Option<&MockHarness> {
        self.mock.as_ref()
    }

    /// Attached mock harness, mutably, for queueing more fixtures.
    pub fn mock_harness_mut(&mut self) -> Option<&mut MockHarness> {
        self.mock.as_mut()
    }

    /// Execute the operation once.
    ///
    /// # Errors
    ///
    /// See [`RequestExecutor::execute`].
    pub async fn execute(&mut self) -> MwsResult<RawResponse> {
        let descriptor = self.descriptor.clone();
        let mut parameters = std::mem::take(&mut self.parameters);
        let result = self.fetch_page(&descriptor, &mut parameters).await;
        self.parameters = parameters;
        result
    }

    /// Fetch every page, or only the first when auto-continue is off.
    ///
    /// # Errors
    ///
    /// Stops at the first failing page; see [`PaginationError`].
    pub async fn paginate<T, P>(&mut self, parser: P) -> Result<FetchResult<T>, PaginationError<T>>
    where
        P: Fn(&RawResponse) -> MwsResult<ParsedPage<T>>,
    {
        let driver = ContinuationDriver::new(self.auto_continue);
        let descriptor = self.descriptor.clone();
        let parameters = self.parameters.clone();
        driver.fetch(self, &descriptor, parameters, parser).await
    }

    /// Fetch only the first page and hand back its token.
    ///
    /// # Errors
    ///
    /// See [`paginate`](Self::paginate).
    pub async fn fetch_first_page<T, P>(
        &mut self,
        parser: P,
    ) -> Result<FetchResult<T>, PaginationError<T>>
    where
        P: Fn(&RawResponse) -> MwsResult<ParsedPage<T>>,
    {
        let descriptor = self.descriptor.clone();
        let parameters = self.parameters.clone();
        ContinuationDriver::new(false)
            .fetch(self, &descriptor, parameters, parser)
            .await
    }

    /// Continue a list from a token kept from an earlier fetch.
    ///
    /// # Errors
    ///
    /// See [`ContinuationDriver::resume`].
    pub async fn resume<T, P>(
        &mut self,
        token: &str,
        parser: P,
    ) -> Result<FetchResult<T>, PaginationError<T>>
    where
        P: Fn(&RawResponse) -> MwsResult<ParsedPage<T>>,
    {
        let driver = ContinuationDriver::new(self.auto_continue);
        let descriptor = self.descriptor.clone();
        driver.resume(self, &descriptor, token, parser).await
    }
}

#[async_trait]
impl<'c> PageSource for Request<'c> {
    async fn fetch_page(
        &mut self,
        descriptor: &OperationDescriptor,
        parameters: &mut RequestParameters,
    ) -> MwsResult<RawResponse> {
        self.client
            .executor
            .execute(Call {
                descriptor,
                parameters,
                credential: &self.credential,
                throttle: &self.throttle,
                mock: self.mock.as_mut(),
                cancel: self.cancel.as_ref(),
            })
            .await
    }
}
