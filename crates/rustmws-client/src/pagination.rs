//! Continuation driver for list operations.
//!
//! A list operation returns at most one page per call plus an opaque
//! `NextToken`. Follow-up pages are fetched with the operation's
//! `-ByNextToken` variant, which accepts only the continuation allow-list:
//! every business filter from the first page must be dropped before the token
//! is sent.
//!
//! ```text
//! ListOrders(CreatedAfter, MarketplaceId.Id.1) -> page 1 + T1
//! ListOrdersByNextToken(NextToken=T1)          -> page 2 + T2
//! ListOrdersByNextToken(NextToken=T2)          -> page 3
//! ```

use async_trait::async_trait;
use rustmws_core::{OperationDescriptor, RequestParameters, keys};
use tracing::debug;

use crate::error::{MwsError, MwsResult};
use crate::executor::RawResponse;

/// Items and continuation token a parser extracted from one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token for the next page, if any.
    pub next_token: Option<String>,
}

impl<T> ParsedPage<T> {
    /// Create a page. An empty token counts as no token.
    #[must_use]
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self {
            items,
            next_token: next_token.filter(|t| !t.is_empty()),
        }
    }

    /// A page with no continuation.
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self::new(items, None)
    }
}

/// Result of a top-level fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResult<T> {
    /// Items of every page, in order.
    pub items: Vec<T>,
    /// Token that was returned but not followed.
    pub next_token: Option<String>,
    /// Number of pages fetched.
    pub pages: usize,
}

impl<T> FetchResult<T> {
    /// Whether more pages are available.
    #[must_use]
    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }
}

/// A fetch that stopped part-way, with what it had gathered so far.
#[derive(Debug, thiserror::Error)]
#[error("pagination stopped after {pages_completed} page(s): {source}")]
pub struct PaginationError<T> {
    /// Failure that stopped the fetch.
    pub source: MwsError,
    /// Items of the pages completed before the failure.
    pub partial: Vec<T>,
    /// Number of pages completed before the failure.
    pub pages_completed: usize,
}

impl<T> From<PaginationError<T>> for MwsError {
    fn from(err: PaginationError<T>) -> Self {
        err.source
    }
}

/// Something that can execute one page request.
#[async_trait]
pub trait PageSource: Send {
    /// Execute `descriptor` with `parameters`.
    ///
    /// Managed keys written by the executor are left in `parameters`.
    async fn fetch_page(
        &mut self,
        descriptor: &OperationDescriptor,
        parameters: &mut RequestParameters,
    ) -> MwsResult<RawResponse>;
}

/// Drives a list operation through its continuation pages.
#[derive(Debug, Clone, Copy)]
pub struct ContinuationDriver {
    auto_continue: bool,
}

impl Default for ContinuationDriver {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ContinuationDriver {
    /// Create a driver. With `auto_continue` off, only the first page is
    /// fetched and its token is handed back.
    #[must_use]
    pub fn new(auto_continue: bool) -> Self {
        Self { auto_continue }
    }

    /// Whether continuation pages are followed.
    #[must_use]
    pub fn auto_continue(&self) -> bool {
        self.auto_continue
    }

    /// Fetch `descriptor` and, when enabled, every continuation page.
    ///
    /// # Errors
    ///
    /// Stops at the first failing page and returns the items gathered so far
    /// inside [`PaginationError`].
    pub async fn fetch<S, T, P>(
        &self,
        source: &mut S,
        descriptor: &OperationDescriptor,
        parameters: RequestParameters,
        parser: P,
    ) -> Result<FetchResult<T>, PaginationError<T>>
    where
        S: PageSource + ?Sized,
        P: Fn(&RawResponse) -> MwsResult<ParsedPage<T>>,
    {
        let mut descriptor = descriptor.clone();
        let mut parameters = parameters;
        let mut items = Vec::new();
        let mut pages = 0;

        loop {
            let page = match source.fetch_page(&descriptor, &mut parameters).await {
                Ok(response) => parser(&response),
                Err(e) => Err(e),
            };
            let page = match page {
                Ok(page) => page,
                Err(source) => {
                    debug!(
                        operation = %descriptor,
                        pages_completed = pages,
                        error = %source,
                        "Pagination stopped"
                    );
                    return Err(PaginationError {
                        source,
                        partial: items,
                        pages_completed: pages,
                    });
                }
            };

            pages += 1;
            items.extend(page.items);
            let next_token = page.next_token.filter(|t| !t.is_empty());

            debug!(
                operation = %descriptor,
                page = pages,
                items = items.len(),
                has_more = next_token.is_some(),
                "Fetched page"
            );

            match next_token {
                Some(token) if self.auto_continue => {
                    descriptor = descriptor.by_next_token();
                    parameters.reset_to_allowlist();
                    parameters.set(keys::NEXT_TOKEN, token);
                }
                next_token => {
                    return Ok(FetchResult {
                        items,
                        next_token,
                        pages,
                    });
                }
            }
        }
    }

    /// Continue from a token kept from an earlier fetch.
    ///
    /// Starts directly with the `-ByNextToken` variant and only the token as
    /// caller parameter.
    ///
    /// # Errors
    ///
    /// Fails without a call when `token` is empty; otherwise as
    /// [`fetch`](Self::fetch).
    pub async fn resume<S, T, P>(
        &self,
        source: &mut S,
        descriptor: &OperationDescriptor,
        token: &str,
        parser: P,
    ) -> Result<FetchResult<T>, PaginationError<T>>
    where
        S: PageSource + ?Sized,
        P: Fn(&RawResponse) -> MwsResult<ParsedPage<T>>,
    {
        if token.is_empty() {
            return Err(PaginationError {
                source: MwsError::Configuration("continuation token must not be empty".to_owned()),
                partial: Vec::new(),
                pages_completed: 0,
            });
        }

        let parameters = RequestParameters::new().with(keys::NEXT_TOKEN, token);
        self.fetch(source, &descriptor.by_next_token(), parameters, parser)
            .await
    }
}
