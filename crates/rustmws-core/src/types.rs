//! Operation descriptors and throttle profile definitions.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::params::keys;

/// Suffix appended to an operation name to form its continuation variant.
pub const NEXT_TOKEN_SUFFIX: &str = "ByNextToken";

/// Operation category that shares one rate-limit budget.
///
/// Each category maps to the published request quota of a family of
/// operations. The serialized form is kebab-case (`order-list`,
/// `feed-submit`, ...), which is also what configuration overrides use as keys.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleCategory {
    /// Single-order lookups (`GetOrder`).
    Order,
    /// Order listing (`ListOrders` and its continuation).
    OrderList,
    /// Order items (`ListOrderItems`).
    Item,
    /// Service status probes (`GetServiceStatus`).
    Status,
    /// Seller participation lookups.
    Sellers,
    /// Fulfillment inventory.
    Inventory,
    /// Product catalog and pricing.
    Product,
    /// Report requests.
    ReportRequest,
    /// Report listing.
    ReportList,
    /// Feed submission.
    FeedSubmit,
    /// Feed submission listing.
    FeedList,
    /// Feed processing results.
    FeedResult,
    /// Merchant fulfillment.
    Merchant,
    /// Notification subscriptions.
    Subscribe,
    /// Selling recommendations.
    Recommend,
    /// Financial events.
    Finance,
}

impl ThrottleCategory {
    /// Every category, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::Order,
        Self::OrderList,
        Self::Item,
        Self::Status,
        Self::Sellers,
        Self::Inventory,
        Self::Product,
        Self::ReportRequest,
        Self::ReportList,
        Self::FeedSubmit,
        Self::FeedList,
        Self::FeedResult,
        Self::Merchant,
        Self::Subscribe,
        Self::Recommend,
        Self::Finance,
    ];

    /// Wire/config name of the category.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Order => "order",
            Self::OrderList => "order-list",
            Self::Item => "item",
            Self::Status => "status",
            Self::Sellers => "sellers",
            Self::Inventory => "inventory",
            Self::Product => "product",
            Self::ReportRequest => "report-request",
            Self::ReportList => "report-list",
            Self::FeedSubmit => "feed-submit",
            Self::FeedList => "feed-list",
            Self::FeedResult => "feed-result",
            Self::Merchant => "merchant",
            Self::Subscribe => "subscribe",
            Self::Recommend => "recommend",
            Self::Finance => "finance",
        }
    }

    /// Published quota for this category.
    #[must_use]
    pub fn default_profile(self) -> ThrottleProfile {
        match self {
            Self::Order | Self::OrderList => ThrottleProfile::new(6, 60),
            Self::Item | Self::Inventory | Self::Merchant | Self::Finance => {
                ThrottleProfile::new(30, 2)
            }
            Self::Status => ThrottleProfile::new(2, 300),
            Self::Sellers => ThrottleProfile::new(15, 60),
            Self::Product => ThrottleProfile::new(20, 5),
            Self::ReportRequest | Self::FeedResult => ThrottleProfile::new(15, 60),
            Self::ReportList | Self::FeedList => ThrottleProfile::new(10, 45),
            Self::FeedSubmit => ThrottleProfile::new(15, 120),
            Self::Subscribe => ThrottleProfile::new(25, 1),
            Self::Recommend => ThrottleProfile::new(8, 2),
        }
    }
}

impl fmt::Display for ThrottleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThrottleCategory {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::Config(format!("unknown throttle category: {s}")))
    }
}

/// Token budget and refill window of one throttle category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleProfile {
    /// Requests allowed before the caller has to wait.
    pub max_tokens: u32,
    /// Seconds to wait once the budget is spent.
    pub refill_window_seconds: u64,
}

impl ThrottleProfile {
    /// Create a profile.
    #[must_use]
    pub const fn new(max_tokens: u32, refill_window_seconds: u64) -> Self {
        Self {
            max_tokens,
            refill_window_seconds,
        }
    }

    /// The refill window as a [`Duration`].
    #[must_use]
    pub fn refill_window(&self) -> Duration {
        Duration::from_secs(self.refill_window_seconds)
    }

    /// Safe-mode variant: one extra token and one extra second.
    #[must_use]
    pub fn with_safety_margin(self) -> Self {
        Self {
            max_tokens: self.max_tokens.saturating_add(1),
            refill_window_seconds: self.refill_window_seconds.saturating_add(1),
        }
    }
}

/// Resolved profile table: built-in defaults, config overrides, safe mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrottleProfiles {
    overrides: HashMap<ThrottleCategory, ThrottleProfile>,
    safe_mode: bool,
}

impl ThrottleProfiles {
    /// Build a table from overrides and the safe-mode flag.
    #[must_use]
    pub fn new(overrides: HashMap<ThrottleCategory, ThrottleProfile>, safe_mode: bool) -> Self {
        Self {
            overrides,
            safe_mode,
        }
    }

    /// Effective profile for a category.
    #[must_use]
    pub fn get(&self, category: ThrottleCategory) -> ThrottleProfile {
        let base = self
            .overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_profile());
        if self.safe_mode {
            base.with_safety_margin()
        } else {
            base
        }
    }

    /// Whether safe mode is applied.
    #[must_use]
    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }
}

/// How throttle buckets are shared between requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ThrottleScope {
    /// Every request object owns its buckets; independent requests never
    /// share budget.
    #[default]
    PerRequest,
    /// All requests of one engine share a registry keyed by category.
    Shared,
}

impl FromStr for ThrottleScope {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-request" => Ok(Self::PerRequest),
            "shared" => Ok(Self::Shared),
            other => Err(CoreError::Config(format!("unknown throttle scope: {other}"))),
        }
    }
}

/// Static description of one remote operation.
///
/// Resource-specific callers define these once, usually as constants:
///
/// ```
/// use rustmws_core::{OperationDescriptor, ThrottleCategory};
///
/// const LIST_ORDERS: OperationDescriptor = OperationDescriptor::new(
///     "ListOrders",
///     "2013-09-01",
///     "/Orders/2013-09-01",
///     ThrottleCategory::OrderList,
/// );
/// assert_eq!(LIST_ORDERS.by_next_token().name(), "ListOrdersByNextToken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationDescriptor {
    /// Value of the `Action` parameter.
    pub name: Cow<'static, str>,
    /// Value of the `Version` parameter.
    pub api_version: &'static str,
    /// Path appended to the store endpoint.
    pub url_path: &'static str,
    /// Budget this operation draws from.
    pub throttle: ThrottleCategory,
    /// Parameter name that carries the merchant id.
    pub seller_key: &'static str,
}

impl OperationDescriptor {
    /// Descriptor for an operation that identifies the merchant as `SellerId`.
    #[must_use]
    pub const fn new(
        name: &'static str,
        api_version: &'static str,
        url_path: &'static str,
        throttle: ThrottleCategory,
    ) -> Self {
        Self::build(name, api_version, url_path, throttle, keys::SELLER_ID)
    }

    /// Descriptor for the older APIs (feeds, reports) that use `Merchant`.
    #[must_use]
    pub const fn merchant_scoped(
        name: &'static str,
        api_version: &'static str,
        url_path: &'static str,
        throttle: ThrottleCategory,
    ) -> Self {
        Self::build(name, api_version, url_path, throttle, keys::MERCHANT)
    }

    const fn build(
        name: &'static str,
        api_version: &'static str,
        url_path: &'static str,
        throttle: ThrottleCategory,
        seller_key: &'static str,
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            api_version,
            url_path,
            throttle,
            seller_key,
        }
    }

    /// Operation name as sent in `Action`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether this is already a `-ByNextToken` variant.
    #[must_use]
    pub fn is_next_token_variant(&self) -> bool {
        self.name.ends_with(NEXT_TOKEN_SUFFIX)
    }

    /// The continuation variant of this operation.
    ///
    /// Same version, path, and budget; the name gains the `ByNextToken`
    /// suffix unless it already has it.
    #[must_use]
    pub fn by_next_token(&self) -> Self {
        if self.is_next_token_variant() {
            return self.clone();
        }
        Self {
            name: Cow::Owned(format!("{}{NEXT_TOKEN_SUFFIX}", self.name)),
            ..self.clone()
        }
    }
}

impl fmt::Display for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.api_version)
    }
}
