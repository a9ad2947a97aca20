//! Descriptors of commonly used operations.
//!
//! Resource-specific crates are free to declare their own; these cover the
//! list operations the engine is most often driven with.

use crate::types::{OperationDescriptor, ThrottleCategory};

/// `ListOrders` (Orders API).
pub const LIST_ORDERS: OperationDescriptor = OperationDescriptor::new(
    "ListOrders",
    "2013-09-01",
    "/Orders/2013-09-01",
    ThrottleCategory::OrderList,
);

/// `GetOrder` (Orders API).
pub const GET_ORDER: OperationDescriptor = OperationDescriptor::new(
    "GetOrder",
    "2013-09-01",
    "/Orders/2013-09-01",
    ThrottleCategory::Order,
);

/// `ListOrderItems` (Orders API).
pub const LIST_ORDER_ITEMS: OperationDescriptor = OperationDescriptor::new(
    "ListOrderItems",
    "2013-09-01",
    "/Orders/2013-09-01",
    ThrottleCategory::Item,
);

/// `GetServiceStatus` for the Orders API.
pub const GET_ORDERS_SERVICE_STATUS: OperationDescriptor = OperationDescriptor::new(
    "GetServiceStatus",
    "2013-09-01",
    "/Orders/2013-09-01",
    ThrottleCategory::Status,
);

/// `ListInventorySupply` (Fulfillment Inventory API).
pub const LIST_INVENTORY_SUPPLY: OperationDescriptor = OperationDescriptor::new(
    "ListInventorySupply",
    "2010-10-01",
    "/FulfillmentInventory/2010-10-01",
    ThrottleCategory::Inventory,
);

/// `ListFinancialEvents` (Finances API).
pub const LIST_FINANCIAL_EVENTS: OperationDescriptor = OperationDescriptor::new(
    "ListFinancialEvents",
    "2015-05-01",
    "/Finances/2015-05-01",
    ThrottleCategory::Finance,
);

/// `ListSubscriptions` (Subscriptions API).
pub const LIST_SUBSCRIPTIONS: OperationDescriptor = OperationDescriptor::new(
    "ListSubscriptions",
    "2013-07-01",
    "/Subscriptions/2013-07-01",
    ThrottleCategory::Subscribe,
);

/// `GetReportList` (Reports API).
pub const GET_REPORT_LIST: OperationDescriptor = OperationDescriptor::merchant_scoped(
    "GetReportList",
    "2009-01-01",
    "/",
    ThrottleCategory::ReportList,
);

/// `GetFeedSubmissionList` (Feeds API).
pub const GET_FEED_SUBMISSION_LIST: OperationDescriptor = OperationDescriptor::merchant_scoped(
    "GetFeedSubmissionList",
    "2009-01-01",
    "/",
    ThrottleCategory::FeedList,
);
