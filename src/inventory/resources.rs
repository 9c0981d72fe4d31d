//! Resource table of the inventory service.
//!
//! Every endpoint the dashboard reads is registered here with the tag it
//! provides, and every mutation with the tags it invalidates. This file is
//! the single place to audit which writes refresh which views.

use crate::cache::{
  validate, InvalidationGraph, Method, MutationDescriptor, Params, RequestSpec,
  ResourceDescriptor, ResourceRegistry,
};

use super::types::{
  Customer, ExpenseAnalysis, Notification, OrderAnalysis, OrderByStatus, OrderDetails,
  OrderSummary, PaymentByMethod, Product, ProductCreate, PurchaseAnalysis, SalesAnalysis,
  StatisticAnalysis, TopProduct, TransactionByType,
};

// ============================================================================
// Tags
// ============================================================================

pub mod tags {
  use crate::cache::ResourceTag;

  pub const TOP_PRODUCTS: ResourceTag = ResourceTag::new("TopProducts");
  pub const SALES_ANALYSIS: ResourceTag = ResourceTag::new("SalesAnalysis");
  pub const PURCHASE_ANALYSIS: ResourceTag = ResourceTag::new("PurchaseAnalysis");
  pub const ORDER_ANALYSIS: ResourceTag = ResourceTag::new("OrderAnalysis");
  pub const ORDER_SUMMARY: ResourceTag = ResourceTag::new("OrderSummary");
  pub const EXPENSE_ANALYSIS: ResourceTag = ResourceTag::new("ExpenseAnalysis");
  pub const STATISTIC_ANALYSIS: ResourceTag = ResourceTag::new("StatisticAnalysis");
  pub const PRODUCTS: ResourceTag = ResourceTag::new("Products");
  pub const ORDER_DETAILS: ResourceTag = ResourceTag::new("OrderDetails");
  pub const CUSTOMERS: ResourceTag = ResourceTag::new("Customers");
  pub const ORDER_BY_STATUS: ResourceTag = ResourceTag::new("OrderByStatus");
  pub const PAYMENT_BY_METHOD: ResourceTag = ResourceTag::new("PaymentByMethod");
  pub const TRANSACTION_BY_TYPE: ResourceTag = ResourceTag::new("TransactionByType");
  pub const NOTIFICATION: ResourceTag = ResourceTag::new("Notification");
}

// ============================================================================
// Resource and mutation names
// ============================================================================

pub const TOP_PRODUCTS: &str = "TopProducts";
pub const SALES_ANALYSIS: &str = "SalesAnalysis";
pub const PURCHASE_ANALYSIS: &str = "PurchaseAnalysis";
pub const ORDER_ANALYSIS: &str = "OrderAnalysis";
pub const ORDER_SUMMARY: &str = "OrderSummary";
pub const EXPENSE_ANALYSIS: &str = "ExpenseAnalysis";
pub const STATISTIC_ANALYSIS: &str = "StatisticAnalysis";
pub const PRODUCTS: &str = "Products";
pub const PRODUCTS_SEARCH: &str = "ProductsSearch";
pub const ORDER_DETAILS: &str = "OrderDetails";
pub const CUSTOMERS: &str = "Customers";
pub const ORDER_BY_STATUS: &str = "OrderByStatus";
pub const PAYMENT_BY_METHOD: &str = "PaymentByMethod";
pub const TRANSACTION_BY_TYPE: &str = "TransactionByType";
pub const NOTIFICATIONS: &str = "Notification";

pub const CREATE_PRODUCT: &str = "createProduct";
pub const TOGGLE_NOTIFICATION: &str = "toggleNotification";

/// Grouping used by the sales card when none is given.
pub const DEFAULT_SALES_GROUPING: &str = "weekly";

/// Build the registry of every inventory endpoint.
pub fn registry() -> ResourceRegistry {
  ResourceRegistry::new()
    .with_query(ResourceDescriptor::new(
      TOP_PRODUCTS,
      tags::TOP_PRODUCTS,
      |_| RequestSpec::get("/rest/products/top"),
      validate::<Vec<TopProduct>>,
    ))
    .with_query(ResourceDescriptor::new(
      SALES_ANALYSIS,
      tags::SALES_ANALYSIS,
      |p| {
        let group_by = p
          .get("groupBy")
          .cloned()
          .unwrap_or_else(|| DEFAULT_SALES_GROUPING.to_string());
        RequestSpec::get("/rest/sales/analysis").with_query("groupBy", group_by)
      },
      validate::<Vec<SalesAnalysis>>,
    ))
    .with_query(ResourceDescriptor::new(
      PURCHASE_ANALYSIS,
      tags::PURCHASE_ANALYSIS,
      |_| RequestSpec::get("/rest/purchase/analysis"),
      validate::<Vec<PurchaseAnalysis>>,
    ))
    .with_query(ResourceDescriptor::new(
      ORDER_ANALYSIS,
      tags::ORDER_ANALYSIS,
      |_| RequestSpec::get("/rest/order/order-discount-trends"),
      validate::<Vec<OrderAnalysis>>,
    ))
    .with_query(ResourceDescriptor::new(
      ORDER_SUMMARY,
      tags::ORDER_SUMMARY,
      |_| RequestSpec::get("/rest/order/order-discount-summary"),
      validate::<OrderSummary>,
    ))
    .with_query(ResourceDescriptor::new(
      EXPENSE_ANALYSIS,
      tags::EXPENSE_ANALYSIS,
      |_| RequestSpec::get("/rest/expense/breakdown"),
      validate::<Vec<ExpenseAnalysis>>,
    ))
    .with_query(ResourceDescriptor::new(
      STATISTIC_ANALYSIS,
      tags::STATISTIC_ANALYSIS,
      |_| RequestSpec::get("/rest/statistic"),
      validate::<StatisticAnalysis>,
    ))
    .with_query(ResourceDescriptor::new(
      PRODUCTS,
      tags::PRODUCTS,
      |_| RequestSpec::get("/rest/products"),
      validate::<Vec<Product>>,
    ))
    .with_query(ResourceDescriptor::new(
      PRODUCTS_SEARCH,
      tags::PRODUCTS,
      |p| {
        let name = p.get("name").cloned().unwrap_or_default();
        RequestSpec::get("/rest/products/search").with_query("name", name)
      },
      validate::<Vec<Product>>,
    ))
    .with_query(ResourceDescriptor::new(
      ORDER_DETAILS,
      tags::ORDER_DETAILS,
      |_| RequestSpec::get("/rest/order/details"),
      validate::<Vec<OrderDetails>>,
    ))
    .with_query(ResourceDescriptor::new(
      CUSTOMERS,
      tags::CUSTOMERS,
      |_| RequestSpec::get("/rest/customers"),
      validate::<Vec<Customer>>,
    ))
    .with_query(ResourceDescriptor::new(
      ORDER_BY_STATUS,
      tags::ORDER_BY_STATUS,
      |_| RequestSpec::get("/rest/charts/orders"),
      validate::<Vec<OrderByStatus>>,
    ))
    .with_query(ResourceDescriptor::new(
      PAYMENT_BY_METHOD,
      tags::PAYMENT_BY_METHOD,
      |_| RequestSpec::get("/rest/charts/payments"),
      validate::<Vec<PaymentByMethod>>,
    ))
    .with_query(ResourceDescriptor::new(
      TRANSACTION_BY_TYPE,
      tags::TRANSACTION_BY_TYPE,
      |_| RequestSpec::get("/rest/charts/transactions"),
      validate::<Vec<TransactionByType>>,
    ))
    .with_query(ResourceDescriptor::new(
      NOTIFICATIONS,
      tags::NOTIFICATION,
      |_| RequestSpec::get("/rest/notification"),
      validate::<Vec<Notification>>,
    ))
    .with_mutation(MutationDescriptor::new(
      CREATE_PRODUCT,
      |_, body| {
        RequestSpec::get("/rest/products")
          .with_method(Method::Post)
          .with_body(body)
      },
      validate::<Product>,
    ))
    .with_mutation(MutationDescriptor::new(
      TOGGLE_NOTIFICATION,
      |p, _| {
        let id = p.get("id").map(String::as_str).unwrap_or_default();
        RequestSpec::get(format!("/rest/notification/{}/read", id)).with_method(Method::Put)
      },
      validate::<Notification>,
    ))
}

/// Which views each mutation makes stale.
pub fn invalidation_graph() -> InvalidationGraph {
  InvalidationGraph::new()
    .on(CREATE_PRODUCT, [tags::PRODUCTS, tags::NOTIFICATION])
    .on(TOGGLE_NOTIFICATION, [tags::NOTIFICATION])
}

/// Query parameters for the sales analysis endpoint.
pub fn sales_params(group_by: &str) -> Params {
  crate::cache::params([("groupBy", group_by)])
}

/// Query parameters for the product search endpoint.
pub fn search_params(name: &str) -> Params {
  crate::cache::params([("name", name)])
}
