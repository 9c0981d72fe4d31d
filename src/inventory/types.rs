//! Response and request schemas of the inventory service.
//!
//! Every cached resource is validated against one of these types before it
//! enters the cache.

use serde::{Deserialize, Serialize};

/// Best-selling product on the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopProduct {
  pub product_id: u64,
  pub name: String,
  pub base_price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<f64>,
  pub stock_quantity: i64,
}

/// Sales total for one period of the chosen grouping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesAnalysis {
  pub period: String,
  pub total_sales: f64,
  pub percentage_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseAnalysis {
  pub date: String,
  pub total_purchase_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAnalysis {
  pub order_id: u64,
  pub order_created_at: String,
  pub order_total_amount: f64,
  pub total_discount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummary {
  pub total_orders: u64,
  pub total_discount: f64,
  pub average_discount: f64,
}

/// Expense total for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseAnalysis {
  pub category: String,
  pub total: f64,
}

/// Headline figures for the dashboard cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticAnalysis {
  pub total_sales: f64,
  pub sales_change_percentage: f64,
  pub total_purchases: f64,
  pub purchases_change_percentage: f64,
  pub total_expenses: f64,
  pub expenses_change_percentage: f64,
  pub customer_growth: f64,
  pub customer_growth_change_percentage: f64,
  pub total_pending_amount: f64,
  pub pending_amount_change_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetails {
  pub order_id: u64,
  pub total_amount: f64,
  pub status: String,
  pub product_name: String,
  pub customer_name: String,
  pub payment_method: String,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub product_id: String,
  pub name: String,
  pub base_price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<f64>,
}

/// Body of a create-product mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
  pub name: String,
  pub base_price: f64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
  pub id: u64,
  pub name: String,
  pub email: String,
  pub phone: String,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderByStatus {
  pub order_id: u64,
  pub status: String,
  pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentByMethod {
  pub payment_id: u64,
  pub method: String,
  pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionByType {
  pub transaction_id: u64,
  #[serde(rename = "type")]
  pub kind: String,
  pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
  pub id: u64,
  pub message: String,
  pub product_id: u64,
  pub created_at: String,
  pub read: bool,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_product_wire_format() {
    let raw = json!({ "productId": "p-1", "name": "Desk", "basePrice": 120.5 });
    let product: Product = serde_json::from_value(raw).unwrap();
    assert_eq!(product.rating, None);
    assert_eq!(
      serde_json::to_value(&product).unwrap(),
      json!({ "productId": "p-1", "name": "Desk", "basePrice": 120.5 })
    );
  }

  #[test]
  fn test_transaction_type_field() {
    let raw = json!({ "transactionId": 4, "type": "REFUND", "timestamp": "2024-01-02T00:00:00Z" });
    let tx: TransactionByType = serde_json::from_value(raw).unwrap();
    assert_eq!(tx.kind, "REFUND");
  }
}
