//! The inventory dashboard's remote service: schemas, resource table and
//! HTTP transport.

mod client;
pub mod resources;
pub mod types;

pub use client::HttpTransport;

use serde_json::Value;
use std::sync::Arc;

use crate::cache::{CacheStore, CoordinatorOptions, FetchCoordinator, MutationRequest, Transport};
use crate::config::Config;
use types::ProductCreate;

/// Wire the inventory resource table to a transport and a fresh store.
///
/// Idle entries are evicted as queries come in. Long-lived callers may also
/// start [`FetchCoordinator::spawn_sweeper`].
pub fn coordinator(config: &Config, transport: Arc<dyn Transport>) -> FetchCoordinator {
  let store = Arc::new(CacheStore::new(config.cache.keep_unused_for()));
  FetchCoordinator::new(
    resources::registry(),
    resources::invalidation_graph(),
    store,
    transport,
    CoordinatorOptions {
      refetch_on_focus: config.cache.refetch_on_focus,
      refetch_on_reconnect: config.cache.refetch_on_reconnect,
    },
  )
}

pub fn create_product(product: &ProductCreate) -> MutationRequest {
  let body = serde_json::to_value(product).unwrap_or(Value::Null);
  MutationRequest::new(resources::CREATE_PRODUCT).with_body(body)
}

pub fn toggle_notification(id: u64) -> MutationRequest {
  MutationRequest::new(resources::TOGGLE_NOTIFICATION).with_param("id", id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::testing::MockTransport;
  use crate::cache::{Method, Params, Status};
  use crate::error::{Error, FetchError};
  use resources::{NOTIFICATIONS, PRODUCTS, PRODUCTS_SEARCH, TOP_PRODUCTS};
  use serde_json::json;
  use types::Product;

  fn lamp() -> ProductCreate {
    ProductCreate {
      name: "Lamp".into(),
      base_price: 19.0,
      rating: None,
    }
  }

  #[tokio::test]
  async fn test_created_product_appears_without_manual_refresh() {
    let transport = MockTransport::new();
    transport.reply(Method::Get, "/rest/products", Ok(json!([])));
    transport.reply(
      Method::Get,
      "/rest/products",
      Ok(json!([{ "productId": "p1", "name": "Lamp", "basePrice": 19.0 }])),
    );
    transport.reply(
      Method::Post,
      "/rest/products",
      Ok(json!({ "productId": "p1", "name": "Lamp", "basePrice": 19.0 })),
    );
    let sync = coordinator(&Config::default(), transport.clone());

    let mut products = sync.query(PRODUCTS, Params::new()).unwrap();
    let state = products.settled().await;
    assert_eq!(state.decode::<Vec<Product>>().unwrap(), Some(vec![]));

    let created = sync.mutate(create_product(&lamp())).await.unwrap();
    assert_eq!(created["productId"], "p1");

    let state = products.settled().await;
    let list: Vec<Product> = state.decode().unwrap().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].name, "Lamp");
    assert!(!state.is_stale);
    assert_eq!(transport.calls_to(Method::Get, "/rest/products"), 2);
  }

  #[tokio::test]
  async fn test_create_product_leaves_unrelated_views_alone() {
    let transport = MockTransport::new();
    transport.reply(Method::Get, "/rest/products/top", Ok(json!([])));
    transport.reply(Method::Get, "/rest/products/search", Ok(json!([])));
    transport.reply(Method::Get, "/rest/notification", Ok(json!([])));
    transport.reply(
      Method::Post,
      "/rest/products",
      Ok(json!({ "productId": "p1", "name": "Lamp", "basePrice": 19.0 })),
    );
    let sync = coordinator(&Config::default(), transport.clone());

    let mut top = sync.query(TOP_PRODUCTS, Params::new()).unwrap();
    let mut search = sync
      .query(PRODUCTS_SEARCH, resources::search_params("La"))
      .unwrap();
    let mut notes = sync.query(NOTIFICATIONS, Params::new()).unwrap();
    top.settled().await;
    search.settled().await;
    notes.settled().await;

    sync.mutate(create_product(&lamp())).await.unwrap();
    search.settled().await;
    notes.settled().await;

    assert_eq!(transport.calls_to(Method::Get, "/rest/products/top"), 1);
    assert_eq!(transport.calls_to(Method::Get, "/rest/products/search"), 2);
    assert_eq!(transport.calls_to(Method::Get, "/rest/notification"), 2);
    assert!(!top.state().is_stale);
  }

  #[tokio::test]
  async fn test_rejected_create_surfaces_error() {
    let transport = MockTransport::new();
    transport.reply(
      Method::Post,
      "/rest/products",
      Err(FetchError::Http {
        status: 400,
        message: "name required".into(),
      }),
    );
    let sync = coordinator(&Config::default(), transport.clone());

    let err = sync.mutate(create_product(&lamp())).await.unwrap_err();
    assert!(matches!(
      err,
      Error::Fetch(FetchError::Http { status: 400, .. })
    ));
    assert!(sync.store().is_empty());
  }

  #[tokio::test]
  async fn test_toggle_notification_refreshes_list() {
    let transport = MockTransport::new();
    let note = |read: bool| {
      json!([{
        "id": 7,
        "message": "Low stock",
        "productId": 3,
        "createdAt": "2024-01-01T00:00:00Z",
        "read": read
      }])
    };
    let unread = note(false);
    let read = note(true);
    transport.reply(Method::Get, "/rest/notification", Ok(unread));
    transport.reply(Method::Get, "/rest/notification", Ok(read.clone()));
    transport.reply(Method::Put, "/rest/notification/7/read", Ok(read[0].clone()));
    let sync = coordinator(&Config::default(), transport.clone());

    let mut notes = sync.query(NOTIFICATIONS, Params::new()).unwrap();
    assert_eq!(notes.settled().await.status, Status::Success);

    sync.mutate(toggle_notification(7)).await.unwrap();
    let state = notes.settled().await;
    assert_eq!(state.data(), Some(&read));
  }
}
