//! Scripted transport for exercising the coordinator without a server.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::traits::{Method, RequestSpec, Transport};
use crate::error::FetchError;

struct Reply {
  result: Result<Value, FetchError>,
  gate: Option<Arc<Notify>>,
}

/// Replies are queued per `(method, path)`. The last queued reply for a route
/// is reused once the queue is down to one.
#[derive(Default)]
pub struct MockTransport {
  routes: Mutex<HashMap<(Method, String), VecDeque<Reply>>>,
  calls: Mutex<Vec<RequestSpec>>,
}

impl MockTransport {
  pub fn new() -> Arc<Self> {
    Arc::new(Self::default())
  }

  fn push(&self, method: Method, path: &str, reply: Reply) {
    self
      .routes
      .lock()
      .unwrap()
      .entry((method, path.to_string()))
      .or_default()
      .push_back(reply);
  }

  pub fn reply(&self, method: Method, path: &str, result: Result<Value, FetchError>) {
    self.push(method, path, Reply { result, gate: None });
  }

  /// Queue a reply that is held back until the returned gate is notified.
  pub fn reply_gated(
    &self,
    method: Method,
    path: &str,
    result: Result<Value, FetchError>,
  ) -> Arc<Notify> {
    let gate = Arc::new(Notify::new());
    self.push(
      method,
      path,
      Reply {
        result,
        gate: Some(gate.clone()),
      },
    );
    gate
  }

  pub fn calls(&self) -> Vec<RequestSpec> {
    self.calls.lock().unwrap().clone()
  }

  pub fn calls_to(&self, method: Method, path: &str) -> usize {
    self
      .calls
      .lock()
      .unwrap()
      .iter()
      .filter(|c| c.method == method && c.path == path)
      .count()
  }
}

#[async_trait]
impl Transport for MockTransport {
  async fn send(&self, request: &RequestSpec) -> Result<Value, FetchError> {
    self.calls.lock().unwrap().push(request.clone());

    let (result, gate) = {
      let mut routes = self.routes.lock().unwrap();
      let queue = routes
        .get_mut(&(request.method, request.path.clone()))
        .filter(|q| !q.is_empty());
      match queue {
        Some(queue) if queue.len() > 1 => {
          let reply = queue.pop_front().unwrap();
          (reply.result, reply.gate)
        }
        Some(queue) => {
          let reply = &queue[0];
          (reply.result.clone(), reply.gate.clone())
        }
        None => (
          Err(FetchError::Http {
            status: 404,
            message: format!("no route for {}", request.path),
          }),
          None,
        ),
      }
    };

    if let Some(gate) = gate {
      gate.notified().await;
    }
    result
  }
}
