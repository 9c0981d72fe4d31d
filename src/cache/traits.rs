//! Core traits and types for the caching system.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::FetchError;

/// Request parameters for a resource. Ordered, so two maps with the same
/// pairs always canonicalize to the same fingerprint.
pub type Params = BTreeMap<String, String>;

/// Build a [`Params`] map from string pairs.
pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Params {
  pairs
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Tag naming a family of cached data that mutations can invalidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceTag(&'static str);

impl ResourceTag {
  pub const fn new(name: &'static str) -> Self {
    Self(name)
  }

  pub fn as_str(&self) -> &'static str {
    self.0
  }
}

impl fmt::Display for ResourceTag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.0)
  }
}

/// Canonical key for one cache entry: the resource it was built from plus its
/// parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
  resource: &'static str,
  tag: ResourceTag,
  params: Params,
}

impl Fingerprint {
  pub fn new(resource: &'static str, tag: ResourceTag, params: Params) -> Self {
    Self {
      resource,
      tag,
      params,
    }
  }

  pub fn resource(&self) -> &'static str {
    self.resource
  }

  pub fn tag(&self) -> ResourceTag {
    self.tag
  }

  pub fn params(&self) -> &Params {
    &self.params
  }
}

impl fmt::Display for Fingerprint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.resource)?;
    for (i, (k, v)) in self.params.iter().enumerate() {
      let sep = if i == 0 { '?' } else { '&' };
      write!(f, "{}{}={}", sep, k, v)?;
    }
    Ok(())
  }
}

/// HTTP verb of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

/// Transport-agnostic description of one request to the remote service.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
  pub method: Method,
  /// Path relative to the service base URL, e.g. `/rest/products`.
  pub path: String,
  /// Query-string pairs appended to the path.
  pub query: Params,
  pub body: Option<Value>,
}

impl RequestSpec {
  pub fn get(path: impl Into<String>) -> Self {
    Self {
      method: Method::Get,
      path: path.into(),
      query: Params::new(),
      body: None,
    }
  }

  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
    self.query.insert(key.to_string(), value.into());
    self
  }

  pub fn with_body(mut self, body: Option<Value>) -> Self {
    self.body = body;
    self
  }
}

/// Something that can carry a request to the remote service and hand back the
/// raw JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
  async fn send(&self, request: &RequestSpec) -> Result<Value, FetchError>;
}
