//! Static description of every remote resource and mutation.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use super::traits::{Fingerprint, Params, RequestSpec, ResourceTag};
use crate::error::{Error, FetchError};

/// Turns a raw response body into validated data.
pub type ParseFn = fn(Value) -> Result<Value, FetchError>;

/// Re-serialize a value through JSON to convert between compatible types.
pub fn reserialize<T: DeserializeOwned>(value: impl Serialize) -> serde_json::Result<T> {
  serde_json::from_value(serde_json::to_value(value)?)
}

/// Check a raw body against schema `T` and return its canonical JSON form.
///
/// Fields not present in `T` are dropped, so cached data only ever carries
/// what the schema describes.
pub fn validate<T: DeserializeOwned + Serialize>(raw: Value) -> Result<Value, FetchError> {
  let typed: T = serde_json::from_value(raw).map_err(|e| FetchError::Parse(e.to_string()))?;
  serde_json::to_value(typed).map_err(|e| FetchError::Parse(e.to_string()))
}

/// A readable remote resource.
pub struct ResourceDescriptor {
  pub name: &'static str,
  pub tag: ResourceTag,
  build: fn(&Params) -> RequestSpec,
  parse: ParseFn,
}

impl ResourceDescriptor {
  pub fn new(
    name: &'static str,
    tag: ResourceTag,
    build: fn(&Params) -> RequestSpec,
    parse: ParseFn,
  ) -> Self {
    Self {
      name,
      tag,
      build,
      parse,
    }
  }

  pub fn fingerprint(&self, params: Params) -> Fingerprint {
    Fingerprint::new(self.name, self.tag, params)
  }

  pub fn build_request(&self, params: &Params) -> RequestSpec {
    (self.build)(params)
  }

  pub fn parse_response(&self, raw: Value) -> Result<Value, FetchError> {
    (self.parse)(raw)
  }
}

/// A write operation against the remote service.
pub struct MutationDescriptor {
  pub kind: &'static str,
  build: fn(&Params, Option<Value>) -> RequestSpec,
  parse: ParseFn,
}

impl MutationDescriptor {
  pub fn new(
    kind: &'static str,
    build: fn(&Params, Option<Value>) -> RequestSpec,
    parse: ParseFn,
  ) -> Self {
    Self { kind, build, parse }
  }

  pub fn build_request(&self, params: &Params, body: Option<Value>) -> RequestSpec {
    (self.build)(params, body)
  }

  pub fn parse_response(&self, raw: Value) -> Result<Value, FetchError> {
    (self.parse)(raw)
  }
}

/// Lookup table of resource and mutation descriptors.
#[derive(Default)]
pub struct ResourceRegistry {
  queries: HashMap<&'static str, Arc<ResourceDescriptor>>,
  mutations: HashMap<&'static str, Arc<MutationDescriptor>>,
}

impl ResourceRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_query(mut self, descriptor: ResourceDescriptor) -> Self {
    self.queries.insert(descriptor.name, Arc::new(descriptor));
    self
  }

  pub fn with_mutation(mut self, descriptor: MutationDescriptor) -> Self {
    self.mutations.insert(descriptor.kind, Arc::new(descriptor));
    self
  }

  pub fn query(&self, name: &str) -> Result<Arc<ResourceDescriptor>, Error> {
    self
      .queries
      .get(name)
      .cloned()
      .ok_or_else(|| Error::UnknownResource(name.to_string()))
  }

  pub fn mutation(&self, kind: &str) -> Result<Arc<MutationDescriptor>, Error> {
    self
      .mutations
      .get(kind)
      .cloned()
      .ok_or_else(|| Error::UnknownMutation(kind.to_string()))
  }

  /// Names of all registered resources, sorted.
  pub fn resource_names(&self) -> Vec<&'static str> {
    let mut names: Vec<_> = self.queries.keys().copied().collect();
    names.sort_unstable();
    names
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Serialize, Deserialize)]
  struct Item {
    id: u32,
  }

  #[test]
  fn test_validate_strips_unknown_fields() {
    let raw = serde_json::json!([{ "id": 1, "extra": true }]);
    let value = validate::<Vec<Item>>(raw).unwrap();
    assert_eq!(value, serde_json::json!([{ "id": 1 }]));
  }

  #[test]
  fn test_validate_fails_closed() {
    let raw = serde_json::json!({ "id": "one" });
    let err = validate::<Item>(raw).unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
  }

  #[test]
  fn test_unknown_names() {
    let registry = ResourceRegistry::new();
    assert_eq!(
      registry.query("Nope").err(),
      Some(Error::UnknownResource("Nope".into()))
    );
    assert_eq!(
      registry.mutation("nope").err(),
      Some(Error::UnknownMutation("nope".into()))
    );
  }
}
