//! Declarative mapping from mutation kind to the tags it makes stale.

use std::collections::{BTreeSet, HashMap};

use super::traits::ResourceTag;

#[derive(Debug, Clone, Default)]
pub struct InvalidationGraph {
  edges: HashMap<&'static str, BTreeSet<ResourceTag>>,
}

impl InvalidationGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Declare that a successful `kind` mutation invalidates `tags`.
  pub fn on(mut self, kind: &'static str, tags: impl IntoIterator<Item = ResourceTag>) -> Self {
    self.edges.entry(kind).or_default().extend(tags);
    self
  }

  /// Tags invalidated by `kind`; empty for kinds with no declared edges.
  pub fn tags_for(&self, kind: &str) -> BTreeSet<ResourceTag> {
    self.edges.get(kind).cloned().unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const A: ResourceTag = ResourceTag::new("A");
  const B: ResourceTag = ResourceTag::new("B");

  #[test]
  fn test_edges_accumulate() {
    let graph = InvalidationGraph::new().on("write", [A]).on("write", [B]);
    assert_eq!(graph.tags_for("write"), BTreeSet::from([A, B]));
    assert!(graph.tags_for("other").is_empty());
  }
}
