//! The live index: waiting tickets kept in service order.
//!
//! Insert, extract-min and removal by visit id are all O(log n). Read-only
//! projections hand out clones; callers never see the map itself.

use std::collections::{BTreeMap, HashMap};

use uuid::Uuid;

use crate::{priority::PriorityKey, ticket::Ticket};

#[derive(Debug, Default, Clone)]
pub struct LiveIndex {
  ordered: BTreeMap<PriorityKey, Ticket>,
  keys:    HashMap<Uuid, PriorityKey>,
}

impl LiveIndex {
  pub fn new() -> Self { Self::default() }

  /// Build an index from arbitrary-order tickets. Later duplicates of a
  /// visit id replace earlier ones.
  pub fn from_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
    let mut index = Self::new();
    for ticket in tickets {
      index.insert(ticket);
    }
    index
  }

  pub fn len(&self) -> usize { self.ordered.len() }

  pub fn is_empty(&self) -> bool { self.ordered.is_empty() }

  pub fn contains(&self, visit_id: Uuid) -> bool { self.keys.contains_key(&visit_id) }

  /// Insert or replace the ticket with this visit id.
  pub fn insert(&mut self, ticket: Ticket) {
    let key = PriorityKey::of(&ticket);
    if let Some(old) = self.keys.insert(ticket.visit_id, key) {
      self.ordered.remove(&old);
    }
    self.ordered.insert(key, ticket);
  }

  pub fn peek(&self) -> Option<&Ticket> {
    self.ordered.first_key_value().map(|(_, t)| t)
  }

  pub fn pop(&mut self) -> Option<Ticket> {
    let (_, ticket) = self.ordered.pop_first()?;
    self.keys.remove(&ticket.visit_id);
    Some(ticket)
  }

  pub fn get(&self, visit_id: Uuid) -> Option<&Ticket> {
    self.keys.get(&visit_id).and_then(|k| self.ordered.get(k))
  }

  pub fn remove(&mut self, visit_id: Uuid) -> Option<Ticket> {
    let key = self.keys.remove(&visit_id)?;
    self.ordered.remove(&key)
  }

  /// 1-based rank in service order.
  pub fn position(&self, visit_id: Uuid) -> Option<usize> {
    let key = self.keys.get(&visit_id)?;
    self.ordered.keys().position(|k| k == key).map(|i| i + 1)
  }

  /// Ordered copy of at most `limit` tickets (all when `None`).
  pub fn snapshot(&self, limit: Option<usize>) -> Vec<Ticket> {
    self
      .ordered
      .values()
      .take(limit.unwrap_or(usize::MAX))
      .cloned()
      .collect()
  }

  pub fn clear(&mut self) {
    self.ordered.clear();
    self.keys.clear();
  }
}
