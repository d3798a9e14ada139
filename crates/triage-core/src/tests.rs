//! Queue manager behaviour against the in-memory store.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::{
  Error, NewTicket, PriorityClass, QueueConfig, QueueManager, Removal, Ticket,
  TicketStatus,
  memory::{MemoryStore, StoreOp},
  priority,
  store::QueueStore as _,
};

fn manager() -> QueueManager<MemoryStore> {
  QueueManager::new(MemoryStore::new(), QueueConfig::default())
}

/// A waiting ticket that arrived `secs` seconds after a fixed point earlier
/// today, so it always falls inside the current service day.
fn ticket(priority: PriorityClass, secs: i64) -> Ticket {
  Ticket::new(
    "A1".parse().unwrap(),
    priority,
    format!("patient-{secs}"),
    base() + TimeDelta::seconds(secs),
  )
}

fn base() -> DateTime<Utc> {
  let window = crate::ServiceWindow::containing(Utc::now(), QueueConfig::default().offset());
  window.start
}

fn ids(tickets: &[Ticket]) -> Vec<Uuid> { tickets.iter().map(|t| t.visit_id).collect() }

// ─── Ordering ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn dequeue_follows_class_then_arrival() {
  let m = manager();
  let regular = ticket(PriorityClass::Regular, 1);
  let emergency = ticket(PriorityClass::Emergency, 2);
  let senior = ticket(PriorityClass::SeniorCitizen, 3);
  for t in [&regular, &emergency, &senior] {
    m.enqueue(t.clone()).await.unwrap();
  }

  let mut served = Vec::new();
  for _ in 0..3 {
    let t = m.dequeue("desk-1").await.unwrap().unwrap();
    m.complete_current_service("desk-1").await.unwrap();
    served.push(t.visit_id);
  }
  assert_eq!(served, vec![emergency.visit_id, senior.visit_id, regular.visit_id]);
}

#[tokio::test]
async fn tiers_drain_in_order_regardless_of_interleaving() {
  let m = manager();
  let classes = [
    PriorityClass::Regular,
    PriorityClass::SeniorCitizen,
    PriorityClass::Emergency,
    PriorityClass::Regular,
    PriorityClass::Emergency,
    PriorityClass::SeniorCitizen,
    PriorityClass::Regular,
    PriorityClass::Emergency,
  ];
  let mut expected: Vec<Ticket> = classes
    .iter()
    .enumerate()
    .map(|(i, c)| ticket(*c, i as i64))
    .collect();
  for t in &expected {
    m.enqueue(t.clone()).await.unwrap();
  }
  priority::sort(&mut expected);

  let mut served = Vec::new();
  while let Some(t) = m.dequeue("desk-1").await.unwrap() {
    m.complete_current_service("desk-1").await.unwrap();
    served.push(t);
  }
  assert_eq!(ids(&served), ids(&expected));
  let ranks: Vec<u8> = served.iter().map(|t| t.priority.rank()).collect();
  assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
}

// ─── Empty queue ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_manager_reports_empty() {
  let m = manager();
  assert!(m.dequeue("desk-1").await.unwrap().is_none());
  assert!(m.peek().await.is_none());
  assert_eq!(m.len().await, 0);
  assert!(m.is_empty().await);
}

#[tokio::test]
async fn empty_dequeue_leaves_pointer_alone() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap().unwrap();

  assert!(m.dequeue("desk-1").await.unwrap().is_none());
  let current = m.currently_serving("desk-1").await.unwrap();
  assert_eq!(current.visit_id, t.visit_id);
}

// ─── Enqueue ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn enqueue_then_dequeue_round_trips() {
  let m = manager();
  let before = m.len().await;
  let t = ticket(PriorityClass::SeniorCitizen, 0);
  m.enqueue(t.clone()).await.unwrap();
  assert_eq!(m.len().await, before + 1);

  let got = m.dequeue("desk-2").await.unwrap().unwrap();
  assert_eq!(got.visit_id, t.visit_id);
  assert_eq!(got.status, TicketStatus::InService);
  assert_eq!(got.assigned_server_id.as_deref(), Some("desk-2"));
  assert!(got.called_at.is_some());
  assert_eq!(m.len().await, before);

  let stored = m.store().get(t.visit_id).unwrap();
  assert_eq!(stored.status, TicketStatus::InService);
  assert_eq!(stored.assigned_server_id.as_deref(), Some("desk-2"));
}

#[tokio::test]
async fn enqueue_rejects_non_waiting_and_duplicates() {
  let m = manager();
  let mut called = ticket(PriorityClass::Regular, 0);
  called.status = TicketStatus::Called;
  assert!(matches!(
    m.enqueue(called).await,
    Err(Error::NotWaiting { status: TicketStatus::Called, .. })
  ));

  let t = ticket(PriorityClass::Regular, 1);
  m.enqueue(t.clone()).await.unwrap();
  assert!(matches!(m.enqueue(t.clone()).await, Err(Error::DuplicateVisit(id)) if id == t.visit_id));
  assert_eq!(m.len().await, 1);
  assert_eq!(m.store().len(), 1);
}

#[tokio::test]
async fn enqueue_of_a_finished_visit_is_a_duplicate_not_a_store_failure() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.store().put(Ticket { status: TicketStatus::Completed, ..t.clone() });

  let err = m.enqueue(t.clone()).await.unwrap_err();
  assert!(matches!(err, Error::DuplicateVisit(id) if id == t.visit_id));
  assert!(!err.is_retryable());
  assert!(m.is_empty().await);
  assert_eq!(m.store().get(t.visit_id).unwrap().status, TicketStatus::Completed);
}

#[tokio::test]
async fn enqueue_rejects_tickets_from_another_day() {
  let m = manager();
  let mut yesterday = ticket(PriorityClass::Emergency, 0);
  yesterday.created_at = base() - TimeDelta::hours(1);

  let err = m.enqueue(yesterday.clone()).await.unwrap_err();
  assert!(matches!(err, Error::OutsideServiceDay { visit_id, .. } if visit_id == yesterday.visit_id));
  assert!(!err.is_retryable());
  assert!(m.is_empty().await);
  assert!(m.store().is_empty());

  // Nothing was stored, so a sync has nothing to drop or resurrect.
  m.sync().await.unwrap();
  assert!(m.is_empty().await);
}

#[tokio::test]
async fn failed_persist_does_not_queue() {
  let m = manager();
  m.store().fail_next(StoreOp::CreateTicket, 1);
  let t = ticket(PriorityClass::Emergency, 0);

  let err = m.enqueue(t.clone()).await.unwrap_err();
  assert!(err.is_retryable());
  assert!(m.is_empty().await);
  assert!(m.store().get(t.visit_id).is_none());

  m.enqueue(t).await.unwrap();
  assert_eq!(m.len().await, 1);
}

#[tokio::test]
async fn concurrent_enqueues_are_all_kept() {
  let m = Arc::new(manager());
  let n = 50;
  let handles: Vec<_> = (0..n)
    .map(|i| {
      let m = Arc::clone(&m);
      tokio::spawn(async move {
        let class = match i % 3 {
          0 => PriorityClass::Emergency,
          1 => PriorityClass::SeniorCitizen,
          _ => PriorityClass::Regular,
        };
        m.enqueue(ticket(class, i)).await
      })
    })
    .collect();
  for h in handles {
    h.await.unwrap().unwrap();
  }

  assert_eq!(m.len().await, n as usize);
  let waiting = m.waiting(None).await;
  let mut unique = ids(&waiting);
  unique.sort();
  unique.dedup();
  assert_eq!(unique.len(), n as usize);
}

// ─── Issue / ticket numbers ──────────────────────────────────────────────────

#[tokio::test]
async fn issue_assigns_sequential_numbers() {
  let m = manager();
  let a = m.issue(NewTicket::new(PriorityClass::Regular, "p1")).await.unwrap();
  let b = m.issue(NewTicket::new(PriorityClass::Emergency, "p2")).await.unwrap();
  assert_eq!(a.ticket_number.to_string(), "A1");
  assert_eq!(b.ticket_number.to_string(), "A2");
  assert_eq!(m.peek().await.unwrap().visit_id, b.visit_id);
}

#[tokio::test]
async fn issue_continues_after_b10() {
  let m = manager();
  let mut seeded = ticket(PriorityClass::Regular, 0);
  seeded.ticket_number = "B10".parse().unwrap();
  m.store().put(seeded);

  let next = m.issue(NewTicket::new(PriorityClass::Regular, "p")).await.unwrap();
  assert_eq!(next.ticket_number.to_string(), "C1");
}

#[tokio::test]
async fn issue_wraps_after_z10() {
  let m = manager();
  let mut seeded = ticket(PriorityClass::Regular, 0);
  seeded.ticket_number = "Z10".parse().unwrap();
  m.store().put(seeded);

  let next = m.issue(NewTicket::new(PriorityClass::Regular, "p")).await.unwrap();
  assert_eq!(next.ticket_number.to_string(), "A1");
}

#[tokio::test]
async fn issue_ignores_yesterdays_numbers() {
  let m = manager();
  let mut old = ticket(PriorityClass::Regular, 0);
  old.ticket_number = "F3".parse().unwrap();
  old.created_at = base() - TimeDelta::hours(2);
  m.store().put(old);

  let next = m.issue(NewTicket::new(PriorityClass::Regular, "p")).await.unwrap();
  assert_eq!(next.ticket_number.to_string(), "A1");
}

#[tokio::test]
async fn concurrent_issues_get_distinct_numbers() {
  let m = Arc::new(manager());
  let handles: Vec<_> = (0..20)
    .map(|i| {
      let m = Arc::clone(&m);
      tokio::spawn(async move {
        m.issue(NewTicket::new(PriorityClass::Regular, format!("p{i}"))).await
      })
    })
    .collect();
  let mut codes = Vec::new();
  for h in handles {
    codes.push(h.await.unwrap().unwrap().ticket_number.ordinal());
  }
  codes.sort();
  codes.dedup();
  assert_eq!(codes.len(), 20);
}

// ─── Dequeue failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn failed_assignment_requeues_at_same_position() {
  let m = manager();
  let first = ticket(PriorityClass::Emergency, 0);
  let second = ticket(PriorityClass::Regular, 1);
  m.enqueue(second.clone()).await.unwrap();
  m.enqueue(first.clone()).await.unwrap();
  let before = m.len().await;

  m.store().fail_next(StoreOp::AssignServer, 1);
  let err = m.dequeue("desk-1").await.unwrap_err();
  assert!(matches!(err, Error::Persistence(_)));

  assert_eq!(m.len().await, before);
  assert_eq!(m.peek().await.unwrap().visit_id, first.visit_id);
  assert_eq!(m.position(first.visit_id).await, Some(1));
  assert!(m.currently_serving("desk-1").await.is_none());
  assert_eq!(m.store().get(first.visit_id).unwrap().status, TicketStatus::Waiting);
}

#[tokio::test]
async fn deleted_ticket_is_skipped_on_dequeue() {
  let m = manager();
  let gone = ticket(PriorityClass::Emergency, 0);
  let next = ticket(PriorityClass::Regular, 1);
  m.enqueue(gone.clone()).await.unwrap();
  m.enqueue(next.clone()).await.unwrap();
  assert!(m.store().delete(gone.visit_id));

  let got = m.dequeue("desk-1").await.unwrap().unwrap();
  assert_eq!(got.visit_id, next.visit_id);
  assert!(m.is_empty().await);
}

#[tokio::test]
async fn busy_server_cannot_take_another_ticket() {
  let m = manager();
  m.enqueue(ticket(PriorityClass::Regular, 0)).await.unwrap();
  m.enqueue(ticket(PriorityClass::Regular, 1)).await.unwrap();

  let current = m.dequeue("desk-1").await.unwrap().unwrap();
  let err = m.dequeue("desk-1").await.unwrap_err();
  assert!(matches!(err, Error::ServerBusy { visit_id, .. } if visit_id == current.visit_id));
  assert_eq!(m.len().await, 1);

  // Another desk is free to take it.
  assert!(m.dequeue("desk-2").await.unwrap().is_some());
}

// ─── Terminal transitions ────────────────────────────────────────────────────

#[tokio::test]
async fn complete_without_ticket_fails_without_touching_others() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();

  let err = m.complete_current_service("desk-2").await.unwrap_err();
  assert!(matches!(err, Error::NothingServing(s) if s == "desk-2"));
  assert_eq!(m.currently_serving("desk-1").await.unwrap().visit_id, t.visit_id);
}

#[tokio::test]
async fn complete_and_skip_persist_terminal_status() {
  let m = manager();
  let a = ticket(PriorityClass::Regular, 0);
  let b = ticket(PriorityClass::Regular, 1);
  m.enqueue(a.clone()).await.unwrap();
  m.enqueue(b.clone()).await.unwrap();

  m.dequeue("desk-1").await.unwrap();
  m.dequeue("desk-2").await.unwrap();

  let done = m.complete_current_service("desk-1").await.unwrap();
  assert_eq!(done.status, TicketStatus::Completed);
  let skipped = m.skip_current("desk-2").await.unwrap();
  assert_eq!(skipped.status, TicketStatus::Skipped);

  assert_eq!(m.store().get(a.visit_id).unwrap().status, TicketStatus::Completed);
  assert!(m.store().get(a.visit_id).unwrap().completed_at.is_some());
  assert_eq!(m.store().get(b.visit_id).unwrap().status, TicketStatus::Skipped);
  assert!(m.serving().await.is_empty());
}

#[tokio::test]
async fn stored_status_only_moves_forward() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();

  let now = Utc::now();
  let store = m.store();
  assert!(
    !store
      .update_status(t.visit_id, TicketStatus::InService, TicketStatus::Waiting, now)
      .await
      .unwrap()
  );
  assert!(
    !store
      .update_status(t.visit_id, TicketStatus::InService, TicketStatus::Called, now)
      .await
      .unwrap()
  );
  // Stale expectation of the current status.
  assert!(
    !store
      .update_status(t.visit_id, TicketStatus::Waiting, TicketStatus::Skipped, now)
      .await
      .unwrap()
  );
  assert_eq!(store.get(t.visit_id).unwrap().status, TicketStatus::InService);

  let done = m.complete_current_service("desk-1").await.unwrap();
  assert_eq!(done.status, TicketStatus::Completed);
  assert!(
    !store
      .update_status(t.visit_id, TicketStatus::Completed, TicketStatus::Skipped, now)
      .await
      .unwrap()
  );
  assert_eq!(store.get(t.visit_id).unwrap().status, TicketStatus::Completed);
}

#[tokio::test]
async fn failed_completion_keeps_pointer() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();

  m.store().fail_next(StoreOp::UpdateStatus, 1);
  assert!(m.complete_current_service("desk-1").await.unwrap_err().is_retryable());
  assert_eq!(m.currently_serving("desk-1").await.unwrap().visit_id, t.visit_id);

  // Retrying succeeds.
  m.complete_current_service("desk-1").await.unwrap();
  assert!(m.currently_serving("desk-1").await.is_none());
}

#[tokio::test]
async fn completion_of_deleted_ticket_clears_pointer() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();
  m.store().delete(t.visit_id);

  let err = m.complete_current_service("desk-1").await.unwrap_err();
  assert!(matches!(err, Error::VisitNotFound(id) if id == t.visit_id));
  assert!(m.currently_serving("desk-1").await.is_none());
}

// ─── Removal ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn remove_from_queue_marks_skipped() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();

  let removal = m.remove_from_queue(t.visit_id).await.unwrap();
  assert!(matches!(removal, Removal::Removed(ref r) if r.status == TicketStatus::Skipped));
  assert!(m.is_empty().await);
  assert_eq!(m.store().get(t.visit_id).unwrap().status, TicketStatus::Skipped);
}

#[tokio::test]
async fn removing_unknown_or_served_ticket_is_a_no_op() {
  let m = manager();
  assert_eq!(m.remove_from_queue(Uuid::new_v4()).await.unwrap(), Removal::AlreadyResolved);

  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();
  assert_eq!(m.remove_from_queue(t.visit_id).await.unwrap(), Removal::AlreadyResolved);
  assert_eq!(m.store().get(t.visit_id).unwrap().status, TicketStatus::InService);
}

#[tokio::test]
async fn removal_leaves_a_ticket_served_elsewhere_in_service() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();

  // Another process sharing the store takes the ticket first.
  assert!(m.store().assign_server(t.visit_id, "desk-9", Utc::now()).await.unwrap());

  assert_eq!(m.remove_from_queue(t.visit_id).await.unwrap(), Removal::AlreadyResolved);
  assert!(m.is_empty().await);
  let stored = m.store().get(t.visit_id).unwrap();
  assert_eq!(stored.status, TicketStatus::InService);
  assert_eq!(stored.assigned_server_id.as_deref(), Some("desk-9"));
  assert!(stored.completed_at.is_none());
}

#[tokio::test]
async fn failed_removal_keeps_ticket_queued() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();

  m.store().fail_next(StoreOp::UpdateStatus, 1);
  assert!(m.remove_from_queue(t.visit_id).await.is_err());
  assert_eq!(m.position(t.visit_id).await, Some(1));
}

#[tokio::test]
async fn removal_reaches_tickets_missing_from_a_stale_index() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.store().put(t.clone());

  let removal = m.remove_from_queue(t.visit_id).await.unwrap();
  assert!(matches!(removal, Removal::Removed(_)));
  assert_eq!(m.store().get(t.visit_id).unwrap().status, TicketStatus::Skipped);
}

// ─── Reclassification ────────────────────────────────────────────────────────

#[tokio::test]
async fn reclassify_moves_ticket_ahead() {
  let m = manager();
  let early = ticket(PriorityClass::Regular, 0);
  let late = ticket(PriorityClass::Regular, 5);
  m.enqueue(early.clone()).await.unwrap();
  m.enqueue(late.clone()).await.unwrap();

  let updated = m.reclassify(late.visit_id, PriorityClass::Emergency).await.unwrap();
  assert_eq!(updated.priority, PriorityClass::Emergency);
  assert_eq!(updated.created_at, late.created_at);
  assert_eq!(m.position(late.visit_id).await, Some(1));
  assert_eq!(m.len().await, 2);
  assert_eq!(m.store().get(late.visit_id).unwrap().priority, PriorityClass::Emergency);
}

#[tokio::test]
async fn failed_reclassify_keeps_old_class() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();

  m.store().fail_next(StoreOp::UpdatePriority, 1);
  assert!(m.reclassify(t.visit_id, PriorityClass::Emergency).await.is_err());
  assert_eq!(m.peek().await.unwrap().priority, PriorityClass::Regular);

  assert!(matches!(
    m.reclassify(Uuid::new_v4(), PriorityClass::Emergency).await,
    Err(Error::VisitNotFound(_))
  ));
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn peek_is_always_first_in_line() {
  let m = manager();
  for (i, class) in [
    PriorityClass::Regular,
    PriorityClass::SeniorCitizen,
    PriorityClass::Emergency,
  ]
  .into_iter()
  .enumerate()
  {
    m.enqueue(ticket(class, i as i64)).await.unwrap();
    let top = m.peek().await.unwrap();
    assert_eq!(m.position(top.visit_id).await, Some(1));
  }
  assert_eq!(m.len().await, 3);
  assert_eq!(m.position(Uuid::new_v4()).await, None);
}

#[tokio::test]
async fn place_in_line_pairs_position_with_length() {
  let m = manager();
  m.enqueue(ticket(PriorityClass::Emergency, 0)).await.unwrap();
  let regular = ticket(PriorityClass::Regular, 1);
  m.enqueue(regular.clone()).await.unwrap();

  assert_eq!(m.place_in_line(regular.visit_id).await, Some((2, 2)));
  assert_eq!(m.place_in_line(Uuid::new_v4()).await, None);

  m.dequeue("desk-1").await.unwrap();
  assert_eq!(m.place_in_line(regular.visit_id).await, Some((1, 1)));
}

#[tokio::test]
async fn waiting_respects_limit_and_order() {
  let m = manager();
  let tickets: Vec<Ticket> = (0..5).map(|i| ticket(PriorityClass::Regular, 10 - i)).collect();
  for t in &tickets {
    m.enqueue(t.clone()).await.unwrap();
  }
  let top = m.waiting(Some(2)).await;
  assert_eq!(top.len(), 2);
  assert!(priority::compare(&top[0], &top[1]).is_lt());
  assert_eq!(top[0].visit_id, tickets[4].visit_id);
  assert_eq!(m.waiting(None).await.len(), 5);
}

#[tokio::test]
async fn find_checks_memory_then_store() {
  let m = manager();
  let queued = ticket(PriorityClass::Regular, 0);
  m.enqueue(queued.clone()).await.unwrap();
  let archived = ticket(PriorityClass::Regular, 1);
  m.store().put(Ticket { status: TicketStatus::Completed, ..archived.clone() });

  assert_eq!(m.find(queued.visit_id).await.unwrap().unwrap().visit_id, queued.visit_id);
  assert_eq!(
    m.find(archived.visit_id).await.unwrap().unwrap().status,
    TicketStatus::Completed
  );
  assert!(m.find(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sync_restores_order_after_restart() {
  let store = MemoryStore::new();
  let regular = ticket(PriorityClass::Regular, 0);
  let senior = ticket(PriorityClass::SeniorCitizen, 1);
  let emergency = ticket(PriorityClass::Emergency, 2);
  for t in [&regular, &senior, &emergency] {
    store.put(t.clone());
  }

  let m = QueueManager::new(store, QueueConfig::default());
  let report = m.sync().await.unwrap();
  assert_eq!(report.waiting, 3);
  assert_eq!(report.serving, 0);
  assert_eq!(
    ids(&m.waiting(None).await),
    vec![emergency.visit_id, senior.visit_id, regular.visit_id]
  );
}

#[tokio::test]
async fn sync_mirrors_store_waiting_set() {
  let m = manager();
  // In memory only: will be dropped by sync.
  let phantom = ticket(PriorityClass::Emergency, 0);
  m.enqueue(phantom.clone()).await.unwrap();
  m.store().delete(phantom.visit_id);

  let waiting = ticket(PriorityClass::Regular, 1);
  m.store().put(waiting.clone());
  m.store().put(Ticket {
    status: TicketStatus::Completed,
    ..ticket(PriorityClass::Regular, 2)
  });
  let mut yesterday = ticket(PriorityClass::Regular, 3);
  yesterday.created_at = base() - TimeDelta::hours(1);
  m.store().put(yesterday);

  m.sync().await.unwrap();
  assert_eq!(ids(&m.waiting(None).await), vec![waiting.visit_id]);
  // Idempotent.
  m.sync().await.unwrap();
  assert_eq!(ids(&m.waiting(None).await), vec![waiting.visit_id]);
}

#[tokio::test]
async fn sync_restores_serving_pointers() {
  let store = MemoryStore::new();
  let mut serving = ticket(PriorityClass::Regular, 0);
  serving.assign("desk-3", base() + TimeDelta::seconds(30)).unwrap();
  store.put(serving.clone());

  let m = QueueManager::new(store, QueueConfig::default());
  let report = m.sync().await.unwrap();
  assert_eq!(report.serving, 1);
  assert_eq!(m.currently_serving("desk-3").await.unwrap().visit_id, serving.visit_id);

  let done = m.complete_current_service("desk-3").await.unwrap();
  assert_eq!(done.visit_id, serving.visit_id);
}

#[tokio::test]
async fn sync_reconnects_once_after_a_dropped_connection() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.store().put(t.clone());
  m.store().disconnect();

  let report = m.sync().await.unwrap();
  assert_eq!(report.waiting, 1);
  assert_eq!(m.store().reconnect_count(), 1);
}

#[tokio::test]
async fn failed_sync_keeps_existing_queue() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.dequeue("desk-1").await.unwrap();
  let u = ticket(PriorityClass::Emergency, 1);
  m.enqueue(u.clone()).await.unwrap();

  m.store().set_unreachable(true);
  assert!(m.sync().await.unwrap_err().is_retryable());
  assert_eq!(m.store().reconnect_count(), 1);
  assert_eq!(ids(&m.waiting(None).await), vec![u.visit_id]);
  assert_eq!(m.currently_serving("desk-1").await.unwrap().visit_id, t.visit_id);

  m.store().set_unreachable(false);
  m.sync().await.unwrap();
}

#[tokio::test]
async fn failed_retry_after_reconnect_keeps_existing_queue() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();

  m.store().fail_next(StoreOp::FindWaiting, 2);
  assert!(m.sync().await.is_err());
  assert_eq!(m.len().await, 1);
}

#[tokio::test]
async fn reset_clears_memory_only() {
  let m = manager();
  let t = ticket(PriorityClass::Regular, 0);
  m.enqueue(t.clone()).await.unwrap();
  m.reset().await;
  assert!(m.is_empty().await);
  assert!(m.store().get(t.visit_id).is_some());

  m.sync().await.unwrap();
  assert_eq!(m.len().await, 1);
}
