//! Refresh coordination: fetch-on-start, fetch-after-write, and stale-result
//! suppression for the in-memory working set.
//!
//! Single-writer-by-assignment model: the opportunity collection is only
//! ever replaced wholesale after a completed fetch, so readers never observe
//! a partial update. Overlapping fetches are neither serialized nor
//! cancelled; both run to completion and the last writer wins. Cancellation
//! is cooperative only: `shutdown()` flips a liveness flag that is checked
//! before a resolving fetch is applied, it does not abort the network call.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::board::{group_by_stage, BoardSnapshot};
use crate::error::EngineResult;
use crate::notify::{Notifier, Severity};
use crate::opportunity::{fetch_open_opportunities, Actor, Opportunity};
use crate::store::DataStore;
use crate::transition::{self, TransitionOutcome};

/// Observable fetch state. `Error` clears when the next fetch starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Loading,
    Error,
}

pub struct RefreshCoordinator {
    store: Arc<dyn DataStore>,
    notifier: Arc<dyn Notifier>,
    actor: RwLock<Actor>,
    opportunities: RwLock<Vec<Opportunity>>,
    fetch_state: RwLock<FetchState>,
    tick: AtomicU64,
    alive: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn DataStore>,
        notifier: Arc<dyn Notifier>,
        actor: Actor,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            notifier,
            actor: RwLock::new(actor),
            opportunities: RwLock::new(Vec::new()),
            fetch_state: RwLock::new(FetchState::Idle),
            tick: AtomicU64::new(0),
            alive: AtomicBool::new(true),
        })
    }

    /// Initial fetch. Call once after construction.
    pub async fn start(&self) {
        self.refresh().await;
    }

    /// Run one fetch cycle and apply the result if still live.
    ///
    /// Each cycle bumps the monotonic tick, so callers can re-trigger
    /// deterministically and observe that a refetch actually ran.
    pub async fn refresh(&self) -> u64 {
        let tick = self.tick.fetch_add(1, Ordering::SeqCst) + 1;
        *self.fetch_state.write() = FetchState::Loading;
        let actor = self.actor.read().clone();

        match fetch_open_opportunities(self.store.as_ref(), &actor).await {
            Ok(fetched) => {
                if !self.alive.load(Ordering::SeqCst) {
                    log::debug!("discarding fetch result, coordinator shut down");
                    return tick;
                }
                *self.opportunities.write() = fetched;
                *self.fetch_state.write() = FetchState::Idle;
            }
            Err(e) => {
                if !self.alive.load(Ordering::SeqCst) {
                    return tick;
                }
                // Previous collection stays as-is: stale beats partial.
                log::error!("opportunity fetch failed: {}", e);
                self.notifier.notify(e.user_message(), Severity::Error);
                *self.fetch_state.write() = FetchState::Error;
            }
        }
        tick
    }

    /// Manual refetch, e.g. after a transition write.
    pub async fn refetch(&self) -> u64 {
        self.refresh().await
    }

    /// Refetch after a fixed delay. Used by dialog completion callbacks to
    /// ride out eventual-consistency lag before re-reading.
    pub async fn refresh_after_delay(&self, delay: Duration) -> u64 {
        tokio::time::sleep(delay).await;
        self.refresh().await
    }

    /// Swap the acting user. Identity changes trigger a fresh fetch; setting
    /// the same actor is a no-op.
    pub async fn set_actor(&self, actor: Actor) {
        {
            let mut current = self.actor.write();
            if *current == actor {
                return;
            }
            *current = actor;
        }
        self.refresh().await;
    }

    /// Mark an opportunity as won, then re-synchronize.
    ///
    /// The opportunity leaves the board not because anything deletes it
    /// locally, but because the refetch re-applies the open-status filter.
    /// A failed transition propagates without triggering a refresh.
    pub async fn mark_won(&self, opportunity_id: &str) -> EngineResult<TransitionOutcome> {
        let outcome = transition::mark_won(
            self.store.as_ref(),
            self.notifier.as_ref(),
            opportunity_id,
        )
        .await?;
        self.refresh().await;
        Ok(outcome)
    }

    /// Completion callback for the external mark-lost dialog: refetch
    /// immediately.
    pub async fn on_mark_lost_completed(&self) -> u64 {
        self.refresh().await
    }

    /// Completion callback for the external next-step dialog: refetch after
    /// the eventual-consistency delay.
    pub async fn on_next_step_completed(&self) -> u64 {
        self.refresh_after_delay(Duration::from_millis(
            transition::NEXT_STEP_REFRESH_DELAY_MS,
        ))
        .await
    }

    /// Cooperative teardown: in-flight fetches keep running but their
    /// results are discarded.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn tick(&self) -> u64 {
        self.tick.load(Ordering::SeqCst)
    }

    pub fn fetch_state(&self) -> FetchState {
        *self.fetch_state.read()
    }

    /// Snapshot of the current working set.
    pub fn opportunities(&self) -> Vec<Opportunity> {
        self.opportunities.read().clone()
    }

    /// Partitioned board view of the current working set.
    pub fn board(&self) -> BoardSnapshot {
        group_by_stage(self.opportunities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use crate::opportunity::Role;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn row(id: &str, owner: &str, created_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "name": format!("Deal {}", id),
            "status": "open",
            "owner_id": owner,
            "stage": "Prospecting",
            "created_at": created_at,
        })
    }

    fn coordinator(
        store: &Arc<MemoryStore>,
        role: Role,
    ) -> (Arc<RefreshCoordinator>, Arc<RecordingNotifier>) {
        let _ = env_logger::builder().is_test(true).try_init();
        let notifier = Arc::new(RecordingNotifier::new());
        let coordinator = RefreshCoordinator::new(
            store.clone(),
            notifier.clone(),
            Actor {
                id: "U1".to_string(),
                role,
            },
        );
        (coordinator, notifier)
    }

    #[tokio::test]
    async fn test_start_populates_working_set() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        let (coordinator, _) = coordinator(&store, Role::Manager);

        coordinator.start().await;

        assert_eq!(coordinator.opportunities().len(), 1);
        assert_eq!(coordinator.fetch_state(), FetchState::Idle);
        assert_eq!(coordinator.tick(), 1);
    }

    #[tokio::test]
    async fn test_refetch_bumps_tick_and_picks_up_new_rows() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        let (coordinator, _) = coordinator(&store, Role::Manager);
        coordinator.start().await;

        store.seed(
            "opportunities",
            vec![
                row("a", "U1", "2024-01-01T00:00:00Z"),
                row("b", "U2", "2024-02-01T00:00:00Z"),
            ],
        );
        let tick = coordinator.refetch().await;

        assert_eq!(tick, 2);
        assert_eq!(coordinator.opportunities().len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_previous_collection() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        let (coordinator, notifier) = coordinator(&store, Role::Manager);
        coordinator.start().await;

        store.fail_table("opportunities");
        coordinator.refetch().await;

        assert_eq!(
            coordinator.opportunities().len(),
            1,
            "stale beats partial: previous collection retained"
        );
        assert_eq!(coordinator.fetch_state(), FetchState::Error);
        let recorded = notifier.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, "Failed to load opportunities");
    }

    #[tokio::test]
    async fn test_shutdown_suppresses_stale_result() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        store.set_latency(Duration::from_millis(50));
        let (coordinator, _) = coordinator(&store, Role::Manager);

        let in_flight = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        coordinator.shutdown();
        in_flight.await.expect("task");

        assert!(
            coordinator.opportunities().is_empty(),
            "result resolved after shutdown must be discarded"
        );
    }

    #[tokio::test]
    async fn test_set_actor_refetches_only_on_identity_change() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            "opportunities",
            vec![
                row("a", "U1", "2024-01-01T00:00:00Z"),
                row("b", "U2", "2024-02-01T00:00:00Z"),
            ],
        );
        let (coordinator, _) = coordinator(&store, Role::AccountManager);
        coordinator.start().await;
        assert_eq!(coordinator.opportunities().len(), 1);

        coordinator
            .set_actor(Actor {
                id: "U1".to_string(),
                role: Role::AccountManager,
            })
            .await;
        assert_eq!(coordinator.tick(), 1, "same actor does not refetch");

        coordinator
            .set_actor(Actor {
                id: "U2".to_string(),
                role: Role::AccountManager,
            })
            .await;
        assert_eq!(coordinator.tick(), 2);
        let ids: Vec<String> = coordinator
            .opportunities()
            .iter()
            .map(|o| o.id.clone())
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_after_delay_reloads() {
        let store = Arc::new(MemoryStore::new());
        let (coordinator, _) = coordinator(&store, Role::Manager);
        coordinator.start().await;
        assert!(coordinator.opportunities().is_empty());

        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        coordinator
            .refresh_after_delay(Duration::from_millis(5))
            .await;

        assert_eq!(coordinator.opportunities().len(), 1);
    }

    #[tokio::test]
    async fn test_end_to_end_proposal_lands_in_negotiation_group_only() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            "opportunities",
            vec![json!({
                "id": "o1",
                "name": "Acme Renewal",
                "status": "open",
                "stage": "Proposal",
                "created_at": "2024-01-01T00:00:00Z",
            })],
        );
        let (coordinator, _) = coordinator(&store, Role::Manager);
        coordinator.start().await;

        let board = coordinator.board();
        assert_eq!(board.group(crate::stage::Stage::Negotiation).count(), 1);
        let elsewhere: usize = board
            .groups
            .iter()
            .filter(|g| g.stage != crate::stage::Stage::Negotiation)
            .map(|g| g.count())
            .sum();
        assert_eq!(elsewhere, 0);
    }

    #[tokio::test]
    async fn test_mark_won_refetch_drops_opportunity_from_open_set() {
        let store = Arc::new(MemoryStore::new());
        store.seed(
            "opportunities",
            vec![
                row("a", "U1", "2024-01-01T00:00:00Z"),
                row("b", "U1", "2024-02-01T00:00:00Z"),
            ],
        );
        let (coordinator, _) = coordinator(&store, Role::Manager);
        coordinator.start().await;
        assert_eq!(coordinator.opportunities().len(), 2);

        let outcome = coordinator.mark_won("a").await.expect("mark won");
        assert_eq!(outcome.opportunity_id, "a");

        // Nothing deleted locally; the refetch re-applied the open filter.
        let ids: Vec<String> = coordinator
            .opportunities()
            .iter()
            .map(|o| o.id.clone())
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);
        assert_eq!(coordinator.tick(), 2);
    }

    #[tokio::test]
    async fn test_failed_mark_won_triggers_no_refresh() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        let (coordinator, notifier) = coordinator(&store, Role::Manager);
        coordinator.start().await;

        store.fail_table("opportunities");
        let err = coordinator.mark_won("a").await.expect_err("should fail");

        assert!(matches!(err, crate::error::EngineError::Transition(_)));
        assert_eq!(coordinator.tick(), 1, "no refetch after a failed transition");
        assert_eq!(coordinator.opportunities().len(), 1);
        assert_eq!(notifier.recorded().len(), 1);
    }

    #[tokio::test]
    async fn test_overlapping_fetches_last_writer_wins() {
        let store = Arc::new(MemoryStore::new());
        store.seed("opportunities", vec![row("a", "U1", "2024-01-01T00:00:00Z")]);
        store.set_latency(Duration::from_millis(20));
        let (coordinator, _) = coordinator(&store, Role::Manager);

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        };
        let second = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.refresh().await })
        };
        first.await.expect("first");
        second.await.expect("second");

        assert_eq!(coordinator.opportunities().len(), 1);
        assert_eq!(coordinator.tick(), 2);
        assert_eq!(coordinator.fetch_state(), FetchState::Idle);
    }
}
