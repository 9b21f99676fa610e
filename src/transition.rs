//! Lifecycle transition operations: the writes that move an opportunity out
//! of the open working set.
//!
//! `mark_won` is the only transition the engine performs itself. Mark-lost
//! and next-step edits belong to external dialogs; the engine hands them a
//! prompt payload and reacts to their completion callback with a refresh.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::notify::{Notifier, Severity};
use crate::opportunity::Opportunity;
use crate::store::DataStore;

/// Delay before refetching after a next-step edit. The backing store is
/// eventually consistent; an immediate re-read can miss the dialog's write.
/// A heuristic, not a correctness guarantee.
pub const NEXT_STEP_REFRESH_DELAY_MS: u64 = 500;

/// Result of a transition: the primary write outcome is the `Ok`/`Err` of
/// the call itself; the advisory audit write reports separately here and
/// never affects control flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub opportunity_id: String,
    pub audit_recorded: bool,
}

/// Mark an opportunity as won.
///
/// One atomic update sets the full won-state field set. On success a win
/// activity record is inserted best-effort and the caller should trigger a
/// refetch. On primary failure the transition aborts with
/// `EngineError::Transition`, state stays consistent with the last fetch,
/// and no refresh should run.
pub async fn mark_won(
    store: &dyn DataStore,
    notifier: &dyn Notifier,
    opportunity_id: &str,
) -> EngineResult<TransitionOutcome> {
    let fields = won_projection(Utc::now());

    if let Err(e) = store.update("opportunities", opportunity_id, fields).await {
        log::error!("mark_won failed for {}: {}", opportunity_id, e);
        notifier.notify("Failed to mark opportunity as won", Severity::Error);
        return Err(EngineError::Transition(e.to_string()));
    }

    let audit_recorded = record_win_activity(store, opportunity_id).await;

    notifier.notify("Opportunity marked as won! 🎉", Severity::Success);
    Ok(TransitionOutcome {
        opportunity_id: opportunity_id.to_string(),
        audit_recorded,
    })
}

/// Best-effort audit record for a win. Failure is logged, never propagated:
/// the primary state change is the source of truth, the trail is advisory.
async fn record_win_activity(store: &dyn DataStore, opportunity_id: &str) -> bool {
    let created_by = match store.rpc("auth_user_id", json!({})).await {
        Ok(value) => value.as_str().map(str::to_string),
        Err(e) => {
            log::warn!("could not resolve acting user for win activity: {}", e);
            None
        }
    };

    let record = json!({
        "id": Uuid::new_v4().to_string(),
        "opportunity_id": opportunity_id,
        "subject": "Opportunity marked as won",
        "description": "Congratulations! This opportunity has been successfully closed.",
        "status": "done",
        "created_by": created_by,
        "created_at": Utc::now().to_rfc3339(),
    });

    match store.insert("activities", record).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!(
                "failed to create win activity record for {}: {}",
                opportunity_id,
                e
            );
            false
        }
    }
}

/// Payload handed to the external mark-lost dialog. The dialog performs its
/// own write and signals completion; the engine then refetches immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkLostPrompt {
    pub opportunity_id: String,
    pub opportunity_name: String,
}

pub fn mark_lost_prompt(opportunity: &Opportunity) -> MarkLostPrompt {
    MarkLostPrompt {
        opportunity_id: opportunity.id.clone(),
        opportunity_name: opportunity.name.clone(),
    }
}

/// Payload handed to the external next-step dialog. On completion the caller
/// schedules a refetch after [`NEXT_STEP_REFRESH_DELAY_MS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextStepPrompt {
    pub opportunity_id: String,
    pub opportunity_name: String,
    pub current_title: Option<String>,
    pub current_due_date: Option<String>,
}

pub fn next_step_prompt(opportunity: &Opportunity) -> NextStepPrompt {
    NextStepPrompt {
        opportunity_id: opportunity.id.clone(),
        opportunity_name: opportunity.name.clone(),
        current_title: opportunity.next_step_title.clone(),
        current_due_date: opportunity.next_step_due_date.clone(),
    }
}

/// The won-state field set, as written by [`mark_won`]. Also usable by
/// callers that project the change locally before the authoritative refetch
/// lands; divergence resolves by last-authoritative-read-wins.
pub fn won_projection(now: chrono::DateTime<Utc>) -> Value {
    json!({
        "status": "won",
        "is_won": true,
        "is_closed": true,
        "expected_close_date": now.format("%Y-%m-%d").to_string(),
        "probability": 100,
        "stage": "Closed Won",
        "updated_at": now.to_rfc3339(),
    })
}
