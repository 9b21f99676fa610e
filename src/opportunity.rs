//! Opportunity read model and the repository adapter that loads it.
//!
//! Entities are read fresh on every fetch; nothing here caches across
//! fetches. Raw store rows arrive as JSON and are folded into
//! [`Opportunity`] with the defaults the board expects, so downstream code
//! never sees a null name or an unnormalized stage label.

use serde::Serialize;
use serde_json::Value;

use crate::error::EngineResult;
use crate::stage::{normalize, NormalizedStage};
use crate::store::{DataStore, Filter, Order};

/// Placeholder for rows whose name is null, empty, or whitespace.
pub const NO_NAME_PLACEHOLDER: &str = "[No Name]";

const DEFAULT_CURRENCY: &str = "USD";
const DEFAULT_FORECAST_CATEGORY: &str = "Pipeline";
const DEFAULT_STAGE: &str = "Prospecting";

/// Role of the acting user. Only `AccountManager` narrows board visibility;
/// the admin surface owns everything else about roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Head,
    Manager,
    AccountManager,
    Pending,
}

impl Role {
    /// Parse the role column. Null and unknown values map to `Pending`,
    /// matching how the user store treats profiles without an assigned role.
    pub fn parse(value: &str) -> Role {
        match value {
            "admin" => Role::Admin,
            "head" => Role::Head,
            "manager" => Role::Manager,
            "account_manager" => Role::AccountManager,
            _ => Role::Pending,
        }
    }
}

/// The acting user, as far as the board cares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

/// A sales opportunity as the board reads it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: String,
    /// Never empty or whitespace-only; see [`NO_NAME_PLACEHOLDER`].
    pub name: String,
    pub amount: Option<f64>,
    pub currency: String,
    pub stage: NormalizedStage,
    pub next_step_title: Option<String>,
    pub next_step_due_date: Option<String>,
    pub expected_close_date: Option<String>,
    pub last_activity_at: Option<String>,
    /// Persisted probability. Display code re-derives the pill value from the
    /// stage weight table instead; the two may disagree.
    pub probability: i64,
    pub forecast_category: String,
    pub created_at: String,
    pub customer_name: Option<String>,
}

/// Fetch the open working set for an actor.
///
/// One scoped read: `status = open`, plus an owner predicate when the actor
/// is an account manager (a visibility filter, not a security boundary).
/// Newest first. Transport or query failure surfaces as
/// `EngineError::DataAccess`; the caller keeps its previous collection.
pub async fn fetch_open_opportunities(
    store: &dyn DataStore,
    actor: &Actor,
) -> EngineResult<Vec<Opportunity>> {
    let mut filters = vec![Filter::eq("status", "open")];
    if actor.role == Role::AccountManager {
        filters.push(Filter::eq("owner_id", &actor.id));
    }

    let rows = store
        .select("opportunities", &filters, Some(&Order::desc("created_at")))
        .await?;

    let opportunities: Vec<Opportunity> = rows.iter().filter_map(map_row).collect();
    log::debug!(
        "fetched {} open opportunities for actor {}",
        opportunities.len(),
        actor.id
    );
    Ok(opportunities)
}

/// Fold one raw row into the read model. Rows without an id are skipped;
/// everything else gets a default.
pub fn map_row(row: &Value) -> Option<Opportunity> {
    let id = non_empty_str(row.get("id"))?;

    let name = match non_empty_trimmed(row.get("name")) {
        Some(name) => name,
        None => NO_NAME_PLACEHOLDER.to_string(),
    };

    // Prefer the free-text stage column so client-side fallbacks stay
    // readable; fall back to the relational stage name, then the default.
    let raw_stage = non_empty_trimmed(row.get("stage"))
        .or_else(|| non_empty_trimmed(row.get("pipeline_stages").and_then(|s| s.get("name"))))
        .unwrap_or_else(|| DEFAULT_STAGE.to_string());

    Some(Opportunity {
        id: id.to_string(),
        name,
        amount: row.get("amount").and_then(Value::as_f64),
        currency: non_empty_trimmed(row.get("currency"))
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
        stage: normalize(&raw_stage),
        next_step_title: owned_str(row.get("next_step_title")),
        next_step_due_date: owned_str(row.get("next_step_due_date")),
        expected_close_date: owned_str(row.get("expected_close_date")),
        last_activity_at: owned_str(row.get("last_activity_at")),
        probability: row.get("probability").and_then(Value::as_i64).unwrap_or(0),
        forecast_category: non_empty_trimmed(row.get("forecast_category"))
            .unwrap_or_else(|| DEFAULT_FORECAST_CATEGORY.to_string()),
        created_at: owned_str(row.get("created_at")).unwrap_or_default(),
        customer_name: owned_str(row.get("customer").and_then(|c| c.get("name"))),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn non_empty_trimmed(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn owned_str(value: Option<&Value>) -> Option<String> {
    value.and_then(Value::as_str).map(str::to_string)
}
