//! Stage aggregation: partition the fetched working set into board columns
//! and compute per-column rollups.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::countdown::{classify_due_date, inactivity_days, parse_date, parse_timestamp, DueCountdown};
use crate::opportunity::Opportunity;
use crate::stage::Stage;

/// One board column: a taxonomy stage plus its opportunities.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageGroup {
    pub stage: Stage,
    pub opportunities: Vec<Opportunity>,
}

impl StageGroup {
    pub fn count(&self) -> usize {
        self.opportunities.len()
    }

    /// Sum of member amounts, nulls as 0.
    pub fn total_value(&self) -> f64 {
        self.opportunities
            .iter()
            .map(|opp| opp.amount.unwrap_or(0.0))
            .sum()
    }
}

/// The partitioned board: one group per taxonomy stage, in column order,
/// empty groups included. Opportunities whose stage the taxonomy does not
/// recognize land in `dropped` and render in no column.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSnapshot {
    pub groups: Vec<StageGroup>,
    pub dropped: Vec<Opportunity>,
}

impl BoardSnapshot {
    pub fn group(&self, stage: Stage) -> &StageGroup {
        // Groups are constructed in Stage::ALL order.
        &self.groups[stage.column_index()]
    }
}

/// Partition opportunities by canonical stage in one pass.
///
/// Every taxonomy stage gets a group even when empty. Each opportunity joins
/// exactly the group matching its normalized stage; unrecognized stages are
/// excluded from every group, collected on the snapshot, and logged so they
/// don't vanish silently.
pub fn group_by_stage(opportunities: Vec<Opportunity>) -> BoardSnapshot {
    let mut groups: Vec<StageGroup> = Stage::ALL
        .iter()
        .map(|stage| StageGroup {
            stage: *stage,
            opportunities: Vec::new(),
        })
        .collect();
    let mut dropped = Vec::new();

    for opportunity in opportunities {
        match opportunity.stage.canonical() {
            Some(stage) => groups[stage.column_index()].opportunities.push(opportunity),
            None => dropped.push(opportunity),
        }
    }

    if !dropped.is_empty() {
        let labels: Vec<String> = dropped
            .iter()
            .map(|o| format!("{} ({})", o.name, o.stage))
            .collect();
        log::warn!(
            "{} opportunities excluded from the board, stage not in taxonomy: {}",
            dropped.len(),
            labels.join(", ")
        );
    }

    BoardSnapshot { groups, dropped }
}

/// Presentation metadata derived per card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardAnnotations {
    /// Probability pill from the stage weight table; 0 for unrecognized
    /// stages. Independent of the persisted probability column.
    pub display_probability: u8,
    pub due: Option<DueCountdown>,
    pub inactivity_days: Option<i64>,
}

/// Compute card annotations against a reference date/time.
pub fn annotate_card(
    opportunity: &Opportunity,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> CardAnnotations {
    let due = opportunity
        .next_step_due_date
        .as_deref()
        .and_then(parse_date)
        .map(|due| classify_due_date(due, today));

    let last_activity = opportunity
        .last_activity_at
        .as_deref()
        .and_then(parse_timestamp);

    CardAnnotations {
        display_probability: opportunity
            .stage
            .canonical()
            .map(|s| s.display_probability())
            .unwrap_or(0),
        due,
        inactivity_days: inactivity_days(last_activity, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::countdown::DueStatus;
    use crate::stage::{normalize, NormalizedStage};

    fn opp(id: &str, stage: &str, amount: Option<f64>) -> Opportunity {
        Opportunity {
            id: id.to_string(),
            name: format!("Deal {}", id),
            amount,
            currency: "USD".to_string(),
            stage: normalize(stage),
            next_step_title: None,
            next_step_due_date: None,
            expected_close_date: None,
            last_activity_at: None,
            probability: 0,
            forecast_category: "Pipeline".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            customer_name: None,
        }
    }

    #[test]
    fn test_every_stage_gets_a_group_even_when_empty() {
        let snapshot = group_by_stage(vec![opp("a", "Negotiation", None)]);
        assert_eq!(snapshot.groups.len(), Stage::ALL.len());
        for (group, stage) in snapshot.groups.iter().zip(Stage::ALL) {
            assert_eq!(group.stage, stage);
        }
        assert_eq!(snapshot.group(Stage::Prospecting).count(), 0);
        assert_eq!(snapshot.group(Stage::Negotiation).count(), 1);
    }

    #[test]
    fn test_partition_is_exactly_once_per_opportunity() {
        let snapshot = group_by_stage(vec![
            opp("a", "Proposal", None),
            opp("b", "won", None),
            opp("c", "Discovery", None),
        ]);

        let total: usize = snapshot.groups.iter().map(StageGroup::count).sum();
        assert_eq!(total, 3);
        assert_eq!(snapshot.group(Stage::Negotiation).count(), 1);
        assert_eq!(snapshot.group(Stage::ClosedWon).count(), 1);
        assert_eq!(snapshot.group(Stage::Discovery).count(), 1);
        assert!(snapshot.dropped.is_empty());
    }

    #[test]
    fn test_unrecognized_stage_joins_no_group() {
        let snapshot = group_by_stage(vec![
            opp("a", "Blue Sky Phase", Some(100.0)),
            opp("b", "Qualification", Some(50.0)),
        ]);

        let total: usize = snapshot.groups.iter().map(StageGroup::count).sum();
        assert_eq!(total, 1);
        assert_eq!(snapshot.dropped.len(), 1);
        assert_eq!(snapshot.dropped[0].id, "a");
    }

    #[test]
    fn test_total_value_treats_null_amounts_as_zero() {
        let snapshot = group_by_stage(vec![
            opp("a", "Negotiation", Some(1000.0)),
            opp("b", "Negotiation", None),
            opp("c", "Negotiation", Some(2500.0)),
        ]);
        let group = snapshot.group(Stage::Negotiation);
        assert_eq!(group.total_value(), 3500.0);
        assert_eq!(group.count(), 3);
    }

    #[test]
    fn test_annotate_card_derives_probability_from_stage() {
        let card = opp("a", "Negotiation", None);
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date");
        let annotations = annotate_card(&card, today, Utc::now());
        assert_eq!(annotations.display_probability, 80);
        assert!(annotations.due.is_none());
        assert!(annotations.inactivity_days.is_none());
    }

    #[test]
    fn test_annotate_card_unrecognized_stage_is_zero_probability() {
        let mut card = opp("a", "Blue Sky Phase", None);
        card.probability = 55; // persisted value must not leak into the pill
        assert_eq!(card.stage, NormalizedStage::Unrecognized("Blue Sky Phase".into()));
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date");
        assert_eq!(annotate_card(&card, today, Utc::now()).display_probability, 0);
    }

    #[test]
    fn test_annotate_card_classifies_due_date() {
        let mut card = opp("a", "Discovery", None);
        card.next_step_due_date = Some("2024-06-12".to_string());
        let today = NaiveDate::from_ymd_opt(2024, 6, 10).expect("date");
        let due = annotate_card(&card, today, Utc::now()).due.expect("due");
        assert_eq!(due.status, DueStatus::DueSoon);
        assert_eq!(due.days, 2);
    }
}
