//! Due-date countdown and inactivity classification (pure math, no I/O).

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Urgency bucket for a next-step due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DueStatus {
    Overdue,
    Today,
    DueSoon,
    Future,
}

/// A classified due date: urgency bucket plus day count (always >= 0; for
/// `Overdue` it is the number of days past due).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCountdown {
    pub status: DueStatus,
    pub days: i64,
}

/// Classify a due date relative to `today`.
///
/// A due date exactly on `today` is `Today`, never `Overdue` or `DueSoon`.
/// Within the next three days it is `DueSoon`, further out `Future`.
pub fn classify_due_date(due: NaiveDate, today: NaiveDate) -> DueCountdown {
    let diff = (due - today).num_days();
    if diff < 0 {
        DueCountdown {
            status: DueStatus::Overdue,
            days: diff.abs(),
        }
    } else if diff == 0 {
        DueCountdown {
            status: DueStatus::Today,
            days: 0,
        }
    } else if diff <= 3 {
        DueCountdown {
            status: DueStatus::DueSoon,
            days: diff,
        }
    } else {
        DueCountdown {
            status: DueStatus::Future,
            days: diff,
        }
    }
}

/// Whole days since the last recorded activity, or `None` when there is none.
pub fn inactivity_days(last_activity: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<i64> {
    last_activity.map(|last| (now - last).num_days())
}

/// Parse an upstream date column. The store writes dates as `YYYY-MM-DD`,
/// but older rows carry full RFC3339 timestamps.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
}

/// Parse an upstream timestamp column: RFC3339, with a fallback for rows
/// written in bare SQL datetime format.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
