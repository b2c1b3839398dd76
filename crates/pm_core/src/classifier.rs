//! Due-date classification of maintenance plans.
//!
//! A pass takes a full snapshot of plans and a reference instant and emits a
//! fresh list of notification items. Nothing is retained between passes.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::{
    calendar,
    error::DueDateError,
    notifications::{NotificationItem, NotificationKind},
    plan::MaintenancePlan,
};

pub const DEFAULT_UPCOMING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ClassifierConfig {
    /// How many days ahead "upcoming" notifications fire, inclusive.
    pub upcoming_window_days: i64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: DEFAULT_UPCOMING_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Overdue { days: i64 },
    DueToday,
    Upcoming { days: i64 },
    NotDue,
}

impl Classification {
    pub fn kind(&self) -> Option<NotificationKind> {
        match self {
            Classification::Overdue { .. } | Classification::DueToday => {
                Some(NotificationKind::DueToday)
            }
            Classification::Upcoming { .. } => Some(NotificationKind::UpcomingPm),
            Classification::NotDue => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Classification::Overdue { .. } => "overdue",
            Classification::DueToday => "today",
            Classification::Upcoming { .. } => "upcoming",
            Classification::NotDue => "",
        }
    }

    fn text_keys(&self) -> Option<(&'static str, &'static str)> {
        match self {
            Classification::Overdue { .. } => Some((
                "notifications.overdue.title",
                "notifications.overdue.message",
            )),
            Classification::DueToday => Some((
                "notifications.dueToday.title",
                "notifications.dueToday.message",
            )),
            Classification::Upcoming { .. } => Some((
                "notifications.upcomingPm.title",
                "notifications.upcomingPm.message",
            )),
            Classification::NotDue => None,
        }
    }
}

/// Maps a signed day difference (due minus today) onto an urgency class.
pub fn classify_delta(delta: i64, config: &ClassifierConfig) -> Classification {
    match delta {
        0 => Classification::DueToday,
        d if d < 0 => Classification::Overdue { days: -d },
        d if d <= config.upcoming_window_days => Classification::Upcoming { days: d },
        _ => Classification::NotDue,
    }
}

/// Classifies a single plan against `today`. Paused plans are never due.
pub fn classify_plan<Tz: TimeZone>(
    plan: &MaintenancePlan,
    today: NaiveDate,
    zone: &Tz,
    config: &ClassifierConfig,
) -> Result<Classification, DueDateError> {
    if !plan.is_active() {
        return Ok(Classification::NotDue);
    }
    let due = plan.due_date(zone)?;
    Ok(classify_delta(calendar::day_delta(due, today), config))
}

/// Runs one classification pass over `plans` at the reference instant `now`.
///
/// Items come out in input order. Plans whose due date cannot be parsed are
/// skipped with a warning.
pub fn classify_plans<Tz: TimeZone>(
    plans: &[MaintenancePlan],
    now: &DateTime<Tz>,
    config: &ClassifierConfig,
) -> Vec<NotificationItem> {
    let zone = now.timezone();
    let today = calendar::normalize_to_day(now);
    let generated_at = now.with_timezone(&Utc);
    let mut items = Vec::new();

    for plan in plans.iter().filter(|plan| plan.is_active()) {
        let due = match plan.due_date(&zone) {
            Ok(due) => due,
            Err(err) => {
                warn!(plan_id = %plan.id, raw = %plan.next_due_date, %err, "skipping plan with invalid due date");
                continue;
            }
        };
        let classification = classify_delta(calendar::day_delta(due, today), config);
        if let Some(item) = build_item(plan, due, classification, generated_at) {
            items.push(item);
        }
    }

    debug!(
        plan_count = plans.len(),
        item_count = items.len(),
        %today,
        "classification pass finished"
    );
    items
}

fn build_item(
    plan: &MaintenancePlan,
    due: NaiveDate,
    classification: Classification,
    generated_at: DateTime<Utc>,
) -> Option<NotificationItem> {
    let kind = classification.kind()?;
    let (title_key, message_key) = classification.text_keys()?;

    let mut params: BTreeMap<String, Value> = BTreeMap::new();
    params.insert("machineName".into(), json!(plan.machine_name));
    params.insert("date".into(), json!(calendar::format_day(due)));
    match classification {
        Classification::Overdue { days } | Classification::Upcoming { days } => {
            params.insert("days".into(), json!(days));
        }
        Classification::DueToday | Classification::NotDue => {}
    }
    if let Some(title) = &plan.title {
        params.insert("planTitle".into(), json!(title));
    }

    Some(NotificationItem {
        id: format!(
            "{}-{}-{}",
            plan.id,
            classification.tag(),
            generated_at.timestamp_millis()
        ),
        kind,
        title_key: title_key.to_string(),
        message_key: message_key.to_string(),
        params,
        timestamp: generated_at,
        read: false,
        link: format!("/pm?plan={}", plan.id),
        plan_id: plan.id.clone(),
    })
}
