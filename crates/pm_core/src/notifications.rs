use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Due today or already overdue.
    DueToday,
    UpcomingPm,
}

/// One entry of the notification list. Text is referenced by key and
/// resolved by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title_key: String,
    pub message_key: String,
    pub params: BTreeMap<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    pub link: String,
    pub plan_id: String,
}

impl NotificationItem {
    /// The segment of `id` between the plan id and the generation timestamp.
    pub fn tag(&self) -> &str {
        self.id
            .strip_prefix(self.plan_id.as_str())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|rest| rest.rsplit_once('-'))
            .map(|(tag, _)| tag)
            .unwrap_or_default()
    }

    pub fn param_i64(&self, name: &str) -> Option<i64> {
        self.params.get(name).and_then(Value::as_i64)
    }

    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params.get(name).and_then(Value::as_str)
    }
}

/// Host platform notification adapters implement this trait.
pub trait NotificationSink: Send + Sync {
    /// Whether the user allowed native notifications. Queried once.
    fn permission_granted(&self) -> bool;
    fn notify(&self, item: &NotificationItem);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(id: &str, plan_id: &str) -> NotificationItem {
        NotificationItem {
            id: id.into(),
            kind: NotificationKind::UpcomingPm,
            title_key: "notifications.upcomingPm.title".into(),
            message_key: "notifications.upcomingPm.message".into(),
            params: BTreeMap::from([("days".to_string(), json!(3))]),
            timestamp: DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
            read: false,
            link: "/pm".into(),
            plan_id: plan_id.into(),
        }
    }

    #[test]
    fn serializes_kind_as_type_tag() {
        let value = serde_json::to_value(item("p-upcoming-1", "p")).unwrap();
        assert_eq!(value["type"], "upcoming_pm");
        assert_eq!(value["titleKey"], "notifications.upcomingPm.title");
        assert_eq!(value["planId"], "p");
        assert_eq!(value["read"], false);
    }

    #[test]
    fn tag_survives_dashes_in_plan_ids() {
        assert_eq!(item("pm-2024-01-overdue-1750000000000", "pm-2024-01").tag(), "overdue");
        assert_eq!(item("p-today-5", "p").tag(), "today");
        assert_eq!(item("unrelated", "p").tag(), "");
    }

    #[test]
    fn typed_param_accessors() {
        let entry = item("p-upcoming-1", "p");
        assert_eq!(entry.param_i64("days"), Some(3));
        assert_eq!(entry.param_str("days"), None);
        assert_eq!(entry.param_i64("missing"), None);
    }
}
