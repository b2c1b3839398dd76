use std::collections::HashMap;

use crate::notifications::NotificationItem;

/// Identity of a notification across passes: the plan and its urgency tag.
/// Generated ids embed a timestamp and change every pass.
type FeedKey = (String, String);

fn key_of(item: &NotificationItem) -> FeedKey {
    (item.plan_id.clone(), item.tag().to_string())
}

/// The notification set currently shown to the user.
#[derive(Debug, Clone, Default)]
pub struct NotificationFeed {
    items: Vec<NotificationItem>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[NotificationItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|item| !item.read).count()
    }

    /// Swaps in the result of a new pass and returns the items that were not
    /// present in the previous set. Items that were present keep their read
    /// state.
    pub fn replace(&mut self, mut next: Vec<NotificationItem>) -> Vec<NotificationItem> {
        let previous: HashMap<FeedKey, bool> = self
            .items
            .iter()
            .map(|item| (key_of(item), item.read))
            .collect();

        let mut fresh = Vec::new();
        for item in &mut next {
            match previous.get(&key_of(item)) {
                Some(read) => item.read = *read,
                None => fresh.push(item.clone()),
            }
        }

        self.items = next;
        fresh
    }

    pub fn mark_read(&mut self, id: &str) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&mut self) {
        for item in &mut self.items {
            item.read = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        classifier::{classify_plans, ClassifierConfig},
        plan::MaintenancePlan,
    };
    use chrono::{TimeZone, Utc};

    fn pass(day: u32, plans: &[MaintenancePlan]) -> Vec<NotificationItem> {
        let now = Utc.with_ymd_and_hms(2025, 6, day, 9, 0, 0).unwrap();
        classify_plans(plans, &now, &ClassifierConfig::default())
    }

    fn plans() -> Vec<MaintenancePlan> {
        vec![
            MaintenancePlan::new("a", "m1", "Press", "2025-06-15"),
            MaintenancePlan::new("b", "m2", "Mill", "2025-06-18"),
        ]
    }

    #[test]
    fn first_pass_reports_everything_as_new() {
        let mut feed = NotificationFeed::new();
        let fresh = feed.replace(pass(15, &plans()));
        assert_eq!(fresh.len(), 2);
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.unread_count(), 2);
    }

    #[test]
    fn repeated_pass_keeps_read_state_and_reports_nothing_new() {
        let mut feed = NotificationFeed::new();
        feed.replace(pass(15, &plans()));
        let first_id = feed.items()[0].id.clone();
        assert!(feed.mark_read(&first_id));
        assert_eq!(feed.unread_count(), 1);

        let fresh = feed.replace(pass(15, &plans()));
        assert!(fresh.is_empty());
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.unread_count(), 1);
        assert!(feed.items().iter().any(|item| item.plan_id == "a" && item.read));
    }

    #[test]
    fn changed_classification_counts_as_new() {
        let mut feed = NotificationFeed::new();
        feed.replace(pass(15, &plans()));
        feed.mark_all_read();

        // a becomes overdue, b stays upcoming
        let fresh = feed.replace(pass(16, &plans()));
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].plan_id, "a");
        assert_eq!(fresh[0].tag(), "overdue");
        assert_eq!(feed.unread_count(), 1);
    }

    #[test]
    fn resolved_items_disappear() {
        let mut feed = NotificationFeed::new();
        feed.replace(pass(15, &plans()));
        let fresh = feed.replace(pass(15, &plans()[1..]));
        assert!(fresh.is_empty());
        assert_eq!(feed.len(), 1);
        assert!(!feed.mark_read("missing"));
    }
}
