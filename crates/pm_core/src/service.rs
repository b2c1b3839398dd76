use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, TimeZone};
use parking_lot::RwLock;
use tracing::{debug, info, instrument};

use crate::{
    classifier::{self, ClassifierConfig},
    feed::NotificationFeed,
    notifications::{NotificationItem, NotificationSink},
    store::PlanSource,
};

/// Outcome of one refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    pub plan_count: usize,
    pub item_count: usize,
    pub new_item_count: usize,
    pub delivered: usize,
}

/// Couples a plan source with the classifier and keeps the current
/// notification set.
pub struct MaintenanceService {
    source: Box<dyn PlanSource>,
    config: ClassifierConfig,
    feed: RwLock<NotificationFeed>,
    notification_sink: Option<Box<dyn NotificationSink>>,
    notifications_permitted: bool,
}

pub struct MaintenanceServiceBuilder {
    source: Option<Box<dyn PlanSource>>,
    config: ClassifierConfig,
    notification_sink: Option<Box<dyn NotificationSink>>,
}

impl MaintenanceServiceBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            config: ClassifierConfig::default(),
            notification_sink: None,
        }
    }

    pub fn with_source(mut self, source: Box<dyn PlanSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_config(mut self, config: ClassifierConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_notification_sink(mut self, sink: Box<dyn NotificationSink>) -> Self {
        self.notification_sink = Some(sink);
        self
    }

    pub fn build(self) -> Result<MaintenanceService> {
        let source = self
            .source
            .ok_or_else(|| anyhow!("maintenance service needs a plan source"))?;
        let notifications_permitted = self
            .notification_sink
            .as_ref()
            .map(|sink| sink.permission_granted())
            .unwrap_or(false);
        info!(
            upcoming_window_days = self.config.upcoming_window_days,
            notifications_permitted,
            "maintenance service ready"
        );
        Ok(MaintenanceService {
            source,
            config: self.config,
            feed: RwLock::new(NotificationFeed::new()),
            notification_sink: self.notification_sink,
            notifications_permitted,
        })
    }
}

impl Default for MaintenanceServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MaintenanceService {
    pub fn builder() -> MaintenanceServiceBuilder {
        MaintenanceServiceBuilder::new()
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn refresh(&self) -> Result<RefreshReport> {
        self.refresh_at(&Local::now())
    }

    /// Runs one cycle at `now`. When the plan fetch fails the cycle is
    /// skipped and the previous notification set stays in place.
    #[instrument(skip(self, now))]
    pub fn refresh_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<RefreshReport> {
        let plans = self
            .source
            .fetch_plans()
            .context("failed to fetch maintenance plans")?;
        let items = classifier::classify_plans(&plans, now, &self.config);
        let item_count = items.len();

        let fresh = self.feed.write().replace(items);

        let mut delivered = 0;
        if let Some(sink) = self.notification_sink.as_ref() {
            if self.notifications_permitted {
                for item in &fresh {
                    sink.notify(item);
                    delivered += 1;
                }
            } else if !fresh.is_empty() {
                debug!(count = fresh.len(), "platform notifications not permitted");
            }
        }

        let report = RefreshReport {
            plan_count: plans.len(),
            item_count,
            new_item_count: fresh.len(),
            delivered,
        };
        info!(
            plan_count = report.plan_count,
            item_count = report.item_count,
            new_item_count = report.new_item_count,
            "notifications refreshed"
        );
        Ok(report)
    }

    pub fn notifications(&self) -> Vec<NotificationItem> {
        self.feed.read().items().to_vec()
    }

    pub fn unread_count(&self) -> usize {
        self.feed.read().unread_count()
    }

    pub fn mark_read(&self, id: &str) -> Result<()> {
        if self.feed.write().mark_read(id) {
            Ok(())
        } else {
            Err(anyhow!("unknown notification `{id}`"))
        }
    }

    pub fn mark_all_read(&self) {
        self.feed.write().mark_all_read();
    }
}
