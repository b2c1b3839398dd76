use std::io::Write;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use pm_core::{
    classifier::DEFAULT_UPCOMING_WINDOW_DAYS,
    notifications::{NotificationItem, NotificationSink},
    store::JsonPlanStore,
    ClassifierConfig, MaintenanceService,
};
use tracing::{debug, info, warn};

const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);
const WATCH_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub(crate) roots: Vec<PathBuf>,
    pub(crate) upcoming_window_days: i64,
    pub(crate) refresh_interval: Duration,
    pub(crate) notifications_granted: bool,
    pub(crate) run_once: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_lookup(|key| std::env::var(key).ok()))
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(root) = lookup("PM_PLAN_ROOT") {
            config.push_root(PathBuf::from(root));
        }
        if let Some(list) = lookup("PM_PLAN_ROOTS") {
            for path in std::env::split_paths(&list) {
                config.push_root(path);
            }
        }
        if let Some(window) = lookup("PM_UPCOMING_WINDOW_DAYS") {
            match window.trim().parse::<i64>() {
                Ok(value) if value >= 0 => config.upcoming_window_days = value,
                _ => warn!(%window, "ignoring invalid PM_UPCOMING_WINDOW_DAYS"),
            }
        }
        if let Some(interval) = lookup("PM_REFRESH_INTERVAL_SECS") {
            match interval.trim().parse::<u64>() {
                Ok(value) if value > 0 => config.refresh_interval = Duration::from_secs(value),
                _ => warn!(%interval, "ignoring invalid PM_REFRESH_INTERVAL_SECS"),
            }
        }
        if let Some(value) = lookup("PM_NOTIFICATIONS") {
            config.notifications_granted = value.trim().eq_ignore_ascii_case("granted");
        }
        if let Some(value) = lookup("PM_RUN_ONCE") {
            config.run_once = is_truthy(&value);
        }
        config
    }

    pub(crate) fn push_root(&mut self, path: PathBuf) {
        if path.as_os_str().is_empty() || self.roots.contains(&path) {
            return;
        }
        info!(path = %path.display(), "registering plan root");
        self.roots.push(path);
    }

    fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            upcoming_window_days: self.upcoming_window_days,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            upcoming_window_days: DEFAULT_UPCOMING_WINDOW_DAYS,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            notifications_granted: false,
            run_once: false,
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Stands in for the host's native notification API by emitting a log line.
struct LogNotificationSink {
    granted: bool,
}

impl NotificationSink for LogNotificationSink {
    fn permission_granted(&self) -> bool {
        self.granted
    }

    fn notify(&self, item: &NotificationItem) {
        info!(
            id = %item.id,
            kind = ?item.kind,
            title_key = %item.title_key,
            machine = item.param_str("machineName").unwrap_or_default(),
            days = item.param_i64("days"),
            link = %item.link,
            "maintenance notification"
        );
    }
}

fn build_service(config: &AppConfig) -> Result<MaintenanceService> {
    let mut store = JsonPlanStore::open(&config.roots).context("failed to open plan store")?;
    if !config.run_once {
        if let Err(err) = store.watch() {
            warn!(%err, "plan roots not watched, relying on the refresh interval");
        }
    }
    MaintenanceService::builder()
        .with_source(Box::new(store))
        .with_config(config.classifier_config())
        .with_notification_sink(Box::new(LogNotificationSink {
            granted: config.notifications_granted,
        }))
        .build()
}

fn print_notifications(service: &MaintenanceService) -> Result<()> {
    let payload = serde_json::to_string_pretty(&service.notifications())?;
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{payload}")?;
    Ok(())
}

pub fn run(config: AppConfig) -> Result<()> {
    info!(
        root_count = config.roots.len(),
        interval_secs = config.refresh_interval.as_secs(),
        "starting PM notifier"
    );
    anyhow::ensure!(
        !config.roots.is_empty(),
        "no plan roots configured, set PM_PLAN_ROOT or PM_PLAN_ROOTS"
    );
    let service = build_service(&config)?;

    if config.run_once {
        service.refresh().context("refresh failed")?;
        return print_notifications(&service);
    }

    let mut last_refresh: Option<Instant> = None;
    loop {
        let due = last_refresh
            .map(|at| at.elapsed() >= config.refresh_interval)
            .unwrap_or(true);
        if due {
            let start = Instant::now();
            match service.refresh() {
                Ok(report) => info!(
                    unread = service.unread_count(),
                    new = report.new_item_count,
                    elapsed_ms = %start.elapsed().as_millis(),
                    "refresh completed"
                ),
                // keep the previous set until the next successful cycle
                Err(err) => warn!(error = %format!("{err:#}"), "refresh skipped"),
            }
            last_refresh = Some(Instant::now());
        } else {
            debug!("waiting for next refresh");
        }
        thread::sleep(WATCH_POLL_INTERVAL.min(config.refresh_interval));
    }
}
