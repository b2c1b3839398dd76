use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use crate::{
    calendar,
    error::StoreError,
    plan::{MaintenancePlan, PlanStatus},
};

/// Supplies the full set of maintenance plans, any status.
pub trait PlanSource {
    fn fetch_plans(&self) -> Result<Vec<MaintenancePlan>, StoreError>;
}

/// Fixed in-memory snapshot.
#[derive(Debug, Clone, Default)]
pub struct StaticPlans(pub Vec<MaintenancePlan>);

impl PlanSource for StaticPlans {
    fn fetch_plans(&self) -> Result<Vec<MaintenancePlan>, StoreError> {
        Ok(self.0.clone())
    }
}

/// Plans kept as JSON arrays in `*.json` files below a set of roots.
pub struct JsonPlanStore {
    roots: Vec<PathBuf>,
    files: RwLock<HashMap<PathBuf, Vec<MaintenancePlan>>>,
    watcher: Option<RecommendedWatcher>,
    dirty: Arc<AtomicBool>,
}

impl JsonPlanStore {
    pub fn open<I, P>(roots: I) -> Result<Self, StoreError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut unique: Vec<PathBuf> = Vec::new();
        for root in roots {
            let root = root.as_ref().to_path_buf();
            if !unique.contains(&root) {
                unique.push(root);
            }
        }
        let store = Self {
            roots: unique,
            files: RwLock::new(HashMap::new()),
            watcher: None,
            dirty: Arc::new(AtomicBool::new(false)),
        };
        store.reload_all()?;
        Ok(store)
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    #[instrument(skip(self))]
    pub fn reload_all(&self) -> Result<(), StoreError> {
        let mut loaded = HashMap::new();
        for root in &self.roots {
            Self::ingest_root(&mut loaded, root)?;
        }
        let plan_count: usize = loaded.values().map(Vec::len).sum();
        info!(file_count = loaded.len(), plan_count, "plan store loaded");
        *self.files.write() = loaded;
        Ok(())
    }

    pub fn list_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.files.read().keys().cloned().collect();
        files.sort();
        files
    }

    /// All plans, ordered by file path and then by position within the file.
    pub fn plans(&self) -> Vec<MaintenancePlan> {
        let files = self.files.read();
        let mut paths: Vec<&PathBuf> = files.keys().collect();
        paths.sort();
        let plans = paths
            .into_iter()
            .flat_map(|path| files[path].iter().cloned())
            .collect();
        plans
    }

    pub fn get_plan(&self, id: &str) -> Result<MaintenancePlan, StoreError> {
        self.files
            .read()
            .values()
            .flatten()
            .find(|plan| plan.id == id)
            .cloned()
            .ok_or_else(|| StoreError::UnknownPlan(id.to_string()))
    }

    /// Records a completed maintenance run and moves the due date forward by
    /// the plan frequency, counted from `completed_on`.
    #[instrument(skip(self))]
    pub fn complete_plan(
        &self,
        id: &str,
        completed_on: NaiveDate,
    ) -> Result<MaintenancePlan, StoreError> {
        self.update_plan(id, |plan| {
            let frequency = plan
                .frequency
                .ok_or_else(|| StoreError::NoFrequency(plan.id.clone()))?;
            let next = frequency
                .advance(completed_on)
                .ok_or_else(|| StoreError::DueDateOutOfRange(plan.id.clone()))?;
            plan.last_completed = Some(completed_on);
            plan.next_due_date = calendar::format_day(next);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    pub fn set_plan_status(
        &self,
        id: &str,
        status: PlanStatus,
    ) -> Result<MaintenancePlan, StoreError> {
        self.update_plan(id, |plan| {
            plan.status = status;
            Ok(())
        })
    }

    /// Starts watching the roots. Any change marks the store dirty.
    pub fn watch(&mut self) -> Result<(), StoreError> {
        if self.watcher.is_some() {
            return Ok(());
        }
        let dirty = Arc::clone(&self.dirty);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                debug!(?event, "plan store change detected");
                dirty.store(true, Ordering::SeqCst);
            }
        })?;
        for root in &self.roots {
            let mode = if root.is_file() {
                RecursiveMode::NonRecursive
            } else {
                RecursiveMode::Recursive
            };
            watcher.watch(root, mode)?;
        }
        self.watcher = Some(watcher);
        Ok(())
    }

    /// Returns whether the watcher saw a change since the last call.
    pub fn take_dirty(&self) -> bool {
        self.dirty.swap(false, Ordering::SeqCst)
    }
}

impl PlanSource for JsonPlanStore {
    fn fetch_plans(&self) -> Result<Vec<MaintenancePlan>, StoreError> {
        if self.take_dirty() {
            self.reload_all()?;
        }
        Ok(self.plans())
    }
}

impl JsonPlanStore {
    fn update_plan(
        &self,
        id: &str,
        apply: impl FnOnce(&mut MaintenancePlan) -> Result<(), StoreError>,
    ) -> Result<MaintenancePlan, StoreError> {
        let mut files = self.files.write();
        let (path, plans) = files
            .iter_mut()
            .find(|(_, plans)| plans.iter().any(|plan| plan.id == id))
            .ok_or_else(|| StoreError::UnknownPlan(id.to_string()))?;

        let mut updated = plans.clone();
        let plan = updated
            .iter_mut()
            .find(|plan| plan.id == id)
            .ok_or_else(|| StoreError::UnknownPlan(id.to_string()))?;
        apply(plan)?;
        let result = plan.clone();

        write_plan_file(path, &updated)?;
        *plans = updated;
        info!(plan_id = %id, path = %path.display(), "plan updated");
        Ok(result)
    }

    fn ingest_root(
        files: &mut HashMap<PathBuf, Vec<MaintenancePlan>>,
        path: &Path,
    ) -> Result<(), StoreError> {
        if path.is_file() {
            if is_plan_file(path) {
                files.insert(path.to_path_buf(), read_plan_file(path)?);
            }
            return Ok(());
        }

        if path.is_dir() {
            for entry in WalkDir::new(path) {
                let entry = entry?;
                let entry_path = entry.path();
                if entry.file_type().is_file() && is_plan_file(entry_path) {
                    files.insert(entry_path.to_path_buf(), read_plan_file(entry_path)?);
                }
            }
        } else {
            debug!(path = %path.display(), "plan root missing, skipping");
        }
        Ok(())
    }
}

/// Writes the record set of a new plan file. Used by tooling and tests that
/// seed a store.
pub fn write_plan_file(path: &Path, plans: &[MaintenancePlan]) -> Result<(), StoreError> {
    let payload = serde_json::to_string_pretty(plans).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    fs::write(path, payload).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_plan_file(path: &Path) -> Result<Vec<MaintenancePlan>, StoreError> {
    let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn is_plan_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}
