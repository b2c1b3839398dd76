pub mod calendar;
pub mod classifier;
pub mod error;
pub mod feed;
pub mod notifications;
pub mod plan;
pub mod service;
pub mod store;

pub use crate::classifier::{classify_plans, ClassifierConfig};
pub use crate::service::{MaintenanceService, MaintenanceServiceBuilder};
