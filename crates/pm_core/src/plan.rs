use chrono::{Datelike, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::{calendar, error::DueDateError};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Active,
    Paused,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum FrequencyUnit {
    Day,
    Week,
    Month,
    Year,
}

/// How often a plan recurs once it has been carried out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Frequency {
    pub amount: u32,
    pub unit: FrequencyUnit,
}

impl Frequency {
    pub fn new(amount: u32, unit: FrequencyUnit) -> Self {
        Self {
            amount: amount.max(1),
            unit,
        }
    }

    /// Next occurrence after `date`. Month and year steps clamp to the last
    /// day of the target month.
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        let amount = self.amount.max(1);
        match self.unit {
            FrequencyUnit::Day => date.checked_add_signed(Duration::days(amount.into())),
            FrequencyUnit::Week => date.checked_add_signed(Duration::weeks(amount.into())),
            FrequencyUnit::Month => add_months(date, amount),
            FrequencyUnit::Year => add_months(date, amount.checked_mul(12)?),
        }
    }
}

/// A recurring maintenance obligation as stored by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePlan {
    pub id: String,
    pub machine_id: String,
    pub machine_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Raw value as stored; parsed lazily so one bad record cannot poison a
    /// whole snapshot.
    pub next_due_date: String,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<NaiveDate>,
}

impl MaintenancePlan {
    pub fn new(
        id: impl Into<String>,
        machine_id: impl Into<String>,
        machine_name: impl Into<String>,
        next_due_date: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            machine_id: machine_id.into(),
            machine_name: machine_name.into(),
            title: None,
            next_due_date: next_due_date.into(),
            status: PlanStatus::Active,
            frequency: None,
            last_completed: None,
        }
    }

    pub fn with_status(mut self, status: PlanStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = Some(frequency);
        self
    }

    pub fn is_active(&self) -> bool {
        self.status == PlanStatus::Active
    }

    pub fn due_date<Tz: TimeZone>(&self, zone: &Tz) -> Result<NaiveDate, DueDateError> {
        calendar::parse_due_date(&self.next_due_date, zone)
    }
}

fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total_months = date
        .year()
        .checked_mul(12)?
        .checked_add(date.month() as i32 - 1)?
        .checked_add(i32::try_from(months).ok()?)?;
    let target_year = total_months.div_euclid(12);
    let target_month = (total_months.rem_euclid(12) + 1) as u32;
    let day = date.day().min(days_in_month(target_year, target_month));
    NaiveDate::from_ymd_opt(target_year, target_month, day)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn deserializes_store_records() {
        let raw = r#"{
            "id": "pm-1",
            "machineId": "m-7",
            "machineName": "Lathe 7",
            "nextDueDate": "2025-06-15",
            "status": "paused",
            "frequency": { "amount": 2, "unit": "week" }
        }"#;
        let plan: MaintenancePlan = serde_json::from_str(raw).unwrap();
        assert_eq!(plan.machine_name, "Lathe 7");
        assert_eq!(plan.status, PlanStatus::Paused);
        assert!(!plan.is_active());
        assert_eq!(plan.frequency, Some(Frequency::new(2, FrequencyUnit::Week)));
        assert!(plan.last_completed.is_none());
    }

    #[test]
    fn status_defaults_to_active() {
        let raw = r#"{"id":"a","machineId":"m","machineName":"Press","nextDueDate":""}"#;
        let plan: MaintenancePlan = serde_json::from_str(raw).unwrap();
        assert!(plan.is_active());
        assert_eq!(plan.due_date(&chrono::Utc), Err(DueDateError::Empty));
    }

    #[test]
    fn frequency_advances_by_unit() {
        let start = day(2025, 1, 31);
        assert_eq!(
            Frequency::new(10, FrequencyUnit::Day).advance(start),
            Some(day(2025, 2, 10))
        );
        assert_eq!(
            Frequency::new(1, FrequencyUnit::Week).advance(start),
            Some(day(2025, 2, 7))
        );
        assert_eq!(
            Frequency::new(1, FrequencyUnit::Month).advance(start),
            Some(day(2025, 2, 28))
        );
        assert_eq!(
            Frequency::new(13, FrequencyUnit::Month).advance(start),
            Some(day(2026, 2, 28))
        );
        assert_eq!(
            Frequency::new(1, FrequencyUnit::Year).advance(day(2024, 2, 29)),
            Some(day(2025, 2, 28))
        );
    }

    #[test]
    fn oversized_frequencies_are_out_of_range() {
        let start = day(2025, 6, 15);
        assert_eq!(
            Frequency::new(2_147_483_000, FrequencyUnit::Month).advance(start),
            None
        );
        assert_eq!(Frequency::new(u32::MAX, FrequencyUnit::Month).advance(start), None);

        let raw = r#"{"amount":178956970,"unit":"year"}"#;
        let yearly: Frequency = serde_json::from_str(raw).unwrap();
        assert_eq!(yearly.advance(start), None);
        assert_eq!(Frequency::new(u32::MAX, FrequencyUnit::Year).advance(start), None);
    }

    #[test]
    fn zero_amount_is_treated_as_one() {
        let frequency = Frequency {
            amount: 0,
            unit: FrequencyUnit::Day,
        };
        assert_eq!(frequency.advance(day(2025, 6, 1)), Some(day(2025, 6, 2)));
    }
}
