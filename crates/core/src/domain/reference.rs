use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub organization_id: Option<i64>,
    #[serde(default)]
    pub head_id: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: i64,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveType {
    pub id: i64,
    pub name: String,
    /// Yearly entitlement in days, when the type has one.
    #[serde(default)]
    pub max_days: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: i64,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
}

/// Lookup tables loaded together; a form is only usable when all four are
/// present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceData {
    pub departments: Vec<Department>,
    pub organizations: Vec<Organization>,
    pub leave_types: Vec<LeaveType>,
    pub holidays: Vec<Holiday>,
}

impl ReferenceData {
    pub fn leave_type(&self, id: i64) -> Option<&LeaveType> {
        self.leave_types.iter().find(|leave_type| leave_type.id == id)
    }

    pub fn department(&self, id: i64) -> Option<&Department> {
        self.departments.iter().find(|department| department.id == id)
    }

    pub fn calendar(&self) -> HolidayCalendar {
        HolidayCalendar::new(&self.holidays)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HolidayCalendar {
    dates: BTreeSet<NaiveDate>,
}

impl HolidayCalendar {
    pub fn new(holidays: &[Holiday]) -> Self {
        Self { dates: holidays.iter().map(|holiday| holiday.date).collect() }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.dates.contains(&date)
    }

    /// Working days in `start..=end`; zero when the range is inverted.
    pub fn working_days(&self, start: NaiveDate, end: NaiveDate) -> u32 {
        start
            .iter_days()
            .take_while(|day| *day <= end)
            .filter(|day| self.is_working_day(*day))
            .count() as u32
    }
}
