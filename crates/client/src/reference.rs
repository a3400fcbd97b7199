use std::sync::Arc;

use tracing::{info, warn};

use leavedesk_core::domain::reference::{Holiday, HolidayCalendar, ReferenceData};

use crate::api::LeaveApi;
use crate::error::ApiError;

/// Fetches the lookup tables a leave form needs, concurrently. Any failure
/// other than the holiday list fails the whole load.
pub async fn load_reference_data(api: &Arc<dyn LeaveApi>) -> Result<ReferenceData, ApiError> {
    let (departments, organizations, leave_types, holidays) = tokio::try_join!(
        api.departments(),
        api.organizations(),
        api.leave_types(),
        holidays_or_empty(api),
    )?;

    info!(
        event_name = "reference.load.completed",
        departments = departments.len(),
        organizations = organizations.len(),
        leave_types = leave_types.len(),
        holidays = holidays.len(),
        "reference data loaded"
    );
    Ok(ReferenceData { departments, organizations, leave_types, holidays })
}

/// The calendar alone, for counting working days. Needs no admin tables.
pub async fn load_holiday_calendar(api: &Arc<dyn LeaveApi>) -> Result<HolidayCalendar, ApiError> {
    let holidays = holidays_or_empty(api).await?;
    Ok(HolidayCalendar::new(&holidays))
}

/// Holidays only refine working-day counts, so a failed lookup degrades to
/// an empty calendar. An expired session still propagates.
async fn holidays_or_empty(api: &Arc<dyn LeaveApi>) -> Result<Vec<Holiday>, ApiError> {
    match api.holidays().await {
        Ok(holidays) => Ok(holidays),
        Err(ApiError::SessionExpired) => Err(ApiError::SessionExpired),
        Err(error) => {
            warn!(
                event_name = "reference.holidays.unavailable",
                error = %error,
                "holiday lookup failed; continuing without holidays"
            );
            Ok(Vec::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use leavedesk_core::domain::reference::{
        Department, Holiday, LeaveType, Organization, ReferenceData,
    };

    use super::{load_holiday_calendar, load_reference_data};
    use crate::api::LeaveApi;
    use crate::error::ApiError;
    use crate::testing::FakeLeaveApi;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).expect("valid date")
    }

    fn reference() -> ReferenceData {
        ReferenceData {
            departments: vec![Department {
                id: 1,
                name: "Computer Science".to_string(),
                organization_id: Some(1),
                head_id: None,
            }],
            organizations: vec![Organization { id: 1, name: "Faculty of Science".to_string() }],
            leave_types: vec![LeaveType {
                id: 2,
                name: "ลาพักผ่อน".to_string(),
                max_days: Some(10.0),
            }],
            holidays: vec![Holiday {
                id: 1,
                date: date(15),
                description: Some("Songkran".to_string()),
            }],
        }
    }

    #[tokio::test]
    async fn all_four_tables_are_loaded() {
        let fake = Arc::new(FakeLeaveApi::default());
        fake.set_reference(reference()).await;
        let api: Arc<dyn LeaveApi> = fake;

        let loaded = load_reference_data(&api).await.expect("reference data");

        assert_eq!(loaded, reference());
        assert_eq!(loaded.calendar().working_days(date(15), date(16)), 1);
    }

    #[tokio::test]
    async fn holiday_failure_degrades_to_empty_calendar() {
        let fake = Arc::new(FakeLeaveApi::default());
        fake.set_reference(reference()).await;
        fake.fail_call("holidays", ApiError::Http { status: 500, message: None }).await;
        let api: Arc<dyn LeaveApi> = fake;

        let loaded = load_reference_data(&api).await.expect("reference data");

        assert!(loaded.holidays.is_empty());
        assert_eq!(loaded.leave_types.len(), 1);
    }

    #[tokio::test]
    async fn any_other_failure_fails_the_whole_load() {
        let fake = Arc::new(FakeLeaveApi::default());
        fake.set_reference(reference()).await;
        fake.fail_call("organizations", ApiError::Transport("reset".to_string())).await;
        let api: Arc<dyn LeaveApi> = fake;

        let error = load_reference_data(&api).await.expect_err("load should fail");
        assert!(matches!(error, ApiError::Transport(_)));
    }

    #[tokio::test]
    async fn expired_session_is_not_swallowed_by_holiday_fallback() {
        let fake = Arc::new(FakeLeaveApi::default());
        fake.fail_call("holidays", ApiError::SessionExpired).await;
        let api: Arc<dyn LeaveApi> = fake;

        let error = load_reference_data(&api).await.expect_err("session expired");
        assert!(error.is_session_expired());
    }

    #[tokio::test]
    async fn calendar_skips_the_admin_tables() {
        let fake = Arc::new(FakeLeaveApi::default());
        fake.set_reference(reference()).await;
        let forbidden = || ApiError::Http { status: 403, message: Some("Forbidden".to_string()) };
        fake.fail_call("departments", forbidden()).await;
        fake.fail_call("organizations", forbidden()).await;
        let api: Arc<dyn LeaveApi> = fake.clone();

        let calendar = load_holiday_calendar(&api).await.expect("calendar");

        assert_eq!(calendar.working_days(date(15), date(16)), 1);
        assert_eq!(fake.calls().await, vec!["holidays"]);
    }
}
