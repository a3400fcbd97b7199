//! Filtering, sorting and paging of an already-fetched request list.
//!
//! Everything here is pure: the same list and settings always produce the
//! same page, and nothing touches the network.

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Serialize;

use crate::domain::leave_request::{LeaveRequest, LeaveRequestId, LeaveStatus, RequestDetailId};
use crate::errors::ValidationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<LeaveStatus>,
    pub leave_type_id: Option<i64>,
    /// Offset used to turn `created_at` into a calendar day.
    pub offset: FixedOffset,
}

impl Default for RequestFilter {
    fn default() -> Self {
        Self { start_date: None, end_date: None, status: None, leave_type_id: None, offset: utc() }
    }
}

fn utc() -> FixedOffset {
    Utc.fix()
}

impl RequestFilter {
    /// Builds a filter from form inputs where an empty string means "any".
    /// `offset` is the deployment's offset for reading `created_at` days.
    pub fn from_form(
        start_date: &str,
        end_date: &str,
        status: &str,
        leave_type_id: &str,
        offset: FixedOffset,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            start_date: parse_optional("start_date", start_date)?,
            end_date: parse_optional("end_date", end_date)?,
            status: parse_optional("status", status)?,
            leave_type_id: parse_optional("leave_type_id", leave_type_id)?,
            offset,
        })
    }

    pub fn with_offset(mut self, offset: FixedOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.status.is_none()
            && self.leave_type_id.is_none()
    }

    pub fn matches(&self, request: &LeaveRequest) -> bool {
        let created = request.created_at.with_timezone(&self.offset).date_naive();

        if self.start_date.is_some_and(|start| created < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| created > end) {
            return false;
        }
        if self.status.is_some_and(|status| request.status != status) {
            return false;
        }
        if self.leave_type_id.is_some_and(|leave_type_id| request.leave_type_id != leave_type_id) {
            return false;
        }

        true
    }
}

fn parse_optional<T: FromStr>(field: &'static str, raw: &str) -> Result<Option<T>, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidFilterValue { field, value: raw.to_string() })
}

/// Direction of the `created_at` ordering; newest first by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::InvalidFilterValue { field: "sort", value: value.to_string() }),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        })
    }
}

/// Filters then stably sorts by `created_at`.
pub fn filter_and_sort<'a>(
    requests: &'a [LeaveRequest],
    filter: &RequestFilter,
    order: SortOrder,
) -> Vec<&'a LeaveRequest> {
    let mut selected: Vec<&LeaveRequest> =
        requests.iter().filter(|request| filter.matches(request)).collect();
    match order {
        SortOrder::Asc => selected.sort_by(|left, right| left.created_at.cmp(&right.created_at)),
        SortOrder::Desc => selected.sort_by(|left, right| right.created_at.cmp(&left.created_at)),
    }
    selected
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageSize(NonZeroUsize);

impl PageSize {
    pub const HISTORY: PageSize = PageSize::fixed(5);
    pub const QUEUE: PageSize = PageSize::fixed(8);
    pub const ADMIN: PageSize = PageSize::fixed(10);

    const fn fixed(size: usize) -> Self {
        match NonZeroUsize::new(size) {
            Some(size) => Self(size),
            None => panic!("page size constants must be non-zero"),
        }
    }

    pub fn new(size: usize) -> Result<Self, ValidationError> {
        NonZeroUsize::new(size).map(Self).ok_or(ValidationError::ZeroPageSize)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slices page `page` (1-based; 0 is read as 1). A page past the end is
/// empty rather than an error.
pub fn paginate<T: Clone>(items: &[T], page: usize, size: PageSize) -> Page<T> {
    let number = page.max(1);
    let size = size.get();
    let start = (number - 1).saturating_mul(size).min(items.len());
    let end = start.saturating_add(size).min(items.len());

    Page {
        items: items[start..end].to_vec(),
        number,
        page_size: size,
        total_items: items.len(),
        total_pages: items.len().div_ceil(size),
    }
}

/// One page component's worth of list state: the fetched requests plus the
/// current filter, ordering and page.
#[derive(Clone, Debug)]
pub struct RequestView {
    requests: Vec<LeaveRequest>,
    filter: RequestFilter,
    sort: SortOrder,
    page_size: PageSize,
    current_page: usize,
}

impl RequestView {
    pub fn new(requests: Vec<LeaveRequest>, page_size: PageSize) -> Self {
        Self {
            requests,
            filter: RequestFilter::default(),
            sort: SortOrder::default(),
            page_size,
            current_page: 1,
        }
    }

    pub fn with_filter(mut self, filter: RequestFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn filter(&self) -> &RequestFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortOrder {
        self.sort
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn requests(&self) -> &[LeaveRequest] {
        &self.requests
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Replaces the whole filter. Any change returns to page 1.
    pub fn set_filter(&mut self, filter: RequestFilter) {
        if filter != self.filter {
            self.filter = filter;
            self.current_page = 1;
        }
    }

    pub fn set_start_date(&mut self, start_date: Option<NaiveDate>) {
        self.set_filter(RequestFilter { start_date, ..self.filter });
    }

    pub fn set_end_date(&mut self, end_date: Option<NaiveDate>) {
        self.set_filter(RequestFilter { end_date, ..self.filter });
    }

    pub fn set_status(&mut self, status: Option<LeaveStatus>) {
        self.set_filter(RequestFilter { status, ..self.filter });
    }

    pub fn set_leave_type(&mut self, leave_type_id: Option<i64>) {
        self.set_filter(RequestFilter { leave_type_id, ..self.filter });
    }

    pub fn toggle_sort(&mut self) {
        self.sort = self.sort.toggle();
    }

    pub fn go_to(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn visible(&self) -> Vec<&LeaveRequest> {
        filter_and_sort(&self.requests, &self.filter, self.sort)
    }

    pub fn page(&self) -> Page<&LeaveRequest> {
        paginate(&self.visible(), self.current_page, self.page_size)
    }

    pub fn total_pages(&self) -> usize {
        self.visible().len().div_ceil(self.page_size.get())
    }

    /// Drops the request holding approval step `detail_id` and returns it.
    pub fn remove_step(&mut self, detail_id: RequestDetailId) -> Option<LeaveRequest> {
        let index = self.requests.iter().position(|request| request.has_step(detail_id))?;
        let removed = self.requests.remove(index);
        self.clamp_page();
        Some(removed)
    }

    pub fn remove_request(&mut self, id: LeaveRequestId) -> Option<LeaveRequest> {
        let index = self.requests.iter().position(|request| request.id == id)?;
        let removed = self.requests.remove(index);
        self.clamp_page();
        Some(removed)
    }

    /// Swaps in a freshly fetched list, keeping filter, order and page.
    pub fn replace(&mut self, requests: Vec<LeaveRequest>) {
        self.requests = requests;
        self.clamp_page();
    }

    fn clamp_page(&mut self) {
        let last = self.total_pages().max(1);
        if self.current_page > last {
            self.current_page = last;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{filter_and_sort, paginate, utc, PageSize, RequestFilter, RequestView, SortOrder};
    use crate::domain::approver::{ApprovalLevel, UserId};
    use crate::domain::leave_request::{
        ApprovalStep, LeaveRequest, LeaveRequestId, LeaveStatus, RequestDetailId, Requester,
    };
    use crate::errors::ValidationError;

    fn form(
        start: &str,
        end: &str,
        status: &str,
        leave_type: &str,
    ) -> Result<RequestFilter, ValidationError> {
        RequestFilter::from_form(start, end, status, leave_type, utc())
    }

    fn request(id: i64, leave_type_id: i64, created: (i32, u32, u32)) -> LeaveRequest {
        let (year, month, day) = created;
        LeaveRequest {
            id: LeaveRequestId(id),
            requester: Requester {
                id: UserId(100 + id),
                prefix_name: None,
                first_name: format!("Staff{id}"),
                last_name: "Test".to_string(),
                department: None,
                organization: None,
            },
            leave_type_id,
            start_date: NaiveDate::from_ymd_opt(year, month, day).expect("date"),
            end_date: NaiveDate::from_ymd_opt(year, month, day).expect("date"),
            total_days: 10.0,
            this_time_days: 1.0,
            leaved_days: 0.0,
            reason: String::new(),
            status: LeaveStatus::Pending,
            created_at: Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).single().expect("ts"),
            document_number: None,
            files: Vec::new(),
            steps: vec![ApprovalStep {
                id: RequestDetailId(1000 + id),
                reviewer_id: None,
                reviewer_name: None,
                level: Some(ApprovalLevel::DepartmentHead),
                remarks: None,
                status: LeaveStatus::Pending,
                reviewed_at: None,
            }],
        }
    }

    fn twelve_requests() -> Vec<LeaveRequest> {
        (1..=12)
            .map(|id| request(id, if id % 4 == 0 { 2 } else { 1 }, (2024, 1, id as u32)))
            .collect()
    }

    fn ids(requests: &[&LeaveRequest]) -> Vec<i64> {
        requests.iter().map(|request| request.id.0).collect()
    }

    #[test]
    fn leave_type_filter_selects_exactly_matching_items_on_one_page() {
        let requests = twelve_requests();
        let filter = form("", "", "", "2").expect("valid form");
        let visible = filter_and_sort(&requests, &filter, SortOrder::Desc);
        let page = paginate(&visible, 1, PageSize::QUEUE);

        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.iter().all(|request| request.leave_type_id == 2));
    }

    #[test]
    fn single_day_range_is_inclusive_on_both_ends() {
        let requests = vec![request(1, 1, (2024, 1, 5)), request(2, 1, (2024, 1, 10))];
        let filter = form("2024-01-05", "2024-01-05", "", "").expect("form");

        assert_eq!(ids(&filter_and_sort(&requests, &filter, SortOrder::Desc)), vec![1]);
    }

    #[test]
    fn date_bounds_include_their_own_day_and_are_open_ended_alone() {
        let requests = vec![
            request(1, 1, (2024, 1, 5)),
            request(2, 1, (2024, 1, 7)),
            request(3, 1, (2024, 1, 10)),
        ];

        let both = form("2024-01-05", "2024-01-10", "", "").expect("form");
        assert_eq!(ids(&filter_and_sort(&requests, &both, SortOrder::Asc)), vec![1, 2, 3]);

        let from = form("2024-01-07", "", "", "").expect("form");
        assert_eq!(ids(&filter_and_sort(&requests, &from, SortOrder::Asc)), vec![2, 3]);

        let until = form("", "2024-01-07", "", "").expect("form");
        assert_eq!(ids(&filter_and_sort(&requests, &until, SortOrder::Asc)), vec![1, 2]);
    }

    #[test]
    fn created_day_follows_configured_offset() {
        let mut late = request(1, 1, (2024, 1, 5));
        late.created_at = Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).single().expect("ts");
        let requests = vec![late];

        let bangkok = FixedOffset::east_opt(7 * 3600).expect("offset");
        let filter =
            RequestFilter::from_form("2024-01-06", "2024-01-06", "", "", bangkok).expect("form");
        assert_eq!(filter_and_sort(&requests, &filter, SortOrder::Asc).len(), 1);

        let utc_filter = form("2024-01-06", "2024-01-06", "", "").expect("form");
        assert!(filter_and_sort(&requests, &utc_filter, SortOrder::Asc).is_empty());
    }

    #[test]
    fn status_filter_is_exact_and_absent_filter_passes_everything() {
        let mut requests = twelve_requests();
        requests[0].status = LeaveStatus::Approved;
        requests[1].status = LeaveStatus::Rejected;

        let approved = form("", "", "approved", "").expect("form");
        assert_eq!(ids(&filter_and_sort(&requests, &approved, SortOrder::Asc)), vec![1]);

        let everything = filter_and_sort(&requests, &RequestFilter::default(), SortOrder::Asc);
        assert_eq!(everything.len(), requests.len());
    }

    #[test]
    fn output_is_always_a_duplicate_free_subset_of_input() {
        let requests = twelve_requests();
        let filters = [
            RequestFilter::default(),
            form("2024-01-03", "2024-01-09", "", "1").expect("form"),
            form("", "", "pending", "2").expect("form"),
            form("2025-01-01", "", "", "").expect("form"),
        ];

        for filter in &filters {
            for order in [SortOrder::Asc, SortOrder::Desc] {
                let visible = filter_and_sort(&requests, filter, order);
                let mut seen = ids(&visible);
                seen.sort_unstable();
                seen.dedup();
                assert_eq!(seen.len(), visible.len());
                assert!(visible.iter().all(|item| requests.iter().any(|r| r.id == item.id)));
            }
        }
    }

    #[test]
    fn toggling_sort_reverses_exactly_once_per_toggle() {
        let requests = twelve_requests();
        let filter = RequestFilter::default();
        let mut order = SortOrder::Desc;

        let first = ids(&filter_and_sort(&requests, &filter, order));
        order = order.toggle();
        let second = ids(&filter_and_sort(&requests, &filter, order));
        order = order.toggle();
        let third = ids(&filter_and_sort(&requests, &filter, order));

        let mut reversed = first.clone();
        reversed.reverse();
        assert_eq!(second, reversed);
        assert_eq!(third, first);
        assert_eq!(first[0], 12);
    }

    #[test]
    fn page_length_matches_formula_and_past_the_end_is_empty() {
        let items: Vec<u32> = (0..23).collect();
        for size in [5_usize, 8, 10] {
            let page_size = PageSize::new(size).expect("non-zero");
            for k in 1..=6_usize {
                let expected = size.min(items.len().saturating_sub((k - 1) * size));
                assert_eq!(paginate(&items, k, page_size).items.len(), expected, "size {size} page {k}");
            }
        }

        let beyond = paginate(&items, 99, PageSize::ADMIN);
        assert!(beyond.items.is_empty());
        assert_eq!(beyond.total_pages, 3);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert_eq!(PageSize::new(0), Err(ValidationError::ZeroPageSize));
    }

    #[test]
    fn invalid_form_values_are_reported_by_field() {
        assert_eq!(
            form("05/01/2024", "", "", ""),
            Err(ValidationError::InvalidFilterValue {
                field: "start_date",
                value: "05/01/2024".to_string(),
            })
        );
        assert!(form("", "", "", "two").is_err());
    }

    #[test]
    fn any_filter_change_resets_to_first_page() {
        let mut view = RequestView::new(twelve_requests(), PageSize::HISTORY);
        view.go_to(3);
        assert_eq!(view.page().items.len(), 2);

        view.set_leave_type(Some(1));
        assert_eq!(view.current_page(), 1);

        view.go_to(2);
        view.set_status(Some(LeaveStatus::Pending));
        assert_eq!(view.current_page(), 1);

        view.go_to(2);
        view.set_start_date(NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(view.current_page(), 1);

        view.go_to(2);
        view.set_end_date(NaiveDate::from_ymd_opt(2024, 1, 11));
        assert_eq!(view.current_page(), 1);
    }

    #[test]
    fn setting_an_identical_filter_keeps_the_page() {
        let mut view = RequestView::new(twelve_requests(), PageSize::HISTORY);
        view.go_to(2);
        view.set_filter(*view.filter());
        assert_eq!(view.current_page(), 2);
    }

    #[test]
    fn form_filter_keeps_the_views_offset_and_page() {
        let bangkok = FixedOffset::east_opt(7 * 3600).expect("offset");
        let mut view = RequestView::new(twelve_requests(), PageSize::HISTORY)
            .with_filter(RequestFilter::default().with_offset(bangkok));
        view.go_to(2);

        view.set_filter(RequestFilter::from_form("", "", "", "", bangkok).expect("form"));

        assert_eq!(view.filter().offset, bangkok);
        assert_eq!(view.current_page(), 2);
    }

    #[test]
    fn removing_the_last_item_of_a_page_steps_back() {
        let mut requests = twelve_requests();
        requests.truncate(6);
        let mut view = RequestView::new(requests, PageSize::HISTORY).with_sort(SortOrder::Asc);
        view.go_to(2);
        assert_eq!(ids(&view.page().items), vec![6]);

        let removed = view.remove_step(RequestDetailId(1006)).expect("step should be found");
        assert_eq!(removed.id, LeaveRequestId(6));
        assert_eq!(view.current_page(), 1);
        assert_eq!(view.len(), 5);
        assert!(view.remove_step(RequestDetailId(1006)).is_none());
    }

    #[test]
    fn replace_keeps_filter_and_sort() {
        let mut view = RequestView::new(twelve_requests(), PageSize::QUEUE)
            .with_filter(form("", "", "", "2").expect("form"))
            .with_sort(SortOrder::Asc);

        let mut fresh = twelve_requests();
        fresh.push(request(13, 2, (2024, 1, 13)));
        for request in &mut fresh {
            request.created_at += Duration::hours(1);
        }
        view.replace(fresh);

        assert_eq!(ids(&view.page().items), vec![4, 8, 12, 13]);
        assert_eq!(view.sort(), SortOrder::Asc);
    }
}
