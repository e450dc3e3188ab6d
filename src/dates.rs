use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::task::{Task, TaskStatus};

const MILLIS_PER_DAY: i64 = 1000 * 60 * 60 * 24;

/// A task due within this many days (inclusive) is "due soon".
pub const DUE_SOON_DAYS: i64 = 3;

/// "Jan 5, 2025"
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// A due date means midnight UTC at the start of that day.
pub fn due_instant(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

pub fn is_overdue_at(date: NaiveDate, now: DateTime<Utc>) -> bool {
    due_instant(date) < now
}

pub fn is_overdue(date: NaiveDate) -> bool {
    is_overdue_at(date, Utc::now())
}

/// Whole days until `date`, rounded up. Zero means due today, negative means
/// already past.
pub fn days_until_due_at(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    let diff = (due_instant(date) - now).num_milliseconds();
    diff.div_euclid(MILLIS_PER_DAY) + i64::from(diff.rem_euclid(MILLIS_PER_DAY) > 0)
}

pub fn days_until_due(date: NaiveDate) -> i64 {
    days_until_due_at(date, Utc::now())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueState {
    Overdue,
    DueSoon,
    None,
}

impl DueState {
    pub fn label(self) -> Option<&'static str> {
        match self {
            DueState::Overdue => Some("Overdue"),
            DueState::DueSoon => Some("Due soon"),
            DueState::None => None,
        }
    }
}

/// Completed tasks and tasks without a due date are never flagged. Overdue
/// wins over due soon.
pub fn due_state_at(task: &Task, now: DateTime<Utc>) -> DueState {
    let Some(due) = task.due_date else {
        return DueState::None;
    };
    if task.status == TaskStatus::Completed {
        return DueState::None;
    }
    if is_overdue_at(due, now) {
        return DueState::Overdue;
    }
    let days = days_until_due_at(due, now);
    if (0..=DUE_SOON_DAYS).contains(&days) {
        DueState::DueSoon
    } else {
        DueState::None
    }
}

pub fn due_state(task: &Task) -> DueState {
    due_state_at(task, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Priority;
    use chrono::{Duration, TimeZone};
    use rstest::rstest;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn task_due(due: Option<NaiveDate>, status: TaskStatus) -> Task {
        Task {
            id: "t".to_string(),
            title: "t".to_string(),
            description: None,
            priority: Priority::Medium,
            status,
            due_date: due,
            project_id: None,
            created_at: noon(2025, 1, 1),
        }
    }

    #[test]
    fn formats_short_month_day_year() {
        assert_eq!(format_date(date(2025, 1, 5)), "Jan 5, 2025");
        assert_eq!(format_date(date(2024, 12, 31)), "Dec 31, 2024");
    }

    #[test]
    fn overdue_is_strictly_before_now() {
        let now = noon(2025, 3, 10);
        assert!(is_overdue_at(date(2025, 3, 9), now));
        assert!(!is_overdue_at(date(2025, 3, 11), now));

        let midnight = due_instant(date(2025, 3, 10));
        assert!(!is_overdue_at(date(2025, 3, 10), midnight));
        assert!(is_overdue_at(
            date(2025, 3, 10),
            midnight + Duration::seconds(1)
        ));
    }

    #[rstest]
    #[case(date(2025, 3, 13), 3)]
    #[case(date(2025, 3, 11), 1)]
    #[case(date(2025, 3, 10), 0)]
    #[case(date(2025, 3, 9), -1)]
    #[case(date(2025, 3, 1), -9)]
    fn days_until_due_rounds_up(#[case] due: NaiveDate, #[case] expected: i64) {
        assert_eq!(days_until_due_at(due, noon(2025, 3, 10)), expected);
    }

    #[test]
    fn days_until_due_exact_day_boundary() {
        let now = due_instant(date(2025, 3, 10));
        assert_eq!(days_until_due_at(date(2025, 3, 12), now), 2);
        assert_eq!(days_until_due_at(date(2025, 3, 10), now), 0);
    }

    #[rstest]
    #[case(Duration::milliseconds(-500), 1)]
    #[case(Duration::milliseconds(-1), 1)]
    #[case(Duration::milliseconds(1), 0)]
    #[case(Duration::days(1) + Duration::milliseconds(1), -1)]
    #[case(Duration::days(-1) - Duration::milliseconds(250), 2)]
    fn days_until_due_counts_partial_seconds(#[case] offset: Duration, #[case] expected: i64) {
        let due = date(2025, 3, 10);
        assert_eq!(days_until_due_at(due, due_instant(due) + offset), expected);
    }

    #[rstest]
    #[case(None, TaskStatus::Todo, DueState::None)]
    #[case(Some(date(2025, 3, 9)), TaskStatus::Todo, DueState::Overdue)]
    #[case(Some(date(2025, 3, 9)), TaskStatus::Completed, DueState::None)]
    #[case(Some(date(2025, 3, 12)), TaskStatus::InProgress, DueState::DueSoon)]
    #[case(Some(date(2025, 3, 13)), TaskStatus::Todo, DueState::DueSoon)]
    #[case(Some(date(2025, 3, 14)), TaskStatus::Todo, DueState::None)]
    #[case(Some(date(2025, 3, 12)), TaskStatus::Completed, DueState::None)]
    fn classifies_due_state(
        #[case] due: Option<NaiveDate>,
        #[case] status: TaskStatus,
        #[case] expected: DueState,
    ) {
        let task = task_due(due, status);
        assert_eq!(due_state_at(&task, noon(2025, 3, 10)), expected);
    }

    #[test]
    fn overdue_takes_precedence_over_due_soon() {
        // due today, a few hours past midnight: zero days left but overdue
        let task = task_due(Some(date(2025, 3, 10)), TaskStatus::Todo);
        assert_eq!(days_until_due_at(date(2025, 3, 10), noon(2025, 3, 10)), 0);
        assert_eq!(due_state_at(&task, noon(2025, 3, 10)), DueState::Overdue);
    }
}
