//! Time-bucket labels for the history picker.

use time::OffsetDateTime;

/// Labels `event` relative to `now`: "Today", "Yesterday", "This week",
/// "This month", a month name within the current year, otherwise the year.
///
/// `event` is compared in `now`'s UTC offset.
#[must_use]
pub fn time_separator(event: OffsetDateTime, now: OffsetDateTime) -> String {
    let event = event.to_offset(now.offset());
    let days_diff = (now - event).whole_days();

    let same_year = event.year() == now.year();
    let same_month = same_year && event.month() == now.month();
    let same_week = same_month && event.iso_week() == now.iso_week();

    if days_diff < 1 {
        "Today".to_string()
    } else if days_diff < 2 {
        "Yesterday".to_string()
    } else if same_week {
        "This week".to_string()
    } else if same_month {
        "This month".to_string()
    } else if same_year {
        event.month().to_string()
    } else {
        event.year().to_string()
    }
}
