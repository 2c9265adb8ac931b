//! Daily trigger arithmetic.

use chrono::{DateTime, Days, Duration, NaiveDateTime, TimeZone};

/// The first `hour:00` strictly after `now`, in `now`'s timezone.
///
/// Hours past 23 clamp to 23. When the wall-clock hour does not exist on a
/// given day (DST gap) the trigger slides one hour later; when it occurs
/// twice the earlier instant wins.
pub fn next_trigger<Tz: TimeZone>(now: &DateTime<Tz>, hour: u32) -> DateTime<Tz> {
    let tz = now.timezone();
    let hour = hour.min(23);
    let today = now.date_naive();

    (0..3u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| day.and_hms_opt(hour, 0, 0))
        .filter_map(|naive| resolve_local(&tz, naive))
        .find(|at| at > now)
        .unwrap_or_else(|| now.clone() + Duration::hours(24))
}

/// Time left until `at`, zero when already past.
pub fn delay_until<Tz: TimeZone>(now: &DateTime<Tz>, at: &DateTime<Tz>) -> std::time::Duration {
    at.clone()
        .signed_duration_since(now.clone())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

fn resolve_local<Tz: TimeZone>(tz: &Tz, naive: NaiveDateTime) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&naive)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(naive + Duration::hours(1))).earliest())
}
