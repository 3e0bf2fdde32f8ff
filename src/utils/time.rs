use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

/// This is the standard way of addressing a day by string across the dataset.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// The dashboard aggregates activity in the household's local zone. Every
/// timestamp-to-day conversion goes through this single zone, otherwise
/// reading days drift across midnight.
pub const REPORTING_ZONE: Tz = chrono_tz::America::Los_Angeles;

/// Formats an epoch second as a calendar day in the given zone.
pub fn timestamp_to_date(ts: i64, zone: &Tz) -> Option<String> {
    zone.timestamp_opt(ts, 0)
        .single()
        .map(|v| v.format(DATE_FORMAT).to_string())
}

/// Returns midnight of `date` in `zone`.
pub fn day_start_in(date: NaiveDate, zone: &Tz) -> DateTime<Tz> {
    let midnight = date.and_time(NaiveTime::MIN);
    match zone.from_local_datetime(&midnight).earliest() {
        Some(v) => v,
        // A zone that skips midnight on a DST day has no exact local midnight.
        None => zone.from_utc_datetime(&midnight),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{day_start_in, timestamp_to_date, REPORTING_ZONE};

    #[test]
    fn timestamp_lands_on_reporting_day_not_utc_day() {
        // 2025-06-02 03:00 UTC is still the evening of June 1st in Los Angeles.
        assert_eq!(
            timestamp_to_date(1_748_833_200, &REPORTING_ZONE).as_deref(),
            Some("2025-06-01")
        );
    }

    #[test]
    fn day_start_is_local_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        // Midnight PST is 08:00 UTC.
        assert_eq!(day_start_in(date, &REPORTING_ZONE).timestamp(), 1_735_718_400);
    }
}
