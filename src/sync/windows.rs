use chrono::{DateTime, Duration, NaiveDate};
use chrono_tz::Tz;

use crate::utils::time::{day_start_in, timestamp_to_date};

/// Default paging width when walking dashboard history.
pub const DEFAULT_WINDOW: Duration = Duration::days(7);

/// First day ever considered when no usable history exists on disk.
pub const BOOTSTRAP_START: NaiveDate = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();

/// One closed-open `[start, end)` query window in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: i64,
    pub end: i64,
}

impl FetchWindow {
    pub fn start_date(&self, zone: &Tz) -> String {
        timestamp_to_date(self.start, zone).unwrap_or_else(|| self.start.to_string())
    }

    pub fn end_date(&self, zone: &Tz) -> String {
        timestamp_to_date(self.end, zone).unwrap_or_else(|| self.end.to_string())
    }
}

/// Lazily walks `[start, end)` in contiguous `width`-sized steps, truncating
/// the final window to `end`. Purely a function of its inputs: the sequence
/// is finite, restartable, and empty when the range (or the width) is.
pub fn enumerate_windows(
    start: i64,
    end: i64,
    width: Duration,
) -> impl Iterator<Item = FetchWindow> {
    let width = width.num_seconds();
    let mut cursor = start;
    std::iter::from_fn(move || {
        if width <= 0 || cursor >= end {
            return None;
        }
        let next = end.min(cursor + width);
        let window = FetchWindow {
            start: cursor,
            end: next,
        };
        cursor = next;
        Some(window)
    })
}

/// Where the next fetch should begin: the latest day already on disk, so a
/// possibly-incomplete capture of that day is fetched again, or the bootstrap
/// default on a first run.
pub fn fetch_start(latest: Option<NaiveDate>, zone: &Tz) -> DateTime<Tz> {
    day_start_in(latest.unwrap_or(BOOTSTRAP_START), zone)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use crate::utils::time::REPORTING_ZONE;

    use super::{enumerate_windows, fetch_start, FetchWindow, BOOTSTRAP_START};

    #[test]
    fn windows_tile_the_range_exactly() {
        for (start, end, width) in [
            (0, 100, Duration::seconds(30)),
            (50, 1_000_000, Duration::days(7)),
            (7, 8, Duration::seconds(1)),
            (1_735_689_600, 1_748_822_400, Duration::days(7)),
        ] {
            let windows: Vec<FetchWindow> = enumerate_windows(start, end, width).collect();

            assert_eq!(windows.first().map(|w| w.start), Some(start));
            assert_eq!(windows.last().map(|w| w.end), Some(end));
            for pair in windows.windows(2) {
                assert_eq!(pair[0].end, pair[1].start);
            }
            for window in &windows[..windows.len() - 1] {
                assert_eq!(window.end - window.start, width.num_seconds());
            }
            assert!(windows.last().map(|w| w.end - w.start).unwrap_or(0) <= width.num_seconds());
        }
    }

    #[test]
    fn final_window_is_truncated() {
        let windows: Vec<FetchWindow> = enumerate_windows(0, 100, Duration::seconds(30)).collect();

        assert_eq!(windows.len(), 4);
        assert_eq!(windows[3], FetchWindow { start: 90, end: 100 });
    }

    #[test]
    fn empty_range_produces_no_windows() {
        assert_eq!(enumerate_windows(42, 42, Duration::days(7)).count(), 0);
    }

    #[test]
    fn non_positive_width_produces_no_windows() {
        assert_eq!(enumerate_windows(0, 100, Duration::zero()).count(), 0);
        assert_eq!(enumerate_windows(0, 100, Duration::seconds(-5)).count(), 0);
    }

    #[test]
    fn enumeration_is_restartable() {
        let first: Vec<FetchWindow> = enumerate_windows(3, 500, Duration::seconds(60)).collect();
        let second: Vec<FetchWindow> = enumerate_windows(3, 500, Duration::seconds(60)).collect();

        assert_eq!(first, second);
    }

    #[test]
    fn fetch_start_prefers_the_latest_existing_day() {
        let latest = NaiveDate::from_ymd_opt(2025, 6, 1);

        let start = fetch_start(latest, &REPORTING_ZONE);

        assert_eq!(start.date_naive(), latest.unwrap());
    }

    #[test]
    fn fetch_start_falls_back_to_bootstrap() {
        let start = fetch_start(None, &REPORTING_ZONE);

        assert_eq!(start.date_naive(), BOOTSTRAP_START);
    }
}
