use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::utils::time::DATE_FORMAT;

use super::entities::DailyActivityRecord;

/// Folds a fresh fetch into the already-deduplicated canonical collection.
/// Records are keyed by day; when a day is present on both sides the incoming
/// record wins whenever it lists at least as many books, so a refetch of an
/// already-captured day prefers the fresher data. Entries whose date does not
/// parse under [DATE_FORMAT] are dropped rather than propagated.
///
/// The result is unique per date and sorted ascending by the date string,
/// which for this format coincides with chronological order.
pub fn merge_activity(
    existing: Vec<DailyActivityRecord>,
    incoming: Vec<DailyActivityRecord>,
) -> Vec<DailyActivityRecord> {
    let mut by_date = BTreeMap::new();
    for record in existing.into_iter().filter(has_valid_date) {
        by_date.insert(record.date.clone(), record);
    }
    for record in incoming.into_iter().filter(has_valid_date) {
        match by_date.get(&record.date) {
            Some(stored) if record.books.len() < stored.books.len() => {}
            _ => {
                by_date.insert(record.date.clone(), record);
            }
        }
    }
    by_date.into_values().collect()
}

fn has_valid_date(record: &DailyActivityRecord) -> bool {
    NaiveDate::parse_from_str(&record.date, DATE_FORMAT).is_ok()
}

/// Latest day present in the collection. Malformed dates are skipped so a
/// single bad persisted entry can't derail the incremental fetch start.
pub fn latest_existing_date(records: &[DailyActivityRecord]) -> Option<NaiveDate> {
    records
        .iter()
        .filter_map(|record| NaiveDate::parse_from_str(&record.date, DATE_FORMAT).ok())
        .max()
}
