use chrono::DateTime;
use chrono::Utc;

use serde::Deserialize;
use serde::Serialize;

use crate::dashboard::RawResponse;

/// One book's share of a reading day, as reported by the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookSession {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub asin: Option<String>,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub sessions: u64,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// One calendar day of reading. `date` is the unique key inside any canonical
/// collection. Fields deserialize permissively so a malformed persisted entry
/// degrades into an ignorable record instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyActivityRecord {
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub total_seconds: u64,
    #[serde(default)]
    pub total_minutes: f64,
    #[serde(default)]
    pub books: Vec<BookSession>,
}

impl DailyActivityRecord {
    pub fn new(date: String, total_seconds: u64, books: Vec<BookSession>) -> Self {
        let total_minutes = (total_seconds as f64 / 60.0 * 10.0).round() / 10.0;
        Self {
            date,
            total_seconds,
            total_minutes,
            books,
        }
    }
}

/// Everything a single run captured, archived verbatim for audit and replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchResult {
    pub fetched_at: DateTime<Utc>,
    pub reading_activity: Vec<DailyActivityRecord>,
    pub raw_responses: Vec<RawResponse>,
}

/// The canonical dataset file. Rewritten in full at the end of a successful
/// run; the latest successful write wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistedDataset {
    #[serde(default)]
    pub reading_activity: Vec<DailyActivityRecord>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}
