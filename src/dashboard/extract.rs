use chrono_tz::Tz;
use serde::Deserialize;
use tracing::debug;

use crate::{
    storage::entities::{BookSession, DailyActivityRecord},
    utils::time::timestamp_to_date,
};

use super::RawResponse;

/// Marker distinguishing activity-query responses from everything else a
/// session captures.
const ACTIVITIES_MARKER: &str = "get-weekly-activities";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivitiesBody {
    #[serde(default)]
    activity_v2_data: Vec<ActivityCategory>,
}

#[derive(Deserialize)]
struct ActivityCategory {
    #[serde(default)]
    intervals: Vec<ActivityInterval>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityInterval {
    start_time: Option<i64>,
    #[serde(default)]
    aggregated_duration: u64,
    #[serde(default)]
    aggregated_activity_results: Vec<ActivityResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityResult {
    #[serde(default)]
    attributes: ResultAttributes,
    #[serde(default)]
    activity_duration: u64,
    #[serde(default)]
    activity_count: u64,
}

#[derive(Default, Deserialize)]
struct ResultAttributes {
    #[serde(rename = "TITLE")]
    title: Option<String>,
    #[serde(rename = "ORIGINAL_KEY")]
    original_key: Option<String>,
    #[serde(rename = "THUMBNAIL_URL")]
    thumbnail_url: Option<String>,
}

/// Filters captured payloads down to activity responses and flattens their
/// category -> interval structure into one record per reading day. Intervals
/// without a start time or with zero aggregated duration are not reading days
/// and produce nothing. Duplicate dates across payloads are preserved here;
/// dedup belongs to the merge step.
pub fn extract_daily_records(responses: &[RawResponse], zone: &Tz) -> Vec<DailyActivityRecord> {
    let mut reading_activity = Vec::new();

    for response in responses {
        if !response.url.contains(ACTIVITIES_MARKER) {
            continue;
        }
        let Ok(body) = serde_json::from_value::<ActivitiesBody>(response.body.clone()) else {
            // Upstream response shapes drift; skip what no longer parses.
            debug!("Skipping unrecognized payload from {}", response.url);
            continue;
        };

        for category in body.activity_v2_data {
            for interval in category.intervals {
                let Some(start_ts) = interval.start_time else {
                    continue;
                };
                if interval.aggregated_duration == 0 {
                    continue;
                }
                let Some(date) = timestamp_to_date(start_ts, zone) else {
                    continue;
                };

                let books = interval
                    .aggregated_activity_results
                    .into_iter()
                    .map(|result| BookSession {
                        title: result
                            .attributes
                            .title
                            .unwrap_or_else(|| "Unknown".to_string()),
                        asin: result.attributes.original_key,
                        duration_seconds: result.activity_duration,
                        sessions: result.activity_count,
                        thumbnail: result.attributes.thumbnail_url,
                    })
                    .collect();

                reading_activity.push(DailyActivityRecord::new(
                    date,
                    interval.aggregated_duration,
                    books,
                ));
            }
        }
    }

    reading_activity.sort_by(|a, b| a.date.cmp(&b.date));
    reading_activity
}
