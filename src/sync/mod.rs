pub mod windows;

use anyhow::Result;
use chrono_tz::Tz;
use tracing::warn;

use crate::{
    dashboard::{extract::extract_daily_records, ActivitySource, ChildProfile, RawResponse},
    storage::{
        dataset::DatasetStore,
        entities::{FetchResult, PersistedDataset},
        merge::{latest_existing_date, merge_activity},
    },
    utils::{clock::Clock, time::DATE_FORMAT},
};

use windows::{enumerate_windows, fetch_start, FetchWindow, DEFAULT_WINDOW};

/// Runs one full sync: incremental fetch, normalize, archive the raw capture,
/// merge into the canonical dataset, rewrite it. A partially failed fetch
/// still completes the run with whatever it got; the next run's start date is
/// recomputed from the dataset, which is what heals the gap.
pub async fn run_sync(
    source: &mut impl ActivitySource,
    store: &DatasetStore,
    clock: &dyn Clock,
    zone: Tz,
    debug: bool,
) -> Result<()> {
    let dataset = store.load().await?;
    let previous_days = dataset.reading_activity.len();

    let latest = latest_existing_date(&dataset.reading_activity);
    match latest {
        Some(day) => println!(
            "Incremental fetch starting from existing latest day: {}",
            day.format(DATE_FORMAT)
        ),
        None => println!("No existing reading history found; using automatic bootstrap window"),
    }

    let start = fetch_start(latest, &zone);
    let now = clock.time().with_timezone(&zone);
    let fetch_windows: Vec<FetchWindow> =
        enumerate_windows(start.timestamp(), now.timestamp(), DEFAULT_WINDOW).collect();

    let session = source.open().await?;
    if debug {
        println!("--- Startup responses: {} ---", session.startup_responses.len());
        for response in &session.startup_responses {
            println!("  {} {}", response.status, response.url);
        }
    }
    if session.children.is_empty() {
        println!("No children found in household response.");
    } else {
        let names: Vec<&str> = session
            .children
            .iter()
            .map(|child| child.first_name.as_str())
            .collect();
        println!("Found children: {}", names.join(", "));
    }

    let mut raw_responses = session.startup_responses;
    for child in &session.children {
        println!(
            "\nFetching history for {} ({})...",
            child.first_name, child.directed_id
        );
        fetch_child_history(source, child, &fetch_windows, &zone, debug, &mut raw_responses).await;
    }

    let reading_activity = extract_daily_records(&raw_responses, &zone);
    println!("Fetched {} days of activity", reading_activity.len());

    let fetch = FetchResult {
        fetched_at: clock.time(),
        reading_activity,
        raw_responses,
    };
    let raw_path = store.archive_fetch(&fetch).await?;
    println!("Raw fetch saved to {}", raw_path.display());

    let updated = PersistedDataset {
        reading_activity: merge_activity(dataset.reading_activity, fetch.reading_activity),
        last_updated: Some(clock.time()),
    };
    store.save(&updated).await?;

    let merged = &updated.reading_activity;
    let new_days = merged.len() as i64 - previous_days as i64;
    let new_days = if new_days > 0 {
        format!("+{new_days}")
    } else {
        new_days.to_string()
    };
    println!("\nMerged: {} total days ({new_days} new)", merged.len());
    match (merged.first(), merged.last()) {
        (Some(first), Some(last)) => println!("Date range: {} to {}", first.date, last.date),
        _ => println!("Date range: no activity yet"),
    }
    println!("Saved to {}", store.dataset_path().display());

    Ok(())
}

/// Issues one activity query per window. A non-success answer loses that
/// window for this run only, so it is logged and skipped rather than retried.
async fn fetch_child_history(
    source: &mut impl ActivitySource,
    child: &ChildProfile,
    fetch_windows: &[FetchWindow],
    zone: &Tz,
    debug: bool,
    raw_responses: &mut Vec<RawResponse>,
) {
    let total = fetch_windows.len();
    for (index, window) in fetch_windows.iter().enumerate() {
        let label = format!(
            "Week {}/{}: {} to {}",
            index + 1,
            total,
            window.start_date(zone),
            window.end_date(zone)
        );
        match source.fetch_activity(child, *window).await {
            Ok(response) if response.status == 200 => {
                println!("  {label} - OK");
                raw_responses.push(response);
            }
            Ok(response) => {
                warn!(
                    "Window query for {} answered HTTP {}",
                    child.first_name, response.status
                );
                println!("  {label} - HTTP {}", response.status);
                if debug {
                    let body: String = response.body.to_string().chars().take(200).collect();
                    println!("    Response: {body}");
                }
            }
            Err(e) => {
                warn!("Window query for {} errored: {e:?}", child.first_name);
                println!("  {label} - request failed");
            }
        }
    }
}

#[cfg(test)]
mod sync_tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    use crate::{
        dashboard::{
            ChildProfile, MockActivitySource, RawResponse, SessionInfo, ACTIVITIES_API,
            HOUSEHOLD_API,
        },
        storage::{
            dataset::DatasetStore,
            entities::{BookSession, DailyActivityRecord, PersistedDataset},
        },
        utils::{clock::Clock, logging::TEST_LOGGING, time::REPORTING_ZONE},
    };

    use super::run_sync;

    // 2025-06-01 00:00 in Los Angeles; a week plus a half-day later for "now".
    const JUNE_1: i64 = 1_748_761_200;
    const JUNE_2: i64 = JUNE_1 + 86_400;

    struct FixedClock(DateTime<Utc>);

    #[async_trait]
    impl Clock for FixedClock {
        fn time(&self) -> DateTime<Utc> {
            self.0
        }

        async fn sleep(&self, _duration: std::time::Duration) {}
    }

    fn test_child() -> ChildProfile {
        ChildProfile {
            directed_id: "child-1".into(),
            first_name: "Milo".into(),
        }
    }

    fn household_response() -> RawResponse {
        RawResponse {
            url: HOUSEHOLD_API.to_string(),
            status: 200,
            body: json!({
                "members": [{ "role": "CHILD", "directedId": "child-1", "firstName": "Milo" }]
            }),
            query: None,
        }
    }

    fn activities_response(status: u16, body: serde_json::Value) -> RawResponse {
        RawResponse {
            url: ACTIVITIES_API.to_string(),
            status,
            body,
            query: None,
        }
    }

    async fn seeded_store(dir: &std::path::Path) -> Result<DatasetStore> {
        let store = DatasetStore::new(dir.to_owned())?;
        let seed = PersistedDataset {
            reading_activity: vec![DailyActivityRecord::new(
                "2025-06-01".into(),
                600,
                vec![BookSession {
                    title: "b1".into(),
                    asin: None,
                    duration_seconds: 600,
                    sessions: 1,
                    thumbnail: None,
                }],
            )],
            last_updated: None,
        };
        store.save(&seed).await?;
        Ok(store)
    }

    #[tokio::test]
    async fn sync_merges_fetch_into_dataset_and_archives_raw_capture() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = seeded_store(dir.path()).await?;

        // Noon June 8th in the reporting zone: a week and a half-day past the
        // seeded latest date, which makes exactly two fetch windows.
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 6, 8, 19, 0, 0).unwrap());

        let payload = json!({
            "activityV2Data": [{
                "intervals": [
                    {
                        "startTime": JUNE_1,
                        "aggregatedDuration": 1200,
                        "aggregatedActivityResults": [
                            { "attributes": { "TITLE": "b1" }, "activityDuration": 600, "activityCount": 1 },
                            { "attributes": { "TITLE": "b2" }, "activityDuration": 600, "activityCount": 1 },
                        ]
                    },
                    {
                        "startTime": JUNE_2,
                        "aggregatedDuration": 600,
                        "aggregatedActivityResults": [
                            { "attributes": { "TITLE": "b3" }, "activityDuration": 600, "activityCount": 2 },
                        ]
                    },
                ]
            }]
        });

        let mut source = MockActivitySource::new();
        source.expect_open().return_once(|| {
            Ok(SessionInfo {
                children: vec![test_child()],
                startup_responses: vec![household_response()],
            })
        });
        source
            .expect_fetch_activity()
            .times(2)
            .returning(move |_, _| Ok(activities_response(200, payload.clone())));

        run_sync(&mut source, &store, &clock, REPORTING_ZONE, false).await?;

        let dataset = store.load().await?;
        let dates: Vec<&str> = dataset
            .reading_activity
            .iter()
            .map(|r| r.date.as_str())
            .collect();
        assert_eq!(dates, vec!["2025-06-01", "2025-06-02"]);
        // The refetched June 1st now carries both books.
        assert_eq!(dataset.reading_activity[0].books.len(), 2);
        assert_eq!(dataset.last_updated, Some(clock.time()));

        assert!(dir.path().join("fetch_2025-06-08T190000.json").exists());
        Ok(())
    }

    #[tokio::test]
    async fn failed_windows_leave_the_dataset_intact() -> Result<()> {
        let dir = tempdir()?;
        let store = seeded_store(dir.path()).await?;
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 6, 8, 19, 0, 0).unwrap());

        let mut source = MockActivitySource::new();
        source.expect_open().return_once(|| {
            Ok(SessionInfo {
                children: vec![test_child()],
                startup_responses: vec![household_response()],
            })
        });
        source
            .expect_fetch_activity()
            .times(2)
            .returning(|_, _| Ok(activities_response(503, json!({ "_raw_text": "try later" }))));

        run_sync(&mut source, &store, &clock, REPORTING_ZONE, false).await?;

        let dataset = store.load().await?;
        assert_eq!(dataset.reading_activity.len(), 1);
        assert_eq!(dataset.reading_activity[0].books.len(), 1);
        // The run itself succeeded, so the rewrite still happened.
        assert_eq!(dataset.last_updated, Some(clock.time()));
        Ok(())
    }
}
