//! Talks to the parent-dashboard web service. [ActivitySource] is the seam
//! the sync loop works against: "given a session, answer one activity query
//! per (child, window) pair". A recorded-fixture replay satisfies it just as
//! well as the real client, which keeps the core testable offline.

pub mod client;
pub mod credentials;
pub mod extract;

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::sync::windows::FetchWindow;

pub const ACTIVITIES_API: &str =
    "https://www.amazon.com/parentdashboard/ajax/get-weekly-activities-v2";
pub const HOUSEHOLD_API: &str = "https://www.amazon.com/parentdashboard/ajax/get-household";

/// A child profile discovered in the household.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProfile {
    pub directed_id: String,
    pub first_name: String,
}

/// One captured dashboard response, kept opaque for the audit archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    pub url: String,
    pub status: u16,
    pub body: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<WindowQuery>,
}

/// The query a window response answered, archived alongside its body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowQuery {
    pub child_directed_id: String,
    pub start_time: i64,
    pub end_time: i64,
}

/// What a freshly opened session knows about the household.
#[derive(Debug)]
pub struct SessionInfo {
    pub children: Vec<ChildProfile>,
    /// Payloads captured while opening the session, archived like any other.
    pub startup_responses: Vec<RawResponse>,
}

/// Contract every dashboard backend must implement. Implementations own the
/// network call and the pacing between calls; they do not retry, since a
/// failed window is reconciled by the next incremental run anyway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivitySource {
    async fn open(&mut self) -> Result<SessionInfo>;

    async fn fetch_activity(
        &mut self,
        child: &ChildProfile,
        window: FetchWindow,
    ) -> Result<RawResponse>;
}
