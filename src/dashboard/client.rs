use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use serde_json::json;

use crate::{config::AppConfig, sync::windows::FetchWindow, utils::clock::Clock};

use super::{
    credentials, ActivitySource, ChildProfile, RawResponse, SessionInfo, WindowQuery,
    ACTIVITIES_API, HOUSEHOLD_API,
};

/// The AJAX layer expects the CSRF token carried by this cookie echoed back
/// in a request header.
const CSRF_COOKIE: &str = "ft-panda-csrf-token";
/// Field on the 1Password item holding the cookie header of a logged-in
/// dashboard tab.
const COOKIE_FIELD: &str = "dashboard-cookie";
/// Aggregation bucket the dashboard uses for "one entry per day".
const DAY_SECONDS: u64 = 86_400;
/// Informal rate limit on the AJAX endpoints.
const REQUEST_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone)]
struct SessionAuth {
    cookie: String,
    csrf_token: String,
}

/// Direct authenticated client for the dashboard's AJAX API. Session cookie
/// material comes out of the credential store; there is no interactive login
/// flow, an expired session aborts with a refresh instruction instead.
pub struct DashboardClient {
    op_vault: String,
    op_item: String,
    zone: Tz,
    clock: Box<dyn Clock>,
    auth: Option<SessionAuth>,
}

impl DashboardClient {
    pub fn new(config: &AppConfig, zone: Tz, clock: Box<dyn Clock>) -> Self {
        Self {
            op_vault: config.op_vault.clone(),
            op_item: config.op_item.clone(),
            zone,
            clock,
            auth: None,
        }
    }

    fn auth(&self) -> Result<SessionAuth> {
        self.auth
            .clone()
            .ok_or_else(|| anyhow!("session is not open"))
    }
}

#[async_trait]
impl ActivitySource for DashboardClient {
    async fn open(&mut self) -> Result<SessionInfo> {
        let reference = format!("op://{}/{}/{}", self.op_vault, self.op_item, COOKIE_FIELD);
        let cookie = credentials::read_secret(&reference).await?;
        let csrf_token = extract_csrf_token(&cookie).ok_or_else(|| {
            anyhow!(
                "no {CSRF_COOKIE} cookie in '{COOKIE_FIELD}'; copy the cookie header \
                 of a logged-in dashboard tab into the 1Password item"
            )
        })?;
        let auth = SessionAuth { cookie, csrf_token };

        let response = get_json(HOUSEHOLD_API, auth.clone()).await?;
        if response.status != 200 {
            bail!(
                "household lookup failed with HTTP {}; the stored dashboard session has likely expired",
                response.status
            );
        }

        let children = find_children(&response.body);
        self.auth = Some(auth);
        Ok(SessionInfo {
            children,
            startup_responses: vec![response],
        })
    }

    async fn fetch_activity(
        &mut self,
        child: &ChildProfile,
        window: FetchWindow,
    ) -> Result<RawResponse> {
        let auth = self.auth()?;
        self.clock.sleep(REQUEST_DELAY).await;

        let body = json!({
            "childDirectedId": child.directed_id,
            "startTime": window.start,
            "endTime": window.end,
            "aggregationInterval": DAY_SECONDS,
            "timeZone": self.zone.name(),
        });
        let mut response = post_json(ACTIVITIES_API, auth, body).await?;
        response.query = Some(WindowQuery {
            child_directed_id: child.directed_id.clone(),
            start_time: window.start,
            end_time: window.end,
        });
        Ok(response)
    }
}

async fn get_json(url: &'static str, auth: SessionAuth) -> Result<RawResponse> {
    let (status, text) = tokio::task::spawn_blocking(move || -> Result<(u16, String)> {
        let mut res = ureq::get(url)
            .config()
            .http_status_as_error(false)
            .build()
            .header("Accept", "application/json")
            .header("Cookie", &auth.cookie)
            .call()?;
        Ok((res.status().as_u16(), res.body_mut().read_to_string()?))
    })
    .await??;

    Ok(RawResponse {
        url: url.to_string(),
        status,
        body: parse_body(text),
        query: None,
    })
}

async fn post_json(
    url: &'static str,
    auth: SessionAuth,
    body: serde_json::Value,
) -> Result<RawResponse> {
    let (status, text) = tokio::task::spawn_blocking(move || -> Result<(u16, String)> {
        let mut res = ureq::post(url)
            .config()
            .http_status_as_error(false)
            .build()
            .header("Content-Type", "application/json;charset=UTF-8")
            .header("Accept", "application/json")
            .header("x-amzn-csrf", &auth.csrf_token)
            .header("Cookie", &auth.cookie)
            .send_json(body)?;
        Ok((res.status().as_u16(), res.body_mut().read_to_string()?))
    })
    .await??;

    Ok(RawResponse {
        url: url.to_string(),
        status,
        body: parse_body(text),
        query: None,
    })
}

/// The archive wants a JSON body even when the service answers with an error
/// page, so unparseable text is wrapped instead of rejected.
fn parse_body(text: String) -> serde_json::Value {
    serde_json::from_str(&text).unwrap_or_else(|_| {
        let truncated: String = text.chars().take(500).collect();
        json!({ "_raw_text": truncated })
    })
}

#[derive(Deserialize)]
struct HouseholdBody {
    #[serde(default)]
    members: Vec<HouseholdMember>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HouseholdMember {
    #[serde(default)]
    role: String,
    directed_id: Option<String>,
    first_name: Option<String>,
}

/// Children are the household members with role CHILD and a directed id.
fn find_children(body: &serde_json::Value) -> Vec<ChildProfile> {
    let Ok(household) = serde_json::from_value::<HouseholdBody>(body.clone()) else {
        return vec![];
    };
    household
        .members
        .into_iter()
        .filter(|member| member.role == "CHILD")
        .filter_map(|member| {
            Some(ChildProfile {
                directed_id: member.directed_id?,
                first_name: member
                    .first_name
                    .unwrap_or_else(|| "Unknown".to_string()),
            })
        })
        .collect()
}

fn extract_csrf_token(cookie: &str) -> Option<String> {
    cookie.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == CSRF_COOKIE).then(|| value.to_string())
    })
}
