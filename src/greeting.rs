use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::models::{GreetingBuckets, GreetingSettings, Identity};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Neutral placeholder when neither a stored name nor an identity name is
/// available.
pub const FALLBACK_NAME: &str = "there";

/// Stored local name wins, then the identity's display name, then the
/// neutral placeholder.
pub fn resolve_display_name(stored: Option<&str>, identity: Option<&Identity>) -> String {
    if let Some(name) = stored.map(str::trim).filter(|name| !name.is_empty()) {
        return name.to_string();
    }
    if let Some(name) = identity
        .and_then(|identity| identity.display_name.as_deref())
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        return name.to_string();
    }
    FALLBACK_NAME.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Late,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Late => "late night",
        }
    }
}

/// Buckets a clock hour using the configured boundaries.
pub fn time_of_day(hour: u32, buckets: &GreetingBuckets) -> TimeOfDay {
    if hour < buckets.morning_end {
        TimeOfDay::Morning
    } else if hour < buckets.afternoon_end {
        TimeOfDay::Afternoon
    } else if hour < buckets.evening_end {
        TimeOfDay::Evening
    } else {
        TimeOfDay::Late
    }
}

const PLACEHOLDER_NAME: &str = "{name}";

/// Deterministic local greeting: the configured per-bucket template with
/// the name substituted.
pub fn fallback_greeting(settings: &GreetingSettings, name: &str, hour: u32) -> String {
    let template = match time_of_day(hour, &settings.buckets) {
        TimeOfDay::Morning => &settings.templates.morning,
        TimeOfDay::Afternoon => &settings.templates.afternoon,
        TimeOfDay::Evening => &settings.templates.evening,
        TimeOfDay::Late => &settings.templates.late,
    };
    template.replace(PLACEHOLDER_NAME, name)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WelcomeRequest<'a> {
    user_name: &'a str,
    time_of_day: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WelcomeResponse {
    #[serde(default)]
    message: Option<String>,
}

/// Extracts the greeting sentence from an endpoint response body. Missing
/// or blank `message` counts as a failure so the caller falls back.
pub fn parse_message(body: &str) -> Result<String, String> {
    let parsed: WelcomeResponse =
        serde_json::from_str(body).map_err(|err| format!("invalid welcome json: {err}"))?;
    parsed
        .message
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .ok_or_else(|| "welcome response missing message".to_string())
}

async fn fetch_remote_greeting(
    endpoint: &str,
    name: &str,
    time_of_day: TimeOfDay,
) -> Result<String, String> {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|err| format!("failed to build http client: {err}"))?;

    let resp = client
        .post(endpoint)
        .json(&WelcomeRequest {
            user_name: name,
            time_of_day: time_of_day.as_str(),
        })
        .send()
        .await
        .map_err(|err| format!("welcome request failed: {err}"))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|err| format!("failed to read welcome response: {err}"))?;

    if !status.is_success() {
        return Err(format!("welcome endpoint http {status}: {text}"));
    }

    parse_message(&text)
}

/// Produces the welcome sentence: the endpoint's one when configured and
/// reachable, the local template otherwise. A failing endpoint is logged
/// and silently substituted; this never errors and never returns an empty
/// string.
pub async fn compose_greeting(settings: &GreetingSettings, name: &str, hour: u32) -> String {
    if let Some(endpoint) = settings.endpoint.as_deref() {
        match fetch_remote_greeting(endpoint, name, time_of_day(hour, &settings.buckets)).await {
            Ok(message) => return message,
            Err(err) => {
                log::warn!("welcome endpoint unavailable, using local template: {err}");
            }
        }
    }
    fallback_greeting(settings, name, hour)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dismissal {
    /// The display duration elapsed.
    Elapsed,
    /// The user dismissed the overlay early.
    Dismissed,
}

/// Keeps the greeting overlay up for `display_ms`, or until the dismiss
/// channel fires. A dropped sender just means nobody can dismiss early.
pub async fn present(display_ms: u64, dismiss: oneshot::Receiver<()>) -> Dismissal {
    let sleep = tokio::time::sleep(Duration::from_millis(display_ms));
    tokio::pin!(sleep);
    tokio::select! {
        () = &mut sleep => Dismissal::Elapsed,
        result = dismiss => match result {
            Ok(()) => Dismissal::Dismissed,
            Err(_) => {
                sleep.await;
                Dismissal::Elapsed
            }
        },
    }
}
