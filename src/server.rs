use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

// Response strings the client surfaces as-is; do not reword.
pub const ERR_MISSING_NAME: &str = "User name is required.";
pub const ERR_MISSING_KEY: &str = "AI configuration error: API Key missing.";
pub const ERR_UPSTREAM: &str = "The AI is resting right now. Please try again later!";

const DEFAULT_UPSTREAM_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const UPSTREAM_MODEL: &str = "gemini-1.5-flash";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeRequest {
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub time_of_day: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeReply {
    pub message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Shared handler state: the upstream credential and a pooled client. The
/// credential is checked per request so a misconfigured deployment keeps
/// serving clear 500s instead of crashing.
#[derive(Clone)]
pub struct ServerState {
    api_key: Option<String>,
    upstream_base: String,
    client: reqwest::Client,
}

impl ServerState {
    pub fn new(api_key: Option<String>) -> Result<Self, String> {
        Self::with_upstream_base(api_key, DEFAULT_UPSTREAM_BASE.to_string())
    }

    pub fn with_upstream_base(
        api_key: Option<String>,
        upstream_base: String,
    ) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| format!("failed to build http client: {err}"))?;
        Ok(Self {
            api_key,
            upstream_base,
            client,
        })
    }
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/api/greeting", post(welcome))
        .with_state(state)
}

/// The one-sentence welcome prompt sent upstream; empty time-of-day falls
/// back to "day".
pub fn build_welcome_prompt(name: &str, time_of_day: &str) -> String {
    let time_of_day = if time_of_day.trim().is_empty() {
        "day"
    } else {
        time_of_day.trim()
    };
    format!(
        "Generate a very short, warm, and professional 1-sentence welcome message \
         for a user named {name}. It is currently the {time_of_day}. Encourage them \
         to be productive with their to-do list. Keep it under 20 words."
    )
}

fn upstream_url(base: &str, api_key: &str) -> String {
    format!(
        "{}/models/{UPSTREAM_MODEL}:generateContent?key={api_key}",
        base.trim_end_matches('/')
    )
}

/// Pulls the generated sentence out of the upstream response shape
/// (`candidates[0].content.parts[0].text`).
pub fn extract_candidate_text(value: &serde_json::Value) -> Option<String> {
    value["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn error_response(status: StatusCode, error: &str, details: Option<String>) -> (StatusCode, Json<ErrorBody>) {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
            details,
        }),
    )
}

async fn call_upstream(state: &ServerState, api_key: &str, prompt: &str) -> Result<String, String> {
    let payload = serde_json::json!({
        "contents": [ { "parts": [ { "text": prompt } ] } ]
    });

    let resp = state
        .client
        .post(upstream_url(&state.upstream_base, api_key))
        .json(&payload)
        .send()
        .await
        .map_err(|err| format!("upstream request failed: {err}"))?;

    let status = resp.status();
    let text = resp
        .text()
        .await
        .map_err(|err| format!("failed to read upstream response: {err}"))?;

    if !status.is_success() {
        return Err(format!("upstream http {status}: {text}"));
    }

    let value: serde_json::Value =
        serde_json::from_str(&text).map_err(|err| format!("invalid upstream json: {err}"))?;
    extract_candidate_text(&value).ok_or_else(|| "upstream response carried no text".to_string())
}

async fn welcome(
    State(state): State<ServerState>,
    Json(request): Json<WelcomeRequest>,
) -> Result<Json<WelcomeReply>, (StatusCode, Json<ErrorBody>)> {
    let Some(api_key) = state.api_key.as_deref() else {
        log::error!("GEMINI_API_KEY is missing in the environment");
        return Err(error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ERR_MISSING_KEY,
            None,
        ));
    };

    let Some(name) = request
        .user_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    else {
        return Err(error_response(StatusCode::BAD_REQUEST, ERR_MISSING_NAME, None));
    };

    let prompt = build_welcome_prompt(name, request.time_of_day.as_deref().unwrap_or(""));
    match call_upstream(&state, api_key, &prompt).await {
        Ok(message) => Ok(Json(WelcomeReply { message })),
        Err(err) => {
            log::error!("generative upstream failed: {err}");
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ERR_UPSTREAM,
                Some(err),
            ))
        }
    }
}
