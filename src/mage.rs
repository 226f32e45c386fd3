use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::MageConfig;
use crate::error::HttpError;

/// Body of a Mage search call. One-shot: a single query string, a result-size
/// cap, and an inclusive time window. No pagination; if the total match count
/// exceeds `size` the result set is silently truncated and the caller has to
/// deal with it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub query: String,
    pub size: u32,
    #[serde(serialize_with = "rfc3339_millis")]
    pub start_time: DateTime<Utc>,
    #[serde(serialize_with = "rfc3339_millis")]
    pub end_time: DateTime<Utc>,
}

// Mage wants `2025-11-11T00:00:00.000Z`, millisecond precision with a literal Z.
fn rfc3339_millis<S: serde::Serializer>(t: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Issues the search and returns the raw JSON result set. Non-2xx and
/// transport failures are both `HttpError`; there is no retry.
pub async fn search(config: &MageConfig, req: &QueryRequest) -> Result<Value, HttpError> {
    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    debug!(url = %config.api_url, query = %req.query, "mage search");

    let resp = client
        .post(&config.api_url)
        .bearer_auth(&config.auth_token)
        .header("Content-Type", "application/json")
        .header("accept", "*/*")
        .header("x-source", &config.source)
        .json(req)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(HttpError::Status { status, body });
    }

    Ok(resp.json().await?)
}
