//! Shared request plumbing for bearer-token JSON APIs.

use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{ConnectorResult, check_status};

/// Build a `reqwest::Client` with the given request timeout.
pub(crate) fn build_client(timeout_secs: u64) -> ConnectorResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

/// Trim trailing slashes so `format!("{base}/path")` never doubles them.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// POST a JSON body with bearer auth and decode the JSON response.
pub(crate) async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    api_key: &str,
    body: &B,
) -> ConnectorResult<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    info!(url = %url, "POST");
    let resp = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await?;
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}
