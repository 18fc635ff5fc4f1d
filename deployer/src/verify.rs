//! Post-deploy HTTP probe of the environment's public endpoint.

use crate::error::{DeployError, DeployResult};
use std::time::Duration;
use tracing::info;

/// Turns a CNAME or bare host into a URL; full URLs pass through unchanged.
pub fn endpoint_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

/// Issues a GET against `host` and succeeds on any 2xx response.
pub async fn verify_endpoint(host: &str, timeout: Duration) -> DeployResult<u16> {
    let url = endpoint_url(host);
    let failed = |reason: String| DeployError::VerificationFailed {
        url: url.clone(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| failed(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| failed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(failed(format!("Status: {}", status)));
    }

    info!(url = %url, status = status.as_u16(), "Endpoint verified");
    Ok(status.as_u16())
}
