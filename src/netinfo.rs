use std::time::Duration;
use tracing::warn;

use crate::error::NetworkError;

const LOOKUP_URL: &str = "https://api.ipify.org?format=text";

/// Used when the public address cannot be determined
pub const LOOPBACK_PLACEHOLDER: &str = "127.0.0.1";

pub async fn lookup_public_ip(url: &str, timeout: Duration) -> Result<String, NetworkError> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let body = client.get(url).send().await?.error_for_status()?.text().await?;
    let ip = body.trim();
    if ip.is_empty() {
        return Err(NetworkError::EmptyBody);
    }
    Ok(ip.to_string())
}

/// Best-effort public IP for the startup banner. Never fails.
pub async fn public_ip_or_loopback() -> String {
    match lookup_public_ip(LOOKUP_URL, Duration::from_secs(10)).await {
        Ok(ip) => ip,
        Err(e) => {
            warn!("{}; using {}", e, LOOPBACK_PLACEHOLDER);
            LOOPBACK_PLACEHOLDER.to_string()
        }
    }
}
