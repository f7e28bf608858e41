//! Backend availability checks. Failures are logged, never surfaced.

use std::time::Duration;

use serde_json::Value;
use tracing::{error, info, warn};

use crate::http::HttpClient;

pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// GET the API root and report whether it answered 2xx with a JSON body.
pub async fn check_backend_health(http: &HttpClient) -> bool {
    let url = match http.endpoint("") {
        Ok(url) => url,
        Err(e) => {
            error!("Backend health check failed: {}", e);
            return false;
        }
    };

    let response = match http.inner().get(url).timeout(HEALTH_TIMEOUT).send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            error!("Backend health check timeout - backend might be sleeping");
            return false;
        }
        Err(e) => {
            error!("Backend health check failed: {}", e);
            return false;
        }
    };

    let status = response.status();
    if !status.is_success() {
        warn!("Backend responded but not healthy: {}", status.as_u16());
        return false;
    }

    match response.json::<Value>().await {
        Ok(body) => {
            info!("Backend is healthy: {}", body);
            true
        }
        Err(e) => {
            warn!("Backend health response was not JSON: {}", e);
            false
        }
    }
}

/// Probe up to `max_attempts` times, sleeping `delay` between attempts.
pub async fn wait_for_backend(http: &HttpClient, max_attempts: u32, delay: Duration) -> bool {
    for attempt in 1..=max_attempts {
        info!("Checking backend availability (attempt {}/{})", attempt, max_attempts);

        if check_backend_health(http).await {
            return true;
        }

        if attempt < max_attempts {
            info!("Waiting {:?} before retry", delay);
            tokio::time::sleep(delay).await;
        }
    }

    error!("Backend is not available after {} attempts", max_attempts);
    false
}
