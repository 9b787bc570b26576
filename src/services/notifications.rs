//! Best-effort new-order notification channel.
//!
//! Delivery is an outbound webhook POST dispatched on its own task after the
//! order has been persisted. Failures are logged and retried a few times,
//! never propagated: a dead notification endpoint must not fail order intake.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, warn};

/// Privacy-conscious summary of a freshly created order. This is the full
/// payload the notification endpoint receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderSummary {
    pub tracking_code: String,
    pub student_name: String,
    pub roll_number: String,
    pub subject: String,
    pub mobile_number: String,
    pub file_name: Option<String>,
    pub notes: String,
    pub amount: String,
    pub payment_method: String,
}

#[derive(Clone)]
pub struct NotificationService {
    client: reqwest::Client,
    max_retries: u32,
}

impl Default for NotificationService {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            max_retries: 3,
        }
    }

    /// Fire-and-forget delivery of a new-order notification. Returns
    /// immediately; delivery happens on a detached task.
    pub fn notify_order_created(&self, webhook_url: &str, summary: NewOrderSummary) {
        let client = self.client.clone();
        let url = webhook_url.to_string();
        let max_retries = self.max_retries;

        tokio::spawn(async move {
            let tracking_code = summary.tracking_code.clone();
            for attempt in 1..=max_retries {
                match client.post(&url).json(&summary).send().await {
                    Ok(response) if response.status().is_success() => {
                        info!(%tracking_code, "New-order notification delivered");
                        return;
                    }
                    Ok(response) => {
                        warn!(
                            %tracking_code,
                            status = %response.status(),
                            attempt,
                            "Notification endpoint rejected payload"
                        );
                    }
                    Err(err) => {
                        warn!(%tracking_code, attempt, error = %err, "Notification delivery failed");
                    }
                }

                if attempt < max_retries {
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }

            error!(%tracking_code, "Giving up on new-order notification after retries");
        });
    }
}
