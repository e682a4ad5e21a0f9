//! "Spin ready" notifications for the home collector.
//!
//! A cursor records the last spin number a text went out for. A run sends
//! at most one text: when the collector is eligible and the cursor is below
//! the upcoming spin number. The cursor only advances after a successful
//! delivery, so a failed send is retried on the next cron tick.

use std::collections::HashMap;
use std::sync::Arc;

use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::spin_service::SpinService;
use crate::domain::spin_event::UnixSeconds;
use crate::error::ServiceError;
use crate::notify::{Delivery, Notifier, SAMPLE_SPIN_NUMBER, mask_phone, spin_ready_message};
use crate::persistence::Persistence;

/// Outcome of one cron run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyReport {
    /// Counted spins so far.
    pub spin_count: usize,
    /// Whether a spin is permitted now.
    pub can_spin_now: bool,
    /// Number of the upcoming spin.
    pub next_spin_number: u64,
    /// When the upcoming spin becomes available.
    pub next_eligible_timestamp: UnixSeconds,
    /// Seconds until then; zero once eligible.
    pub seconds_until_eligible: i64,
    /// A notifier is configured.
    pub notifications_enabled: bool,
    /// A text went out during this run.
    pub notification_sent: bool,
    /// Last spin number notified after this run.
    pub last_notified_spin: Option<u64>,
    /// Summary.
    pub message: String,
    /// Delivery failure, if any.
    pub error: Option<String>,
}

/// Outcome of a test notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestNotification {
    /// Masked recipient.
    pub recipient: String,
    /// Provider name.
    pub provider: &'static str,
    /// Text that was sent.
    pub text: String,
    /// Provider receipt.
    pub delivery: Delivery,
}

/// Sends "spin ready" texts and keeps the notification cursor.
#[derive(Debug)]
pub struct NotifyService {
    spins: Arc<SpinService>,
    store: Arc<dyn Persistence>,
    notifier: Option<Arc<dyn Notifier>>,
    dapp_url: String,
    fallback_cursors: Mutex<HashMap<Address, u64>>,
}

impl NotifyService {
    /// Creates a new `NotifyService`. Without a notifier runs only report.
    #[must_use]
    pub fn new(
        spins: Arc<SpinService>,
        store: Arc<dyn Persistence>,
        notifier: Option<Arc<dyn Notifier>>,
        dapp_url: String,
    ) -> Self {
        Self {
            spins,
            store,
            notifier,
            dapp_url,
            fallback_cursors: Mutex::new(HashMap::new()),
        }
    }

    async fn cursor(&self, collector: Address) -> Option<u64> {
        match self.store.load_cursor(collector).await {
            Ok(found) => found,
            Err(err) => {
                warn!(%collector, error = %err, "cursor read failed; using in-memory cursor");
                self.fallback_cursors.lock().await.get(&collector).copied()
            }
        }
    }

    async fn advance_cursor(&self, collector: Address, spin_number: u64) {
        self.fallback_cursors.lock().await.insert(collector, spin_number);
        if let Err(err) = self.store.save_cursor(collector, spin_number).await {
            warn!(%collector, error = %err, "cursor write failed; kept in memory");
        }
    }

    /// Checks the home collector at `now` and texts when a spin is due.
    ///
    /// Spins are read fresh, bypassing and then refreshing the cache.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a home collector and
    /// [`ServiceError::Chain`] when the spins cannot be read. Delivery
    /// failures are reported in the result, not as errors.
    pub async fn check_and_notify_at(&self, now: DateTime<Utc>) -> Result<NotifyReport, ServiceError> {
        let home = self.spins.home()?;
        let view = self.spins.schedule_for_at(home, now, true).await?;
        let spin_count = view.schedule.spin_count;
        let next_spin_number = spin_count as u64 + 1;
        let mut cursor = self.cursor(home).await;

        let mut report = NotifyReport {
            spin_count,
            can_spin_now: view.schedule.can_spin_now,
            next_spin_number,
            next_eligible_timestamp: view.schedule.next_eligible_timestamp,
            seconds_until_eligible: view.seconds_until_eligible,
            notifications_enabled: self.notifier.is_some(),
            notification_sent: false,
            last_notified_spin: cursor,
            message: if view.schedule.can_spin_now {
                "Spin available".to_string()
            } else {
                "Spin not yet available".to_string()
            },
            error: None,
        };

        let due = view.schedule.can_spin_now && cursor.is_none_or(|c| c < next_spin_number);
        let Some(notifier) = self.notifier.as_ref().filter(|_| due) else {
            return Ok(report);
        };

        let text = spin_ready_message(next_spin_number, &self.dapp_url);
        match notifier.send(text).await {
            Ok(_) => {
                self.advance_cursor(home, next_spin_number).await;
                cursor = Some(next_spin_number);
                info!(
                    collector = %home,
                    spin = next_spin_number,
                    recipient = %mask_phone(notifier.recipient()),
                    "spin ready notification sent"
                );
                report.notification_sent = true;
                report.message = "Spin available - notification sent".to_string();
            }
            Err(err) => {
                warn!(collector = %home, spin = next_spin_number, error = %err, "spin ready notification failed");
                report.message = "Spin available - notification failed".to_string();
                report.error = Some(err.to_string());
            }
        }
        report.last_notified_spin = cursor;
        Ok(report)
    }

    /// Sends the fixed sample text.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::NotConfigured`] without a notifier and
    /// [`ServiceError::Notification`] when delivery fails.
    pub async fn send_test(&self) -> Result<TestNotification, ServiceError> {
        let notifier = self
            .notifier
            .as_ref()
            .ok_or_else(|| ServiceError::NotConfigured("LoopMessage".to_string()))?;
        let text = spin_ready_message(SAMPLE_SPIN_NUMBER, &self.dapp_url);
        let delivery = notifier.send(text.clone()).await?;
        Ok(TestNotification {
            recipient: mask_phone(notifier.recipient()),
            provider: notifier.provider(),
            text,
            delivery,
        })
    }

    /// Masked recipient, when a notifier is configured.
    #[must_use]
    pub fn masked_recipient(&self) -> Option<String> {
        self.notifier.as_ref().map(|n| mask_phone(n.recipient()))
    }
}
