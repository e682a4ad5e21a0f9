//! Outbound "spin ready" notifications.
//!
//! [`Notifier`] is the delivery seam; [`LoopMessageNotifier`] sends iMessage
//! texts through the LoopMessage HTTP API.

pub mod loopmessage;

use std::fmt;

use futures_util::future::BoxFuture;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ServiceError;

pub use loopmessage::{LoopMessageNotifier, LoopMessageSettings};

/// Default link embedded in notifications: the Medal Spin dapp opened in
/// the MetaMask mobile browser.
pub const DEFAULT_SPIN_DAPP_URL: &str =
    "https://metamask.app.link/dapp/stack.shape.network/medal-spin";

/// Spin number used by the test notification.
pub const SAMPLE_SPIN_NUMBER: u64 = 5;

/// Result of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Delivery {
    /// Provider-side message id, when returned.
    pub message_id: Option<String>,
}

/// Sends short text messages to a single configured recipient.
pub trait Notifier: Send + Sync + fmt::Debug {
    /// Delivers `text`.
    fn send(&self, text: String) -> BoxFuture<'_, Result<Delivery, ServiceError>>;

    /// Recipient handle, unmasked.
    fn recipient(&self) -> &str;

    /// Provider name for logs and responses.
    fn provider(&self) -> &'static str;
}

/// Body of the "spin ready" message.
#[must_use]
pub fn spin_ready_message(spin_number: u64, dapp_url: &str) -> String {
    format!("Spin #{spin_number} Ready Now: {dapp_url}")
}

/// Masks a phone number for display: first two and last two characters.
#[must_use]
pub fn mask_phone(number: &str) -> String {
    let chars: Vec<char> = number.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars.iter().take(2).collect();
    let tail: String = chars.iter().skip(chars.len() - 2).collect();
    format!("{head}{}{tail}", "*".repeat(chars.len() - 4))
}
