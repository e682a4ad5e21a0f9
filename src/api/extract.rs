//! Request extractors: caller identity and cron authorization.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, header};
use tracing::warn;

use crate::app_state::AppState;
use crate::error::ServiceError;
use crate::service::VisitContext;

/// Caller identity taken from proxy headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Client IP: first `x-forwarded-for` entry, then `x-real-ip`, else
    /// `unknown`.
    pub ip: String,
    /// `user-agent` header.
    pub user_agent: Option<String>,
    /// `referer` header.
    pub referrer: Option<String>,
}

fn header_text(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ClientInfo {
    /// Reads the caller identity from `headers`.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let forwarded = header_text(headers, "x-forwarded-for").and_then(|list| {
            list.split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        });
        Self {
            ip: forwarded
                .or_else(|| header_text(headers, "x-real-ip"))
                .unwrap_or_else(|| "unknown".to_string()),
            user_agent: header_text(headers, header::USER_AGENT),
            referrer: header_text(headers, header::REFERER),
        }
    }

    /// Visit metadata for wallet tracking.
    #[must_use]
    pub fn visit(&self) -> VisitContext {
        VisitContext {
            ip_address: Some(self.ip.clone()),
            user_agent: self.user_agent.clone(),
            referrer: self.referrer.clone(),
        }
    }
}

impl<S: Send + Sync> FromRequestParts<S> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_headers(&parts.headers))
    }
}

/// Proof that a cron request carried `Authorization: Bearer <CRON_SECRET>`.
///
/// Without a configured secret every request passes.
#[derive(Debug, Clone, Copy)]
pub struct CronAuth;

impl FromRequestParts<AppState> for CronAuth {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(secret) = state.settings.cron_secret.as_deref() else {
            return Ok(Self);
        };
        let presented = header_text(&parts.headers, header::AUTHORIZATION);
        match presented.as_deref().and_then(|v| v.strip_prefix("Bearer ")) {
            Some(token) if token == secret => Ok(Self),
            _ => {
                warn!(path = %parts.uri.path(), "cron request rejected");
                Err(ServiceError::Unauthorized)
            }
        }
    }
}
