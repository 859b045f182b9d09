/*
 * Responsibility
 * - リクエスト 1 件ごとの認証判定 (NO_RECEIPT → VALIDATING → AUTHENTICATED / REJECTED)
 *   - 保存済み Receipt が strictness を満たす → そのまま通す (通信なし)
 *   - 満たさない → 破棄して未認証扱い (再認証トリガ)
 *   - ticket あり → 検証 → 保存
 *   - どちらもなし → gateway なら素通し、そうでなければ REJECTED
 * - REJECTED の解決 (login への redirect など) は呼び出し側の責務
 */
use std::sync::Arc;
use std::time::Duration;

use crate::services::auth::policy::{Strictness, StrictnessFailure};
use crate::services::cas::{Receipt, TicketValidator, ValidationError, ValidationRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    NoReceipt,
    Validating,
    Authenticated,
    Rejected,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GateRequest<'a> {
    pub stored_receipt: Option<&'a Arc<Receipt>>,
    pub ticket: Option<&'a str>,
    pub service: &'a str,
}

#[derive(Debug)]
pub enum AuthenticationOutcome {
    Authenticated {
        receipt: Arc<Receipt>,
        /// A ticket was validated for this request.
        validated: bool,
    },
    /// Gateway probe: pass through once with no receipt.
    Gateway,
    Rejected(Rejection),
}

impl AuthenticationOutcome {
    pub fn state(&self) -> AuthState {
        match self {
            AuthenticationOutcome::Authenticated { .. } => AuthState::Authenticated,
            AuthenticationOutcome::Gateway => AuthState::NoReceipt,
            AuthenticationOutcome::Rejected(_) => AuthState::Rejected,
        }
    }
}

#[derive(Debug)]
pub enum Rejection {
    /// No ticket and no usable receipt.
    NotAuthenticated,
    /// The stored receipt no longer satisfies the requirements; log in again.
    Stale(StrictnessFailure),
    ValidationFailed(ValidationError),
    /// A freshly validated receipt did not meet the requirements.
    InsufficientStrictness(StrictnessFailure),
}

impl Rejection {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Rejection::InsufficientStrictness(f) if f.is_authorization())
    }
}

/// What the caller should do with the session's stored receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    Keep,
    Store(Arc<Receipt>),
    Clear,
}

#[derive(Debug)]
pub struct Decision {
    pub outcome: AuthenticationOutcome,
    pub session: SessionUpdate,
}

pub struct AuthenticationGate {
    validator: Arc<dyn TicketValidator>,
    strictness: Strictness,
    gateway: bool,
    validate_url: String,
    proxy_callback_url: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("strictness", &self.strictness)
            .field("gateway", &self.gateway)
            .field("validate_url", &self.validate_url)
            .field("proxy_callback_url", &self.proxy_callback_url)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AuthenticationGate {
    pub fn new(
        validator: Arc<dyn TicketValidator>,
        strictness: Strictness,
        validate_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            validator,
            strictness,
            gateway: false,
            validate_url: validate_url.into(),
            proxy_callback_url: None,
            timeout,
        }
    }

    pub fn with_gateway(mut self, gateway: bool) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_proxy_callback(mut self, url: Option<String>) -> Self {
        self.proxy_callback_url = url;
        self
    }

    pub fn strictness(&self) -> &Strictness {
        &self.strictness
    }

    pub fn requires_renew(&self) -> bool {
        self.strictness.require_renew
    }

    pub async fn evaluate(&self, request: GateRequest<'_>) -> Decision {
        let mut discarded = None;

        if let Some(receipt) = request.stored_receipt {
            match self.strictness.check(receipt) {
                Ok(()) => {
                    return Decision {
                        outcome: AuthenticationOutcome::Authenticated {
                            receipt: Arc::clone(receipt),
                            validated: false,
                        },
                        session: SessionUpdate::Keep,
                    };
                }
                Err(failure) => {
                    tracing::info!(
                        username = receipt.username(),
                        reason = %failure,
                        "stored receipt no longer sufficient, discarding"
                    );
                    discarded = Some(failure);
                }
            }
        }

        // a discarded receipt must not survive in the session whatever happens next
        let fallback_session = if discarded.is_some() {
            SessionUpdate::Clear
        } else {
            SessionUpdate::Keep
        };

        let Some(ticket) = request.ticket.filter(|t| !t.is_empty()) else {
            let outcome = match discarded {
                // also in gateway mode: passing through here would quietly turn a
                // known user into an anonymous one instead of asking for fresh credentials
                Some(failure) => AuthenticationOutcome::Rejected(Rejection::Stale(failure)),
                None if self.gateway => AuthenticationOutcome::Gateway,
                None => AuthenticationOutcome::Rejected(Rejection::NotAuthenticated),
            };
            tracing::debug!(state = ?outcome.state(), "no ticket on request");
            return Decision {
                outcome,
                session: fallback_session,
            };
        };

        tracing::debug!(state = ?AuthState::Validating, service = request.service, "validating ticket");
        let validation = ValidationRequest {
            endpoint: self.validate_url.clone(),
            ticket: ticket.to_string(),
            service: request.service.to_string(),
            renew: self.strictness.require_renew,
            proxy_callback_url: self.proxy_callback_url.clone(),
            timeout: self.timeout,
        };

        let receipt = match self.validator.validate(&validation).await {
            Ok(receipt) => Arc::new(receipt),
            Err(e) => {
                tracing::warn!(error = %e, transport = e.is_transport(), "ticket validation failed");
                return Decision {
                    outcome: AuthenticationOutcome::Rejected(Rejection::ValidationFailed(e)),
                    session: fallback_session,
                };
            }
        };

        if let Err(failure) = self.strictness.check(&receipt) {
            tracing::warn!(
                username = receipt.username(),
                reason = %failure,
                "validated receipt does not meet requirements"
            );
            return Decision {
                outcome: AuthenticationOutcome::Rejected(Rejection::InsufficientStrictness(failure)),
                session: fallback_session,
            };
        }

        tracing::info!(username = receipt.username(), "authenticated");
        Decision {
            outcome: AuthenticationOutcome::Authenticated {
                receipt: Arc::clone(&receipt),
                validated: true,
            },
            session: SessionUpdate::Store(receipt),
        }
    }
}
